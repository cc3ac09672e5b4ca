//! Rate-limited, cached, retrying client for the Google Geocoding API.
//!
//! Request lifecycle: cache lookup (hit short-circuits throttle and network
//! entirely) → throttled request → retry with doubling backoff on transient
//! failures → classification → cache write on success. The client returns a
//! [`GeocodeResult`]; it never touches the caller's records.

pub mod cache;
pub mod error;
pub mod limiter;
pub mod types;

pub use cache::{CacheEntry, GeocodeCache, MemoryGeocodeCache};
pub use error::{GeocodeError, Result};
pub use limiter::RateLimiter;
pub use types::{GeocodeBias, GeocodeResult};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use foodmap_common::canonical::content_hash;
use foodmap_common::types::GeocodeStatus;

use types::ProviderResponse;

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP status codes retried with backoff.
const RETRYABLE_HTTP: [u16; 5] = [429, 500, 502, 503, 504];

/// Raw HTTP seam so tests can run without a network.
#[async_trait]
pub trait GeocodeTransport: Send + Sync {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse>;
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// reqwest-backed transport with a fixed per-request timeout. A timeout is
/// a transport failure, retried like any other.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeocodeTransport for HttpTransport {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse> {
        let resp = self.client.get(url).query(params).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(TransportResponse { status, body })
    }
}

pub struct GeocodeClient {
    transport: Arc<dyn GeocodeTransport>,
    cache: Option<Arc<dyn GeocodeCache>>,
    limiter: RateLimiter,
    api_key: String,
    base_url: String,
    bias: GeocodeBias,
}

impl GeocodeClient {
    pub fn new(api_key: &str, max_qps: f64) -> Self {
        Self {
            transport: Arc::new(HttpTransport::new()),
            cache: None,
            limiter: RateLimiter::new(max_qps),
            api_key: api_key.to_string(),
            base_url: GOOGLE_GEOCODE_URL.to_string(),
            bias: GeocodeBias::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn GeocodeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn GeocodeTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_bias(mut self, bias: GeocodeBias) -> Self {
        self.bias = bias;
        self
    }

    /// Deterministic cache key: the fully-qualified query plus every bias
    /// input that changes what the provider would answer.
    pub fn query_hash(&self, query: &str) -> String {
        content_hash(&[
            "google_geocode",
            query,
            &self.bias.admin_area,
            &self.bias.country,
            &self.bias.bounds,
        ])
    }

    fn request_params(&self, query: &str) -> Vec<(String, String)> {
        vec![
            ("address".to_string(), query.to_string()),
            ("components".to_string(), self.bias.components()),
            ("region".to_string(), self.bias.region.clone()),
            ("bounds".to_string(), self.bias.bounds.clone()),
            ("key".to_string(), self.api_key.clone()),
        ]
    }

    /// Geocode a free-text address. Infallible by design: transient failures
    /// are retried, terminal ones come back as a status on the result so a
    /// bad address can never abort a batch.
    pub async fn geocode(&self, query: &str) -> GeocodeResult {
        let query_hash = self.query_hash(query);

        if let Some(cache) = &self.cache {
            match cache.get(&query_hash).await {
                Ok(Some(entry)) => {
                    return GeocodeResult::from_cache_entry(entry, query_hash);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(%error, "geocode cache read failed, treating as miss");
                }
            }
        }

        let params = self.request_params(query);
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 0..MAX_ATTEMPTS {
            let last_attempt = attempt + 1 == MAX_ATTEMPTS;
            self.limiter.wait().await;

            let response = match self.transport.get(&self.base_url, &params).await {
                Ok(response) => response,
                Err(error) => {
                    if last_attempt {
                        return GeocodeResult::failure(GeocodeStatus::RequestFailed, query_hash);
                    }
                    warn!(%error, attempt, "geocode transport failure, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
            };

            if !(200..300).contains(&response.status) {
                if RETRYABLE_HTTP.contains(&response.status) && !last_attempt {
                    warn!(
                        status = response.status,
                        attempt, "retryable geocode HTTP error"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
                return GeocodeResult::failure(
                    GeocodeStatus::Http(response.status),
                    query_hash,
                );
            }

            let payload: ProviderResponse = match serde_json::from_str(&response.body) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(%error, "geocode response did not parse");
                    return GeocodeResult::failure(
                        GeocodeStatus::MalformedResponse,
                        query_hash,
                    );
                }
            };

            if payload.status == "OVER_QUERY_LIMIT" && !last_attempt {
                warn!(attempt, "provider over query limit, retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            let first = payload.results.into_iter().next();
            let result = GeocodeResult::from_provider(&payload.status, first, query_hash);

            if result.status.is_ok() {
                if let Some(cache) = &self.cache {
                    let entry = CacheEntry {
                        query_hash: result.query_hash.clone(),
                        query: query.to_string(),
                        place_id: result.place_id.clone(),
                        lat: result.lat,
                        lng: result.lng,
                        formatted_address: result.formatted_address.clone(),
                        location_type: result.location_type.clone(),
                        partial_match: result.partial_match,
                        cached_at: Utc::now(),
                    };
                    if let Err(error) = cache.put(&entry).await {
                        warn!(%error, "geocode cache write failed, skipping");
                    }
                }
            }

            return result;
        }

        GeocodeResult::failure(GeocodeStatus::OverQueryLimit, query_hash)
    }
}
