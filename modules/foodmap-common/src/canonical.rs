//! Text and field canonicalization shared by every source pipeline.
//!
//! Everything here is a pure string function. The content hash feeds both
//! the dedupe key and the geocode cache key, so it must stay byte-stable
//! across runs: plain ASCII-insensitive lowercasing, whitespace collapse,
//! and a fixed `|` separator.

use sha2::{Digest, Sha256};

/// Collapse runs of whitespace to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim a raw cell value; empty or missing becomes `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let text = value?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Title-case a city name: any letter following a non-letter is uppercased,
/// the rest lowercased. "south end" -> "South End", "o'brien" -> "O'Brien".
pub fn title_case_city(city: &str) -> String {
    let collapsed = collapse_whitespace(city);
    let mut out = String::with_capacity(collapsed.len());
    let mut prev_alpha = false;
    for ch in collapsed.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Clean a city cell into `(city_raw, city_norm)`. Source data sometimes
/// carries a trailing slash ("Roxbury/"); strip it before casing.
pub fn normalize_city(value: Option<&str>) -> (Option<String>, Option<String>) {
    let raw = match clean_text(value) {
        Some(r) => r,
        None => return (None, None),
    };
    let cleaned = collapse_whitespace(raw.trim_end_matches('/').trim());
    if cleaned.is_empty() {
        return (None, None);
    }
    let norm = title_case_city(&cleaned);
    (Some(cleaned), Some(norm))
}

/// Normalize a zip to exactly five digits: keep the first five when longer
/// (drops +4 suffixes), left-pad with zeros when shorter. No digits -> None.
pub fn normalize_zip(value: Option<&str>) -> Option<String> {
    let raw = clean_text(value)?;
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.len() >= 5 {
        Some(digits[..5].to_string())
    } else {
        Some(format!("{digits:0>5}"))
    }
}

/// Normalize a US phone to E.164. Unparseable numbers keep both the digit
/// run and the raw input in a tagged fallback so nothing is silently lost.
pub fn normalize_phone(value: Option<&str>) -> Option<String> {
    let raw = clean_text(value)?;
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        return Some(format!("+1{digits}"));
    }
    if digits.len() == 11 && digits.starts_with('1') {
        return Some(format!("+{digits}"));
    }
    if !digits.is_empty() {
        return Some(format!("digits:{digits};raw:{raw}"));
    }
    Some(raw)
}

/// Websites exported without a scheme ("www.example.org") get https.
pub fn normalize_website(value: Option<&str>) -> Option<String> {
    let raw = clean_text(value)?;
    if raw.to_lowercase().starts_with("www.") {
        Some(format!("https://{raw}"))
    } else {
        Some(raw)
    }
}

/// One part of a content-hash input: collapsed and lowercased.
pub fn canonical_key_part(value: &str) -> String {
    collapse_whitespace(value).to_lowercase()
}

/// Deterministic SHA-256 over canonicalized parts joined with `|`.
/// Identity function for dedupe keys and geocode cache keys.
pub fn content_hash(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .map(|p| canonical_key_part(p))
        .collect::<Vec<_>>()
        .join("|");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Slug for machine subtypes: lowercase, `&` -> "and", non-alphanumeric
/// runs -> `_`, trimmed. "Soup Kitchen & Pantry" -> "soup_kitchen_and_pantry".
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace('&', " and ");
    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Join key for neighborhood names: lowercase, non-alphanumeric runs become
/// a single space. Punctuation/case variants of the same name collide.
pub fn canonical_name(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(' ');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Dedupe-key prefix derived from a source name: lowercase alphanumerics
/// only. "MassGrown" -> "massgrown".
pub fn source_prefix(source_name: &str) -> String {
    source_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
