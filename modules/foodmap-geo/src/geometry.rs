//! GeoJSON polygon geometry and ray-casting containment.
//!
//! Containment is boundary-inclusive: a point exactly on an edge (within
//! tolerance) is classified as contained before the even-odd count runs.
//! Points on a shared border between adjacent neighborhoods therefore land
//! deterministically in whichever boundary is tested first.

use serde::{Deserialize, Serialize};

/// `[lng, lat]`, GeoJSON axis order.
pub type Position = [f64; 2];

/// Closed ring of positions; the last vertex connects back to the first.
pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Outer ring followed by optional hole rings.
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

const EPS: f64 = 1e-12;

impl Geometry {
    /// Lenient parse of a GeoJSON geometry value; unsupported geometry
    /// types (or null) yield `None` rather than an error.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        match self {
            Geometry::Polygon(rings) => polygon_contains(lng, lat, rings),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .any(|rings| polygon_contains(lng, lat, rings)),
        }
    }
}

/// Inside the outer ring and outside every hole ring.
fn polygon_contains(lng: f64, lat: f64, rings: &[Ring]) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    if !ring_contains(lng, lat, outer) {
        return false;
    }
    !rings[1..].iter().any(|hole| ring_contains(lng, lat, hole))
}

/// Even-odd ray cast over the ring's edges, with an edge test first so
/// boundary points are contained rather than subject to crossing parity.
fn ring_contains(lng: f64, lat: f64, ring: &[Position]) -> bool {
    if ring.len() < 4 {
        return false;
    }

    let mut inside = false;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];

        if point_on_segment(lng, lat, a, b) {
            return true;
        }

        let [x1, y1] = a;
        let [x2, y2] = b;

        let intersects =
            ((y1 > lat) != (y2 > lat)) && (lng < (x2 - x1) * (lat - y1) / (y2 - y1) + x1);
        if intersects {
            inside = !inside;
        }
    }
    inside
}

/// Collinear-within-tolerance and inside the segment bounds. A degenerate
/// (near-zero length) edge degrades to a point-equality test.
fn point_on_segment(lng: f64, lat: f64, a: Position, b: Position) -> bool {
    let [ax, ay] = a;
    let [bx, by] = b;
    let squared_len = (bx - ax) * (bx - ax) + (by - ay) * (by - ay);
    if squared_len <= EPS {
        return (lng - ax) * (lng - ax) + (lat - ay) * (lat - ay) <= EPS;
    }

    let cross = (lng - ax) * (by - ay) - (lat - ay) * (bx - ax);
    if cross.abs() > EPS {
        return false;
    }
    let dot = (lng - ax) * (bx - ax) + (lat - ay) * (by - ay);
    if dot < -EPS {
        return false;
    }
    if dot - squared_len > EPS {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Geometry {
        Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]])
    }

    #[test]
    fn interior_point_is_contained() {
        assert!(unit_square().contains(0.5, 0.5));
    }

    #[test]
    fn exterior_point_is_not_contained() {
        assert!(!unit_square().contains(1.5, 0.5));
        assert!(!unit_square().contains(-0.1, 0.5));
    }

    #[test]
    fn boundary_point_is_contained() {
        // edges and vertices are inclusive
        assert!(unit_square().contains(0.0, 0.5));
        assert!(unit_square().contains(0.5, 1.0));
        assert!(unit_square().contains(1.0, 1.0));
    }

    #[test]
    fn hole_excludes_point() {
        let donut = Geometry::Polygon(vec![
            vec![
                [0.0, 0.0],
                [4.0, 0.0],
                [4.0, 4.0],
                [0.0, 4.0],
                [0.0, 0.0],
            ],
            vec![
                [1.0, 1.0],
                [3.0, 1.0],
                [3.0, 3.0],
                [1.0, 3.0],
                [1.0, 1.0],
            ],
        ]);
        assert!(donut.contains(0.5, 0.5));
        assert!(!donut.contains(2.0, 2.0));
        // a point on the hole's edge is inside the hole ring, so excluded
        assert!(!donut.contains(1.0, 2.0));
    }

    #[test]
    fn multipolygon_contains_when_any_member_does() {
        let two_squares = Geometry::MultiPolygon(vec![
            vec![vec![
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 1.0],
                [0.0, 0.0],
            ]],
            vec![vec![
                [5.0, 5.0],
                [6.0, 5.0],
                [6.0, 6.0],
                [5.0, 6.0],
                [5.0, 5.0],
            ]],
        ]);
        assert!(two_squares.contains(0.5, 0.5));
        assert!(two_squares.contains(5.5, 5.5));
        assert!(!two_squares.contains(3.0, 3.0));
    }

    #[test]
    fn degenerate_ring_contains_nothing() {
        let line = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]);
        assert!(!line.contains(0.5, 0.5));
    }

    #[test]
    fn parses_geojson_geometry() {
        let value = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
        });
        let geometry = Geometry::from_value(&value).unwrap();
        assert!(geometry.contains(0.5, 0.5));

        assert!(Geometry::from_value(&serde_json::json!({"type": "Point", "coordinates": [0, 0]}))
            .is_none());
        assert!(Geometry::from_value(&serde_json::Value::Null).is_none());
    }
}
