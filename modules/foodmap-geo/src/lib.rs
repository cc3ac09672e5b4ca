//! Neighborhood assignment: named polygon boundaries joined to a stable
//! integer ID space, with boundary-inclusive point-in-polygon containment.

pub mod geometry;
pub mod mapper;

pub use geometry::Geometry;
pub use mapper::{NeighborhoodFeature, NeighborhoodIndex};
