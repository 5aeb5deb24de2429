//! Geospatial helpers
//!
//! Coordinates are WGS-84 degrees. Distances are great-circle kilometres
//! computed with the haversine formula.

mod coordinate;
mod proximity;

pub use coordinate::{haversine_km, Coordinate, EARTH_RADIUS_KM};
pub use proximity::{Located, Nearby, ProximityIndex};
