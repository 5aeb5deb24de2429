use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius used for all distance calculations
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS-84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting out-of-range or non-finite values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let coordinate = Self {
            latitude,
            longitude,
        };

        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(Error::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in kilometres
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(*self, *other)
    }
}

/// Great-circle distance between two coordinates in kilometres
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push near-antipodal points just past 1
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let here = Coordinate::new(37.7749, -122.4194).unwrap();
        assert_eq!(haversine_km(here, here), 0.0);
    }

    #[test]
    fn test_short_distance_in_san_francisco() {
        let a = Coordinate::new(37.7749, -122.4194).unwrap();
        let b = Coordinate::new(37.7750, -122.4195).unwrap();

        let d = haversine_km(a, b);
        assert!((d - 0.0141).abs() < 0.001, "expected ~0.014 km, got {}", d);
    }

    #[test]
    fn test_long_distance_from_null_island() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(10.0, 10.0).unwrap();

        let d = haversine_km(a, b);
        assert!((d - 1568.5).abs() < 2.0, "expected ~1568 km, got {}", d);
    }

    #[test]
    fn test_antipodes_are_half_circumference_apart() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(0.0, 180.0).unwrap();

        let d = haversine_km(a, b);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    fn coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(latitude, longitude)| Coordinate {
            latitude,
            longitude,
        })
    }

    proptest! {
        #[test]
        fn haversine_is_symmetric(a in coordinate(), b in coordinate()) {
            let ab = haversine_km(a, b);
            let ba = haversine_km(b, a);
            prop_assert!((ab - ba).abs() < 1e-9, "{} != {}", ab, ba);
        }

        #[test]
        fn haversine_is_bounded(a in coordinate(), b in coordinate()) {
            let d = haversine_km(a, b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }

        #[test]
        fn haversine_to_self_is_zero(a in coordinate()) {
            prop_assert_eq!(haversine_km(a, a), 0.0);
        }
    }
}
