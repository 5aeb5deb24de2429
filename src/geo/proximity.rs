use super::coordinate::Coordinate;

/// Anything that sits at a fixed position
pub trait Located {
    fn location(&self) -> Coordinate;
}

impl Located for Coordinate {
    fn location(&self) -> Coordinate {
        *self
    }
}

/// A record within range of the observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearby<'a, T> {
    pub record: &'a T,
    /// Great-circle distance from the observer in kilometres
    pub distance_km: f64,
}

/// Distance filter over a flat collection of located records
///
/// Stateless: every query scans the whole collection.
pub struct ProximityIndex;

impl ProximityIndex {
    /// Find every record within `radius_km` of `observer` (boundary inclusive)
    ///
    /// Results are ordered by distance, nearest first. Records at equal
    /// distance keep their collection order. A non-positive or non-finite
    /// radius yields nothing.
    pub fn query<'a, T: Located>(
        observer: Coordinate,
        radius_km: f64,
        records: &'a [T],
    ) -> Vec<Nearby<'a, T>> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Vec::new();
        }

        let mut nearby: Vec<Nearby<'a, T>> = records
            .iter()
            .map(|record| Nearby {
                record,
                distance_km: observer.distance_km(&record.location()),
            })
            .filter(|candidate| candidate.distance_km <= radius_km)
            .collect();

        // stable sort keeps collection order for ties
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        nearby
    }
}
