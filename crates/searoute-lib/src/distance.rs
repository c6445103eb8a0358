//! Edge weights between ports: documented lane distance first, great-circle
//! distance otherwise.

use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::port::{Coordinates, Port};
use crate::repository::LaneLookup;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometres.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = (to.latitude - from.latitude).to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Where a segment distance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceSource {
    Documented,
    GreatCircle,
}

/// Resolves segment and path distances against the documented lane set.
#[derive(Clone)]
pub struct DistanceResolver {
    lanes: Arc<dyn LaneLookup>,
}

impl DistanceResolver {
    pub fn new(lanes: Arc<dyn LaneLookup>) -> Self {
        Self { lanes }
    }

    /// Distance between two adjacent ports and the source it was taken from.
    pub fn segment(&self, from: &Port, to: &Port) -> Result<(f64, DistanceSource)> {
        if let Some(lane) = self.lanes.find_by_endpoints(&from.name, &to.name)? {
            return Ok((lane.distance_km, DistanceSource::Documented));
        }

        let km = haversine_km(from.coordinates, to.coordinates);
        warn!(
            from = %from.name,
            to = %to.name,
            km,
            "no documented lane distance; using great-circle fallback"
        );
        Ok((km, DistanceSource::GreatCircle))
    }

    /// Sum of segment distances along `path`. Paths shorter than two ports are 0 km.
    pub fn total_distance(&self, path: &[Port]) -> Result<f64> {
        let mut total = 0.0;
        for pair in path.windows(2) {
            let (km, _) = self.segment(&pair[0], &pair[1])?;
            total += km;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lane::Lane;
    use crate::port::PortKey;
    use crate::repository::LaneWriter;
    use crate::store::SqliteStore;

    fn port(name: &str, lat: f64, lon: f64) -> Port {
        Port::new(name, "Pacific", Coordinates::new(lat, lon))
    }

    #[test]
    fn haversine_matches_known_distance() {
        // New York to London, roughly 5570 km.
        let km = haversine_km(
            Coordinates::new(40.7128, -74.0060),
            Coordinates::new(51.5074, -0.1278),
        );
        assert!((km - 5570.0).abs() < 50.0);
        assert!(haversine_km(Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 0.0)) < 1e-9);
    }

    #[test]
    fn documented_distance_wins_in_either_direction() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store
            .insert_lane(&Lane::new(
                PortKey::new("Callao", "Pacific"),
                PortKey::new("Honolulu", "Pacific"),
                10140.0,
            ))
            .unwrap();
        let resolver = DistanceResolver::new(store);

        let callao = port("Callao", -12.05, -77.13);
        let honolulu = port("Honolulu", 21.31, -157.86);
        assert_eq!(
            resolver.segment(&honolulu, &callao).unwrap(),
            (10140.0, DistanceSource::Documented)
        );
    }

    #[test]
    fn missing_lane_falls_back_to_great_circle() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let resolver = DistanceResolver::new(store);
        let a = port("A", 0.0, 0.0);
        let b = port("B", 0.0, 1.0);

        let (km, source) = resolver.segment(&a, &b).unwrap();
        assert_eq!(source, DistanceSource::GreatCircle);
        assert!((km - 111.19).abs() < 0.1);
        assert_eq!(resolver.total_distance(&[a.clone()]).unwrap(), 0.0);
        assert!((resolver.total_distance(&[a.clone(), b, a]).unwrap() - 2.0 * km).abs() < 1e-9);
    }
}
