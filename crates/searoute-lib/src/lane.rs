//! Documented shipping lanes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::port::PortKey;

/// Numeric storage identifier for a lane. Stored lanes double as the route
/// identifiers used by recalculation.
pub type LaneId = i64;

/// An immutable, undirected connection between two ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: Option<LaneId>,
    pub from: PortKey,
    pub to: PortKey,
    pub distance_km: f64,
}

impl Lane {
    pub fn new(from: PortKey, to: PortKey, distance_km: f64) -> Self {
        Self {
            id: None,
            from,
            to,
            distance_km,
        }
    }

    pub fn with_id(mut self, id: LaneId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether this lane joins the two named ports, in either direction.
    pub fn connects(&self, name_a: &str, name_b: &str) -> bool {
        (self.from.name == name_a && self.to.name == name_b)
            || (self.from.name == name_b && self.to.name == name_a)
    }
}

/// Input for registering a new lane.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewLane {
    pub from: PortKey,
    pub to: PortKey,
    pub distance_km: f64,
}

impl NewLane {
    pub fn validate(&self) -> Result<()> {
        if !self.distance_km.is_finite() || self.distance_km < 0.0 {
            return Err(Error::InvalidLane {
                message: format!(
                    "distance {} between {} and {} must be a non-negative number",
                    self.distance_km, self.from, self.to
                ),
            });
        }
        if self.from == self.to {
            return Err(Error::InvalidLane {
                message: format!("lane endpoints must differ ({})", self.from),
            });
        }
        Ok(())
    }

    pub fn into_lane(self) -> Lane {
        Lane::new(self.from, self.to, self.distance_km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane() -> NewLane {
        NewLane {
            from: PortKey::new("Callao", "South America"),
            to: PortKey::new("Honolulu", "Oceania"),
            distance_km: 10_140.0,
        }
    }

    #[test]
    fn connects_is_symmetric() {
        let lane = lane().into_lane();
        assert!(lane.connects("Callao", "Honolulu"));
        assert!(lane.connects("Honolulu", "Callao"));
        assert!(!lane.connects("Callao", "Yokohama"));
    }

    #[test]
    fn negative_or_nan_distance_is_rejected() {
        let mut bad = lane();
        bad.distance_km = -1.0;
        assert!(bad.validate().is_err());
        bad.distance_km = f64::NAN;
        assert!(bad.validate().is_err());
        assert!(lane().validate().is_ok());
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut bad = lane();
        bad.to = bad.from.clone();
        assert!(bad.validate().is_err());
    }
}
