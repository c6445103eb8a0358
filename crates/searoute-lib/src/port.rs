//! Port registry domain types.
//!
//! A port carries two distinct identities: the storage id assigned once by the
//! registry, and the business key (name, continent) used to resolve documented
//! lanes. The two are never compared against each other; [`Port`] deliberately
//! does not implement `PartialEq`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Numeric storage identifier for a port.
pub type PortId = i64;

/// Business identity of a port used to join documented lanes to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortKey {
    pub name: String,
    pub continent: String,
}

impl PortKey {
    pub fn new(name: impl Into<String>, continent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            continent: continent.into(),
        }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.continent)
    }
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite and inside the valid degree ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidPort {
                message: format!("latitude {} is outside -90..=90", self.latitude),
            });
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidPort {
                message: format!("longitude {} is outside -180..=180", self.longitude),
            });
        }
        Ok(())
    }
}

/// Why and by whom a port was taken out of service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisabledState {
    pub reason: Option<String>,
    pub actor: Option<String>,
    pub at: DateTime<Utc>,
}

/// A registered port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: Option<PortId>,
    pub name: String,
    pub continent: String,
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<DisabledState>,
}

impl Port {
    pub fn new(
        name: impl Into<String>,
        continent: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            continent: continent.into(),
            coordinates,
            disabled: None,
        }
    }

    pub fn with_id(mut self, id: PortId) -> Self {
        self.id = Some(id);
        self
    }

    /// Business identity of this port.
    pub fn key(&self) -> PortKey {
        PortKey::new(self.name.clone(), self.continent.clone())
    }

    /// Whether this port shares its business identity with `key`.
    pub fn matches_key(&self, key: &PortKey) -> bool {
        self.name == key.name && self.continent == key.continent
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.is_some()
    }

    /// Take the port out of service and return the audit transition.
    pub fn disable(
        &mut self,
        reason: Option<String>,
        actor: Option<String>,
        at: DateTime<Utc>,
    ) -> AvailabilityTransition {
        let was_disabled = self.is_disabled();
        self.disabled = Some(DisabledState {
            reason: reason.clone(),
            actor: actor.clone(),
            at,
        });
        AvailabilityTransition {
            port_id: self.id,
            was_disabled,
            now_disabled: true,
            reason,
            actor,
            at,
        }
    }

    /// Return the port to service, clearing any disabled stamp.
    pub fn enable(&mut self, actor: Option<String>, at: DateTime<Utc>) -> AvailabilityTransition {
        let previous = self.disabled.take();
        AvailabilityTransition {
            port_id: self.id,
            was_disabled: previous.is_some(),
            now_disabled: false,
            reason: previous.and_then(|state| state.reason),
            actor,
            at,
        }
    }
}

/// Record of a single enable/disable transition.
///
/// For enable transitions `reason` holds the reason that was cleared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityTransition {
    pub port_id: Option<PortId>,
    pub was_disabled: bool,
    pub now_disabled: bool,
    pub reason: Option<String>,
    pub actor: Option<String>,
    pub at: DateTime<Utc>,
}

/// Input for registering a new port.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPort {
    pub name: String,
    pub continent: String,
    pub coordinates: Coordinates,
}

impl NewPort {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidPort {
                message: "name must not be empty".to_string(),
            });
        }
        if self.continent.trim().is_empty() {
            return Err(Error::InvalidPort {
                message: format!("continent for {} must not be empty", self.name),
            });
        }
        self.coordinates.validate()
    }

    pub fn into_port(self) -> Port {
        Port::new(self.name, self.continent, self.coordinates)
    }
}

/// Return up to `limit` registered port names similar to `query`.
pub fn fuzzy_port_matches<'a, I>(names: I, query: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    const THRESHOLD: f64 = 0.8;
    let needle = query.to_lowercase();
    let mut scored: Vec<(f64, &str)> = names
        .into_iter()
        .map(|name| (strsim::jaro_winkler(&needle, &name.to_lowercase()), name))
        .filter(|(score, _)| *score >= THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callao() -> Port {
        Port::new("Callao", "South America", Coordinates::new(-12.05, -77.13)).with_id(1)
    }

    #[test]
    fn key_ignores_storage_id() {
        let a = callao();
        let b = Port::new("Callao", "South America", Coordinates::new(0.0, 0.0)).with_id(99);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.id, b.id);
        assert!(b.matches_key(&a.key()));
    }

    #[test]
    fn disable_then_enable_clears_stamp() {
        let mut port = callao();
        let now = Utc::now();
        let disabled = port.disable(Some("strike".into()), Some("ops".into()), now);
        assert!(!disabled.was_disabled);
        assert!(disabled.now_disabled);
        assert!(port.is_disabled());

        let enabled = port.enable(Some("ops".into()), now);
        assert!(enabled.was_disabled);
        assert!(!enabled.now_disabled);
        assert_eq!(enabled.reason.as_deref(), Some("strike"));
        assert!(port.disabled.is_none());
    }

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        assert!(Coordinates::new(91.0, 0.0).validate().is_err());
        assert!(Coordinates::new(0.0, -181.0).validate().is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).validate().is_err());
        assert!(Coordinates::new(-12.05, -77.13).validate().is_ok());
    }

    #[test]
    fn new_port_requires_name_and_continent() {
        let port = NewPort {
            name: " ".into(),
            continent: "Asia".into(),
            coordinates: Coordinates::new(0.0, 0.0),
        };
        assert!(port.validate().is_err());
    }

    #[test]
    fn fuzzy_matches_suggest_close_names() {
        let names = ["Callao", "Honolulu", "Yokohama", "Pago Pago"];
        let matches = fuzzy_port_matches(names.iter().copied(), "Calao", 3);
        assert_eq!(matches.first().map(String::as_str), Some("Callao"));
        assert!(fuzzy_port_matches(names.iter().copied(), "Zzzzqx", 3).is_empty());
    }
}
