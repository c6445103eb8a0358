//! Port and lane administration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::audit::{AuditEvent, AuditSink};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::lane::{Lane, NewLane};
use crate::port::{fuzzy_port_matches, AvailabilityTransition, NewPort, Port, PortId, PortKey};
use crate::repository::RegistryStore;

/// Which ports [`PortRegistry::list`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortFilter {
    #[default]
    All,
    Enabled,
    Disabled,
}

impl PortFilter {
    fn matches(self, port: &Port) -> bool {
        match self {
            PortFilter::All => true,
            PortFilter::Enabled => !port.is_disabled(),
            PortFilter::Disabled => port.is_disabled(),
        }
    }
}

impl fmt::Display for PortFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PortFilter::All => "all",
            PortFilter::Enabled => "enabled",
            PortFilter::Disabled => "disabled",
        };
        f.write_str(value)
    }
}

impl FromStr for PortFilter {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(PortFilter::All),
            "enabled" => Ok(PortFilter::Enabled),
            "disabled" => Ok(PortFilter::Disabled),
            other => Err(format!("unknown port filter '{other}'")),
        }
    }
}

/// Administrative operations on the port and lane registries.
///
/// Every availability transition is stamped with the clock and reported to
/// the audit sink with its previous and new state.
pub struct PortRegistry {
    store: Arc<dyn RegistryStore>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl PortRegistry {
    pub fn new(
        store: Arc<dyn RegistryStore>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Register a new port. Its (name, continent) pair must not exist yet.
    pub fn register_port(&self, new_port: NewPort) -> Result<Port> {
        new_port.validate()?;
        let key = PortKey::new(new_port.name.trim(), new_port.continent.trim());
        if self.store.find_by_key(&key)?.is_some() {
            return Err(Error::DuplicatePort {
                name: key.name,
                continent: key.continent,
            });
        }

        let port = Port::new(key.name, key.continent, new_port.coordinates);
        let id = self.store.insert_port(&port)?;
        info!(port_id = id, name = %port.name, continent = %port.continent, "registered port");
        Ok(port.with_id(id))
    }

    pub fn get(&self, id: PortId) -> Result<Port> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| Error::unknown_port_id(id))
    }

    /// Resolve a port by business key, suggesting close names when it is unknown.
    pub fn find_by_key(&self, key: &PortKey) -> Result<Port> {
        if let Some(port) = self.store.find_by_key(key)? {
            return Ok(port);
        }
        let ports = self.store.all_ports()?;
        Err(Error::PortNotFound {
            query: key.to_string(),
            suggestions: fuzzy_port_matches(ports.iter().map(|p| p.name.as_str()), &key.name, 3),
        })
    }

    pub fn list(&self, filter: PortFilter) -> Result<Vec<Port>> {
        Ok(self
            .store
            .all_ports()?
            .into_iter()
            .filter(|port| filter.matches(port))
            .collect())
    }

    /// Take a port out of service. Disabling an already disabled port
    /// refreshes its stamp.
    pub fn disable(
        &self,
        id: PortId,
        reason: Option<&str>,
        actor: Option<&str>,
    ) -> Result<AvailabilityTransition> {
        let mut port = self.get(id)?;
        let transition = port.disable(
            reason.map(str::to_string),
            actor.map(str::to_string),
            self.clock.now(),
        );
        self.store.update_port(&port)?;

        self.audit.record(AuditEvent::PortDisabled {
            port_id: id,
            actor: transition.actor.clone(),
            reason: transition.reason.clone(),
            was_disabled: transition.was_disabled,
            at: transition.at,
        });
        Ok(transition)
    }

    /// Return a port to service, clearing its disabled stamp.
    pub fn enable(&self, id: PortId, actor: Option<&str>) -> Result<AvailabilityTransition> {
        let mut port = self.get(id)?;
        let transition = port.enable(actor.map(str::to_string), self.clock.now());
        self.store.update_port(&port)?;

        self.audit.record(AuditEvent::PortEnabled {
            port_id: id,
            actor: transition.actor.clone(),
            cleared_reason: transition.reason.clone(),
            was_disabled: transition.was_disabled,
            at: transition.at,
        });
        Ok(transition)
    }

    /// Delete a port. Lanes naming it stay and are skipped during graph building.
    pub fn remove(&self, id: PortId, actor: Option<&str>) -> Result<Port> {
        let port = self.get(id)?;
        if !self.store.delete_port(id)? {
            return Err(Error::unknown_port_id(id));
        }
        self.audit.record(AuditEvent::PortRemoved {
            port_id: id,
            actor: actor.map(str::to_string),
        });
        Ok(port)
    }

    /// Register a lane between two already registered ports.
    pub fn register_lane(&self, new_lane: NewLane) -> Result<Lane> {
        new_lane.validate()?;
        self.find_by_key(&new_lane.from)?;
        self.find_by_key(&new_lane.to)?;

        let lane = new_lane.into_lane();
        let id = self.store.insert_lane(&lane)?;
        info!(
            lane_id = id,
            from = %lane.from,
            to = %lane.to,
            distance_km = lane.distance_km,
            "registered lane"
        );
        Ok(lane.with_id(id))
    }

    /// Every lane in insertion order.
    pub fn list_lanes(&self) -> Result<Vec<Lane>> {
        self.store.all_lanes()
    }
}
