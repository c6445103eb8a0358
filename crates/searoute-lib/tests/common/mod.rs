#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use searoute_lib::repository::{LaneWriter, PortWriter};
use searoute_lib::{
    Coordinates, FixedClock, HistoryContext, Lane, LaneId, MemoryAuditSink, PopularityTracker,
    Port, PortFilter, PortId, PortKey, PortRegistry, RouteHistoryService, RouteService,
    SqliteStore,
};

pub const CALLAO: (&str, &str, f64, f64) = ("Callao", "South America", -12.05, -77.13);
pub const HONOLULU: (&str, &str, f64, f64) = ("Honolulu", "Oceania", 21.31, -157.86);
pub const YOKOHAMA: (&str, &str, f64, f64) = ("Yokohama", "Asia", 35.45, 139.65);
pub const PAGO_PAGO: (&str, &str, f64, f64) = ("Pago Pago", "Oceania", -14.28, -170.70);

/// An in-memory store seeded with four Pacific ports and no lanes, plus every
/// service wired against it.
pub struct Fixture {
    pub store: Arc<SqliteStore>,
    pub clock: Arc<FixedClock>,
    pub audit: Arc<MemoryAuditSink>,
    pub registry: PortRegistry,
    pub history: Arc<RouteHistoryService>,
    pub popularity: Arc<PopularityTracker>,
    pub service: RouteService,
    ids: HashMap<&'static str, PortId>,
    continents: HashMap<&'static str, &'static str>,
}

impl Fixture {
    pub fn pacific() -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().expect("in-memory store opens"));
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 15, 0).unwrap(),
        ));
        let audit = Arc::new(MemoryAuditSink::new());

        let mut ids = HashMap::new();
        let mut continents = HashMap::new();
        for (name, continent, lat, lon) in [CALLAO, HONOLULU, YOKOHAMA, PAGO_PAGO] {
            let id = store
                .insert_port(&Port::new(name, continent, Coordinates::new(lat, lon)))
                .expect("port inserts");
            ids.insert(name, id);
            continents.insert(name, continent);
        }

        let registry = PortRegistry::new(store.clone(), clock.clone(), audit.clone());
        let history = Arc::new(RouteHistoryService::new(
            store.clone(),
            clock.clone(),
            audit.clone(),
        ));
        let popularity = Arc::new(PopularityTracker::new(store.clone(), clock.clone()));
        let service = RouteService::new(store.clone(), store.clone())
            .with_history(history.clone())
            .with_popularity(popularity.clone())
            .with_audit_sink(audit.clone())
            .with_engine_version("test-engine");

        Self {
            store,
            clock,
            audit,
            registry,
            history,
            popularity,
            service,
            ids,
            continents,
        }
    }

    /// Callao–Honolulu–Yokohama only.
    pub fn via_honolulu() -> Self {
        let fixture = Self::pacific();
        fixture.lane("Callao", "Honolulu", 10140.0);
        fixture.lane("Honolulu", "Yokohama", 6200.0);
        fixture
    }

    /// Adds the longer Callao–Pago Pago–Yokohama alternative.
    pub fn with_alternate() -> Self {
        let fixture = Self::via_honolulu();
        fixture.lane("Callao", "Pago Pago", 10800.0);
        fixture.lane("Pago Pago", "Yokohama", 7700.0);
        fixture
    }

    pub fn id(&self, name: &str) -> PortId {
        *self.ids.get(name).expect("fixture port exists")
    }

    pub fn key(&self, name: &str) -> PortKey {
        let continent = self.continents.get(name).expect("fixture port exists");
        PortKey::new(name, *continent)
    }

    pub fn lane(&self, from: &str, to: &str, km: f64) -> LaneId {
        self.store
            .insert_lane(&Lane::new(self.key(from), self.key(to), km))
            .expect("lane inserts")
    }

    pub fn disable(&self, name: &str) {
        self.registry
            .disable(self.id(name), Some("maintenance"), Some("harbour-master"))
            .expect("port disables");
    }

    pub fn disabled_count(&self) -> usize {
        self.registry
            .list(PortFilter::Disabled)
            .expect("ports list")
            .len()
    }

    pub fn user(&self) -> HistoryContext {
        HistoryContext::for_user("ana").tenant("acme")
    }
}
