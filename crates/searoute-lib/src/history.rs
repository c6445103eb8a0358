//! Append-only log of route computations.
//!
//! Every call to [`RouteHistoryService::save`] appends a new entry. The dedup
//! fingerprint is stored for downstream consumers but never used to reject or
//! merge writes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::audit::{AuditEvent, AuditSink};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::port::PortId;
use crate::repository::HistoryRepository;

/// Numeric storage identifier for a history entry.
pub type HistoryId = i64;

/// Metadata schema version stamped on every entry unless the caller overrides it.
pub const HISTORY_SCHEMA_VERSION: i64 = 1;

/// Outcome recorded for a computation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteHistoryStatus {
    Success,
    NoViableRoute,
    Cancelled,
}

impl RouteHistoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteHistoryStatus::Success => "SUCCESS",
            RouteHistoryStatus::NoViableRoute => "NO_VIABLE_ROUTE",
            RouteHistoryStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for RouteHistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteHistoryStatus {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SUCCESS" => Ok(RouteHistoryStatus::Success),
            "NO_VIABLE_ROUTE" => Ok(RouteHistoryStatus::NoViableRoute),
            "CANCELLED" => Ok(RouteHistoryStatus::Cancelled),
            other => Err(format!("unknown history status '{other}'")),
        }
    }
}

/// What triggered the computation that produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteHistorySource {
    Auto,
    #[default]
    Manual,
    OperatorOverride,
}

impl RouteHistorySource {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteHistorySource::Auto => "AUTO",
            RouteHistorySource::Manual => "MANUAL",
            RouteHistorySource::OperatorOverride => "OPERATOR_OVERRIDE",
        }
    }
}

impl fmt::Display for RouteHistorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteHistorySource {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "AUTO" => Ok(RouteHistorySource::Auto),
            "MANUAL" => Ok(RouteHistorySource::Manual),
            "OPERATOR_OVERRIDE" => Ok(RouteHistorySource::OperatorOverride),
            other => Err(format!("unknown history source '{other}'")),
        }
    }
}

/// A persisted record of one computation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHistory {
    pub id: Option<HistoryId>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub route_id: Option<String>,
    pub origin_port_id: Option<PortId>,
    pub origin_port_name: Option<String>,
    pub destination_port_id: Option<PortId>,
    pub destination_port_name: Option<String>,
    pub waypoint_port_ids: Vec<PortId>,
    pub avoided_port_ids: Vec<PortId>,
    pub computed_at: DateTime<Utc>,
    pub engine_version: Option<String>,
    pub total_distance_km: Option<f64>,
    pub duration_estimate: Option<f64>,
    pub cost_estimate: Option<f64>,
    pub status: RouteHistoryStatus,
    pub source: RouteHistorySource,
    pub notes: Option<String>,
    pub path_encoding: Option<String>,
    pub geojson: Option<Value>,
    pub dedup_hash: String,
    pub archived: bool,
    pub metadata: Map<String, Value>,
}

/// Caller-supplied details attached to a computation for history purposes.
///
/// History is only written when `user_id` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryContext {
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    pub source: Option<RouteHistorySource>,
    pub route_id: Option<String>,
    pub engine_version: Option<String>,
    pub duration_estimate: Option<f64>,
    pub cost_estimate: Option<f64>,
    pub notes: Option<String>,
    pub path_encoding: Option<String>,
    pub geojson: Option<Value>,
    pub metadata: Map<String, Value>,
}

impl HistoryContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn source(mut self, source: RouteHistorySource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn route(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn should_persist(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Everything needed to append an entry; the store fills in the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryRecord {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub route_id: Option<String>,
    pub origin_port_id: Option<PortId>,
    pub origin_port_name: Option<String>,
    pub destination_port_id: Option<PortId>,
    pub destination_port_name: Option<String>,
    pub waypoint_port_ids: Vec<PortId>,
    pub avoided_port_ids: Vec<PortId>,
    pub total_distance_km: Option<f64>,
    pub duration_estimate: Option<f64>,
    pub cost_estimate: Option<f64>,
    pub status: Option<RouteHistoryStatus>,
    pub source: Option<RouteHistorySource>,
    pub notes: Option<String>,
    pub engine_version: Option<String>,
    pub path_encoding: Option<String>,
    pub geojson: Option<Value>,
    pub metadata: Map<String, Value>,
}

/// Filters for [`RouteHistoryService::find_history`]. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryQuery {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub route_id: Option<String>,
    pub status: Option<RouteHistoryStatus>,
    pub source: Option<RouteHistorySource>,
    pub archived: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Zero-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub const DEFAULT_SIZE: u32 = 20;

    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    fn clamp(self, max_size: u32) -> Self {
        Self {
            page: self.page,
            size: self.size.clamp(1, max_size.max(1)),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SIZE)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }
}

/// Content hash over the defining fields of a computation.
///
/// Waypoint and avoided ids are sorted before hashing and the timestamp is
/// truncated to the minute, so the same inputs within the same minute always
/// produce the same fingerprint.
pub fn dedup_fingerprint(
    origin: Option<PortId>,
    destination: Option<PortId>,
    waypoints: &[PortId],
    avoided: &[PortId],
    computed_at: DateTime<Utc>,
) -> String {
    let minute = computed_at
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(computed_at);
    let payload = [
        origin.map(|id| id.to_string()).unwrap_or_default(),
        destination.map(|id| id.to_string()).unwrap_or_default(),
        join_sorted(waypoints),
        join_sorted(avoided),
        minute.to_rfc3339_opts(SecondsFormat::Secs, true),
    ]
    .join("|");
    hex::encode(Sha256::digest(payload.as_bytes()))
}

fn join_sorted(ids: &[PortId]) -> String {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Application service over a [`HistoryRepository`].
pub struct RouteHistoryService {
    repository: Arc<dyn HistoryRepository>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    max_page_size: u32,
}

impl RouteHistoryService {
    pub fn new(
        repository: Arc<dyn HistoryRepository>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            repository,
            clock,
            audit,
            max_page_size: 200,
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Append a new entry stamped with the current time.
    pub fn save(&self, record: HistoryRecord) -> Result<RouteHistory> {
        let computed_at = self.clock.now();
        let status = record.status.unwrap_or(RouteHistoryStatus::Success);
        let source = record.source.unwrap_or_default();
        let dedup_hash = dedup_fingerprint(
            record.origin_port_id,
            record.destination_port_id,
            &record.waypoint_port_ids,
            &record.avoided_port_ids,
            computed_at,
        );
        let avoided_count = record.avoided_port_ids.len();

        let mut entry = RouteHistory {
            id: None,
            tenant_id: record.tenant_id,
            user_id: record.user_id,
            route_id: record.route_id,
            origin_port_id: record.origin_port_id,
            origin_port_name: record.origin_port_name,
            destination_port_id: record.destination_port_id,
            destination_port_name: record.destination_port_name,
            waypoint_port_ids: record.waypoint_port_ids,
            avoided_port_ids: record.avoided_port_ids,
            computed_at,
            engine_version: record.engine_version,
            total_distance_km: record.total_distance_km,
            duration_estimate: record.duration_estimate,
            cost_estimate: record.cost_estimate,
            status,
            source,
            notes: record.notes,
            path_encoding: record.path_encoding,
            geojson: record.geojson,
            dedup_hash,
            archived: false,
            metadata: merge_metadata(record.metadata),
        };

        let id = self.repository.insert(&entry)?;
        entry.id = Some(id);

        metrics::counter!("route_history_saved_total", "status" => status.as_str()).increment(1);
        self.audit.record(AuditEvent::HistorySaved {
            history_id: id,
            route_id: entry.route_id.clone(),
            user_id: entry.user_id.clone(),
            status,
            avoided_count,
        });
        Ok(entry)
    }

    /// Filtered, paged listing ordered by `computed_at` descending.
    pub fn find_history(&self, query: &HistoryQuery, page: PageRequest) -> Result<Page<RouteHistory>> {
        metrics::counter!("route_history_list_requests_total").increment(1);
        let page = page.clamp(self.max_page_size);
        debug!(page = page.page, size = page.size, "searching route history");
        self.repository.search(query, page)
    }

    pub fn find_by_id(&self, id: HistoryId) -> Result<Option<RouteHistory>> {
        self.repository.find_by_id(id)
    }

    /// Mark an entry archived, optionally replacing its notes.
    ///
    /// Archiving an already archived entry returns it unchanged.
    pub fn archive(
        &self,
        id: HistoryId,
        notes: Option<&str>,
        actor: Option<&str>,
    ) -> Result<RouteHistory> {
        let mut entry = self
            .repository
            .find_by_id(id)?
            .ok_or(Error::HistoryNotFound { id })?;
        if entry.archived {
            return Ok(entry);
        }

        entry.archived = true;
        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            entry.notes = Some(notes.to_string());
        }
        self.repository.update(&entry)?;
        self.audit.record(AuditEvent::HistoryArchived {
            history_id: id,
            actor: actor.map(str::to_string),
        });
        Ok(entry)
    }
}

fn merge_metadata(metadata: Map<String, Value>) -> Map<String, Value> {
    let mut merged = metadata;
    merged
        .entry("schemaVersion")
        .or_insert(Value::from(HISTORY_SCHEMA_VERSION));
    merged
}
