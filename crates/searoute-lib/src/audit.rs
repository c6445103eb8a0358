//! Audit events for state changes in the routing core.
//!
//! Services never write audit lines directly; they build an [`AuditEvent`] and
//! hand it to the injected [`AuditSink`]. [`TracingAuditSink`] turns events into
//! structured `info` lines on the `audit` target, [`MemoryAuditSink`] keeps them
//! for inspection.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::history::{HistoryId, RouteHistoryStatus};
use crate::lane::LaneId;
use crate::port::PortId;

/// A single auditable state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    PortDisabled {
        port_id: PortId,
        actor: Option<String>,
        reason: Option<String>,
        was_disabled: bool,
        at: DateTime<Utc>,
    },
    PortEnabled {
        port_id: PortId,
        actor: Option<String>,
        cleared_reason: Option<String>,
        was_disabled: bool,
        at: DateTime<Utc>,
    },
    PortRemoved {
        port_id: PortId,
        actor: Option<String>,
    },
    RouteRecalculated {
        route_id: LaneId,
        avoided_port_ids: Vec<PortId>,
    },
    HistorySaved {
        history_id: HistoryId,
        route_id: Option<String>,
        user_id: Option<String>,
        status: RouteHistoryStatus,
        avoided_count: usize,
    },
    HistoryArchived {
        history_id: HistoryId,
        actor: Option<String>,
    },
}

/// Receiver for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emit every event as a structured tracing line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match &event {
            AuditEvent::PortDisabled {
                port_id,
                actor,
                reason,
                was_disabled,
                at,
            } => info!(
                target: "audit",
                port_id,
                actor = actor.as_deref().unwrap_or("-"),
                reason = reason.as_deref().unwrap_or("-"),
                old_disabled = was_disabled,
                new_disabled = true,
                timestamp = %at,
                "port.disable"
            ),
            AuditEvent::PortEnabled {
                port_id,
                actor,
                cleared_reason,
                was_disabled,
                at,
            } => info!(
                target: "audit",
                port_id,
                actor = actor.as_deref().unwrap_or("-"),
                cleared_reason = cleared_reason.as_deref().unwrap_or("-"),
                old_disabled = was_disabled,
                new_disabled = false,
                timestamp = %at,
                "port.enable"
            ),
            AuditEvent::PortRemoved { port_id, actor } => info!(
                target: "audit",
                port_id,
                actor = actor.as_deref().unwrap_or("-"),
                "port.remove"
            ),
            AuditEvent::RouteRecalculated {
                route_id,
                avoided_port_ids,
            } => info!(
                target: "audit",
                route_id,
                avoided_port_count = avoided_port_ids.len(),
                "route.recalculate"
            ),
            AuditEvent::HistorySaved {
                history_id,
                route_id,
                user_id,
                status,
                avoided_count,
            } => info!(
                target: "audit",
                history_id,
                route_id = route_id.as_deref().unwrap_or("-"),
                user_id = user_id.as_deref().unwrap_or("-"),
                status = status.as_str(),
                avoided_count,
                "route.history.saved"
            ),
            AuditEvent::HistoryArchived { history_id, actor } => info!(
                target: "audit",
                history_id,
                actor = actor.as_deref().unwrap_or("-"),
                "route.history.archived"
            ),
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
