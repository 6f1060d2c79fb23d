// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable event type vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    System,
    HeartbeatStale,
    HeartbeatWarning,
    LeaseTakeover,
    LeaseAdopted,
    StepFailed,
    StepAccepted,
    StepReworkRequested,
    SuccessionAccepted,
    Human,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::System => "SYSTEM",
            EventType::HeartbeatStale => "HEARTBEAT_STALE",
            EventType::HeartbeatWarning => "HEARTBEAT_WARNING",
            EventType::LeaseTakeover => "LEASE_TAKEOVER",
            EventType::LeaseAdopted => "LEASE_ADOPTED",
            EventType::StepFailed => "STEP_FAILED",
            EventType::StepAccepted => "STEP_ACCEPTED",
            EventType::StepReworkRequested => "STEP_REWORK_REQUESTED",
            EventType::SuccessionAccepted => "SUCCESSION_ACCEPTED",
            EventType::Human => "HUMAN",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        f.write_str(text)
    }
}

/// One persisted event, one JSON object per log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub schema_version: String,
    pub event_id: String,
    pub task_id: String,
    pub run_id: String,
    pub step_id: Option<String>,
    pub event_type: EventType,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    pub dedup_key: Option<String>,
}

/// Everything the caller supplies for an append; the store assigns
/// `event_id` and `timestamp`.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub task_id: String,
    pub run_id: String,
    pub step_id: Option<String>,
    pub event_type: EventType,
    pub severity: Severity,
    pub payload: Value,
    pub dedup_key: Option<String>,
}

impl EventDraft {
    pub fn new(
        task_id: impl Into<String>,
        run_id: impl Into<String>,
        event_type: EventType,
        severity: Severity,
        payload: Value,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            run_id: run_id.into(),
            step_id: None,
            event_type,
            severity,
            payload,
            dedup_key: None,
        }
    }

    pub fn step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn step_opt(mut self, step_id: Option<String>) -> Self {
        self.step_id = step_id;
        self
    }

    pub fn dedup(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_serializes_to_stable_vocabulary() {
        assert_eq!(serde_json::to_string(&EventType::HeartbeatStale).unwrap(), "\"HEARTBEAT_STALE\"");
        assert_eq!(
            serde_json::to_string(&EventType::StepReworkRequested).unwrap(),
            "\"STEP_REWORK_REQUESTED\""
        );
    }

    #[test]
    fn draft_builder_sets_optional_fields() {
        let draft = EventDraft::new("T", "R", EventType::System, Severity::Info, json!({}))
            .step("S1")
            .dedup("k");
        assert_eq!(draft.step_id.as_deref(), Some("S1"));
        assert_eq!(draft.dedup_key.as_deref(), Some("k"));
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = EventRecord {
            schema_version: "1.0.0".to_string(),
            event_id: "evt_00".to_string(),
            task_id: "T".to_string(),
            run_id: "R".to_string(),
            step_id: None,
            event_type: EventType::Human,
            severity: Severity::Warn,
            timestamp: Utc::now(),
            payload: json!({"note": "hi"}),
            dedup_key: None,
        };
        let line = serde_json::to_string(&record).unwrap();
        let restored: EventRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(restored, record);
    }
}
