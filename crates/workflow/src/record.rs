//! The record a workflow advances.

use crate::{Payload, WorkflowType};
use access::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One successful transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: String,
    pub from_state: String,
    pub to_state: String,
    pub actor_role: Role,
    pub timestamp: DateTime<Utc>,
}

/// An appointment, clerking record, in-patient stay or encounter.
///
/// State, payload and history change only through [`WorkflowEngine`](crate::WorkflowEngine).
/// `version` is owned by the storage layer and used for compare-and-swap saves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterRecord {
    #[serde(with = "uuid::serde::simple")]
    id: Uuid,
    workflow_type: WorkflowType,
    current_state: String,
    #[serde(default)]
    payload: Payload,
    #[serde(default)]
    history: Vec<HistoryEntry>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    version: u64,
}

impl EncounterRecord {
    pub(crate) fn new(
        workflow_type: WorkflowType,
        initial_state: &str,
        payload: Payload,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_type,
            current_state: initial_state.to_owned(),
            payload,
            history: Vec::new(),
            created_at,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workflow_type(&self) -> WorkflowType {
        self.workflow_type
    }

    pub fn current_state(&self) -> &str {
        &self.current_state
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the record carrying `version`. Called by repositories after a successful save.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub(crate) fn advance(&mut self, entry: HistoryEntry, merge: Payload) {
        self.current_state = entry.to_state.clone();
        self.payload.extend(merge);
        self.history.push(entry);
    }

    pub(crate) fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }
}
