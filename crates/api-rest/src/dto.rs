//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire. Payloads stay free-form JSON objects.

use chrono::{DateTime, SecondsFormat, Utc};
use clerk_core::{AvailableAction, EncounterRecord, HistoryEntry, Payload, WorkflowCatalog};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRes {
    pub from: String,
    pub action: String,
    pub to: String,
    pub module: String,
    pub capability: String,
    pub is_exception: bool,
    pub required_fields: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRes {
    pub workflow_type: String,
    pub module: String,
    pub states: Vec<String>,
    pub initial_state: String,
    pub transitions: Vec<TransitionRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListWorkflowsRes {
    pub workflows: Vec<WorkflowRes>,
}

impl ListWorkflowsRes {
    pub fn from_catalog(catalog: &WorkflowCatalog) -> Self {
        let workflows = catalog
            .iter()
            .map(|d| WorkflowRes {
                workflow_type: d.workflow_type().to_string(),
                module: d.module().to_owned(),
                states: d.states().to_vec(),
                initial_state: d.initial_state().to_owned(),
                transitions: d
                    .transitions()
                    .iter()
                    .map(|t| TransitionRes {
                        from: t.from.clone(),
                        action: t.action.clone(),
                        to: t.to.clone(),
                        module: t.module.clone(),
                        capability: t.capability.to_string(),
                        is_exception: t.is_exception,
                        required_fields: t.guard.required_fields().to_vec(),
                    })
                    .collect(),
            })
            .collect();
        Self { workflows }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRes {
    pub role: String,
    pub module: String,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordReq {
    pub workflow_type: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Payload,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ApplyActionReq {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Payload,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListRecordsQuery {
    /// Only records of this workflow type.
    pub workflow: Option<String>,
    /// Include soft-deleted records.
    pub include_deleted: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRes {
    pub action: String,
    pub from_state: String,
    pub to_state: String,
    pub actor_role: String,
    pub timestamp: String,
}

/// UTC with millisecond precision, e.g. `2026-03-02T09:30:00.000Z`.
fn wire_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<&HistoryEntry> for HistoryRes {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            action: entry.action.clone(),
            from_state: entry.from_state.clone(),
            to_state: entry.to_state.clone(),
            actor_role: entry.actor_role.to_string(),
            timestamp: wire_timestamp(entry.timestamp),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordRes {
    pub id: String,
    pub workflow_type: String,
    pub current_state: String,
    #[schema(value_type = Object)]
    pub payload: Payload,
    pub history: Vec<HistoryRes>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    pub version: u64,
}

impl From<&EncounterRecord> for RecordRes {
    fn from(record: &EncounterRecord) -> Self {
        Self {
            id: record.id().simple().to_string(),
            workflow_type: record.workflow_type().to_string(),
            current_state: record.current_state().to_owned(),
            payload: record.payload().clone(),
            history: record.history().iter().map(HistoryRes::from).collect(),
            created_at: wire_timestamp(record.created_at()),
            deleted_at: record.deleted_at().map(wire_timestamp),
            version: record.version(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListRecordsRes {
    pub records: Vec<RecordRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionRes {
    pub action: String,
    pub to_state: String,
    pub is_exception: bool,
    pub required_fields: Vec<String>,
}

impl From<AvailableAction> for ActionRes {
    fn from(action: AvailableAction) -> Self {
        Self {
            action: action.action,
            to_state: action.to_state,
            is_exception: action.is_exception,
            required_fields: action.required_fields,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListActionsRes {
    pub actions: Vec<ActionRes>,
}
