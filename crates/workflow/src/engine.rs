//! The workflow engine.
//!
//! `apply` resolves, authorises and guards before it touches anything: the three checks run
//! against the borrowed input record, and only on success is a copy advanced and returned.
//! A failed call therefore leaves no trace on the caller's record.

use crate::{
    EncounterRecord, HistoryEntry, Payload, WorkflowCatalog, WorkflowDefinition, WorkflowError,
    WorkflowResult, WorkflowType,
};
use access::{Capability, PermissionGate, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// An action the role could fire on the record right now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableAction {
    pub action: String,
    pub to_state: String,
    pub is_exception: bool,
    pub required_fields: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct WorkflowEngine {
    catalog: Arc<WorkflowCatalog>,
    gate: PermissionGate,
}

impl WorkflowEngine {
    pub fn new(catalog: Arc<WorkflowCatalog>, gate: PermissionGate) -> Self {
        Self { catalog, gate }
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn definition(&self, workflow_type: WorkflowType) -> WorkflowResult<&WorkflowDefinition> {
        self.catalog
            .get(workflow_type)
            .ok_or(WorkflowError::UnknownWorkflow(workflow_type))
    }

    /// Creates a record in its workflow's initial state, authorised by `Create` on the
    /// workflow's module. `payload` becomes the record's initial payload.
    pub fn create(
        &self,
        workflow_type: WorkflowType,
        actor_role: Role,
        payload: Payload,
    ) -> WorkflowResult<EncounterRecord> {
        self.create_at(workflow_type, actor_role, payload, Utc::now())
    }

    pub fn create_at(
        &self,
        workflow_type: WorkflowType,
        actor_role: Role,
        payload: Payload,
        at: DateTime<Utc>,
    ) -> WorkflowResult<EncounterRecord> {
        let definition = self.definition(workflow_type)?;
        self.require(actor_role, definition.module(), Capability::Create)?;

        let record = EncounterRecord::new(workflow_type, definition.initial_state(), payload, at);
        tracing::info!(
            record_id = %record.id().simple(),
            workflow = %workflow_type,
            role = %actor_role,
            state = record.current_state(),
            "record created"
        );
        Ok(record)
    }

    /// Applies `action` to `record` on behalf of `actor_role`, timestamped now.
    pub fn apply(
        &self,
        record: &EncounterRecord,
        action: &str,
        actor_role: Role,
        payload: &Payload,
    ) -> WorkflowResult<EncounterRecord> {
        self.apply_at(record, action, actor_role, payload, Utc::now())
    }

    /// Applies `action` to `record`.
    ///
    /// 1. the transition for `(current_state, action)` must exist -> `InvalidTransition`
    /// 2. the role must hold the transition's capability on its module -> `Unauthorized`
    /// 3. the guard must pass on `payload` -> `GuardFailed`
    /// 4. the returned record carries the new state, merged guard fields and one more
    ///    history entry.
    ///
    /// # Errors
    ///
    /// Returns the first failing check. The input record is never modified.
    pub fn apply_at(
        &self,
        record: &EncounterRecord,
        action: &str,
        actor_role: Role,
        payload: &Payload,
        at: DateTime<Utc>,
    ) -> WorkflowResult<EncounterRecord> {
        let definition = self.definition(record.workflow_type())?;
        let from_state = record.current_state();

        let transition = definition
            .transition_for(from_state, action)
            .filter(|_| !record.is_deleted())
            .ok_or_else(|| {
                tracing::warn!(
                    record_id = %record.id().simple(),
                    state = from_state,
                    action,
                    deleted = record.is_deleted(),
                    "invalid transition"
                );
                WorkflowError::InvalidTransition {
                    workflow: record.workflow_type(),
                    state: from_state.to_owned(),
                    action: action.to_owned(),
                }
            })?;

        self.require(actor_role, &transition.module, transition.capability)?;

        let merge = transition
            .guard
            .evaluate(payload, record.payload(), at)
            .map_err(|reason| {
                tracing::warn!(
                    record_id = %record.id().simple(),
                    action,
                    %reason,
                    "guard failed"
                );
                WorkflowError::GuardFailed(reason)
            })?;

        let entry = HistoryEntry {
            action: action.to_owned(),
            from_state: from_state.to_owned(),
            to_state: transition.to.clone(),
            actor_role,
            timestamp: at,
        };

        let mut updated = record.clone();
        updated.advance(entry, merge);

        tracing::info!(
            record_id = %updated.id().simple(),
            workflow = %updated.workflow_type(),
            role = %actor_role,
            action,
            from = from_state,
            to = updated.current_state(),
            "transition applied"
        );
        Ok(updated)
    }

    /// Soft-deletes `record`, authorised by `Delete` on the workflow's module.
    ///
    /// The returned record keeps its state and history and gains `deleted_at`. Deleting an
    /// already deleted record is an `InvalidTransition`.
    pub fn delete(&self, record: &EncounterRecord, actor_role: Role) -> WorkflowResult<EncounterRecord> {
        self.delete_at(record, actor_role, Utc::now())
    }

    pub fn delete_at(
        &self,
        record: &EncounterRecord,
        actor_role: Role,
        at: DateTime<Utc>,
    ) -> WorkflowResult<EncounterRecord> {
        let definition = self.definition(record.workflow_type())?;
        if record.is_deleted() {
            return Err(WorkflowError::InvalidTransition {
                workflow: record.workflow_type(),
                state: record.current_state().to_owned(),
                action: "delete".into(),
            });
        }
        self.require(actor_role, definition.module(), Capability::Delete)?;

        let mut updated = record.clone();
        updated.mark_deleted(at);
        tracing::info!(
            record_id = %updated.id().simple(),
            role = %actor_role,
            "record soft-deleted"
        );
        Ok(updated)
    }

    /// Checks `Read` on the workflow's module.
    pub fn authorize_read(&self, workflow_type: WorkflowType, actor_role: Role) -> WorkflowResult<()> {
        let definition = self.definition(workflow_type)?;
        self.require(actor_role, definition.module(), Capability::Read)
    }

    /// Actions `actor_role` may fire from the record's current state.
    ///
    /// Guards are not evaluated; a listed action can still fail with `GuardFailed`.
    pub fn available_actions(&self, record: &EncounterRecord, actor_role: Role) -> Vec<AvailableAction> {
        if record.is_deleted() {
            return Vec::new();
        }
        let Some(definition) = self.catalog.get(record.workflow_type()) else {
            return Vec::new();
        };
        definition
            .transitions_from(record.current_state())
            .filter(|t| self.gate.authorize(actor_role, &t.module, t.capability))
            .map(|t| AvailableAction {
                action: t.action.clone(),
                to_state: t.to.clone(),
                is_exception: t.is_exception,
                required_fields: t.guard.required_fields().to_vec(),
            })
            .collect()
    }

    fn require(&self, role: Role, module: &str, capability: Capability) -> WorkflowResult<()> {
        if self.gate.authorize(role, module, capability) {
            return Ok(());
        }
        tracing::warn!(%role, module, %capability, "permission denied");
        Err(WorkflowError::Unauthorized {
            role,
            module: module.to_owned(),
            capability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use access::RoleRegistry;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn engine() -> WorkflowEngine {
        let registry = Arc::new(RoleRegistry::hospital_default().unwrap());
        let catalog = Arc::new(WorkflowCatalog::standard().unwrap());
        WorkflowEngine::new(catalog, PermissionGate::new(registry))
    }

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap()
    }

    fn new_appointment(engine: &WorkflowEngine) -> EncounterRecord {
        engine
            .create_at(
                WorkflowType::Appointment,
                Role::Receptionist,
                payload(json!({"patient": "Ada Obi", "preferredDoctor": "Dr Mensah"})),
                at(),
            )
            .unwrap()
    }

    #[test]
    fn appointment_scenario_end_to_end() {
        let engine = engine();
        let empty = Payload::new();

        let record = new_appointment(&engine);
        assert_eq!(record.current_state(), "pending_payment");
        assert!(record.history().is_empty());

        let record = engine
            .apply_at(&record, "markPaid", Role::Accountant, &empty, at())
            .unwrap();
        assert_eq!(record.current_state(), "paid");
        assert_eq!(record.payload()["paidAt"], json!("2025-03-05T09:00:00.000Z"));

        let err = engine
            .apply_at(&record, "allocate", Role::Receptionist, &empty, at())
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::GuardFailed("date and time are required".into())
        );

        let slot = payload(json!({"date": "2025-03-05", "time": "10:00"}));
        let record = engine
            .apply_at(&record, "allocate", Role::Receptionist, &slot, at())
            .unwrap();
        assert_eq!(record.current_state(), "scheduled");
        assert_eq!(record.payload()["doctor"], json!("Dr Mensah"));

        let err = engine
            .apply_at(&record, "start", Role::Accountant, &empty, at())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { role: Role::Accountant, .. }));

        let record = engine
            .apply_at(&record, "start", Role::Doctor, &empty, at())
            .unwrap();
        assert_eq!(record.current_state(), "in_progress");

        let record = engine
            .apply_at(&record, "finish", Role::Doctor, &empty, at())
            .unwrap();
        assert_eq!(record.current_state(), "completed");
        assert_eq!(record.history().len(), 4);

        let err = engine
            .apply_at(&record, "finish", Role::Doctor, &empty, at())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn invalid_transition_leaves_record_unchanged() {
        let engine = engine();
        let record = new_appointment(&engine);
        let before = record.clone();

        let err = engine
            .apply_at(&record, "start", Role::Doctor, &Payload::new(), at())
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                workflow: WorkflowType::Appointment,
                state: "pending_payment".into(),
                action: "start".into(),
            }
        );
        assert_eq!(record, before);
    }

    #[test]
    fn every_unlisted_state_action_pair_is_invalid() {
        let engine = engine();
        for definition in engine.catalog().iter() {
            let actions: Vec<&str> = definition
                .transitions()
                .iter()
                .map(|t| t.action.as_str())
                .collect();
            for state in definition.states() {
                for action in &actions {
                    if definition.transition_for(state, action).is_some() {
                        continue;
                    }
                    let record = EncounterRecord::new(
                        definition.workflow_type(),
                        state,
                        Payload::new(),
                        at(),
                    );
                    let err = engine
                        .apply_at(&record, action, Role::Admin, &Payload::new(), at())
                        .unwrap_err();
                    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
                }
            }
        }
    }

    #[test]
    fn authorisation_is_checked_before_guard() {
        let engine = engine();
        let record = engine
            .apply_at(
                &new_appointment(&engine),
                "markPaid",
                Role::Accountant,
                &Payload::new(),
                at(),
            )
            .unwrap();

        // Missing date/time would fail the guard, but the role check comes first.
        let err = engine
            .apply_at(&record, "allocate", Role::Pharmacist, &Payload::new(), at())
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Unauthorized {
                role: Role::Pharmacist,
                module: "appointments".into(),
                capability: Capability::Update,
            }
        );
    }

    #[test]
    fn failed_guard_merges_nothing() {
        let engine = engine();
        let record = engine
            .create_at(WorkflowType::IpdAdmission, Role::Doctor, Payload::new(), at())
            .unwrap();

        let err = engine
            .apply_at(&record, "transfer", Role::Doctor, &Payload::new(), at())
            .unwrap_err();
        assert_eq!(err, WorkflowError::GuardFailed("destinationWard is required".into()));
        assert!(record.payload().get("transferDate").is_none());
        assert!(record.payload().get("destinationWard").is_none());
        assert_eq!(record.current_state(), "admitted");
    }

    #[test]
    fn discharge_stamps_discharge_date_and_is_terminal() {
        let engine = engine();
        let record = engine
            .create_at(WorkflowType::IpdAdmission, Role::Doctor, Payload::new(), at())
            .unwrap();
        let record = engine
            .apply_at(&record, "discharge", Role::Doctor, &Payload::new(), at())
            .unwrap();
        assert_eq!(record.current_state(), "discharged");
        assert_eq!(record.payload()["dischargeDate"], json!("2025-03-05T09:00:00.000Z"));

        let err = engine
            .apply_at(&record, "transfer", Role::Doctor, &payload(json!({"destinationWard": "ICU"})), at())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn history_grows_by_one_per_success_and_never_rewrites() {
        let engine = engine();
        let mut record = engine
            .create_at(WorkflowType::Clerking, Role::Nurse, Payload::new(), at())
            .unwrap();
        let steps = [("assess", Role::Nurse), ("admit", Role::Doctor)];

        let mut snapshots: Vec<HistoryEntry> = Vec::new();
        for (n, (action, role)) in steps.into_iter().enumerate() {
            record = engine
                .apply_at(&record, action, role, &Payload::new(), at())
                .unwrap();
            assert_eq!(record.history().len(), n + 1);
            assert_eq!(&record.history()[..n], snapshots.as_slice());
            snapshots = record.history().to_vec();
        }

        let last = record.history().last().unwrap();
        assert_eq!(last.action, "admit");
        assert_eq!(last.from_state, "assessed");
        assert_eq!(last.to_state, "admitted");
        assert_eq!(last.actor_role, Role::Doctor);
    }

    #[test]
    fn clerking_admit_requires_admissions_create() {
        let engine = engine();
        let record = engine
            .create_at(WorkflowType::Clerking, Role::Receptionist, Payload::new(), at())
            .unwrap();
        let record = engine
            .apply_at(&record, "assess", Role::Nurse, &Payload::new(), at())
            .unwrap();
        let err = engine
            .apply_at(&record, "admit", Role::Nurse, &Payload::new(), at())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));
    }

    #[test]
    fn encounter_checklist_by_nurse_and_doctor() {
        let engine = engine();
        let mut record = engine
            .create_at(WorkflowType::Encounter, Role::Receptionist, Payload::new(), at())
            .unwrap();
        let steps = [
            ("triage", Role::Nurse, json!({"triageCategory": "yellow"})),
            (
                "recordVitals",
                Role::Nurse,
                json!({"temperature": 37.2, "pulse": 88, "bloodPressure": "120/80"}),
            ),
            ("examine", Role::Doctor, json!({"findings": "mild dehydration"})),
            ("recordPlan", Role::Doctor, json!({"plan": "oral fluids"})),
            ("close", Role::Doctor, json!({})),
        ];
        for (action, role, body) in steps {
            record = engine
                .apply_at(&record, action, role, &payload(body), at())
                .unwrap();
        }
        assert_eq!(record.current_state(), "closed");
        assert_eq!(record.payload()["pulse"], json!(88));
        assert_eq!(record.payload()["plan"], json!("oral fluids"));
    }

    #[test]
    fn nurse_cannot_sign_off_examination() {
        let engine = engine();
        let record = engine
            .create_at(WorkflowType::Encounter, Role::Nurse, Payload::new(), at())
            .unwrap();
        let record = engine
            .apply_at(&record, "triage", Role::Nurse, &payload(json!({"triageCategory": "green"})), at())
            .unwrap();
        let record = engine
            .apply_at(
                &record,
                "recordVitals",
                Role::Nurse,
                &payload(json!({"temperature": 36.8, "pulse": 70, "bloodPressure": "118/76"})),
                at(),
            )
            .unwrap();
        let err = engine
            .apply_at(&record, "examine", Role::Nurse, &payload(json!({"findings": "x"})), at())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));
    }

    #[test]
    fn cancel_and_reschedule_are_exceptions() {
        let engine = engine();
        let empty = Payload::new();
        let record = engine
            .apply_at(&new_appointment(&engine), "markPaid", Role::Accountant, &empty, at())
            .unwrap();
        let record = engine
            .apply_at(
                &record,
                "allocate",
                Role::Receptionist,
                &payload(json!({"date": "2025-03-06", "time": "14:30", "doctor": "Dr Okafor"})),
                at(),
            )
            .unwrap();

        let record = engine
            .apply_at(&record, "reschedule", Role::Receptionist, &empty, at())
            .unwrap();
        assert_eq!(record.current_state(), "paid");
        assert_eq!(record.payload()["doctor"], json!("Dr Okafor"));

        let err = engine
            .apply_at(&record, "cancel", Role::Receptionist, &empty, at())
            .unwrap_err();
        assert_eq!(err, WorkflowError::GuardFailed("reason is required".into()));

        let record = engine
            .apply_at(
                &record,
                "cancel",
                Role::Receptionist,
                &payload(json!({"reason": "patient request"})),
                at(),
            )
            .unwrap();
        assert_eq!(record.current_state(), "cancelled");
        assert_eq!(record.payload()["cancellationReason"], json!("patient request"));
        assert_eq!(record.history().len(), 4);
    }

    #[test]
    fn create_requires_module_create() {
        let engine = engine();
        let err = engine
            .create_at(WorkflowType::Appointment, Role::Pharmacist, Payload::new(), at())
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Unauthorized { capability: Capability::Create, .. }
        ));
    }

    #[test]
    fn soft_delete_is_gated_and_blocks_further_actions() {
        let engine = engine();
        let record = new_appointment(&engine);

        let err = engine.delete_at(&record, Role::Receptionist, at()).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Unauthorized { capability: Capability::Delete, .. }
        ));

        let deleted = engine.delete_at(&record, Role::Admin, at()).unwrap();
        assert_eq!(deleted.deleted_at(), Some(at()));
        assert_eq!(deleted.current_state(), record.current_state());

        let err = engine
            .apply_at(&deleted, "markPaid", Role::Accountant, &Payload::new(), at())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        let err = engine.delete_at(&deleted, Role::Admin, at()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert!(engine.available_actions(&deleted, Role::Admin).is_empty());
    }

    #[test]
    fn available_actions_respect_role() {
        let engine = engine();
        let record = engine
            .apply_at(
                &new_appointment(&engine),
                "markPaid",
                Role::Accountant,
                &Payload::new(),
                at(),
            )
            .unwrap();

        let receptionist: Vec<String> = engine
            .available_actions(&record, Role::Receptionist)
            .into_iter()
            .map(|a| a.action)
            .collect();
        assert_eq!(receptionist, vec!["allocate", "cancel"]);

        let allocate = engine
            .available_actions(&record, Role::Receptionist)
            .into_iter()
            .find(|a| a.action == "allocate")
            .unwrap();
        assert_eq!(allocate.required_fields, vec!["date", "time"]);

        assert!(engine.available_actions(&record, Role::Accountant).is_empty());
    }

    #[test]
    fn unknown_workflow_is_reported() {
        let registry = Arc::new(RoleRegistry::hospital_default().unwrap());
        let catalog = Arc::new(
            WorkflowCatalog::new(vec![crate::definitions::clerking().unwrap()]).unwrap(),
        );
        let engine = WorkflowEngine::new(catalog, PermissionGate::new(registry));
        let err = engine
            .create_at(WorkflowType::Appointment, Role::Admin, Payload::new(), at())
            .unwrap_err();
        assert_eq!(err, WorkflowError::UnknownWorkflow(WorkflowType::Appointment));
    }
}
