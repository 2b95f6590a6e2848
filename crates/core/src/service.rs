//! Record service.
//!
//! Joins the workflow engine to a [`RecordRepository`]. Every operation takes the caller's
//! already-resolved role; the service never authenticates.

use crate::presentation::sort_finished_first;
use crate::{CoreError, CoreResult, RecordId, RecordRepository};
use access::Role;
use std::sync::Arc;
use workflow::{AvailableAction, EncounterRecord, Payload, WorkflowEngine, WorkflowType};

/// Attempts at allocating a fresh record id before giving up.
const CREATE_ATTEMPTS: usize = 5;

/// Which records [`RecordService::list`] returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub workflow_type: Option<WorkflowType>,
    pub include_deleted: bool,
}

#[derive(Clone)]
pub struct RecordService {
    engine: Arc<WorkflowEngine>,
    repo: Arc<dyn RecordRepository>,
}

impl RecordService {
    pub fn new(engine: Arc<WorkflowEngine>, repo: Arc<dyn RecordRepository>) -> Self {
        Self { engine, repo }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    /// Creates and stores a record in the workflow's initial state.
    ///
    /// # Errors
    ///
    /// - `Workflow(Unauthorized)` if `role` lacks Create on the workflow's module.
    /// - Storage errors from the repository.
    pub fn create(
        &self,
        workflow_type: WorkflowType,
        role: Role,
        payload: Payload,
    ) -> CoreResult<EncounterRecord> {
        for _attempt in 0..CREATE_ATTEMPTS {
            let record = self.engine.create(workflow_type, role, payload.clone())?;
            match self.repo.insert(record) {
                Err(CoreError::AlreadyExists(id)) => {
                    tracing::warn!(record_id = %id, "record id collision, retrying");
                    continue;
                }
                other => return other,
            }
        }
        Err(CoreError::AlreadyExists(format!(
            "failed to allocate a unique record id after {CREATE_ATTEMPTS} attempts"
        )))
    }

    /// Loads one record, soft-deleted or not, if `role` may read its workflow.
    pub fn get(&self, id: &RecordId, role: Role) -> CoreResult<EncounterRecord> {
        let record = self.repo.load(id)?;
        self.engine.authorize_read(record.workflow_type(), role)?;
        Ok(record)
    }

    /// Records `role` may read, finished first.
    ///
    /// With a workflow filter, lacking Read on that workflow is an error. Without one,
    /// unreadable workflows are left out.
    pub fn list(&self, role: Role, filter: ListFilter) -> CoreResult<Vec<EncounterRecord>> {
        if let Some(workflow_type) = filter.workflow_type {
            self.engine.authorize_read(workflow_type, role)?;
        }

        let mut records: Vec<_> = self
            .repo
            .list()?
            .into_iter()
            .filter(|r| filter.include_deleted || !r.is_deleted())
            .filter(|r| {
                filter
                    .workflow_type
                    .map_or(true, |wt| r.workflow_type() == wt)
            })
            .filter(|r| self.engine.authorize_read(r.workflow_type(), role).is_ok())
            .collect();

        sort_finished_first(&mut records, self.engine.catalog());
        tracing::debug!(%role, count = records.len(), "records listed");
        Ok(records)
    }

    /// Applies `action` to the stored record and saves the result.
    ///
    /// # Errors
    ///
    /// - `NotFound` for unknown ids.
    /// - `Workflow(..)` for `InvalidTransition`, `Unauthorized` and `GuardFailed`.
    /// - `Conflict` if the record changed between load and save.
    pub fn apply(
        &self,
        id: &RecordId,
        action: &str,
        role: Role,
        payload: &Payload,
    ) -> CoreResult<EncounterRecord> {
        let record = self.repo.load(id)?;
        let updated = self.engine.apply(&record, action, role, payload)?;
        self.repo.save(updated)
    }

    /// Soft-deletes the stored record.
    pub fn delete(&self, id: &RecordId, role: Role) -> CoreResult<EncounterRecord> {
        let record = self.repo.load(id)?;
        let deleted = self.engine.delete(&record, role)?;
        self.repo.save(deleted)
    }

    pub fn available_actions(&self, id: &RecordId, role: Role) -> CoreResult<Vec<AvailableAction>> {
        let record = self.get(id, role)?;
        Ok(self.engine.available_actions(&record, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileRepository, InMemoryRepository};
    use access::{Capability, PermissionGate, RoleRegistry};
    use serde_json::{json, Value};
    use workflow::{WorkflowCatalog, WorkflowError};

    fn engine() -> Arc<WorkflowEngine> {
        Arc::new(WorkflowEngine::new(
            Arc::new(WorkflowCatalog::standard().unwrap()),
            PermissionGate::new(Arc::new(RoleRegistry::hospital_default().unwrap())),
        ))
    }

    fn service() -> RecordService {
        RecordService::new(engine(), Arc::new(InMemoryRepository::new()))
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    fn id_of(record: &EncounterRecord) -> RecordId {
        RecordId::from(record.id())
    }

    #[test]
    fn create_requires_create_on_module() {
        let svc = service();
        let err = svc
            .create(WorkflowType::Appointment, Role::Pharmacist, Payload::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Workflow(WorkflowError::Unauthorized {
                capability: Capability::Create,
                ..
            })
        ));
    }

    #[test]
    fn apply_persists_transition() {
        let svc = service();
        let created = svc
            .create(
                WorkflowType::Appointment,
                Role::Receptionist,
                payload(json!({"patientName": "Ada Obi", "preferredDoctor": "Dr. Bello"})),
            )
            .unwrap();
        let id = id_of(&created);

        svc.apply(&id, "markPaid", Role::Accountant, &Payload::new())
            .unwrap();
        let scheduled = svc
            .apply(
                &id,
                "allocate",
                Role::Receptionist,
                &payload(json!({"date": "2026-03-02", "time": "09:30"})),
            )
            .unwrap();

        assert_eq!(scheduled.current_state(), "scheduled");
        assert_eq!(scheduled.payload()["doctor"], "Dr. Bello");
        assert_eq!(scheduled.version(), 3);

        let loaded = svc.get(&id, Role::Doctor).unwrap();
        assert_eq!(loaded, scheduled);
    }

    #[test]
    fn failed_apply_leaves_stored_record_unchanged() {
        let svc = service();
        let created = svc
            .create(WorkflowType::Appointment, Role::Receptionist, Payload::new())
            .unwrap();
        let id = id_of(&created);
        svc.apply(&id, "markPaid", Role::Accountant, &Payload::new())
            .unwrap();

        let err = svc
            .apply(&id, "allocate", Role::Receptionist, &Payload::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Workflow(WorkflowError::GuardFailed(ref reason))
                if reason == "date and time are required"
        ));

        let loaded = svc.get(&id, Role::Receptionist).unwrap();
        assert_eq!(loaded.current_state(), "paid");
        assert!(!loaded.payload().contains_key("allocatedDate"));
        assert_eq!(loaded.history().len(), 1);
    }

    #[test]
    fn get_requires_read() {
        let svc = service();
        let created = svc
            .create(WorkflowType::Encounter, Role::Nurse, Payload::new())
            .unwrap();
        let err = svc.get(&id_of(&created), Role::Accountant).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Workflow(WorkflowError::Unauthorized { .. })
        ));
    }

    #[test]
    fn delete_hides_record_from_default_list() {
        let svc = service();
        let kept = svc
            .create(WorkflowType::Encounter, Role::Nurse, Payload::new())
            .unwrap();
        let gone = svc
            .create(WorkflowType::Encounter, Role::Nurse, Payload::new())
            .unwrap();

        let err = svc.delete(&id_of(&gone), Role::Nurse).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Workflow(WorkflowError::Unauthorized {
                capability: Capability::Delete,
                ..
            })
        ));
        let deleted = svc.delete(&id_of(&gone), Role::Admin).unwrap();
        assert!(deleted.is_deleted());

        let listed = svc.list(Role::Nurse, ListFilter::default()).unwrap();
        assert_eq!(listed.iter().map(|r| r.id()).collect::<Vec<_>>(), vec![kept.id()]);

        let all = svc
            .list(
                Role::Nurse,
                ListFilter {
                    include_deleted: true,
                    ..ListFilter::default()
                },
            )
            .unwrap();
        assert_eq!(all.len(), 2);

        let err = svc
            .apply(
                &id_of(&gone),
                "triage",
                Role::Nurse,
                &payload(json!({"triageCategory": "urgent"})),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Workflow(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn list_leaves_out_unreadable_workflows() {
        let svc = service();
        svc.create(WorkflowType::Appointment, Role::Receptionist, Payload::new())
            .unwrap();
        svc.create(WorkflowType::Encounter, Role::Receptionist, Payload::new())
            .unwrap();

        let for_accountant = svc.list(Role::Accountant, ListFilter::default()).unwrap();
        assert_eq!(for_accountant.len(), 1);
        assert_eq!(for_accountant[0].workflow_type(), WorkflowType::Appointment);

        let err = svc
            .list(
                Role::Accountant,
                ListFilter {
                    workflow_type: Some(WorkflowType::Encounter),
                    include_deleted: false,
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Workflow(WorkflowError::Unauthorized { .. })
        ));
    }

    #[test]
    fn available_actions_follow_role() {
        let svc = service();
        let created = svc
            .create(WorkflowType::Appointment, Role::Receptionist, Payload::new())
            .unwrap();
        let id = id_of(&created);

        let for_accountant: Vec<_> = svc
            .available_actions(&id, Role::Accountant)
            .unwrap()
            .into_iter()
            .map(|a| a.action)
            .collect();
        assert_eq!(for_accountant, vec!["markPaid"]);

        let for_receptionist: Vec<_> = svc
            .available_actions(&id, Role::Receptionist)
            .unwrap()
            .into_iter()
            .map(|a| a.action)
            .collect();
        assert_eq!(for_receptionist, vec!["cancel"]);
    }

    /// Commits a write of its own right after the first load, as another writer would.
    struct InterleavingRepository {
        inner: InMemoryRepository,
        interleave: std::sync::atomic::AtomicBool,
    }

    impl RecordRepository for InterleavingRepository {
        fn insert(&self, record: EncounterRecord) -> CoreResult<EncounterRecord> {
            self.inner.insert(record)
        }

        fn load(&self, id: &RecordId) -> CoreResult<EncounterRecord> {
            let loaded = self.inner.load(id)?;
            if self
                .interleave
                .swap(false, std::sync::atomic::Ordering::SeqCst)
            {
                self.inner.save(loaded.clone())?;
            }
            Ok(loaded)
        }

        fn save(&self, record: EncounterRecord) -> CoreResult<EncounterRecord> {
            self.inner.save(record)
        }

        fn list(&self) -> CoreResult<Vec<EncounterRecord>> {
            self.inner.list()
        }
    }

    #[test]
    fn apply_over_concurrently_changed_record_conflicts() {
        let repo = Arc::new(InterleavingRepository {
            inner: InMemoryRepository::new(),
            interleave: std::sync::atomic::AtomicBool::new(false),
        });
        let svc = RecordService::new(engine(), repo.clone());
        let created = svc
            .create(WorkflowType::Appointment, Role::Receptionist, Payload::new())
            .unwrap();
        let id = id_of(&created);

        repo.interleave
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let err = svc
            .apply(&id, "markPaid", Role::Accountant, &Payload::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict {
                expected: 1,
                found: 2,
                ..
            }
        ));

        let stored = svc.get(&id, Role::Accountant).unwrap();
        assert_eq!(stored.current_state(), created.current_state());
        assert_eq!(stored.version(), 2);
        assert!(stored.history().is_empty());
    }

    #[test]
    fn works_over_file_repository() {
        let dir = tempfile::tempdir().unwrap();
        let svc = RecordService::new(engine(), Arc::new(FileRepository::new(dir.path().into())));

        let created = svc
            .create(
                WorkflowType::IpdAdmission,
                Role::Doctor,
                payload(json!({"ward": "B2"})),
            )
            .unwrap();
        let transferred = svc
            .apply(
                &id_of(&created),
                "transfer",
                Role::Doctor,
                &payload(json!({"destinationWard": "ICU"})),
            )
            .unwrap();
        assert_eq!(transferred.current_state(), "transferred");
        assert_eq!(transferred.payload()["destinationWard"], "ICU");
        assert!(transferred.payload().contains_key("transferDate"));

        let listed = svc.list(Role::Doctor, ListFilter::default()).unwrap();
        assert_eq!(listed, vec![transferred]);
    }
}
