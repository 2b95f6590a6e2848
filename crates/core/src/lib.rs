//! # Clerk Core
//!
//! Record services for the Clerk front-desk system.
//!
//! This crate wires the workflow engine to storage:
//! - [`RecordService`]: create, read, list, transition and soft-delete records
//! - [`RecordRepository`]: the storage seam, with in-memory and sharded YAML implementations
//! - [`CoreConfig`]: startup configuration
//! - [`presentation`]: read-only display ordering
//!
//! **No API concerns**: HTTP servers, CLI parsing and role resolution belong in `api-rest`
//! and `cli`.

pub mod config;
pub mod constants;
pub mod error;
pub mod presentation;
pub mod repositories;
pub mod service;
pub mod uuid;

pub use config::CoreConfig;
pub use constants::DEFAULT_RECORD_DATA_DIR;
pub use error::{CoreError, CoreResult};
pub use repositories::{FileRepository, InMemoryRepository, RecordRepository};
pub use service::{ListFilter, RecordService};
pub use uuid::RecordId;

pub use access::{Capability, PermissionGate, Role, RoleRegistry};
pub use workflow::{
    AvailableAction, EncounterRecord, HistoryEntry, Payload, WorkflowCatalog, WorkflowEngine,
    WorkflowError, WorkflowType,
};

use std::sync::Arc;

/// Builds the workflow engine for a configuration.
///
/// Loads the permission matrix (the configured file, or the built-in hospital matrix), builds
/// the standard workflow catalog and checks that every module the workflows use is declared.
///
/// # Errors
///
/// Returns [`CoreError`] if the matrix cannot be loaded or a definition is invalid.
pub fn build_engine(cfg: &CoreConfig) -> CoreResult<WorkflowEngine> {
    let registry = cfg.load_registry()?;
    let catalog = WorkflowCatalog::standard()?;
    catalog.validate_against(&registry)?;

    tracing::info!(
        modules = registry.modules().count(),
        workflows = catalog.iter().count(),
        "workflow engine ready"
    );
    Ok(WorkflowEngine::new(
        Arc::new(catalog),
        PermissionGate::new(Arc::new(registry)),
    ))
}
