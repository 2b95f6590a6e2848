//! Role-based access control for Clerk.
//!
//! This crate owns the permission matrix and the single gate every caller consults:
//! - [`Role`] and [`Capability`] enumerations
//! - [`RoleRegistry`], the immutable `(role, module) -> PermissionEntry` table
//! - [`PermissionGate`], the fail-closed authorisation check
//! - [`PermissionMatrix`], strict YAML parsing/rendering of the registry
//!
//! The gate is consulted by UI-facing visibility checks and, authoritatively, by the workflow
//! engine. Policy is defined once here rather than per screen.

pub mod capability;
pub mod gate;
pub mod matrix;
pub mod registry;
pub mod role;

pub use capability::Capability;
pub use gate::PermissionGate;
pub use matrix::PermissionMatrix;
pub use registry::{PermissionEntry, RoleRegistry, RoleRegistryBuilder};
pub use role::Role;

/// A module key such as `appointments` or `patient_clerking`.
pub type ModuleKey = clerk_types::Key;

/// Errors returned by the `access` crate.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    #[error("invalid module key '{key}': {source}")]
    InvalidModule {
        key: String,
        #[source]
        source: clerk_types::TextError,
    },

    #[error("module '{0}' is not declared in the role registry")]
    UndeclaredModule(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with an [`AccessError`].
pub type AccessResult<T> = Result<T, AccessError>;

/// Parses a module key, mapping validation failures to [`AccessError::InvalidModule`].
pub fn module_key(key: &str) -> AccessResult<ModuleKey> {
    ModuleKey::new(key).map_err(|source| AccessError::InvalidModule {
        key: key.to_owned(),
        source,
    })
}
