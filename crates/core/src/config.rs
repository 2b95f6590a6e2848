//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into services. Nothing in
//! this crate reads environment variables while handling a request.

use crate::constants::RECORDS_DIR_NAME;
use crate::{CoreError, CoreResult};
use access::{PermissionMatrix, RoleRegistry};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    record_data_dir: PathBuf,
    permissions_file: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if `record_data_dir` is empty or the permissions
    /// file override does not exist.
    pub fn new(record_data_dir: PathBuf, permissions_file: Option<PathBuf>) -> CoreResult<Self> {
        if record_data_dir.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput(
                "record_data_dir cannot be empty".into(),
            ));
        }

        if let Some(path) = &permissions_file {
            if !path.is_file() {
                return Err(CoreError::InvalidInput(format!(
                    "permissions file does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            record_data_dir,
            permissions_file,
        })
    }

    pub fn record_data_dir(&self) -> &Path {
        &self.record_data_dir
    }

    pub fn records_dir(&self) -> PathBuf {
        self.record_data_dir.join(RECORDS_DIR_NAME)
    }

    pub fn permissions_file(&self) -> Option<&Path> {
        self.permissions_file.as_deref()
    }

    /// The configured permission matrix, or the built-in hospital matrix.
    pub fn load_registry(&self) -> CoreResult<RoleRegistry> {
        let registry = match &self.permissions_file {
            Some(path) => PermissionMatrix::load(path)?,
            None => RoleRegistry::hospital_default()?,
        };
        Ok(registry)
    }
}

/// Treat an unset, empty or whitespace-only environment value as absent.
pub fn optional_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use access::Role;

    #[test]
    fn rejects_empty_data_dir() {
        let err = CoreConfig::new(PathBuf::new(), None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn rejects_missing_permissions_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = CoreConfig::new(dir.path().to_path_buf(), Some(missing)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("nope.yaml")));
    }

    #[test]
    fn records_dir_is_under_data_dir() {
        let cfg = CoreConfig::new(PathBuf::from("/srv/clerk"), None).unwrap();
        assert_eq!(cfg.records_dir(), PathBuf::from("/srv/clerk/records"));
    }

    #[test]
    fn loads_permissions_override() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("permissions.yaml");
        std::fs::write(&file, "modules:\n  appointments:\n    nurse: [read]\n").unwrap();

        let cfg = CoreConfig::new(dir.path().to_path_buf(), Some(file)).unwrap();
        let registry = cfg.load_registry().unwrap();
        assert!(registry.permissions_for(Role::Nurse, "appointments").can_read);
        assert!(!registry.has_module("payments"));
    }

    #[test]
    fn blank_env_values_are_absent() {
        assert_eq!(optional_path_from_env_value(None), None);
        assert_eq!(optional_path_from_env_value(Some("  ".into())), None);
        assert_eq!(
            optional_path_from_env_value(Some(" perms.yaml ".into())),
            Some(PathBuf::from("perms.yaml"))
        );
    }
}
