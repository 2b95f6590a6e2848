//! Permission matrix YAML wire model and translation helpers.
//!
//! Responsibilities:
//! - Define a strict wire model for the on-disk permission matrix
//! - Translate between the wire model and [`RoleRegistry`]
//! - Surface the failing path when a matrix file does not match the schema
//!
//! Wire shape:
//!
//! ```yaml
//! modules:
//!   appointments:
//!     receptionist: [create, read, update]
//!     doctor: [read]
//!   facilities: {}
//! ```

use crate::{AccessError, AccessResult, Capability, Role, RoleRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub(crate) const DEFAULT_MATRIX_YAML: &str = include_str!("../permissions/default.yaml");

/// Permission matrix operations.
///
/// Zero-sized namespace; all methods are associated functions.
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Parse a permission matrix from YAML text into a [`RoleRegistry`].
    ///
    /// # Errors
    ///
    /// Returns [`AccessError`] if:
    /// - the YAML does not match the wire schema (unknown keys, unknown roles or
    ///   capabilities, wrong types), reported with the failing path,
    /// - a module name is not a valid key.
    pub fn parse(yaml_text: &str) -> AccessResult<RoleRegistry> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, MatrixWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(AccessError::Translation(format!(
                    "Permission matrix schema mismatch at {path}: {source}"
                )));
            }
        };

        wire_to_registry(wire)
    }

    /// Read and parse a permission matrix file.
    pub fn load(path: &Path) -> AccessResult<RoleRegistry> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AccessError::Translation(format!(
                "failed to read permission matrix {}: {e}",
                path.display()
            ))
        })?;
        let registry = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            modules = registry.modules().count(),
            "loaded permission matrix"
        );
        Ok(registry)
    }

    /// Render a registry as YAML. Roles without any grant on a module are omitted.
    pub fn render(registry: &RoleRegistry) -> AccessResult<String> {
        let wire = registry_to_wire(registry);
        Ok(serde_yaml::to_string(&wire)?)
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct MatrixWire {
    modules: BTreeMap<String, BTreeMap<Role, Vec<Capability>>>,
}

fn wire_to_registry(wire: MatrixWire) -> AccessResult<RoleRegistry> {
    let mut builder = RoleRegistry::builder();
    for (module, grants) in wire.modules {
        builder = builder.module(&module)?;
        for (role, capabilities) in grants {
            builder = builder.grant(role, &module, &capabilities)?;
        }
    }
    Ok(builder.build())
}

fn registry_to_wire(registry: &RoleRegistry) -> MatrixWire {
    let modules = registry
        .modules()
        .map(|module| {
            let grants = Role::ALL
                .into_iter()
                .map(|role| (role, registry.permissions_for(role, module.as_str()).granted()))
                .filter(|(_, granted)| !granted.is_empty())
                .collect();
            (module.to_string(), grants)
        })
        .collect();
    MatrixWire { modules }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matrix_parses() {
        let registry = RoleRegistry::hospital_default().expect("default matrix is valid");
        assert!(registry.has_module("appointments"));
        assert!(registry.has_module("pharmacy_types"));

        let accountant = registry.permissions_for(Role::Accountant, "payments");
        assert!(accountant.can_update);
        assert!(!accountant.can_delete);

        let consultations = registry.permissions_for(Role::Accountant, "consultations");
        assert!(consultations.granted().is_empty());
    }

    #[test]
    fn round_trips_default_matrix() {
        let registry = RoleRegistry::hospital_default().unwrap();
        let rendered = PermissionMatrix::render(&registry).expect("render matrix");
        let reparsed = PermissionMatrix::parse(&rendered).expect("reparse matrix");

        for module in registry.modules() {
            for role in Role::ALL {
                assert_eq!(
                    registry.permissions_for(role, module.as_str()),
                    reparsed.permissions_for(role, module.as_str())
                );
            }
        }
    }

    #[test]
    fn empty_module_is_declared_with_default_deny() {
        let registry = PermissionMatrix::parse("modules:\n  facilities: {}\n").unwrap();
        assert!(registry.has_module("facilities"));
        assert!(registry
            .permissions_for(Role::Admin, "facilities")
            .granted()
            .is_empty());
    }

    #[test]
    fn strict_validation_rejects_unknown_role() {
        let input = r#"modules:
  appointments:
    janitor: [read]
"#;
        let err = PermissionMatrix::parse(input).expect_err("janitor is not a role");
        match err {
            AccessError::Translation(msg) => {
                assert!(msg.contains("janitor"));
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_rejects_unknown_capability() {
        let input = r#"modules:
  appointments:
    doctor: [read, approve]
"#;
        let err = PermissionMatrix::parse(input).expect_err("approve is not a capability");
        match err {
            AccessError::Translation(msg) => {
                assert!(msg.contains("approve"));
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_rejects_unknown_top_level_keys() {
        let input = "modules: {}\nroles: []\n";
        let err = PermissionMatrix::parse(input).expect_err("roles key is not allowed");
        match err {
            AccessError::Translation(msg) => assert!(msg.contains("roles")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_module_name() {
        let input = r#"modules:
  "patient clerking":
    nurse: [read]
"#;
        let err = PermissionMatrix::parse(input).expect_err("module key has a space");
        assert!(matches!(err, AccessError::InvalidModule { .. }));
    }
}
