//! The single authorisation check.

use crate::{Capability, PermissionEntry, Role, RoleRegistry};
use std::sync::Arc;

/// Decides whether a role may exercise a capability on a module.
///
/// The gate fails closed. Any lookup miss answers `false`, and so does a missing or
/// unparseable role or capability on the string boundary. `false` means "deny"; it is not an
/// error that needs a fallback path.
#[derive(Clone, Debug)]
pub struct PermissionGate {
    registry: Arc<RoleRegistry>,
}

impl PermissionGate {
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Returns true if `role` holds `capability` on `module`.
    pub fn authorize(&self, role: Role, module: &str, capability: Capability) -> bool {
        let allowed = self
            .registry
            .permissions_for(role, module)
            .allows(capability);
        tracing::debug!(%role, module, %capability, allowed, "permission check");
        allowed
    }

    /// String-boundary form of [`authorize`](Self::authorize) for callers holding unparsed
    /// values (request headers, CLI arguments).
    pub fn authorize_raw(&self, role: Option<&str>, module: &str, capability: &str) -> bool {
        let Some(role) = role.and_then(|r| r.parse::<Role>().ok()) else {
            return false;
        };
        let Ok(capability) = capability.parse::<Capability>() else {
            return false;
        };
        self.authorize(role, module, capability)
    }

    /// The full entry for `(role, module)`, for UI visibility decisions.
    pub fn permissions(&self, role: Role, module: &str) -> PermissionEntry {
        self.registry.permissions_for(role, module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Capability::*;

    fn gate() -> PermissionGate {
        let registry = RoleRegistry::builder()
            .grant(Role::Doctor, "consultations", &[Read, Update])
            .unwrap()
            .grant(Role::Accountant, "payments", &[Update])
            .unwrap()
            .build();
        PermissionGate::new(Arc::new(registry))
    }

    #[test]
    fn allows_granted_capability() {
        assert!(gate().authorize(Role::Doctor, "consultations", Update));
    }

    #[test]
    fn denies_ungranted_capability() {
        let gate = gate();
        assert!(!gate.authorize(Role::Doctor, "consultations", Delete));
        assert!(!gate.authorize(Role::Accountant, "consultations", Update));
    }

    #[test]
    fn denies_unknown_module() {
        assert!(!gate().authorize(Role::Doctor, "theatre", Read));
    }

    #[test]
    fn raw_form_fails_closed() {
        let gate = gate();
        assert!(gate.authorize_raw(Some("doctor"), "consultations", "update"));
        assert!(!gate.authorize_raw(None, "consultations", "update"));
        assert!(!gate.authorize_raw(Some("surgeon"), "consultations", "update"));
        assert!(!gate.authorize_raw(Some("doctor"), "consultations", "approve"));
        assert!(!gate.authorize_raw(Some("doctor"), "", "read"));
    }
}
