//! The role/module permission table.
//!
//! [`RoleRegistry`] is built once at process start and never mutated afterwards. Every declared
//! module carries exactly one [`PermissionEntry`] per [`Role`]; roles that were never granted
//! anything on a module receive an explicit all-false entry so the table is total over
//! `Role::ALL x modules`.

use crate::{module_key, AccessResult, Capability, ModuleKey, Role};
use serde::Serialize;
use std::collections::BTreeMap;

/// Create/read/update/delete flags for one role on one module.
///
/// The four flags are independent: a role may update without being able to delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PermissionEntry {
    pub role: Role,
    pub module: String,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl PermissionEntry {
    /// An entry that grants nothing.
    pub fn deny(role: Role, module: impl Into<String>) -> Self {
        Self {
            role,
            module: module.into(),
            can_create: false,
            can_read: false,
            can_update: false,
            can_delete: false,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Create => self.can_create,
            Capability::Read => self.can_read,
            Capability::Update => self.can_update,
            Capability::Delete => self.can_delete,
        }
    }

    /// The granted capabilities, in `Capability::ALL` order.
    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.allows(*cap))
            .collect()
    }

    fn grant(&mut self, capability: Capability) {
        match capability {
            Capability::Create => self.can_create = true,
            Capability::Read => self.can_read = true,
            Capability::Update => self.can_update = true,
            Capability::Delete => self.can_delete = true,
        }
    }
}

/// Immutable lookup table from `(role, module)` to [`PermissionEntry`].
#[derive(Clone, Debug, Default)]
pub struct RoleRegistry {
    table: BTreeMap<ModuleKey, BTreeMap<Role, PermissionEntry>>,
}

impl RoleRegistry {
    pub fn builder() -> RoleRegistryBuilder {
        RoleRegistryBuilder::default()
    }

    /// The built-in hospital permission matrix (see `permissions/default.yaml`).
    pub fn hospital_default() -> AccessResult<Self> {
        crate::PermissionMatrix::parse(crate::matrix::DEFAULT_MATRIX_YAML)
    }

    /// Returns the entry for `(role, module)`.
    ///
    /// Undeclared modules yield an all-false entry; nothing is ever granted implicitly.
    pub fn permissions_for(&self, role: Role, module: &str) -> PermissionEntry {
        self.table
            .get(module)
            .and_then(|entries| entries.get(&role))
            .cloned()
            .unwrap_or_else(|| PermissionEntry::deny(role, module))
    }

    /// Returns true if `module` was declared when the registry was built.
    pub fn has_module(&self, module: &str) -> bool {
        self.table.contains_key(module)
    }

    /// Declared modules in sorted order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleKey> {
        self.table.keys()
    }

    /// Every entry for `role`, one per declared module.
    pub fn entries_for_role(&self, role: Role) -> Vec<PermissionEntry> {
        self.table
            .values()
            .filter_map(|entries| entries.get(&role).cloned())
            .collect()
    }
}

/// Accumulates module declarations and grants, then fills default-deny entries on `build`.
#[derive(Debug, Default)]
pub struct RoleRegistryBuilder {
    table: BTreeMap<ModuleKey, BTreeMap<Role, PermissionEntry>>,
}

impl RoleRegistryBuilder {
    /// Declares a module with no grants.
    pub fn module(mut self, module: &str) -> AccessResult<Self> {
        let key = module_key(module)?;
        self.table.entry(key).or_default();
        Ok(self)
    }

    /// Grants `capabilities` to `role` on `module`, declaring the module if needed.
    ///
    /// Grants accumulate: granting `Read` then `Update` leaves both set.
    pub fn grant(
        mut self,
        role: Role,
        module: &str,
        capabilities: &[Capability],
    ) -> AccessResult<Self> {
        let key = module_key(module)?;
        let entry = self
            .table
            .entry(key.clone())
            .or_default()
            .entry(role)
            .or_insert_with(|| PermissionEntry::deny(role, key.as_str()));
        for capability in capabilities {
            entry.grant(*capability);
        }
        Ok(self)
    }

    pub fn build(mut self) -> RoleRegistry {
        for (module, entries) in self.table.iter_mut() {
            for role in Role::ALL {
                entries
                    .entry(role)
                    .or_insert_with(|| PermissionEntry::deny(role, module.as_str()));
            }
        }
        RoleRegistry { table: self.table }
    }
}
