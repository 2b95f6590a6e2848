use crate::{definitions, DefinitionError, WorkflowDefinition, WorkflowType};
use access::RoleRegistry;
use std::collections::BTreeMap;

/// The workflow definitions known to a process, keyed by type.
///
/// Read-only after construction; share it behind an `Arc`.
#[derive(Clone, Debug, Default)]
pub struct WorkflowCatalog {
    definitions: BTreeMap<WorkflowType, WorkflowDefinition>,
}

impl WorkflowCatalog {
    pub fn new(definitions: Vec<WorkflowDefinition>) -> Result<Self, DefinitionError> {
        let mut map = BTreeMap::new();
        for definition in definitions {
            let workflow_type = definition.workflow_type();
            if map.insert(workflow_type, definition).is_some() {
                return Err(DefinitionError::DuplicateWorkflow(workflow_type));
            }
        }
        Ok(Self { definitions: map })
    }

    /// The built-in appointment, clerking, in-patient and encounter workflows.
    pub fn standard() -> Result<Self, DefinitionError> {
        Self::new(definitions::standard()?)
    }

    pub fn get(&self, workflow_type: WorkflowType) -> Option<&WorkflowDefinition> {
        self.definitions.get(&workflow_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkflowDefinition> {
        self.definitions.values()
    }

    /// Checks that every module a definition uses is declared in `registry`.
    ///
    /// A declared module carries an entry (possibly all-false) for every role, so after this
    /// check every `(role, module)` pair a transition can ask about has an explicit entry.
    pub fn validate_against(&self, registry: &RoleRegistry) -> Result<(), DefinitionError> {
        for definition in self.iter() {
            for module in definition.modules() {
                if !registry.has_module(module) {
                    return Err(DefinitionError::UndeclaredModule {
                        workflow: definition.workflow_type(),
                        module: module.to_owned(),
                    });
                }
            }
        }
        Ok(())
    }
}
