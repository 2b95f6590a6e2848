//! # Workflow
//!
//! Declarative record lifecycles and the engine that advances them.
//!
//! - [`WorkflowDefinition`]: ordered states plus a deterministic transition table
//! - [`Guard`]: payload predicate with documented merge side effects
//! - [`WorkflowCatalog`]: the definitions known to a process
//! - [`WorkflowEngine`]: resolves, authorises, guards and applies one action to one record
//! - [`EncounterRecord`]: the record the engine advances, with its append-only history
//!
//! **No storage concerns**: the engine is handed a freshly loaded record and returns the
//! updated copy. Loading, saving and per-record write exclusion belong to `clerk-core`.

pub mod catalog;
pub mod definition;
pub mod definitions;
pub mod engine;
pub mod guard;
pub mod record;
pub mod workflow_type;

pub use catalog::WorkflowCatalog;
pub use definition::{Transition, WorkflowDefinition, WorkflowDefinitionBuilder};
pub use engine::{AvailableAction, WorkflowEngine};
pub use guard::Guard;
pub use record::{EncounterRecord, HistoryEntry};
pub use workflow_type::WorkflowType;

use access::{Capability, Role};

/// Open key/value bag carried by records and supplied with actions.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Errors raised while building or validating workflow definitions.
///
/// These are configuration errors detected at process start, never at transition time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("{workflow}: no states declared")]
    NoStates { workflow: WorkflowType },

    #[error("{workflow}: invalid name '{name}': {reason}")]
    InvalidName {
        workflow: WorkflowType,
        name: String,
        reason: String,
    },

    #[error("{workflow}: state '{state}' declared more than once")]
    DuplicateState {
        workflow: WorkflowType,
        state: String,
    },

    #[error("{workflow}: initial state '{state}' is not a declared state")]
    UnknownInitialState {
        workflow: WorkflowType,
        state: String,
    },

    #[error("{workflow}: transition '{action}' references undeclared state '{state}'")]
    UnknownState {
        workflow: WorkflowType,
        action: String,
        state: String,
    },

    #[error("{workflow}: more than one transition for action '{action}' from '{from}'")]
    DuplicateTransition {
        workflow: WorkflowType,
        from: String,
        action: String,
    },

    #[error("{workflow}: non-exception transition '{action}' moves backwards from '{from}' to '{to}'")]
    BackwardTransition {
        workflow: WorkflowType,
        from: String,
        action: String,
        to: String,
    },

    #[error("{workflow}: no terminal state (every state has an outgoing transition)")]
    NoTerminalState { workflow: WorkflowType },

    #[error("workflow '{0}' is defined more than once")]
    DuplicateWorkflow(WorkflowType),

    #[error("{workflow}: module '{module}' is not declared in the role registry")]
    UndeclaredModule {
        workflow: WorkflowType,
        module: String,
    },
}

/// Failure outcomes of a workflow action.
///
/// Every variant is an expected result of user input or stale state. None is retried by the
/// engine; all are returned to the caller that invoked it.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// No transition for this action from the record's current state (or the record was
    /// deleted). Usually a stale view: the record is no longer in the state the caller saw.
    #[error("action '{action}' is not available for a {workflow} record in state '{state}'")]
    InvalidTransition {
        workflow: WorkflowType,
        state: String,
        action: String,
    },

    /// The role lacks the module capability the action requires.
    #[error("role '{role}' may not {capability} on module '{module}'")]
    Unauthorized {
        role: Role,
        module: String,
        capability: Capability,
    },

    /// The action payload is missing or has invalid required fields.
    #[error("{0}")]
    GuardFailed(String),

    /// The record names a workflow type the catalog does not define.
    #[error("no definition registered for workflow '{0}'")]
    UnknownWorkflow(WorkflowType),
}

/// Type alias for Results that can fail with a [`WorkflowError`].
pub type WorkflowResult<T> = Result<T, WorkflowError>;
