//! Workflow definitions.
//!
//! A definition is the full state graph of one workflow type: ordered states, one initial
//! state, and a transition table keyed by `(from, action)`. Definitions are validated when
//! built, so a [`WorkflowDefinition`] value always satisfies:
//! - states are unique, valid keys, and there is at least one;
//! - the initial state and every transition endpoint are declared states;
//! - at most one transition exists per `(from, action)`;
//! - non-exception transitions move strictly forward in declaration order;
//! - at least one state has no outgoing transitions.

use crate::{DefinitionError, Guard, WorkflowType};
use access::Capability;
use clerk_types::Key;
use serde::Serialize;
use std::collections::HashSet;

/// One edge of the state graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: String,
    pub action: String,
    pub to: String,
    /// Module whose capability authorises this transition.
    pub module: String,
    pub capability: Capability,
    pub guard: Guard,
    /// Exception transitions (cancel, discharge, revert) may target any state.
    pub is_exception: bool,
}

impl Transition {
    /// A forward transition authorised by `Update` on `module`, with no guard.
    pub fn new(from: &str, action: &str, to: &str, module: &str) -> Self {
        Self {
            from: from.to_owned(),
            action: action.to_owned(),
            to: to.to_owned(),
            module: module.to_owned(),
            capability: Capability::Update,
            guard: Guard::none(),
            is_exception: false,
        }
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }

    pub fn exception(mut self) -> Self {
        self.is_exception = true;
        self
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WorkflowDefinition {
    workflow_type: WorkflowType,
    module: String,
    states: Vec<String>,
    initial: String,
    transitions: Vec<Transition>,
}

impl WorkflowDefinition {
    /// Start a definition whose records live in `module` (the module checked for record
    /// create, read and delete).
    pub fn builder(workflow_type: WorkflowType, module: &str) -> WorkflowDefinitionBuilder {
        WorkflowDefinitionBuilder {
            workflow_type,
            module: module.to_owned(),
            states: Vec::new(),
            initial: None,
            transitions: Vec::new(),
        }
    }

    pub fn workflow_type(&self) -> WorkflowType {
        self.workflow_type
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn initial_state(&self) -> &str {
        &self.initial
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The transition for `action` from `from`, if any.
    pub fn transition_for(&self, from: &str, action: &str) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.action == action)
    }

    pub fn transitions_from<'a>(&'a self, from: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.from == from)
    }

    /// Position of `state` in the declared ordering.
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    pub fn is_terminal(&self, state: &str) -> bool {
        self.transitions_from(state).next().is_none()
    }

    /// Every module referenced by the definition, record module first.
    pub fn modules(&self) -> Vec<&str> {
        let mut modules = vec![self.module.as_str()];
        for t in &self.transitions {
            if !modules.contains(&t.module.as_str()) {
                modules.push(t.module.as_str());
            }
        }
        modules
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        let workflow = self.workflow_type;
        let check_name = |name: &str| {
            Key::new(name)
                .map(|_| ())
                .map_err(|e| DefinitionError::InvalidName {
                    workflow,
                    name: name.to_owned(),
                    reason: e.to_string(),
                })
        };

        if self.states.is_empty() {
            return Err(DefinitionError::NoStates { workflow });
        }

        check_name(&self.module)?;
        let mut seen = HashSet::new();
        for state in &self.states {
            check_name(state)?;
            if !seen.insert(state.as_str()) {
                return Err(DefinitionError::DuplicateState {
                    workflow,
                    state: state.clone(),
                });
            }
        }

        if self.state_index(&self.initial).is_none() {
            return Err(DefinitionError::UnknownInitialState {
                workflow,
                state: self.initial.clone(),
            });
        }

        let mut keys = HashSet::new();
        for t in &self.transitions {
            check_name(&t.action)?;
            check_name(&t.module)?;
            for field in t.guard.field_names() {
                check_name(field)?;
            }

            let from = self.state_index(&t.from);
            let to = self.state_index(&t.to);
            let (Some(from), Some(to)) = (from, to) else {
                let state = if from.is_none() { &t.from } else { &t.to };
                return Err(DefinitionError::UnknownState {
                    workflow,
                    action: t.action.clone(),
                    state: state.clone(),
                });
            };

            if !keys.insert((t.from.as_str(), t.action.as_str())) {
                return Err(DefinitionError::DuplicateTransition {
                    workflow,
                    from: t.from.clone(),
                    action: t.action.clone(),
                });
            }

            if !t.is_exception && to <= from {
                return Err(DefinitionError::BackwardTransition {
                    workflow,
                    from: t.from.clone(),
                    action: t.action.clone(),
                    to: t.to.clone(),
                });
            }
        }

        if !self.states.iter().any(|s| self.is_terminal(s)) {
            return Err(DefinitionError::NoTerminalState { workflow });
        }

        Ok(())
    }
}

/// Builder for [`WorkflowDefinition`]; validation runs in [`build`](Self::build).
#[derive(Debug)]
pub struct WorkflowDefinitionBuilder {
    workflow_type: WorkflowType,
    module: String,
    states: Vec<String>,
    initial: Option<String>,
    transitions: Vec<Transition>,
}

impl WorkflowDefinitionBuilder {
    /// Declare states in lifecycle order. The first state is the initial state unless
    /// [`initial`](Self::initial) says otherwise.
    pub fn states(mut self, states: &[&str]) -> Self {
        self.states.extend(states.iter().map(|s| (*s).to_owned()));
        self
    }

    pub fn initial(mut self, state: &str) -> Self {
        self.initial = Some(state.to_owned());
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add the same transition from each of several source states.
    pub fn transition_from_each(mut self, from: &[&str], transition: Transition) -> Self {
        for state in from {
            let mut t = transition.clone();
            t.from = (*state).to_owned();
            self.transitions.push(t);
        }
        self
    }

    pub fn build(self) -> Result<WorkflowDefinition, DefinitionError> {
        let initial = self
            .initial
            .or_else(|| self.states.first().cloned())
            .unwrap_or_default();
        let definition = WorkflowDefinition {
            workflow_type: self.workflow_type,
            module: self.module,
            states: self.states,
            initial,
            transitions: self.transitions,
        };
        definition.validate()?;
        Ok(definition)
    }
}
