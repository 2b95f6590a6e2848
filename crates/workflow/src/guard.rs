//! Transition guards.
//!
//! A guard is a declarative predicate over the action payload and the current record payload,
//! plus the fields it merges into the record when the transition succeeds. Merges are explicit
//! and listed on the guard so every payload change a transition makes can be read off its
//! definition.
//!
//! Evaluation order:
//! 1. every `required` field must be present in the action payload (non-null, and non-blank
//!    when a string), otherwise the guard fails and nothing is merged;
//! 2. `copies` move present action-payload fields into the record under their target name;
//! 3. `fallbacks` fill a target from another record field when step 2 left it unset;
//! 4. `stamps` set fields to the transition timestamp.

use crate::Payload;
use clerk_types::NonEmptyText;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Guard {
    required: Vec<String>,
    copies: Vec<FieldCopy>,
    fallbacks: Vec<FieldFallback>,
    stamps: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FieldCopy {
    from: String,
    to: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FieldFallback {
    target: String,
    source: String,
}

impl Guard {
    /// A guard that always passes and merges nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn require(mut self, field: &str) -> Self {
        self.required.push(field.to_owned());
        self
    }

    /// Copy `from` in the action payload to `to` in the record payload, when present.
    pub fn copy(mut self, from: &str, to: &str) -> Self {
        self.copies.push(FieldCopy {
            from: from.to_owned(),
            to: to.to_owned(),
        });
        self
    }

    /// Require `field` and copy it into the record under the same name.
    pub fn require_and_keep(self, field: &str) -> Self {
        self.require(field).copy(field, field)
    }

    /// If `target` was not supplied by the action, take it from the record's `source` field.
    pub fn fallback(mut self, target: &str, source: &str) -> Self {
        self.fallbacks.push(FieldFallback {
            target: target.to_owned(),
            source: source.to_owned(),
        });
        self
    }

    /// Set `field` to the transition timestamp (RFC 3339, UTC, millisecond precision).
    pub fn stamp(mut self, field: &str) -> Self {
        self.stamps.push(field.to_owned());
        self
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    /// Every record field this guard may write on success.
    pub fn merged_fields(&self) -> Vec<&str> {
        self.copies
            .iter()
            .map(|c| c.to.as_str())
            .chain(self.fallbacks.iter().map(|f| f.target.as_str()))
            .chain(self.stamps.iter().map(String::as_str))
            .collect()
    }

    /// Every field name the guard refers to, for definition validation.
    pub(crate) fn field_names(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .map(String::as_str)
            .chain(
                self.copies
                    .iter()
                    .flat_map(|c| [c.from.as_str(), c.to.as_str()]),
            )
            .chain(
                self.fallbacks
                    .iter()
                    .flat_map(|f| [f.target.as_str(), f.source.as_str()]),
            )
            .chain(self.stamps.iter().map(String::as_str))
    }

    /// Evaluates the guard.
    ///
    /// Returns the fields to merge into the record payload, or the failure reason. Neither
    /// payload is modified.
    pub fn evaluate(
        &self,
        action_payload: &Payload,
        record_payload: &Payload,
        at: DateTime<Utc>,
    ) -> Result<Payload, String> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|field| !is_present(action_payload.get(field.as_str())))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(required_reason(&missing));
        }

        let mut merge = Payload::new();
        for copy in &self.copies {
            if let Some(value) = action_payload.get(&copy.from) {
                if is_present(Some(value)) {
                    merge.insert(copy.to.clone(), value.clone());
                }
            }
        }
        for fallback in &self.fallbacks {
            if merge.contains_key(&fallback.target) {
                continue;
            }
            if let Some(value) = record_payload.get(&fallback.source) {
                if is_present(Some(value)) {
                    merge.insert(fallback.target.clone(), value.clone());
                }
            }
        }
        let stamp = Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true));
        for field in &self.stamps {
            merge.insert(field.clone(), stamp.clone());
        }

        Ok(merge)
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => NonEmptyText::new(s).is_ok(),
        Some(_) => true,
    }
}

/// "date is required", "date and time are required", "a, b and c are required".
fn required_reason(missing: &[&str]) -> String {
    match missing {
        [] => String::new(),
        [only] => format!("{only} is required"),
        [init @ .., last] => format!("{} and {last} are required", init.join(", ")),
    }
}
