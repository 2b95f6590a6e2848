//! Record identifiers and sharded storage paths.
//!
//! Records are addressed by a *canonical* identifier: the record's UUID as **32 lowercase
//! hexadecimal characters** with no hyphens, e.g. `550e8400e29b41d4a716446655440000`.
//! Identifiers supplied from outside (CLI arguments, URL paths) must already be canonical;
//! hyphenated or uppercase forms are rejected rather than normalised, so one record never has
//! two spellings.
//!
//! On disk a record lives under `parent_dir/<id[0..2]>/<id[2..4]>/<id>/`.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use ::uuid::Uuid;

/// A validated, canonical record identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Parses an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> CoreResult<Self> {
        if !Self::is_canonical(input) {
            return Err(CoreError::InvalidInput(format!(
                "record id must be 32 lowercase hex characters without hyphens, got: '{input}'"
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| CoreError::InvalidInput(format!("invalid record id '{input}': {e}")))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/`.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        parent_dir
            .join(&canonical[0..2])
            .join(&canonical[2..4])
            .join(&canonical)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}
