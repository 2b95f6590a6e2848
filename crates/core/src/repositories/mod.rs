//! Record storage.
//!
//! [`RecordRepository`] is the seam between [`RecordService`](crate::RecordService) and
//! wherever records live. Saves are compare-and-swap on [`EncounterRecord::version`]: a save
//! succeeds only if the stored version still equals the version the caller loaded, so two
//! concurrent transitions on one record cannot both land.

pub mod file;
pub mod memory;

pub use file::FileRepository;
pub use memory::InMemoryRepository;

use crate::{CoreResult, RecordId};
use workflow::EncounterRecord;

pub trait RecordRepository: Send + Sync {
    /// Stores a new record and returns it at version 1.
    ///
    /// Fails with [`CoreError::AlreadyExists`](crate::CoreError::AlreadyExists) if the id is
    /// taken.
    fn insert(&self, record: EncounterRecord) -> CoreResult<EncounterRecord>;

    /// Fails with [`CoreError::NotFound`](crate::CoreError::NotFound) for unknown ids.
    fn load(&self, id: &RecordId) -> CoreResult<EncounterRecord>;

    /// Replaces a stored record if its stored version equals `record.version()`, returning
    /// the record at the next version.
    ///
    /// Fails with [`CoreError::Conflict`](crate::CoreError::Conflict) when the stored record
    /// has moved on.
    fn save(&self, record: EncounterRecord) -> CoreResult<EncounterRecord>;

    /// Every stored record, including soft-deleted ones, in no particular order.
    fn list(&self) -> CoreResult<Vec<EncounterRecord>>;
}

pub(crate) fn check_version(
    id: &RecordId,
    stored: u64,
    incoming: u64,
) -> CoreResult<()> {
    if stored == incoming {
        return Ok(());
    }
    tracing::warn!(record_id = %id, stored, incoming, "stale record version");
    Err(crate::CoreError::Conflict {
        id: id.to_string(),
        expected: incoming,
        found: stored,
    })
}
