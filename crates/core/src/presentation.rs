//! Display ordering for record lists.
//!
//! Ordering is a view over records; it never changes them.

use std::cmp::{Ordering, Reverse};
use workflow::{EncounterRecord, WorkflowCatalog};

/// Orders records finished-first: records in a terminal state, then records further along
/// their workflow, then oldest first.
pub fn sort_finished_first(records: &mut [EncounterRecord], catalog: &WorkflowCatalog) {
    records.sort_by(|a, b| compare(a, b, catalog));
}

fn compare(a: &EncounterRecord, b: &EncounterRecord, catalog: &WorkflowCatalog) -> Ordering {
    let key = |r: &EncounterRecord| {
        let progress = catalog
            .get(r.workflow_type())
            .map(|d| {
                (
                    d.is_terminal(r.current_state()),
                    d.state_index(r.current_state()).unwrap_or(0),
                )
            })
            .unwrap_or((false, 0));
        (Reverse(progress.0), Reverse(progress.1), r.created_at())
    };
    key(a).cmp(&key(b))
}
