//! Built-in hospital workflows.

mod admission;
mod appointment;
mod clerking;
mod encounter;

pub use admission::ipd_admission;
pub use appointment::appointment;
pub use clerking::clerking;
pub use encounter::encounter;

use crate::{DefinitionError, WorkflowDefinition};

/// Every built-in definition.
pub fn standard() -> Result<Vec<WorkflowDefinition>, DefinitionError> {
    Ok(vec![appointment()?, clerking()?, ipd_admission()?, encounter()?])
}
