use crate::{DefinitionError, Guard, Transition, WorkflowDefinition, WorkflowType};

/// In-patient stay: `admitted -> discharged | transferred`. Both outcomes are terminal.
pub fn ipd_admission() -> Result<WorkflowDefinition, DefinitionError> {
    WorkflowDefinition::builder(WorkflowType::IpdAdmission, "admissions")
        .states(&["admitted", "discharged", "transferred"])
        .transition(
            Transition::new("admitted", "discharge", "discharged", "admissions")
                .exception()
                .guard(
                    Guard::none()
                        .copy("dischargeSummary", "dischargeSummary")
                        .stamp("dischargeDate"),
                ),
        )
        .transition(
            Transition::new("admitted", "transfer", "transferred", "admissions")
                .exception()
                .guard(
                    Guard::none()
                        .require_and_keep("destinationWard")
                        .stamp("transferDate"),
                ),
        )
        .build()
}
