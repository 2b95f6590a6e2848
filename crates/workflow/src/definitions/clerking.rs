use crate::{DefinitionError, Guard, Transition, WorkflowDefinition, WorkflowType};
use access::Capability;

/// Patient-arrival clerking: `pending_assessment -> assessed -> admitted`.
///
/// No payload requirements beyond the state match. Admission is authorised by `Create` on
/// `admissions` because it opens the in-patient stay.
pub fn clerking() -> Result<WorkflowDefinition, DefinitionError> {
    WorkflowDefinition::builder(WorkflowType::Clerking, "patient_clerking")
        .states(&["pending_assessment", "assessed", "admitted"])
        .transition(
            Transition::new("pending_assessment", "assess", "assessed", "patient_clerking").guard(
                Guard::none()
                    .copy("assessmentNotes", "assessmentNotes")
                    .stamp("assessedAt"),
            ),
        )
        .transition(
            Transition::new("assessed", "admit", "admitted", "admissions")
                .capability(Capability::Create)
                .guard(Guard::none().copy("ward", "ward").stamp("admittedAt")),
        )
        .build()
}
