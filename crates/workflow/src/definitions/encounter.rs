//! Clinical encounter checklist.
//!
//! Nursing steps (`triage`, `recordVitals`) are authorised on `encounters`; clinical steps
//! (`examine`, `recordPlan`, `close`) on `consultations`, so only prescribers can sign them
//! off. An encounter can be abandoned before vitals are taken.

use crate::{DefinitionError, Guard, Transition, WorkflowDefinition, WorkflowType};

pub fn encounter() -> Result<WorkflowDefinition, DefinitionError> {
    WorkflowDefinition::builder(WorkflowType::Encounter, "encounters")
        .states(&[
            "checked_in",
            "triaged",
            "vitals_recorded",
            "examined",
            "plan_recorded",
            "closed",
            "abandoned",
        ])
        .transition(
            Transition::new("checked_in", "triage", "triaged", "encounters").guard(
                Guard::none()
                    .require_and_keep("triageCategory")
                    .stamp("triagedAt"),
            ),
        )
        .transition(
            Transition::new("triaged", "recordVitals", "vitals_recorded", "encounters").guard(
                Guard::none()
                    .require_and_keep("temperature")
                    .require_and_keep("pulse")
                    .require_and_keep("bloodPressure")
                    .copy("respiratoryRate", "respiratoryRate")
                    .copy("oxygenSaturation", "oxygenSaturation"),
            ),
        )
        .transition(
            Transition::new("vitals_recorded", "examine", "examined", "consultations")
                .guard(Guard::none().require_and_keep("findings")),
        )
        .transition(
            Transition::new("examined", "recordPlan", "plan_recorded", "consultations").guard(
                Guard::none()
                    .require_and_keep("plan")
                    .copy("prescription", "prescription"),
            ),
        )
        .transition(
            Transition::new("plan_recorded", "close", "closed", "consultations")
                .guard(Guard::none().stamp("closedAt")),
        )
        .transition_from_each(
            &["checked_in", "triaged"],
            Transition::new("", "abandon", "abandoned", "encounters")
                .exception()
                .guard(
                    Guard::none()
                        .require("reason")
                        .copy("reason", "abandonReason")
                        .stamp("abandonedAt"),
                ),
        )
        .build()
}
