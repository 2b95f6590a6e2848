//! Appointment lifecycle.
//!
//! `pending_payment -> paid -> scheduled -> in_progress -> completed`, with `cancelled`
//! reachable only through the `cancel` exception and `reschedule` stepping a scheduled
//! appointment back to `paid` for a new slot.

use crate::{DefinitionError, Guard, Transition, WorkflowDefinition, WorkflowType};

pub fn appointment() -> Result<WorkflowDefinition, DefinitionError> {
    WorkflowDefinition::builder(WorkflowType::Appointment, "appointments")
        .states(&[
            "pending_payment",
            "paid",
            "scheduled",
            "in_progress",
            "completed",
            "cancelled",
        ])
        .transition(
            Transition::new("pending_payment", "markPaid", "paid", "payments").guard(
                Guard::none()
                    .copy("receiptNumber", "receiptNumber")
                    .stamp("paidAt"),
            ),
        )
        .transition(
            Transition::new("paid", "allocate", "scheduled", "appointments").guard(
                Guard::none()
                    .require("date")
                    .require("time")
                    .copy("date", "allocatedDate")
                    .copy("time", "allocatedTime")
                    .copy("doctor", "doctor")
                    .fallback("doctor", "preferredDoctor"),
            ),
        )
        .transition(
            Transition::new("scheduled", "start", "in_progress", "consultations")
                .guard(Guard::none().stamp("startedAt")),
        )
        .transition(
            Transition::new("in_progress", "finish", "completed", "consultations").guard(
                Guard::none()
                    .copy("notes", "consultationNotes")
                    .stamp("completedAt"),
            ),
        )
        .transition(
            Transition::new("scheduled", "reschedule", "paid", "appointments")
                .exception()
                .guard(Guard::none().stamp("rescheduledAt")),
        )
        .transition_from_each(
            &["pending_payment", "paid", "scheduled"],
            Transition::new("", "cancel", "cancelled", "appointments")
                .exception()
                .guard(
                    Guard::none()
                        .require("reason")
                        .copy("reason", "cancellationReason")
                        .stamp("cancelledAt"),
                ),
        )
        .build()
}
