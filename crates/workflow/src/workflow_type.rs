use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The lifecycle a record follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// Booking, payment, scheduling, consultation, completion.
    Appointment,
    /// Patient-arrival clerking through assessment to admission.
    Clerking,
    /// In-patient stay ending in discharge or transfer.
    IpdAdmission,
    /// Multi-step clinical encounter checklist.
    Encounter,
}

impl WorkflowType {
    pub const ALL: [WorkflowType; 4] = [
        WorkflowType::Appointment,
        WorkflowType::Clerking,
        WorkflowType::IpdAdmission,
        WorkflowType::Encounter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::Appointment => "appointment",
            WorkflowType::Clerking => "clerking",
            WorkflowType::IpdAdmission => "ipd_admission",
            WorkflowType::Encounter => "encounter",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown workflow name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown workflow type: {0}")]
pub struct UnknownWorkflowType(pub String);

impl FromStr for WorkflowType {
    type Err = UnknownWorkflowType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase();
        WorkflowType::ALL
            .into_iter()
            .find(|wt| wt.as_str() == normalised)
            .ok_or_else(|| UnknownWorkflowType(s.to_owned()))
    }
}
