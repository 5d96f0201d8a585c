use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states for a migration work item.
///
/// `Rejected` and `Failed` are both terminal error states; they differ only in
/// when the failure was detected (pre-submission validation vs. a
/// provider-reported task error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    /// Initial state when the work item is created from an input row
    Pending,
    /// Precondition checks are being evaluated
    Validating,
    /// Validation failed; the item was never submitted
    Rejected,
    /// Validation passed; placement is resolved and submission is imminent
    Scheduled,
    /// A provider relocation task is in flight
    Running,
    /// The provider reported the relocation complete
    Succeeded,
    /// The provider reported the relocation failed
    Failed,
}

impl WorkItemStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Succeeded | Self::Failed)
    }

    /// Check if this is an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Rejected | Self::Failed)
    }

    /// Check if a provider task is currently in flight for this state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether a direct transition from `self` to `next` is legal.
    pub fn can_transition_to(&self, next: WorkItemStatus) -> bool {
        use WorkItemStatus::*;
        matches!(
            (self, next),
            (Pending, Validating)
                | (Validating, Rejected)
                | (Validating, Scheduled)
                | (Scheduled, Running)
                | (Scheduled, Failed)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Validating => write!(f, "validating"),
            Self::Rejected => write!(f, "rejected"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for WorkItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "validating" => Ok(Self::Validating),
            "rejected" => Ok(Self::Rejected),
            "scheduled" => Ok(Self::Scheduled),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid work item status: {s}")),
        }
    }
}
