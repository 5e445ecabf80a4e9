use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn all() -> &'static [TaskStatus] {
        &[
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// `completed` is terminal; `blocked` is reachable from any non-terminal
    /// state and only leaves back to `pending`.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Completed)
                | (InProgress, Pending)
                | (Pending, Blocked)
                | (InProgress, Blocked)
                | (Blocked, Pending)
        )
    }

    /// GitHub issue label carrying this status. The label strings are shared
    /// with existing issue histories and must not change.
    pub fn github_label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "status: pending",
            TaskStatus::InProgress => "status: in-progress",
            TaskStatus::Completed => "status: completed",
            TaskStatus::Blocked => "status: blocked",
        }
    }

    /// Azure DevOps work item `System.State` for this status.
    pub fn azure_state(self) -> &'static str {
        match self {
            TaskStatus::Pending | TaskStatus::Blocked => "New",
            TaskStatus::InProgress => "Active",
            TaskStatus::Completed => "Closed",
        }
    }

    /// Extra work item tag, only for statuses Azure has no state for.
    pub fn azure_tag(self) -> Option<&'static str> {
        match self {
            TaskStatus::Blocked => Some("blocked"),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::error::Agentic15Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            _ => Err(crate::error::Agentic15Error::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PlatformKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformKind {
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "azure")]
    Azure,
}

impl PlatformKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformKind::GitHub => "github",
            PlatformKind::Azure => "azure",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PlatformKind::GitHub => "GitHub",
            PlatformKind::Azure => "Azure DevOps",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlatformKind {
    type Err = crate::error::Agentic15Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(PlatformKind::GitHub),
            "azure" | "azure-devops" | "azureDevOps" => Ok(PlatformKind::Azure),
            _ => Err(crate::error::Agentic15Error::InvalidPlatform(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
