use thiserror::Error;

#[derive(Debug, Error)]
pub enum Agentic15Error {
    #[error("not initialized: run 'agentic15 init'")]
    NotInitialized,

    #[error("no active plan: run 'agentic15 plan generate <requirements>'")]
    NoActivePlan,

    #[error("plan not found: {0}")]
    PlanNotFound(String),

    #[error("plan already exists: {0}")]
    PlanExists(String),

    #[error("plan '{0}' is already locked")]
    PlanAlreadyLocked(String),

    #[error("plan '{0}' is not locked: run 'agentic15 plan lock'")]
    PlanNotLocked(String),

    #[error("invalid plan document: {0}")]
    InvalidPlan(String),

    #[error("invalid task id '{0}': expected TASK-NNN")]
    InvalidTaskId(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already in progress: {0} (finish it with 'agentic15 commit' or 'agentic15 task reset')")]
    TaskAlreadyInProgress(String),

    #[error("no task in progress: run 'agentic15 task next'")]
    NoTaskInProgress,

    #[error("invalid transition for {task} from {from} to {to}")]
    InvalidTransition {
        task: String,
        from: String,
        to: String,
    },

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid platform '{0}': expected 'github' or 'azure'")]
    InvalidPlatform(String),

    #[error("not on task branch {expected} (HEAD is {actual}): run 'git checkout {expected}'")]
    BranchMismatch { expected: String, actual: String },

    #[error("git {command} failed: {message}")]
    GitFailed { command: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Agentic15Error>;
