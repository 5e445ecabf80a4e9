//! Capability set shared by the issue / work item backends.
//!
//! Every operation is a single best-effort attempt. Implementations never
//! return errors: an unconfigured client or a failed call yields `None` /
//! `false` and logs a warning, because tracker sync must never block the git
//! workflow.

use crate::types::{PlatformKind, TaskStatus};
use serde::Serialize;

pub trait PlatformClient {
    fn kind(&self) -> PlatformKind;

    /// All identity fields present and the integration enabled.
    fn is_configured(&self) -> bool;

    /// Create an issue / work item; returns its number.
    fn create_item(&self, title: &str, body: &str, tags: &[String]) -> Option<u64>;

    /// Reflect `status` on the item (label swap or state change).
    fn update_state(&self, id: u64, status: TaskStatus) -> bool;

    fn add_comment(&self, id: u64, text: &str) -> bool;

    /// Comment (when given) and then close the item.
    fn close_item(&self, id: u64, comment: Option<&str>) -> bool;

    /// Probe the external tool / credentials.
    fn readiness(&self) -> Readiness;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Readiness {
    pub fn ready() -> Self {
        Self {
            ready: true,
            hint: None,
        }
    }

    pub fn not_ready(hint: impl Into<String>) -> Self {
        Self {
            ready: false,
            hint: Some(hint.into()),
        }
    }
}
