use crate::error::{Agentic15Error, Result};
use crate::paths;
use crate::types::{PlatformKind, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full task record, stored at `.claude/plans/<plan>/tasks/<TASK-ID>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completion_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocker: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            phase: None,
            tags: Vec::new(),
            completion_criteria: Vec::new(),
            issue_number: None,
            work_item_id: None,
            started_at: None,
            completed_at: None,
            blocker: None,
        }
    }

    pub fn branch_name(&self) -> String {
        paths::branch_name(&self.id)
    }

    /// Linked issue or work item on `platform`.
    pub fn external_id(&self, platform: PlatformKind) -> Option<u64> {
        match platform {
            PlatformKind::GitHub => self.issue_number,
            PlatformKind::Azure => self.work_item_id,
        }
    }

    pub fn set_external_id(&mut self, platform: PlatformKind, id: u64) {
        match platform {
            PlatformKind::GitHub => self.issue_number = Some(id),
            PlatformKind::Azure => self.work_item_id = Some(id),
        }
    }

    /// Markdown body used for the linked issue / work item.
    pub fn item_body(&self) -> String {
        let mut body = String::new();
        if !self.description.is_empty() {
            body.push_str(&self.description);
            body.push_str("\n\n");
        }
        if !self.completion_criteria.is_empty() {
            body.push_str("## Completion Criteria\n\n");
            for c in &self.completion_criteria {
                body.push_str(&format!("- [ ] {c}\n"));
            }
            body.push('\n');
        }
        if let Some(phase) = &self.phase {
            body.push_str(&format!("**Phase:** {phase}\n\n"));
        }
        body.push_str(&format!("**Task ID:** {}\n", self.id));
        body
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn load(root: &Path, plan_id: &str, task_id: &str) -> Result<Self> {
        let path = paths::task_path(root, plan_id, task_id);
        if !path.exists() {
            return Err(Agentic15Error::TaskNotFound(task_id.to_string()));
        }
        crate::io::read_json(&path)
    }

    pub fn save(&self, root: &Path, plan_id: &str) -> Result<()> {
        crate::io::write_json(&paths::task_path(root, plan_id, &self.id), self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn task_json_uses_camel_case() {
        let mut task = Task::new("TASK-001", "Set up CI");
        task.completion_criteria.push("pipeline green".to_string());
        task.issue_number = Some(12);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["completionCriteria"][0], "pipeline green");
        assert_eq!(json["issueNumber"], 12);
        assert_eq!(json["status"], "pending");
        assert!(json.get("workItemId").is_none());
    }

    #[test]
    fn external_id_is_per_platform() {
        let mut task = Task::new("TASK-002", "Docs");
        task.set_external_id(PlatformKind::Azure, 77);
        assert_eq!(task.external_id(PlatformKind::Azure), Some(77));
        assert_eq!(task.external_id(PlatformKind::GitHub), None);
    }

    #[test]
    fn item_body_lists_criteria() {
        let mut task = Task::new("TASK-003", "Login form");
        task.description = "Build the login form.".to_string();
        task.completion_criteria = vec!["renders".to_string(), "validates".to_string()];
        task.phase = Some("Frontend".to_string());
        let body = task.item_body();
        assert!(body.starts_with("Build the login form."));
        assert!(body.contains("- [ ] renders\n- [ ] validates"));
        assert!(body.contains("**Phase:** Frontend"));
        assert!(body.ends_with("**Task ID:** TASK-003\n"));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let task = Task::new("TASK-004", "API");
        task.save(dir.path(), "plan-001").unwrap();
        let loaded = Task::load(dir.path(), "plan-001", "TASK-004").unwrap();
        assert_eq!(loaded, task);
        assert!(matches!(
            Task::load(dir.path(), "plan-001", "TASK-999"),
            Err(Agentic15Error::TaskNotFound(_))
        ));
    }
}
