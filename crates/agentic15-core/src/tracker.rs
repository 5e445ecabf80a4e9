//! Per-plan task tracker and the task state machine.
//!
//! The tracker is the authoritative record of task status for a plan. All
//! transitions go through [`TaskTracker`] so the one-in-progress invariant is
//! checked in a single place; a rejected transition leaves the tracker
//! untouched.

use crate::error::{Agentic15Error, Result};
use crate::paths;
use crate::task::Task;
use crate::types::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntry {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<u64>,
}

impl From<&Task> for TaskEntry {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status,
            phase: task.phase.clone(),
            issue_number: task.issue_number,
            work_item_id: task.work_item_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_tasks: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
}

impl Statistics {
    pub fn from_entries(entries: &[TaskEntry]) -> Self {
        let count = |s: TaskStatus| entries.iter().filter(|t| t.status == s).count();
        Self {
            total_tasks: entries.len(),
            pending: count(TaskStatus::Pending),
            in_progress: count(TaskStatus::InProgress),
            completed: count(TaskStatus::Completed),
            blocked: count(TaskStatus::Blocked),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.pending == 0 && self.in_progress == 0
    }
}

/// Human-readable summary: "3/5 completed, 1 in progress, 1 blocked"
impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} completed, {} in progress, {} blocked",
            self.completed, self.total_tasks, self.in_progress, self.blocked
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTracker {
    pub plan_id: String,
    pub task_files: Vec<TaskEntry>,
    #[serde(default)]
    pub statistics: Statistics,
    pub last_updated: DateTime<Utc>,
}

impl TaskTracker {
    pub fn new(plan_id: impl Into<String>, tasks: &[Task]) -> Self {
        let task_files: Vec<TaskEntry> = tasks.iter().map(TaskEntry::from).collect();
        Self {
            plan_id: plan_id.into(),
            statistics: Statistics::from_entries(&task_files),
            task_files,
            last_updated: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn load(root: &Path, plan_id: &str) -> Result<Self> {
        let path = paths::tracker_path(root, plan_id);
        if !path.exists() {
            return Err(Agentic15Error::PlanNotLocked(plan_id.to_string()));
        }
        crate::io::read_json(&path)
    }

    /// Recompute statistics and write the tracker.
    pub fn save(&mut self, root: &Path) -> Result<()> {
        self.statistics = Statistics::from_entries(&self.task_files);
        self.last_updated = Utc::now();
        crate::io::write_json(&paths::tracker_path(root, &self.plan_id), self)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn find(&self, id: &str) -> Result<&TaskEntry> {
        self.task_files
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Agentic15Error::TaskNotFound(id.to_string()))
    }

    pub fn in_progress(&self) -> Option<&TaskEntry> {
        self.task_files
            .iter()
            .find(|t| t.status == TaskStatus::InProgress)
    }

    /// First pending task in tracker order.
    pub fn next_pending(&self) -> Option<&TaskEntry> {
        self.task_files
            .iter()
            .find(|t| t.status == TaskStatus::Pending)
    }

    /// Most recently listed completed task.
    pub fn last_completed(&self) -> Option<&TaskEntry> {
        self.task_files
            .iter()
            .rev()
            .find(|t| t.status == TaskStatus::Completed)
    }

    pub fn stats(&self) -> Statistics {
        Statistics::from_entries(&self.task_files)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// pending → in_progress. Fails if any task (this one included) is
    /// already in progress.
    pub fn start(&mut self, id: &str) -> Result<()> {
        self.find(id)?;
        if let Some(active) = self.in_progress() {
            return Err(Agentic15Error::TaskAlreadyInProgress(active.id.clone()));
        }
        self.transition(id, TaskStatus::InProgress)
    }

    /// in_progress → completed.
    pub fn complete(&mut self, id: &str) -> Result<()> {
        self.transition(id, TaskStatus::Completed)
    }

    /// pending | in_progress → blocked.
    pub fn block(&mut self, id: &str) -> Result<()> {
        self.transition(id, TaskStatus::Blocked)
    }

    /// blocked → pending.
    pub fn unblock(&mut self, id: &str) -> Result<()> {
        let entry = self.find(id)?;
        if entry.status != TaskStatus::Blocked {
            return Err(invalid(entry, TaskStatus::Pending));
        }
        self.transition(id, TaskStatus::Pending)
    }

    /// Force the in-progress task back to pending. Returns its id.
    pub fn reset(&mut self) -> Result<String> {
        let id = self
            .in_progress()
            .map(|t| t.id.clone())
            .ok_or(Agentic15Error::NoTaskInProgress)?;
        self.transition(&id, TaskStatus::Pending)?;
        Ok(id)
    }

    /// Copy the external tracker link from `task` into its entry.
    pub fn sync_links(&mut self, task: &Task) -> Result<()> {
        let entry = self.find_mut(&task.id)?;
        entry.issue_number = task.issue_number;
        entry.work_item_id = task.work_item_id;
        Ok(())
    }

    fn transition(&mut self, id: &str, to: TaskStatus) -> Result<()> {
        let entry = self.find_mut(id)?;
        if !entry.status.can_transition_to(to) {
            return Err(invalid(entry, to));
        }
        tracing::info!(task = %id, from = %entry.status, to = %to, "task transition");
        entry.status = to;
        Ok(())
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut TaskEntry> {
        self.task_files
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Agentic15Error::TaskNotFound(id.to_string()))
    }
}

fn invalid(entry: &TaskEntry, to: TaskStatus) -> Agentic15Error {
    Agentic15Error::InvalidTransition {
        task: entry.id.clone(),
        from: entry.status.to_string(),
        to: to.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
