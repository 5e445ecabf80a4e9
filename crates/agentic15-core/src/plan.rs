//! Plan lifecycle: generated → locked → archived.
//!
//! A generated plan holds only the requirements text. The plan document
//! (`PROJECT-PLAN.json`) is written by the agent afterwards; locking reads
//! it, extracts the tasks, and creates the tracker. Locked plans are never
//! re-extracted.

use crate::error::{Agentic15Error, Result};
use crate::io;
use crate::paths;
use crate::task::Task;
use crate::tracker::TaskTracker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub id: String,
    pub locked: bool,
    pub has_document: bool,
}

impl Plan {
    pub fn load(root: &Path, plan_id: &str) -> Result<Self> {
        let dir = paths::plan_dir(root, plan_id);
        if !dir.is_dir() {
            return Err(Agentic15Error::PlanNotFound(plan_id.to_string()));
        }
        Ok(Self {
            id: plan_id.to_string(),
            locked: paths::lock_path(root, plan_id).exists(),
            has_document: paths::plan_document_path(root, plan_id).exists(),
        })
    }

    pub fn load_active(root: &Path) -> Result<Self> {
        Self::load(root, &active_plan_id(root)?)
    }

    pub fn requirements(&self, root: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(paths::requirements_path(root, &self.id))?)
    }
}

// ---------------------------------------------------------------------------
// Active plan pointer
// ---------------------------------------------------------------------------

pub fn active_plan_id(root: &Path) -> Result<String> {
    if !paths::claude_dir(root).is_dir() {
        return Err(Agentic15Error::NotInitialized);
    }
    let id = std::fs::read_to_string(paths::active_plan_path(root))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if id.is_empty() {
        return Err(Agentic15Error::NoActivePlan);
    }
    Ok(id)
}

fn set_active_plan(root: &Path, plan_id: &str) -> Result<()> {
    io::atomic_write(&paths::active_plan_path(root), format!("{plan_id}\n").as_bytes())
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Create a new unlocked plan from `requirements` and make it active.
///
/// An unlocked active plan must be locked or archived first. A locked active
/// plan is superseded: it is archived before the new one is created.
pub fn generate(root: &Path, requirements: &str) -> Result<Plan> {
    if !paths::claude_dir(root).is_dir() {
        return Err(Agentic15Error::NotInitialized);
    }
    match Plan::load_active(root) {
        Ok(active) if !active.locked => return Err(Agentic15Error::PlanExists(active.id)),
        Ok(active) => {
            archive(root)?;
            tracing::info!(plan = %active.id, "superseded plan archived");
        }
        Err(Agentic15Error::NoActivePlan) | Err(Agentic15Error::PlanNotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let id = next_plan_id(root)?;
    io::ensure_dir(&paths::plan_dir(root, &id))?;
    io::atomic_write(&paths::requirements_path(root, &id), requirements.as_bytes())?;
    set_active_plan(root, &id)?;
    tracing::info!(plan = %id, "plan generated");
    Plan::load(root, &id)
}

/// Lock the active plan: extract tasks from its plan document, write the
/// per-task files and the tracker.
pub fn lock(root: &Path) -> Result<TaskTracker> {
    let plan = Plan::load_active(root)?;
    if plan.locked {
        return Err(Agentic15Error::PlanAlreadyLocked(plan.id));
    }
    let doc_path = paths::plan_document_path(root, &plan.id);
    if !doc_path.exists() {
        return Err(Agentic15Error::InvalidPlan(format!(
            "{} not found; write the plan document before locking",
            doc_path.display()
        )));
    }
    let doc: PlanDocument = io::read_json(&doc_path)
        .map_err(|e| Agentic15Error::InvalidPlan(e.to_string()))?;
    let tasks = doc.into_tasks()?;

    for task in &tasks {
        task.save(root, &plan.id)?;
    }
    let mut tracker = TaskTracker::new(&plan.id, &tasks);
    tracker.save(root)?;

    let stamp = LockStamp {
        locked_at: Utc::now(),
        task_count: tasks.len(),
    };
    io::write_json(&paths::lock_path(root, &plan.id), &stamp)?;
    tracing::info!(plan = %plan.id, tasks = tasks.len(), "plan locked");
    Ok(tracker)
}

/// Move the active plan under `plans/archived/` and clear the pointer.
/// Returns the archived plan id.
pub fn archive(root: &Path) -> Result<String> {
    let plan = Plan::load_active(root)?;
    let archived_dir = paths::archived_plans_dir(root);
    io::ensure_dir(&archived_dir)?;

    let mut dest = archived_dir.join(&plan.id);
    if dest.exists() {
        dest = archived_dir.join(format!(
            "{}-{}",
            plan.id,
            Utc::now().format("%Y%m%d%H%M%S")
        ));
    }
    std::fs::rename(paths::plan_dir(root, &plan.id), &dest)?;
    std::fs::remove_file(paths::active_plan_path(root))?;
    tracing::info!(plan = %plan.id, "plan archived");
    Ok(plan.id)
}

/// `plan-NNN`, one past the highest number used by a live or archived plan.
fn next_plan_id(root: &Path) -> Result<String> {
    let mut max = 0u32;
    for dir in [paths::plans_dir(root), paths::archived_plans_dir(root)] {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            let n = name
                .strip_prefix("plan-")
                .and_then(|rest| rest.split('-').next())
                .and_then(|num| num.parse::<u32>().ok());
            if let Some(n) = n {
                max = max.max(n);
            }
        }
    }
    Ok(format!("plan-{:03}", max + 1))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockStamp {
    locked_at: DateTime<Utc>,
    task_count: usize,
}

// ---------------------------------------------------------------------------
// Plan document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
    #[serde(default)]
    pub phases: Vec<PlanPhase>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPhase {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completion_criteria: Vec<String>,
}

impl PlanDocument {
    /// Flatten into tasks in document order: top-level tasks first, then
    /// each phase's tasks. Missing ids are filled with the next free
    /// `TASK-NNN`.
    pub fn into_tasks(self) -> Result<Vec<Task>> {
        let mut flat: Vec<PlanTask> = self.tasks;
        for phase in self.phases {
            for mut t in phase.tasks {
                if t.phase.is_none() {
                    t.phase = Some(phase.name.clone());
                }
                flat.push(t);
            }
        }
        if flat.is_empty() {
            return Err(Agentic15Error::InvalidPlan("plan has no tasks".to_string()));
        }

        let mut taken = HashSet::new();
        for id in flat.iter().filter_map(|t| t.id.as_deref()) {
            paths::validate_task_id(id)?;
            if !taken.insert(id.to_string()) {
                return Err(Agentic15Error::InvalidPlan(format!("duplicate task id {id}")));
            }
        }

        let mut counter = 0usize;
        let mut tasks = Vec::with_capacity(flat.len());
        for t in flat {
            let id = match t.id {
                Some(id) => id,
                None => loop {
                    counter += 1;
                    let candidate = paths::task_id_for(counter);
                    if taken.insert(candidate.clone()) {
                        break candidate;
                    }
                },
            };
            if t.title.trim().is_empty() {
                return Err(Agentic15Error::InvalidPlan(format!("task {id} has no title")));
            }
            let mut task = Task::new(id, t.title);
            task.description = t.description;
            task.phase = t.phase;
            task.tags = t.tags;
            task.completion_criteria = t.completion_criteria;
            tasks.push(task);
        }
        Ok(tasks)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
