use crate::error::{Agentic15Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLAUDE_DIR: &str = ".claude";
pub const PLANS_DIR: &str = ".claude/plans";
pub const ARCHIVED_PLANS_DIR: &str = ".claude/plans/archived";

pub const ACTIVE_PLAN_FILE: &str = ".claude/ACTIVE-PLAN";
pub const SETTINGS_FILE: &str = ".claude/settings.json";
pub const LOCAL_SETTINGS_FILE: &str = ".claude/settings.local.json";

pub const GIT_CONFIG_FILE: &str = ".git/config";

pub const TRACKER_FILE: &str = "TASK-TRACKER.json";
pub const REQUIREMENTS_FILE: &str = "PROJECT-REQUIREMENTS.txt";
pub const PLAN_FILE: &str = "PROJECT-PLAN.json";
pub const LOCK_FILE: &str = ".plan-locked";
pub const TASKS_SUBDIR: &str = "tasks";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn claude_dir(root: &Path) -> PathBuf {
    root.join(CLAUDE_DIR)
}

pub fn plans_dir(root: &Path) -> PathBuf {
    root.join(PLANS_DIR)
}

pub fn archived_plans_dir(root: &Path) -> PathBuf {
    root.join(ARCHIVED_PLANS_DIR)
}

pub fn active_plan_path(root: &Path) -> PathBuf {
    root.join(ACTIVE_PLAN_FILE)
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

pub fn local_settings_path(root: &Path) -> PathBuf {
    root.join(LOCAL_SETTINGS_FILE)
}

pub fn git_config_path(root: &Path) -> PathBuf {
    root.join(GIT_CONFIG_FILE)
}

pub fn plan_dir(root: &Path, plan_id: &str) -> PathBuf {
    plans_dir(root).join(plan_id)
}

pub fn tracker_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(TRACKER_FILE)
}

pub fn requirements_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(REQUIREMENTS_FILE)
}

pub fn plan_document_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(PLAN_FILE)
}

pub fn lock_path(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(LOCK_FILE)
}

pub fn tasks_dir(root: &Path, plan_id: &str) -> PathBuf {
    plan_dir(root, plan_id).join(TASKS_SUBDIR)
}

pub fn task_path(root: &Path, plan_id: &str, task_id: &str) -> PathBuf {
    tasks_dir(root, plan_id).join(format!("{task_id}.json"))
}

// ---------------------------------------------------------------------------
// Task id validation
// ---------------------------------------------------------------------------

static TASK_ID_RE: OnceLock<Regex> = OnceLock::new();

fn task_id_re() -> &'static Regex {
    TASK_ID_RE.get_or_init(|| Regex::new(r"^TASK-\d{3,}$").unwrap())
}

pub fn validate_task_id(id: &str) -> Result<()> {
    if !task_id_re().is_match(id) {
        return Err(Agentic15Error::InvalidTaskId(id.to_string()));
    }
    Ok(())
}

/// Format the n-th (1-based) task id: `TASK-001`.
pub fn task_id_for(n: usize) -> String {
    format!("TASK-{n:03}")
}

/// Feature branch for a task: `feature/task-001`.
pub fn branch_name(task_id: &str) -> String {
    format!("feature/{}", task_id.to_lowercase())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
