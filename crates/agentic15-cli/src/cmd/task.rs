use crate::cmd::context;
use crate::output::{item_ref, print_json, print_table};
use agentic15_core::{
    plan,
    task::Task,
    tracker::TaskTracker,
    types::PlatformKind,
    workflow::{NextOutcome, StartOutcome, Workflow},
};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Start the next pending task
    Next,
    /// Start a specific task
    Start { task_id: String },
    /// Return the in-progress task to pending
    Reset,
    /// Mark a task as blocked
    Block {
        task_id: String,
        #[arg(required = true)]
        reason: Vec<String>,
    },
    /// Return a blocked task to pending
    Unblock { task_id: String },
    /// List the tasks of the active plan
    List,
    /// Show full details for a single task
    Show { task_id: String },
    /// Show the task currently in progress
    Status,
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TaskSubcommand::Next => next(root, json),
        TaskSubcommand::Start { task_id } => start(root, &task_id, json),
        TaskSubcommand::Reset => reset(root, json),
        TaskSubcommand::Block { task_id, reason } => {
            block(root, &task_id, &reason.join(" "), json)
        }
        TaskSubcommand::Unblock { task_id } => unblock(root, &task_id, json),
        TaskSubcommand::List => list(root, json),
        TaskSubcommand::Show { task_id } => show(root, &task_id, json),
        TaskSubcommand::Status => status(root, json),
    }
}

fn print_started(out: &StartOutcome) {
    println!("Started [{}] {}", out.task.id, out.task.title);
    match out.branch_created {
        Some(true) => println!("  branch:  {} (created)", out.branch),
        Some(false) => println!("  branch:  {}", out.branch),
        None => println!("  branch:  {} (checkout failed; switch manually)", out.branch),
    }
    if let (Some(platform), Some(id)) = (out.platform, out.external_id) {
        println!("  {}: {}", platform.display_name(), item_ref_for(platform, id));
    }
    if !out.task.completion_criteria.is_empty() {
        println!("  done when:");
        for c in &out.task.completion_criteria {
            println!("    - {c}");
        }
    }
}

fn item_ref_for(platform: PlatformKind, id: u64) -> String {
    match platform {
        PlatformKind::GitHub => item_ref(Some(id), None),
        PlatformKind::Azure => item_ref(None, Some(id)),
    }
}

fn next(root: &Path, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let outcome = Workflow::new(root, &settings, &runner).next()?;
    if json {
        return print_json(&outcome);
    }
    match outcome {
        NextOutcome::Started(out) => print_started(&out),
        NextOutcome::Finished(stats) => {
            println!("No pending tasks. Plan finished: {stats}");
        }
    }
    Ok(())
}

fn start(root: &Path, task_id: &str, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let out = Workflow::new(root, &settings, &runner)
        .start(task_id)
        .with_context(|| format!("cannot start {task_id}"))?;
    if json {
        return print_json(&out);
    }
    print_started(&out);
    Ok(())
}

fn reset(root: &Path, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let task = Workflow::new(root, &settings, &runner).reset()?;
    if json {
        return print_json(&task);
    }
    println!("Reset [{}] to pending", task.id);
    Ok(())
}

fn block(root: &Path, task_id: &str, reason: &str, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let task = Workflow::new(root, &settings, &runner)
        .block(task_id, reason)
        .with_context(|| format!("cannot block {task_id}"))?;
    if json {
        return print_json(&task);
    }
    println!("Blocked [{}]: {reason}", task.id);
    Ok(())
}

fn unblock(root: &Path, task_id: &str, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let task = Workflow::new(root, &settings, &runner)
        .unblock(task_id)
        .with_context(|| format!("cannot unblock {task_id}"))?;
    if json {
        return print_json(&task);
    }
    println!("Unblocked [{}]; it is pending again", task.id);
    Ok(())
}

fn active_tracker(root: &Path) -> anyhow::Result<TaskTracker> {
    let plan_id = plan::active_plan_id(root)?;
    Ok(TaskTracker::load(root, &plan_id)?)
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let tracker = active_tracker(root)?;
    if json {
        return print_json(&tracker.task_files);
    }
    let rows = tracker
        .task_files
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.status.to_string(),
                t.phase.clone().unwrap_or_else(|| "-".to_string()),
                item_ref(t.issue_number, t.work_item_id),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "PHASE", "ITEM", "TITLE"], rows);
    println!();
    println!("{}", tracker.stats());
    Ok(())
}

fn show(root: &Path, task_id: &str, json: bool) -> anyhow::Result<()> {
    let plan_id = plan::active_plan_id(root)?;
    let task = Task::load(root, &plan_id, task_id)?;
    if json {
        return print_json(&task);
    }
    print_task(&task);
    Ok(())
}

fn print_task(task: &Task) {
    println!("[{}] {}", task.id, task.title);
    println!("  status:  {}", task.status);
    if let Some(phase) = &task.phase {
        println!("  phase:   {phase}");
    }
    println!("  branch:  {}", task.branch_name());
    let item = item_ref(task.issue_number, task.work_item_id);
    if item != "-" {
        println!("  item:    {item}");
    }
    if !task.tags.is_empty() {
        println!("  tags:    {}", task.tags.join(", "));
    }
    if let Some(blocker) = &task.blocker {
        println!("  blocked: {blocker}");
    }
    if !task.description.is_empty() {
        println!();
        println!("{}", task.description);
    }
    if !task.completion_criteria.is_empty() {
        println!();
        println!("Completion criteria:");
        for c in &task.completion_criteria {
            println!("  - {c}");
        }
    }
}

fn status(root: &Path, json: bool) -> anyhow::Result<()> {
    let tracker = active_tracker(root)?;
    let active = match tracker.in_progress() {
        Some(entry) => Some(Task::load(root, &tracker.plan_id, &entry.id)?),
        None => None,
    };
    if json {
        return print_json(&serde_json::json!({ "active": active }));
    }
    match active {
        Some(task) => print_task(&task),
        None => println!("No task in progress. Run 'agentic15 task next'."),
    }
    Ok(())
}
