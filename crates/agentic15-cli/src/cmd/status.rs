use crate::cmd::context;
use crate::output::print_json;
use agentic15_core::{
    detect::PlatformDetector, plan, task::Task, tracker::TaskTracker, Agentic15Error,
};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);

    let plan = match plan::Plan::load_active(root) {
        Ok(p) => Some(p),
        Err(Agentic15Error::NoActivePlan) => None,
        Err(e) => return Err(e.into()),
    };
    let tracker = match &plan {
        Some(p) if p.locked => Some(TaskTracker::load(root, &p.id)?),
        _ => None,
    };
    let active = match &tracker {
        Some(t) => match t.in_progress() {
            Some(entry) => Some(Task::load(root, &t.plan_id, &entry.id)?),
            None => None,
        },
        None => None,
    };
    let detection = PlatformDetector::new(root, &settings, &runner).detect();

    if json {
        return print_json(&serde_json::json!({
            "plan": plan,
            "statistics": tracker.as_ref().map(|t| t.stats()),
            "active": active,
            "platform": detection.platform,
        }));
    }

    match &plan {
        Some(p) => println!(
            "Plan:      {} ({})",
            p.id,
            if p.locked { "locked" } else { "unlocked" }
        ),
        None => println!("Plan:      none (agentic15 plan generate \"<requirements>\")"),
    }
    if let Some(t) = &tracker {
        println!("Progress:  {}", t.stats());
    }
    match &active {
        Some(task) => println!("Active:    [{}] {} on {}", task.id, task.title, task.branch_name()),
        None => println!("Active:    none"),
    }
    match detection.platform {
        Some(p) => println!("Platform:  {}", p.display_name()),
        None => println!("Platform:  none detected (tracker sync off)"),
    }
    Ok(())
}
