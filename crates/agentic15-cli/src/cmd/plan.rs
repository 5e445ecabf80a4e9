use crate::output::print_json;
use agentic15_core::{paths, plan, tracker::TaskTracker};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum PlanSubcommand {
    /// Start a new plan from a requirements description
    Generate {
        #[arg(required = true)]
        requirements: Vec<String>,
    },
    /// Lock the active plan and extract its tasks
    Lock,
    /// Show the active plan
    Show,
    /// Archive the active plan
    Archive,
}

pub fn run(root: &Path, subcmd: PlanSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PlanSubcommand::Generate { requirements } => {
            generate(root, &requirements.join(" "), json)
        }
        PlanSubcommand::Lock => lock(root, json),
        PlanSubcommand::Show => show(root, json),
        PlanSubcommand::Archive => archive(root, json),
    }
}

fn generate(root: &Path, requirements: &str, json: bool) -> anyhow::Result<()> {
    let plan = plan::generate(root, requirements).context("failed to generate plan")?;
    if json {
        return print_json(&plan);
    }
    println!("Generated plan {}", plan.id);
    println!(
        "Write {} and run 'agentic15 plan lock'",
        paths::plan_document_path(Path::new(""), &plan.id).display()
    );
    Ok(())
}

fn lock(root: &Path, json: bool) -> anyhow::Result<()> {
    let tracker = plan::lock(root).context("failed to lock plan")?;
    if json {
        return print_json(&tracker);
    }
    println!(
        "Locked {} with {} tasks",
        tracker.plan_id, tracker.statistics.total_tasks
    );
    if let Some(first) = tracker.next_pending() {
        println!("Next: agentic15 task next  ({} {})", first.id, first.title);
    }
    Ok(())
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let plan = plan::Plan::load_active(root)?;
    let stats = if plan.locked {
        Some(TaskTracker::load(root, &plan.id)?.stats())
    } else {
        None
    };

    if json {
        return print_json(&serde_json::json!({
            "plan": plan,
            "statistics": stats,
        }));
    }

    println!("Plan:      {}", plan.id);
    println!(
        "State:     {}",
        if plan.locked { "locked" } else { "unlocked" }
    );
    match stats {
        Some(s) => println!("Progress:  {s}"),
        None if plan.has_document => println!("Document:  ready; run 'agentic15 plan lock'"),
        None => println!("Document:  not written yet"),
    }
    Ok(())
}

fn archive(root: &Path, json: bool) -> anyhow::Result<()> {
    let id = plan::archive(root).context("failed to archive plan")?;
    if json {
        return print_json(&serde_json::json!({ "archived": id }));
    }
    println!("Archived plan {id}");
    Ok(())
}
