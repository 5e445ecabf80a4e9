use crate::cmd::context;
use crate::output::print_json;
use agentic15_core::workflow::Workflow;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let out = Workflow::new(root, &settings, &runner)
        .complete()
        .context("commit workflow aborted")?;

    if json {
        return print_json(&out);
    }

    println!("Completed [{}] {}", out.task.id, out.task.title);
    if out.committed {
        println!("  committed on {}", out.branch);
    } else {
        println!("  nothing to commit on {}", out.branch);
    }
    if out.pushed {
        println!("  pushed to origin/{}", out.branch);
    } else {
        println!("  push failed; run 'git push -u origin {}'", out.branch);
    }
    match &out.pull_request {
        Some(pr) => println!("  pull request: {pr}"),
        None => println!("  no pull request opened"),
    }
    if out.item_closed {
        println!("  tracker item closed");
    } else if out.item_updated {
        println!("  tracker item updated");
    }
    println!();
    println!("{}", out.statistics);
    if out.statistics.is_finished() {
        println!("All tasks are done.");
    } else {
        println!("After the PR merges: agentic15 sync && agentic15 task next");
    }
    Ok(())
}
