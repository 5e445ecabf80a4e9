use crate::output::print_json;
use agentic15_core::init;
use agentic15_core::process::SystemRunner;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let report = init::init(root, &SystemRunner)
        .with_context(|| format!("failed to initialize {}", root.display()))?;

    if json {
        return print_json(&report);
    }

    println!("Initializing agentic15 in: {}", root.display());
    for path in &report.created {
        println!("  created: {path}");
    }
    for path in &report.existing {
        println!("  exists:  {path}");
    }
    if let Some(repo) = &report.github_repo {
        println!("  github:  {repo} (from origin)");
    }
    println!();
    println!("Next:");
    println!("  1. Put credentials in .claude/settings.local.json or the environment");
    println!("  2. agentic15 plan generate \"<requirements>\"");
    Ok(())
}
