use crate::cmd::context;
use crate::output::print_json;
use agentic15_core::workflow::Workflow;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let out = Workflow::new(root, &settings, &runner).sync()?;

    if json {
        return print_json(&out);
    }

    let mark = |ok: bool| if ok { "ok" } else { "skipped" };
    println!("checkout {}: {}", out.default_branch, mark(out.checked_out));
    println!("pull: {}", mark(out.pulled));
    if let Some(branch) = &out.deleted_branch {
        println!("deleted {branch}");
    }
    Ok(())
}
