//! Thin wrapper over the `git` CLI for the branch and commit workflow.

use crate::error::{Agentic15Error, Result};
use crate::process::{CommandOutput, CommandRunner};
use std::path::Path;

pub const DEFAULT_BRANCH: &str = "main";

pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    root: &'a Path,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, root: &'a Path) -> Self {
        Self { runner, root }
    }

    /// Run git and require a zero exit.
    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let out = self.exec(args)?;
        if !out.success {
            return Err(Agentic15Error::GitFailed {
                command: args.join(" "),
                message: out.diagnostic(),
            });
        }
        Ok(out)
    }

    /// Run git and hand back the output whatever the exit status.
    fn exec(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner
            .run("git", args, self.root)
            .map_err(|e| Agentic15Error::GitFailed {
                command: args.join(" "),
                message: e.to_string(),
            })
    }

    pub fn current_branch(&self) -> Result<String> {
        Ok(self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .text()
            .to_string())
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        let refname = format!("refs/heads/{name}");
        self.exec(&["rev-parse", "--verify", "--quiet", refname.as_str()])
            .is_ok_and(|out| out.success)
    }

    /// Check out `name`, creating it from HEAD when it does not exist yet.
    /// Returns whether the branch was created.
    pub fn checkout_or_create(&self, name: &str) -> Result<bool> {
        if self.branch_exists(name) {
            self.run(&["checkout", name])?;
            Ok(false)
        } else {
            self.run(&["checkout", "-b", name])?;
            Ok(true)
        }
    }

    pub fn add_all(&self) -> Result<()> {
        self.run(&["add", "-A"]).map(|_| ())
    }

    /// `git diff --cached --quiet` exits 1 when something is staged.
    pub fn has_staged_changes(&self) -> Result<bool> {
        Ok(!self.exec(&["diff", "--cached", "--quiet"])?.success)
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message]).map(|_| ())
    }

    pub fn push_upstream(&self, branch: &str) -> Result<()> {
        self.run(&["push", "-u", "origin", branch]).map(|_| ())
    }

    pub fn pull(&self) -> Result<()> {
        self.run(&["pull"]).map(|_| ())
    }

    pub fn checkout(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", branch]).map(|_| ())
    }

    pub fn delete_branch(&self, branch: &str) -> Result<()> {
        self.run(&["branch", "-d", branch]).map(|_| ())
    }

    /// Branch `origin/HEAD` points at, falling back to `main`.
    pub fn default_branch(&self) -> String {
        self.exec(&["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
            .ok()
            .filter(|out| out.success)
            .and_then(|out| {
                out.text()
                    .strip_prefix("origin/")
                    .map(str::to_string)
            })
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
    }
}
