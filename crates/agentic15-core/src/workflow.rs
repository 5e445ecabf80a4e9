//! Task workflow: the state machine plus its git and tracker side effects.
//!
//! Preconditions (task exists, nothing else in progress, valid transition,
//! HEAD on the task branch for a commit)
//! are checked against the tracker before anything touches git or the
//! network, so a rejected command leaves the project exactly as it was.
//! Everything after the state change is best effort: git branch handling and
//! issue / work item sync log a warning and carry on.

use crate::error::{Agentic15Error, Result};
use crate::git::Git;
use crate::paths;
use crate::plan;
use crate::process::CommandRunner;
use crate::router::PlatformRouter;
use crate::settings::Settings;
use crate::task::Task;
use crate::tracker::{Statistics, TaskTracker};
use crate::types::{PlatformKind, TaskStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub task: Task,
    pub branch: String,
    /// `Some(true)` created, `Some(false)` reused, `None` checkout failed.
    pub branch_created: Option<bool>,
    pub platform: Option<PlatformKind>,
    pub external_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum NextOutcome {
    Started(StartOutcome),
    /// No pending task is left.
    Finished(Statistics),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub task: Task,
    pub branch: String,
    pub committed: bool,
    pub pushed: bool,
    pub pull_request: Option<String>,
    pub item_updated: bool,
    pub item_closed: bool,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub default_branch: String,
    pub checked_out: bool,
    pub pulled: bool,
    pub deleted_branch: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzurePullRequest {
    pull_request_id: u64,
    #[serde(default)]
    repository: Option<AzureRepository>,
}

#[derive(Deserialize)]
struct AzureRepository {
    name: String,
}

pub struct Workflow<'a> {
    root: &'a Path,
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
    router: PlatformRouter<'a>,
}

impl<'a> Workflow<'a> {
    pub fn new(root: &'a Path, settings: &'a Settings, runner: &'a dyn CommandRunner) -> Self {
        let router = PlatformRouter::new(root, settings, runner);
        Self::with_router(root, settings, runner, router)
    }

    pub fn with_router(
        root: &'a Path,
        settings: &'a Settings,
        runner: &'a dyn CommandRunner,
        router: PlatformRouter<'a>,
    ) -> Self {
        Self {
            root,
            settings,
            runner,
            router,
        }
    }

    pub fn router(&self) -> &PlatformRouter<'a> {
        &self.router
    }

    fn git(&self) -> Git<'_> {
        Git::new(self.runner, self.root)
    }

    fn load_tracker(&self) -> Result<TaskTracker> {
        TaskTracker::load(self.root, &plan::active_plan_id(self.root)?)
    }

    /// Write the task and the tracker, keeping the tracker's copy of the
    /// external link in step with the task file.
    fn persist(&self, tracker: &mut TaskTracker, task: &Task) -> Result<()> {
        tracker.sync_links(task)?;
        task.save(self.root, &tracker.plan_id)?;
        tracker.save(self.root)
    }

    // -----------------------------------------------------------------------
    // start / next
    // -----------------------------------------------------------------------

    pub fn start(&self, task_id: &str) -> Result<StartOutcome> {
        paths::validate_task_id(task_id)?;
        let mut tracker = self.load_tracker()?;
        tracker.start(task_id)?;
        let mut task = Task::load(self.root, &tracker.plan_id, task_id)?;

        let branch = task.branch_name();
        let branch_created = match self.git().checkout_or_create(&branch) {
            Ok(created) => Some(created),
            Err(e) => {
                tracing::warn!("could not check out {branch}: {e}");
                None
            }
        };

        task.status = TaskStatus::InProgress;
        task.started_at = Some(Utc::now());

        let platform = self.router.platform();
        let mut external_id = platform.and_then(|p| task.external_id(p));
        if let Some(p) = platform.filter(|_| self.router.is_configured()) {
            match external_id {
                None if self.router.auto_create() => {
                    external_id = self.router.create_task_item(&task);
                    if let Some(id) = external_id {
                        task.set_external_id(p, id);
                    }
                }
                Some(id) if self.router.auto_update() => {
                    self.router.update_task_item(&task, id);
                }
                _ => {}
            }
        }

        self.persist(&mut tracker, &task)?;
        Ok(StartOutcome {
            task,
            branch,
            branch_created,
            platform,
            external_id,
        })
    }

    /// Start the first pending task, or report that the plan is done.
    pub fn next(&self) -> Result<NextOutcome> {
        let tracker = self.load_tracker()?;
        if let Some(active) = tracker.in_progress() {
            return Err(Agentic15Error::TaskAlreadyInProgress(active.id.clone()));
        }
        match tracker.next_pending() {
            Some(entry) => {
                let id = entry.id.clone();
                Ok(NextOutcome::Started(self.start(&id)?))
            }
            None => Ok(NextOutcome::Finished(tracker.stats())),
        }
    }

    // -----------------------------------------------------------------------
    // commit
    // -----------------------------------------------------------------------

    /// Commit, push, and open a pull request for the active task, then mark
    /// it completed and close its tracker item.
    pub fn complete(&self) -> Result<CommitOutcome> {
        let mut tracker = self.load_tracker()?;
        let task_id = tracker
            .in_progress()
            .map(|t| t.id.clone())
            .ok_or(Agentic15Error::NoTaskInProgress)?;
        let mut task = Task::load(self.root, &tracker.plan_id, &task_id)?;
        let branch = task.branch_name();

        let git = self.git();
        let current = git.current_branch()?;
        if current != branch {
            return Err(Agentic15Error::BranchMismatch {
                expected: branch,
                actual: current,
            });
        }
        git.add_all()?;
        let committed = git.has_staged_changes()?;
        if committed {
            git.commit(&commit_message(&task))?;
        } else {
            tracing::warn!("nothing staged for {task_id}; skipping commit");
        }

        let pushed = match git.push_upstream(&branch) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("push failed, skipping pull request: {e}");
                false
            }
        };
        let pull_request = if pushed {
            self.open_pull_request(&task, &branch, &git.default_branch())
        } else {
            None
        };

        tracker.complete(&task_id)?;
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now());

        let mut item_updated = false;
        let mut item_closed = false;
        if let Some(id) = self.router.platform().and_then(|p| task.external_id(p)) {
            if self.router.auto_update() {
                item_updated = self.router.update_task_item(&task, id);
            }
            if self.router.auto_close() {
                let comment = match &pull_request {
                    Some(pr) => format!("Completed in {pr}"),
                    None => format!("Completed on branch {branch}"),
                };
                item_closed = self.router.close_task_item(id, Some(&comment));
            }
        }

        self.persist(&mut tracker, &task)?;
        Ok(CommitOutcome {
            task,
            branch,
            committed,
            pushed,
            pull_request,
            item_updated,
            item_closed,
            statistics: tracker.stats(),
        })
    }

    /// `gh pr create` on GitHub, `az repos pr create` on Azure DevOps.
    /// Returns the PR URL or reference.
    fn open_pull_request(&self, task: &Task, branch: &str, base: &str) -> Option<String> {
        let title = commit_message(task);
        let mut body = task.item_body();
        match self.router.platform()? {
            PlatformKind::GitHub => {
                if let Some(n) = task.issue_number {
                    body.push_str(&format!("\nCloses #{n}\n"));
                }
                let args = [
                    "pr",
                    "create",
                    "--title",
                    title.as_str(),
                    "--body",
                    body.as_str(),
                    "--base",
                    base,
                    "--head",
                    branch,
                ];
                self.best_effort("gh", &args, "pull request")
                    .map(|out| out.trim().to_string())
            }
            PlatformKind::Azure => {
                let az = &self.settings.azure_dev_ops;
                let org = az.organization_url()?;
                let project = az.project.as_deref()?;
                let args = [
                    "repos",
                    "pr",
                    "create",
                    "--title",
                    title.as_str(),
                    "--description",
                    body.as_str(),
                    "--source-branch",
                    branch,
                    "--target-branch",
                    base,
                    "--org",
                    org.as_str(),
                    "--project",
                    project,
                    "--output",
                    "json",
                ];
                let out = self.best_effort("az", &args, "pull request")?;
                match serde_json::from_str::<AzurePullRequest>(&out) {
                    Ok(pr) => Some(match pr.repository {
                        Some(repo) => format!(
                            "{org}/{project}/_git/{}/pullrequest/{}",
                            repo.name, pr.pull_request_id
                        ),
                        None => format!("!{}", pr.pull_request_id),
                    }),
                    Err(e) => {
                        tracing::warn!("unexpected az repos pr create output: {e}");
                        None
                    }
                }
            }
        }
    }

    /// Run an external CLI once; stdout on success, `None` with a warning
    /// otherwise.
    fn best_effort(&self, program: &str, args: &[&str], what: &str) -> Option<String> {
        if !self.runner.available(program) {
            tracing::warn!("{program} not found; skipping {what}");
            return None;
        }
        match self.runner.run(program, args, self.root) {
            Ok(out) if out.success => Some(out.stdout),
            Ok(out) => {
                tracing::warn!("{what} failed: {}", out.diagnostic());
                None
            }
            Err(e) => {
                tracing::warn!("{what} failed: {e}");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // reset / block / unblock
    // -----------------------------------------------------------------------

    /// Return the in-progress task to pending. Its branch is left alone.
    pub fn reset(&self) -> Result<Task> {
        let mut tracker = self.load_tracker()?;
        let id = tracker.reset()?;
        let mut task = Task::load(self.root, &tracker.plan_id, &id)?;
        task.status = TaskStatus::Pending;
        task.started_at = None;
        self.mirror_status(&task, None);
        self.persist(&mut tracker, &task)?;
        Ok(task)
    }

    pub fn block(&self, task_id: &str, reason: &str) -> Result<Task> {
        paths::validate_task_id(task_id)?;
        let mut tracker = self.load_tracker()?;
        tracker.block(task_id)?;
        let mut task = Task::load(self.root, &tracker.plan_id, task_id)?;
        task.status = TaskStatus::Blocked;
        task.blocker = Some(reason.to_string());
        self.mirror_status(&task, Some(&format!("Blocked: {reason}")));
        self.persist(&mut tracker, &task)?;
        Ok(task)
    }

    pub fn unblock(&self, task_id: &str) -> Result<Task> {
        paths::validate_task_id(task_id)?;
        let mut tracker = self.load_tracker()?;
        tracker.unblock(task_id)?;
        let mut task = Task::load(self.root, &tracker.plan_id, task_id)?;
        task.status = TaskStatus::Pending;
        task.blocker = None;
        self.mirror_status(&task, Some("Unblocked"));
        self.persist(&mut tracker, &task)?;
        Ok(task)
    }

    /// Push `task.status` to its linked item when auto-update is on.
    fn mirror_status(&self, task: &Task, comment: Option<&str>) {
        if !self.router.auto_update() {
            return;
        }
        let Some(id) = self.router.platform().and_then(|p| task.external_id(p)) else {
            return;
        };
        self.router.update_task_item(task, id);
        if let Some(text) = comment {
            self.router.add_comment(id, text);
        }
    }

    // -----------------------------------------------------------------------
    // sync
    // -----------------------------------------------------------------------

    /// After a merge: switch to the default branch, pull, and delete the
    /// local branch of the most recently completed task.
    pub fn sync(&self) -> Result<SyncOutcome> {
        let git = self.git();
        let default_branch = git.default_branch();

        let checked_out = warn_on_err(git.checkout(&default_branch), "checkout");
        let pulled = checked_out && warn_on_err(git.pull(), "pull");

        let finished_branch = plan::active_plan_id(self.root)
            .and_then(|id| TaskTracker::load(self.root, &id))
            .ok()
            .and_then(|t| t.last_completed().map(|e| paths::branch_name(&e.id)));
        let deleted_branch = match finished_branch {
            Some(branch) if checked_out && git.branch_exists(&branch) => {
                warn_on_err(git.delete_branch(&branch), "branch delete").then_some(branch)
            }
            _ => None,
        };

        Ok(SyncOutcome {
            default_branch,
            checked_out,
            pulled,
            deleted_branch,
        })
    }
}

fn warn_on_err(result: Result<()>, what: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("{what} failed: {e}");
            false
        }
    }
}

/// `[TASK-001] Title`
pub fn commit_message(task: &Task) -> String {
    format!("[{}] {}", task.id, task.title)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::AzureDevOpsClient;
    use crate::process::testing::ScriptedRunner;
    use crate::process::CommandOutput;
    use crate::router::{AutoActions, Backend};
    use crate::settings::AzureSettings;
    use tempfile::TempDir;

    /// Locked plan with `n` tasks under a temp root.
    fn project(n: usize) -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(paths::claude_dir(root)).unwrap();
        plan::generate(root, "Build a thing").unwrap();
        let plan_id = plan::active_plan_id(root).unwrap();
        let tasks: Vec<serde_json::Value> = (1..=n)
            .map(|i| serde_json::json!({ "title": format!("Task {i}"), "tags": ["core"] }))
            .collect();
        std::fs::write(
            paths::plan_document_path(root, &plan_id),
            serde_json::to_string(&serde_json::json!({
                "phases": [{ "name": "Build", "tasks": tasks }]
            }))
            .unwrap(),
        )
        .unwrap();
        plan::lock(root).unwrap();
        dir
    }

    fn git_ok() -> ScriptedRunner {
        ScriptedRunner::new()
            .on("git remote", CommandOutput::failed("No such remote"))
            .on("git rev-parse --verify", CommandOutput::failed(""))
            .on("git rev-parse --abbrev-ref HEAD", CommandOutput::ok("feature/task-001\n"))
            .on("git checkout", CommandOutput::ok(""))
            .on("git add -A", CommandOutput::ok(""))
            .on("git diff --cached", CommandOutput::failed(""))
            .on("git commit", CommandOutput::ok(""))
            .on("git push", CommandOutput::ok(""))
            .on("git pull", CommandOutput::ok(""))
            .on("git branch -d", CommandOutput::ok(""))
    }

    fn tracker(root: &Path) -> TaskTracker {
        TaskTracker::load(root, &plan::active_plan_id(root).unwrap()).unwrap()
    }

    #[test]
    fn start_checks_out_feature_branch() {
        let dir = project(2);
        let settings = Settings::default();
        let runner = git_ok();
        let wf = Workflow::new(dir.path(), &settings, &runner);

        let out = wf.start("TASK-002").unwrap();
        assert_eq!(out.branch, "feature/task-002");
        assert_eq!(out.branch_created, Some(true));
        assert_eq!(out.platform, None);
        assert!(runner.called("git checkout -b feature/task-002"));

        let t = tracker(dir.path());
        assert_eq!(t.in_progress().unwrap().id, "TASK-002");
        let task = Task::load(dir.path(), &t.plan_id, "TASK-002").unwrap();
        assert!(task.started_at.is_some());
    }

    #[test]
    fn second_start_fails_without_side_effects() {
        let dir = project(2);
        let settings = Settings::default();
        let runner = git_ok();
        let wf = Workflow::new(dir.path(), &settings, &runner);
        wf.start("TASK-001").unwrap();
        let before = std::fs::read_to_string(paths::tracker_path(
            dir.path(),
            &tracker(dir.path()).plan_id,
        ))
        .unwrap();
        let calls_before = runner.calls().len();

        let err = wf.start("TASK-002").unwrap_err();
        assert!(matches!(err, Agentic15Error::TaskAlreadyInProgress(ref id) if id == "TASK-001"));
        let after = std::fs::read_to_string(paths::tracker_path(
            dir.path(),
            &tracker(dir.path()).plan_id,
        ))
        .unwrap();
        assert_eq!(before, after);
        assert_eq!(runner.calls().len(), calls_before, "no git calls on rejection");
    }

    #[test]
    fn checkout_failure_is_not_fatal() {
        let dir = project(1);
        let settings = Settings::default();
        let runner = ScriptedRunner::new().without("git");
        let wf = Workflow::new(dir.path(), &settings, &runner);
        let out = wf.start("TASK-001").unwrap();
        assert_eq!(out.branch_created, None);
        assert_eq!(tracker(dir.path()).in_progress().unwrap().id, "TASK-001");
    }

    #[test]
    fn next_with_nothing_pending_touches_no_branch() {
        let dir = project(1);
        let settings = Settings::default();
        let runner = git_ok();
        let wf = Workflow::new(dir.path(), &settings, &runner);
        wf.start("TASK-001").unwrap();
        wf.complete().unwrap();

        let calls_before = runner.calls().len();
        match wf.next().unwrap() {
            NextOutcome::Finished(stats) => {
                assert_eq!(stats.completed, 1);
                assert_eq!(stats.total_tasks, 1);
            }
            other => panic!("expected finished, got {other:?}"),
        }
        assert!(!runner.calls()[calls_before..]
            .iter()
            .any(|c| c.starts_with("git checkout")));
    }

    #[test]
    fn next_starts_first_pending() {
        let dir = project(3);
        let settings = Settings::default();
        let runner = git_ok();
        let wf = Workflow::new(dir.path(), &settings, &runner);
        wf.block("TASK-001", "waiting on design").unwrap();
        match wf.next().unwrap() {
            NextOutcome::Started(out) => assert_eq!(out.task.id, "TASK-002"),
            other => panic!("expected start, got {other:?}"),
        }
        assert!(matches!(
            wf.next(),
            Err(Agentic15Error::TaskAlreadyInProgress(_))
        ));
    }

    #[test]
    fn complete_commits_and_marks_done() {
        let dir = project(2);
        let settings = Settings::default();
        let runner = git_ok();
        let wf = Workflow::new(dir.path(), &settings, &runner);
        wf.start("TASK-001").unwrap();

        let out = wf.complete().unwrap();
        assert!(out.committed);
        assert!(out.pushed);
        // No platform detected, so no pull request.
        assert_eq!(out.pull_request, None);
        assert!(runner.called("git commit -m [TASK-001] Task 1"));
        assert!(runner.called("git push -u origin feature/task-001"));
        assert_eq!(out.statistics.completed, 1);
        assert_eq!(out.task.status, TaskStatus::Completed);
        assert!(out.task.completed_at.is_some());
    }

    #[test]
    fn complete_requires_active_task() {
        let dir = project(1);
        let settings = Settings::default();
        let runner = git_ok();
        let wf = Workflow::new(dir.path(), &settings, &runner);
        assert!(matches!(wf.complete(), Err(Agentic15Error::NoTaskInProgress)));
        assert!(!runner.called("git add"));
        assert!(!runner.called("git commit"));
    }

    #[test]
    fn commit_failure_leaves_task_in_progress() {
        let dir = project(1);
        let settings = Settings::default();
        let runner = ScriptedRunner::new()
            .on("git rev-parse --verify", CommandOutput::failed(""))
            .on("git rev-parse --abbrev-ref HEAD", CommandOutput::ok("feature/task-001"))
            .on("git checkout", CommandOutput::ok(""))
            .on("git add -A", CommandOutput::ok(""))
            .on("git diff --cached", CommandOutput::failed(""))
            .on("git commit", CommandOutput::failed("pre-commit hook failed"));
        let wf = Workflow::new(dir.path(), &settings, &runner);
        wf.start("TASK-001").unwrap();
        assert!(matches!(wf.complete(), Err(Agentic15Error::GitFailed { .. })));
        assert_eq!(tracker(dir.path()).in_progress().unwrap().id, "TASK-001");
    }

    #[test]
    fn complete_refuses_when_not_on_task_branch() {
        let dir = project(1);
        let settings = Settings::default();
        let runner = ScriptedRunner::new()
            .on("git rev-parse --verify", CommandOutput::failed(""))
            .on("git checkout", CommandOutput::failed("local changes would be overwritten"))
            .on("git rev-parse --abbrev-ref HEAD", CommandOutput::ok("main\n"))
            .on("git add -A", CommandOutput::ok(""))
            .on("git diff --cached", CommandOutput::failed(""))
            .on("git commit", CommandOutput::ok(""))
            .on("git push", CommandOutput::ok(""));
        let wf = Workflow::new(dir.path(), &settings, &runner);
        assert_eq!(wf.start("TASK-001").unwrap().branch_created, None);
        let tracker_file = paths::tracker_path(dir.path(), &tracker(dir.path()).plan_id);
        let before = std::fs::read_to_string(&tracker_file).unwrap();

        match wf.complete() {
            Err(Agentic15Error::BranchMismatch { expected, actual }) => {
                assert_eq!(expected, "feature/task-001");
                assert_eq!(actual, "main");
            }
            other => panic!("expected branch mismatch, got {other:?}"),
        }
        assert!(!runner.called("git add"));
        assert!(!runner.called("git commit"));
        assert!(!runner.called("git push"));
        assert_eq!(std::fs::read_to_string(&tracker_file).unwrap(), before);
        assert_eq!(tracker(dir.path()).in_progress().unwrap().id, "TASK-001");
    }

    #[test]
    fn reset_and_unblock_return_to_pending() {
        let dir = project(2);
        let settings = Settings::default();
        let runner = git_ok();
        let wf = Workflow::new(dir.path(), &settings, &runner);
        wf.start("TASK-001").unwrap();
        let reset = wf.reset().unwrap();
        assert_eq!(reset.status, TaskStatus::Pending);
        assert!(reset.started_at.is_none());

        let blocked = wf.block("TASK-001", "needs API key").unwrap();
        assert_eq!(blocked.blocker.as_deref(), Some("needs API key"));
        assert!(matches!(
            wf.start("TASK-001"),
            Err(Agentic15Error::InvalidTransition { .. })
        ));
        let unblocked = wf.unblock("TASK-001").unwrap();
        assert_eq!(unblocked.blocker, None);
        wf.start("TASK-001").unwrap();
    }

    #[test]
    fn azure_work_item_lifecycle() {
        let dir = project(1);
        let settings = Settings::default();
        let runner = git_ok()
            .on("az boards work-item create", CommandOutput::ok(r#"{"id": 55}"#))
            .on(
                "az boards work-item show",
                CommandOutput::ok(r#"{"id": 55, "fields": {"System.Tags": "core"}}"#),
            )
            .on("az boards work-item update", CommandOutput::ok("{}"))
            .on(
                "az repos pr create",
                CommandOutput::ok(r#"{"pullRequestId": 9, "repository": {"name": "app"}}"#),
            );
        let az = AzureSettings {
            enabled: true,
            organization: Some("org".to_string()),
            project: Some("proj".to_string()),
            ..Default::default()
        };
        let settings = Settings {
            azure_dev_ops: az.clone(),
            ..settings
        };
        let router = PlatformRouter::from_backend(
            Backend::Azure(AzureDevOpsClient::new(az, &runner, dir.path())),
            AutoActions {
                create: true,
                update: true,
                close: true,
            },
        );
        let wf = Workflow::with_router(dir.path(), &settings, &runner, router);

        let started = wf.start("TASK-001").unwrap();
        assert_eq!(started.external_id, Some(55));
        let task = Task::load(dir.path(), &tracker(dir.path()).plan_id, "TASK-001").unwrap();
        assert_eq!(task.work_item_id, Some(55));
        assert_eq!(tracker(dir.path()).find("TASK-001").unwrap().work_item_id, Some(55));

        let done = wf.complete().unwrap();
        assert_eq!(
            done.pull_request.as_deref(),
            Some("https://dev.azure.com/org/proj/_git/app/pullrequest/9")
        );
        assert!(done.item_updated);
        assert!(done.item_closed);
        assert!(runner.called("az boards work-item update --id 55 --state Closed"));
    }

    #[test]
    fn github_issue_and_pull_request() {
        let dir = project(1);
        let mut server = mockito::Server::new();
        let create = server
            .mock("POST", "/repos/o/r/issues")
            .with_status(201)
            .with_body(r#"{"number": 17}"#)
            .create();
        server
            .mock("GET", "/repos/o/r/issues/17")
            .with_body(r#"{"labels": [{"name": "status: in-progress"}]}"#)
            .create();
        let relabel = server
            .mock("PUT", "/repos/o/r/issues/17/labels")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "labels": ["status: completed"]
            })))
            .with_body("[]")
            .create();
        let comment = server
            .mock("POST", "/repos/o/r/issues/17/comments")
            .with_status(201)
            .with_body("{}")
            .create();
        let close = server
            .mock("PATCH", "/repos/o/r/issues/17")
            .with_body("{}")
            .create();

        let gh = crate::settings::GitHubSettings {
            enabled: true,
            token: Some("t".to_string()),
            owner: Some("o".to_string()),
            repo: Some("r".to_string()),
            api_url: Some(server.url()),
            ..Default::default()
        };
        let settings = Settings {
            github: gh.clone(),
            ..Default::default()
        };
        let runner = git_ok().on(
            "gh pr create",
            CommandOutput::ok("https://github.com/o/r/pull/4\n"),
        );
        let router = PlatformRouter::from_backend(
            Backend::GitHub(crate::github::GitHubClient::new(gh)),
            AutoActions {
                create: true,
                update: true,
                close: true,
            },
        );
        let wf = Workflow::with_router(dir.path(), &settings, &runner, router);

        assert_eq!(wf.start("TASK-001").unwrap().external_id, Some(17));
        let done = wf.complete().unwrap();
        assert_eq!(done.pull_request.as_deref(), Some("https://github.com/o/r/pull/4"));
        assert!(done.item_updated);
        assert!(done.item_closed);
        let pr_call = runner
            .calls()
            .into_iter()
            .find(|c| c.starts_with("gh pr create"))
            .unwrap();
        assert!(pr_call.contains("Closes #17"));
        assert!(pr_call.contains("--base main --head feature/task-001"));

        create.assert();
        relabel.assert();
        comment.assert();
        close.assert();
    }

    #[test]
    fn sync_deletes_finished_branch() {
        let dir = project(1);
        let settings = Settings::default();
        let runner = git_ok();
        let wf = Workflow::new(dir.path(), &settings, &runner);
        wf.start("TASK-001").unwrap();
        wf.complete().unwrap();

        // The branch now exists locally.
        let runner = ScriptedRunner::new()
            .on("git remote", CommandOutput::failed("No such remote"))
            .on("git symbolic-ref", CommandOutput::ok("origin/main"))
            .on("git checkout main", CommandOutput::ok(""))
            .on("git pull", CommandOutput::ok(""))
            .on("git rev-parse --verify", CommandOutput::ok("abc"))
            .on("git branch -d feature/task-001", CommandOutput::ok(""));
        let wf = Workflow::new(dir.path(), &settings, &runner);
        let out = wf.sync().unwrap();
        assert!(out.checked_out);
        assert!(out.pulled);
        assert_eq!(out.deleted_branch.as_deref(), Some("feature/task-001"));
    }

    #[test]
    fn sync_failure_is_reported_not_raised() {
        let dir = project(1);
        let settings = Settings::default();
        let runner = ScriptedRunner::new().on("git checkout", CommandOutput::failed("conflict"));
        let wf = Workflow::new(dir.path(), &settings, &runner);
        let out = wf.sync().unwrap();
        assert_eq!(out.default_branch, "main");
        assert!(!out.checked_out);
        assert!(!out.pulled);
        assert_eq!(out.deleted_branch, None);
    }
}
