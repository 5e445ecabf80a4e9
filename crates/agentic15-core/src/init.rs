//! Project scaffolding for `agentic15 init`.

use crate::error::Result;
use crate::io;
use crate::paths;
use crate::process::CommandRunner;
use crate::remote::github_repo_slug;
use crate::settings::Settings;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    /// `owner/repo` written to the local settings from the origin remote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
}

/// Create `.claude/`, default settings, and the gitignore entry for the
/// personal settings file. Idempotent: existing files are left alone.
pub fn init(root: &Path, runner: &dyn CommandRunner) -> Result<InitReport> {
    let mut report = InitReport::default();

    for dir in [paths::CLAUDE_DIR, paths::PLANS_DIR] {
        let p = root.join(dir);
        if p.is_dir() {
            report.existing.push(dir.to_string());
        } else {
            io::ensure_dir(&p)?;
            report.created.push(dir.to_string());
        }
    }

    let mut doc = serde_json::to_string_pretty(&Settings::default_document())?;
    doc.push('\n');
    if io::write_if_missing(&paths::settings_path(root), doc.as_bytes())? {
        report.created.push(paths::SETTINGS_FILE.to_string());
    } else {
        report.existing.push(paths::SETTINGS_FILE.to_string());
    }

    io::ensure_gitignore_entry(root, paths::LOCAL_SETTINGS_FILE)?;
    report.github_repo = seed_github_repo(root, runner)?;
    Ok(report)
}

/// Fill `github.owner` / `github.repo` from a GitHub origin remote when the
/// settings files do not name them yet.
fn seed_github_repo(root: &Path, runner: &dyn CommandRunner) -> Result<Option<String>> {
    let current = Settings::load_with_env(root, |_| None);
    if current.github.owner.is_some() || current.github.repo.is_some() {
        return Ok(None);
    }
    let url = match runner.run("git", &["remote", "get-url", "origin"], root) {
        Ok(out) if out.success => out.text().to_string(),
        _ => return Ok(None),
    };
    let Some((owner, repo)) = github_repo_slug(&url) else {
        return Ok(None);
    };
    Settings::update_local(
        root,
        serde_json::json!({ "github": { "owner": owner, "repo": repo } }),
    )?;
    tracing::info!(%owner, %repo, "seeded GitHub repository from origin");
    Ok(Some(format!("{owner}/{repo}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;
    use crate::process::CommandOutput;
    use tempfile::TempDir;

    #[test]
    fn scaffolds_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let first = init(dir.path(), &runner).unwrap();
        assert!(first.created.contains(&paths::SETTINGS_FILE.to_string()));
        assert!(dir.path().join(paths::PLANS_DIR).is_dir());

        let second = init(dir.path(), &runner).unwrap();
        assert!(second.created.is_empty());
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore, ".claude/settings.local.json\n");
    }

    #[test]
    fn keeps_existing_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        std::fs::write(dir.path().join(paths::SETTINGS_FILE), "{\"hooks\":{}}").unwrap();
        init(dir.path(), &ScriptedRunner::new()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join(paths::SETTINGS_FILE)).unwrap(),
            "{\"hooks\":{}}"
        );
    }

    #[test]
    fn seeds_github_repo_from_origin() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on(
            "git remote get-url origin",
            CommandOutput::ok("git@github.com:acme/widgets.git\n"),
        );
        let report = init(dir.path(), &runner).unwrap();
        assert_eq!(report.github_repo.as_deref(), Some("acme/widgets"));
        let s = Settings::load_with_env(dir.path(), |_| None);
        assert_eq!(s.github.owner.as_deref(), Some("acme"));
        assert_eq!(s.github.repo.as_deref(), Some("widgets"));
        assert!(!s.github.enabled);
    }
}
