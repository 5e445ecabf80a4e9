//! GitHub Issues backend over the REST API, authenticated with a token.

use crate::platform::{PlatformClient, Readiness};
use crate::settings::GitHubSettings;
use crate::types::{PlatformKind, TaskStatus};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;

pub const GITHUB_API_URL: &str = "https://api.github.com";
const STATUS_LABEL_PREFIX: &str = "status: ";
const USER_AGENT: &str = concat!("agentic15/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    http: Client,
    base_url: String,
    settings: GitHubSettings,
    /// Whether `gh` (used for pull requests) is on PATH; `None` if unchecked.
    gh_cli: Option<bool>,
}

#[derive(Deserialize)]
struct IssueCreated {
    number: u64,
}

#[derive(Deserialize)]
struct Issue {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Deserialize)]
struct Label {
    name: String,
}

impl GitHubClient {
    pub fn new(settings: GitHubSettings) -> Self {
        let base_url = settings
            .api_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| GITHUB_API_URL.to_string());
        Self::with_base_url(settings, base_url)
    }

    /// Point the client at another API root (GitHub Enterprise, tests).
    pub fn with_base_url(settings: GitHubSettings, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
            gh_cli: None,
        }
    }

    /// Record whether the `gh` CLI is installed, so readiness can warn that
    /// pull requests will be skipped.
    pub fn with_gh_cli(mut self, available: bool) -> Self {
        self.gh_cli = Some(available);
        self
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.base_url,
            self.settings.owner.as_deref().unwrap_or_default(),
            self.settings.repo.as_deref().unwrap_or_default()
        )
    }

    fn issues_url(&self) -> String {
        format!("{}/issues", self.repo_url())
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(self.settings.token.as_deref().unwrap_or_default())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", USER_AGENT)
    }

    /// Send and check for a 2xx; failures are logged with `action`.
    fn send(&self, action: &str, req: RequestBuilder) -> Option<reqwest::blocking::Response> {
        match self.authed(req).send() {
            Ok(resp) if resp.status().is_success() => Some(resp),
            Ok(resp) => {
                let status = resp.status();
                let body: String = resp.text().unwrap_or_default().chars().take(300).collect();
                tracing::warn!("GitHub {action} failed ({status}): {body}");
                None
            }
            Err(e) => {
                tracing::warn!("GitHub {action} failed: {e}");
                None
            }
        }
    }

    fn guard(&self, action: &str) -> bool {
        if !self.is_configured() {
            tracing::warn!(
                "GitHub {action} skipped: missing {}",
                self.settings.missing_fields().join(", ")
            );
            return false;
        }
        true
    }

    fn current_labels(&self, number: u64) -> Option<Vec<String>> {
        let url = format!("{}/{number}", self.issues_url());
        let resp = self.send("issue lookup", self.http.get(url))?;
        match resp.json::<Issue>() {
            Ok(issue) => Some(issue.labels.into_iter().map(|l| l.name).collect()),
            Err(e) => {
                tracing::warn!("GitHub issue lookup returned unexpected body: {e}");
                None
            }
        }
    }
}

/// Replace any `status: *` label with the one for `status`, keeping the rest.
pub fn swap_status_label(labels: &[String], status: TaskStatus) -> Vec<String> {
    let mut next: Vec<String> = labels
        .iter()
        .filter(|l| !l.starts_with(STATUS_LABEL_PREFIX))
        .cloned()
        .collect();
    next.push(status.github_label().to_string());
    next
}

impl PlatformClient for GitHubClient {
    fn kind(&self) -> PlatformKind {
        PlatformKind::GitHub
    }

    fn is_configured(&self) -> bool {
        self.settings.is_complete()
    }

    fn create_item(&self, title: &str, body: &str, tags: &[String]) -> Option<u64> {
        if !self.guard("issue create") {
            return None;
        }
        let payload = json!({ "title": title, "body": body, "labels": tags });
        let resp = self.send("issue create", self.http.post(self.issues_url()).json(&payload))?;
        match resp.json::<IssueCreated>() {
            Ok(created) => {
                tracing::info!(issue = created.number, "GitHub issue created");
                Some(created.number)
            }
            Err(e) => {
                tracing::warn!("GitHub issue create returned unexpected body: {e}");
                None
            }
        }
    }

    fn update_state(&self, id: u64, status: TaskStatus) -> bool {
        if !self.guard("label update") {
            return false;
        }
        let Some(labels) = self.current_labels(id) else {
            return false;
        };
        let url = format!("{}/{id}/labels", self.issues_url());
        let payload = json!({ "labels": swap_status_label(&labels, status) });
        self.send("label update", self.http.put(url).json(&payload))
            .is_some()
    }

    fn add_comment(&self, id: u64, text: &str) -> bool {
        if !self.guard("comment") {
            return false;
        }
        let url = format!("{}/{id}/comments", self.issues_url());
        self.send("comment", self.http.post(url).json(&json!({ "body": text })))
            .is_some()
    }

    fn close_item(&self, id: u64, comment: Option<&str>) -> bool {
        if !self.guard("issue close") {
            return false;
        }
        if let Some(text) = comment {
            // A failed comment does not stop the close.
            self.add_comment(id, text);
        }
        let url = format!("{}/{id}", self.issues_url());
        self.send(
            "issue close",
            self.http.patch(url).json(&json!({ "state": "closed" })),
        )
        .is_some()
    }

    fn readiness(&self) -> Readiness {
        if !self.settings.enabled {
            return Readiness::not_ready("disabled: set github.enabled=true or GITHUB_ENABLED=1");
        }
        if !self.is_configured() {
            return Readiness::not_ready(format!(
                "set github.{} in .claude/settings.local.json or GITHUB_TOKEN/GITHUB_OWNER/GITHUB_REPO",
                self.settings.missing_fields().join(", github.")
            ));
        }
        if self.send("repository probe", self.http.get(self.repo_url())).is_none() {
            return Readiness::not_ready(format!(
                "token rejected or repository {}/{} not reachable: check GITHUB_TOKEN and its repo scope",
                self.settings.owner.as_deref().unwrap_or_default(),
                self.settings.repo.as_deref().unwrap_or_default()
            ));
        }
        match self.gh_cli {
            Some(false) => Readiness {
                ready: true,
                hint: Some(
                    "gh CLI not found; pull requests will be skipped (https://cli.github.com)"
                        .to_string(),
                ),
            },
            _ => Readiness::ready(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
