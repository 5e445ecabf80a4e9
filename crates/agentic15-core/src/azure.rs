//! Azure DevOps Boards backend, driven through the `az` CLI and its
//! `azure-devops` extension. Authentication is whatever `az login` holds.

use crate::platform::{PlatformClient, Readiness};
use crate::process::{CommandOutput, CommandRunner};
use crate::settings::AzureSettings;
use crate::types::{PlatformKind, TaskStatus};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const WORK_ITEM_TYPE: &str = "Task";

pub struct AzureDevOpsClient<'a> {
    settings: AzureSettings,
    runner: &'a dyn CommandRunner,
    cwd: PathBuf,
}

#[derive(Deserialize)]
struct WorkItem {
    id: u64,
    #[serde(default)]
    fields: WorkItemFields,
}

#[derive(Deserialize, Default)]
struct WorkItemFields {
    #[serde(rename = "System.Tags", default)]
    tags: Option<String>,
}

/// Split an Azure `System.Tags` value (`"a; b"`) into its tags.
fn split_tags(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Add `status`'s tag and drop the tags of every other status, keeping
/// unrelated tags in order. `None` when nothing changes.
fn retag(current: &[String], status: TaskStatus) -> Option<Vec<String>> {
    let wanted = status.azure_tag();
    let status_tags: Vec<&str> = TaskStatus::all()
        .iter()
        .filter_map(|s| s.azure_tag())
        .collect();
    let mut next: Vec<String> = current
        .iter()
        .filter(|t| {
            !status_tags.iter().any(|s| t.eq_ignore_ascii_case(s))
                || wanted.is_some_and(|w| t.eq_ignore_ascii_case(w))
        })
        .cloned()
        .collect();
    if let Some(w) = wanted {
        if !next.iter().any(|t| t.eq_ignore_ascii_case(w)) {
            next.push(w.to_string());
        }
    }
    (next != current).then_some(next)
}

impl<'a> AzureDevOpsClient<'a> {
    pub fn new(settings: AzureSettings, runner: &'a dyn CommandRunner, cwd: &Path) -> Self {
        Self {
            settings,
            runner,
            cwd: cwd.to_path_buf(),
        }
    }

    /// Run `az <args> --org <url> --output json`; `None` on spawn failure or
    /// non-zero exit.
    fn az(&self, action: &str, args: &[&str]) -> Option<CommandOutput> {
        let org = self.settings.organization_url()?;
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["--org", org.as_str(), "--output", "json"]);
        match self.runner.run("az", &full, &self.cwd) {
            Ok(out) if out.success => Some(out),
            Ok(out) => {
                tracing::warn!("Azure DevOps {action} failed: {}", out.diagnostic());
                None
            }
            Err(e) => {
                tracing::warn!("Azure DevOps {action} failed: {e}");
                None
            }
        }
    }

    fn guard(&self, action: &str) -> bool {
        if !self.is_configured() {
            tracing::warn!(
                "Azure DevOps {action} skipped: missing {}",
                self.settings.missing_fields().join(", ")
            );
            return false;
        }
        true
    }

    /// Current tags of work item `id`, or `None` when it cannot be read.
    fn tags(&self, id: &str) -> Option<Vec<String>> {
        let out = self.az("work item show", &["boards", "work-item", "show", "--id", id])?;
        match serde_json::from_str::<WorkItem>(&out.stdout) {
            Ok(item) => Some(item.fields.tags.as_deref().map(split_tags).unwrap_or_default()),
            Err(e) => {
                tracing::warn!("Azure DevOps work item show returned unexpected output: {e}");
                None
            }
        }
    }

    fn probe(&self, args: &[&str]) -> bool {
        self.runner
            .run("az", args, &self.cwd)
            .map(|out| out.success)
            .unwrap_or(false)
    }
}

impl PlatformClient for AzureDevOpsClient<'_> {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Azure
    }

    fn is_configured(&self) -> bool {
        self.settings.is_complete()
    }

    fn create_item(&self, title: &str, body: &str, tags: &[String]) -> Option<u64> {
        if !self.guard("work item create") {
            return None;
        }
        let project = self.settings.project.as_deref().unwrap_or_default();
        let tag_field = format!("System.Tags={}", tags.join("; "));
        let mut args = vec![
            "boards",
            "work-item",
            "create",
            "--type",
            WORK_ITEM_TYPE,
            "--title",
            title,
            "--description",
            body,
            "--project",
            project,
        ];
        if !tags.is_empty() {
            args.extend(["--fields", tag_field.as_str()]);
        }
        let out = self.az("work item create", &args)?;
        match serde_json::from_str::<WorkItem>(&out.stdout) {
            Ok(item) => {
                tracing::info!(work_item = item.id, "Azure DevOps work item created");
                Some(item.id)
            }
            Err(e) => {
                tracing::warn!("Azure DevOps work item create returned unexpected output: {e}");
                None
            }
        }
    }

    fn update_state(&self, id: u64, status: TaskStatus) -> bool {
        if !self.guard("state update") {
            return false;
        }
        let id = id.to_string();
        // System.Tags is replaced wholesale, so merge into what is there.
        let tag_field = match self.tags(&id) {
            Some(current) => {
                retag(&current, status).map(|tags| format!("System.Tags={}", tags.join("; ")))
            }
            None => {
                tracing::warn!("could not read tags of work item {id}; leaving them unchanged");
                None
            }
        };
        let mut args = vec![
            "boards",
            "work-item",
            "update",
            "--id",
            id.as_str(),
            "--state",
            status.azure_state(),
        ];
        if let Some(field) = &tag_field {
            args.extend(["--fields", field.as_str()]);
        }
        self.az("state update", &args).is_some()
    }

    fn add_comment(&self, id: u64, text: &str) -> bool {
        if !self.guard("comment") {
            return false;
        }
        let id = id.to_string();
        self.az(
            "comment",
            &["boards", "work-item", "update", "--id", id.as_str(), "--discussion", text],
        )
        .is_some()
    }

    fn close_item(&self, id: u64, comment: Option<&str>) -> bool {
        if !self.guard("work item close") {
            return false;
        }
        if let Some(text) = comment {
            self.add_comment(id, text);
        }
        self.update_state(id, TaskStatus::Completed)
    }

    fn readiness(&self) -> Readiness {
        if !self.settings.enabled {
            return Readiness::not_ready(
                "disabled: set azureDevOps.enabled=true or AZURE_DEVOPS_ENABLED=1",
            );
        }
        if !self.is_configured() {
            return Readiness::not_ready(format!(
                "set azureDevOps.{} in .claude/settings.local.json or AZURE_DEVOPS_ORGANIZATION/AZURE_DEVOPS_PROJECT",
                self.settings.missing_fields().join(", azureDevOps.")
            ));
        }
        if !self.runner.available("az") {
            return Readiness::not_ready(
                "Azure CLI not found: install it from https://aka.ms/installazurecli",
            );
        }
        if !self.probe(&["account", "show"]) {
            return Readiness::not_ready("Azure CLI is not logged in: run 'az login'");
        }
        if !self.probe(&["devops", "configure", "--list"]) {
            return Readiness::not_ready(
                "azure-devops extension missing: run 'az extension add --name azure-devops'",
            );
        }
        Readiness::ready()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
