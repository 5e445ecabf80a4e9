//! Three-tier platform settings.
//!
//! `.claude/settings.json` (team defaults) is deep-merged with
//! `.claude/settings.local.json` (personal, gitignored), and environment
//! variables override both. Settings are loaded fresh for every command;
//! nothing is kept across invocations.
//!
//! The settings file is shared with other tooling, so unknown keys are
//! ignored and a malformed file degrades to "no settings" with a warning.

use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_OWNER: &str = "GITHUB_OWNER";
pub const ENV_GITHUB_REPO: &str = "GITHUB_REPO";
pub const ENV_GITHUB_ENABLED: &str = "GITHUB_ENABLED";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_AZURE_ORGANIZATION: &str = "AZURE_DEVOPS_ORGANIZATION";
pub const ENV_AZURE_PROJECT: &str = "AZURE_DEVOPS_PROJECT";
pub const ENV_AZURE_ENABLED: &str = "AZURE_DEVOPS_ENABLED";

// ---------------------------------------------------------------------------
// Settings sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformOverride {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default = "default_true")]
    pub auto_detect: bool,
}

impl Default for PlatformOverride {
    fn default() -> Self {
        Self {
            kind: None,
            auto_detect: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// REST root for GitHub Enterprise; defaults to api.github.com.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default = "default_true")]
    pub auto_create: bool,
    #[serde(default = "default_true")]
    pub auto_update: bool,
    #[serde(default = "default_true")]
    pub auto_close: bool,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            owner: None,
            repo: None,
            api_url: None,
            auto_create: true,
            auto_update: true,
            auto_close: true,
        }
    }
}

impl GitHubSettings {
    /// Enabled with every identity field present.
    pub fn is_complete(&self) -> bool {
        self.enabled && present(&self.token) && present(&self.owner) && present(&self.repo)
    }

    /// Names of the identity fields that are missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !present(&self.token) {
            missing.push("token");
        }
        if !present(&self.owner) {
            missing.push("owner");
        }
        if !present(&self.repo) {
            missing.push("repo");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default = "default_true")]
    pub auto_create: bool,
    #[serde(default = "default_true")]
    pub auto_update: bool,
    #[serde(default = "default_true")]
    pub auto_close: bool,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            organization: None,
            project: None,
            auto_create: true,
            auto_update: true,
            auto_close: true,
        }
    }
}

impl AzureSettings {
    /// Enabled with organization and project present. Authentication is the
    /// `az` CLI's own login, so no secret is required here.
    pub fn is_complete(&self) -> bool {
        self.enabled && present(&self.organization) && present(&self.project)
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !present(&self.organization) {
            missing.push("organization");
        }
        if !present(&self.project) {
            missing.push("project");
        }
        missing
    }

    /// Organization URL in the form `az` expects for `--org`.
    pub fn organization_url(&self) -> Option<String> {
        let org = self.organization.as_deref().filter(|s| !s.is_empty())?;
        if org.starts_with("https://") {
            Some(org.trim_end_matches('/').to_string())
        } else {
            Some(format!("https://dev.azure.com/{org}"))
        }
    }
}

fn default_true() -> bool {
    true
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Settings (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub platform: PlatformOverride,
    #[serde(default)]
    pub github: GitHubSettings,
    #[serde(default)]
    pub azure_dev_ops: AzureSettings,
}

impl Settings {
    /// Load from the project's settings files and the process environment.
    pub fn load(root: &Path) -> Self {
        Self::load_with_env(root, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup, so tests never mutate the
    /// process environment.
    pub fn load_with_env(root: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut merged = Value::Object(Default::default());
        for path in [paths::settings_path(root), paths::local_settings_path(root)] {
            if let Some(layer) = read_layer(&path) {
                deep_merge(&mut merged, layer);
            }
        }
        let mut settings = match serde_json::from_value::<Settings>(merged) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("ignoring platform settings: {e}");
                Settings::default()
            }
        };
        settings.apply_env(env);
        settings
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| env(key).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_GITHUB_TOKEN) {
            self.github.token = Some(v);
        }
        if let Some(v) = get(ENV_GITHUB_OWNER) {
            self.github.owner = Some(v);
        }
        if let Some(v) = get(ENV_GITHUB_REPO) {
            self.github.repo = Some(v);
        }
        if let Some(v) = get(ENV_GITHUB_API_URL) {
            self.github.api_url = Some(v);
        }
        if let Some(v) = get(ENV_GITHUB_ENABLED) {
            self.github.enabled = parse_bool(&v);
        }
        if let Some(v) = get(ENV_AZURE_ORGANIZATION) {
            self.azure_dev_ops.organization = Some(v);
        }
        if let Some(v) = get(ENV_AZURE_PROJECT) {
            self.azure_dev_ops.project = Some(v);
        }
        if let Some(v) = get(ENV_AZURE_ENABLED) {
            self.azure_dev_ops.enabled = parse_bool(&v);
        }
    }

    /// Document written by `init` when no settings file exists yet.
    pub fn default_document() -> Value {
        serde_json::json!({
            "platform": { "autoDetect": true },
            "github": {
                "enabled": false,
                "autoCreate": true,
                "autoUpdate": true,
                "autoClose": true
            },
            "azureDevOps": {
                "enabled": false,
                "autoCreate": true,
                "autoUpdate": true,
                "autoClose": true
            }
        })
    }

    /// Merge `patch` into the local-override file, creating it if needed.
    pub fn update_local(root: &Path, patch: Value) -> Result<()> {
        let path = paths::local_settings_path(root);
        let mut current = read_layer(&path).unwrap_or_else(|| Value::Object(Default::default()));
        deep_merge(&mut current, patch);
        crate::io::write_json(&path, &current)
    }
}

fn read_layer(path: &Path) -> Option<Value> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&data) {
        Ok(v @ Value::Object(_)) => Some(v),
        Ok(_) => {
            tracing::warn!("{} is not a JSON object; skipping", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("{} is not valid JSON ({e}); skipping", path.display());
            None
        }
    }
}

/// Recursively merge `overlay` into `base`. Objects merge key by key; any
/// other value in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
