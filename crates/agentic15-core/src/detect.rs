//! Platform detection.
//!
//! Steps run in a fixed priority order and the first hit wins:
//!
//! 1. cached result (only when a [`DetectionCache`] is attached)
//! 2. explicit `platform.type` with `platform.autoDetect = false`
//! 3. `git remote get-url origin`
//! 4. `.git/config` read directly
//! 5. feature flags (`github.enabled` / `azureDevOps.enabled`)
//!
//! A miss at any step is recorded as a [`DetectionFailure`] and detection
//! moves on; nothing here returns an error to the caller. When every step
//! misses the platform is `None`, which callers treat as "integration
//! disabled".

use crate::paths;
use crate::process::CommandRunner;
use crate::remote::{origin_url_from_git_config, parse_remote_url};
use crate::settings::Settings;
use crate::types::PlatformKind;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStep {
    Cache,
    Override,
    GitRemote,
    GitConfig,
    FeatureFlags,
}

impl DetectionStep {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionStep::Cache => "cache",
            DetectionStep::Override => "override",
            DetectionStep::GitRemote => "git_remote",
            DetectionStep::GitConfig => "git_config",
            DetectionStep::FeatureFlags => "feature_flags",
        }
    }
}

impl fmt::Display for DetectionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionFailure {
    #[error("no cached result")]
    CacheEmpty,
    #[error("no explicit platform override")]
    NoOverride,
    #[error("override '{0}' is not a known platform")]
    InvalidOverride(String),
    #[error("git unavailable: {0}")]
    NoGit(String),
    #[error("no origin remote: {0}")]
    NoRemote(String),
    #[error("unrecognized remote url '{0}'")]
    Unrecognized(String),
    #[error("no .git/config file")]
    NoConfigFile,
    #[error("no url entry in .git/config")]
    ParseFailed,
    #[error("no platform enabled")]
    NoFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub step: DetectionStep,
    pub reason: String,
}

/// Outcome of one detection run, including why earlier steps missed.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub platform: Option<PlatformKind>,
    /// Step that produced `platform`; `None` when nothing matched.
    pub source: Option<DetectionStep>,
    pub failures: Vec<StepFailure>,
    /// Both platforms were enabled and GitHub was picked by default.
    pub ambiguous: bool,
}

/// Holds the last successful detection. Owned by the caller, so separate
/// tests or commands never share a result unless they share the cache.
#[derive(Debug, Default)]
pub struct DetectionCache {
    slot: Mutex<Option<PlatformKind>>,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<PlatformKind> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, platform: PlatformKind) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(platform);
    }

    /// Forget the cached result, e.g. after settings or remotes change.
    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

type StepResult = std::result::Result<PlatformKind, DetectionFailure>;

pub struct PlatformDetector<'a> {
    root: &'a Path,
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
    cache: Option<&'a DetectionCache>,
}

impl<'a> PlatformDetector<'a> {
    pub fn new(root: &'a Path, settings: &'a Settings, runner: &'a dyn CommandRunner) -> Self {
        Self {
            root,
            settings,
            runner,
            cache: None,
        }
    }

    /// Read from and write to `cache`.
    pub fn with_cache(mut self, cache: &'a DetectionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn detect(&self) -> Detection {
        let mut failures = Vec::new();
        let mut ambiguous = false;

        for step in [
            DetectionStep::Cache,
            DetectionStep::Override,
            DetectionStep::GitRemote,
            DetectionStep::GitConfig,
            DetectionStep::FeatureFlags,
        ] {
            let result = match step {
                DetectionStep::Cache => self.from_cache(),
                DetectionStep::Override => self.from_override(),
                DetectionStep::GitRemote => self.from_git_remote(),
                DetectionStep::GitConfig => self.from_git_config(),
                DetectionStep::FeatureFlags => self.from_feature_flags(&mut ambiguous),
            };
            match result {
                Ok(platform) => {
                    tracing::debug!(%platform, %step, "platform detected");
                    if let Some(cache) = self.cache {
                        cache.set(platform);
                    }
                    return Detection {
                        platform: Some(platform),
                        source: Some(step),
                        failures,
                        ambiguous,
                    };
                }
                Err(reason) => {
                    tracing::debug!(%step, %reason, "detection step missed");
                    failures.push(StepFailure {
                        step,
                        reason: reason.to_string(),
                    });
                }
            }
        }

        Detection {
            platform: None,
            source: None,
            failures,
            ambiguous,
        }
    }

    fn from_cache(&self) -> StepResult {
        self.cache
            .and_then(DetectionCache::get)
            .ok_or(DetectionFailure::CacheEmpty)
    }

    fn from_override(&self) -> StepResult {
        let over = &self.settings.platform;
        match over.kind.as_deref() {
            Some(kind) if !over.auto_detect => kind
                .parse::<PlatformKind>()
                .map_err(|_| DetectionFailure::InvalidOverride(kind.to_string())),
            _ => Err(DetectionFailure::NoOverride),
        }
    }

    fn from_git_remote(&self) -> StepResult {
        let out = self
            .runner
            .run("git", &["remote", "get-url", "origin"], self.root)
            .map_err(|e| DetectionFailure::NoGit(e.to_string()))?;
        if !out.success {
            return Err(DetectionFailure::NoRemote(out.diagnostic()));
        }
        let url = out.text();
        parse_remote_url(url).ok_or_else(|| DetectionFailure::Unrecognized(url.to_string()))
    }

    fn from_git_config(&self) -> StepResult {
        let text = std::fs::read_to_string(paths::git_config_path(self.root))
            .map_err(|_| DetectionFailure::NoConfigFile)?;
        let url = origin_url_from_git_config(&text).ok_or(DetectionFailure::ParseFailed)?;
        parse_remote_url(&url).ok_or(DetectionFailure::Unrecognized(url))
    }

    fn from_feature_flags(&self, ambiguous: &mut bool) -> StepResult {
        match (
            self.settings.github.enabled,
            self.settings.azure_dev_ops.enabled,
        ) {
            (true, true) => {
                tracing::warn!(
                    "both GitHub and Azure DevOps are enabled; defaulting to GitHub. \
                     Set platform.type with platform.autoDetect=false to choose explicitly"
                );
                *ambiguous = true;
                Ok(PlatformKind::GitHub)
            }
            (true, false) => Ok(PlatformKind::GitHub),
            (false, true) => Ok(PlatformKind::Azure),
            (false, false) => Err(DetectionFailure::NoFlags),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;
    use crate::process::CommandOutput;
    use crate::settings::{AzureSettings, GitHubSettings, PlatformOverride};
    use tempfile::TempDir;

    fn remote(url: &str) -> ScriptedRunner {
        ScriptedRunner::new().on("git remote get-url origin", CommandOutput::ok(format!("{url}\n")))
    }

    fn no_remote() -> ScriptedRunner {
        ScriptedRunner::new().on(
            "git remote get-url origin",
            CommandOutput::failed("error: No such remote 'origin'"),
        )
    }

    fn flags(github: bool, azure: bool) -> Settings {
        Settings {
            github: GitHubSettings {
                enabled: github,
                ..Default::default()
            },
            azure_dev_ops: AzureSettings {
                enabled: azure,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn override_wins_over_remote() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            platform: PlatformOverride {
                kind: Some("azure".to_string()),
                auto_detect: false,
            },
            ..Default::default()
        };
        let runner = remote("https://github.com/o/r.git");
        let d = PlatformDetector::new(dir.path(), &settings, &runner).detect();
        assert_eq!(d.platform, Some(PlatformKind::Azure));
        assert_eq!(d.source, Some(DetectionStep::Override));
        assert!(runner.calls().is_empty(), "git must not be consulted");
    }

    #[test]
    fn override_ignored_while_auto_detect_on() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            platform: PlatformOverride {
                kind: Some("azure".to_string()),
                auto_detect: true,
            },
            ..Default::default()
        };
        let runner = remote("git@github.com:o/r.git");
        let d = PlatformDetector::new(dir.path(), &settings, &runner).detect();
        assert_eq!(d.platform, Some(PlatformKind::GitHub));
        assert_eq!(d.source, Some(DetectionStep::GitRemote));
    }

    #[test]
    fn remote_url_detects_azure() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::default();
        let runner = remote("https://dev.azure.com/org/proj/_git/repo");
        let d = PlatformDetector::new(dir.path(), &settings, &runner).detect();
        assert_eq!(d.platform, Some(PlatformKind::Azure));
    }

    #[test]
    fn git_config_file_used_when_git_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(
            dir.path().join(".git/config"),
            "[remote \"origin\"]\n\turl = https://org.visualstudio.com/p/_git/r\n",
        )
        .unwrap();
        let settings = Settings::default();
        let runner = ScriptedRunner::new().without("git");
        let d = PlatformDetector::new(dir.path(), &settings, &runner).detect();
        assert_eq!(d.platform, Some(PlatformKind::Azure));
        assert_eq!(d.source, Some(DetectionStep::GitConfig));
        assert!(d.failures.iter().any(|f| {
            f.step == DetectionStep::GitRemote && f.reason.starts_with("git unavailable")
        }));
    }

    #[test]
    fn unrecognized_remote_falls_through_to_flags() {
        let dir = TempDir::new().unwrap();
        let settings = flags(false, true);
        let runner = remote("https://gitlab.com/o/r.git");
        let d = PlatformDetector::new(dir.path(), &settings, &runner).detect();
        assert_eq!(d.platform, Some(PlatformKind::Azure));
        assert_eq!(d.source, Some(DetectionStep::FeatureFlags));
    }

    /// Documented default: with both integrations enabled and nothing else to
    /// go on, GitHub is chosen and the ambiguity is flagged, not an error.
    #[test]
    fn both_flags_default_to_github() {
        let dir = TempDir::new().unwrap();
        let settings = flags(true, true);
        let d = PlatformDetector::new(dir.path(), &settings, &no_remote()).detect();
        assert_eq!(d.platform, Some(PlatformKind::GitHub));
        assert!(d.ambiguous);
    }

    #[test]
    fn nothing_enabled_yields_none() {
        let dir = TempDir::new().unwrap();
        let settings = flags(false, false);
        let d = PlatformDetector::new(dir.path(), &settings, &no_remote()).detect();
        assert_eq!(d.platform, None);
        assert_eq!(d.source, None);
        assert_eq!(d.failures.len(), 5);
    }

    #[test]
    fn cache_short_circuits_until_cleared() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::default();
        let cache = DetectionCache::new();

        let github = remote("https://github.com/o/r.git");
        let first = PlatformDetector::new(dir.path(), &settings, &github)
            .with_cache(&cache)
            .detect();
        assert_eq!(first.platform, Some(PlatformKind::GitHub));

        // Remote changed mid-session; the cache still answers.
        let azure = remote("https://dev.azure.com/o/p/_git/r");
        let cached = PlatformDetector::new(dir.path(), &settings, &azure)
            .with_cache(&cache)
            .detect();
        assert_eq!(cached.platform, Some(PlatformKind::GitHub));
        assert_eq!(cached.source, Some(DetectionStep::Cache));
        assert!(azure.calls().is_empty());

        cache.clear();
        let fresh = PlatformDetector::new(dir.path(), &settings, &azure)
            .with_cache(&cache)
            .detect();
        assert_eq!(fresh.platform, Some(PlatformKind::Azure));
    }

    #[test]
    fn no_cache_attached_always_redetects() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::default();
        let runner = remote("https://github.com/o/r.git");
        let detector = PlatformDetector::new(dir.path(), &settings, &runner);
        detector.detect();
        detector.detect();
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn invalid_override_is_recorded() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            platform: PlatformOverride {
                kind: Some("gitlab".to_string()),
                auto_detect: false,
            },
            ..Default::default()
        };
        let d = PlatformDetector::new(dir.path(), &settings, &no_remote()).detect();
        assert_eq!(d.platform, None);
        assert!(d
            .failures
            .iter()
            .any(|f| f.step == DetectionStep::Override && f.reason.contains("gitlab")));
    }
}
