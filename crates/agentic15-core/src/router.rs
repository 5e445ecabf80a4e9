//! Routes task sync to whichever backend the project uses.
//!
//! Detection runs once at construction. The router then holds exactly one
//! backend (or none) and delegates to it verbatim; it never falls back from
//! one platform to the other.

use crate::azure::AzureDevOpsClient;
use crate::detect::{Detection, DetectionCache, PlatformDetector};
use crate::github::GitHubClient;
use crate::platform::{PlatformClient, Readiness};
use crate::process::CommandRunner;
use crate::settings::Settings;
use crate::task::Task;
use crate::types::PlatformKind;
use std::path::Path;

pub enum Backend<'a> {
    GitHub(GitHubClient),
    Azure(AzureDevOpsClient<'a>),
    None,
}

impl Backend<'_> {
    fn client(&self) -> Option<&dyn PlatformClient> {
        match self {
            Backend::GitHub(c) => Some(c),
            Backend::Azure(c) => Some(c),
            Backend::None => None,
        }
    }
}

/// Per-platform switches for the automatic tracker actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoActions {
    pub create: bool,
    pub update: bool,
    pub close: bool,
}

pub struct PlatformRouter<'a> {
    detection: Detection,
    backend: Backend<'a>,
    auto: AutoActions,
}

impl<'a> PlatformRouter<'a> {
    pub fn new(root: &Path, settings: &Settings, runner: &'a dyn CommandRunner) -> Self {
        Self::build(root, settings, runner, None)
    }

    /// Like [`PlatformRouter::new`], reusing a detection cache.
    pub fn with_cache(
        root: &Path,
        settings: &Settings,
        runner: &'a dyn CommandRunner,
        cache: &DetectionCache,
    ) -> Self {
        Self::build(root, settings, runner, Some(cache))
    }

    fn build(
        root: &Path,
        settings: &Settings,
        runner: &'a dyn CommandRunner,
        cache: Option<&DetectionCache>,
    ) -> Self {
        let mut detector = PlatformDetector::new(root, settings, runner);
        if let Some(cache) = cache {
            detector = detector.with_cache(cache);
        }
        let detection = detector.detect();

        let (backend, auto) = match detection.platform {
            Some(PlatformKind::GitHub) if settings.github.is_complete() => {
                let gh = &settings.github;
                let client = GitHubClient::new(gh.clone()).with_gh_cli(runner.available("gh"));
                (
                    Backend::GitHub(client),
                    AutoActions {
                        create: gh.auto_create,
                        update: gh.auto_update,
                        close: gh.auto_close,
                    },
                )
            }
            Some(PlatformKind::Azure) if settings.azure_dev_ops.is_complete() => {
                let az = &settings.azure_dev_ops;
                (
                    Backend::Azure(AzureDevOpsClient::new(az.clone(), runner, root)),
                    AutoActions {
                        create: az.auto_create,
                        update: az.auto_update,
                        close: az.auto_close,
                    },
                )
            }
            Some(platform) => {
                tracing::info!(
                    %platform,
                    "{} detected but not configured; tracker sync disabled",
                    platform.display_name()
                );
                (Backend::None, AutoActions::default())
            }
            None => (Backend::None, AutoActions::default()),
        };

        Self {
            detection,
            backend,
            auto,
        }
    }

    /// Router around an explicit backend, bypassing detection.
    pub fn from_backend(backend: Backend<'a>, auto: AutoActions) -> Self {
        let platform = backend.client().map(|c| c.kind());
        Self {
            detection: Detection {
                platform,
                source: None,
                failures: Vec::new(),
                ambiguous: false,
            },
            backend,
            auto,
        }
    }

    /// Detected platform, even when its configuration is incomplete.
    pub fn platform(&self) -> Option<PlatformKind> {
        self.detection.platform
    }

    pub fn detection(&self) -> &Detection {
        &self.detection
    }

    pub fn is_configured(&self) -> bool {
        self.backend.client().is_some_and(|c| c.is_configured())
    }

    pub fn auto_create(&self) -> bool {
        self.auto.create
    }

    pub fn auto_update(&self) -> bool {
        self.auto.update
    }

    pub fn auto_close(&self) -> bool {
        self.auto.close
    }

    /// Readiness of the live backend; `None` when there is no backend.
    pub fn readiness(&self) -> Option<Readiness> {
        self.backend.client().map(|c| c.readiness())
    }

    /// Open an issue / work item for `task`. GitHub items also carry the
    /// task's status label.
    pub fn create_task_item(&self, task: &Task) -> Option<u64> {
        let client = self.backend.client()?;
        let mut tags = task.tags.clone();
        if client.kind() == PlatformKind::GitHub {
            tags.push(task.status.github_label().to_string());
        }
        client.create_item(&item_title(task), &task.item_body(), &tags)
    }

    /// Mirror `task.status` onto item `id`.
    pub fn update_task_item(&self, task: &Task, id: u64) -> bool {
        self.backend
            .client()
            .is_some_and(|c| c.update_state(id, task.status))
    }

    pub fn close_task_item(&self, id: u64, comment: Option<&str>) -> bool {
        self.backend
            .client()
            .is_some_and(|c| c.close_item(id, comment))
    }

    pub fn add_comment(&self, id: u64, text: &str) -> bool {
        self.backend
            .client()
            .is_some_and(|c| c.add_comment(id, text))
    }
}

/// `[TASK-001] Title`
pub fn item_title(task: &Task) -> String {
    format!("[{}] {}", task.id, task.title)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
