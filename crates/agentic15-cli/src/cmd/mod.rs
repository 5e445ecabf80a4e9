pub mod commit;
pub mod init;
pub mod plan;
pub mod platform;
pub mod status;
pub mod sync;
pub mod task;

use agentic15_core::process::SystemRunner;
use agentic15_core::settings::Settings;
use std::path::Path;

/// Settings and process runner every workflow command starts from.
pub(crate) fn context(root: &Path) -> (Settings, SystemRunner) {
    (Settings::load(root), SystemRunner)
}
