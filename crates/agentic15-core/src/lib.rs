pub mod azure;
pub mod detect;
pub mod error;
pub mod git;
pub mod github;
pub mod init;
pub mod io;
pub mod paths;
pub mod plan;
pub mod platform;
pub mod process;
pub mod remote;
pub mod router;
pub mod settings;
pub mod task;
pub mod tracker;
pub mod types;
pub mod workflow;

pub use error::{Agentic15Error, Result};
