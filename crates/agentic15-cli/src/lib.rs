//! Command implementations behind the `agentic15` binary.

pub mod cmd;
pub mod output;
pub mod root;
