//! The `quickcal` binary's library half: CLI, configuration, the submit
//! flow and the native-messaging host.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod flow;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use flow::{EventFlow, Stage, Submission};
