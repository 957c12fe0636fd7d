//! Command-line interface for the `reverb` binary.

mod commands;
mod handlers;

pub use commands::{Cli, Commands, ReviewAction};
pub use handlers::run;
