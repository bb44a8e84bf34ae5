pub mod args;
pub mod sdk;

pub use args::{Cli, CliCommand, ConfigCliArgs, ConfigCommand};
pub use sdk::handle_sdk_command;
