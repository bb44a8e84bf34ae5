use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "capture-hub")]
#[command(about = "Event hub for the desktop recording SDK", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the service (default when no command is given)
    Serve,
    /// Print version information
    Version,
    /// Show the running service's SDK status
    Status,
    /// Initialize the SDK in the running service
    Init,
    /// Shut the SDK down in the running service
    Shutdown,
    /// Inspect or change the SDK configuration of the running service
    Config(ConfigCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ConfigCliArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the current SDK configuration
    Show,
    /// Update one or more SDK configuration fields
    Set {
        /// Enable or disable the SDK
        #[arg(long)]
        enabled: Option<bool>,
        /// Provider API endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// Request OS permissions when the SDK initializes
        #[arg(long)]
        request_permissions: Option<bool>,
    },
}
