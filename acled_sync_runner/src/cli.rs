use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "acled-sync", version, about = "ACLED live feature-layer sync")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one full-refresh sync (default if no subcommand given).
    Run {
        /// Set when the external timer fired later than scheduled (logged
        /// only, no behavior change).
        #[arg(long)]
        past_due: bool,
    },

    /// Run syncs on a fixed in-process interval, for environments without an
    /// external timer.
    Schedule {
        #[arg(long, default_value = "60")]
        every_minutes: u64,
    },

    /// Delete every feature in the target layer without inserting
    /// replacements.
    Reset,

    /// Print the resolved configuration (secrets redacted).
    Config,
}
