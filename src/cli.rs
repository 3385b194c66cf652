use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Shell;

#[derive(Parser, Debug)]
#[command(name = "sswenv", version, about)]
pub struct Args {
    /// Path to config.toml (overrides SSWENV_CONFIG and XDG default)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Resolve as if running on this host (overrides SSWENV_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Target shell (overrides SSWENV_SHELL and $SHELL)
    #[arg(long, value_enum, global = true)]
    pub shell: Option<Shell>,

    /// Leave {token} placeholders unexpanded
    #[arg(long, global = true, default_value_t = false)]
    pub raw: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Emit)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print a script for `eval` / `source` (default)
    Emit,

    /// Print the resolved settings
    Show {
        /// Emit JSON instead of KEY=VALUE lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List host profiles and which one applies here
    Hosts,

    /// Run a command with the resolved settings in its environment
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },

    /// Describe the loaded configuration
    Report {
        #[arg(long, value_enum, default_value_t = ReportMode::Summary)]
        mode: ReportMode,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportMode {
    Summary,
    Full,
}
