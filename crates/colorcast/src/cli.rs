use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "colorcast",
    version,
    about = "Type-driven symbol coloring rules",
    long_about = "Validates colorcast rule files, shows which scheme is active for a project, \
                  and classifies symbols from a JSON fixture."
)]
pub struct ColorCastCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl ColorCastCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report malformed type patterns and unreadable colors in a rule file
    Check {
        /// Rule file to check
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the active scheme after resolving the default and project scopes
    Show {
        #[command(flatten)]
        scopes: ScopeArgs,
    },
    /// Classify the symbols of a fixture with the active rules
    Classify {
        /// Fixture with a supertype hierarchy and the symbols to classify
        #[arg(long, value_name = "FILE")]
        fixture: PathBuf,

        #[command(flatten)]
        scopes: ScopeArgs,

        /// Print cache statistics as JSON after the results
        #[arg(long, default_value_t = false)]
        stats: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct ScopeArgs {
    /// Project root whose .colorcast/colorcast.json may override the default scheme
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Default scope rule file (defaults to ~/.colorcast/colorcast.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
