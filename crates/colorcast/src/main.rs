mod cli;
mod commands;

use crate::cli::{ColorCastCli, Commands};
use crate::commands::{check, classify, show};
use logging::LogMode;
use std::process;

fn main() -> anyhow::Result<()> {
    let cli = ColorCastCli::parse_args();
    let _guards = logging::init(LogMode::Cli, cli.verbose)?;

    match cli.command {
        Commands::Check { file } => {
            let problems = check::run(check::CheckArgs { file })?;
            if problems > 0 {
                process::exit(1);
            }
            Ok(())
        }
        Commands::Show { scopes } => show::run(scopes),
        Commands::Classify {
            fixture,
            scopes,
            stats,
        } => classify::run(classify::ClassifyArgs {
            fixture,
            scopes,
            stats,
        }),
    }
}
