mod commands;
mod context;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tidemark_core::CoreError;

use commands::*;

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(about = "Database schema migrations with breakpoint-protected rollbacks")]
#[command(version)]
struct Cli {
    /// Target environment (defaults to the configured default environment)
    #[arg(short = 'e', long, global = true)]
    environment: Option<String>,

    /// Path to the YAML manifest
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Migrate {
        /// Migrate up to and including this version
        #[arg(short, long, conflicts_with = "date")]
        target: Option<i64>,

        /// Migrate up to the newest version created on or before YYYY[MM[DD[HH[II[SS]]]]]
        #[arg(short, long)]
        date: Option<String>,

        /// Record migrations as applied without running them
        #[arg(short = 'x', long)]
        fake: bool,
    },

    /// Revert applied migrations
    Rollback {
        /// Version, migration name, or 0/all; defaults to the most recent migration
        #[arg(short, long, conflicts_with = "date")]
        target: Option<String>,

        /// Revert everything applied after YYYY[MM[DD[HH[II[SS]]]]]
        #[arg(short, long)]
        date: Option<String>,

        /// Ignore breakpoints
        #[arg(short, long)]
        force: bool,

        /// Remove ledger entries without running the migrations
        #[arg(short = 'x', long)]
        fake: bool,

        /// Revert only the target version
        #[arg(long, requires = "target")]
        only: bool,
    },

    /// Show which migrations are up, down or missing
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage breakpoints that stop rollbacks
    Breakpoint {
        /// Version to mark; defaults to the most recent migration
        #[arg(short, long, conflicts_with = "remove_all")]
        target: Option<i64>,

        /// Set the breakpoint
        #[arg(long, conflicts_with_all = ["unset", "remove_all"])]
        set: bool,

        /// Clear the breakpoint
        #[arg(long, conflicts_with = "remove_all")]
        unset: bool,

        /// Clear every breakpoint
        #[arg(short, long)]
        remove_all: bool,
    },

    /// Run seeds in dependency order
    Seed {
        /// Run only these seeds
        #[arg(short, long)]
        seed: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    let cli = Cli::parse();

    let config = context::load_config(cli.config.as_deref())?;
    context::init_tracing(&config.log_level);
    let env = context::connect(&config, cli.environment.as_deref()).await?;

    let exit_code = match cli.command {
        Commands::Migrate { target, date, fake } => {
            migrate::run(&env, target, date.as_deref(), fake).await?
        }
        Commands::Rollback {
            target,
            date,
            force,
            fake,
            only,
        } => rollback::run(&env, target.as_deref(), date.as_deref(), force, fake, only).await?,
        Commands::Status { format } => status::run(&env, format).await?,
        Commands::Breakpoint {
            target,
            set,
            unset,
            remove_all,
        } => breakpoint::run(&env, target, set, unset, remove_all).await?,
        Commands::Seed { seed } => seed::run(&env, &seed).await?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rollback_flags() {
        let cli = Cli::try_parse_from([
            "tidemark", "-e", "staging", "rollback", "-t", "20240101000000", "--only", "-f",
        ])
        .unwrap();

        assert_eq!(cli.environment.as_deref(), Some("staging"));
        match cli.command {
            Commands::Rollback {
                target,
                force,
                only,
                fake,
                ..
            } => {
                assert_eq!(target.as_deref(), Some("20240101000000"));
                assert!(force && only && !fake);
            }
            _ => panic!("expected rollback"),
        }
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        assert!(Cli::try_parse_from(["tidemark", "rollback", "--only"]).is_err());
        assert!(Cli::try_parse_from(["tidemark", "breakpoint", "--set", "--unset"]).is_err());
        assert!(Cli::try_parse_from(["tidemark", "migrate", "-t", "1", "-d", "2024"]).is_err());
    }

    #[test]
    fn test_status_format() {
        let cli = Cli::try_parse_from(["tidemark", "status", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status {
                format: OutputFormat::Json
            }
        ));
    }
}
