use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "notional-deploy")]
#[command(
    about = "Deploy capped capital across a symbol list with protective OCO exits",
    long_about = None
)]
struct Cli {
    /// Config file path (TOML); defaults apply when it does not exist
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read symbols from a local file instead of Google Sheets
    #[arg(long, global = true)]
    symbols_file: Option<PathBuf>,

    /// Append per-symbol outcomes to this file (with --symbols-file)
    #[arg(long, global = true, requires = "symbols_file")]
    outcome_log: Option<PathBuf>,

    /// Log to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Buy every listed symbol, place exits, clear the list on success (default)
    Run,
    /// Show the budget plan for the current list without submitting anything
    Plan,
    /// Validate credentials and show account status
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let options = commands::SourceOptions {
        config: cli.config,
        symbols_file: cli.symbols_file,
        outcome_log: cli.outcome_log,
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run_deploy(&options).await?,
        Commands::Plan => commands::run_plan(&options).await?,
        Commands::Check => commands::run_check(&options).await?,
    }

    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_is_the_default() {
        let cli = Cli::try_parse_from(["notional-deploy"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "notional-deploy",
            "plan",
            "--symbols-file",
            "symbols.txt",
            "--config",
            "deploy.toml",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Plan));
        assert_eq!(cli.symbols_file, Some(PathBuf::from("symbols.txt")));
        assert_eq!(cli.config, Some(PathBuf::from("deploy.toml")));
    }

    #[test]
    fn outcome_log_needs_symbols_file() {
        assert!(Cli::try_parse_from(["notional-deploy", "--outcome-log", "out.tsv"]).is_err());
        assert!(Cli::try_parse_from([
            "notional-deploy",
            "--symbols-file",
            "s.txt",
            "--outcome-log",
            "out.tsv"
        ])
        .is_ok());
    }
}
