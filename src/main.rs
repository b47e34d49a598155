use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use etfc::cli::compare::{CompareOptions, SortOrder};
use etfc::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compare the holdings of two funds
    Compare {
        /// First fund ticker, e.g. SPY
        first: String,
        /// Second fund ticker, e.g. VOOG
        second: String,
        /// Row ordering
        #[arg(short, long, value_enum, default_value_t = SortOrder::First)]
        sort: SortOrder,
        /// Only show holdings present in both funds
        #[arg(short, long)]
        overlap_only: bool,
        /// Ignore cached holdings and fetch them again
        #[arg(short, long)]
        refresh: bool,
    },
    /// Delete all cached holdings
    ClearCache,
}

impl From<Commands> for etfc::AppCommand {
    fn from(cmd: Commands) -> etfc::AppCommand {
        match cmd {
            Commands::Compare {
                first,
                second,
                sort,
                overlap_only,
                refresh,
            } => etfc::AppCommand::Compare(CompareOptions {
                first,
                second,
                sort,
                overlap_only,
                refresh,
            }),
            Commands::ClearCache => etfc::AppCommand::ClearCache,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => etfc::cli::setup::setup(),
        Some(cmd) => etfc::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
