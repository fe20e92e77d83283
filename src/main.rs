//! boardlink - automatic board and port selection
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use boardlink::HeadlessOptions;
use boardlink_app::config::init_boardlink_directory;

/// boardlink - automatic board and port selection
#[derive(Parser, Debug)]
#[command(name = "boardlink")]
#[command(about = "Automatic board and port selection for sketches", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario file and print selection events as NDJSON
    Replay {
        /// Scenario JSON file
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Follow feed files in a directory; scenario steps are read from stdin
    Watch {
        /// Directory holding ports.json, iot.json and sketch.json
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Create `.boardlink/config.toml` with default settings
    Init {
        /// Project directory
        #[arg(long, value_name = "PATH", default_value = ".")]
        project: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Project directory holding `.boardlink/config.toml`
    #[arg(long, value_name = "PATH", default_value = ".")]
    project: PathBuf,

    /// Settings file to use instead of the project's
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Board catalog JSON
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,
}

impl From<CommonArgs> for HeadlessOptions {
    fn from(args: CommonArgs) -> Self {
        Self {
            project: args.project,
            config: args.config,
            catalog: args.catalog,
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    if let Err(e) = boardlink_core::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let args = Args::parse();

    match args.command {
        Command::Replay { scenario, common } => {
            boardlink::run_replay(&scenario, &common.into()).await?;
        }
        Command::Watch { dir, common } => {
            boardlink::run_watch(&dir, &common.into()).await?;
        }
        Command::Init { project } => {
            init_boardlink_directory(&project)?;
            eprintln!("Initialized {}", project.join(".boardlink").display());
        }
    }

    Ok(())
}
