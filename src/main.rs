/// restructure - turns raw VM/SUT benchmark output folders into a
/// predictable <identifier>/<category> hierarchy
use clap::{Parser, Subcommand};
use restructure::cli::{CliApp, CliCommand};
use restructure::{ConflictPolicy, TransferMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "restructure")]
#[command(about = "Reorganize raw benchmark data folders by VM/SUT and category", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify and place every file from the source tree
    Run {
        /// Source root directory (raw, unstructured data)
        source: PathBuf,

        /// Destination root directory
        dest: PathBuf,

        /// Copy (default) or move files
        #[arg(long)]
        mode: Option<TransferMode>,

        /// What to do when the target file already exists: skip, overwrite
        /// or rename (default rename)
        #[arg(long)]
        conflict_policy: Option<ConflictPolicy>,

        /// Nest the output under a fresh session (UUID) folder
        #[arg(long)]
        session_folder: bool,

        /// Expand .tar.gz sources and classify their contents
        #[arg(long)]
        extract_archives: bool,
    },

    /// Show where every file would go, without touching the filesystem
    Plan {
        /// Source root directory
        source: PathBuf,

        /// Destination root directory
        dest: PathBuf,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Where to write the configuration
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app = match CliApp::new(cli.config.as_deref()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    let command = match cli.command {
        Commands::Run {
            source,
            dest,
            mode,
            conflict_policy,
            session_folder,
            extract_archives,
        } => CliCommand::Run {
            source,
            dest,
            mode,
            conflict_policy,
            session_folder,
            extract_archives,
        },
        Commands::Plan { source, dest } => CliCommand::Plan { source, dest },
        Commands::InitConfig { path } => CliCommand::InitConfig { path },
    };

    if let Err(e) = app.execute(command).await {
        eprintln!("Command failed: {}", e);
        std::process::exit(1);
    }
}
