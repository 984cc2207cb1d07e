/// Headless command layer: the clap binary parses arguments and hands a
/// `CliCommand` to `CliApp` for execution.
use crate::config::{Config, ConflictPolicy, TransferMode};
use crate::core::pipeline::Pipeline;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub enum CliCommand {
    Run {
        source: PathBuf,
        dest: PathBuf,
        mode: Option<TransferMode>,
        conflict_policy: Option<ConflictPolicy>,
        session_folder: bool,
        extract_archives: bool,
    },
    Plan {
        source: PathBuf,
        dest: PathBuf,
    },
    InitConfig {
        path: PathBuf,
    },
}

pub struct CliApp {
    config: Arc<RwLock<Config>>,
}

impl CliApp {
    /// Initialize the application: logging, then configuration (file if
    /// given, defaults otherwise; environment overrides apply to both).
    pub fn new(config_path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "restructure=info".into()),
            )
            .init();

        let config = match config_path {
            Some(path) => Config::load(path)?,
            None => Config::load_default()?,
        };

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: CliCommand) -> Result<(), Box<dyn std::error::Error>> {
        match command {
            CliCommand::Run {
                source,
                dest,
                mode,
                conflict_policy,
                session_folder,
                extract_archives,
            } => {
                info!(
                    "Restructuring {} into {}",
                    source.display(),
                    dest.display()
                );

                let mut config = self.config.read().clone();
                if let Some(mode) = mode {
                    config.mode = mode;
                }
                if let Some(policy) = conflict_policy {
                    config.conflict_policy = policy;
                }
                config.session_folder |= session_folder;
                config.extract_archives |= extract_archives;
                config.validate()?;

                let pipeline = Pipeline::new(config)?;
                let summary = pipeline.run(&source, &dest).await?;

                println!(
                    "✓ Placed {} files into {} ({} skipped, {} failed)",
                    summary.placed,
                    summary.output_root.display(),
                    summary.skipped,
                    summary.failed
                );
            }

            CliCommand::Plan { source, dest } => {
                info!("Planning restructure of {}", source.display());

                let config = self.config.read().clone();
                let pipeline = Pipeline::new(config)?;
                let planned = pipeline.plan(&source, &dest)?;

                for assignment in &planned {
                    println!(
                        "{} → {} ({}/{})",
                        assignment.source_path.display(),
                        assignment.target_path.display(),
                        assignment.identifier,
                        assignment.category
                    );
                }
                println!("\n{} files; run `restructure run` to apply", planned.len());
            }

            CliCommand::InitConfig { path } => {
                if path.exists() {
                    return Err(format!(
                        "Refusing to overwrite existing config at {}",
                        path.display()
                    )
                    .into());
                }

                let config = Config::default();
                config.save(&path)?;
                println!("✓ Wrote default configuration to {}", path.display());
            }
        }

        Ok(())
    }
}
