use crate::config::{Config, TransferMode};
use crate::core::archive::TarGzHandler;
use crate::core::classifier::{Classifier, UNASSIGNED, UNCLASSIFIED};
use crate::core::ledger::{Ledger, Outcome};
use crate::core::placer::{Placement, Placer};
use crate::core::scanner::{self, SourceEntry};
use crate::error::{AppError, Result};
use crate::utils::paths::sanitize_filename;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug)]
pub struct RunSummary {
    pub output_root: PathBuf,
    pub scanned: usize,
    pub placed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One row of `plan` output: where a file would go, with no filesystem
/// mutation and no conflict resolution applied.
#[derive(Debug, Clone)]
pub struct PlannedAssignment {
    pub source_path: PathBuf,
    pub identifier: String,
    pub category: String,
    pub target_path: PathBuf,
}

/// Sequential classify-and-place pipeline.
///
/// Files are processed one at a time in scan order, so the destination tree
/// and the transparency log come out in the same order on every run over
/// the same input. Per-file errors are recorded and contained; only
/// consecutive destination-write failures of the same kind escalate to a
/// fatal abort, with the log flushed up to that point.
pub struct Pipeline {
    config: Config,
    classifier: Classifier,
    placer: Placer,
}

struct FailureTracker {
    threshold: usize,
    consecutive: usize,
    last_kind: Option<std::io::ErrorKind>,
}

impl FailureTracker {
    fn new(threshold: usize) -> Self {
        Self {
            threshold,
            consecutive: 0,
            last_kind: None,
        }
    }

    fn success(&mut self) {
        self.consecutive = 0;
        self.last_kind = None;
    }

    /// Returns the fatal error once the same write failure has recurred
    /// past the threshold.
    fn write_failure(&mut self, kind: std::io::ErrorKind, message: &str) -> Option<AppError> {
        if self.last_kind == Some(kind) {
            self.consecutive += 1;
        } else {
            self.consecutive = 1;
            self.last_kind = Some(kind);
        }

        if self.consecutive >= self.threshold {
            Some(AppError::FatalAbort {
                message: format!(
                    "{} consecutive destination write failures ({}): {}",
                    self.consecutive, kind, message
                ),
            })
        } else {
            None
        }
    }
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let classifier = Classifier::new(&config)?;
        let placer = Placer::new(config.mode, config.conflict_policy);
        Ok(Self {
            config,
            classifier,
            placer,
        })
    }

    /// Classify every file under `source_root` and place it under
    /// `dest_root`, flushing the transparency log at the end of the run
    /// (fatal aborts included).
    pub async fn run(&self, source_root: &Path, dest_root: &Path) -> Result<RunSummary> {
        let source_root = check_source_root(source_root)?;

        let output_root = if self.config.session_folder {
            dest_root.join(uuid::Uuid::new_v4().to_string())
        } else {
            dest_root.to_path_buf()
        };

        // Never re-ingest our own output when the destination nests inside
        // the source tree
        let exclude = dest_root.starts_with(&source_root).then_some(dest_root);

        let scan = scanner::scan(&source_root, self.config.max_scan_depth, exclude);
        info!(
            "Scanned {} files under {} ({} unreadable)",
            scan.entries.len(),
            source_root.display(),
            scan.failures.len()
        );

        let mut ledger = Ledger::new();
        let mut tracker = FailureTracker::new(self.config.fatal_write_threshold);
        let mut summary = RunSummary {
            output_root: output_root.clone(),
            scanned: scan.entries.len() + scan.failures.len(),
            placed: 0,
            skipped: 0,
            failed: 0,
        };

        for failure in &scan.failures {
            warn!("Unreadable during scan: {}: {}", failure.path.display(), failure.message);
            ledger.record(
                &failure.path,
                UNASSIGNED,
                UNCLASSIFIED,
                None,
                Outcome::SourceReadError,
                Some(failure.message.clone()),
            );
            summary.failed += 1;
        }

        let mut fatal: Option<AppError> = None;

        for entry in &scan.entries {
            let result = if self.config.extract_archives && TarGzHandler::supported(&entry.file_name)
            {
                self.process_archive(entry, &output_root, &mut ledger, &mut tracker, &mut summary)
                    .await
            } else {
                self.process_entry(entry, &output_root, &mut ledger, &mut tracker, &mut summary)
                    .await
            };

            if let Err(e) = result {
                fatal = Some(e);
                break;
            }
        }

        let log_path = output_root.join(&self.config.log_file_name);
        if let Err(flush_err) = ledger.flush(&log_path).await {
            warn!("Failed to flush transparency log: {}", flush_err);
            if fatal.is_none() {
                return Err(flush_err);
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => {
                info!(
                    "Run complete: {} placed, {} skipped, {} failed",
                    summary.placed, summary.skipped, summary.failed
                );
                Ok(summary)
            }
        }
    }

    /// Classification-only pass for `plan`; prints nothing, mutates nothing.
    pub fn plan(&self, source_root: &Path, dest_root: &Path) -> Result<Vec<PlannedAssignment>> {
        let source_root = check_source_root(source_root)?;
        let exclude = dest_root.starts_with(&source_root).then_some(dest_root);
        let scan = scanner::scan(&source_root, self.config.max_scan_depth, exclude);

        let mut planned = Vec::with_capacity(scan.entries.len());
        for entry in &scan.entries {
            let decision = self.classifier.classify(&entry.rel_path);
            let (identifier, category) = safe_buckets(&decision.identifier, &decision.category);
            planned.push(PlannedAssignment {
                source_path: entry.path.clone(),
                target_path: dest_root
                    .join(&identifier)
                    .join(&category)
                    .join(&entry.file_name),
                identifier,
                category,
            });
        }

        Ok(planned)
    }

    async fn process_entry(
        &self,
        entry: &SourceEntry,
        output_root: &Path,
        ledger: &mut Ledger,
        tracker: &mut FailureTracker,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let decision = self.classifier.classify(&entry.rel_path);
        let (identifier, category) = safe_buckets(&decision.identifier, &decision.category);
        let target_dir = output_root.join(&identifier).join(&category);

        match self
            .placer
            .place(&entry.path, &target_dir, &entry.file_name)
            .await
        {
            Ok(placement) => {
                tracker.success();
                let outcome = self.placement_outcome(&placement);
                if outcome == Outcome::Skipped {
                    summary.skipped += 1;
                } else {
                    summary.placed += 1;
                }
                ledger.record(
                    &entry.path,
                    &identifier,
                    &category,
                    Some(placement.target()),
                    outcome,
                    None,
                );
                Ok(())
            }
            Err(e) => self.contain_failure(e, &entry.path, &identifier, &category, ledger, tracker, summary),
        }
    }

    /// Expand a tar.gz source and place its contents, each under the
    /// archive's identifier with its own filename classified.
    async fn process_archive(
        &self,
        entry: &SourceEntry,
        output_root: &Path,
        ledger: &mut Ledger,
        tracker: &mut FailureTracker,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let identifier_raw = self.classifier.identifier_for(&entry.rel_path);
        let (identifier, _) = safe_buckets(&identifier_raw, UNCLASSIFIED);

        let staging = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return self.contain_failure(
                    AppError::ArchiveError {
                        path: entry.path.display().to_string(),
                        message: format!("Failed to create staging dir: {}", e),
                    },
                    &entry.path,
                    &identifier,
                    UNCLASSIFIED,
                    ledger,
                    tracker,
                    summary,
                )
            }
        };

        let extracted = match TarGzHandler.extract_to(&entry.path, staging.path()).await {
            Ok(files) => files,
            Err(e) => {
                return self.contain_failure(
                    e,
                    &entry.path,
                    &identifier,
                    UNCLASSIFIED,
                    ledger,
                    tracker,
                    summary,
                )
            }
        };

        // Contents are always copied out of the staging dir; move semantics
        // apply to the archive itself below
        let inner_placer = Placer::new(TransferMode::Copy, self.config.conflict_policy);
        let mut placed_from_archive = 0usize;

        for rel in &extracted {
            let file_name = rel
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let category_raw = self.classifier.category_for(&file_name, rel);
            let (_, category) = safe_buckets(UNASSIGNED, &category_raw);
            let target_dir = output_root.join(&identifier).join(&category);
            let inner_source = format!("{}!{}", entry.path.display(), rel.display());

            match inner_placer
                .place(&staging.path().join(rel), &target_dir, &file_name)
                .await
            {
                Ok(placement) => {
                    tracker.success();
                    let outcome = match &placement {
                        Placement::SkippedExisting(_) => Outcome::Skipped,
                        Placement::Renamed(_) => Outcome::Renamed,
                        Placement::Overwritten(_) => Outcome::Overwritten,
                        Placement::Placed(_) => Outcome::Copied,
                    };
                    if outcome == Outcome::Skipped {
                        summary.skipped += 1;
                    } else {
                        summary.placed += 1;
                    }
                    ledger.record(
                        Path::new(&inner_source),
                        &identifier,
                        &category,
                        Some(placement.target()),
                        outcome,
                        None,
                    );
                }
                Err(e) => {
                    self.contain_failure(
                        e,
                        Path::new(&inner_source),
                        &identifier,
                        &category,
                        ledger,
                        tracker,
                        summary,
                    )?;
                    continue;
                }
            }
            placed_from_archive += 1;
        }

        ledger.record(
            &entry.path,
            &identifier,
            UNCLASSIFIED,
            None,
            Outcome::Expanded,
            Some(format!("{} files extracted", extracted.len())),
        );

        if self.config.mode == TransferMode::Move && placed_from_archive == extracted.len() {
            if let Err(e) = tokio::fs::remove_file(&entry.path).await {
                warn!(
                    "Expanded {} but failed to remove it: {}",
                    entry.path.display(),
                    e
                );
            }
        }

        Ok(())
    }

    /// Record a per-file error and keep going, unless the destination-write
    /// threshold tips the run into a fatal abort.
    #[allow(clippy::too_many_arguments)]
    fn contain_failure(
        &self,
        error: AppError,
        source: &Path,
        identifier: &str,
        category: &str,
        ledger: &mut Ledger,
        tracker: &mut FailureTracker,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if !error.is_recoverable() {
            return Err(error);
        }

        summary.failed += 1;

        match &error {
            AppError::DestinationWrite { kind, message, .. } => {
                warn!("{}", error);
                ledger.record(
                    source,
                    identifier,
                    category,
                    None,
                    Outcome::DestWriteError,
                    Some(message.clone()),
                );
                if let Some(fatal) = tracker.write_failure(*kind, message) {
                    return Err(fatal);
                }
            }
            AppError::SourceRead { message, .. } | AppError::ArchiveError { message, .. } => {
                warn!("{}", error);
                tracker.success();
                ledger.record(
                    source,
                    identifier,
                    category,
                    None,
                    Outcome::SourceReadError,
                    Some(message.clone()),
                );
            }
            _ => return Err(error),
        }

        Ok(())
    }

    fn placement_outcome(&self, placement: &Placement) -> Outcome {
        match placement {
            Placement::SkippedExisting(_) => Outcome::Skipped,
            Placement::Renamed(_) => Outcome::Renamed,
            Placement::Overwritten(_) => Outcome::Overwritten,
            Placement::Placed(_) => match self.config.mode {
                TransferMode::Copy => Outcome::Copied,
                TransferMode::Move => Outcome::Moved,
            },
        }
    }
}

fn check_source_root(source_root: &Path) -> Result<PathBuf> {
    if !source_root.is_dir() {
        return Err(AppError::InvalidPath {
            message: format!(
                "Source root {} does not exist or is not a directory",
                source_root.display()
            ),
        });
    }
    Ok(source_root.to_path_buf())
}

/// Identifier and category become path components; strip anything the
/// filesystem would reject and fall back to the default buckets if nothing
/// survives.
fn safe_buckets(identifier: &str, category: &str) -> (String, String) {
    let identifier = sanitize_filename(identifier);
    let category = sanitize_filename(category);
    (
        if identifier.is_empty() {
            UNASSIGNED.to_string()
        } else {
            identifier
        },
        if category.is_empty() {
            UNCLASSIFIED.to_string()
        } else {
            category
        },
    )
}
