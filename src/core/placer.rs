use crate::config::{ConflictPolicy, TransferMode};
use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};

/// How a single file ended up at the destination
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Placed(PathBuf),
    Renamed(PathBuf),
    Overwritten(PathBuf),
    SkippedExisting(PathBuf),
}

impl Placement {
    pub fn target(&self) -> &Path {
        match self {
            Self::Placed(p) | Self::Renamed(p) | Self::Overwritten(p) | Self::SkippedExisting(p) => {
                p
            }
        }
    }
}

/// Executes the copy/move of one file into its target directory.
///
/// Destination writes are staged: the payload lands in a temporary sibling
/// first and is renamed into place, so a failure mid-copy never leaves a
/// partial file in the tree. In move mode a plain rename is attempted
/// first; the staged copy is the cross-device fallback.
pub struct Placer {
    mode: TransferMode,
    conflict_policy: ConflictPolicy,
}

impl Placer {
    pub fn new(mode: TransferMode, conflict_policy: ConflictPolicy) -> Self {
        Self {
            mode,
            conflict_policy,
        }
    }

    pub async fn place(
        &self,
        source: &Path,
        target_dir: &Path,
        file_name: &str,
    ) -> Result<Placement> {
        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|e| dest_error(target_dir, e))?;

        let preferred = target_dir.join(file_name);
        let exists = tokio::fs::try_exists(&preferred)
            .await
            .map_err(|e| dest_error(&preferred, e))?;

        let (target, overwritten) = if exists {
            match self.conflict_policy {
                ConflictPolicy::Skip => return Ok(Placement::SkippedExisting(preferred)),
                ConflictPolicy::Overwrite => (preferred, true),
                ConflictPolicy::Rename => (
                    self.next_free_name(target_dir, file_name).await?,
                    false,
                ),
            }
        } else {
            (preferred, false)
        };

        let renamed = target.file_name().and_then(|n| n.to_str()) != Some(file_name);

        self.transfer(source, target_dir, &target).await?;

        if overwritten {
            Ok(Placement::Overwritten(target))
        } else if renamed {
            Ok(Placement::Renamed(target))
        } else {
            Ok(Placement::Placed(target))
        }
    }

    async fn transfer(&self, source: &Path, target_dir: &Path, target: &Path) -> Result<()> {
        if self.mode == TransferMode::Move {
            // Same-filesystem fast path; already atomic
            if tokio::fs::rename(source, target).await.is_ok() {
                return Ok(());
            }
        }

        self.staged_copy(source, target_dir, target).await?;

        if self.mode == TransferMode::Move {
            if let Err(e) = tokio::fs::remove_file(source).await {
                tracing::warn!(
                    "Placed {} but failed to remove moved source {}: {}",
                    target.display(),
                    source.display(),
                    e
                );
            }
        }

        Ok(())
    }

    async fn staged_copy(&self, source: &Path, target_dir: &Path, target: &Path) -> Result<()> {
        // Confirm the source is readable before touching the destination,
        // so read failures and write failures stay distinguishable
        drop(
            tokio::fs::File::open(source)
                .await
                .map_err(|e| AppError::SourceRead {
                    path: source.display().to_string(),
                    message: e.to_string(),
                })?,
        );

        let target_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("payload");
        let staging = target_dir.join(format!(".{}.restructure-tmp", target_name));

        if let Err(e) = tokio::fs::copy(source, &staging).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(dest_error(&staging, e));
        }

        if let Err(e) = tokio::fs::rename(&staging, target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(dest_error(target, e));
        }

        Ok(())
    }

    /// `file.txt` -> `file_1.txt`, `file_2.txt`, ... first free slot wins
    async fn next_free_name(&self, target_dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let mut counter = 1usize;
        loop {
            let candidate = target_dir.join(format!("{}_{}{}", stem, counter, suffix));
            let exists = tokio::fs::try_exists(&candidate)
                .await
                .map_err(|e| dest_error(&candidate, e))?;
            if !exists {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

fn dest_error(path: &Path, e: std::io::Error) -> AppError {
    AppError::DestinationWrite {
        path: path.display().to_string(),
        kind: e.kind(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn write(path: &Path, content: &str) {
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn copy_mode_places_file_and_keeps_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src/app.log");
        let target_dir = dir.path().join("dest/VM1/Logs");
        write(&source, "hello").await;

        let placer = Placer::new(TransferMode::Copy, ConflictPolicy::Rename);
        let placement = placer.place(&source, &target_dir, "app.log").await.unwrap();

        assert_eq!(placement, Placement::Placed(target_dir.join("app.log")));
        assert_eq!(
            tokio::fs::read_to_string(target_dir.join("app.log")).await.unwrap(),
            "hello"
        );
        assert!(source.exists());
    }

    #[tokio::test]
    async fn move_mode_removes_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src/app.log");
        let target_dir = dir.path().join("dest/Logs");
        write(&source, "hello").await;

        let placer = Placer::new(TransferMode::Move, ConflictPolicy::Rename);
        let placement = placer.place(&source, &target_dir, "app.log").await.unwrap();

        assert!(placement.target().exists());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn rename_policy_suffixes_deterministically() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a/file.txt");
        let second = dir.path().join("b/file.txt");
        let third = dir.path().join("c/file.txt");
        let target_dir = dir.path().join("dest");
        write(&first, "one").await;
        write(&second, "two").await;
        write(&third, "three").await;

        let placer = Placer::new(TransferMode::Copy, ConflictPolicy::Rename);
        placer.place(&first, &target_dir, "file.txt").await.unwrap();
        let p2 = placer.place(&second, &target_dir, "file.txt").await.unwrap();
        let p3 = placer.place(&third, &target_dir, "file.txt").await.unwrap();

        assert_eq!(p2, Placement::Renamed(target_dir.join("file_1.txt")));
        assert_eq!(p3, Placement::Renamed(target_dir.join("file_2.txt")));
        assert_eq!(
            tokio::fs::read_to_string(target_dir.join("file_1.txt")).await.unwrap(),
            "two"
        );
    }

    #[tokio::test]
    async fn skip_policy_leaves_existing_file_untouched() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src/file.txt");
        let target_dir = dir.path().join("dest");
        write(&source, "new").await;
        write(&target_dir.join("file.txt"), "old").await;

        let placer = Placer::new(TransferMode::Copy, ConflictPolicy::Skip);
        let placement = placer.place(&source, &target_dir, "file.txt").await.unwrap();

        assert_eq!(placement, Placement::SkippedExisting(target_dir.join("file.txt")));
        assert_eq!(
            tokio::fs::read_to_string(target_dir.join("file.txt")).await.unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn overwrite_policy_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src/file.txt");
        let target_dir = dir.path().join("dest");
        write(&source, "new").await;
        write(&target_dir.join("file.txt"), "old").await;

        let placer = Placer::new(TransferMode::Copy, ConflictPolicy::Overwrite);
        let placement = placer.place(&source, &target_dir, "file.txt").await.unwrap();

        assert_eq!(placement, Placement::Overwritten(target_dir.join("file.txt")));
        assert_eq!(
            tokio::fs::read_to_string(target_dir.join("file.txt")).await.unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn no_staging_files_remain_after_placement() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src/data.csv");
        let target_dir = dir.path().join("dest");
        write(&source, "a,b").await;

        let placer = Placer::new(TransferMode::Copy, ConflictPolicy::Rename);
        placer.place(&source, &target_dir, "data.csv").await.unwrap();

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&target_dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["data.csv".to_string()]);
    }

    #[tokio::test]
    async fn missing_source_reports_source_read_error() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src/vanished.txt");
        let target_dir = dir.path().join("dest");
        tokio::fs::create_dir_all(source.parent().unwrap()).await.unwrap();

        let placer = Placer::new(TransferMode::Copy, ConflictPolicy::Rename);
        let err = placer
            .place(&source, &target_dir, "vanished.txt")
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), "SOURCE_READ_ERROR");
    }
}
