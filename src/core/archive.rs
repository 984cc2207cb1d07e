use crate::error::{AppError, Result};
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};
use tar::Archive;

/// Expands `.tar.gz` sources so their contents can be classified
/// individually.
pub struct TarGzHandler;

impl TarGzHandler {
    pub fn supported(file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        lower.ends_with(".tar.gz") || lower.ends_with(".tgz")
    }

    /// Unpack the archive under `destination`, returning the relative paths
    /// of the extracted regular files in archive order. Entries that would
    /// escape the destination are rejected by the tar crate's `unpack_in`.
    pub async fn extract_to(&self, archive_path: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| AppError::ArchiveError {
                path: archive_path.display().to_string(),
                message: format!("Failed to create extraction dir: {}", e),
            })?;

        let file = std::fs::File::open(archive_path).map_err(|e| AppError::SourceRead {
            path: archive_path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut archive = Archive::new(GzDecoder::new(file));
        let mut extracted = Vec::new();

        let entries = archive.entries().map_err(|e| AppError::ArchiveError {
            path: archive_path.display().to_string(),
            message: format!("Failed to read archive entries: {}", e),
        })?;

        for entry in entries {
            let mut entry = entry.map_err(|e| AppError::ArchiveError {
                path: archive_path.display().to_string(),
                message: format!("Corrupt archive entry: {}", e),
            })?;

            let is_file = entry.header().entry_type().is_file();
            let rel_path = entry
                .path()
                .map_err(|e| AppError::ArchiveError {
                    path: archive_path.display().to_string(),
                    message: format!("Invalid entry path: {}", e),
                })?
                .into_owned();

            let unpacked = entry
                .unpack_in(destination)
                .map_err(|e| AppError::ArchiveError {
                    path: archive_path.display().to_string(),
                    message: format!("Failed to unpack {}: {}", rel_path.display(), e),
                })?;

            if !unpacked {
                tracing::warn!(
                    "Skipped archive entry escaping the extraction dir: {}",
                    rel_path.display()
                );
                continue;
            }

            if is_file {
                extracted.push(rel_path);
            }
        }

        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;

    fn build_archive(path: &Path, files: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn supported_matches_tar_gz_and_tgz() {
        assert!(TarGzHandler::supported("wp-vm1.tar.gz"));
        assert!(TarGzHandler::supported("bundle.TGZ"));
        assert!(!TarGzHandler::supported("data.zip"));
        assert!(!TarGzHandler::supported("notes.txt"));
    }

    #[tokio::test]
    async fn extract_unpacks_files_and_lists_them() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("bundle.tar.gz");
        build_archive(
            &archive_path,
            &[("run1.json", "{}"), ("inner/run2.json", "{}")],
        );

        let out = dir.path().join("out");
        let extracted = TarGzHandler.extract_to(&archive_path, &out).await.unwrap();

        assert_eq!(
            extracted,
            vec![PathBuf::from("run1.json"), PathBuf::from("inner/run2.json")]
        );
        assert!(out.join("run1.json").exists());
        assert!(out.join("inner/run2.json").exists());
    }

    #[tokio::test]
    async fn missing_archive_reports_source_read_error() {
        let dir = tempdir().unwrap();
        let err = TarGzHandler
            .extract_to(&dir.path().join("absent.tar.gz"), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "SOURCE_READ_ERROR");
    }
}
