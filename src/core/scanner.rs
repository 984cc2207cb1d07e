use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file found under the source root
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Full path to the file
    pub path: PathBuf,
    /// Path relative to the scan root; identifier extraction runs on this
    pub rel_path: PathBuf,
    pub file_name: String,
}

/// A path the scanner could not read
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub entries: Vec<SourceEntry>,
    pub failures: Vec<ScanFailure>,
}

/// Enumerates regular files under `root` depth-first with siblings in
/// lexicographic order, so repeated runs over the same tree visit files in
/// the same order. Symlinks are followed; dangling links and unreadable
/// directories are reported, not fatal. An optional `exclude` subtree (the
/// destination, when nested inside the source) is skipped entirely.
pub fn scan(root: &Path, max_depth: usize, exclude: Option<&Path>) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match exclude {
            Some(excluded) => entry.path() != excluded,
            None => true,
        });

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                outcome.failures.push(ScanFailure {
                    path,
                    message: e.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path().to_path_buf();
        let rel_path = match path.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => path.clone(),
        };
        let file_name = entry.file_name().to_string_lossy().to_string();

        outcome.entries.push(SourceEntry {
            path,
            rel_path,
            file_name,
        });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn scan_visits_files_in_stable_lexicographic_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.txt"));
        touch(&root.join("a/z.txt"));
        touch(&root.join("a/y.txt"));
        touch(&root.join("c/inner/d.txt"));

        let first = scan(root, 32, None);
        let second = scan(root, 32, None);

        let order: Vec<_> = first
            .entries
            .iter()
            .map(|e| e.rel_path.clone())
            .collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("a/y.txt"),
                PathBuf::from("a/z.txt"),
                PathBuf::from("b.txt"),
                PathBuf::from("c/inner/d.txt"),
            ]
        );

        let again: Vec<_> = second
            .entries
            .iter()
            .map(|e| e.rel_path.clone())
            .collect();
        assert_eq!(order, again);
        assert!(first.failures.is_empty());
    }

    #[test]
    fn scan_skips_excluded_subtree() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("keep.txt"));
        touch(&root.join("dest/placed.txt"));

        let outcome = scan(root, 32, Some(&root.join("dest")));
        let names: Vec<_> = outcome.entries.iter().map(|e| e.file_name.clone()).collect();
        assert_eq!(names, vec!["keep.txt".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_reported_as_failure() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("ok.txt"));
        std::os::unix::fs::symlink(root.join("gone.txt"), root.join("broken.txt")).unwrap();

        let outcome = scan(root, 32, None);
        let names: Vec<_> = outcome.entries.iter().map(|e| e.file_name.clone()).collect();
        assert_eq!(names, vec!["ok.txt".to_string()]);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].path.ends_with("broken.txt"));
    }

    #[test]
    fn scan_respects_max_depth() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("top.txt"));
        touch(&root.join("a/b/deep.txt"));

        let outcome = scan(root, 1, None);
        let names: Vec<_> = outcome.entries.iter().map(|e| e.file_name.clone()).collect();
        assert_eq!(names, vec!["top.txt".to_string()]);
    }
}
