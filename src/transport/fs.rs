use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::persist::DATA_FILE_EXTENSION;
use crate::errors::NoiseError;

/// A data file found under a scan root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataFileEntry {
    /// Full path.
    pub path: PathBuf,
    /// File name without directories.
    pub file_name: String,
    /// Size on disk.
    pub size_bytes: u64,
    /// Last modification time, when the platform reports it.
    pub modified: Option<DateTime<Utc>>,
}

/// Filesystem scanner for JSON data files under a root.
pub struct DataFileScanner {
    root: PathBuf,
    follow_links: bool,
    max_depth: Option<usize>,
}

impl DataFileScanner {
    /// Create a scanner rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
            max_depth: None,
        }
    }

    /// Configure symlink traversal.
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Limit recursion depth (`1` = only direct children of the root).
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// All `.json` files under the root, sorted by path.
    ///
    /// A missing root is an IO error; unreadable entries below it are skipped.
    pub fn scan(&self) -> Result<Vec<DataFileEntry>, NoiseError> {
        if !self.root.is_dir() {
            return Err(NoiseError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("data directory {} does not exist", self.root.display()),
            )));
        }
        let mut walker = WalkDir::new(&self.root);
        if self.follow_links {
            walker = walker.follow_links(true);
        }
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }
        let mut entries: Vec<DataFileEntry> = walker
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_json_file(entry.path()))
            .map(|entry| {
                let path = entry.path().to_path_buf();
                DataFileEntry {
                    file_name: entry.file_name().to_string_lossy().into_owned(),
                    size_bytes: entry.metadata().map(|meta| meta.len()).unwrap_or(0),
                    modified: file_mtime(&path),
                    path,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

/// True if the path has a `.json` extension (case-insensitive).
pub fn is_json_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DATA_FILE_EXTENSION))
        .unwrap_or(false)
}

/// Best-effort file modified time.
pub fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    Some(system_time_to_utc(modified))
}

fn system_time_to_utc(time: std::time::SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scan_finds_json_files_in_path_order() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("nested")).unwrap();
        for name in ["b.json", "a.JSON", "notes.txt", "nested/c.json"] {
            fs::write(root.join(name), b"[]").unwrap();
        }

        let entries = DataFileScanner::new(root).scan().unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.JSON", "b.json", "c.json"]);
        assert!(entries.iter().all(|e| e.size_bytes == 2));
        assert!(entries.iter().all(|e| e.modified.is_some()));

        let shallow = DataFileScanner::new(root).with_max_depth(1).scan().unwrap();
        assert_eq!(shallow.len(), 2);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let temp = tempdir().unwrap();
        let err = DataFileScanner::new(temp.path().join("absent"))
            .scan()
            .unwrap_err();
        assert!(matches!(err, NoiseError::Io(_)));
    }
}
