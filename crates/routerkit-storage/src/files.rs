//! Program file store
//!
//! Uploaded toolpath programs live as-is in one content directory.
//! Filenames are reduced to their basename on save so an upload can never
//! escape the directory.

use chrono::{DateTime, Utc};
use routerkit_core::{Error, FileInfo, Result};
use std::path::{Path, PathBuf};

/// Program file extensions the store recognizes
const PROGRAM_EXTENSIONS: [&str; 2] = ["gcode", "nc"];

/// Directory of stored toolpath programs
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The store's root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List stored programs sorted by name
    pub fn list_files(&self) -> Result<Vec<FileInfo>> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            tracing::warn!("failed to read {}: {}", self.root.display(), e);
            Error::Io(e)
        })?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let is_program = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| PROGRAM_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if !is_program || !path.is_file() {
                continue;
            }
            files.push(file_info(&path)?);
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Store an upload under its basename, overwriting any previous version
    pub fn save_file(&self, filename: &str, data: &[u8]) -> Result<FileInfo> {
        let name = basename(filename)?;
        let target = self.root.join(&name);
        std::fs::write(&target, data).map_err(|e| {
            tracing::warn!("failed to store {}: {}", name, e);
            Error::Io(e)
        })?;
        file_info(&target)
    }

    /// Delete a stored program
    pub fn delete(&self, filename: &str) -> Result<()> {
        let path = self.path_for(filename);
        if !path.exists() {
            return Err(Error::not_found("file", filename));
        }
        std::fs::remove_file(path).map_err(|e| {
            tracing::warn!("failed to delete {}: {}", filename, e);
            Error::Io(e)
        })?;
        Ok(())
    }

    /// Absolute path of a stored program (whether or not it exists)
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// True if the program exists
    pub fn exists(&self, filename: &str) -> bool {
        self.path_for(filename).is_file()
    }

    /// Read a program's text, lossy on invalid UTF-8
    pub fn read_text(&self, filename: &str) -> Result<String> {
        let path = self.path_for(filename);
        if !path.exists() {
            return Err(Error::not_found("file", filename));
        }
        let bytes = std::fs::read(path).map_err(|e| {
            tracing::warn!("failed to read {}: {}", filename, e);
            Error::Io(e)
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Count physical lines of a program
    pub fn line_count(&self, filename: &str) -> Result<u64> {
        Ok(self.read_text(filename)?.lines().count() as u64)
    }
}

/// Reduce an upload filename to a safe basename
fn basename(filename: &str) -> Result<String> {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_argument(format!("unusable filename: {:?}", filename)))
}

/// Stat one stored file into its listing entry
fn file_info(path: &Path) -> Result<FileInfo> {
    let meta = std::fs::metadata(path)?;
    let mtime: DateTime<Utc> = meta.modified()?.into();
    Ok(FileInfo {
        name: path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string(),
        size: meta.len(),
        mtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("gcode")).unwrap();
        (dir, store)
    }

    #[test]
    fn save_and_list_round_trip() {
        let (_dir, store) = store();
        store.save_file("b.gcode", b"G0 X1\n").unwrap();
        store.save_file("a.nc", b"G0 X2\n").unwrap();
        store.save_file("notes.txt", b"ignored").unwrap();

        let names: Vec<String> = store
            .list_files()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["a.nc", "b.gcode"]);
    }

    #[test]
    fn save_strips_directory_components() {
        let (_dir, store) = store();
        let info = store.save_file("../../etc/passwd.gcode", b"G0\n").unwrap();
        assert_eq!(info.name, "passwd.gcode");
        assert!(store.exists("passwd.gcode"));
        assert!(!store.root().join("../../etc/passwd.gcode").exists());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(store.delete("ghost.gcode").unwrap_err().is_not_found());

        store.save_file("real.gcode", b"G0\n").unwrap();
        store.delete("real.gcode").unwrap();
        assert!(!store.exists("real.gcode"));
    }

    #[test]
    fn line_count_counts_physical_lines() {
        let (_dir, store) = store();
        store
            .save_file("part.gcode", b"G90\nG0 X10 Y0\n")
            .unwrap();
        assert_eq!(store.line_count("part.gcode").unwrap(), 2);
        assert!(store.line_count("missing.gcode").unwrap_err().is_not_found());
    }
}
