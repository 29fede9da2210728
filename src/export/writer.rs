//! Output writers.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Destination for exported files.
///
/// A write must be atomic: after it returns the file is either complete or
/// absent, never partially written.
pub trait OutputWriter: Send + Sync {
    /// Write `contents` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Check whether a file already exists at `path`.
    fn exists(&self, path: &Path) -> bool;
}

/// Writes to the local filesystem through a temporary file in the target directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWriter;

impl FsWriter {
    /// Create a new filesystem writer.
    pub fn new() -> Self {
        Self
    }
}

impl OutputWriter for FsWriter {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(contents)?;
        file.flush()?;
        file.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Keeps written files in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
    fail_on: Vec<String>,
}

impl MemoryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes to any path ending with `suffix`.
    pub fn with_failure(mut self, suffix: impl Into<String>) -> Self {
        self.fail_on.push(suffix.into());
        self
    }

    /// Pre-populate a file, as if written by an earlier run.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.lock().insert(path.into(), contents.into());
        self
    }

    /// Contents of a written file.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().get(path.as_ref()).cloned()
    }

    /// Contents of a written file as text.
    pub fn get_string(&self, path: impl AsRef<Path>) -> Option<String> {
        self.get(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Paths of all written files, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    /// Number of files held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        // A poisoned map is still consistent: inserts are single operations.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl OutputWriter for MemoryWriter {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let display = path.to_string_lossy();
        if self.fail_on.iter().any(|s| display.ends_with(s.as_str())) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("write rejected: {}", display),
            )));
        }
        self.lock().insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }
}
