//! Whole-file line-oriented access to the daemon configuration file.

use std::fs;
use std::path::{Path, PathBuf};

/// Handle on the daemon configuration file (wg0.conf). No semantic parsing;
/// callers get an ordered line vector and write one back.
#[derive(Debug, Clone)]
pub struct ConfStore {
    path: PathBuf,
}

impl ConfStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file as lines. Missing file is `NotFound`, not an empty vector.
    pub fn read(&self) -> Result<Vec<String>, ConfError> {
        if !self.path.exists() {
            return Err(ConfError::NotFound(self.path.clone()));
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(text.lines().map(str::to_owned).collect())
    }

    /// Replace the file with `lines`, trimming trailing blank lines down to a
    /// single final newline. Whole-file write; either it lands or the old
    /// content stays.
    pub fn write(&self, lines: &[String]) -> Result<(), ConfError> {
        let joined = lines.join("\n");
        let content = format!("{}\n", joined.trim_end());
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
