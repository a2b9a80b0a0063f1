use std::fs;
use std::path::Path;

use crate::error::CodegenResult;

/// Writes generated files, leaving unchanged ones untouched so that build
/// scripts do not trigger needless recompilation
pub struct CodeWriter;

impl CodeWriter {
    pub fn new() -> Self {
        Self
    }

    /// Returns whether the file was (re)written
    pub fn write_if_changed(&self, path: &Path, content: &str) -> CodegenResult<bool> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if path.exists() {
            let existing = fs::read_to_string(path)?;
            if existing == content {
                tracing::debug!(path = %path.display(), "generated file unchanged");
                return Ok(false);
            }
        }

        fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "wrote generated file");
        Ok(true)
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}
