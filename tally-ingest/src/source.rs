//! In-memory view of a statement file handed to importers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Number of bytes exposed by [`SourceFile::head`]
const HEAD_BYTES: usize = 8192;

/// A statement file read fully into memory
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    contents: String,
}

impl SourceFile {
    /// Read a file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self::from_contents(path, contents))
    }

    /// Wrap contents already in memory under the given (possibly virtual) path.
    pub fn from_contents(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let contents = contents.into();
        // Strip a UTF-8 BOM so header checks compare against the first column name
        let contents = match contents.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => contents,
        };
        Self {
            path: path.into(),
            contents,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full path as a display string, used for entry metadata
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    /// Final path component, or "" when there is none
    pub fn basename(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// The first few kilobytes of the file, cut on a char boundary.
    pub fn head(&self) -> &str {
        if self.contents.len() <= HEAD_BYTES {
            return &self.contents;
        }
        let mut end = HEAD_BYTES;
        while !self.contents.is_char_boundary(end) {
            end -= 1;
        }
        &self.contents[..end]
    }
}
