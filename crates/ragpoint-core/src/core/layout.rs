// crates/ragpoint-core/src/core/layout.rs
// ============================================================================
// Module: Ragpoint Storage Layout
// Description: Filesystem layout for embeddings and uploaded files.
// Purpose: Resolve per-project directories under the configured roots.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Each project owns one embeddings directory named `<project>_<unix-secs>`
//! under the embeddings root, and one uploads directory named `<project>`
//! under the uploads root. Project names are validated identifiers, so the
//! resulting paths never escape their roots. Uploaded file names are checked
//! separately because they come straight from clients.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::identifiers::ProjectName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of an uploaded file name.
pub const MAX_UPLOAD_FILE_NAME_LENGTH: usize = 255;

// ============================================================================
// SECTION: Embeddings Layout
// ============================================================================

/// Embeddings directory resolver.
pub struct EmbeddingsLayout;

impl EmbeddingsLayout {
    /// Returns the existing embeddings directory for a project.
    ///
    /// Directories are scanned in name order; the first one named
    /// `<project>_<digits>` wins. A missing root yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the root cannot be read.
    pub fn find(root: &Path, project: &ProjectName) -> io::Result<Option<PathBuf>> {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let mut matches = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_project_dir(name, project) {
                matches.push(entry.path());
            }
        }
        matches.sort();
        Ok(matches.into_iter().next())
    }

    /// Returns the project's embeddings directory, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the directory cannot be created.
    pub fn create(root: &Path, project: &ProjectName) -> io::Result<PathBuf> {
        if let Some(existing) = Self::find(root, project)? {
            return Ok(existing);
        }
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs());
        let path = root.join(format!("{project}_{secs}"));
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Removes every embeddings directory belonging to a project.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when a directory cannot be removed.
    pub fn remove(root: &Path, project: &ProjectName) -> io::Result<()> {
        while let Some(path) = Self::find(root, project)? {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }
}

/// Returns true when `name` matches `<project>_<digits>`.
fn is_project_dir(name: &str, project: &ProjectName) -> bool {
    name.strip_prefix(project.as_str())
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

// ============================================================================
// SECTION: Uploads Layout
// ============================================================================

/// Upload path resolver.
pub struct UploadsLayout;

impl UploadsLayout {
    /// Returns the uploads directory of a project.
    #[must_use]
    pub fn project_dir(root: &Path, project: &ProjectName) -> PathBuf {
        root.join(project.as_str())
    }

    /// Returns the destination path of an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] when the file name is empty,
    /// too long, contains a path separator or NUL, or is a dot segment.
    pub fn upload_path(root: &Path, project: &ProjectName, file_name: &str) -> io::Result<PathBuf> {
        validate_file_name(file_name)?;
        Ok(Self::project_dir(root, project).join(file_name))
    }
}

/// Validates a client-supplied file name.
fn validate_file_name(file_name: &str) -> io::Result<()> {
    let invalid = |reason: &str| io::Error::new(io::ErrorKind::InvalidInput, reason.to_string());
    if file_name.is_empty() {
        return Err(invalid("file name must be non-empty"));
    }
    if file_name.len() > MAX_UPLOAD_FILE_NAME_LENGTH {
        return Err(invalid("file name too long"));
    }
    if file_name == "." || file_name == ".." || file_name.contains("..") {
        return Err(invalid("file name must not contain dot segments"));
    }
    if file_name.contains(['/', '\\', '\0']) {
        return Err(invalid("file name must not contain path separators"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
