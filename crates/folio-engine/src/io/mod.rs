//! Reading and writing `.html` documents under a documents root.

use std::fs;
use std::path::{Path, PathBuf};

use relative_path::RelativePath;

use crate::error::EditError;
use crate::html::{self, ParseOptions, ParseOutcome};
use crate::model::Document;

const EXTENSION: &str = "html";

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid documents directory: {0}")]
    InvalidDocumentsDir(String),
    #[error("Invalid document {path}: {source}")]
    Document { path: PathBuf, source: EditError },
}

/// Reads and leniently parses a document.
pub fn read_document(
    relative_path: &RelativePath,
    documents_root: &Path,
    options: &ParseOptions,
) -> Result<ParseOutcome, IoError> {
    let absolute_path = relative_path.to_path(documents_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    let content = fs::read_to_string(&absolute_path)?;
    let outcome = html::parse(&content, options);
    log::debug!(
        "read {} ({} warnings)",
        absolute_path.display(),
        outcome.warnings.len()
    );
    Ok(outcome)
}

/// Reads a document that must parse without any recovery.
pub fn read_document_strict(
    relative_path: &RelativePath,
    documents_root: &Path,
    options: &ParseOptions,
) -> Result<Document, IoError> {
    let absolute_path = relative_path.to_path(documents_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    let content = fs::read_to_string(&absolute_path)?;
    html::parse_strict(&content, options).map_err(|source| IoError::Document {
        path: absolute_path,
        source,
    })
}

/// Serializes a document, creating parent directories as needed.
pub fn write_document(
    relative_path: &RelativePath,
    documents_root: &Path,
    doc: &Document,
) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(documents_root);
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&absolute_path, doc.to_html())?;
    Ok(())
}

/// All `.html` files below the root, sorted.
pub fn scan_documents(documents_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    validate_documents_dir(documents_root)?;
    let mut files = Vec::new();
    scan_directory_recursive(documents_root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == EXTENSION) {
            files.push(path);
        }
    }
    Ok(())
}

pub fn validate_documents_dir(path: &Path) -> Result<(), IoError> {
    if !path.is_dir() {
        return Err(IoError::InvalidDocumentsDir(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(())
}
