use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FileOperation {
    #[error("reading")]
    Read,
    #[error("writing")]
    Write,
    #[error("reading metadata")]
    Metadata,
    #[error("copying a file")]
    Copy,
    #[error("creating a directory")]
    Mkdir,
    #[error("removing")]
    Remove,
}
#[derive(Debug, Error, Diagnostic)]
#[error("I/O error: {operation} on path '{}'", path.display())]
#[diagnostic(
    code(hakobu::io),
    help("Check file permissions, disk space, or that the path is correct.")
)]
pub struct IoError {
    pub operation: FileOperation,
    pub path: std::path::PathBuf,
    #[source]
    pub source: std::io::Error,
}
impl IoError {
    pub fn new(operation: FileOperation, path: std::path::PathBuf, error: std::io::Error) -> Self {
        Self {
            operation,
            path,
            source: error,
        }
    }
}
/// Converts a failed directory walk into an [`IoError`] against the entry that broke it.
pub fn walk_error(error: walkdir::Error, fallback: &std::path::Path) -> IoError {
    let path = error.path().unwrap_or(fallback).to_path_buf();

    IoError::new(FileOperation::Read, path, error.into())
}
