//! Bootstrap error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the bootstrap platform layer
#[derive(Debug, Error)]
pub enum PalError {
    #[error("Failed to get the path of the running executable: {0}")]
    ExecutablePath(#[source] io::Error),

    #[error("Path is not valid Unicode: {}", .0.display())]
    NonUnicodePath(PathBuf),

    #[error("Executable path has no directory separator: {0}")]
    NoDirectorySeparator(String),

    #[error("Failed to get full path of application base: {path}")]
    FullPath { path: String },

    #[error("Full path of application base is too long")]
    PathTooLong { length: usize, capacity: usize },

    #[error("Argument contains an interior NUL byte: {0:?}")]
    InteriorNul(String),

    #[error("Failed to load: {module} ({reason})")]
    ModuleLoad { module: String, reason: String },

    #[error("Failed to find export '{symbol}' in {module}")]
    SymbolNotFound { module: String, symbol: String },
}
