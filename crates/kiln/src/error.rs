use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KilnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {action} {path}: {source}")]
    IoAt {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON parse error in {path}: {message}")]
    JsonParse { path: PathBuf, message: String },

    #[error("TOML parse error in {path}: {message}")]
    TomlParse { path: PathBuf, message: String },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Not found: {key}")]
    NotFound { key: String },

    #[error("Cannot set {field} of '{path}' to {new:?}: already set to {existing:?}")]
    ImmutableFieldConflict {
        field: &'static str,
        path: String,
        existing: String,
        new: String,
    },

    #[error("Anchor '#{anchor}' not found in '{target}' (linked from '{from}')")]
    AnchorNotFound {
        anchor: String,
        target: String,
        from: String,
    },

    #[error("Template error in {template}: {message}")]
    Render { template: String, message: String },

    #[error("Unsupported resource kind: {path}")]
    UnsupportedKind { path: PathBuf },

    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Directory walk error in {path}: {message}")]
    WalkDir { path: PathBuf, message: String },

    #[error("Duplicate page '{key}' in {path} conflicts with {existing_path}")]
    DuplicatePage {
        key: String,
        path: PathBuf,
        existing_path: PathBuf,
    },

    #[error("Invalid date: {value}")]
    InvalidDate { value: String },

    #[error("Media probe failed for {path}: {message}")]
    Media { path: PathBuf, message: String },

    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("Stylesheet error in {path}: {message}")]
    Stylesheet { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, KilnError>;

pub trait IoContext<T> {
    fn io_context(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| KilnError::IoAt {
            action,
            path: path.to_path_buf(),
            source,
        })
    }
}

impl KilnError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, KilnError::NotFound { .. })
    }
}
