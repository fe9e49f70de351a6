//! Error types for scene persistence

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the scene Error type
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors that can occur while loading or saving scene files
#[derive(Error, Debug)]
pub enum SceneError {
    /// Reading or writing a scene file failed
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document does not match the scene schema
    #[error("Schema error at '{pointer}': {message}")]
    Schema { pointer: String, message: String },

    /// A `ref` node (transitively) references its own file
    #[error("Reference cycle through {}", .0.display())]
    RefCycle(PathBuf),

    /// Building the tree failed
    #[error(transparent)]
    Core(#[from] carve_core::Error),
}

impl SceneError {
    pub(crate) fn schema(pointer: &str, message: impl Into<String>) -> Self {
        SceneError::Schema {
            pointer: if pointer.is_empty() {
                "/".to_string()
            } else {
                pointer.to_string()
            },
            message: message.into(),
        }
    }
}
