use std::path::PathBuf;

use crate::editor::EditorError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("failed to read script {path}: {source}")]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse script {path}: {source}")]
    ParseScript {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read image {path}: {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
