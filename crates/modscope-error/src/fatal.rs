use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum FatalError {
    #[error("module file not found: {path:?}")]
    FileNotFound { path: PathBuf },

    #[error("malformed module image {path:?}: {detail}")]
    MalformedImage { path: PathBuf, detail: String },

    #[error("I/O failure on {path:?}: {operation}: {source}")]
    FileOperation {
        operation: &'static str,
        path: PathBuf,
        source: Arc<std::io::Error>,
    },
}
