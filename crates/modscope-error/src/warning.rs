use std::path::PathBuf;

/// Recoverable conditions: the operation completed in a degraded form.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WarningError {
    #[error("debug symbols unavailable for {path:?}: {detail}")]
    SymbolsUnavailable { path: PathBuf, detail: String },

    #[error("{count} member rows skipped while building tree for {path:?}")]
    MembersSkipped { path: PathBuf, count: usize },
}
