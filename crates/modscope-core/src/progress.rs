use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A status update emitted on the progress channel during long-running
/// load and resolution work.
///
/// Consumers treat `message` as display text; `path` is set when the update
/// concerns one specific file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadProgress {
    pub message: String,
    pub path: Option<PathBuf>,
}

impl LoadProgress {
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    pub fn for_path(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }
}
