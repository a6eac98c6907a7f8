use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{MetadataHandle, NodeRef};

/// A symbolic reference produced by a search backend or an in-text link.
///
/// When the search ran against an already-indexed module, `target` carries
/// the resolved node and the rest of the fields are display hints. When the
/// target module was not resident at search time, `target` is `None` and the
/// candidate resolver falls back on `module_name`, `module_path`, and
/// `handle` to locate and load it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Display name of the matched entity.
    pub display_name: String,
    /// Pre-resolved target, if the module was indexed at search time.
    pub target: Option<NodeRef>,
    /// Simple name of the module the entity lives in (no directory, no
    /// extension).
    pub module_name: String,
    /// Literal path hint to the module file, when the backend knows one.
    pub module_path: Option<PathBuf>,
    /// Handle of the entity within its module, when known.
    pub handle: Option<MetadataHandle>,
    /// Display-location hint (namespace or declaring type), for listing.
    pub location: Option<String>,
}

impl SearchHit {
    /// A hit that already carries its resolved node.
    pub fn resolved(display_name: impl Into<String>, target: NodeRef) -> Self {
        let module_name = target.module.simple_name().to_owned();
        Self {
            display_name: display_name.into(),
            target: Some(target),
            module_name,
            module_path: None,
            handle: None,
            location: None,
        }
    }

    /// A hit that names a module the workbench has not loaded yet.
    pub fn unresolved(display_name: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            target: None,
            module_name: module_name.into(),
            module_path: None,
            handle: None,
            location: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_path = Some(path.into());
        self
    }

    pub fn with_handle(mut self, handle: MetadataHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}
