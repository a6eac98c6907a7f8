use modscope_core::{MetadataHandle, ModuleKey, NodeRef};
use modscope_metadata::TypeSystem;

use crate::index::SymbolIndex;

/// Outcome of resolving a metadata handle to a tree node.
///
/// Not-found is a value here, never an error: callers fall back to showing
/// the raw handle and the workbench keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The handle resolved in the module it was minted for.
    Found(NodeRef),
    /// The handle matched a definition in a different module than hinted.
    /// Handles are module-local, so a same-kind same-row match elsewhere is
    /// a best-effort guess, surfaced as its own variant so callers can tell
    /// it from a sound hit.
    Ambiguous(NodeRef),
    NotFound,
}

impl Resolution {
    pub fn node(&self) -> Option<&NodeRef> {
        match self {
            Resolution::Found(node) | Resolution::Ambiguous(node) => Some(node),
            Resolution::NotFound => None,
        }
    }
}

/// Resolves handles against the symbol index and the loaded modules' type
/// systems. Infallible by construction.
pub struct EntityResolver<'a> {
    index: &'a SymbolIndex,
}

impl<'a> EntityResolver<'a> {
    pub fn new(index: &'a SymbolIndex) -> Self {
        Self { index }
    }

    /// Looks up `handle`, preferring the hinted module.
    ///
    /// With a hint, an exact `(hint, handle)` index hit is `Found`; a match
    /// in any other module is only `Ambiguous`. Without a hint, the first
    /// module (in `modules` order) whose type system confirms the handle
    /// wins. `modules` must iterate deterministically for stable results.
    pub fn resolve<'m>(
        &self,
        handle: MetadataHandle,
        hint: Option<&ModuleKey>,
        modules: impl IntoIterator<Item = (&'m ModuleKey, &'m TypeSystem)>,
    ) -> Resolution {
        if let Some(hint) = hint {
            if let Some(node) = self.index.lookup(hint, handle) {
                return Resolution::Found(node.clone());
            }
        }

        for (key, sys) in modules {
            if hint == Some(key) {
                // Already tried the exact lookup above.
                continue;
            }
            if !sys.contains(handle) {
                continue;
            }
            let Some(node) = self.index.lookup(key, handle) else {
                continue;
            };
            return if hint.is_some() {
                tracing::debug!(%handle, module = %key, "handle matched outside hinted module");
                Resolution::Ambiguous(node.clone())
            } else {
                Resolution::Found(node.clone())
            };
        }

        Resolution::NotFound
    }
}
