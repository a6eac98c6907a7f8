//! Shared vocabulary types for the modscope workspace.
//!
//! Everything here is plain data: handles into a module's metadata tables,
//! the path-based module identity, references into a module's node arena,
//! and the value types that cross the session boundary (search hits and
//! progress reports). Behavior lives in the downstream crates.

mod handle;
mod module_key;
mod node_ref;
mod progress;
mod search;

pub use handle::{HandleKind, MetadataHandle};
pub use module_key::ModuleKey;
pub use node_ref::{NodeId, NodeRef};
pub use progress::LoadProgress;
pub use search::SearchHit;

/// Canonical file extension for module images.
pub const MODULE_EXT: &str = "mdim";
