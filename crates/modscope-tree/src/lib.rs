//! Presentation model over parsed module images.
//!
//! [`ModuleTree`] arranges one module's definitions into the namespace /
//! type / member hierarchy the workbench displays; [`SymbolIndex`] maps
//! `(module, handle)` pairs back to tree nodes; [`EntityResolver`] turns a
//! bare handle into a node with hint-then-scan lookup; [`NavHistory`] keeps
//! the back/forward selection stacks.

mod history;
mod index;
mod node;
mod resolve;

pub use history::NavHistory;
pub use index::SymbolIndex;
pub use node::{MemberKind, ModuleTree, Node, NodeKind, TreeDiagnostics};
pub use resolve::{EntityResolver, Resolution};
