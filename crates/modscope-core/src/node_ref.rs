use serde::{Deserialize, Serialize};

use crate::ModuleKey;

/// Index of a node within one module's tree arena.
///
/// Only meaningful against the arena that produced it; trees are rebuilt
/// wholesale on reindex, so ids are not stable across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A workspace-wide reference to one presentation node: which module's tree
/// it lives in, and where in that tree's arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub module: ModuleKey,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(module: ModuleKey, node: NodeId) -> Self {
        Self { module, node }
    }
}
