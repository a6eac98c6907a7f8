use fxhash::FxHashMap;

use modscope_core::{MetadataHandle, ModuleKey, NodeRef};

use crate::node::ModuleTree;

/// Workspace-wide lookup from `(module, handle)` to the tree node that
/// presents the definition.
///
/// Entries for a module are purged as a unit, either on unload or as the
/// first half of a reindex, so the index never holds stale rows for a
/// rebuilt tree.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    map: FxHashMap<(ModuleKey, MetadataHandle), NodeRef>,
}

impl SymbolIndex {
    /// Registers every definition-backed node of the tree.
    pub fn index_tree(&mut self, tree: &ModuleTree) {
        for (id, node) in tree.iter() {
            if let Some(handle) = node.handle {
                self.map
                    .insert((tree.key().clone(), handle), tree.node_ref(id));
            }
        }
        tracing::debug!(module = %tree.key(), entries = self.map.len(), "indexed module tree");
    }

    /// Drops the module's entries, then registers the tree afresh.
    pub fn reindex(&mut self, tree: &ModuleTree) {
        self.remove_module(tree.key());
        self.index_tree(tree);
    }

    /// Purges every entry belonging to the module.
    pub fn remove_module(&mut self, key: &ModuleKey) {
        self.map.retain(|(module, _), _| module != key);
    }

    pub fn lookup(&self, module: &ModuleKey, handle: MetadataHandle) -> Option<&NodeRef> {
        self.map.get(&(module.clone(), handle))
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
