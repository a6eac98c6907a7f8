use modscope_core::{ModuleKey, NodeRef};

/// Back/forward navigation stacks over tree selections.
///
/// Selections land here via [`record_selection`]; a selection identical to
/// the current one is a no-op, which is what keeps back/forward replays
/// from pushing themselves onto the stack they just popped.
///
/// [`record_selection`]: NavHistory::record_selection
#[derive(Debug, Default)]
pub struct NavHistory {
    back: Vec<NodeRef>,
    forward: Vec<NodeRef>,
    current: Option<NodeRef>,
}

impl NavHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a user-driven selection change: the previous selection goes
    /// onto the back stack and the forward stack is cleared.
    pub fn record_selection(&mut self, node: NodeRef) {
        if self.current.as_ref() == Some(&node) {
            return;
        }
        if let Some(prev) = self.current.replace(node) {
            self.back.push(prev);
            self.forward.clear();
        }
    }

    /// Steps back one selection, moving the current one to the forward
    /// stack. Empty stack is a no-op returning `None`.
    pub fn go_back(&mut self) -> Option<NodeRef> {
        let target = self.back.pop()?;
        if let Some(cur) = self.current.replace(target.clone()) {
            self.forward.push(cur);
        }
        Some(target)
    }

    /// Mirror of [`go_back`](NavHistory::go_back).
    pub fn go_forward(&mut self) -> Option<NodeRef> {
        let target = self.forward.pop()?;
        if let Some(cur) = self.current.replace(target.clone()) {
            self.back.push(cur);
        }
        Some(target)
    }

    pub fn current(&self) -> Option<&NodeRef> {
        self.current.as_ref()
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Drops every entry that points into the module, preserving the order
    /// of the remaining entries. Called when the module is unloaded so the
    /// stacks never hand out references into a tree that no longer exists.
    pub fn purge_module(&mut self, key: &ModuleKey) {
        self.back.retain(|r| &r.module != key);
        self.forward.retain(|r| &r.module != key);
        if self.current.as_ref().is_some_and(|r| &r.module == key) {
            self.current = None;
        }
    }

    pub fn clear(&mut self) {
        self.back.clear();
        self.forward.clear();
        self.current = None;
    }
}
