use itertools::Itertools;

use modscope_core::{HandleKind, MetadataHandle, ModuleKey, NodeId, NodeRef};
use modscope_metadata::{TypeInfo, TypeSystem};

/// What a tree node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The module root.
    Module,
    Namespace,
    Type,
    Member(MemberKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Constructor,
    Field,
    Property,
    Event,
}

/// One node in a module's presentation tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Set for nodes backed by a metadata definition (types and members);
    /// module and namespace nodes are purely presentational.
    pub handle: Option<MetadataHandle>,
    /// Reachable through public definitions all the way up.
    pub is_public_api: bool,
}

/// Counts of definitions the builder had to leave out of the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeDiagnostics {
    pub skipped_members: usize,
}

/// The presentation tree for one module.
///
/// Nodes live in an arena owned by the tree; ids are arena indices. A tree
/// is immutable once built, and rebuilt wholesale when the module is
/// reloaded.
#[derive(Debug)]
pub struct ModuleTree {
    key: ModuleKey,
    nodes: Vec<Node>,
    root: NodeId,
}

impl ModuleTree {
    /// Builds the tree from a resolved type system.
    ///
    /// The walk is deterministic: namespaces sorted by name, types within a
    /// namespace sorted by simple name, nested types sorted under their
    /// enclosing type, members in declaration order. Corrupt definitions
    /// were already dropped by the type-system build; their count is
    /// surfaced here as diagnostics.
    pub fn build(key: ModuleKey, module_name: &str, sys: &TypeSystem) -> (Self, TreeDiagnostics) {
        let mut builder = TreeBuilder {
            nodes: Vec::new(),
            sys,
        };
        let root = builder.push(Node {
            name: module_name.to_owned(),
            kind: NodeKind::Module,
            parent: None,
            children: Vec::new(),
            handle: None,
            is_public_api: true,
        });

        let by_namespace = builder
            .sys
            .top_level()
            .map(|t| (t.namespace.clone(), t))
            .into_group_map();
        for namespace in by_namespace.keys().sorted() {
            let ns_node = builder.push_child(
                root,
                Node {
                    name: namespace.clone(),
                    kind: NodeKind::Namespace,
                    parent: None,
                    children: Vec::new(),
                    handle: None,
                    is_public_api: true,
                },
            );
            let mut types: Vec<&TypeInfo> = by_namespace[namespace].clone();
            types.sort_by(|a, b| a.name.cmp(&b.name));
            for ty in types {
                builder.add_type(ns_node, ty, true);
            }
        }

        let diagnostics = TreeDiagnostics {
            skipped_members: sys.skipped_rows(),
        };
        let tree = Self {
            key,
            nodes: builder.nodes,
            root,
        };
        if diagnostics.skipped_members > 0 {
            tracing::debug!(
                module = %tree.key,
                skipped = diagnostics.skipped_members,
                "tree built without corrupt definitions"
            );
        }
        (tree, diagnostics)
    }

    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef::new(self.key.clone(), id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes with their ids, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }
}

struct TreeBuilder<'a> {
    nodes: Vec<Node>,
    sys: &'a TypeSystem,
}

impl TreeBuilder<'_> {
    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn push_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = self.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    fn add_type(&mut self, parent: NodeId, ty: &TypeInfo, ancestors_public: bool) {
        let is_public_api = ancestors_public && ty.is_public;
        let ty_node = self.push_child(
            parent,
            Node {
                name: ty.name.clone(),
                kind: NodeKind::Type,
                parent: None,
                children: Vec::new(),
                handle: Some(ty.handle()),
                is_public_api,
            },
        );

        let mut nested: Vec<&TypeInfo> = ty
            .nested
            .iter()
            .filter_map(|&row| self.sys.type_by_row(row))
            .collect();
        nested.sort_by(|a, b| a.name.cmp(&b.name));
        for inner in nested {
            self.add_type(ty_node, inner, is_public_api);
        }

        for member in &ty.members {
            let (name, kind) = match (member.handle.kind(), member.is_special) {
                (HandleKind::Method, true) => {
                    (format!("{}()", ty.name), MemberKind::Constructor)
                }
                (HandleKind::Method, false) => (member.name.clone(), MemberKind::Method),
                (HandleKind::Field, _) => (member.name.clone(), MemberKind::Field),
                (HandleKind::Property, _) => (member.name.clone(), MemberKind::Property),
                (HandleKind::Event, _) => (member.name.clone(), MemberKind::Event),
                (HandleKind::Type, _) => continue,
            };
            self.push_child(
                ty_node,
                Node {
                    name,
                    kind: NodeKind::Member(kind),
                    parent: None,
                    children: Vec::new(),
                    handle: Some(member.handle),
                    is_public_api: is_public_api && member.is_public,
                },
            );
        }
    }
}
