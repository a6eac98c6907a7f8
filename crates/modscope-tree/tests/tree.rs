use modscope_core::{HandleKind, MetadataHandle, ModuleKey};
use modscope_metadata::{ModuleImage, ModuleImageBuilder, TypeSystem};
use modscope_tree::{
    EntityResolver, MemberKind, ModuleTree, NavHistory, NodeKind, Resolution, SymbolIndex,
};

fn sample_system() -> (String, TypeSystem) {
    let mut b = ModuleImageBuilder::new("Acme.Widgets");
    // Deliberately added out of display order.
    let zeta = b.add_type("Zoo", "Zebra");
    b.add_method(zeta, "Stripe");
    let widget = b.add_type("Acme", "Widget");
    b.add_ctor(widget);
    b.add_method(widget, "Render");
    b.add_field(widget, "cache");
    let button = b.add_type("Acme", "Button");
    b.add_property(button, "Label");
    b.add_nested_type("Inner", widget);

    let image = ModuleImage::parse(b.build()).unwrap();
    (image.name().to_owned(), TypeSystem::build(&image))
}

fn sample_tree(key: &ModuleKey) -> (ModuleTree, modscope_tree::TreeDiagnostics) {
    let (name, sys) = sample_system();
    ModuleTree::build(key.clone(), &name, &sys)
}

#[test]
fn walk_is_sorted_and_members_keep_declaration_order() {
    let key = ModuleKey::new("/mods/Acme.Widgets.mdim");
    let (tree, diags) = sample_tree(&key);
    assert_eq!(diags.skipped_members, 0);

    let root = tree.node(tree.root()).unwrap();
    assert_eq!(root.kind, NodeKind::Module);
    assert_eq!(root.name, "Acme.Widgets");

    let ns_names: Vec<_> = root
        .children
        .iter()
        .map(|&id| tree.node(id).unwrap().name.as_str())
        .collect();
    assert_eq!(ns_names, ["Acme", "Zoo"]);

    let acme = tree.node(root.children[0]).unwrap();
    let type_names: Vec<_> = acme
        .children
        .iter()
        .map(|&id| tree.node(id).unwrap().name.as_str())
        .collect();
    assert_eq!(type_names, ["Button", "Widget"]);

    let widget = tree.node(acme.children[1]).unwrap();
    let child_names: Vec<_> = widget
        .children
        .iter()
        .map(|&id| tree.node(id).unwrap().name.as_str())
        .collect();
    // Nested types first, then members in declaration order; the
    // constructor renders with the owning type's name.
    assert_eq!(child_names, ["Inner", "Widget()", "Render", "cache"]);
    let ctor = tree.node(widget.children[1]).unwrap();
    assert_eq!(ctor.kind, NodeKind::Member(MemberKind::Constructor));
}

#[test]
fn every_definition_node_round_trips_through_the_index() {
    let key = ModuleKey::new("/mods/Acme.Widgets.mdim");
    let (tree, _) = sample_tree(&key);
    let mut index = SymbolIndex::default();
    index.index_tree(&tree);

    let mut checked = 0;
    for (id, node) in tree.iter() {
        let Some(handle) = node.handle else { continue };
        let found = index.lookup(&key, handle).unwrap();
        assert_eq!(*found, tree.node_ref(id));
        checked += 1;
    }
    // 4 types (incl. nested) + 5 members.
    assert_eq!(checked, 9);
    assert_eq!(index.len(), 9);
}

#[test]
fn reindex_replaces_stale_entries() {
    let key = ModuleKey::new("/mods/Acme.Widgets.mdim");
    let (tree, _) = sample_tree(&key);
    let mut index = SymbolIndex::default();
    index.index_tree(&tree);
    let before = index.len();

    index.reindex(&tree);
    assert_eq!(index.len(), before);

    index.remove_module(&key);
    assert!(index.is_empty());
}

#[test]
fn resolver_prefers_hint_and_demotes_cross_module_hits() {
    let key_a = ModuleKey::new("/mods/A.mdim");
    let key_b = ModuleKey::new("/mods/B.mdim");
    let (name, sys) = sample_system();
    let (tree_a, _) = ModuleTree::build(key_a.clone(), &name, &sys);
    let (tree_b, _) = ModuleTree::build(key_b.clone(), &name, &sys);
    let mut index = SymbolIndex::default();
    index.index_tree(&tree_a);
    index.index_tree(&tree_b);

    let modules = [(&key_a, &sys), (&key_b, &sys)];
    let resolver = EntityResolver::new(&index);
    let render = MetadataHandle::new(HandleKind::Method, 3).unwrap();

    match resolver.resolve(render, Some(&key_b), modules) {
        Resolution::Found(node) => assert_eq!(node.module, key_b),
        other => panic!("expected exact hit, got {other:?}"),
    }

    // Hinted module does not carry the handle: the match in A is only a
    // same-kind same-row coincidence.
    let key_c = ModuleKey::new("/mods/C.mdim");
    match resolver.resolve(render, Some(&key_c), modules) {
        Resolution::Ambiguous(node) => assert_eq!(node.module, key_a),
        other => panic!("expected heuristic hit, got {other:?}"),
    }

    // No hint: first module in scan order wins.
    match resolver.resolve(render, None, modules) {
        Resolution::Found(node) => assert_eq!(node.module, key_a),
        other => panic!("expected scan hit, got {other:?}"),
    }

    let missing = MetadataHandle::new(HandleKind::Event, 40).unwrap();
    assert_eq!(resolver.resolve(missing, None, modules), Resolution::NotFound);
}

#[test]
fn unload_purges_index_and_history_together() {
    let key = ModuleKey::new("/mods/Acme.Widgets.mdim");
    let (tree, _) = sample_tree(&key);
    let mut index = SymbolIndex::default();
    index.index_tree(&tree);
    let mut nav = NavHistory::new();
    let root_ref = tree.node_ref(tree.root());
    nav.record_selection(root_ref.clone());
    let first_ns = tree.node(tree.root()).unwrap().children[0];
    nav.record_selection(tree.node_ref(first_ns));

    index.remove_module(&key);
    nav.purge_module(&key);

    assert!(index.is_empty());
    assert!(!nav.can_go_back());
    assert_eq!(nav.current(), None);
}
