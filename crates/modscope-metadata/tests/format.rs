//! End-to-end checks of the image format: build with [`ModuleImageBuilder`],
//! then read back through [`ModuleImage`], [`PeekInfo`], and [`TypeSystem`].

use modscope_core::{HandleKind, MetadataHandle};
use modscope_metadata::{
    MetadataError, ModuleImage, ModuleImageBuilder, PeekInfo, SymbolStatus, TypeSystem,
};

fn sample_builder() -> ModuleImageBuilder {
    let mut b = ModuleImageBuilder::new("Acme.Widgets");
    let widget = b.add_type("Acme.Widgets", "Widget");
    b.add_ctor(widget);
    b.add_method(widget, "Render");
    b.add_field(widget, "cache");
    b.add_property(widget, "Size");
    b.add_event(widget, "Resized");
    let helper = b.add_type("Acme.Widgets.Internal", "Helper");
    b.add_nested_type("State", helper);
    b.add_dependency("Acme.Core");
    b
}

#[test]
fn parse_recovers_what_the_builder_wrote() {
    let mut b = sample_builder();
    let widget = MetadataHandle::new(HandleKind::Type, 1).unwrap();
    b.add_symbol(widget, "src/widget.rs", 42);

    let image = ModuleImage::parse(b.build()).unwrap();
    assert_eq!(image.name(), "Acme.Widgets");
    assert_eq!(image.dependencies(), &["Acme.Core".to_owned()]);
    assert_eq!(image.row_count(HandleKind::Type), 3);
    assert_eq!(image.row_count(HandleKind::Method), 2);
    assert_eq!(*image.symbol_status(), SymbolStatus::Loaded);

    let loc = image.symbols().unwrap().location(widget).unwrap();
    assert_eq!(loc.path, "src/widget.rs");
    assert_eq!(loc.line, 42);
}

#[test]
fn type_system_resolves_members_and_nesting() {
    let image = ModuleImage::parse(sample_builder().build()).unwrap();
    let sys = TypeSystem::build(&image);
    assert_eq!(sys.skipped_rows(), 0);

    let widget = sys.type_by_row(1).unwrap();
    assert_eq!(widget.namespace, "Acme.Widgets");
    assert!(widget.is_public);
    let names: Vec<_> = widget.members.iter().map(|m| m.name.as_str()).collect();
    // Table order: methods, then fields, properties, events.
    assert_eq!(names, [".ctor", "Render", "cache", "Size", "Resized"]);
    assert!(widget.members[0].is_special);
    assert!(!widget.members[1].is_special);

    let helper = sys.type_by_row(2).unwrap();
    assert_eq!(helper.nested, [3]);
    let state = sys.type_by_row(3).unwrap();
    assert_eq!(state.enclosing, Some(2));
    assert_eq!(sys.top_level().count(), 2);

    let render = MetadataHandle::new(HandleKind::Method, 2).unwrap();
    let (owner, member) = sys.member(render).unwrap();
    assert_eq!(owner.name, "Widget");
    assert_eq!(member.name, "Render");
    assert!(sys.contains(render));
    assert!(!sys.contains(MetadataHandle::new(HandleKind::Event, 9).unwrap()));
}

#[test]
fn truncated_and_foreign_files_are_rejected() {
    assert!(matches!(
        ModuleImage::parse(b"MDIM".to_vec()),
        Err(MetadataError::Truncated(_))
    ));
    assert!(matches!(
        ModuleImage::parse(b"not a module image at all, just text".to_vec()),
        Err(MetadataError::BadMagic)
    ));
}

#[test]
fn future_format_version_is_rejected() {
    let mut bytes = sample_builder().build();
    bytes[4] = 0xff;
    assert!(matches!(
        ModuleImage::parse(bytes),
        Err(MetadataError::UnsupportedVersion(0x00ff))
    ));
}

#[test]
fn malformed_symbol_section_degrades_instead_of_failing() {
    let mut b = sample_builder();
    // Declares more records than the section holds.
    b.corrupt_symbol_section(1000);

    let image = ModuleImage::parse(b.build()).unwrap();
    assert!(image.symbols().is_none());
    assert!(matches!(image.symbol_status(), SymbolStatus::Failed(_)));
    // Everything else still loaded.
    assert_eq!(image.name(), "Acme.Widgets");
    assert_eq!(image.row_count(HandleKind::Type), 3);
}

#[test]
fn symbol_record_with_unknown_kind_degrades() {
    let mut b = sample_builder();
    let widget = MetadataHandle::new(HandleKind::Type, 1).unwrap();
    b.add_symbol(widget, "src/widget.rs", 1);
    let mut bytes = b.build();
    // The first symbol record's tag byte sits right after the 4-byte count
    // at the end of the image.
    let tag_pos = bytes.len() - 13;
    bytes[tag_pos] = 0x7f;

    let image = ModuleImage::parse(bytes).unwrap();
    assert!(matches!(image.symbol_status(), SymbolStatus::Failed(msg) if msg.contains("0x7f")));
}

#[test]
fn corrupt_definition_rows_are_skipped_and_counted() {
    let mut b = ModuleImageBuilder::new("Broken");
    let good = b.add_type("Ns", "Good");
    b.add_method(good, "Run");
    // Name index pointing past the heap.
    b.add_type_raw(0xdead_beef, 0, 0, 0);
    // Member owned by a TypeDef row that does not exist.
    b.add_member_raw(HandleKind::Field, "orphan", 99, 0);

    let image = ModuleImage::parse(b.build()).unwrap();
    let sys = TypeSystem::build(&image);
    assert_eq!(sys.skipped_rows(), 2);
    assert_eq!(sys.types().count(), 1);
    assert_eq!(sys.type_by_row(1).unwrap().members.len(), 1);
    assert!(sys.type_by_row(2).is_none());
}

#[test]
fn cyclic_nesting_is_dropped() {
    let mut b = ModuleImageBuilder::new("Cyclic");
    b.add_type("Ns", "A");
    // Rows 2 and 3 enclose each other.
    let name_b = b.intern_string("B");
    let name_c = b.intern_string("C");
    b.add_type_raw(name_b, 0, 0, 3);
    b.add_type_raw(name_c, 0, 0, 2);

    let image = ModuleImage::parse(b.build()).unwrap();
    let sys = TypeSystem::build(&image);
    assert_eq!(sys.types().count(), 1);
    assert_eq!(sys.skipped_rows(), 2);
}

#[test]
fn write_to_produces_a_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Acme.Widgets.mdim");
    sample_builder().write_to(&path).unwrap();

    let image = ModuleImage::parse(std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(image.name(), "Acme.Widgets");
}

#[test]
fn peek_reads_counts_without_decoding_rows() {
    let image_bytes = sample_builder().build();
    let peek = PeekInfo::read(&image_bytes).unwrap();
    assert_eq!(peek.name(), "Acme.Widgets");
    assert!(!peek.has_symbols());
    assert_eq!(peek.row_count(HandleKind::Type), 3);
    assert_eq!(peek.row_count(HandleKind::Method), 2);
    assert!(peek.contains(MetadataHandle::new(HandleKind::Field, 1).unwrap()));
    assert!(!peek.contains(MetadataHandle::new(HandleKind::Field, 2).unwrap()));

    let full = ModuleImage::parse(image_bytes).unwrap();
    assert_eq!(peek.name(), full.name());
}

#[test]
fn peek_rejects_absurd_row_counts() {
    let mut bytes = sample_builder().build();
    // Overwrite the TypeDef count at the head of the table section with a
    // value whose row bytes cannot fit in any buffer.
    let tbl_off = u32::from_le_bytes(bytes[20..24].try_into().unwrap()) as usize;
    bytes[tbl_off..tbl_off + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        PeekInfo::read(&bytes),
        Err(MetadataError::Truncated(_))
    ));
}
