use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use modscope_core::{HandleKind, MetadataHandle};

use crate::image::{
    FLAG_HAS_SYMBOLS, HEADER_LEN, MAGIC, MEMBER_FLAG_PUBLIC, MEMBER_FLAG_SPECIAL,
    TYPE_FLAG_PUBLIC, VERSION,
};

/// Assembles a module image byte-by-byte.
///
/// Used by test fixtures and the fixture-generation tooling; the inspection
/// path itself only reads. Strings are deduplicated into the heap and rows
/// are emitted in insertion order, so the produced bytes are deterministic
/// for a given call sequence.
#[derive(Debug)]
pub struct ModuleImageBuilder {
    name_idx: u32,
    heap: Vec<u8>,
    interned: HashMap<String, u32>,
    types: Vec<[u32; 4]>,
    members: [Vec<[u32; 3]>; 4],
    module_refs: Vec<u32>,
    symbols: Vec<(u8, u32, u32, u32)>,
    emit_symbols: bool,
    corrupt_symbol_count: Option<u32>,
}

impl ModuleImageBuilder {
    pub fn new(name: &str) -> Self {
        let mut builder = Self {
            name_idx: 0,
            // Index 0 is reserved for the empty string.
            heap: vec![0],
            interned: HashMap::new(),
            types: Vec::new(),
            members: Default::default(),
            module_refs: Vec::new(),
            symbols: Vec::new(),
            emit_symbols: false,
            corrupt_symbol_count: None,
        };
        builder.name_idx = builder.intern(name);
        builder
    }

    /// Interns a string into the heap and returns its index. Mostly useful
    /// together with the raw-row methods.
    pub fn intern_string(&mut self, s: &str) -> u32 {
        self.intern(s)
    }

    fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        if let Some(&idx) = self.interned.get(s) {
            return idx;
        }
        let idx = self.heap.len() as u32;
        self.heap.extend_from_slice(s.as_bytes());
        self.heap.push(0);
        self.interned.insert(s.to_owned(), idx);
        idx
    }

    /// Adds a public top-level type and returns its handle.
    pub fn add_type(&mut self, namespace: &str, name: &str) -> MetadataHandle {
        self.add_type_full(namespace, name, TYPE_FLAG_PUBLIC, None)
    }

    /// Adds a type nested inside `enclosing` and returns its handle.
    pub fn add_nested_type(&mut self, name: &str, enclosing: MetadataHandle) -> MetadataHandle {
        self.add_type_full("", name, TYPE_FLAG_PUBLIC, Some(enclosing))
    }

    pub fn add_type_full(
        &mut self,
        namespace: &str,
        name: &str,
        flags: u32,
        enclosing: Option<MetadataHandle>,
    ) -> MetadataHandle {
        let name = self.intern(name);
        let namespace = self.intern(namespace);
        let enclosing = enclosing.map_or(0, |h| h.row());
        self.types.push([name, namespace, flags, enclosing]);
        self.type_handle(self.types.len() as u32)
    }

    pub fn add_method(&mut self, owner: MetadataHandle, name: &str) -> MetadataHandle {
        self.add_member(HandleKind::Method, owner, name, MEMBER_FLAG_PUBLIC)
    }

    /// Adds a constructor row; tree building renders these as `Type()`.
    pub fn add_ctor(&mut self, owner: MetadataHandle) -> MetadataHandle {
        self.add_member(
            HandleKind::Method,
            owner,
            ".ctor",
            MEMBER_FLAG_PUBLIC | MEMBER_FLAG_SPECIAL,
        )
    }

    pub fn add_field(&mut self, owner: MetadataHandle, name: &str) -> MetadataHandle {
        self.add_member(HandleKind::Field, owner, name, MEMBER_FLAG_PUBLIC)
    }

    pub fn add_property(&mut self, owner: MetadataHandle, name: &str) -> MetadataHandle {
        self.add_member(HandleKind::Property, owner, name, MEMBER_FLAG_PUBLIC)
    }

    pub fn add_event(&mut self, owner: MetadataHandle, name: &str) -> MetadataHandle {
        self.add_member(HandleKind::Event, owner, name, MEMBER_FLAG_PUBLIC)
    }

    pub fn add_member(
        &mut self,
        kind: HandleKind,
        owner: MetadataHandle,
        name: &str,
        flags: u32,
    ) -> MetadataHandle {
        assert_ne!(kind, HandleKind::Type, "use add_type for TypeDef rows");
        debug_assert_eq!(owner.kind(), HandleKind::Type);
        let name = self.intern(name);
        let table = &mut self.members[member_slot(kind)];
        table.push([name, owner.row(), flags]);
        let row = table.len() as u32;
        MetadataHandle::new(kind, row).expect("member rows are 1-based")
    }

    /// Emits a raw member row with an arbitrary owner value, for corrupt
    /// fixtures.
    pub fn add_member_raw(&mut self, kind: HandleKind, name: &str, owner: u32, flags: u32) {
        assert_ne!(kind, HandleKind::Type, "use add_type_raw for TypeDef rows");
        let name = self.intern(name);
        self.members[member_slot(kind)].push([name, owner, flags]);
    }

    /// Emits a raw TypeDef row with arbitrary field values, for corrupt
    /// fixtures.
    pub fn add_type_raw(&mut self, name: u32, namespace: u32, flags: u32, enclosing: u32) {
        self.types.push([name, namespace, flags, enclosing]);
    }

    pub fn add_dependency(&mut self, name: &str) {
        let idx = self.intern(name);
        self.module_refs.push(idx);
    }

    pub fn add_symbol(&mut self, handle: MetadataHandle, path: &str, line: u32) {
        let path = self.intern(path);
        self.symbols
            .push((handle.kind().tag(), handle.row(), path, line));
        self.emit_symbols = true;
    }

    /// Declares the symbol flag with a record count that overruns the
    /// section, producing an image whose symbols cannot be decoded.
    pub fn corrupt_symbol_section(&mut self, declared_count: u32) {
        self.emit_symbols = true;
        self.corrupt_symbol_count = Some(declared_count);
    }

    fn type_handle(&self, row: u32) -> MetadataHandle {
        MetadataHandle::new(HandleKind::Type, row).expect("type rows are 1-based")
    }

    pub fn build(&self) -> Vec<u8> {
        let mut tables = Vec::new();
        push_u32(&mut tables, self.types.len() as u32);
        for row in &self.types {
            for field in row {
                push_u32(&mut tables, *field);
            }
        }
        for table in &self.members {
            push_u32(&mut tables, table.len() as u32);
            for row in table {
                for field in row {
                    push_u32(&mut tables, *field);
                }
            }
        }
        push_u32(&mut tables, self.module_refs.len() as u32);
        for idx in &self.module_refs {
            push_u32(&mut tables, *idx);
        }

        let mut symbols = Vec::new();
        if self.emit_symbols {
            let count = self
                .corrupt_symbol_count
                .unwrap_or(self.symbols.len() as u32);
            push_u32(&mut symbols, count);
            for &(tag, row, path, line) in &self.symbols {
                symbols.push(tag);
                push_u32(&mut symbols, row);
                push_u32(&mut symbols, path);
                push_u32(&mut symbols, line);
            }
        }

        let str_off = HEADER_LEN as u32;
        let tbl_off = str_off + self.heap.len() as u32;
        let sym_off = tbl_off + tables.len() as u32;

        let mut out = Vec::with_capacity(HEADER_LEN + self.heap.len() + tables.len() + symbols.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        let flags: u16 = if self.emit_symbols { FLAG_HAS_SYMBOLS } else { 0 };
        out.extend_from_slice(&flags.to_le_bytes());
        push_u32(&mut out, self.name_idx);
        push_u32(&mut out, str_off);
        push_u32(&mut out, self.heap.len() as u32);
        push_u32(&mut out, tbl_off);
        push_u32(&mut out, tables.len() as u32);
        push_u32(&mut out, sym_off);
        push_u32(&mut out, symbols.len() as u32);
        debug_assert_eq!(out.len(), HEADER_LEN);
        out.extend_from_slice(&self.heap);
        out.extend_from_slice(&tables);
        out.extend_from_slice(&symbols);
        out
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&self.build())
    }
}

fn member_slot(kind: HandleKind) -> usize {
    match kind {
        // Asserted away at the public entry points.
        HandleKind::Type => unreachable!("TypeDef rows are not members"),
        HandleKind::Method => 0,
        HandleKind::Field => 1,
        HandleKind::Property => 2,
        HandleKind::Event => 3,
    }
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "add_type")]
    fn type_rows_are_rejected_as_members() {
        let mut b = ModuleImageBuilder::new("M");
        let t = b.add_type("Ns", "T");
        b.add_member(HandleKind::Type, t, "oops", 0);
    }
}
