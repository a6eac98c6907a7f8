use crate::cursor::{heap_string, section, Cursor};
use crate::error::MetadataError;
use crate::symbols::SymbolTable;
use modscope_core::{HandleKind, MetadataHandle};

pub(crate) const MAGIC: [u8; 4] = *b"MDIM";
pub(crate) const VERSION: u16 = 1;
pub(crate) const HEADER_LEN: usize = 36;
pub(crate) const FLAG_HAS_SYMBOLS: u16 = 0x0001;

pub(crate) const TYPE_ROW_LEN: usize = 16;
pub(crate) const MEMBER_ROW_LEN: usize = 12;

pub const TYPE_FLAG_PUBLIC: u32 = 0x1;
pub const TYPE_FLAG_SEALED: u32 = 0x2;
pub const TYPE_FLAG_INTERFACE: u32 = 0x4;
pub const MEMBER_FLAG_PUBLIC: u32 = 0x1;
/// Constructor for method rows, compile-time constant for field rows.
pub const MEMBER_FLAG_SPECIAL: u32 = 0x2;

/// One row of the TypeDef table, as read off disk. Indices are unresolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeDefRow {
    pub name: u32,
    pub namespace: u32,
    pub flags: u32,
    /// Enclosing TypeDef row for nested types; 0 for top-level.
    pub enclosing: u32,
}

/// One row of a member definition table (method, field, property, event).
#[derive(Debug, Clone, Copy)]
pub(crate) struct MemberRow {
    pub name: u32,
    /// Owning TypeDef row, 1-based.
    pub owner: u32,
    pub flags: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub types: Vec<TypeDefRow>,
    pub methods: Vec<MemberRow>,
    pub fields: Vec<MemberRow>,
    pub properties: Vec<MemberRow>,
    pub events: Vec<MemberRow>,
    pub module_refs: Vec<u32>,
}

impl Tables {
    pub fn member_table(&self, kind: HandleKind) -> Option<&[MemberRow]> {
        match kind {
            HandleKind::Type => None,
            HandleKind::Method => Some(&self.methods),
            HandleKind::Field => Some(&self.fields),
            HandleKind::Property => Some(&self.properties),
            HandleKind::Event => Some(&self.events),
        }
    }

    pub fn row_count(&self, kind: HandleKind) -> u32 {
        let len = match kind {
            HandleKind::Type => self.types.len(),
            HandleKind::Method => self.methods.len(),
            HandleKind::Field => self.fields.len(),
            HandleKind::Property => self.properties.len(),
            HandleKind::Event => self.events.len(),
        };
        len as u32
    }
}

/// Whether the image's debug-symbol section was usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolStatus {
    /// The image declares no symbol section.
    Absent,
    Loaded,
    /// The section was declared but malformed; the image loaded without it.
    Failed(String),
}

/// A fully parsed module image: raw bytes plus the decoded header, tables,
/// dependency names, and (when present and well-formed) debug symbols.
///
/// Parsing validates the header, carves every declared section with bounds
/// checks, and decodes all table rows eagerly. A malformed symbol section
/// does not fail the parse: the image degrades to [`SymbolStatus::Failed`]
/// so callers can surface a warning and continue (§ graceful fallback).
#[derive(Debug)]
pub struct ModuleImage {
    data: Vec<u8>,
    name: String,
    strings: (u32, u32),
    tables: Tables,
    dependencies: Vec<String>,
    symbols: Option<SymbolTable>,
    symbol_status: SymbolStatus,
}

impl ModuleImage {
    pub fn parse(data: Vec<u8>) -> Result<Self, MetadataError> {
        let mut header = Cursor::new(data.get(..HEADER_LEN).unwrap_or(&data));
        let mut magic = [0u8; 4];
        for b in &mut magic {
            *b = header.read_u8("magic")?;
        }
        if magic != MAGIC {
            return Err(MetadataError::BadMagic);
        }
        let version = header.read_u16("version")?;
        if version != VERSION {
            return Err(MetadataError::UnsupportedVersion(version));
        }
        let flags = header.read_u16("flags")?;
        let name_idx = header.read_u32("module name")?;
        let str_off = header.read_u32("string heap offset")?;
        let str_len = header.read_u32("string heap length")?;
        let tbl_off = header.read_u32("table section offset")?;
        let tbl_len = header.read_u32("table section length")?;
        let sym_off = header.read_u32("symbol section offset")?;
        let sym_len = header.read_u32("symbol section length")?;

        // Validate section ranges up front so later accessors can't run off
        // the end of the buffer.
        section(&data, str_off, str_len, "string heap")?;
        let table_bytes = section(&data, tbl_off, tbl_len, "table")?;
        let tables = parse_tables(table_bytes)?;

        let mut image = Self {
            name: String::new(),
            strings: (str_off, str_len),
            tables,
            dependencies: Vec::new(),
            symbols: None,
            symbol_status: SymbolStatus::Absent,
            data,
        };
        image.name = image.string(name_idx)?.to_owned();
        image.dependencies = image
            .tables
            .module_refs
            .iter()
            .map(|&idx| image.string(idx).map(str::to_owned))
            .collect::<Result<_, _>>()?;

        if flags & FLAG_HAS_SYMBOLS != 0 {
            match section(&image.data, sym_off, sym_len, "symbol")
                .and_then(|bytes| SymbolTable::parse(bytes, &image))
            {
                Ok(symbols) => {
                    image.symbols = Some(symbols);
                    image.symbol_status = SymbolStatus::Loaded;
                }
                Err(err) => {
                    tracing::warn!(module = %image.name, %err, "symbol section unusable, loading without symbols");
                    image.symbol_status = SymbolStatus::Failed(err.to_string());
                }
            }
        }

        Ok(image)
    }

    /// Module simple name as recorded in the header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves a string-heap index to its NUL-terminated UTF-8 string.
    pub fn string(&self, idx: u32) -> Result<&str, MetadataError> {
        let (off, len) = self.strings;
        let heap = &self.data[off as usize..off as usize + len as usize];
        heap_string(heap, idx)
    }

    /// Simple names of the modules this image declares as dependencies.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn symbols(&self) -> Option<&SymbolTable> {
        self.symbols.as_ref()
    }

    pub fn symbol_status(&self) -> &SymbolStatus {
        &self.symbol_status
    }

    pub fn row_count(&self, kind: HandleKind) -> u32 {
        self.tables.row_count(kind)
    }

    /// Structural check: does the table named by the handle have that row?
    /// Cheaper than a type-system lookup and independent of row validity.
    pub fn contains(&self, handle: MetadataHandle) -> bool {
        handle.row() <= self.row_count(handle.kind())
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.tables
    }
}

fn parse_tables(bytes: &[u8]) -> Result<Tables, MetadataError> {
    let mut cur = Cursor::new(bytes);
    let mut tables = Tables::default();

    let count = cur.read_u32("TypeDef count")?;
    tables.types.reserve(count.min(1 << 20) as usize);
    for _ in 0..count {
        tables.types.push(TypeDefRow {
            name: cur.read_u32("TypeDef row")?,
            namespace: cur.read_u32("TypeDef row")?,
            flags: cur.read_u32("TypeDef row")?,
            enclosing: cur.read_u32("TypeDef row")?,
        });
    }

    let mut member_tables: [Vec<MemberRow>; 4] = Default::default();
    for (rows, label) in member_tables.iter_mut().zip([
        "MethodDef row",
        "FieldDef row",
        "PropertyDef row",
        "EventDef row",
    ]) {
        let count = cur.read_u32("member table count")?;
        rows.reserve(count.min(1 << 20) as usize);
        for _ in 0..count {
            rows.push(MemberRow {
                name: cur.read_u32(label)?,
                owner: cur.read_u32(label)?,
                flags: cur.read_u32(label)?,
            });
        }
    }
    let [methods, fields, properties, events] = member_tables;
    tables.methods = methods;
    tables.fields = fields;
    tables.properties = properties;
    tables.events = events;

    let count = cur.read_u32("ModuleRef count")?;
    for _ in 0..count {
        tables.module_refs.push(cur.read_u32("ModuleRef row")?);
    }

    Ok(tables)
}
