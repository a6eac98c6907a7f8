use std::collections::HashMap;

use modscope_core::{HandleKind, MetadataHandle};

use crate::cursor::Cursor;
use crate::error::MetadataError;
use crate::image::ModuleImage;

/// Debug source location for one definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: String,
    pub line: u32,
}

/// Decoded debug-symbol section: definition handle to source location.
///
/// The section is strictly validated; any malformed record poisons the whole
/// table and the caller degrades to a symbol-less load instead.
#[derive(Debug, Default)]
pub struct SymbolTable {
    locations: HashMap<MetadataHandle, SourceLocation>,
}

impl SymbolTable {
    pub(crate) fn parse(bytes: &[u8], image: &ModuleImage) -> Result<Self, MetadataError> {
        let mut cur = Cursor::new(bytes);
        let count = cur.read_u32("symbol count")?;
        let mut locations = HashMap::with_capacity(count.min(1 << 20) as usize);
        for _ in 0..count {
            let tag = cur.read_u8("symbol kind")?;
            let kind =
                HandleKind::from_tag(tag).ok_or(MetadataError::UnsupportedHandleKind(tag))?;
            let row = cur.read_u32("symbol row")?;
            let handle = MetadataHandle::new(kind, row).ok_or(MetadataError::BadRowRef {
                table: "symbol",
                row,
            })?;
            if row > image.row_count(kind) {
                return Err(MetadataError::BadRowRef {
                    table: "symbol",
                    row,
                });
            }
            let path = image.string(cur.read_u32("symbol path")?)?.to_owned();
            let line = cur.read_u32("symbol line")?;
            locations.insert(handle, SourceLocation { path, line });
        }
        Ok(Self { locations })
    }

    pub fn location(&self, handle: MetadataHandle) -> Option<&SourceLocation> {
        self.locations.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
