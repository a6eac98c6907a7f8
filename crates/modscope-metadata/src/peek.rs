use modscope_core::{HandleKind, MetadataHandle};

use crate::cursor::{heap_string, section, Cursor};
use crate::error::MetadataError;
use crate::image::{
    FLAG_HAS_SYMBOLS, HEADER_LEN, MAGIC, MEMBER_ROW_LEN, TYPE_ROW_LEN, VERSION,
};

/// Header-and-counts view of an image, decoded without materializing any
/// table rows. This is the cheap probe the cross-module resolver runs over
/// each candidate file before committing to a full load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeekInfo {
    name: String,
    row_counts: [u32; 5],
    has_symbols: bool,
}

impl PeekInfo {
    /// Reads just enough of `data` to recover the module name and the row
    /// count of each definition table.
    pub fn read(data: &[u8]) -> Result<Self, MetadataError> {
        let mut header = Cursor::new(data.get(..HEADER_LEN).unwrap_or(data));
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

        let heap = section(data, str_off, str_len, "string heap")?;
        let name = heap_string(heap, name_idx)?.to_owned();

        let tables = section(data, tbl_off, tbl_len, "table")?;
        let mut cur = Cursor::new(tables);
        let mut row_counts = [0u32; 5];
        let type_count = cur.read_u32("TypeDef count")?;
        let type_bytes = (type_count as usize)
            .checked_mul(TYPE_ROW_LEN)
            .ok_or(MetadataError::Truncated("TypeDef table"))?;
        cur.skip(type_bytes, "TypeDef table")?;
        row_counts[0] = type_count;
        for slot in &mut row_counts[1..] {
            let count = cur.read_u32("member table count")?;
            let bytes = (count as usize)
                .checked_mul(MEMBER_ROW_LEN)
                .ok_or(MetadataError::Truncated("member table"))?;
            cur.skip(bytes, "member table")?;
            *slot = count;
        }

        Ok(Self {
            name,
            row_counts,
            has_symbols: flags & FLAG_HAS_SYMBOLS != 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_symbols(&self) -> bool {
        self.has_symbols
    }

    pub fn row_count(&self, kind: HandleKind) -> u32 {
        let idx = match kind {
            HandleKind::Type => 0,
            HandleKind::Method => 1,
            HandleKind::Field => 2,
            HandleKind::Property => 3,
            HandleKind::Event => 4,
        };
        self.row_counts[idx]
    }

    /// Structural check against the counts alone: the handle's table has at
    /// least that many rows. Row contents are not validated.
    pub fn contains(&self, handle: MetadataHandle) -> bool {
        handle.row() <= self.row_count(handle.kind())
    }
}
