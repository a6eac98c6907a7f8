use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// The definition table a [`MetadataHandle`] points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandleKind {
    Type,
    Method,
    Field,
    Property,
    Event,
}

impl HandleKind {
    /// All kinds, in table order. The metadata table section is laid out in
    /// this order on disk.
    pub const ALL: [HandleKind; 5] = [
        HandleKind::Type,
        HandleKind::Method,
        HandleKind::Field,
        HandleKind::Property,
        HandleKind::Event,
    ];

    /// On-disk tag byte used by the symbol section.
    pub fn tag(self) -> u8 {
        match self {
            HandleKind::Type => 0x01,
            HandleKind::Method => 0x02,
            HandleKind::Field => 0x03,
            HandleKind::Property => 0x04,
            HandleKind::Event => 0x05,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(HandleKind::Type),
            0x02 => Some(HandleKind::Method),
            0x03 => Some(HandleKind::Field),
            0x04 => Some(HandleKind::Property),
            0x05 => Some(HandleKind::Event),
            _ => None,
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandleKind::Type => "type",
            HandleKind::Method => "method",
            HandleKind::Field => "field",
            HandleKind::Property => "property",
            HandleKind::Event => "event",
        };
        f.write_str(s)
    }
}

/// An opaque token identifying one definition row inside a single module's
/// metadata tables.
///
/// Rows are 1-based, matching the on-disk encoding where row 0 means "nil".
/// A handle is only meaningful paired with the [`crate::ModuleKey`] of the
/// module it came from; the same `(kind, row)` pair in another module names
/// an unrelated definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetadataHandle {
    kind: HandleKind,
    row: NonZeroU32,
}

impl MetadataHandle {
    /// Returns `None` for row 0 (the nil row).
    pub fn new(kind: HandleKind, row: u32) -> Option<Self> {
        NonZeroU32::new(row).map(|row| Self { kind, row })
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// 1-based row index into the table named by `kind`.
    pub fn row(&self) -> u32 {
        self.row.get()
    }
}

impl fmt::Display for MetadataHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_row_is_rejected() {
        assert!(MetadataHandle::new(HandleKind::Type, 0).is_none());
        let h = MetadataHandle::new(HandleKind::Method, 3).unwrap();
        assert_eq!(h.row(), 3);
        assert_eq!(h.kind(), HandleKind::Method);
    }

    #[test]
    fn tag_roundtrip() {
        for kind in HandleKind::ALL {
            assert_eq!(HandleKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(HandleKind::from_tag(0x00), None);
        assert_eq!(HandleKind::from_tag(0x7f), None);
    }

    #[test]
    fn display_form() {
        let h = MetadataHandle::new(HandleKind::Property, 12).unwrap();
        assert_eq!(h.to_string(), "property#12");
    }
}
