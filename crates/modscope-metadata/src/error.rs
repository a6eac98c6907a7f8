#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("truncated image while reading {0}")]
    Truncated(&'static str),

    #[error("not a module image (bad magic)")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    #[error("{0} section extends past end of image")]
    SectionOutOfBounds(&'static str),

    #[error("string heap index {0} out of range")]
    BadStringIndex(u32),

    #[error("string at heap index {0} is not valid UTF-8")]
    BadStringEncoding(u32),

    #[error("unterminated string at heap index {0}")]
    UnterminatedString(u32),

    #[error("cannot process handle kind tag {0:#04x}")]
    UnsupportedHandleKind(u8),

    #[error("row {row} out of range for {table} table")]
    BadRowRef { table: &'static str, row: u32 },
}
