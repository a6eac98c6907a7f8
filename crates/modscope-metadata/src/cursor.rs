use crate::error::MetadataError;

/// Bounds-checked little-endian reader over a byte slice. Every read names
/// the field it was after so truncation errors stay diagnosable.
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn skip(&mut self, n: usize, what: &'static str) -> Result<(), MetadataError> {
        if self.remaining() < n {
            return Err(MetadataError::Truncated(what));
        }
        self.pos += n;
        Ok(())
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8, MetadataError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(MetadataError::Truncated(what))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16(&mut self, what: &'static str) -> Result<u16, MetadataError> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32, MetadataError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], MetadataError> {
        if self.remaining() < n {
            return Err(MetadataError::Truncated(what));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

/// Checked sub-slice of an image, used to carve out the header-declared
/// sections before parsing them.
pub(crate) fn section<'a>(
    data: &'a [u8],
    offset: u32,
    len: u32,
    what: &'static str,
) -> Result<&'a [u8], MetadataError> {
    let start = offset as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or(MetadataError::SectionOutOfBounds(what))?;
    if end > data.len() {
        return Err(MetadataError::SectionOutOfBounds(what));
    }
    Ok(&data[start..end])
}

/// Resolves a heap index to its NUL-terminated UTF-8 string. Index 0 is the
/// canonical empty string.
pub(crate) fn heap_string(heap: &[u8], idx: u32) -> Result<&str, MetadataError> {
    if idx == 0 {
        return Ok("");
    }
    let start = idx as usize;
    if start >= heap.len() {
        return Err(MetadataError::BadStringIndex(idx));
    }
    let rest = &heap[start..];
    let end = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(MetadataError::UnterminatedString(idx))?;
    std::str::from_utf8(&rest[..end]).map_err(|_| MetadataError::BadStringEncoding(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_bounds_checked() {
        let mut c = Cursor::new(&[0x01, 0x02, 0x03]);
        assert_eq!(c.read_u16("x").unwrap(), 0x0201);
        assert_eq!(c.read_u32("y"), Err(MetadataError::Truncated("y")));
        // failed read must not advance
        assert_eq!(c.read_u8("z").unwrap(), 0x03);
    }

    #[test]
    fn section_rejects_overflow() {
        let data = [0u8; 8];
        assert!(section(&data, 4, 4, "t").is_ok());
        assert_eq!(
            section(&data, 4, 5, "t"),
            Err(MetadataError::SectionOutOfBounds("t"))
        );
        assert_eq!(
            section(&data, u32::MAX, u32::MAX, "t"),
            Err(MetadataError::SectionOutOfBounds("t"))
        );
    }
}
