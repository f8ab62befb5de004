use crate::{DxbcError, FourCC};

/// Bounds-checked sequential reader over a borrowed byte slice.
///
/// The reader owns no bytes; it tracks a cursor position within the slice it
/// was created over. Any read past the end of the slice fails with
/// [`DxbcError::EndOfStream`], which aborts parsing of the surrounding
/// structure; there is no partial recovery at this level.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor position, in bytes from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes remaining after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], DxbcError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(DxbcError::EndOfStream {
                context: format!(
                    "reading {what} ({n} bytes) at offset {}, {} bytes remain",
                    self.pos,
                    self.remaining()
                ),
            }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, DxbcError> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DxbcError> {
        let b = self.take(2, "u16")?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DxbcError> {
        let b = self.take(4, "u32")?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, DxbcError> {
        let b = self.take(8, "u64")?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_i32(&mut self) -> Result<i32, DxbcError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32, DxbcError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DxbcError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads exactly four bytes as an opaque chunk tag.
    pub fn read_tag(&mut self) -> Result<FourCC, DxbcError> {
        let b = self.take(4, "tag")?;
        Ok(FourCC([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a null-terminated 8-bit string and validates it as UTF-8.
    ///
    /// Fails if no terminator is found within the remaining bytes.
    pub fn read_string(&mut self) -> Result<String, DxbcError> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(DxbcError::EndOfStream {
                context: format!(
                    "string at offset {} has no null terminator",
                    self.pos
                ),
            });
        };
        let s = std::str::from_utf8(&rest[..len]).map_err(|_| DxbcError::InvalidChunk {
            context: format!("string at offset {} is not valid UTF-8", self.pos),
        })?;
        self.pos += len + 1;
        Ok(s.to_owned())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DxbcError> {
        self.take(n, "bytes")
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DxbcError> {
        self.take(n, "skipped bytes")?;
        Ok(())
    }

    /// Returns a fresh reader positioned at `offset` within the same slice.
    pub fn clone_at(&self, offset: usize) -> Result<Reader<'a>, DxbcError> {
        if offset > self.data.len() {
            return Err(DxbcError::OutOfBounds {
                context: format!(
                    "clone offset {offset} exceeds slice length {}",
                    self.data.len()
                ),
            });
        }
        Ok(Reader {
            data: self.data,
            pos: offset,
        })
    }

    /// Returns a reader over the first `len` bytes of the slice, keeping the
    /// current position.
    pub fn truncate(&self, len: usize) -> Result<Reader<'a>, DxbcError> {
        if len > self.data.len() {
            return Err(DxbcError::OutOfBounds {
                context: format!(
                    "truncate length {len} exceeds slice length {}",
                    self.data.len()
                ),
            });
        }
        Ok(Reader {
            data: &self.data[..len],
            pos: self.pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_reads_advance_cursor() {
        let bytes = [1u8, 0, 0, 0, 0x41, 0x42, 0x43, 0x44];
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 1);
        assert_eq!(r.read_tag().unwrap(), FourCC(*b"ABCD"));
        assert!(r.is_at_end());
    }

    #[test]
    fn read_past_end_is_end_of_stream() {
        let mut r = Reader::new(&[1u8, 2]);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(err, DxbcError::EndOfStream { .. }));
        assert!(err.context().contains("u32"));
    }

    #[test]
    fn read_string_requires_terminator() {
        let mut r = Reader::new(b"abc");
        let err = r.read_string().unwrap_err();
        assert!(err.context().contains("null terminator"));

        let mut r = Reader::new(b"abc\0def\0");
        assert_eq!(r.read_string().unwrap(), "abc");
        assert_eq!(r.read_string().unwrap(), "def");
    }

    #[test]
    fn skip_is_bounds_checked() {
        let mut r = Reader::new(&[0u8; 4]);
        assert!(r.skip(4).is_ok());
        assert!(r.skip(1).is_err());
    }
}
