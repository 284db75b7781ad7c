//! Seekable little-endian cursor over an in-memory image

use crate::formats::pe::types::{PeError, Result};

/// Random-access reader over a fixed-size byte source.
///
/// Every read is bounds-checked against the source length and advances the
/// position on success. A failed read leaves the position untouched.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'data> {
    data: &'data [u8],
    pos: usize,
}

impl<'data> ByteCursor<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The whole underlying source
    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute seek. Seeking to the end of the source is allowed, past it is not.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        match usize::try_from(offset) {
            Ok(pos) if pos <= self.data.len() => {
                self.pos = pos;
                Ok(())
            }
            _ => Err(PeError::InvalidOffset { offset }),
        }
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    fn take(&mut self, count: usize) -> Result<&'data [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(PeError::Truncated {
                offset: self.pos,
                needed: count,
                available: self.data.len().saturating_sub(self.pos),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.read_array()
    }

    /// Read a NUL-terminated ASCII string of at most `max_len` bytes.
    ///
    /// Reading stops at the first NUL, at `max_len` bytes, or at the end of
    /// the source, whichever comes first. The terminator is consumed.
    /// Non-ASCII bytes decode to `?`.
    pub fn read_cstring(&mut self, max_len: usize) -> Result<String> {
        let start = self.pos;
        // pos never exceeds the source length, so start <= end
        let end = start.saturating_add(max_len).min(self.data.len());
        let window = &self.data[start..end];
        let (len, consumed) = match memchr::memchr(0, window) {
            Some(nul) => (nul, nul + 1),
            None => (window.len(), window.len()),
        };
        self.pos = start + consumed;

        Ok(window[..len]
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect())
    }

    /// Read a string at `offset` without disturbing the current position.
    pub fn read_cstring_at(&mut self, offset: u64, max_len: usize) -> Result<String> {
        let resume = self.pos;
        self.seek(offset)?;
        let result = self.read_cstring(max_len);
        self.pos = resume;
        result
    }
}
