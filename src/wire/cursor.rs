//! Bounded little-endian reader and writer for packed payloads
//!
//! Every read is checked against the real buffer; nothing here looks at the
//! length declared in the header.

use crate::exceptions::WireError;
use crate::wire::types::Rect;

/// Read cursor over the bytes of one command
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    command: u16,
}

impl<'a> Reader<'a> {
    pub fn new(command: u16, buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            command,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let bytes = &self.buf[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(WireError::Truncated {
                command: self.command,
                needed: self.pos.saturating_add(n),
                available: self.buf.len(),
            }),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.array::<1>()?[0])
    }

    /// One full byte, any non-zero value is true
    pub fn bool(&mut self) -> Result<bool, WireError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn i16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn rect(&mut self) -> Result<Rect, WireError> {
        Ok(Rect {
            x: self.i16()?,
            y: self.i16()?,
            w: self.i16()?,
            h: self.i16()?,
        })
    }

    /// Everything left in the buffer
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }

    /// Exactly `n` bytes, failing if the buffer is shorter
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        self.take(n)
    }

    /// Skip `n` bytes that must exist
    pub fn skip(&mut self, n: usize) -> Result<(), WireError> {
        self.take(n).map(|_| ())
    }

    /// Trailing null-terminated string; an unterminated tail ends at the buffer end.
    pub fn cstring(&mut self) -> Result<&'a str, WireError> {
        let tail = self.rest();
        self.text(tail)
    }

    /// A string region of declared length, cut at the first NUL inside it.
    pub fn text_field(&mut self, len: usize) -> Result<&'a str, WireError> {
        let region = self.take(len)?;
        self.text(region)
    }

    fn text(&self, region: &'a [u8]) -> Result<&'a str, WireError> {
        let end = region.iter().position(|b| *b == 0).unwrap_or(region.len());
        std::str::from_utf8(&region[..end]).map_err(|_| WireError::InvalidText {
            command: self.command,
        })
    }
}

/// Little-endian append helpers for packed payloads
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(u8::from(v))
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn rect(&mut self, r: Rect) -> &mut Self {
        self.i16(r.x).i16(r.y).i16(r.w).i16(r.h)
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(v);
        self
    }

    /// String bytes followed by a terminating NUL
    pub fn cstring(&mut self, v: &str) -> &mut Self {
        self.bytes(v.as_bytes()).u8(0)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_bounded_by_buffer() {
        let mut r = Reader::new(2, &[7, 0, 0]);
        assert_eq!(
            r.u32(),
            Err(WireError::Truncated {
                command: 2,
                needed: 4,
                available: 3
            })
        );
    }

    #[test]
    fn cstring_stops_at_nul_or_end() {
        let mut r = Reader::new(10, b"abc\0def");
        assert_eq!(r.cstring().unwrap(), "abc");
        let mut r = Reader::new(10, b"unterminated");
        assert_eq!(r.cstring().unwrap(), "unterminated");
        let mut r = Reader::new(10, b"");
        assert_eq!(r.cstring().unwrap(), "");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut r = Reader::new(10, &[0xff, 0xfe]);
        assert_eq!(r.cstring(), Err(WireError::InvalidText { command: 10 }));
    }

    #[test]
    fn writer_is_little_endian() {
        let mut w = Writer::default();
        w.u16(0x0102).u32(0x0a0b0c0d).i16(-2);
        assert_eq!(w.into_inner(), vec![2, 1, 0x0d, 0x0c, 0x0b, 0x0a, 0xfe, 0xff]);
    }
}
