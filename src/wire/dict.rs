//! Key/value dictionary layout
//!
//! ```text
//! count:u8 | { key:u32 | type:u8 | length:u16 | value[length] } * count
//! ```
//!
//! Integers are little-endian. The channel carries every message in this
//! layout; packed commands travel as a byte array under key 0.

use crate::exceptions::{DictError, QueueError};
use crate::wire::consts::{
    DICT_HEADER_SIZE, TUPLE_BYTES, TUPLE_CSTRING, TUPLE_HEADER_SIZE, TUPLE_INT, TUPLE_UINT,
};

/// A typed dictionary value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Bytes(&'a [u8]),
    CString(&'a str),
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
}

impl Value<'_> {
    /// Widen any unsigned value, `None` for other types
    pub fn as_uint(&self) -> Option<u32> {
        match *self {
            Value::U8(v) => Some(u32::from(v)),
            Value::U16(v) => Some(u32::from(v)),
            Value::U32(v) => Some(v),
            _ => None,
        }
    }

    /// Widen any signed value, `None` for other types
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Value::I8(v) => Some(i32::from(v)),
            Value::I16(v) => Some(i32::from(v)),
            Value::I32(v) => Some(v),
            _ => None,
        }
    }
}

/// One key/value entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuple<'a> {
    pub key: u32,
    pub value: Value<'a>,
}

/// Bytes needed for a dictionary whose values have the given sizes
pub fn buffer_size(value_sizes: &[usize]) -> usize {
    DICT_HEADER_SIZE + value_sizes.len() * TUPLE_HEADER_SIZE + value_sizes.iter().sum::<usize>()
}

/// Builds one dictionary into an exactly reserved buffer
#[derive(Debug)]
pub struct DictWriter {
    buf: Vec<u8>,
    count: u8,
}

impl DictWriter {
    /// Reserve room for entries of the given value sizes.
    ///
    /// Fails with `QueueError::Allocation` when the buffer cannot be obtained.
    pub fn for_values(value_sizes: &[usize]) -> Result<Self, QueueError> {
        let size = buffer_size(value_sizes);
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| QueueError::Allocation)?;
        buf.push(0);
        Ok(Self { buf, count: 0 })
    }

    fn entry(&mut self, key: u32, kind: u8, value: &[u8]) -> Result<&mut Self, DictError> {
        let len = u16::try_from(value.len()).map_err(|_| DictError::ValueTooLong(value.len()))?;
        self.count = self.count.checked_add(1).ok_or(DictError::TooManyEntries)?;
        self.buf.extend_from_slice(&key.to_le_bytes());
        self.buf.push(kind);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(value);
        self.buf[0] = self.count;
        Ok(self)
    }

    pub fn u8(&mut self, key: u32, v: u8) -> Result<&mut Self, DictError> {
        self.entry(key, TUPLE_UINT, &[v])
    }

    pub fn u16(&mut self, key: u32, v: u16) -> Result<&mut Self, DictError> {
        self.entry(key, TUPLE_UINT, &v.to_le_bytes())
    }

    pub fn u32(&mut self, key: u32, v: u32) -> Result<&mut Self, DictError> {
        self.entry(key, TUPLE_UINT, &v.to_le_bytes())
    }

    pub fn i8(&mut self, key: u32, v: i8) -> Result<&mut Self, DictError> {
        self.entry(key, TUPLE_INT, &v.to_le_bytes())
    }

    pub fn i16(&mut self, key: u32, v: i16) -> Result<&mut Self, DictError> {
        self.entry(key, TUPLE_INT, &v.to_le_bytes())
    }

    pub fn i32(&mut self, key: u32, v: i32) -> Result<&mut Self, DictError> {
        self.entry(key, TUPLE_INT, &v.to_le_bytes())
    }

    pub fn bytes(&mut self, key: u32, v: &[u8]) -> Result<&mut Self, DictError> {
        self.entry(key, TUPLE_BYTES, v)
    }

    /// Null-terminated string entry; the length includes the terminator.
    pub fn cstring(&mut self, key: u32, v: &str) -> Result<&mut Self, DictError> {
        let mut value = Vec::with_capacity(v.len() + 1);
        value.extend_from_slice(v.as_bytes());
        value.push(0);
        self.entry(key, TUPLE_CSTRING, &value)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Parse every entry of a dictionary, borrowing values from `buf`.
pub fn parse(buf: &[u8]) -> Result<Vec<Tuple<'_>>, DictError> {
    let count = *buf.first().ok_or(DictError::Truncated { offset: 0 })?;
    let mut tuples = Vec::with_capacity(usize::from(count));
    let mut pos = DICT_HEADER_SIZE;
    for _ in 0..count {
        let head = buf
            .get(pos..pos + TUPLE_HEADER_SIZE)
            .ok_or(DictError::Truncated { offset: pos })?;
        let key = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
        let kind = head[4];
        let len = usize::from(u16::from_le_bytes([head[5], head[6]]));
        let start = pos + TUPLE_HEADER_SIZE;
        let raw = buf
            .get(start..start + len)
            .ok_or(DictError::Truncated { offset: start })?;
        tuples.push(Tuple {
            key,
            value: value_of(kind, raw, start)?,
        });
        pos = start + len;
    }
    Ok(tuples)
}

/// Find the entry stored under `key`
pub fn find(buf: &[u8], key: u32) -> Result<Option<Tuple<'_>>, DictError> {
    Ok(parse(buf)?.into_iter().find(|t| t.key == key))
}

fn value_of(kind: u8, raw: &[u8], offset: usize) -> Result<Value<'_>, DictError> {
    let bad_width = DictError::Truncated { offset };
    let value = match kind {
        TUPLE_BYTES => Value::Bytes(raw),
        TUPLE_CSTRING => {
            let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
            Value::CString(std::str::from_utf8(&raw[..end]).map_err(|_| bad_width)?)
        }
        TUPLE_UINT => match *raw {
            [a] => Value::U8(a),
            [a, b] => Value::U16(u16::from_le_bytes([a, b])),
            [a, b, c, d] => Value::U32(u32::from_le_bytes([a, b, c, d])),
            _ => return Err(bad_width),
        },
        TUPLE_INT => match *raw {
            [a] => Value::I8(i8::from_le_bytes([a])),
            [a, b] => Value::I16(i16::from_le_bytes([a, b])),
            [a, b, c, d] => Value::I32(i32::from_le_bytes([a, b, c, d])),
            _ => return Err(bad_width),
        },
        other => return Err(DictError::UnknownType(other)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_size_matches_layout() {
        assert_eq!(buffer_size(&[1, 4]), 1 + 14 + 5);
        let mut w = DictWriter::for_values(&[1, 4]).unwrap();
        w.u8(0, 1).unwrap().u32(1, 7).unwrap();
        let bytes = w.finish();
        assert_eq!(bytes.len(), buffer_size(&[1, 4]));
        assert_eq!(
            bytes,
            vec![2, 0, 0, 0, 0, 2, 1, 0, 1, 1, 0, 0, 0, 2, 4, 0, 7, 0, 0, 0]
        );
    }

    #[test]
    fn typed_values_are_read_back() {
        let mut w = DictWriter::for_values(&[1, 1, 2, 3, 6]).unwrap();
        w.u8(0, 6)
            .unwrap()
            .i8(2, -1)
            .unwrap()
            .u16(1, 513)
            .unwrap()
            .bytes(3, &[1, 2, 3])
            .unwrap()
            .cstring(4, "hello")
            .unwrap();
        let bytes = w.finish();
        let tuples = parse(&bytes).unwrap();
        assert_eq!(tuples.len(), 5);
        assert_eq!(tuples[1].value, Value::I8(-1));
        assert_eq!(tuples[1].value.as_int(), Some(-1));
        assert_eq!(find(&bytes, 1).unwrap().unwrap().value.as_uint(), Some(513));
        assert_eq!(find(&bytes, 3).unwrap().unwrap().value, Value::Bytes(&[1, 2, 3]));
        assert_eq!(find(&bytes, 4).unwrap().unwrap().value, Value::CString("hello"));
        assert_eq!(find(&bytes, 9).unwrap(), None);
    }

    #[test]
    fn truncated_dictionary_is_rejected() {
        let mut w = DictWriter::for_values(&[4]).unwrap();
        w.u32(0, 1).unwrap();
        let bytes = w.finish();
        assert!(matches!(
            parse(&bytes[..bytes.len() - 1]),
            Err(DictError::Truncated { .. })
        ));
        assert!(parse(&[]).is_err());
        assert_eq!(parse(&[0]).unwrap(), vec![]);
    }

    #[test]
    fn unknown_tuple_type_is_rejected() {
        let bytes = [1, 0, 0, 0, 0, 9, 1, 0, 0];
        assert_eq!(parse(&bytes), Err(DictError::UnknownType(9)));
    }
}
