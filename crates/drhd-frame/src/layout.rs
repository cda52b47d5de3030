//! Declarative fixed-layout wire structures.
//!
//! A structure is an ordered table of [`FieldSpec`]s. One generic routine
//! decodes any table into [`Fields`] and encodes [`Fields`] back to exactly
//! the declared number of bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Byte order of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// How the bytes of a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Opaque byte array.
    Raw,
    /// Unsigned integer of the field width (1..=8 bytes).
    Uint(ByteOrder),
}

/// Value written for a field the caller did not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Zero,
    Uint(u64),
    Bytes(&'static [u8]),
}

/// One field of a wire structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub kind: FieldKind,
    pub default: FieldDefault,
}

impl FieldSpec {
    /// Raw byte array field defaulting to zeros.
    pub const fn raw(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
            kind: FieldKind::Raw,
            default: FieldDefault::Zero,
        }
    }

    /// Big-endian unsigned integer field defaulting to zero.
    pub const fn be(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
            kind: FieldKind::Uint(ByteOrder::Big),
            default: FieldDefault::Zero,
        }
    }

    /// Replace the default value of this field.
    pub const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    fn default_value(&self) -> FieldValue {
        match (self.kind, self.default) {
            (FieldKind::Raw, FieldDefault::Bytes(bytes)) => {
                FieldValue::Raw(Bytes::from_static(bytes))
            }
            (FieldKind::Raw, _) => FieldValue::Raw(Bytes::new()),
            (FieldKind::Uint(_), FieldDefault::Uint(v)) => FieldValue::Uint(v),
            (FieldKind::Uint(ByteOrder::Big), FieldDefault::Bytes(b)) => {
                FieldValue::Uint(b.iter().fold(0u64, |acc, &x| (acc << 8) | u64::from(x)))
            }
            (FieldKind::Uint(ByteOrder::Little), FieldDefault::Bytes(b)) => {
                FieldValue::Uint(b.iter().rev().fold(0u64, |acc, &x| (acc << 8) | u64::from(x)))
            }
            (FieldKind::Uint(_), FieldDefault::Zero) => FieldValue::Uint(0),
        }
    }
}

/// A decoded or to-be-encoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Uint(u64),
    Raw(Bytes),
}

/// Named field values, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    values: Vec<(&'static str, FieldValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value, replacing any earlier value for the same name.
    pub fn set(&mut self, name: &'static str, value: FieldValue) -> &mut Self {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name, value)),
        }
        self
    }

    /// Set an integer field.
    pub fn set_uint(&mut self, name: &'static str, value: u64) -> &mut Self {
        self.set(name, FieldValue::Uint(value))
    }

    /// Set a raw byte field.
    pub fn set_raw(&mut self, name: &'static str, value: impl Into<Bytes>) -> &mut Self {
        self.set(name, FieldValue::Raw(value.into()))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn uint(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(FieldValue::Uint(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn raw(&self, name: &str) -> Option<&[u8]> {
        match self.get(name) {
            Some(FieldValue::Raw(v)) => Some(v.as_ref()),
            _ => None,
        }
    }

    /// Integer field that a decoded structure must contain.
    pub fn require_uint(&self, name: &'static str) -> Result<u64> {
        self.uint(name).ok_or(FrameError::MissingField(name))
    }

    /// Raw field that a decoded structure must contain.
    pub fn require_raw(&self, name: &'static str) -> Result<&[u8]> {
        self.raw(name).ok_or(FrameError::MissingField(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A fixed-size wire structure.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [FieldSpec],
}

impl Layout {
    /// Decode `data` into named fields.
    ///
    /// Fails with [`FrameError::Format`] if `data` is not exactly `size` bytes.
    pub fn decode(&self, data: &[u8]) -> Result<Fields> {
        if data.len() != self.size {
            return Err(FrameError::Format {
                structure: self.name,
                expected: self.size,
                actual: data.len(),
            });
        }

        let mut fields = Fields {
            values: Vec::with_capacity(self.fields.len()),
        };
        for spec in self.fields {
            let mut slice = &data[spec.offset..spec.offset + spec.width];
            let value = match spec.kind {
                FieldKind::Raw => FieldValue::Raw(Bytes::copy_from_slice(slice)),
                FieldKind::Uint(ByteOrder::Big) => FieldValue::Uint(slice.get_uint(spec.width)),
                FieldKind::Uint(ByteOrder::Little) => {
                    FieldValue::Uint(slice.get_uint_le(spec.width))
                }
            };
            fields.values.push((spec.name, value));
        }
        Ok(fields)
    }

    /// Encode `fields` into exactly `size` bytes.
    ///
    /// Unset fields take their declared default. Integers are written as
    /// their low `width` bytes; raw values are zero-padded or cut to `width`.
    pub fn encode(&self, fields: &Fields) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.size);
        for spec in self.fields {
            debug_assert_eq!(dst.len(), spec.offset, "field '{}' out of place", spec.name);
            let value = fields
                .get(spec.name)
                .cloned()
                .unwrap_or_else(|| spec.default_value());
            match (spec.kind, value) {
                (FieldKind::Uint(order), FieldValue::Uint(v)) => {
                    put_uint(&mut dst, v, spec.width, order)
                }
                (FieldKind::Raw, FieldValue::Uint(v)) => {
                    put_uint(&mut dst, v, spec.width, ByteOrder::Big)
                }
                // Wire bytes are copied as-is, whatever the field kind.
                (_, FieldValue::Raw(bytes)) => put_raw(&mut dst, &bytes, spec.width),
            }
        }
        dst.freeze()
    }
}

fn put_uint(dst: &mut BytesMut, value: u64, width: usize, order: ByteOrder) {
    match order {
        ByteOrder::Big => dst.put_uint(value, width),
        ByteOrder::Little => dst.put_uint_le(value, width),
    }
}

fn put_raw(dst: &mut BytesMut, bytes: &[u8], width: usize) {
    let n = bytes.len().min(width);
    dst.put_slice(&bytes[..n]);
    dst.put_bytes(0, width - n);
}

#[cfg(test)]
pub(crate) fn assert_contiguous(layout: &Layout) {
    let mut offset = 0;
    for spec in layout.fields {
        assert_eq!(spec.offset, offset, "{}.{} offset", layout.name, spec.name);
        if let FieldKind::Uint(_) = spec.kind {
            assert!((1..=8).contains(&spec.width), "{}.{} width", layout.name, spec.name);
        }
        offset += spec.width;
    }
    assert_eq!(offset, layout.size, "{} size", layout.name);
}
