//! Minimal binary tag (NBT) writer.
//!
//! Only what the engine sends is supported: the registry codecs, item data and
//! chat components. Compounds keep insertion order so encodings are stable.

use bytes::BufMut;

use crate::protocol::version::ProtocolVersion;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    fn id(&self) -> u8 {
        match self {
            Tag::Byte(_) => TAG_BYTE,
            Tag::Short(_) => TAG_SHORT,
            Tag::Int(_) => TAG_INT,
            Tag::Long(_) => TAG_LONG,
            Tag::Float(_) => TAG_FLOAT,
            Tag::Double(_) => TAG_DOUBLE,
            Tag::ByteArray(_) => TAG_BYTE_ARRAY,
            Tag::String(_) => TAG_STRING,
            Tag::List(_) => TAG_LIST,
            Tag::Compound(_) => TAG_COMPOUND,
            Tag::IntArray(_) => TAG_INT_ARRAY,
            Tag::LongArray(_) => TAG_LONG_ARRAY,
        }
    }

    fn write_payload<B: BufMut + ?Sized>(&self, dst: &mut B) {
        match self {
            Tag::Byte(v) => dst.put_i8(*v),
            Tag::Short(v) => dst.put_i16(*v),
            Tag::Int(v) => dst.put_i32(*v),
            Tag::Long(v) => dst.put_i64(*v),
            Tag::Float(v) => dst.put_f32(*v),
            Tag::Double(v) => dst.put_f64(*v),
            Tag::ByteArray(values) => {
                dst.put_i32(values.len() as i32);
                for v in values {
                    dst.put_i8(*v);
                }
            }
            Tag::String(v) => write_modified_utf8(dst, v),
            Tag::List(items) => {
                let element = items.first().map(Tag::id).unwrap_or(TAG_END);
                dst.put_u8(element);
                dst.put_i32(items.len() as i32);
                for item in items {
                    item.write_payload(dst);
                }
            }
            Tag::Compound(compound) => compound.write_body(dst),
            Tag::IntArray(values) => {
                dst.put_i32(values.len() as i32);
                for v in values {
                    dst.put_i32(*v);
                }
            }
            Tag::LongArray(values) => {
                dst.put_i32(values.len() as i32);
                for v in values {
                    dst.put_i64(*v);
                }
            }
        }
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_owned())
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag::String(value)
    }
}

impl From<Compound> for Tag {
    fn from(value: Compound) -> Self {
        Tag::Compound(value)
    }
}

impl From<bool> for Tag {
    fn from(value: bool) -> Self {
        Tag::Byte(value as i8)
    }
}

impl From<i32> for Tag {
    fn from(value: i32) -> Self {
        Tag::Int(value)
    }
}

impl From<f32> for Tag {
    fn from(value: f32) -> Self {
        Tag::Float(value)
    }
}

impl From<f64> for Tag {
    fn from(value: f64) -> Self {
        Tag::Double(value)
    }
}

/// Ordered compound tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    entries: Vec<(String, Tag)>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Tag>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Tag>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key.to_owned(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn write_body<B: BufMut + ?Sized>(&self, dst: &mut B) {
        for (key, value) in &self.entries {
            dst.put_u8(value.id());
            write_modified_utf8(dst, key);
            value.write_payload(dst);
        }
        dst.put_u8(TAG_END);
    }

    /// Write as a network root tag.
    ///
    /// Before 1.20.2 the root carries an (empty) name; newer revisions omit it.
    pub fn write_root<B: BufMut + ?Sized>(&self, dst: &mut B, version: ProtocolVersion) {
        dst.put_u8(TAG_COMPOUND);
        if version < ProtocolVersion::V1_20_2 {
            dst.put_u16(0);
        }
        self.write_body(dst);
    }

    /// Write as a nameless root tag regardless of revision.
    pub fn write_nameless<B: BufMut + ?Sized>(&self, dst: &mut B) {
        dst.put_u8(TAG_COMPOUND);
        self.write_body(dst);
    }
}

/// Java's modified UTF-8: NUL becomes two bytes and supplementary characters
/// are written as encoded surrogate pairs.
fn write_modified_utf8<B: BufMut + ?Sized>(dst: &mut B, value: &str) {
    let mut encoded = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => encoded.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                encoded.push((0xC0 | ((unit >> 6) & 0x1F)) as u8);
                encoded.push((0x80 | (unit & 0x3F)) as u8);
            }
            _ => {
                encoded.push((0xE0 | ((unit >> 12) & 0x0F)) as u8);
                encoded.push((0x80 | ((unit >> 6) & 0x3F)) as u8);
                encoded.push((0x80 | (unit & 0x3F)) as u8);
            }
        }
    }
    dst.put_u16(encoded.len() as u16);
    dst.put_slice(&encoded);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_nameless_roots() {
        let tag = Compound::new().with("a", 1i32);

        let mut legacy = Vec::new();
        tag.write_root(&mut legacy, ProtocolVersion::V1_19_4);
        assert_eq!(
            legacy,
            vec![10, 0, 0, TAG_INT, 0, 1, b'a', 0, 0, 0, 1, TAG_END]
        );

        let mut modern = Vec::new();
        tag.write_root(&mut modern, ProtocolVersion::V1_20_2);
        assert_eq!(modern, vec![10, TAG_INT, 0, 1, b'a', 0, 0, 0, 1, TAG_END]);
    }

    #[test]
    fn test_empty_list_uses_end_type() {
        let mut out = Vec::new();
        Tag::List(Vec::new()).write_payload(&mut out);
        assert_eq!(out, vec![TAG_END, 0, 0, 0, 0]);
    }

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut tag = Compound::new().with("k", "v1");
        tag.insert("k", "v2");
        assert_eq!(tag.len(), 1);
        assert_eq!(tag.get("k"), Some(&Tag::String("v2".into())));
    }

    #[test]
    fn test_modified_utf8_nul() {
        let mut out = Vec::new();
        write_modified_utf8(&mut out, "\0");
        assert_eq!(out, vec![0, 2, 0xC0, 0x80]);
    }
}
