//! Reader and writer for the big-endian named tag format used by persisted chunks.

use crate::core::SmallKeyHashMap;

use thiserror::Error;

/// Nesting beyond this depth is rejected instead of risking the stack.
pub const MAX_TAG_DEPTH: usize = 512;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TagError {
    #[error("unexpected end of tag data at byte {0}")]
    UnexpectedEof(usize),
    #[error("invalid tag id {0}")]
    InvalidTagId(u8),
    #[error("negative length {0}")]
    NegativeLength(i32),
    #[error("tags nested too deeply")]
    TooDeep,
    #[error("root tag is not a compound")]
    RootNotCompound,
}

#[derive(Clone, Debug, PartialEq)]
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

const END_ID: u8 = 0;
const COMPOUND_ID: u8 = 10;

impl Tag {
    pub fn id(&self) -> u8 {
        match self {
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Integer value of any integral tag.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Tag::Byte(v) => Some(v.into()),
            Tag::Short(v) => Some(v.into()),
            Tag::Int(v) => Some(v.into()),
            Tag::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(l) => Some(l),
            _ => None,
        }
    }
}

macro_rules! impl_tag_from {
    ($t: ty, $variant: ident) => {
        impl From<$t> for Tag {
            fn from(v: $t) -> Self {
                Tag::$variant(v)
            }
        }
    };
}

impl_tag_from!(i8, Byte);
impl_tag_from!(i16, Short);
impl_tag_from!(i32, Int);
impl_tag_from!(i64, Long);
impl_tag_from!(f32, Float);
impl_tag_from!(f64, Double);
impl_tag_from!(Vec<i8>, ByteArray);
impl_tag_from!(String, String);
impl_tag_from!(Vec<Tag>, List);
impl_tag_from!(Compound, Compound);
impl_tag_from!(Vec<i32>, IntArray);
impl_tag_from!(Vec<i64>, LongArray);

impl From<&str> for Tag {
    fn from(v: &str) -> Self {
        Tag::String(v.to_string())
    }
}

impl From<bool> for Tag {
    fn from(v: bool) -> Self {
        Tag::Byte(v as i8)
    }
}

/// An unordered map of named tags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Compound {
    entries: SmallKeyHashMap<String, Tag>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, tag: impl Into<Tag>) -> Self {
        self.insert(name, tag);
        self
    }

    pub fn insert(&mut self, name: &str, tag: impl Into<Tag>) {
        self.entries.insert(name.to_string(), tag.into());
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
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

    pub fn get_i8(&self, name: &str) -> Option<i8> {
        match self.get(name)? {
            Tag::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_i8(name).map(|v| v != 0)
    }

    /// Any integral tag that fits an `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get(name)?.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_i64()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn get_compound(&self, name: &str) -> Option<&Compound> {
        self.get(name)?.as_compound()
    }

    pub fn get_list(&self, name: &str) -> Option<&[Tag]> {
        self.get(name)?.as_list()
    }

    pub fn get_byte_array(&self, name: &str) -> Option<&[i8]> {
        match self.get(name)? {
            Tag::ByteArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_int_array(&self, name: &str) -> Option<&[i32]> {
        match self.get(name)? {
            Tag::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_long_array(&self, name: &str) -> Option<&[i64]> {
        match self.get(name)? {
            Tag::LongArray(v) => Some(v),
            _ => None,
        }
    }
}

/// Parses an uncompressed tag tree whose root is a (named) compound.
pub fn read_root(bytes: &[u8]) -> Result<Compound, TagError> {
    let mut reader = Reader { bytes, pos: 0 };
    let id = reader.u8()?;
    if id != COMPOUND_ID {
        return Err(TagError::RootNotCompound);
    }
    let _root_name = reader.string()?;
    reader.compound(0)
}

/// Writes `root` as an unnamed root compound.
pub fn write_root(root: &Compound) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(COMPOUND_ID);
    write_string(&mut out, "");
    write_compound(&mut out, root);
    out
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], TagError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(TagError::UnexpectedEof(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TagError> {
        let mut a = [0; N];
        a.copy_from_slice(self.take(N)?);
        Ok(a)
    }

    fn u8(&mut self) -> Result<u8, TagError> {
        Ok(self.array::<1>()?[0])
    }

    fn i16(&mut self) -> Result<i16, TagError> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, TagError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, TagError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    fn length(&mut self) -> Result<usize, TagError> {
        let len = self.i32()?;
        if len < 0 {
            return Err(TagError::NegativeLength(len));
        }
        Ok(len as usize)
    }

    fn string(&mut self) -> Result<String, TagError> {
        let len = u16::from_be_bytes(self.array()?) as usize;
        // Modified UTF-8 only differs for NUL and supplementary characters.
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    fn compound(&mut self, depth: usize) -> Result<Compound, TagError> {
        if depth > MAX_TAG_DEPTH {
            return Err(TagError::TooDeep);
        }
        let mut compound = Compound::new();
        loop {
            let id = self.u8()?;
            if id == END_ID {
                return Ok(compound);
            }
            let name = self.string()?;
            let tag = self.payload(id, depth + 1)?;
            compound.entries.insert(name, tag);
        }
    }

    fn payload(&mut self, id: u8, depth: usize) -> Result<Tag, TagError> {
        let tag = match id {
            1 => Tag::Byte(self.u8()? as i8),
            2 => Tag::Short(self.i16()?),
            3 => Tag::Int(self.i32()?),
            4 => Tag::Long(self.i64()?),
            5 => Tag::Float(f32::from_be_bytes(self.array()?)),
            6 => Tag::Double(f64::from_be_bytes(self.array()?)),
            7 => {
                let len = self.length()?;
                Tag::ByteArray(self.take(len)?.iter().map(|&b| b as i8).collect())
            }
            8 => Tag::String(self.string()?),
            9 => {
                if depth > MAX_TAG_DEPTH {
                    return Err(TagError::TooDeep);
                }
                let element_id = self.u8()?;
                let len = self.length()?;
                if element_id == END_ID {
                    if len > 0 {
                        return Err(TagError::InvalidTagId(END_ID));
                    }
                    return Ok(Tag::List(Vec::new()));
                }
                // Don't trust the length for preallocation.
                let mut elements = Vec::with_capacity(len.min(self.bytes.len() - self.pos));
                for _ in 0..len {
                    elements.push(self.payload(element_id, depth + 1)?);
                }
                Tag::List(elements)
            }
            10 => Tag::Compound(self.compound(depth)?),
            11 => {
                let len = self.length()?;
                let bytes = self.take(len.checked_mul(4).ok_or(TagError::UnexpectedEof(self.pos))?)?;
                Tag::IntArray(
                    bytes
                        .chunks_exact(4)
                        .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                )
            }
            12 => {
                let len = self.length()?;
                let bytes = self.take(len.checked_mul(8).ok_or(TagError::UnexpectedEof(self.pos))?)?;
                Tag::LongArray(
                    bytes
                        .chunks_exact(8)
                        .map(|c| {
                            let mut a = [0; 8];
                            a.copy_from_slice(c);
                            i64::from_be_bytes(a)
                        })
                        .collect(),
                )
            }
            other => return Err(TagError::InvalidTagId(other)),
        };
        Ok(tag)
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u16::MAX as usize);
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.extend_from_slice(&bytes[..len]);
}

fn write_compound(out: &mut Vec<u8>, compound: &Compound) {
    for (name, tag) in compound.entries.iter() {
        out.push(tag.id());
        write_string(out, name);
        write_payload(out, tag);
    }
    out.push(END_ID);
}

fn write_payload(out: &mut Vec<u8>, tag: &Tag) {
    match tag {
        Tag::Byte(v) => out.push(*v as u8),
        Tag::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::ByteArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            out.extend(v.iter().map(|&b| b as u8));
        }
        Tag::String(s) => write_string(out, s),
        Tag::List(elements) => {
            let element_id = elements.first().map_or(END_ID, Tag::id);
            out.push(element_id);
            out.extend_from_slice(&(elements.len() as i32).to_be_bytes());
            for element in elements {
                debug_assert_eq!(element.id(), element_id);
                write_payload(out, element);
            }
        }
        Tag::Compound(c) => write_compound(out, c),
        Tag::IntArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            for x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
        }
        Tag::LongArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            for x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
