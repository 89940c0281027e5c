//! Big-endian readers and writers for JDWP packet bodies.

use crate::error::JdwpError;
use crate::protocol::{
    is_object_tag, tag, IdSizes, LineEntry, LineTable, Location, Modifier, TypeTag, Value,
};

/// Builds a packet body.
#[derive(Debug)]
pub struct PacketWriter {
    buf: Vec<u8>,
    sizes: IdSizes,
}

impl PacketWriter {
    pub fn new(sizes: IdSizes) -> Self {
        Self {
            buf: Vec::new(),
            sizes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(u8::from(v))
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Strings travel as modified UTF-8.
    pub fn string(&mut self, s: &str) -> &mut Self {
        let bytes = cesu8::to_java_cesu8(s);
        self.i32(bytes.len() as i32);
        self.buf.extend_from_slice(&bytes);
        self
    }

    fn id(&mut self, v: u64, size: usize) -> &mut Self {
        let bytes = v.to_be_bytes();
        let size = size.min(8);
        self.buf.extend_from_slice(&bytes[8 - size..]);
        self
    }

    pub fn object_id(&mut self, v: u64) -> &mut Self {
        self.id(v, self.sizes.object_id)
    }

    pub fn reference_type_id(&mut self, v: u64) -> &mut Self {
        self.id(v, self.sizes.reference_type_id)
    }

    pub fn method_id(&mut self, v: u64) -> &mut Self {
        self.id(v, self.sizes.method_id)
    }

    pub fn field_id(&mut self, v: u64) -> &mut Self {
        self.id(v, self.sizes.field_id)
    }

    pub fn frame_id(&mut self, v: u64) -> &mut Self {
        self.id(v, self.sizes.frame_id)
    }

    pub fn location(&mut self, loc: &Location) -> &mut Self {
        self.u8(loc.type_tag.to_byte());
        self.reference_type_id(loc.class_id);
        self.method_id(loc.method_id);
        self.u64(loc.index)
    }

    pub fn modifier(&mut self, modifier: &Modifier) -> &mut Self {
        match modifier {
            Modifier::Count(count) => self.u8(1).i32(*count),
            Modifier::ThreadOnly(thread) => self.u8(3).object_id(*thread),
            Modifier::ClassMatch(pattern) => self.u8(5).string(pattern),
            Modifier::LocationOnly(loc) => self.u8(7).location(loc),
            Modifier::Step {
                thread,
                size,
                depth,
            } => self.u8(10).object_id(*thread).i32(*size).i32(*depth),
            Modifier::InstanceOnly(object) => self.u8(11).object_id(*object),
        }
    }
}

/// Reads a packet body front to back.
#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
    sizes: IdSizes,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8], sizes: IdSizes) -> Self {
        Self {
            data,
            pos: 0,
            sizes,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], JdwpError> {
        if self.remaining() < n {
            return Err(JdwpError::Decode(format!(
                "need {n} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], JdwpError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, JdwpError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, JdwpError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, JdwpError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn i16(&mut self) -> Result<i16, JdwpError> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32, JdwpError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, JdwpError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, JdwpError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// A non-negative count prefix.
    pub fn count(&mut self) -> Result<usize, JdwpError> {
        let n = self.i32()?;
        usize::try_from(n).map_err(|_| JdwpError::Decode(format!("negative count {n}")))
    }

    /// A modified UTF-8 string: NUL is `C0 80` and supplementary
    /// characters are surrogate pairs.
    pub fn string(&mut self) -> Result<String, JdwpError> {
        let len = self.count()?;
        let bytes = self.take(len)?;
        cesu8::from_java_cesu8(bytes)
            .map(|s| s.into_owned())
            .map_err(|e| JdwpError::Decode(format!("invalid modified UTF-8 string: {e}")))
    }

    fn id(&mut self, size: usize) -> Result<u64, JdwpError> {
        if size == 0 || size > 8 {
            return Err(JdwpError::Decode(format!("unsupported id size {size}")));
        }
        let bytes = self.take(size)?;
        Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    pub fn object_id(&mut self) -> Result<u64, JdwpError> {
        self.id(self.sizes.object_id)
    }

    pub fn reference_type_id(&mut self) -> Result<u64, JdwpError> {
        self.id(self.sizes.reference_type_id)
    }

    pub fn method_id(&mut self) -> Result<u64, JdwpError> {
        self.id(self.sizes.method_id)
    }

    pub fn field_id(&mut self) -> Result<u64, JdwpError> {
        self.id(self.sizes.field_id)
    }

    pub fn frame_id(&mut self) -> Result<u64, JdwpError> {
        self.id(self.sizes.frame_id)
    }

    pub fn type_tag(&mut self) -> Result<TypeTag, JdwpError> {
        let b = self.u8()?;
        TypeTag::from_byte(b).ok_or_else(|| JdwpError::Decode(format!("bad type tag {b}")))
    }

    pub fn location(&mut self) -> Result<Location, JdwpError> {
        Ok(Location {
            type_tag: self.type_tag()?,
            class_id: self.reference_type_id()?,
            method_id: self.method_id()?,
            index: self.u64()?,
        })
    }

    /// A value whose tag is known from context (untagged array regions).
    pub fn untagged_value(&mut self, t: u8) -> Result<Value, JdwpError> {
        Ok(match t {
            tag::BOOLEAN => Value::Boolean(self.bool()?),
            tag::BYTE => Value::Byte(self.u8()? as i8),
            tag::CHAR => Value::Char(self.u16()?),
            tag::SHORT => Value::Short(self.i16()?),
            tag::INT => Value::Int(self.i32()?),
            tag::LONG => Value::Long(self.i64()?),
            tag::FLOAT => Value::Float(f32::from_bits(self.i32()? as u32)),
            tag::DOUBLE => Value::Double(f64::from_bits(self.u64()?)),
            tag::VOID => Value::Void,
            t if is_object_tag(t) => Value::Object {
                tag: t,
                id: self.object_id()?,
            },
            other => return Err(JdwpError::Decode(format!("unknown value tag {other:#04x}"))),
        })
    }

    /// A tag byte followed by its value.
    pub fn value(&mut self) -> Result<Value, JdwpError> {
        let t = self.u8()?;
        self.untagged_value(t)
    }

    /// A tag byte followed by an object id.
    pub fn tagged_object_id(&mut self) -> Result<(u8, u64), JdwpError> {
        let t = self.u8()?;
        Ok((t, self.object_id()?))
    }

    pub fn line_table(&mut self) -> Result<LineTable, JdwpError> {
        let start = self.i64()?;
        let end = self.i64()?;
        let n = self.count()?;
        let mut lines = Vec::with_capacity(n);
        for _ in 0..n {
            lines.push(LineEntry {
                code_index: self.u64()?,
                line: self.i32()?,
            });
        }
        Ok(LineTable { start, end, lines })
    }
}
