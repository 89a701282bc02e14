use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{ConstantPoolError, Result};

type Endian = BigEndian;

/// Bounds-checked big-endian reader over an in-memory buffer.
///
/// Every read checks the remaining length first, so a short buffer surfaces as
/// [`ConstantPoolError::TruncatedInput`] with the offset where it happened
/// rather than as an opaque I/O error.
pub struct ByteReader<'a> {
    r: Cursor<&'a [u8]>,
}
impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            r: Cursor::new(buf),
        }
    }

    pub fn position(&self) -> usize {
        self.r.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.r.get_ref().len().saturating_sub(self.position())
    }

    pub fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(ConstantPoolError::TruncatedInput {
                offset: self.position(),
                needed,
                remaining,
            });
        }

        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.r.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.r.read_u16::<Endian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.r.read_u32::<Endian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.r.read_i32::<Endian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.r.read_u64::<Endian>()?)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.r.read_i64::<Endian>()?)
    }

    /// Borrows the next `n` bytes out of the underlying buffer.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let start = self.position();
        let buf: &'a [u8] = *self.r.get_ref();
        self.r.set_position((start + n) as u64);

        Ok(&buf[start..start + n])
    }
}

/// Append-only big-endian writer, the mirror of [`ByteReader`].
#[derive(Debug, Default)]
pub struct ByteWriter {
    w: Vec<u8>,
}
impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.w
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.w
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.w.write_u8(value)?)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.w.write_u16::<Endian>(value)?)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.w.write_u32::<Endian>(value)?)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        Ok(self.w.write_i32::<Endian>(value)?)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        Ok(self.w.write_u64::<Endian>(value)?)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        Ok(self.w.write_i64::<Endian>(value)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.w.extend_from_slice(bytes);
        Ok(())
    }
}


#[cfg(test)]
mod byte_writer_tests {
    use super::*;

    #[test]
    fn it_should_mirror_the_reader() {
        let mut w = ByteWriter::new();
        w.write_u8(7).unwrap();
        w.write_u16(0xbeef).unwrap();
        w.write_i64(-2).unwrap();
        w.write_bytes(b"ok").unwrap();

        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16().unwrap(), 0xbeef);
        assert_eq!(r.read_i64().unwrap(), -2);
        assert_eq!(r.read_bytes(2).unwrap(), b"ok");
    }
}
