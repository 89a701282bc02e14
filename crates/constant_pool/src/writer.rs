use std::convert::TryFrom;

use crate::{
    codec, constant_pool::IndexMap, cursor::ByteWriter, ConstantPool, ConstantPoolError, Result,
};

#[derive(Debug, Default)]
pub struct Writer {
    w: ByteWriter,
}
impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seals `pool` and emits it with its current index assignment.
    ///
    /// A pool that came out of [`Parser`](crate::Parser) is reproduced byte
    /// for byte.
    pub fn write_constant_pool(&mut self, pool: &mut ConstantPool) -> Result<()> {
        pool.seal();

        let constant_pool_count =
            u16::try_from(pool.size()).map_err(|_| ConstantPoolError::PoolOverflow {
                size: pool.size(),
                adding: 0,
            })?;
        let start = self.w.len();

        self.w.write_u16(constant_pool_count)?;
        for (_, entry) in pool.iter() {
            codec::encode_entry(entry, &mut self.w)?;
        }

        log::debug!(
            "Wrote constant pool: count {}, {} bytes",
            constant_pool_count,
            self.w.len() - start
        );

        Ok(())
    }

    /// Emits the canonical form of `pool`: duplicates merged, dependencies
    /// first. Returns the old-to-new index mapping so callers can rewrite
    /// the indices held elsewhere in the class file.
    pub fn write_canonical(&mut self, pool: &ConstantPool) -> Result<IndexMap> {
        let (mut canonical, remap) = pool.canonical()?;
        self.write_constant_pool(&mut canonical)?;

        Ok(remap)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.w.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.w.into_inner()
    }
}

impl ConstantPool {
    /// Seals the pool and encodes it, `constant_pool_count` header included.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        writer.write_constant_pool(self)?;

        Ok(writer.into_bytes())
    }
}

#[cfg(test)]
mod write_constant_pool_tests {
    use super::*;

    #[test]
    fn it_should_emit_count_plus_one() {
        let mut pool = ConstantPool::new();
        pool.add_utf8_str("Hello").unwrap();
        pool.add_long(1).unwrap();

        let bytes = pool.to_bytes().unwrap();

        // Utf8 + Long (two slots) makes count 4.
        assert_eq!(&bytes[..2], &[0x00, 0x04]);
        assert_eq!(bytes.len(), 2 + 8 + 9);
    }

    #[test]
    fn it_should_seal_the_pool() {
        let mut pool = ConstantPool::new();
        pool.add_integer(1).unwrap();

        Writer::new().write_constant_pool(&mut pool).unwrap();

        assert!(pool.is_sealed());
        assert!(matches!(
            pool.add_integer(2),
            Err(ConstantPoolError::ImmutabilityViolation)
        ));
    }

    #[test]
    fn it_should_write_an_empty_pool() {
        assert_eq!(ConstantPool::new().to_bytes().unwrap(), vec![0x00, 0x01]);
    }
}
