use crate::{codec, cursor::ByteReader, mutf8::Utf8Mode, ConstantPool, ConstantPoolError, Result};

const MAGIC: u32 = 0xCAFEBABE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub utf8: Utf8Mode,
}

/// The part of a class file this crate understands: everything up to and
/// including the constant pool.
#[derive(Debug)]
pub struct ClassPrefix {
    /// `(major, minor)`
    pub version: (u16, u16),
    pub constant_pool: ConstantPool,
    /// Offset of `access_flags`, the first byte after the constant pool.
    pub body_offset: usize,
}

pub struct Parser<'a> {
    r: ByteReader<'a>,
    options: ParseOptions,
}
impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_options(buf, ParseOptions::default())
    }

    pub fn with_options(buf: &'a [u8], options: ParseOptions) -> Self {
        Self {
            r: ByteReader::new(buf),
            options,
        }
    }

    pub fn position(&self) -> usize {
        self.r.position()
    }

    pub fn parse_class_prefix(&mut self) -> Result<ClassPrefix> {
        self.parse_magic_identifier()?;
        let version = self.parse_version()?;
        let constant_pool = self.parse_constant_pool()?;

        Ok(ClassPrefix {
            version,
            constant_pool,
            body_offset: self.position(),
        })
    }

    /// Reads `constant_pool_count` and the `count - 1` slots that follow.
    ///
    /// The first failure aborts the whole pool: later entries may refer to
    /// any earlier index, so a partial pool is never returned.
    pub fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.r.read_u16()?;
        if constant_pool_count == 0 {
            return Err(ConstantPoolError::InvalidPoolCount(constant_pool_count));
        }

        let usable = constant_pool_count as usize - 1;
        let mut slots = Vec::with_capacity(usable);
        while slots.len() < usable {
            let index = slots.len() + 1;
            let entry = codec::decode_entry(&mut self.r, self.options.utf8)?;
            log::trace!("#{} = {}", index, entry);

            let slot_size = entry.slot_width() as usize;
            if slots.len() + slot_size > usable {
                // A wide entry in the last slot would need an index past the end.
                return Err(ConstantPoolError::IndexOutOfRange {
                    index: (index + 1) as u16,
                    size: constant_pool_count as usize,
                });
            }

            slots.push(Some(entry));
            (1..slot_size).for_each(|_| slots.push(None));
        }

        log::debug!(
            "Parsed constant pool: count {}, ended at offset {}",
            constant_pool_count,
            self.position()
        );

        Ok(ConstantPool::from_slots(slots))
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.r.read_u32()? {
            MAGIC => Ok(()),
            magic_identifier => Err(ConstantPoolError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.r.read_u16()?;
        let major = self.r.read_u16()?;
        Ok((major, minor))
    }
}

impl ConstantPool {
    /// Parses a constant pool, `constant_pool_count` header included, in
    /// strict Utf8 mode.
    pub fn parse(bytes: &[u8]) -> Result<ConstantPool> {
        Parser::new(bytes).parse_constant_pool()
    }
}


#[cfg(test)]
mod parse_version_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_a_version() {
        assert_eq!(
            Parser::new(&[0x00, 0x03, 0x00, 0x3d]).parse_version().unwrap(),
            (61, 3)
        );
    }
}

#[cfg(test)]
mod parse_constant_pool_tests {
    use crate::{PoolEntry, Tag};

    use super::*;

    #[test]
    fn it_should_parse_an_empty_pool() {
        let pool = ConstantPool::parse(&[0x00, 0x01]).unwrap();

        assert!(pool.is_empty());
        assert_eq!(pool.size(), 1);
        assert!(pool.is_sealed());
    }

    #[test]
    fn it_should_reject_a_zero_count() {
        assert!(matches!(
            ConstantPool::parse(&[0x00, 0x00]),
            Err(ConstantPoolError::InvalidPoolCount(0))
        ));
    }

    #[test]
    fn it_should_reserve_the_slot_after_a_wide_entry() {
        let bytes = [
            0x00, 0x04, // count
            5, 0, 0, 0, 0, 0, 0, 0, 9, // #1 Long, #2 shadow
            3, 0, 0, 0, 1, // #3 Integer
        ];
        let pool = ConstantPool::parse(&bytes).unwrap();

        assert_eq!(pool.long(1).unwrap(), 9);
        assert!(matches!(
            pool.entry(2),
            Err(ConstantPoolError::IndexOutOfRange { index: 2, .. })
        ));
        assert_eq!(pool.get(3, Tag::Integer).unwrap(), &PoolEntry::Integer(1));
    }

    #[test]
    fn it_should_reject_a_wide_entry_in_the_last_slot() {
        let bytes = [0x00, 0x02, 6, 0, 0, 0, 0, 0, 0, 0, 0];

        assert!(matches!(
            ConstantPool::parse(&bytes),
            Err(ConstantPoolError::IndexOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn it_should_stop_at_the_first_unsupported_tag() {
        let bytes = [0x00, 0x03, 99, 1, 0, 1, b'x'];
        let mut parser = Parser::new(&bytes);

        assert!(matches!(
            parser.parse_constant_pool(),
            Err(ConstantPoolError::UnsupportedTag { tag: 99, offset: 2 })
        ));
        assert_eq!(parser.position(), 3);
    }

    #[test]
    fn it_should_honour_lenient_utf8_mode() {
        let bytes = [0x00, 0x02, 1, 0x00, 0x01, 0xff];

        assert!(matches!(
            ConstantPool::parse(&bytes),
            Err(ConstantPoolError::MalformedUtf8 { offset: 5 })
        ));

        let pool = Parser::with_options(
            &bytes,
            ParseOptions {
                utf8: Utf8Mode::Lenient,
            },
        )
        .parse_constant_pool()
        .unwrap();
        assert_eq!(pool.utf8(1).unwrap(), "\u{FFFD}");
    }
}
