//! Per-tag binary layout of constant pool entries.

use std::convert::TryFrom;

use crate::{
    cursor::{ByteReader, ByteWriter},
    entry::*,
    mutf8::{self, Utf8Mode},
    ConstantPoolError, Result,
};

/// Reads a tag byte followed by its payload.
///
/// An unknown tag fails before any payload byte is consumed.
pub fn decode_entry(r: &mut ByteReader, mode: Utf8Mode) -> Result<PoolEntry> {
    let offset = r.position();
    let tag = r.read_u8()?;
    let tag = Tag::try_from(tag).map_err(|tag| ConstantPoolError::UnsupportedTag { tag, offset })?;

    decode_payload(tag, r, mode)
}

pub fn decode_payload(tag: Tag, r: &mut ByteReader, mode: Utf8Mode) -> Result<PoolEntry> {
    let entry = match tag {
        Tag::Utf8 => PoolEntry::Utf8(decode_utf8(r, mode)?),
        Tag::Integer => PoolEntry::Integer(r.read_i32()?),
        Tag::Float => PoolEntry::Float(FloatInfo {
            bits: r.read_u32()?,
        }),
        Tag::Long => PoolEntry::Long(r.read_i64()?),
        Tag::Double => PoolEntry::Double(DoubleInfo {
            bits: r.read_u64()?,
        }),
        Tag::Class => PoolEntry::Class(ClassInfo {
            name_index: r.read_u16()?,
        }),
        Tag::String => PoolEntry::String(StringInfo {
            string_index: r.read_u16()?,
        }),
        Tag::FieldRef => PoolEntry::FieldRef(decode_ref_info(r)?),
        Tag::MethodRef => PoolEntry::MethodRef(decode_ref_info(r)?),
        Tag::InterfaceMethodRef => PoolEntry::InterfaceMethodRef(decode_ref_info(r)?),
        Tag::NameAndType => {
            let name_index = r.read_u16()?;
            let descriptor_index = r.read_u16()?;

            PoolEntry::NameAndType(NameAndTypeInfo {
                name_index,
                descriptor_index,
            })
        }
        Tag::MethodHandle => {
            let reference_kind = r.read_u8()?;
            let reference_index = r.read_u16()?;

            PoolEntry::MethodHandle(MethodHandleInfo {
                reference_kind,
                reference_index,
            })
        }
        Tag::MethodType => PoolEntry::MethodType(MethodTypeInfo {
            descriptor_index: r.read_u16()?,
        }),
        Tag::Dynamic => PoolEntry::Dynamic(decode_dynamic_info(r)?),
        Tag::InvokeDynamic => PoolEntry::InvokeDynamic(decode_dynamic_info(r)?),
        Tag::Module => PoolEntry::Module(ModuleInfo {
            name_index: r.read_u16()?,
        }),
        Tag::Package => PoolEntry::Package(PackageInfo {
            name_index: r.read_u16()?,
        }),
    };

    Ok(entry)
}

fn decode_utf8(r: &mut ByteReader, mode: Utf8Mode) -> Result<Utf8Info> {
    let length = r.read_u16()?;
    let offset = r.position();
    let bytes = r.read_bytes(length as usize)?;

    let text = match mode {
        Utf8Mode::Strict => mutf8::decode(bytes)
            .map_err(|pos| ConstantPoolError::MalformedUtf8 {
                offset: offset + pos,
            })?
            .into_owned(),
        Utf8Mode::Lenient => {
            let (text, replaced) = mutf8::decode_lossy(bytes);
            if replaced {
                log::warn!(
                    "Replaced malformed modified UTF-8 in {} byte entry at offset {}",
                    length,
                    offset
                );
            }
            text.into_owned()
        }
    };

    Ok(Utf8Info::new(bytes.to_vec(), text))
}

fn decode_ref_info(r: &mut ByteReader) -> Result<RefInfo> {
    let class_index = r.read_u16()?;
    let name_and_type_index = r.read_u16()?;

    Ok(RefInfo {
        class_index,
        name_and_type_index,
    })
}

fn decode_dynamic_info(r: &mut ByteReader) -> Result<DynamicInfo> {
    let bootstrap_method_attr_index = r.read_u16()?;
    let name_and_type_index = r.read_u16()?;

    Ok(DynamicInfo {
        bootstrap_method_attr_index,
        name_and_type_index,
    })
}

/// Writes the tag byte and payload of `entry`.
pub fn encode_entry(entry: &PoolEntry, w: &mut ByteWriter) -> Result<()> {
    w.write_u8(entry.tag() as u8)?;

    match entry {
        PoolEntry::Utf8(info) => {
            let bytes = info.as_bytes();
            let length =
                u16::try_from(bytes.len()).map_err(|_| ConstantPoolError::Utf8TooLong(bytes.len()))?;
            w.write_u16(length)?;
            w.write_bytes(bytes)
        }
        PoolEntry::Integer(value) => w.write_i32(*value),
        PoolEntry::Float(info) => w.write_u32(info.bits),
        PoolEntry::Long(value) => w.write_i64(*value),
        PoolEntry::Double(info) => w.write_u64(info.bits),
        PoolEntry::Class(info) => w.write_u16(info.name_index),
        PoolEntry::String(info) => w.write_u16(info.string_index),
        PoolEntry::FieldRef(info)
        | PoolEntry::MethodRef(info)
        | PoolEntry::InterfaceMethodRef(info) => {
            w.write_u16(info.class_index)?;
            w.write_u16(info.name_and_type_index)
        }
        PoolEntry::NameAndType(info) => {
            w.write_u16(info.name_index)?;
            w.write_u16(info.descriptor_index)
        }
        PoolEntry::MethodHandle(info) => {
            w.write_u8(info.reference_kind)?;
            w.write_u16(info.reference_index)
        }
        PoolEntry::MethodType(info) => w.write_u16(info.descriptor_index),
        PoolEntry::Dynamic(info) | PoolEntry::InvokeDynamic(info) => {
            w.write_u16(info.bootstrap_method_attr_index)?;
            w.write_u16(info.name_and_type_index)
        }
        PoolEntry::Module(info) => w.write_u16(info.name_index),
        PoolEntry::Package(info) => w.write_u16(info.name_index),
    }
}


#[cfg(test)]
mod encode_entry_tests {
    use super::*;

    fn encode(entry: &PoolEntry) -> Vec<u8> {
        let mut w = ByteWriter::new();
        encode_entry(entry, &mut w).unwrap();
        w.into_inner()
    }

    #[test]
    fn it_should_emit_the_tag_first() {
        assert_eq!(
            encode(&PoolEntry::Class(ClassInfo { name_index: 0x0102 })),
            vec![7, 0x01, 0x02]
        );
    }

    #[test]
    fn it_should_emit_reference_pairs_in_order() {
        assert_eq!(
            encode(&PoolEntry::InterfaceMethodRef(RefInfo {
                class_index: 1,
                name_and_type_index: 2,
            })),
            vec![11, 0, 1, 0, 2]
        );
    }

    #[test]
    fn it_should_emit_wide_payloads_as_eight_bytes() {
        assert_eq!(
            encode(&PoolEntry::Long(-1)),
            vec![5, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn it_should_reproduce_every_kind_it_decodes() {
        let fixtures: &[&[u8]] = &[
            &[1, 0, 2, 0xc0, 0x80],
            &[3, 0, 0, 0, 42],
            &[4, 0xff, 0x80, 0, 0],
            &[5, 1, 2, 3, 4, 5, 6, 7, 8],
            &[6, 0x7f, 0xf8, 0, 0, 0, 0, 0, 1],
            &[7, 0, 1],
            &[8, 0, 1],
            &[9, 0, 1, 0, 2],
            &[10, 0, 1, 0, 2],
            &[11, 0, 1, 0, 2],
            &[12, 0, 1, 0, 2],
            &[15, 9, 0, 3],
            &[16, 0, 1],
            &[17, 0, 0, 0, 2],
            &[18, 0, 7, 0, 2],
            &[19, 0, 1],
            &[20, 0, 1],
        ];

        for bytes in fixtures {
            let entry = decode_entry(&mut ByteReader::new(bytes), Utf8Mode::Strict).unwrap();
            assert_eq!(&encode(&entry), bytes, "{}", entry);
        }
    }
}
