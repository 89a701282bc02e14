use std::{
    convert::TryFrom,
    fmt,
    hash::{Hash, Hasher},
};

use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}
impl Tag {
    /// Number of pool indices an entry of this kind occupies.
    pub fn slot_width(self) -> u16 {
        match self {
            Tag::Long | Tag::Double => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Utf8 => "Utf8",
            Tag::Integer => "Integer",
            Tag::Float => "Float",
            Tag::Long => "Long",
            Tag::Double => "Double",
            Tag::Class => "Class",
            Tag::String => "String",
            Tag::FieldRef => "Fieldref",
            Tag::MethodRef => "Methodref",
            Tag::InterfaceMethodRef => "InterfaceMethodref",
            Tag::NameAndType => "NameAndType",
            Tag::MethodHandle => "MethodHandle",
            Tag::MethodType => "MethodType",
            Tag::Dynamic => "Dynamic",
            Tag::InvokeDynamic => "InvokeDynamic",
            Tag::Module => "Module",
            Tag::Package => "Package",
        }
    }
}
impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tag::Utf8),
            3 => Ok(Tag::Integer),
            4 => Ok(Tag::Float),
            5 => Ok(Tag::Long),
            6 => Ok(Tag::Double),
            7 => Ok(Tag::Class),
            8 => Ok(Tag::String),
            9 => Ok(Tag::FieldRef),
            10 => Ok(Tag::MethodRef),
            11 => Ok(Tag::InterfaceMethodRef),
            12 => Ok(Tag::NameAndType),
            15 => Ok(Tag::MethodHandle),
            16 => Ok(Tag::MethodType),
            17 => Ok(Tag::Dynamic),
            18 => Ok(Tag::InvokeDynamic),
            19 => Ok(Tag::Module),
            20 => Ok(Tag::Package),
            _ => Err(value),
        }
    }
}
impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// A set of entry kinds, one bit per tag value.
    pub struct KindSet: u32 {
        const UTF8 = 1 << 1;
        const INTEGER = 1 << 3;
        const FLOAT = 1 << 4;
        const LONG = 1 << 5;
        const DOUBLE = 1 << 6;
        const CLASS = 1 << 7;
        const STRING = 1 << 8;
        const FIELD_REF = 1 << 9;
        const METHOD_REF = 1 << 10;
        const INTERFACE_METHOD_REF = 1 << 11;
        const NAME_AND_TYPE = 1 << 12;
        const METHOD_HANDLE = 1 << 15;
        const METHOD_TYPE = 1 << 16;
        const DYNAMIC = 1 << 17;
        const INVOKE_DYNAMIC = 1 << 18;
        const MODULE = 1 << 19;
        const PACKAGE = 1 << 20;

        const MEMBER_REF = Self::FIELD_REF.bits
            | Self::METHOD_REF.bits
            | Self::INTERFACE_METHOD_REF.bits;
        const ANY_METHOD_REF = Self::METHOD_REF.bits | Self::INTERFACE_METHOD_REF.bits;
        /// Kinds an `ldc` family instruction may load.
        const LOADABLE = Self::INTEGER.bits
            | Self::FLOAT.bits
            | Self::LONG.bits
            | Self::DOUBLE.bits
            | Self::CLASS.bits
            | Self::STRING.bits
            | Self::METHOD_HANDLE.bits
            | Self::METHOD_TYPE.bits
            | Self::DYNAMIC.bits;
    }
}
impl KindSet {
    pub fn contains_tag(&self, tag: Tag) -> bool {
        self.contains(KindSet::from(tag))
    }
}
impl From<Tag> for KindSet {
    fn from(tag: Tag) -> Self {
        KindSet::from_bits_truncate(1 << tag as u8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReferenceKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}
impl ReferenceKind {
    /// Member kinds a method handle of this kind may point at.
    pub fn targets(self) -> KindSet {
        match self {
            ReferenceKind::GetField
            | ReferenceKind::GetStatic
            | ReferenceKind::PutField
            | ReferenceKind::PutStatic => KindSet::FIELD_REF,
            ReferenceKind::InvokeVirtual | ReferenceKind::NewInvokeSpecial => {
                KindSet::METHOD_REF
            }
            ReferenceKind::InvokeStatic | ReferenceKind::InvokeSpecial => KindSet::ANY_METHOD_REF,
            ReferenceKind::InvokeInterface => KindSet::INTERFACE_METHOD_REF,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReferenceKind::GetField => "REF_getField",
            ReferenceKind::GetStatic => "REF_getStatic",
            ReferenceKind::PutField => "REF_putField",
            ReferenceKind::PutStatic => "REF_putStatic",
            ReferenceKind::InvokeVirtual => "REF_invokeVirtual",
            ReferenceKind::InvokeStatic => "REF_invokeStatic",
            ReferenceKind::InvokeSpecial => "REF_invokeSpecial",
            ReferenceKind::NewInvokeSpecial => "REF_newInvokeSpecial",
            ReferenceKind::InvokeInterface => "REF_invokeInterface",
        }
    }
}
impl TryFrom<u8> for ReferenceKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ReferenceKind::GetField),
            2 => Ok(ReferenceKind::GetStatic),
            3 => Ok(ReferenceKind::PutField),
            4 => Ok(ReferenceKind::PutStatic),
            5 => Ok(ReferenceKind::InvokeVirtual),
            6 => Ok(ReferenceKind::InvokeStatic),
            7 => Ok(ReferenceKind::InvokeSpecial),
            8 => Ok(ReferenceKind::NewInvokeSpecial),
            9 => Ok(ReferenceKind::InvokeInterface),
            _ => Err(value),
        }
    }
}

/// A single index held by an entry, together with the kinds it may target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    pub index: u16,
    pub expected: KindSet,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum PoolEntry {
    Utf8(Utf8Info),
    Integer(i32),
    Float(FloatInfo),
    Long(i64),
    Double(DoubleInfo),
    Class(ClassInfo),
    String(StringInfo),
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module(ModuleInfo),
    Package(PackageInfo),
}
impl PoolEntry {
    pub fn tag(&self) -> Tag {
        match self {
            PoolEntry::Utf8(_) => Tag::Utf8,
            PoolEntry::Integer(_) => Tag::Integer,
            PoolEntry::Float(_) => Tag::Float,
            PoolEntry::Long(_) => Tag::Long,
            PoolEntry::Double(_) => Tag::Double,
            PoolEntry::Class(_) => Tag::Class,
            PoolEntry::String(_) => Tag::String,
            PoolEntry::FieldRef(_) => Tag::FieldRef,
            PoolEntry::MethodRef(_) => Tag::MethodRef,
            PoolEntry::InterfaceMethodRef(_) => Tag::InterfaceMethodRef,
            PoolEntry::NameAndType(_) => Tag::NameAndType,
            PoolEntry::MethodHandle(_) => Tag::MethodHandle,
            PoolEntry::MethodType(_) => Tag::MethodType,
            PoolEntry::Dynamic(_) => Tag::Dynamic,
            PoolEntry::InvokeDynamic(_) => Tag::InvokeDynamic,
            PoolEntry::Module(_) => Tag::Module,
            PoolEntry::Package(_) => Tag::Package,
        }
    }

    pub fn slot_width(&self) -> u16 {
        self.tag().slot_width()
    }

    /// Indices of the entries this one points at, in payload order.
    ///
    /// The bootstrap method index of `Dynamic`/`InvokeDynamic` indexes the
    /// `BootstrapMethods` attribute, not the pool, so it is not listed.
    pub fn references(&self) -> Vec<Reference> {
        let r = |index, expected| Reference { index, expected };
        match self {
            PoolEntry::Utf8(_)
            | PoolEntry::Integer(_)
            | PoolEntry::Float(_)
            | PoolEntry::Long(_)
            | PoolEntry::Double(_) => vec![],
            PoolEntry::Class(ClassInfo { name_index }) => vec![r(*name_index, KindSet::UTF8)],
            PoolEntry::String(StringInfo { string_index }) => {
                vec![r(*string_index, KindSet::UTF8)]
            }
            PoolEntry::FieldRef(info)
            | PoolEntry::MethodRef(info)
            | PoolEntry::InterfaceMethodRef(info) => vec![
                r(info.class_index, KindSet::CLASS),
                r(info.name_and_type_index, KindSet::NAME_AND_TYPE),
            ],
            PoolEntry::NameAndType(info) => vec![
                r(info.name_index, KindSet::UTF8),
                r(info.descriptor_index, KindSet::UTF8),
            ],
            PoolEntry::MethodHandle(info) => {
                let expected = ReferenceKind::try_from(info.reference_kind)
                    .map(ReferenceKind::targets)
                    .unwrap_or(KindSet::MEMBER_REF);
                vec![r(info.reference_index, expected)]
            }
            PoolEntry::MethodType(MethodTypeInfo { descriptor_index }) => {
                vec![r(*descriptor_index, KindSet::UTF8)]
            }
            PoolEntry::Dynamic(info) | PoolEntry::InvokeDynamic(info) => {
                vec![r(info.name_and_type_index, KindSet::NAME_AND_TYPE)]
            }
            PoolEntry::Module(ModuleInfo { name_index })
            | PoolEntry::Package(PackageInfo { name_index }) => {
                vec![r(*name_index, KindSet::UTF8)]
            }
        }
    }

    /// Copies this entry, passing every pool reference through `f`.
    pub fn map_references<E>(
        &self,
        mut f: impl FnMut(Reference) -> Result<u16, E>,
    ) -> Result<PoolEntry, E> {
        let mut m = |index, expected| f(Reference { index, expected });
        let entry = match self {
            PoolEntry::Utf8(_)
            | PoolEntry::Integer(_)
            | PoolEntry::Float(_)
            | PoolEntry::Long(_)
            | PoolEntry::Double(_) => self.clone(),
            PoolEntry::Class(info) => PoolEntry::Class(ClassInfo {
                name_index: m(info.name_index, KindSet::UTF8)?,
            }),
            PoolEntry::String(info) => PoolEntry::String(StringInfo {
                string_index: m(info.string_index, KindSet::UTF8)?,
            }),
            PoolEntry::FieldRef(info) => PoolEntry::FieldRef(info.map(m)?),
            PoolEntry::MethodRef(info) => PoolEntry::MethodRef(info.map(m)?),
            PoolEntry::InterfaceMethodRef(info) => PoolEntry::InterfaceMethodRef(info.map(m)?),
            PoolEntry::NameAndType(info) => PoolEntry::NameAndType(NameAndTypeInfo {
                name_index: m(info.name_index, KindSet::UTF8)?,
                descriptor_index: m(info.descriptor_index, KindSet::UTF8)?,
            }),
            PoolEntry::MethodHandle(info) => {
                let expected = ReferenceKind::try_from(info.reference_kind)
                    .map(ReferenceKind::targets)
                    .unwrap_or(KindSet::MEMBER_REF);
                PoolEntry::MethodHandle(MethodHandleInfo {
                    reference_kind: info.reference_kind,
                    reference_index: m(info.reference_index, expected)?,
                })
            }
            PoolEntry::MethodType(info) => PoolEntry::MethodType(MethodTypeInfo {
                descriptor_index: m(info.descriptor_index, KindSet::UTF8)?,
            }),
            PoolEntry::Dynamic(info) => PoolEntry::Dynamic(info.map(m)?),
            PoolEntry::InvokeDynamic(info) => PoolEntry::InvokeDynamic(info.map(m)?),
            PoolEntry::Module(info) => PoolEntry::Module(ModuleInfo {
                name_index: m(info.name_index, KindSet::UTF8)?,
            }),
            PoolEntry::Package(info) => PoolEntry::Package(PackageInfo {
                name_index: m(info.name_index, KindSet::UTF8)?,
            }),
        };

        Ok(entry)
    }
}
impl fmt::Display for PoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<19}", self.tag().name())?;
        match self {
            PoolEntry::Utf8(info) => write!(f, "{}", info.as_str()),
            PoolEntry::Integer(value) => write!(f, "{}", value),
            PoolEntry::Float(info) => write!(f, "{}f", info.value()),
            PoolEntry::Long(value) => write!(f, "{}l", value),
            PoolEntry::Double(info) => write!(f, "{}d", info.value()),
            PoolEntry::Class(info) => write!(f, "#{}", info.name_index),
            PoolEntry::String(info) => write!(f, "#{}", info.string_index),
            PoolEntry::FieldRef(info)
            | PoolEntry::MethodRef(info)
            | PoolEntry::InterfaceMethodRef(info) => {
                write!(f, "#{}.#{}", info.class_index, info.name_and_type_index)
            }
            PoolEntry::NameAndType(info) => {
                write!(f, "#{}:#{}", info.name_index, info.descriptor_index)
            }
            PoolEntry::MethodHandle(info) => {
                write!(f, "{}:#{}", info.reference_kind, info.reference_index)
            }
            PoolEntry::MethodType(info) => write!(f, "#{}", info.descriptor_index),
            PoolEntry::Dynamic(info) | PoolEntry::InvokeDynamic(info) => write!(
                f,
                "#{}:#{}",
                info.bootstrap_method_attr_index, info.name_and_type_index
            ),
            PoolEntry::Module(info) => write!(f, "#{}", info.name_index),
            PoolEntry::Package(info) => write!(f, "#{}", info.name_index),
        }
    }
}

/// A Utf8 constant: the exact encoded bytes plus their decoded text.
///
/// Identity is the byte content, so two entries that decode to the same text
/// from different encodings stay distinct and round-trip unchanged.
#[derive(Debug, Clone)]
pub struct Utf8Info {
    bytes: Vec<u8>,
    text: String,
}
impl Utf8Info {
    pub(crate) fn new(bytes: Vec<u8>, text: String) -> Self {
        Self { bytes, text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
impl PartialEq for Utf8Info {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}
impl Eq for Utf8Info {}
impl Hash for Utf8Info {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

/// Float constants are kept as raw bits so NaN payloads and signed zeros
/// survive interning and re-encoding.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct FloatInfo {
    pub bits: u32,
}
impl FloatInfo {
    pub fn from_value(value: f32) -> Self {
        Self {
            bits: value.to_bits(),
        }
    }

    pub fn value(&self) -> f32 {
        f32::from_bits(self.bits)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct DoubleInfo {
    pub bits: u64,
}
impl DoubleInfo {
    pub fn from_value(value: f64) -> Self {
        Self {
            bits: value.to_bits(),
        }
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ClassInfo {
    // The constant_pool entry at name_index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct StringInfo {
    pub string_index: u16,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

impl RefInfo {
    fn map<E>(&self, mut m: impl FnMut(u16, KindSet) -> Result<u16, E>) -> Result<Self, E> {
        Ok(RefInfo {
            class_index: m(self.class_index, KindSet::CLASS)?,
            name_and_type_index: m(self.name_and_type_index, KindSet::NAME_AND_TYPE)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

impl DynamicInfo {
    fn map<E>(&self, mut m: impl FnMut(u16, KindSet) -> Result<u16, E>) -> Result<Self, E> {
        Ok(DynamicInfo {
            bootstrap_method_attr_index: self.bootstrap_method_attr_index,
            name_and_type_index: m(self.name_and_type_index, KindSet::NAME_AND_TYPE)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ModuleInfo {
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct PackageInfo {
    pub name_index: u16,
}


#[cfg(test)]
mod pool_entry_tests {
    use super::*;

    #[test]
    fn it_should_list_no_references_for_leaf_entries() {
        assert!(PoolEntry::Integer(7).references().is_empty());
        assert!(PoolEntry::Double(DoubleInfo::from_value(1.5))
            .references()
            .is_empty());
    }

    #[test]
    fn it_should_list_references_in_payload_order() {
        let entry = PoolEntry::MethodRef(RefInfo {
            class_index: 3,
            name_and_type_index: 9,
        });

        assert_eq!(
            entry.references(),
            vec![
                Reference {
                    index: 3,
                    expected: KindSet::CLASS
                },
                Reference {
                    index: 9,
                    expected: KindSet::NAME_AND_TYPE
                },
            ]
        );
    }

    #[test]
    fn it_should_restrict_method_handle_targets_by_reference_kind() {
        let entry = PoolEntry::MethodHandle(MethodHandleInfo {
            reference_kind: ReferenceKind::InvokeInterface as u8,
            reference_index: 4,
        });

        assert_eq!(entry.references()[0].expected, KindSet::INTERFACE_METHOD_REF);
    }

    #[test]
    fn it_should_not_treat_bootstrap_indices_as_pool_references() {
        let entry = PoolEntry::InvokeDynamic(DynamicInfo {
            bootstrap_method_attr_index: 0,
            name_and_type_index: 5,
        });

        assert_eq!(entry.references().len(), 1);
        assert_eq!(entry.references()[0].index, 5);
    }

    #[test]
    fn it_should_compare_floats_by_bits() {
        assert_eq!(
            PoolEntry::Float(FloatInfo::from_value(f32::NAN)),
            PoolEntry::Float(FloatInfo::from_value(f32::NAN))
        );
        assert_ne!(
            PoolEntry::Float(FloatInfo::from_value(0.0)),
            PoolEntry::Float(FloatInfo::from_value(-0.0))
        );
    }

    #[test]
    fn it_should_compare_utf8_by_bytes() {
        let a = Utf8Info::new(vec![b'a'], "a".into());
        let b = Utf8Info::new(vec![b'a'], "a".into());
        assert_eq!(a, b);
    }
}
