use std::fmt;

use crate::entry::{ReferenceKind, Tag};

/// A pool entry with every index reference chased down to its final value.
///
/// Borrows from the pool it was resolved against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Utf8(&'a str),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    /// Internal form of the class name, e.g. `java/lang/Object`.
    Class(&'a str),
    String(&'a str),
    FieldRef(MemberRef<'a>),
    MethodRef(MemberRef<'a>),
    InterfaceMethodRef(MemberRef<'a>),
    NameAndType(NameAndType<'a>),
    MethodHandle {
        kind: ReferenceKind,
        member: MemberRef<'a>,
    },
    MethodType(&'a str),
    Dynamic(DynamicRef<'a>),
    InvokeDynamic(DynamicRef<'a>),
    Module(&'a str),
    Package(&'a str),
}
impl<'a> Resolved<'a> {
    pub fn tag(&self) -> Tag {
        match self {
            Resolved::Utf8(_) => Tag::Utf8,
            Resolved::Integer(_) => Tag::Integer,
            Resolved::Float(_) => Tag::Float,
            Resolved::Long(_) => Tag::Long,
            Resolved::Double(_) => Tag::Double,
            Resolved::Class(_) => Tag::Class,
            Resolved::String(_) => Tag::String,
            Resolved::FieldRef(_) => Tag::FieldRef,
            Resolved::MethodRef(_) => Tag::MethodRef,
            Resolved::InterfaceMethodRef(_) => Tag::InterfaceMethodRef,
            Resolved::NameAndType(_) => Tag::NameAndType,
            Resolved::MethodHandle { .. } => Tag::MethodHandle,
            Resolved::MethodType(_) => Tag::MethodType,
            Resolved::Dynamic(_) => Tag::Dynamic,
            Resolved::InvokeDynamic(_) => Tag::InvokeDynamic,
            Resolved::Module(_) => Tag::Module,
            Resolved::Package(_) => Tag::Package,
        }
    }
}
impl fmt::Display for Resolved<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Utf8(s) => write!(f, "{}", s),
            Resolved::Integer(value) => write!(f, "{}", value),
            Resolved::Float(value) => write!(f, "{}f", value),
            Resolved::Long(value) => write!(f, "{}l", value),
            Resolved::Double(value) => write!(f, "{}d", value),
            Resolved::Class(name) => write!(f, "{}", name),
            Resolved::String(value) => write!(f, "{:?}", value),
            Resolved::FieldRef(member)
            | Resolved::MethodRef(member)
            | Resolved::InterfaceMethodRef(member) => write!(f, "{}", member),
            Resolved::NameAndType(nat) => write!(f, "{}", nat),
            Resolved::MethodHandle { kind, member } => write!(f, "{} {}", kind.name(), member),
            Resolved::MethodType(descriptor) => write!(f, "{}", descriptor),
            Resolved::Dynamic(dynamic) | Resolved::InvokeDynamic(dynamic) => {
                write!(f, "{}", dynamic)
            }
            Resolved::Module(name) | Resolved::Package(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameAndType<'a> {
    pub name: &'a str,
    pub descriptor: &'a str,
}
impl fmt::Display for NameAndType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.descriptor)
    }
}

/// A field or method reference: `owner.name:descriptor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberRef<'a> {
    /// One of `FieldRef`, `MethodRef` or `InterfaceMethodRef`.
    pub kind: Tag,
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}
impl fmt::Display for MemberRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DynamicRef<'a> {
    /// Index into the class's `BootstrapMethods` attribute.
    pub bootstrap_method_attr_index: u16,
    pub name: &'a str,
    pub descriptor: &'a str,
}
impl fmt::Display for DynamicRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}:{}:{}",
            self.bootstrap_method_attr_index, self.name, self.descriptor
        )
    }
}
