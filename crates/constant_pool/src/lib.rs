// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4

pub mod codec;
#[macro_use]
mod constant_pool;
pub mod cursor;
mod entry;
mod error;
pub mod mutf8;
mod parser;
mod resolved;
mod writer;

pub use constant_pool::{ConstantPool, IndexMap, PoolState, MAX_POOL_SIZE};
pub use entry::{
    ClassInfo, DoubleInfo, DynamicInfo, FloatInfo, KindSet, MethodHandleInfo, MethodTypeInfo,
    ModuleInfo, NameAndTypeInfo, PackageInfo, PoolEntry, RefInfo, Reference, ReferenceKind,
    StringInfo, Tag, Utf8Info,
};
pub use error::ConstantPoolError;
pub use mutf8::Utf8Mode;
pub use parser::{ClassPrefix, ParseOptions, Parser};
pub use resolved::{DynamicRef, MemberRef, NameAndType, Resolved};
pub use writer::Writer;

pub type Result<T, E = ConstantPoolError> = std::result::Result<T, E>;
