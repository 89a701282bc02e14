use thiserror::Error;

use crate::entry::{KindSet, Tag};

#[derive(Error, Debug)]
pub enum ConstantPoolError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Truncated input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("Unsupported constant pool tag {tag} at offset {offset}")]
    UnsupportedTag { tag: u8, offset: usize },
    #[error("Malformed modified UTF-8 in entry at offset {offset}")]
    MalformedUtf8 { offset: usize },
    #[error("Constant pool overflow: size {size}, adding {adding} slots exceeds 65535")]
    PoolOverflow { size: usize, adding: usize },
    #[error("Constant pool index {index} out of range (pool size {size})")]
    IndexOutOfRange { index: u16, size: usize },
    #[error("Expected {expected:?} at constant pool index {index}, found {found}")]
    TypeMismatch {
        index: u16,
        expected: KindSet,
        found: Tag,
    },
    #[error("Constant pool is sealed")]
    ImmutabilityViolation,
    #[error("Invalid constant pool count: {0}")]
    InvalidPoolCount(u16),
    #[error("Invalid method handle reference kind: {0}")]
    InvalidReferenceKind(u8),
    #[error("Utf8 constant too long: {0} bytes")]
    Utf8TooLong(usize),
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
}
