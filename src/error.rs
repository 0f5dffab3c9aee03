use std::error::Error;
use std::fmt::{Display, Formatter};

/// All recoverable failures the core can produce.
///
/// Chron and ChronMarkup operations against a cursor whose anchor can no
/// longer be resolved are *not* represented here - per spec those are silent
/// no-ops, not errors. This enum only covers the cases in spec section 7.
#[derive(Debug, Eq, PartialEq, Clone)]
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ChronError {
    /// A Ref could not be resolved in any ancestor world.
    UnknownRef(String),
    /// A write was attempted against a locked World.
    LockedWrite,
    /// A slot's type constraint was violated on assignment.
    TypeMismatch {
        slot: usize,
        expected: &'static str,
    },
    /// `World::commit` found a cached read that no longer matches the parent.
    CommitConflict {
        slot: usize,
    },
    /// The serializer's type registry saw a duplicate property index during
    /// registration.
    SchemaConflict {
        type_name: &'static str,
        index: usize,
    },
    /// The decoder encountered an atom tag or type tag it doesn't know.
    UnknownType(u32),
    /// A varint or UTF-8 decode ran past its guard limit or past the end of
    /// the body.
    Malformed(&'static str),
    /// A Chron invariant was violated by the caller, e.g. reading `.data` on
    /// a deleted entry.
    CorruptAccess(&'static str),
    /// A decoded stream's trailing checksum didn't match its contents.
    ChecksumMismatch,
    /// A `CallRecord`'s method name had no registered implementation for the
    /// addressed Model's class.
    UnknownMethod { class_name: &'static str, method: String },
}

impl Display for ChronError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChronError::UnknownRef(id) => write!(f, "unknown ref: {id}"),
            ChronError::LockedWrite => write!(f, "write attempted on a locked world"),
            ChronError::TypeMismatch { slot, expected } => {
                write!(f, "slot {slot} expected type {expected}")
            }
            ChronError::CommitConflict { slot } => {
                write!(f, "commit conflict on slot {slot}")
            }
            ChronError::SchemaConflict { type_name, index } => {
                write!(f, "duplicate property index {index} registering {type_name}")
            }
            ChronError::UnknownType(tag) => write!(f, "unknown type tag {tag}"),
            ChronError::Malformed(why) => write!(f, "malformed stream: {why}"),
            ChronError::CorruptAccess(why) => write!(f, "corrupt access: {why}"),
            ChronError::ChecksumMismatch => write!(f, "checksum mismatch: stream is corrupt"),
            ChronError::UnknownMethod { class_name, method } => {
                write!(f, "no registered method {method:?} on class {class_name}")
            }
        }
    }
}

impl Error for ChronError {}

pub type Result<T> = std::result::Result<T, ChronError>;
