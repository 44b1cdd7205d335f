//! Error taxonomy for the sharps notation.
//!
//! Every phase reports failures through [`SharpError`]. All errors are
//! terminal for the current top-level call: there is no partial result and
//! no retry. Tokenization errors carry the byte offset of the offending
//! character; semantic errors carry the label or key involved.

use std::fmt;

pub type SharpResult<T> = Result<T, SharpError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SharpError {
    /// No token matches at this position, or the matched tokens do not tile
    /// the input contiguously from offset 0.
    Tokenization { offset: u32, found: char },
    /// A token is present but invalid in the current parse position.
    Grammar { offset: u32, message: String },
    /// A backreference names a label with no open-or-complete definition.
    UndefinedLabel { label: u32 },
    /// A label was defined more than once within one top-level call.
    DuplicateLabel { label: u32 },
    /// A backreference outside a direct object/array literal value slot.
    UnsupportedReferencePosition { label: u32 },
    /// A serializer entry point was invoked on a value of the wrong shape.
    TypeMismatch { message: String },
    /// Registry enter/leave bookkeeping went out of balance.
    InternalConsistency { message: String },
}

impl SharpError {
    pub fn grammar(offset: u32, message: impl Into<String>) -> SharpError {
        SharpError::Grammar {
            offset,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> SharpError {
        SharpError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> SharpError {
        SharpError::InternalConsistency {
            message: message.into(),
        }
    }

    /// The byte offset this error points at, when it has one.
    pub fn offset(&self) -> Option<u32> {
        match self {
            SharpError::Tokenization { offset, .. } | SharpError::Grammar { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SharpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharpError::Tokenization { offset, found } => {
                write!(
                    f,
                    "invalid character {:#x} at offset {}",
                    *found as u32, offset
                )
            }
            SharpError::Grammar { offset, message } => {
                write!(f, "{message} at offset {offset}")
            }
            SharpError::UndefinedLabel { label } => {
                write!(f, "sharp object #{label} used before definition")
            }
            SharpError::DuplicateLabel { label } => {
                write!(f, "sharp object #{label} defined more than once")
            }
            SharpError::UnsupportedReferencePosition { label } => {
                write!(
                    f,
                    "sharp reference #{label}# in unsupported position"
                )
            }
            SharpError::TypeMismatch { message } => write!(f, "{message}"),
            SharpError::InternalConsistency { message } => {
                write!(f, "internal error: {message}")
            }
        }
    }
}

impl std::error::Error for SharpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_tokenization() {
        let err = SharpError::Tokenization {
            offset: 7,
            found: '@',
        };
        assert_eq!(err.to_string(), "invalid character 0x40 at offset 7");
        assert_eq!(err.offset(), Some(7));
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(
            SharpError::UndefinedLabel { label: 1 }.to_string(),
            "sharp object #1 used before definition"
        );
        assert_eq!(
            SharpError::DuplicateLabel { label: 3 }.to_string(),
            "sharp object #3 defined more than once"
        );
    }
}
