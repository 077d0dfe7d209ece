//! Error interface for this crate.
//!
//! Every error raised by the parser, assembler, and simulator implements [`Error`],
//! which exposes the source spans and help messages a diagnostic renderer needs.
//!
//! This module also re-exports each of those errors.

use std::borrow::Cow;
use std::ops::Range;

pub use crate::parse::lex::LexErr;
pub use crate::parse::{ParseErr, ParseErrKind};
pub use crate::asm::{AsmErr, AsmErrKind};
pub use crate::ast::OffsetNewErr;
pub use crate::sim::SimErr;

/// Unified error interface for all errors in this crate.
///
/// Note that the [`std::fmt::Display`] implementation is used for the brief message of the error.
pub trait Error: std::error::Error {
    /// The range where this error occurs in source.
    ///
    /// If this is not known, this can be set to `None`.
    fn span(&self) -> Option<ErrSpan> {
        None
    }

    /// A clarifying message to help aid someone in how to fix the message.
    ///
    /// If there is none to add, this can be set to `None`.
    fn help(&self) -> Option<Cow<str>>;
}

/// The possible source ranges for an error.
///
/// This can be one contiguous range, or several ranges
/// (e.g., two places that conflict with each other).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ErrSpan {
    /// One contiguous range.
    One(Range<usize>),
    /// Several ranges, which may be empty.
    Many(Vec<Range<usize>>),
}
impl ErrSpan {
    /// Gets the first range of this span (if there is one).
    pub fn first(&self) -> Option<Range<usize>> {
        match self {
            ErrSpan::One(r) => Some(r.clone()),
            ErrSpan::Many(rs) => rs.first().cloned(),
        }
    }

    /// Iterates over every range of this span.
    pub fn iter(&self) -> impl Iterator<Item=&Range<usize>> + '_ {
        match self {
            ErrSpan::One(r) => std::slice::from_ref(r).iter(),
            ErrSpan::Many(rs) => rs.iter(),
        }
    }
}
impl From<Range<usize>> for ErrSpan {
    fn from(value: Range<usize>) -> Self {
        ErrSpan::One(value)
    }
}
impl<const N: usize> From<[Range<usize>; N]> for ErrSpan {
    fn from(value: [Range<usize>; N]) -> Self {
        ErrSpan::Many(value.to_vec())
    }
}
impl From<Vec<Range<usize>>> for ErrSpan {
    fn from(value: Vec<Range<usize>>) -> Self {
        ErrSpan::Many(value)
    }
}
impl std::fmt::Display for ErrSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut it = self.iter();
        if let Some(first) = it.next() {
            write!(f, "{first:?}")?;
        }
        for r in it {
            write!(f, ", {r:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrSpan, ParseErrKind};
    use crate::parse::parse_ast;

    #[test]
    fn test_err_span() {
        assert_eq!(ErrSpan::from(3..5).first(), Some(3..5));
        assert_eq!(ErrSpan::from([1..2, 7..9]).iter().count(), 2);
        assert_eq!(ErrSpan::from(vec![]).first(), None);
        assert_eq!(ErrSpan::from([1..2, 7..9]).to_string(), "1..2, 7..9");
    }

    #[test]
    fn test_diagnostic() {
        let err = parse_ast("jmp reg[1]").unwrap_err();
        assert!(matches!(err.kind, ParseErrKind::InvalidOperands(_)));
        assert_eq!(err.span().and_then(|s| s.first()), Some(0..10));
        assert!(err.help().is_some());
    }
}
