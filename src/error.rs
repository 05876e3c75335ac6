//! Error types for parsing, writing and object-graph coding.
//!
//! Parser-originated errors carry the offending [`Bookmark`] plus a short
//! digest of the upcoming text, so a message like
//!
//! ```text
//! EOF encountered while expecting matching '}', Bookmark(line=3, col=0, offset=41), digest: ""
//! ```
//!
//! points straight at the problem. Errors are never locally recovered: they
//! abort the current parse call and propagate to the caller.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::parse;
//!
//! let result = parse("{a: [1, 2");
//! assert!(result.is_err());
//! ```

use crate::Bookmark;
use thiserror::Error;

/// All errors this crate reports.
///
/// Each parse variant includes the bookmark where the problem was detected
/// and a `digest` of the next few source characters for diagnostics.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Read past the end of the input.
    #[error("read past end of input, {bookmark}")]
    EndOfInput { bookmark: Bookmark },

    /// A quote was opened but never closed. Carries the opening position.
    #[error("cannot find matching quote opened at {opened}, digest: {digest:?}")]
    UnterminatedQuote { opened: Bookmark, digest: String },

    /// A bracket was opened but the input ended before the matching close.
    #[error("EOF encountered while expecting matching {close:?} for bracket opened at {opened}, digest: {digest:?}")]
    UnbalancedBrackets {
        close: String,
        opened: Bookmark,
        digest: String,
    },

    /// A key was read but no key delimiter, bracket or separator followed.
    #[error("no key delimiter after key {key:?}, {bookmark}, digest: {digest:?}")]
    MissingKeyDelimiter {
        key: String,
        bookmark: Bookmark,
        digest: String,
    },

    /// A malformed escape sequence inside a quoted string.
    #[error("invalid escape sequence {escape:?}, {bookmark}, digest: {digest:?}")]
    InvalidEscape {
        escape: String,
        bookmark: Bookmark,
        digest: String,
    },

    /// A `$ref` path resolved to nothing.
    ///
    /// Non-fatal during lenient materialization (logged, literal fallback);
    /// fatal in strict mode.
    #[error("reference not found: {path:?}")]
    ReferenceNotFound { path: String },

    /// Generic message for anything else.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Creates an [`Error::EndOfInput`] at the given position.
    pub fn end_of_input(bookmark: Bookmark) -> Self {
        Error::EndOfInput { bookmark }
    }

    /// Creates an [`Error::UnterminatedQuote`] carrying the opening position.
    pub fn unterminated_quote(opened: Bookmark, digest: impl Into<String>) -> Self {
        Error::UnterminatedQuote {
            opened,
            digest: digest.into(),
        }
    }

    /// Creates an [`Error::UnbalancedBrackets`] naming the expected closer.
    pub fn unbalanced_brackets(
        close: impl Into<String>,
        opened: Bookmark,
        digest: impl Into<String>,
    ) -> Self {
        Error::UnbalancedBrackets {
            close: close.into(),
            opened,
            digest: digest.into(),
        }
    }

    /// Creates an [`Error::MissingKeyDelimiter`] for the given key.
    pub fn missing_key_delimiter(
        key: impl Into<String>,
        bookmark: Bookmark,
        digest: impl Into<String>,
    ) -> Self {
        Error::MissingKeyDelimiter {
            key: key.into(),
            bookmark,
            digest: digest.into(),
        }
    }

    /// Creates an [`Error::InvalidEscape`].
    pub fn invalid_escape(
        escape: impl Into<String>,
        bookmark: Bookmark,
        digest: impl Into<String>,
    ) -> Self {
        Error::InvalidEscape {
            escape: escape.into(),
            bookmark,
            digest: digest.into(),
        }
    }

    /// Creates an [`Error::ReferenceNotFound`] for the given path text.
    pub fn reference_not_found(path: impl Into<String>) -> Self {
        Error::ReferenceNotFound { path: path.into() }
    }

    /// Creates a generic message error.
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Message(msg.into())
    }

    /// Returns the bookmark attached to this error, if any.
    #[must_use]
    pub fn bookmark(&self) -> Option<Bookmark> {
        match self {
            Error::EndOfInput { bookmark } => Some(*bookmark),
            Error::UnterminatedQuote { opened, .. } => Some(*opened),
            Error::UnbalancedBrackets { opened, .. } => Some(*opened),
            Error::MissingKeyDelimiter { bookmark, .. } => Some(*bookmark),
            Error::InvalidEscape { bookmark, .. } => Some(*bookmark),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_bookmark() {
        let bm = Bookmark::new(1, 4, 12);
        let err = Error::unterminated_quote(bm, "abc{d");
        assert_eq!(err.bookmark(), Some(bm));
        assert!(err.to_string().contains("line=1"));
    }

    #[test]
    fn test_reference_not_found_has_no_bookmark() {
        let err = Error::reference_not_found("#missing");
        assert_eq!(err.bookmark(), None);
    }
}
