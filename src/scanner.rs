//! Character-level scanning with position tracking.
//!
//! This module provides the [`CharSource`] trait — a character-by-character
//! cursor with lookahead, terminator-bounded bulk reads and quoted-string
//! decoding — and [`StringCharSource`], the in-memory implementation every
//! parser in this crate runs on.
//!
//! The scanner is deliberately low-level: the parser and any sibling grammar
//! (a CSV reader, say) consume the same primitives, and every read advances a
//! [`Bookmark`] so node positions and error messages can point back into the
//! source.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::scanner::{CharSource, StringCharSource};
//!
//! let mut src = StringCharSource::new("hello: world");
//! let token = src.read_until_terminator(":", 0, usize::MAX);
//! assert_eq!(token, "hello");
//! assert_eq!(src.peek(0), Some(':'));
//! ```

use crate::{Bookmark, Error, Result};

/// Characters treated as insignificant whitespace.
///
/// `\u{a0}` is included because HTML `&nbsp;` decodes to it.
pub const SPACE_CHARS: &str = " \n\r\t\u{a0}";

/// Default cap for unbounded literal-match scans.
const MAX_STRING_LEN: usize = 20_000;

/// A character cursor over some text source.
///
/// Required methods supply single-character access plus the bulk
/// [`read_until`](CharSource::read_until) primitive; everything else is
/// provided in terms of those. All positions are character offsets, not bytes.
pub trait CharSource {
    /// Reads one character, advancing the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfInput`] past the end.
    fn read(&mut self) -> Result<char>;

    /// Peeks at the character `offset` positions ahead without advancing.
    fn peek(&self, offset: usize) -> Option<char>;

    /// Returns `true` if the position `offset` characters ahead is past the end.
    fn is_eof(&self, offset: usize) -> bool;

    /// Returns a snapshot of the current position.
    fn bookmark(&self) -> Bookmark;

    /// Reads characters until the predicate matches, EOF, or `max_len` is hit.
    ///
    /// Characters skipped over are bulk-appended to `target` when one is
    /// given. The predicate is only consulted once at least `min_len`
    /// characters have been consumed.
    ///
    /// Returns `true` if the predicate — not length or EOF — ended the scan.
    fn read_until(
        &mut self,
        predicate: impl FnMut(&Self) -> bool,
        target: Option<&mut String>,
        min_len: usize,
        max_len: usize,
    ) -> bool
    where
        Self: Sized;

    /// Like [`read_until`](CharSource::read_until) with no accumulator.
    fn skip_until(&mut self, predicate: impl FnMut(&Self) -> bool) -> bool
    where
        Self: Sized,
    {
        self.read_until(predicate, None, 0, usize::MAX)
    }

    /// Reads until one of `chars` is seen (`include = true`) or until a
    /// character outside `chars` is seen (`include = false`).
    ///
    /// Returns `true` if the terminate condition matched.
    fn read_until_terminator_into(
        &mut self,
        chars: &str,
        target: Option<&mut String>,
        include: bool,
        min_len: usize,
        max_len: usize,
    ) -> bool
    where
        Self: Sized,
    {
        self.read_until(
            |s| s.peek(0).map(|c| chars.contains(c)) == Some(include),
            target,
            min_len,
            max_len,
        )
    }

    /// Reads up to one of `chars` and returns the consumed text.
    fn read_until_terminator(&mut self, chars: &str, min_len: usize, max_len: usize) -> String
    where
        Self: Sized,
    {
        let mut out = String::new();
        self.read_until_terminator_into(chars, Some(&mut out), true, min_len, max_len);
        out
    }

    /// Skips characters, stopping at one of `chars` (`include = true`) or at
    /// the first character outside `chars` (`include = false`).
    fn skip_terminator(&mut self, chars: &str, include: bool) -> bool
    where
        Self: Sized,
    {
        self.read_until_terminator_into(chars, None, include, 0, usize::MAX)
    }

    /// Skips spaces, tabs, newlines and non-breaking spaces.
    ///
    /// Returns `true` if a significant character remains.
    fn skip_spaces(&mut self) -> bool
    where
        Self: Sized,
    {
        self.skip_terminator(SPACE_CHARS, false)
    }

    /// Reads exactly `len` characters into `target` (fewer at EOF).
    fn read_into(&mut self, target: Option<&mut String>, len: usize) -> bool
    where
        Self: Sized,
    {
        self.read_until(|_| false, target, len, len)
    }

    /// Reads exactly `len` characters and returns them (fewer at EOF).
    fn read_len(&mut self, len: usize) -> String
    where
        Self: Sized,
    {
        let mut out = String::new();
        self.read_into(Some(&mut out), len);
        out
    }

    /// Skips `len` characters.
    fn skip(&mut self, len: usize) -> bool
    where
        Self: Sized,
    {
        self.read_into(None, len)
    }

    /// Returns `true` if the upcoming characters equal `text`.
    fn starts_with(&self, text: &str) -> bool {
        if self.is_eof(text.chars().count().saturating_sub(1)) && !text.is_empty() {
            return false;
        }
        for (i, c) in text.chars().enumerate() {
            if self.peek(i) != Some(c) {
                return false;
            }
        }
        true
    }

    /// Peeks up to `len` upcoming characters without advancing.
    fn peek_str(&self, len: usize) -> String {
        let mut out = String::new();
        for i in 0..len {
            match self.peek(i) {
                Some(c) => out.push(c),
                None => break,
            }
        }
        out
    }

    /// The next ~10 characters, used in error diagnostics.
    fn digest(&self) -> String {
        self.peek_str(10)
    }

    /// Reads until the literal `text` is found, optionally consuming it.
    ///
    /// Returns `true` if the literal was found.
    fn read_until_match(
        &mut self,
        text: &str,
        skip_match: bool,
        target: Option<&mut String>,
        min_len: usize,
        max_len: usize,
    ) -> bool
    where
        Self: Sized,
    {
        let matched = self.read_until(|s| s.starts_with(text), target, min_len, max_len);
        if matched && skip_match {
            self.skip(text.chars().count());
        }
        matched
    }

    /// Skips until the literal `text` is found, optionally consuming it.
    fn skip_until_match(&mut self, text: &str, skip_match: bool) -> bool
    where
        Self: Sized,
    {
        self.read_until_match(text, skip_match, None, 0, MAX_STRING_LEN)
    }

    /// Decodes a quoted string (the opening quote already consumed),
    /// appending the decoded characters to `out`.
    ///
    /// Recognized escapes: `\b \t \n \f \r \v`, `\uXXXX`, octal `\NNN`
    /// (further digits accumulated while the value stays ≤ 255), and
    /// line-continuation (a backslash directly before a newline is swallowed
    /// together with the newline). Any other escaped character stands for
    /// itself.
    ///
    /// # Errors
    ///
    /// [`Error::UnterminatedQuote`] if the closing quote is never found,
    /// carrying the opening position; [`Error::InvalidEscape`] for a
    /// malformed `\u` sequence.
    fn read_quoted_into(&mut self, quote: char, out: &mut String) -> Result<()>
    where
        Self: Sized,
    {
        let opened = self.bookmark();
        let mut terminator = String::from('\\');
        terminator.push(quote);
        loop {
            if !self.read_until_terminator_into(&terminator, Some(out), true, 0, usize::MAX) {
                return Err(Error::unterminated_quote(opened, self.digest()));
            }
            let c = self.read()?;
            if c == quote {
                return Ok(());
            }

            // c is '\\', start of an escape sequence
            let e = self.read()?;
            match e {
                'b' => out.push('\u{8}'),
                't' => out.push('\t'),
                'n' => out.push('\n'),
                'f' => out.push('\u{c}'),
                'r' => out.push('\r'),
                'v' => out.push('\u{b}'),
                'u' => {
                    let bm = self.bookmark();
                    let hex = self.read_len(4);
                    let code = u32::from_str_radix(&hex, 16)
                        .ok()
                        .filter(|_| hex.chars().count() == 4)
                        .and_then(char::from_u32)
                        .ok_or_else(|| {
                            Error::invalid_escape(format!("\\u{hex}"), bm, self.digest())
                        })?;
                    out.push(code);
                }
                '\n' | '\r' => {} // line continuation
                '0'..='7' => {
                    let num = self.read_octal(e as u32 - '0' as u32)?;
                    if let Some(c) = char::from_u32(num) {
                        out.push(c);
                    }
                }
                other => out.push(other),
            }
        }
    }

    /// Decodes a quoted string and returns it.
    fn read_quoted(&mut self, quote: char) -> Result<String>
    where
        Self: Sized,
    {
        let mut out = String::new();
        self.read_quoted_into(quote, &mut out)?;
        Ok(out)
    }

    #[doc(hidden)]
    fn read_octal(&mut self, first: u32) -> Result<u32>
    where
        Self: Sized,
    {
        let mut num = first;
        for _ in 0..2 {
            let d = match self.peek(0) {
                Some(c @ '0'..='7') => c as u32 - '0' as u32,
                _ => break,
            };
            let next = num * 8 + d;
            if next > 255 {
                break;
            }
            num = next;
            self.read()?;
        }
        Ok(num)
    }
}

/// A [`CharSource`] over an in-memory string.
///
/// Positions are character indices, so multi-byte UTF-8 input peeks and
/// bookmarks consistently.
#[derive(Debug, Clone)]
pub struct StringCharSource {
    chars: Vec<char>,
    bookmark: Bookmark,
}

impl StringCharSource {
    /// Creates a scanner positioned at the start of `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        StringCharSource {
            chars: text.chars().collect(),
            bookmark: Bookmark::default(),
        }
    }
}

impl CharSource for StringCharSource {
    fn read(&mut self) -> Result<char> {
        match self.chars.get(self.bookmark.offset) {
            Some(&c) => {
                self.bookmark.advance(c);
                Ok(c)
            }
            None => Err(Error::end_of_input(self.bookmark)),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.bookmark.offset + offset).copied()
    }

    fn is_eof(&self, offset: usize) -> bool {
        self.bookmark.offset + offset >= self.chars.len()
    }

    fn bookmark(&self) -> Bookmark {
        self.bookmark
    }

    fn read_until(
        &mut self,
        mut predicate: impl FnMut(&Self) -> bool,
        target: Option<&mut String>,
        min_len: usize,
        max_len: usize,
    ) -> bool {
        let start = self.bookmark.offset;
        let mut len = 0;
        let mut matched = false;
        while len < max_len && !self.is_eof(0) {
            matched = len >= min_len && predicate(self);
            if matched {
                break;
            }
            // read() cannot fail here, EOF was just checked
            let _ = self.read();
            len += 1;
        }
        if let Some(target) = target {
            target.extend(&self.chars[start..start + len]);
        }
        matched
    }
}
