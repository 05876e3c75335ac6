//! Source-position tracking.
//!
//! A [`Bookmark`] records a line, column and character offset inside the input
//! being scanned. The scanner advances one bookmark as it reads; cloned
//! snapshots are stamped on nodes (`start`/`end`) and carried by parse errors,
//! so a consumer can always point back at the exact spot in the source text.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::Bookmark;
//!
//! let mut bm = Bookmark::default();
//! bm.advance('a');
//! bm.advance('\n');
//! bm.advance('b');
//! assert_eq!(bm.line, 1);
//! assert_eq!(bm.col, 1);
//! assert_eq!(bm.offset, 3);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the source text: zero-based line, column and character offset.
///
/// Bookmarks are cheap `Copy` values; snapshots taken via [`Bookmark::clone`]
/// (or plain copies) never alias the live cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub line: u32,
    pub col: u32,
    pub offset: usize,
}

impl Bookmark {
    /// Creates a bookmark at an explicit position.
    #[must_use]
    pub const fn new(line: u32, col: u32, offset: usize) -> Self {
        Bookmark { line, col, offset }
    }

    /// Advances the bookmark past one character.
    ///
    /// A `\n` increments the line and resets the column; every character
    /// increments the offset.
    pub fn advance(&mut self, c: char) {
        self.offset += 1;
        self.col += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        }
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bookmark(line={}, col={}, offset={})",
            self.line, self.col, self.offset
        )
    }
}
