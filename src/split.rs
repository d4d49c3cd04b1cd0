//! Zero-copy splitting of a text buffer on a single separator.
//!
//! The same routine cuts a document into records (on `\n`) and a record into
//! fields (on the column separator). Views borrow the buffer they were cut
//! from, so they can never outlive it.
//!
//! A trailing separator does not produce an empty trailing view:
//! `"Hello,World,"` yields the same two views as `"Hello,World"`. Empty runs
//! between two separators (or before a leading one) are kept, which is what
//! downstream row and field counts rely on.

use std::fmt;

/// An `(offset, length)` window into a borrowed buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Substring<'a> {
    buffer: &'a str,
    offset: usize,
    length: usize,
}

impl<'a> Substring<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `(offset, length)`.
    pub fn span(&self) -> (usize, usize) {
        (self.offset, self.length)
    }

    /// The same view without a trailing `\r`.
    pub fn without_carriage_return(self) -> Self {
        if self.as_str().ends_with('\r') {
            Self {
                length: self.length - 1,
                ..self
            }
        } else {
            self
        }
    }

    /// The viewed text, borrowed from the original buffer.
    pub fn as_str(&self) -> &'a str {
        &self.buffer[self.offset..self.offset + self.length]
    }
}

impl fmt::Debug for Substring<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Substring")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("text", &self.as_str())
            .finish()
    }
}

impl fmt::Display for Substring<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lazy iterator over the views of a buffer. See [`views`].
#[derive(Debug, Clone)]
pub struct Views<'a> {
    buffer: &'a str,
    separator: char,
    position: usize,
}

impl<'a> Iterator for Views<'a> {
    type Item = Substring<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.buffer.len() {
            return None;
        }
        let rest = &self.buffer[self.position..];
        let (length, advance) = match rest.find(self.separator) {
            Some(idx) => (idx, idx + self.separator.len_utf8()),
            None => (rest.len(), rest.len()),
        };
        let view = Substring {
            buffer: self.buffer,
            offset: self.position,
            length,
        };
        self.position += advance;
        Some(view)
    }
}

impl std::iter::FusedIterator for Views<'_> {}

/// Iterates the views of `buffer` split on `separator` without allocating.
///
/// The separator byte is matched as the Unicode scalar of the same value, so
/// views always fall on character boundaries.
pub fn views(buffer: &str, separator: u8) -> Views<'_> {
    Views {
        buffer,
        separator: char::from(separator),
        position: 0,
    }
}

/// Collects every view of `buffer` split on `separator`.
pub fn split_views(buffer: &str, separator: u8) -> Vec<Substring<'_>> {
    views(buffer, separator).collect()
}

/// Returns the text before the first `separator`, or the whole buffer.
pub fn first_view(buffer: &str, separator: u8) -> &str {
    views(buffer, separator)
        .next()
        .map(|view| view.as_str())
        .unwrap_or("")
}
