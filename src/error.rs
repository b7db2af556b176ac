//! Small result types returned across the rope's public surface.
//!
//! There is no dedicated error type for invalid UTF-8: `Rope::from_bytes`
//! mirrors `String::from_utf8` exactly, including reusing its
//! `std::string::FromUtf8Error`, rather than wrapping it in a type of this
//! crate's own that would carry no extra information.

use std::fmt;

/// The byte/char/newline totals returned by [`crate::Rope::stats`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Stats {
    pub bytes: usize,
    pub chars: usize,
    pub newlines: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes, {} chars, {} lines",
            self.bytes,
            self.chars,
            self.newlines + 1
        )
    }
}
