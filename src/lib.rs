//! # Strand
//!
//! A rope is an efficient data structure for large, mutable UTF-8 text
//! buffers: a balanced binary tree whose leaves hold contiguous runs of
//! bytes, with every branch carrying enough cached bookkeeping that
//! inserting, deleting, or indexing into a multi-gigabyte document still
//! costs `O(log n)` rather than `O(n)`.
//!
//! For more information, see the following resources:
//!
//! + http://scienceblogs.com/goodmath/2009/01/26/ropes-twining-together-strings/
//! + https://www.ibm.com/developerworks/library/j-ropes/
//!
//! Unlike a plain byte buffer, every node also tracks character and
//! newline counts, so callers can move between byte offsets, character
//! offsets, and line numbers without ever rescanning the whole document.
//! Balancing is left-leaning red-black (see [`balance`]), chosen over the
//! weight-threshold rebalancing some ropes use because it keeps every
//! mutation's worst case logarithmic rather than amortized.

use std::cmp;
use std::fmt;
use std::ops;
use std::string;

mod balance;
mod codec;
mod cursor;
mod error;
mod node;
mod store;

pub use cursor::RopeCursor;
pub use error::Stats;

use node::{Color, Node};

/// Target leaf size in bytes; governs how large inputs are chunked into
/// multiple leaves at construction time (SPEC_FULL tunables, §6).
pub use node::NODE_CAPACITY;
/// Upper bound in bytes before a leaf is split into two at construction
/// time.
pub use node::SPLIT_THRESHOLD;
/// Upper bound on the number of recycled branch-node shells kept per
/// thread.
pub use store::FREELIST_CAPACITY;

/// A balanced, UTF-8-aware rope.
///
/// `Rope` aims to provide the byte/char/line-indexed surface a text editor
/// or other large-document tool needs, with every operation's cost bounded
/// by the tree's height rather than the document's size. It does not
/// implement copy-on-write sharing between clones: `Clone` deep-copies the
/// whole tree, the same way `String`'s does.
#[derive(Clone)]
pub struct Rope {
    root: Node,
    stats: Stats,
}

impl Rope {
    /// Creates a new, empty `Rope`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let rope = Rope::new();
    /// assert_eq!(rope.byte_len(), 0);
    /// assert!(rope.is_empty());
    /// ```
    pub fn new() -> Rope {
        Rope {
            root: Node::empty_leaf(),
            stats: Stats::default(),
        }
    }

    fn from_root(mut root: Node) -> Rope {
        root.set_color(Color::Black);
        let stats = Stats {
            bytes: root.byte_len(),
            chars: root.char_len(),
            newlines: root.newline_count(),
        };
        Rope { root, stats }
    }

    /// Builds a rope from `bytes`, rejecting input that is not well-formed
    /// UTF-8 (mirroring [`String::from_utf8`]).
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let rope = Rope::from_bytes(b"Hello, World!".to_vec()).unwrap();
    /// assert_eq!(rope.byte_len(), 13);
    /// assert_eq!(rope.char_len(), 13);
    /// assert_eq!(rope.to_string(), "Hello, World!");
    /// ```
    ///
    /// ```
    /// use strand::Rope;
    /// assert!(Rope::from_bytes(vec![0xFF, 0xFE]).is_err());
    /// ```
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Rope, string::FromUtf8Error> {
        let s = String::from_utf8(bytes)?;
        Ok(Rope::from_root(Node::from_bytes_chunked(s.into_bytes())))
    }

    /// Builds a rope from `bytes`, accepting arbitrary (possibly
    /// ill-formed) input. Invalid sequences are not rewritten in storage;
    /// they decode to `U+FFFD` lazily wherever they are read.
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let rope = Rope::from_bytes_lossy(&[0xFF, b'a']);
    /// assert_eq!(rope.char_len(), 2);
    /// ```
    pub fn from_bytes_lossy(bytes: &[u8]) -> Rope {
        Rope::from_root(Node::from_bytes_chunked(bytes.to_vec()))
    }

    fn finish_mutation(&mut self) {
        self.root.set_color(Color::Black);
        self.stats = Stats {
            bytes: self.root.byte_len(),
            chars: self.root.char_len(),
            newlines: self.root.newline_count(),
        };
    }

    /// The length of this rope's content in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.stats.bytes
    }

    /// The length of this rope's content in characters (Unicode scalar
    /// values).
    #[inline]
    pub fn char_len(&self) -> usize {
        self.stats.chars
    }

    /// The number of `\n` bytes in this rope's content.
    #[inline]
    pub fn newline_count(&self) -> usize {
        self.stats.newlines
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stats.bytes == 0
    }

    /// Byte, character, and newline totals for this rope, as a single
    /// value.
    #[inline]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Returns the number of lines in this rope, counting the final
    /// (possibly empty) line after the last newline.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.stats.newlines + 1
    }

    /// Returns the `k`-th character (Unicode scalar value), or `'\0'` if
    /// `k` is at or past [`Rope::char_len`].
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let rope = Rope::from_bytes("AB\u{65e5}\u{672c}".as_bytes().to_vec()).unwrap();
    /// assert_eq!(rope.char_at(2), '\u{65e5}');
    /// assert_eq!(rope.char_at(3), '\u{672c}');
    /// ```
    pub fn char_at(&self, k: usize) -> char {
        self.root.char_at(k)
    }

    /// Maps a character offset to the byte offset where that character
    /// begins, clamping `k` to `char_len()` (returning `byte_len()`).
    pub fn char_to_byte(&self, k: usize) -> usize {
        self.root.char_to_byte(k)
    }

    /// Maps a byte offset to the index of the character containing it,
    /// clamping `b` to `byte_len()`.
    pub fn byte_to_char(&self, b: usize) -> usize {
        self.root.byte_to_char(b.min(self.stats.bytes))
    }

    /// Maps a byte offset to its zero-based line number.
    pub fn byte_to_line(&self, b: usize) -> usize {
        self.root.byte_to_line(b.min(self.stats.bytes))
    }

    /// Maps a character offset to its zero-based line number.
    pub fn char_to_line(&self, k: usize) -> usize {
        self.byte_to_line(self.char_to_byte(k))
    }

    /// Returns the byte offset where line `line` begins (clamped to
    /// `byte_len()` if `line` is at or past [`Rope::line_count`]).
    pub fn line_to_byte(&self, line: usize) -> usize {
        self.root.line_to_byte(line)
    }

    /// Returns the character offset where line `line` begins.
    pub fn line_to_char(&self, line: usize) -> usize {
        self.byte_to_char(self.line_to_byte(line))
    }

    /// Copies up to `buf.len()` bytes starting at byte offset `start` into
    /// `buf`. Returns the number of bytes actually written.
    pub fn copy_bytes(&self, start: usize, buf: &mut [u8]) -> usize {
        self.root.copy_bytes(start, buf)
    }

    /// Copies up to `buf.len()` characters, starting at character offset
    /// `start`, into `buf`. Returns the number of characters actually
    /// written.
    pub fn copy_chars(&self, start: usize, buf: &mut [char]) -> usize {
        let total = self.stats.chars;
        let mut k = start;
        let mut written = 0;
        while written < buf.len() && k < total {
            buf[written] = self.root.char_at(k);
            written += 1;
            k += 1;
        }
        written
    }

    /// Returns `true` if this rope's stored bytes are entirely well-formed
    /// UTF-8. Ropes built through [`Rope::from_bytes`] or the `From<&str>`
    /// impls always satisfy this; only [`Rope::from_bytes_lossy`] can
    /// produce a rope that doesn't.
    pub fn validate_utf8(&self) -> bool {
        self.root.is_valid_utf8()
    }

    /// Inserts `bytes` at byte offset `byte_pos`, clamping the position to
    /// `byte_len()`. `bytes` is not required to be valid UTF-8 or to begin
    /// or end on a character boundary; callers who need that guarantee
    /// should use [`Rope::insert_chars`] or [`Rope::insert_str`] instead.
    ///
    /// # Time Complexity
    /// O(log _n_)
    pub fn insert_bytes(&mut self, byte_pos: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let pos = byte_pos.min(self.stats.bytes);
        let root = std::mem::replace(&mut self.root, Node::empty_leaf());
        self.root = root.insert_at_byte(pos, bytes);
        self.finish_mutation();
    }

    /// Inserts `chars` at character offset `char_pos`, clamping the
    /// position to `char_len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let mut rope = Rope::from("Helo");
    /// rope.insert_chars(2, &['l']);
    /// assert_eq!(rope.to_string(), "Hello");
    /// ```
    pub fn insert_chars(&mut self, char_pos: usize, chars: &[char]) {
        if chars.is_empty() {
            return;
        }
        let s: String = chars.iter().collect();
        self.insert_str(char_pos, &s);
    }

    /// Inserts `s` at character offset `char_pos`, clamping the position
    /// to `char_len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let mut rope = Rope::from("Helo");
    /// rope.insert_str(2, "l");
    /// assert_eq!(rope.to_string(), "Hello");
    /// ```
    pub fn insert_str(&mut self, char_pos: usize, s: &str) {
        if s.is_empty() {
            return;
        }
        let pos = char_pos.min(self.stats.chars);
        let byte_pos = self.root.char_to_byte(pos);
        self.insert_bytes(byte_pos, s.as_bytes());
    }

    /// Deletes the byte range `[start, end)`, clamping both bounds to
    /// `byte_len()`.
    ///
    /// # Panics
    /// If `start > end` after clamping.
    ///
    /// # Time Complexity
    /// O(log _n_)
    pub fn delete_bytes(&mut self, start: usize, end: usize) {
        let len = self.stats.bytes;
        let start = start.min(len);
        let end = end.min(len);
        assert!(start <= end, "Rope::delete_bytes: start {start} > end {end}");
        if start == end {
            return;
        }
        let root = std::mem::replace(&mut self.root, Node::empty_leaf());
        let (head, tail) = root.split_at_byte(end);
        let (keep, _removed) = head.split_at_byte(start);
        self.root = keep.concat(tail);
        self.finish_mutation();
    }

    /// Deletes the character range `[start, end)`, clamping both bounds to
    /// `char_len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let mut rope = Rope::from("this is not fine");
    /// rope.delete_chars(8, 12);
    /// assert_eq!(rope.to_string(), "this is fine");
    /// ```
    pub fn delete_chars(&mut self, start: usize, end: usize) {
        let char_len = self.stats.chars;
        let start = start.min(char_len);
        let end = end.min(char_len);
        assert!(start <= end, "Rope::delete_chars: start {start} > end {end}");
        let start_b = self.root.char_to_byte(start);
        let end_b = self.root.char_to_byte(end);
        self.delete_bytes(start_b, end_b);
    }

    /// Splits this rope into two at byte offset `byte_pos`, consuming it.
    /// `byte_pos` is clamped to `byte_len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let rope = Rope::from("abcd");
    /// let (ab, cd) = rope.split_bytes(2);
    /// assert_eq!(ab.to_string(), "ab");
    /// assert_eq!(cd.to_string(), "cd");
    /// ```
    pub fn split_bytes(self, byte_pos: usize) -> (Rope, Rope) {
        let pos = byte_pos.min(self.stats.bytes);
        let (left, right) = self.root.split_at_byte(pos);
        (Rope::from_root(left), Rope::from_root(right))
    }

    /// Splits this rope into two at character offset `char_pos`, consuming
    /// it.
    pub fn split_chars(self, char_pos: usize) -> (Rope, Rope) {
        let pos = char_pos.min(self.stats.chars);
        let byte_pos = self.root.char_to_byte(pos);
        self.split_bytes(byte_pos)
    }

    /// Returns the byte range `[start, end)` as its own rope, consuming
    /// `self`. Both bounds are clamped to `byte_len()`.
    pub fn substring_bytes(self, start: usize, end: usize) -> Rope {
        let len = self.stats.bytes;
        let start = start.min(len);
        let end = cmp::max(end.min(len), start);
        let (prefix, _suffix) = self.root.split_at_byte(end);
        let (_, middle) = prefix.split_at_byte(start);
        Rope::from_root(middle)
    }

    /// Returns the character range `[start, end)` as its own rope,
    /// consuming `self`. Both bounds are clamped to `char_len()`.
    pub fn substring_chars(self, start: usize, end: usize) -> Rope {
        let char_len = self.stats.chars;
        let start = start.min(char_len);
        let end = cmp::max(end.min(char_len), start);
        let start_b = self.root.char_to_byte(start);
        let end_b = self.root.char_to_byte(end);
        self.substring_bytes(start_b, end_b)
    }

    /// Concatenates `other` onto the end of this rope in place.
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let mut rope = Rope::from("abcd");
    /// rope.append(Rope::from("efgh"));
    /// assert_eq!(rope.to_string(), "abcdefgh");
    /// ```
    pub fn append(&mut self, other: Rope) {
        let root = std::mem::replace(&mut self.root, Node::empty_leaf());
        self.root = root.concat(other.root);
        self.finish_mutation();
    }

    /// Returns a forward character iterator starting at character offset
    /// `char_pos`.
    pub fn iter_from_char(&self, char_pos: usize) -> RopeCursor<'_> {
        let byte_pos = self.root.char_to_byte(char_pos.min(self.stats.chars));
        RopeCursor::at_byte(&self.root, byte_pos)
    }

    /// Returns a forward character iterator starting at byte offset
    /// `byte_pos`.
    pub fn iter_from_byte(&self, byte_pos: usize) -> RopeCursor<'_> {
        RopeCursor::at_byte(&self.root, byte_pos.min(self.stats.bytes))
    }

    /// Returns a forward character iterator starting at the beginning of
    /// the rope.
    pub fn chars(&self) -> RopeCursor<'_> {
        RopeCursor::new(&self.root)
    }
}

impl Default for Rope {
    fn default() -> Rope {
        Rope::new()
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rope[{:?}] {:?}", self.to_string(), self.stats)
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::with_capacity(self.stats.bytes);
        self.root.push_str_to(&mut s);
        f.write_str(&s)
    }
}

impl From<&str> for Rope {
    fn from(s: &str) -> Rope {
        Rope::from_root(Node::from_bytes_chunked(s.as_bytes().to_vec()))
    }
}

impl From<String> for Rope {
    fn from(s: String) -> Rope {
        Rope::from_root(Node::from_bytes_chunked(s.into_bytes()))
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Rope) -> bool {
        self.stats == other.stats && self.to_string() == other.to_string()
    }
}

impl Eq for Rope {}

impl PartialEq<str> for Rope {
    fn eq(&self, other: &str) -> bool {
        self.stats.bytes == other.len() && self.to_string() == other
    }
}

impl PartialEq<&str> for Rope {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<String> for Rope {
    fn eq(&self, other: &String) -> bool {
        self == other.as_str()
    }
}

impl ops::Add for Rope {
    type Output = Rope;

    /// Concatenates two ropes, returning a new one.
    ///
    /// # Examples
    ///
    /// ```
    /// use strand::Rope;
    /// let rope = Rope::from("ab") + Rope::from("cd");
    /// assert_eq!(rope.to_string(), "abcd");
    /// ```
    fn add(self, other: Rope) -> Rope {
        Rope::from_root(self.root.concat(other.root))
    }
}

impl ops::AddAssign for Rope {
    /// Concatenates `other` onto this rope in place.
    fn add_assign(&mut self, other: Rope) {
        self.append(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_reports_lengths_and_content() {
        let rope = Rope::from_bytes(b"Hello, World!".to_vec()).unwrap();
        assert_eq!(rope.byte_len(), 13);
        assert_eq!(rope.char_len(), 13);
        assert_eq!(rope.to_string(), "Hello, World!");
    }

    #[test]
    fn from_bytes_rejects_invalid_utf8() {
        assert!(Rope::from_bytes(vec![0xFF, 0xFE]).is_err());
    }

    #[test]
    fn insert_into_the_middle() {
        let mut rope = Rope::from("Helo");
        rope.insert_bytes(2, b"l");
        assert_eq!(rope.to_string(), "Hello");
        assert_eq!(rope.byte_len(), 5);
        assert_eq!(rope.char_len(), 5);
    }

    #[test]
    fn multi_byte_char_lengths_and_offsets() {
        let bytes = "caf\u{e9}".as_bytes().to_vec();
        let rope = Rope::from_bytes(bytes).unwrap();
        assert_eq!(rope.char_len(), 4);
        assert_eq!(rope.char_to_byte(3), 3);
        assert_eq!(rope.char_to_byte(4), 5);
        assert_eq!(rope.byte_to_char(4), 3);
    }

    #[test]
    fn char_at_on_cjk_text() {
        let bytes = "AB\u{65e5}\u{672c}".as_bytes().to_vec();
        let rope = Rope::from_bytes(bytes).unwrap();
        assert_eq!(rope.char_at(2), '\u{65e5}');
        assert_eq!(rope.char_at(3), '\u{672c}');
    }

    #[test]
    fn one_char_at_a_time_inserts_match_reference_string() {
        let phrase = "The quick brown fox jumps over the lazy dog.";
        let mut rope = Rope::new();
        for (i, c) in phrase.chars().enumerate() {
            rope.insert_chars(i, &[c]);
        }
        assert_eq!(rope.to_string(), phrase);
        assert!(rope.root.check_no_red_red());
    }

    #[test]
    fn split_then_concat_round_trips() {
        let rope = Rope::from("abcdefgh");
        let expected = rope.to_string();
        for p in 0..=expected.len() {
            let r = Rope::from(expected.clone());
            let (l, right) = r.split_bytes(p);
            let rejoined = l + right;
            assert_eq!(rejoined.to_string(), expected);
        }
    }

    #[test]
    fn delete_then_reinsert_restores_content() {
        let mut rope = Rope::from("this is not fine");
        let original = rope.to_string();
        let removed: Vec<u8> = {
            let mut buf = vec![0u8; 4];
            rope.copy_bytes(8, &mut buf);
            buf
        };
        rope.delete_bytes(8, 12);
        assert_eq!(rope.to_string(), "this is fine");
        rope.insert_bytes(8, &removed);
        assert_eq!(rope.to_string(), original);
    }

    #[test]
    fn substring_extracts_the_requested_range() {
        let rope = Rope::from("abcdefgh");
        let middle = rope.substring_bytes(2, 5);
        assert_eq!(middle.to_string(), "cde");
    }

    #[test]
    fn line_indexing_follows_newlines() {
        let rope = Rope::from("one\ntwo\nthree");
        assert_eq!(rope.line_count(), 3);
        assert_eq!(rope.line_to_byte(0), 0);
        assert_eq!(rope.line_to_byte(1), 4);
        assert_eq!(rope.line_to_byte(2), 8);
        assert_eq!(rope.byte_to_line(5), 1);
        assert_eq!(rope.char_to_line(9), 2);
    }

    #[test]
    fn validate_utf8_reflects_construction_path() {
        let strict = Rope::from("hello");
        assert!(strict.validate_utf8());
        let lossy = Rope::from_bytes_lossy(&[0xFF, b'a']);
        assert!(!lossy.validate_utf8());
    }

    #[test]
    fn equality_compares_content_not_structure() {
        let mut a = Rope::from("ab");
        a.append(Rope::from("cd"));
        let b = Rope::from("abcd");
        assert_eq!(a, b);
        assert_eq!(a, "abcd");
    }
}
