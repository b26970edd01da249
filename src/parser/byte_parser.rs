//! Byte-level scanner for the ASCII tree formats.
//!
//! [ByteParser] offers the peek/consume/skip primitives the Newick and Nexus
//! readers are written in. It distinguishes plain `[...]` comments, which are
//! skipped like whitespace, from `[&...]` annotation blocks, which carry the
//! per-vertex data (discrete states, jump histories) this crate is about.

use crate::parser::buffered_byte_source::BufferedByteSource;
use crate::parser::byte_source::ByteSource;
use crate::parser::in_memory_byte_source::InMemoryByteSource;
use crate::parser::parsing_error::ParsingError;
use std::path::Path;

/// Files at or above this size are streamed rather than loaded (100 MB).
const AUTO_IN_MEMORY_THRESHOLD: u64 = 100 * 1024 * 1024;

// =#========================================================================#=
// READ STRATEGY
// =#========================================================================#=
/// How a tree file is brought into the parser.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReadStrategy {
    /// Stream the file through a buffered reader.
    Buffered,
    /// Load the whole file before parsing.
    InMemory,
    /// Pick by file size; the default.
    #[default]
    Automatic,
}

impl ReadStrategy {
    /// Resolves [ReadStrategy::Automatic] against the size of the file at `path`.
    pub(crate) fn use_buffered<P: AsRef<Path>>(&self, path: P) -> bool {
        match self {
            ReadStrategy::Buffered => true,
            ReadStrategy::InMemory => false,
            ReadStrategy::Automatic => {
                let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                file_size >= AUTO_IN_MEMORY_THRESHOLD
            }
        }
    }
}

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// A byte-by-byte scanner with case-insensitive keyword matching.
///
/// # Example
/// ```
/// use jumphistory::parser::ByteParser;
///
/// let mut parser = ByteParser::for_str("  [a comment] tree STATE_0 = (A,B);");
/// parser.skip_comment_and_whitespace().unwrap();
/// assert!(parser.consume_if_word("TREE"));
/// ```
pub struct ByteParser<S: ByteSource> {
    source: S,
}

// ============================================================================
// Construction (pub)
// ============================================================================
impl ByteParser<InMemoryByteSource> {
    /// Creates a parser over a copy of `input`.
    pub fn for_str(input: &str) -> Self {
        Self::new(InMemoryByteSource::from_vec(input.as_bytes().to_vec()))
    }

    /// Creates a parser over the whole file, read into memory.
    ///
    /// # Errors
    /// Returns a [ParsingError] wrapping the I/O error if the file cannot be read.
    pub fn from_file_in_memory<P: AsRef<Path>>(path: P) -> Result<Self, ParsingError> {
        Ok(Self::new(InMemoryByteSource::from_file(path)?))
    }
}

impl ByteParser<BufferedByteSource> {
    /// Creates a parser streaming the file through a buffered reader.
    ///
    /// # Errors
    /// Returns a [ParsingError] wrapping the I/O error if the file cannot be opened.
    pub fn from_file_buffered<P: AsRef<Path>>(path: P) -> Result<Self, ParsingError> {
        Ok(Self::new(BufferedByteSource::from_file(path)?))
    }
}

impl<S: ByteSource> ByteParser<S> {
    /// Creates a parser over the given byte source.
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

// ============================================================================
// Peeking & Consuming (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Returns the current byte without consuming it.
    #[inline(always)]
    pub fn peek(&mut self) -> Option<u8> {
        self.source.peek()
    }

    /// Consumes and returns the current byte.
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        self.source.next_byte()
    }

    /// Returns whether the current byte equals `ch`, ignoring ASCII case.
    pub fn peek_is(&mut self, ch: u8) -> bool {
        self.peek().is_some_and(|b| b.eq_ignore_ascii_case(&ch))
    }

    /// Returns whether the upcoming bytes equal `sequence`, ignoring ASCII case.
    pub fn peek_is_sequence(&mut self, sequence: &[u8]) -> bool {
        let upcoming = self.source.peek_slice(sequence.len());
        upcoming.len() == sequence.len() && upcoming.eq_ignore_ascii_case(sequence)
    }

    /// Consumes the current byte if it equals `ch` (ignoring case).
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.next_byte();
            true
        } else {
            false
        }
    }

    /// Consumes `word` if it comes next (ignoring case).
    pub fn consume_if_word(&mut self, word: &str) -> bool {
        self.consume_if_sequence(word.as_bytes())
    }

    /// Consumes `sequence` if it comes next (ignoring case).
    pub fn consume_if_sequence(&mut self, sequence: &[u8]) -> bool {
        if !self.peek_is_sequence(sequence) {
            return false;
        }
        for _ in 0..sequence.len() {
            self.next_byte();
        }
        true
    }

    /// Consumes bytes until `target` is found.
    ///
    /// # Returns
    /// `false` if EOF was reached before `target`.
    pub fn consume_until(&mut self, target: u8, mode: ConsumeMode) -> bool {
        while let Some(b) = self.peek() {
            if b == target {
                if mode == ConsumeMode::Inclusive {
                    self.next_byte();
                }
                return true;
            }
            self.next_byte();
        }
        false
    }

    /// Consumes bytes until `sequence` is found (ignoring case).
    ///
    /// # Returns
    /// `false` if EOF was reached before `sequence`.
    pub fn consume_until_sequence(&mut self, sequence: &[u8], mode: ConsumeMode) -> bool {
        while !self.is_eof() {
            if self.peek_is_sequence(sequence) {
                if mode == ConsumeMode::Inclusive {
                    for _ in 0..sequence.len() {
                        self.next_byte();
                    }
                }
                return true;
            }
            self.next_byte();
        }
        false
    }

    /// Consumes a whole `tree` statement body up to and including the closing `;`.
    ///
    /// Unlike [consume_until](Self::consume_until), a `;` inside a `[...]`
    /// comment or a quoted label does not terminate the statement.
    ///
    /// # Returns
    /// `false` if EOF was reached first.
    pub fn consume_statement(&mut self) -> bool {
        let mut bracket_depth = 0usize;
        let mut in_single = false;
        let mut in_double = false;
        while let Some(b) = self.next_byte() {
            match b {
                b'\'' if !in_double => in_single = !in_single,
                b'"' if !in_single => in_double = !in_double,
                _ if in_single || in_double => {}
                b'[' => bracket_depth += 1,
                b']' => bracket_depth = bracket_depth.saturating_sub(1),
                b';' if bracket_depth == 0 => return true,
                _ => {}
            }
        }
        false
    }
}

// ============================================================================
// Whitespace & Comments (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Skips spaces, tabs and line breaks.
    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.next_byte();
        }
    }

    /// Skips whitespace and every `[...]` block, annotation blocks included.
    ///
    /// # Errors
    /// Returns [ParsingError] if a comment is never closed.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();
        while self.peek() == Some(b'[') {
            self.skip_bracket_block()?;
            self.skip_whitespace();
        }
        Ok(())
    }

    /// Skips whitespace and plain `[...]` comments but stops in front of a
    /// `[&...]` annotation block.
    ///
    /// # Errors
    /// Returns [ParsingError] if a comment is never closed.
    pub fn skip_plain_comments_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();
        while self.peek() == Some(b'[') && !self.peek_is_sequence(b"[&") {
            self.skip_bracket_block()?;
            self.skip_whitespace();
        }
        Ok(())
    }

    /// Consumes one `[...]` block, respecting double-quoted strings inside it.
    fn skip_bracket_block(&mut self) -> Result<(), ParsingError> {
        self.next_byte(); // '['
        let mut in_double = false;
        while let Some(b) = self.next_byte() {
            match b {
                b'"' => in_double = !in_double,
                b']' if !in_double => return Ok(()),
                _ => {}
            }
        }
        Err(ParsingError::unclosed_comment(self))
    }
}

// ============================================================================
// Labels (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Parses a quoted (`'...'` or `"..."`) or unquoted label.
    ///
    /// # Arguments
    /// * `delimiters` - Bytes that end an unquoted label
    ///
    /// # Errors
    /// Returns [ParsingError] on an unclosed comment or quote.
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        self.skip_comment_and_whitespace()?;

        match self.peek() {
            Some(quote @ (b'\'' | b'"')) => self.parse_quoted_label(quote),
            _ => self.parse_unquoted_label(delimiters),
        }
    }

    /// Parses a label enclosed in `quote`; a doubled quote is an escaped one,
    /// e.g. `'Wilson''s'` gives `Wilson's`.
    ///
    /// # Errors
    /// Returns [ParsingError] if the closing quote is missing.
    pub fn parse_quoted_label(&mut self, quote: u8) -> Result<String, ParsingError> {
        self.next_byte(); // opening quote

        let mut label = Vec::new();
        loop {
            match self.next_byte() {
                None => return Err(ParsingError::unexpected_eof(self)),
                Some(b) if b == quote => {
                    if self.peek() == Some(quote) {
                        label.push(quote);
                        self.next_byte();
                    } else {
                        break;
                    }
                }
                Some(b) => label.push(b),
            }
        }

        Ok(String::from_utf8_lossy(&label).into_owned())
    }

    /// Parses an unquoted label until one of `delimiters` (or EOF).
    ///
    /// # Errors
    /// Currently infallible; `Result` for symmetry with the other label parsers.
    pub fn parse_unquoted_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        let mut label = Vec::new();
        while let Some(b) = self.peek() {
            if delimiters.contains(&b) {
                break;
            }
            label.push(b);
            self.next_byte();
        }

        Ok(String::from_utf8_lossy(&label).into_owned())
    }
}

// ============================================================================
// Position & Context (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Returns whether all bytes have been consumed.
    pub fn is_eof(&mut self) -> bool {
        self.source.is_eof()
    }

    /// Returns the current byte offset.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Moves to the given byte offset.
    pub fn set_position(&mut self, pos: usize) {
        self.source.set_position(pos);
    }

    /// Returns up to `k` upcoming bytes as (lossy) text for error messages.
    pub fn context_string(&mut self, k: usize) -> String {
        String::from_utf8_lossy(self.source.peek_slice(k)).into_owned()
    }
}

/// Whether a `consume_until` call also consumes the target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConsumeMode {
    /// Stop after the target.
    Inclusive,
    /// Stop in front of the target.
    Exclusive,
}
