//! Byte source abstraction underneath [ByteParser](crate::parser::ByteParser).
//!
//! Tree files produced by long MCMC runs range from a few kilobytes to many
//! gigabytes, so the parser reads through this trait and is handed either an
//! [InMemoryByteSource](crate::parser::in_memory_byte_source::InMemoryByteSource)
//! or a [BufferedByteSource](crate::parser::buffered_byte_source::BufferedByteSource).

// =#========================================================================#=
// BYTE SOURCE (Trait)
// =#========================================================================#=
/// Sequential, seekable access to the bytes of a tree file.
pub trait ByteSource {
    /// Returns the current byte without consuming it, `None` at EOF.
    fn peek(&mut self) -> Option<u8>;

    /// Returns the current byte and advances past it, `None` at EOF.
    fn next_byte(&mut self) -> Option<u8>;

    /// Returns up to `k` bytes from the current position without consuming them.
    ///
    /// Fewer than `k` bytes are returned close to EOF.
    fn peek_slice(&mut self, k: usize) -> &[u8];

    /// Returns the absolute byte offset of the current position.
    fn position(&self) -> usize;

    /// Moves to the absolute byte offset `pos`.
    ///
    /// Used to rewind after counting tree statements.
    fn set_position(&mut self, pos: usize);

    /// Returns whether all bytes have been consumed.
    fn is_eof(&mut self) -> bool;
}
