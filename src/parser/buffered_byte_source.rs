//! Streaming byte source for tree files too large to load at once.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use crate::parser::byte_source::ByteSource;

// =#========================================================================#=
// BUFFERED BYTE SOURCE
// =#========================================================================#=
/// Byte source reading a file through a [BufReader].
///
/// Multi-byte peeks that straddle the reader's internal buffer are served
/// from a small side buffer and the reader is seeked back afterwards.
pub struct BufferedByteSource {
    reader: BufReader<File>,
    peek_buffer: Vec<u8>,
    pos: usize,
}

impl BufferedByteSource {
    /// Large enough for the longest keyword peeked at (`TRANSLATE`).
    const PEEK_BUFFER_CAPACITY: usize = 16;

    /// Opens the file at `path`.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be opened.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            peek_buffer: Vec::with_capacity(Self::PEEK_BUFFER_CAPACITY),
            pos: 0,
        })
    }
}

impl ByteSource for BufferedByteSource {
    fn peek(&mut self) -> Option<u8> {
        let buf = self.reader.fill_buf().ok()?;
        buf.first().copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.reader.consume(1);
        self.pos += 1;
        Some(byte)
    }

    fn peek_slice(&mut self, k: usize) -> &[u8] {
        self.peek_buffer.clear();

        let available = match self.reader.fill_buf() {
            Ok(buf) => buf,
            Err(_) => return &self.peek_buffer,
        };

        if available.len() >= k {
            self.peek_buffer.extend_from_slice(&available[..k]);
            return &self.peek_buffer;
        }

        // Straddles the internal buffer: read ahead, then seek back
        self.peek_buffer.extend_from_slice(available);
        let mut consumed = available.len();
        self.reader.consume(consumed);
        while self.peek_buffer.len() < k {
            let buf = match self.reader.fill_buf() {
                Ok([]) | Err(_) => break,
                Ok(buf) => buf,
            };
            let take = (k - self.peek_buffer.len()).min(buf.len());
            self.peek_buffer.extend_from_slice(&buf[..take]);
            self.reader.consume(take);
            consumed += take;
        }
        let _ = self.reader.seek(SeekFrom::Current(-(consumed as i64)));

        &self.peek_buffer
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn set_position(&mut self, pos: usize) {
        let _ = self.reader.seek(SeekFrom::Start(pos as u64));
        self.pos = pos;
    }

    fn is_eof(&mut self) -> bool {
        match self.reader.fill_buf() {
            Ok(buf) => buf.is_empty(),
            Err(_) => true,
        }
    }
}

// =#========================================================================#=
// TESTS - BUFFERED BYTE SOURCE
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_peek_and_rewind() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#NEXUS\nBegin trees;").unwrap();

        let mut source = BufferedByteSource::from_file(file.path()).unwrap();
        assert_eq!(source.peek_slice(6), b"#NEXUS");
        assert_eq!(source.next_byte(), Some(b'#'));
        assert_eq!(source.position(), 1);

        source.set_position(7);
        assert_eq!(source.peek(), Some(b'B'));
        source.set_position(0);
        assert_eq!(source.peek(), Some(b'#'));
    }
}
