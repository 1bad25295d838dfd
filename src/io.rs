use std::collections::VecDeque;
use std::io::{self, BufRead, ErrorKind, Write};

/// Source of bytes for `Get` instructions.
///
/// The VM always asks `eof` first and only calls `get_byte` when it
/// returned `false`. `eof` must not consume anything.
pub trait Input {
    fn eof(&mut self) -> io::Result<bool>;
    fn get_byte(&mut self) -> io::Result<u8>;
}

/// Sink for `Put` instructions. Each call receives the whole batch for one
/// instruction.
pub trait Output {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

fn exhausted() -> io::Error {
    io::Error::new(ErrorKind::UnexpectedEof, "input exhausted")
}

impl<'a> Input for &'a [u8] {
    fn eof(&mut self) -> io::Result<bool> {
        Ok(self.is_empty())
    }

    fn get_byte(&mut self) -> io::Result<u8> {
        let slice: &'a [u8] = *self;
        let (&byte, rest) = slice.split_first().ok_or_else(exhausted)?;
        *self = rest;
        Ok(byte)
    }
}

impl Input for VecDeque<u8> {
    fn eof(&mut self) -> io::Result<bool> {
        Ok(self.is_empty())
    }

    fn get_byte(&mut self) -> io::Result<u8> {
        self.pop_front().ok_or_else(exhausted)
    }
}

/// Adapts any buffered reader. EOF is detected by peeking the buffer, so
/// asking repeatedly never loses a byte.
pub struct ReadInput<R> {
    inner: R,
}

impl<R: BufRead> ReadInput<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Next buffered byte without consuming it, retrying interrupted reads.
    fn peek(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: BufRead> Input for ReadInput<R> {
    fn eof(&mut self) -> io::Result<bool> {
        Ok(self.peek()?.is_none())
    }

    fn get_byte(&mut self) -> io::Result<u8> {
        let byte = self.peek()?.ok_or_else(exhausted)?;
        self.inner.consume(1);
        Ok(byte)
    }
}

impl Output for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Adapts any writer; each batch goes out through a single `write_all`.
pub struct WriteOutput<W> {
    inner: W,
}

impl<W: Write> WriteOutput<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Output for WriteOutput<W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }
}
