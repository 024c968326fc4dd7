//! Console seam for the STDOUT and STDIN instructions.
//!
//! The engine never touches stdio directly; it talks to a [`Console`].
//! [`StdConsole`] is wired to the process streams, [`BufferConsole`]
//! keeps everything in memory for tests, the debugger and WASM.

use std::io::{self, BufRead, Cursor, Write};

/// Byte-level console used by the I/O instructions.
pub trait Console {
    /// Write raw bytes to the output stream.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read one line with a single trailing `\n` removed.
    /// Returns `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Read a decimal integer (leading whitespace skipped, optional sign),
    /// then discard the rest of the line. Returns `None` when no number
    /// could be parsed.
    fn read_number(&mut self) -> io::Result<Option<i64>>;
}

/// A console over any buffered reader and writer.
#[derive(Debug)]
pub struct StreamConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StreamConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn input_mut(&mut self) -> &mut R {
        &mut self.input
    }

    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.fill_buf()?.first().copied())
    }

    /// Consume bytes up to and including the next newline.
    fn skip_line(&mut self) -> io::Result<()> {
        let mut discard = Vec::new();
        self.input.read_until(b'\n', &mut discard)?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.write_all(bytes)?;
        self.output.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn read_number(&mut self) -> io::Result<Option<i64>> {
        while let Some(byte) = self.peek_byte()? {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.input.consume(1);
        }

        let mut negative = false;
        if let Some(sign @ (b'-' | b'+')) = self.peek_byte()? {
            negative = sign == b'-';
            self.input.consume(1);
        }

        let mut value: i64 = 0;
        let mut digits = 0usize;
        while let Some(byte) = self.peek_byte()? {
            if !byte.is_ascii_digit() {
                break;
            }
            value = value.wrapping_mul(10).wrapping_add((byte - b'0') as i64);
            digits += 1;
            self.input.consume(1);
        }

        self.skip_line()?;

        if digits == 0 {
            return Ok(None);
        }
        Ok(Some(if negative { value.wrapping_neg() } else { value }))
    }
}

/// Console bound to the process stdin and stdout.
pub type StdConsole = StreamConsole<io::StdinLock<'static>, io::Stdout>;

impl StdConsole {
    pub fn stdio() -> Self {
        StreamConsole::new(io::stdin().lock(), io::stdout())
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::stdio()
    }
}

/// In-memory console: scripted input, captured output.
pub type BufferConsole = StreamConsole<Cursor<Vec<u8>>, Vec<u8>>;

impl BufferConsole {
    /// Create a console that will feed `input` to STDIN.
    pub fn with_input(input: impl Into<Vec<u8>>) -> Self {
        StreamConsole::new(Cursor::new(input.into()), Vec::new())
    }

    /// Captured output, lossily decoded as UTF-8.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Drop everything captured so far.
    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Append more bytes to the pending input.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.get_mut().extend_from_slice(bytes);
    }
}

impl Default for BufferConsole {
    fn default() -> Self {
        Self::with_input(Vec::new())
    }
}
