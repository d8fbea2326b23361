//! The output sink: a line-oriented writer with a CR-terminated line
//! primitive and formatted print. The teacher writes straight to a
//! `std::fs::File` with `write!`/`writeln!` in `sdf.rs` and `mol2.rs`.
//! `MolWriter` generalizes that one step: it's generic over any `Write`, so
//! the V3000 multi-line wrapper in `fmt.rs` can share logic between a real
//! file and an in-memory `Vec<u8>` in tests.

use std::io::{self, Write};

pub struct MolWriter<W: Write> {
    inner: W,
}

impl<W: Write> MolWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.inner.write_all(s.as_bytes())
    }

    pub fn write_char(&mut self, c: char) -> io::Result<()> {
        let mut buf = [0u8; 4];
        self.inner.write_all(c.encode_utf8(&mut buf).as_bytes())
    }

    /// Terminates the current line. Molfiles are written with a plain `\n`
    /// in practice regardless of host platform. "CR" is the format's
    /// historical name for this primitive, not a literal carriage return.
    pub fn write_cr(&mut self) -> io::Result<()> {
        self.inner.write_all(b"\n")
    }

    pub fn write_str_cr(&mut self, s: &str) -> io::Result<()> {
        self.write_str(s)?;
        self.write_cr()
    }

    /// `printf` semantics via `format_args!`, followed by a line terminator.
    pub fn printf_cr(&mut self, args: std::fmt::Arguments) -> io::Result<()> {
        self.inner.write_fmt(args)?;
        self.write_cr()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for MolWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
