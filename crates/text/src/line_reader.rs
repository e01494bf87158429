//! A streaming line reader tolerant of mixed line endings

use std::io::Read;

/// Reads one logical line at a time from an underlying byte stream
///
/// A line ends at `\n`, `\r`, or `\r\n` (the pair is consumed as a single
/// terminator). `LineReader` buffers ahead only as far as needed to decide
/// whether a lone `\r` is followed by a `\n`, so it works against any
/// `Read` implementation, including ones that are not seekable.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    pending: Option<u8>,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    /// Wrap a byte stream for line-at-a-time reading
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: None,
            eof: false,
        }
    }

    /// `true` once the underlying stream has been fully consumed
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    fn next_byte(&mut self) -> Option<u8> {
        if let Some(b) = self.pending.take() {
            return Some(b);
        }
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf[0]),
            Err(_) => None,
        }
    }

    /// Read the next logical line, truncating at `cap` bytes if given
    ///
    /// When a cap truncates a line, the stream is left positioned
    /// immediately after the truncation point: any remaining bytes of that
    /// logical line, plus its terminator, are consumed and discarded on the
    /// *next* call. Returns an empty string once EOF has been reached.
    pub fn read_line(&mut self, cap: Option<usize>) -> String {
        if self.eof {
            return String::new();
        }

        let mut out = Vec::new();
        let limit = cap.unwrap_or(usize::MAX);

        loop {
            if out.len() == limit {
                break;
            }

            let Some(b) = self.next_byte() else {
                self.eof = true;
                break;
            };

            match b {
                b'\n' => break,
                b'\r' => {
                    if let Some(next) = self.next_byte() {
                        if next != b'\n' {
                            self.pending = Some(next);
                        }
                    } else {
                        self.eof = true;
                    }
                    break;
                }
                _ => out.push(b),
            }
        }

        String::from_utf8_lossy(&out).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn splits_mixed_line_endings() {
        let mut reader = LineReader::new(Cursor::new(b"1 Hello\r\na\n".to_vec()));
        assert_eq!(reader.read_line(None), "1 Hello");
        assert_eq!(reader.read_line(None), "a");
        assert_eq!(reader.read_line(None), "");
        assert!(reader.is_eof());
    }

    #[test]
    fn truncates_at_byte_cap() {
        let mut reader = LineReader::new(Cursor::new(b"1 Hello".to_vec()));
        assert_eq!(reader.read_line(Some(3)), "1 H");
        assert_eq!(reader.read_line(Some(3)), "ell");
        assert_eq!(reader.read_line(Some(3)), "o");
    }

    #[test]
    fn lone_cr_is_a_terminator() {
        let mut reader = LineReader::new(Cursor::new(b"abc\rdef".to_vec()));
        assert_eq!(reader.read_line(None), "abc");
        assert_eq!(reader.read_line(None), "def");
    }
}
