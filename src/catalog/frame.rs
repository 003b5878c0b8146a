use crate::error::CatalogError;
use std::io::Read;

pub const FRAME_BUF_LEN: usize = 65536;

/// Anything this short at end of stream is a stray fragment (blank line,
/// array bracket), not a truncated record.
const TRAILING_FRAGMENT_MIN: usize = 4;

/// Reassembles complete newline-terminated records from a byte stream,
/// using one fixed buffer and two cursors.
///
/// `next_line` is a lending call: the returned slice borrows the internal
/// buffer and is only valid until the next call.
pub struct FrameReader<R: Read> {
    source: R,
    buf: Box<[u8]>,
    consumed: usize,
    filled: usize,
    eof: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: vec![0u8; FRAME_BUF_LEN].into_boxed_slice(),
            consumed: 0,
            filled: 0,
            eof: false,
        }
    }

    /// Next complete line with the trailing newline stripped, or `None` at
    /// end of stream. A final unterminated fragment is yielded only when it
    /// is longer than [`TRAILING_FRAGMENT_MIN`] bytes.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>, CatalogError> {
        loop {
            let newline = self.buf[self.consumed..self.filled]
                .iter()
                .position(|&b| b == b'\n');

            if let Some(offset) = newline {
                let start = self.consumed;
                self.consumed = start + offset + 1;
                return Ok(Some(&self.buf[start..start + offset]));
            }

            if self.eof {
                let start = self.consumed;
                let rest = self.filled - start;
                self.consumed = self.filled;
                if rest > TRAILING_FRAGMENT_MIN {
                    return Ok(Some(&self.buf[start..start + rest]));
                }
                return Ok(None);
            }

            // Compact the unconsumed remainder to the front and refill.
            self.buf.copy_within(self.consumed..self.filled, 0);
            self.filled -= self.consumed;
            self.consumed = 0;

            if self.filled == self.buf.len() {
                return Err(CatalogError::RecordTooLong {
                    limit: self.buf.len(),
                });
            }

            let n = self.source.read(&mut self.buf[self.filled..])?;
            if n == 0 {
                self.eof = true;
            }
            self.filled += n;
        }
    }
}
