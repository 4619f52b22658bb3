// Forward-only byte cursor over one logical stream built from ordered sources.
use std::collections::VecDeque;
use std::io::{self, Read};

use crate::core::error::{Error, ErrorKind};

/// Presents several readers as one continuous stream, drained in order.
pub struct ConcatSource {
    sources: VecDeque<Box<dyn Read + Send>>,
}

impl ConcatSource {
    pub fn new() -> Self {
        Self {
            sources: VecDeque::new(),
        }
    }

    pub fn push(&mut self, source: impl Read + Send + 'static) {
        self.sources.push_back(Box::new(source));
    }

    pub fn with_source(mut self, source: impl Read + Send + 'static) -> Self {
        self.push(source);
        self
    }
}

impl Default for ConcatSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for ConcatSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while let Some(front) = self.sources.front_mut() {
            let n = front.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            self.sources.pop_front();
        }
        Ok(0)
    }
}

#[derive(Debug)]
pub struct ByteCursor<R> {
    source: R,
    offset: u64,
    row: u64,
}

impl<R: Read> ByteCursor<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            offset: 0,
            row: 1,
        }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 1-based number of the row currently being decoded.
    pub fn row(&self) -> u64 {
        self.row
    }

    pub(crate) fn finish_row(&mut self) {
        self.row += 1;
    }

    /// Reads exactly `n` bytes.
    ///
    /// Fails with `EndOfStream` when the stream was already exhausted and
    /// with `TruncatedRead` when it ran dry part way through.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(Error::new(ErrorKind::Io)
                        .with_message("failed to read table data")
                        .with_offset(self.offset + filled as u64)
                        .with_source(err));
                }
            }
        }

        let start = self.offset;
        self.offset += filled as u64;
        if filled == n {
            return Ok(buf);
        }
        if filled == 0 {
            return Err(Error::new(ErrorKind::EndOfStream).with_offset(start));
        }
        Err(Error::new(ErrorKind::TruncatedRead)
            .with_message(format!("wanted {n} bytes, stream held {filled}"))
            .with_byte_count(n)
            .with_offset(start))
    }
}
