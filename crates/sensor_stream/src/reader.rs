use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{self, Read};

const CHUNK_SIZE_BYTES: usize = 8192;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BoundedLine {
    Line {
        line_number: usize,
        bytes: Vec<u8>,
    },
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
}

/// A device line decoded to text. Invalid UTF-8 becomes U+FFFD.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawLine {
    pub line_number: usize,
    pub text: String,
    /// Whether any byte sequence had to be replaced during decoding.
    pub lossy: bool,
}

impl RawLine {
    pub fn decode(line_number: usize, bytes: &[u8]) -> Self {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let (text, lossy) = match String::from_utf8_lossy(bytes) {
            Cow::Borrowed(text) => (text.to_string(), false),
            Cow::Owned(text) => (text, true),
        };
        Self {
            line_number,
            text,
            lossy,
        }
    }
}

/// Incremental `\n` splitter that never buffers more than `max_line_bytes`
/// of a single line. Oversized lines are dropped and reported as
/// [`BoundedLine::LineTooLong`].
#[derive(Debug)]
pub struct LineSplitter {
    max_line_bytes: usize,
    current_line: Vec<u8>,
    observed_bytes: usize,
    discard_mode: bool,
    line_number: usize,
    pending_too_long: bool,
}

impl LineSplitter {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            current_line: Vec::new(),
            observed_bytes: 0,
            discard_mode: false,
            line_number: 0,
            pending_too_long: false,
        }
    }

    /// Lines completed so far.
    pub fn lines_seen(&self) -> usize {
        self.line_number
    }

    /// Bytes of the current, unterminated line held in memory.
    pub fn pending_bytes(&self) -> usize {
        self.current_line.len()
    }

    /// Feeds a chunk of transport bytes, appending every completed line to
    /// `out`.
    pub fn push<E: Extend<BoundedLine>>(&mut self, mut chunk: &[u8], out: &mut E) {
        while !chunk.is_empty() {
            let Some(newline_idx) = chunk.iter().position(|b| *b == b'\n') else {
                self.observe_bytes(chunk.len());
                if !self.discard_mode {
                    self.current_line.extend_from_slice(chunk);
                }
                return;
            };

            self.observe_bytes(newline_idx);
            if !self.discard_mode {
                self.current_line.extend_from_slice(&chunk[..newline_idx]);
            }
            out.extend(std::iter::once(self.finish_line()));
            chunk = &chunk[newline_idx + 1..];
        }
    }

    /// Flushes a trailing line that never saw its terminator.
    pub fn finish(&mut self) -> Option<BoundedLine> {
        if self.pending_too_long || !self.current_line.is_empty() {
            Some(self.finish_line())
        } else {
            None
        }
    }

    fn finish_line(&mut self) -> BoundedLine {
        let line_number = self.line_number + 1;
        self.line_number = line_number;

        if self.pending_too_long {
            let observed_bytes = self.observed_bytes;
            let max_line_bytes = self.max_line_bytes;
            self.reset_line_state();
            return BoundedLine::LineTooLong {
                line_number,
                observed_bytes,
                max_line_bytes,
            };
        }

        let bytes = std::mem::take(&mut self.current_line);
        self.reset_line_state();
        BoundedLine::Line { line_number, bytes }
    }

    fn reset_line_state(&mut self) {
        self.current_line.clear();
        self.observed_bytes = 0;
        self.discard_mode = false;
        self.pending_too_long = false;
    }

    fn observe_bytes(&mut self, additional: usize) {
        self.observed_bytes = self.observed_bytes.saturating_add(additional);
        if self.observed_bytes > self.max_line_bytes && !self.discard_mode {
            self.discard_mode = true;
            self.pending_too_long = true;
            self.current_line.clear();
        }
    }
}

/// Blocking line iterator over any [`Read`], used for captured streams.
pub struct SyncBoundedLineReader<R: Read> {
    reader: R,
    splitter: LineSplitter,
    buffer: [u8; CHUNK_SIZE_BYTES],
    ready: VecDeque<BoundedLine>,
    done: bool,
}

impl<R: Read> SyncBoundedLineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            splitter: LineSplitter::new(max_line_bytes),
            buffer: [0u8; CHUNK_SIZE_BYTES],
            ready: VecDeque::new(),
            done: false,
        }
    }

    pub fn lines_seen(&self) -> usize {
        self.splitter.lines_seen()
    }
}

impl<R: Read> Iterator for SyncBoundedLineReader<R> {
    type Item = io::Result<BoundedLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if self.done {
                return None;
            }

            match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    self.done = true;
                    return self.splitter.finish().map(Ok);
                }
                Ok(n) => self.splitter.push(&self.buffer[..n], &mut self.ready),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
