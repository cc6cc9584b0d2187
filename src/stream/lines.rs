use memchr::memchr_iter;

const COMPACT_THRESHOLD: usize = 8 * 1024;

/// Incremental newline splitter.
///
/// Feed it raw fragments arriving on arbitrary byte boundaries and it hands
/// back every complete line, holding the trailing partial line until more
/// bytes arrive. Splitting happens on bytes, so a multi-byte UTF-8 sequence
/// cut between fragments is reassembled before it is ever decoded.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    read_offset: usize,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet emitted as a line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len() - self.read_offset
    }

    /// Append a fragment and call `on_line` for every line it completes.
    ///
    /// Lines are passed without their terminator; a trailing `\r` is dropped.
    pub fn feed<F>(&mut self, fragment: &[u8], mut on_line: F)
    where
        F: FnMut(&str),
    {
        let scan_start = self.buffer.len();
        self.buffer.extend_from_slice(fragment);

        let mut processed_up_to = self.read_offset;
        for rel_pos in memchr_iter(b'\n', &self.buffer[scan_start..]) {
            let line_end = scan_start + rel_pos;
            emit_line(&self.buffer[processed_up_to..line_end], &mut on_line);
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2
                || self.read_offset >= COMPACT_THRESHOLD);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    /// Flush the trailing partial line, if any, at end of input.
    pub fn finish<F>(&mut self, mut on_line: F)
    where
        F: FnMut(&str),
    {
        if self.pending_len() > 0 {
            emit_line(&self.buffer[self.read_offset..], &mut on_line);
        }
        self.buffer.clear();
        self.read_offset = 0;
    }
}

fn emit_line<F>(raw: &[u8], on_line: &mut F)
where
    F: FnMut(&str),
{
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    match std::str::from_utf8(raw) {
        Ok(line) => on_line(line),
        Err(_) => on_line(&String::from_utf8_lossy(raw)),
    }
}
