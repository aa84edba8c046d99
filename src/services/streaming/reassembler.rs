//! Chunk reassembly
//!
//! Turns raw byte chunks into complete newline-terminated records. UTF-8
//! is decoded incrementally: a code point split across two chunks is held
//! back until its remaining bytes arrive, so no replacement character is
//! produced for it.

/// Incremental UTF-8 decoder plus line splitter
#[derive(Debug, Default)]
pub struct ChunkReassembler {
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,

    /// Decoded text not yet terminated by a newline
    carry: String,
}

impl ChunkReassembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the records it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // Earlier text in the carry holds no newline.
        let scan_from = self.carry.len();
        if self.pending.is_empty() {
            self.decode(chunk);
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            self.decode(&joined);
        }

        let mut records = Vec::new();
        let mut start = 0;
        let mut scan = scan_from;
        while let Some(offset) = self.carry[scan..].find('\n') {
            let line_end = scan + offset;
            records.push(self.carry[start..line_end].to_string());
            start = line_end + 1;
            scan = start;
        }
        if start > 0 {
            self.carry.drain(..start);
        }
        records
    }

    /// Decoded text waiting for its newline
    #[must_use]
    pub fn carry(&self) -> &str {
        &self.carry
    }

    /// End the stream, dropping any unterminated tail.
    ///
    /// Returns the number of bytes discarded (carry plus undecoded bytes).
    pub fn finish(&mut self) -> usize {
        let discarded = self.carry.len() + self.pending.len();
        self.carry.clear();
        self.pending.clear();
        discarded
    }

    fn decode(&mut self, mut bytes: &[u8]) {
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    self.carry.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, rest) = bytes.split_at(err.valid_up_to());
                    self.carry.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            // Genuinely invalid bytes, not a split sequence.
                            self.carry.push(char::REPLACEMENT_CHARACTER);
                            bytes = &rest[bad..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }
}
