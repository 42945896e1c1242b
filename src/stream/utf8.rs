use smallvec::SmallVec;

/// Stateful UTF-8 decoder for chunked byte streams.
///
/// A multi-byte character split across two chunks is held back until the
/// rest of it arrives, so decoding a stream chunk-by-chunk yields exactly the
/// same text as decoding it in one piece. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: SmallVec<[u8; 4]>,
}

impl Utf8StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning the text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut out = String::with_capacity(chunk.len() + self.pending.len());
        self.decode_into(chunk, &mut out);
        out
    }

    /// Decode one chunk, appending complete text into `out`.
    pub fn decode_into(&mut self, chunk: &[u8], out: &mut String) {
        if self.pending.is_empty() {
            self.decode_complete_prefix(chunk, out);
            return;
        }

        let mut joined = Vec::with_capacity(self.pending.len() + chunk.len());
        joined.extend_from_slice(&self.pending);
        joined.extend_from_slice(chunk);
        self.pending.clear();
        self.decode_complete_prefix(&joined, out);
    }

    /// Flush at end of input. A dangling partial sequence decodes as U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }

    /// Number of bytes held back waiting for the rest of a character.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn decode_complete_prefix(&mut self, mut bytes: &[u8], out: &mut String) {
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    // Safety: valid_up_to is guaranteed to be a valid UTF-8 boundary.
                    let text = unsafe { std::str::from_utf8_unchecked(&bytes[..valid_up_to]) };
                    out.push_str(text);
                    match e.error_len() {
                        Some(invalid_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            bytes = &bytes[valid_up_to + invalid_len..];
                        }
                        None => {
                            // Incomplete sequence at the end of input; wait for more bytes.
                            self.pending.extend_from_slice(&bytes[valid_up_to..]);
                            return;
                        }
                    }
                }
            }
        }
    }
}
