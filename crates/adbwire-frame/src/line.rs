/// Incremental UTF-8 line decoder for unframed output streams.
///
/// Raw reads may split a line, or a multi-byte character, at any byte. The
/// decoder keeps two pieces of session state between reads: undecoded bytes
/// of an incomplete trailing character, and the text of a line that has not
/// seen its newline yet. Lines come out in stream order; empty lines are
/// skipped. Call [`LineDecoder::finish`] at end of stream to flush the last
/// unterminated line.
///
/// Byte sequences that can never become valid UTF-8 are replaced with
/// U+FFFD rather than buffered forever.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending_bytes: Vec<u8>,
    pending_line: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk, passing each completed line to `emit`.
    pub fn feed<F: FnMut(String)>(&mut self, chunk: &[u8], mut emit: F) {
        let text = self.decode_text(chunk);
        if text.is_empty() {
            return;
        }

        self.pending_line.push_str(&text);
        let Some(last_newline) = self.pending_line.rfind('\n') else {
            return;
        };

        let tail = self.pending_line.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending_line, tail);
        for line in complete.split('\n') {
            if !line.is_empty() {
                emit(line.to_string());
            }
        }
    }

    /// Flush at end of stream. Returns the unterminated last line, if any.
    ///
    /// A dangling partial character is decoded lossily into that line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            let bytes = std::mem::take(&mut self.pending_bytes);
            self.pending_line.push_str(&String::from_utf8_lossy(&bytes));
        }
        let line = std::mem::take(&mut self.pending_line);
        (!line.is_empty()).then_some(line)
    }

    /// Whether any undecoded bytes or unterminated text is buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending_bytes.is_empty() || !self.pending_line.is_empty()
    }

    /// Decode a complete byte stream in one go.
    pub fn decode_all(bytes: &[u8]) -> Vec<String> {
        let mut decoder = Self::new();
        let mut lines = Vec::new();
        decoder.feed(bytes, |line| lines.push(line));
        lines.extend(decoder.finish());
        lines
    }

    fn decode_text(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[bad..];
                        }
                        None => {
                            // Incomplete character at the end: wait for the next read.
                            self.pending_bytes = rest.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }
}
