//! Incremental server-sent event decoder.
//!
//! ```rust
//! use nprovider::SseDecoder;
//!
//! let mut decoder = SseDecoder::default();
//! assert!(decoder.feed("data: {\"a\"").is_empty());
//! assert_eq!(decoder.feed(":1}\n\ndata: [DONE]\n\n"), vec!["{\"a\":1}", "[DONE]"]);
//! ```

#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Raw bytes of the current incomplete line. Only whole lines are decoded
    /// so a multi-byte character split across network chunks stays intact.
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Buffers `chunk` and returns the data of every event it completes.
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Vec<String> {
        self.buffer.extend_from_slice(chunk.as_ref());
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.drain(..=newline).collect::<Vec<_>>();
            let line = String::from_utf8_lossy(&line);
            self.process_line(line.trim_end_matches(['\n', '\r']), &mut events);
        }

        events
    }

    /// Flushes a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&line);
            let mut events = Vec::new();
            self.process_line(line.trim_end_matches('\r'), &mut events);
        }

        self.dispatch()
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            events.extend(self.dispatch());
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data.push(value.to_string());
        }
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }

        Some(std::mem::take(&mut self.data).join("\n"))
    }
}
