//! Inbound byte stream to protocol lines.

/// Accumulates raw bytes and yields complete lines.
///
/// The gateway terminates lines with either `\r\n` or `\n`; every `\r` is
/// dropped and lines are split on `\n`. A trailing partial line stays buffered
/// until the next push.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line they completed, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut lines = Vec::new();
        while let Some(index) = self.buffer.iter().position(|b| *b == b'\n') {
            let rest = self.buffer.split_off(index + 1);
            let mut line = std::mem::replace(&mut self.buffer, rest);
            line.pop();
            if line.is_empty() {
                continue;
            }
            match String::from_utf8(line) {
                Ok(text) => lines.push(text),
                Err(err) => {
                    tracing::debug!(bytes = err.as_bytes().len(), "Invalid UTF-8 in line, decoding lossily");
                    lines.push(String::from_utf8_lossy(err.as_bytes()).into_owned());
                }
            }
        }
        lines
    }

    /// Bytes held for an incomplete line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
