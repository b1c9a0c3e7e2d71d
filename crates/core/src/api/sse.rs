//! Incremental decoder for `text/event-stream` bodies.
//!
//! Only `data:` fields matter to the log view; `event`, `id` and `retry`
//! fields and comment lines are skipped. Chunks are split on raw `\n` bytes so
//! multi-byte characters straddling a chunk boundary decode intact.

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one body chunk and returns every message it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            self.process_line(&line, &mut out);
        }
        out
    }

    fn process_line(&mut self, line: &str, out: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                out.push(self.data.join("\n"));
                self.data.clear();
            }
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_messages_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: step 1").is_empty());
        assert_eq!(decoder.feed(b"00\n\ndata: step 2\n"), vec!["step 100"]);
        assert_eq!(decoder.feed(b"\n"), vec!["step 2"]);
    }

    #[test]
    fn joins_multiline_data_and_skips_other_fields() {
        let mut decoder = SseDecoder::new();
        let out = decoder.feed(b": keepalive\r\nevent: log\r\nid: 7\r\ndata: a\r\ndata:b\r\n\r\n");
        assert_eq!(out, vec!["a\nb"]);
    }

    #[test]
    fn keeps_multibyte_characters_split_between_chunks() {
        let mut decoder = SseDecoder::new();
        let text = "data: reward → 1.0\n\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xe2).unwrap() + 1;
        assert!(decoder.feed(&text[..split]).is_empty());
        assert_eq!(decoder.feed(&text[split..]), vec!["reward → 1.0"]);
    }
}
