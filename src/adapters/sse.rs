//! Incremental Server-Sent Events decoder
//!
//! Bytes arrive in arbitrary chunks from the HTTP body; frames are
//! emitted once their terminating blank line has been seen. Unterminated
//! lines and undispatched frames are bounded by `max_frame` bytes.

/// Firebase sends the whole subtree in one `data:` line
pub const DEFAULT_MAX_FRAME: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SSE frame exceeds {limit} bytes")]
pub struct FrameTooLarge {
    pub limit: usize,
}

/// One dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
    max_frame: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            buffer: Vec::new(),
            event: None,
            data: Vec::new(),
            data_len: 0,
            max_frame,
        }
    }

    /// Feed a chunk and collect every frame it completes.
    ///
    /// Fails once a line or a pending frame grows past the limit; the
    /// decoder is unusable afterwards.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, FrameTooLarge> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        if self.buffer.len() + self.data_len > self.max_frame {
            return Err(FrameTooLarge {
                limit: self.max_frame,
            });
        }
        Ok(frames)
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data_len += value.len() + 1;
                self.data.push(value.to_string());
            }
            // id / retry are irrelevant here: reconnects are never attempted
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if event.is_none() && self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        self.data_len = 0;
        Some(SseFrame {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_complete_frame() {
        let mut decoder = SseDecoder::new();
        let frames =
            decoder.push(b"event: put\ndata: {\"path\":\"/\",\"data\":\"on\"}\n\n").unwrap();
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "put".to_string(),
                data: r#"{"path":"/","data":"on"}"#.to_string(),
            }]
        );
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: pa").unwrap().is_empty());
        assert!(decoder.push(b"tch\r\ndata: {\"a\"").unwrap().is_empty());
        assert!(decoder.push(b":1}\r\n").unwrap().is_empty());
        let frames = decoder.push(b"\r\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "patch");
        assert_eq!(frames[0].data, r#"{"a":1}"#);
    }

    #[test]
    fn test_multiple_frames_and_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(
            b": hello\n\nevent: keep-alive\ndata: null\n\ndata: line1\ndata: line2\n\n",
        ).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "keep-alive");
        assert_eq!(frames[0].data, "null");
        assert_eq!(frames[1].event, "message");
        assert_eq!(frames[1].data, "line1\nline2");
    }

    #[test]
    fn test_incomplete_frame_is_held_back() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: put\ndata: {}\n").unwrap().is_empty());
        assert_eq!(decoder.push(b"\n").unwrap().len(), 1);
    }

    #[test]
    fn test_unterminated_line_is_bounded() {
        let mut decoder = SseDecoder::with_max_frame(16);
        assert!(decoder.push(b"data: 0123").unwrap().is_empty());
        assert_eq!(
            decoder.push(b"456789abcdef").unwrap_err(),
            FrameTooLarge { limit: 16 }
        );
    }

    #[test]
    fn test_undispatched_data_lines_are_bounded() {
        let mut decoder = SseDecoder::with_max_frame(16);
        assert!(decoder.push(b"data: 01234\n").unwrap().is_empty());
        assert!(decoder.push(b"data: 56789\n").is_err());
    }

    #[test]
    fn test_limit_resets_after_dispatch() {
        let mut decoder = SseDecoder::with_max_frame(16);
        for _ in 0..4 {
            assert_eq!(decoder.push(b"data: 0123456\n\n").unwrap().len(), 1);
        }
    }
}
