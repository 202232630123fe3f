//! # SSE Wire Decoder
//! Incremental text/event-stream frame parser. Fed raw transport chunks in
//! whatever sizes the network delivers; emits complete frames only.
//!
//! Comment lines (leading `:`, the server's heartbeat) and unknown fields are
//! consumed and dropped. A frame is dispatched on the blank line, per the
//! event-stream format.

/// One decoded frame: the event name (default `message`) and its data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: String,
    event: Option<String>,
    data: Vec<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns every frame completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            self.take_line(line, &mut frames);
        }
        frames
    }

    fn take_line(&mut self, line: &str, frames: &mut Vec<SseFrame>) {
        if line.is_empty() {
            // Dispatch boundary. Comment-only frames carry no data and
            // produce nothing.
            if !self.data.is_empty() {
                frames.push(SseFrame {
                    event: self.event.take().unwrap_or_else(|| "message".to_string()),
                    data: self.data.join("\n"),
                });
            }
            self.event = None;
            self.data.clear();
            return;
        }
        if line.starts_with(':') {
            return; // heartbeat / comment
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id / retry / anything else: not used by this client
            _ => {}
        }
    }
}
