//! STOMP 1.2 frame encoding and parsing.
//!
//! Only the frames a publish cycle needs: CONNECT, SEND and DISCONNECT
//! outbound, CONNECTED and ERROR inbound. Frames are NUL-terminated;
//! outbound bodies carry a content-length header.

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Errors from parsing a server frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Frame is empty")]
    Empty,

    #[error("Malformed header line: {0}")]
    BadHeader(String),
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// First value for a header key, if present.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// CONNECT frame opening a session against a virtual host.
    pub fn connect(virtual_host: &str) -> Self {
        Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", virtual_host)
    }

    /// SEND frame publishing `body` to `destination`.
    pub fn send(destination: &str, body: &[u8]) -> Self {
        Frame::new("SEND")
            .header("destination", destination)
            .header("content-type", "application/xml")
            .header("content-length", &body.len().to_string())
            .body(body.to_vec())
    }

    pub fn disconnect() -> Self {
        Frame::new("DISCONNECT")
    }

    /// Serialize to wire bytes, NUL terminator included.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.command.len() + self.body.len() + 64);
        out.extend_from_slice(self.command.as_bytes());
        out.push(b'\n');
        for (key, value) in &self.headers {
            out.extend_from_slice(key.as_bytes());
            out.push(b':');
            out.extend_from_slice(value.as_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }

    /// Parse one frame from raw bytes (NUL terminator already stripped).
    ///
    /// Tolerates CR LF line endings, which the protocol permits.
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        let header_end = find_blank_line(raw);
        let (header_bytes, body) = match header_end {
            Some((start, len)) => (&raw[..start], raw[start + len..].to_vec()),
            None => (raw, Vec::new()),
        };

        let text = String::from_utf8_lossy(header_bytes);
        let mut lines = text.lines().map(|line| line.trim_end_matches('\r'));

        let command = lines.next().filter(|c| !c.is_empty()).ok_or(FrameError::Empty)?;

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::BadHeader(line.to_string()))?;
            headers.push((key.to_string(), value.to_string()));
        }

        Ok(Frame {
            command: command.to_string(),
            headers,
            body,
        })
    }
}

/// Locate the blank line separating headers from body. Returns the offset
/// of the separator and its length in bytes.
fn find_blank_line(raw: &[u8]) -> Option<(usize, usize)> {
    for i in 0..raw.len() {
        if raw[i..].starts_with(b"\n\n") {
            return Some((i, 2));
        }
        if raw[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
    }
    None
}
