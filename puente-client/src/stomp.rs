//! STOMP 1.2 frame codec
//!
//! Frames travel one per WebSocket text message:
//!
//! ```text
//! COMMAND\n
//! header:value\n
//! \n
//! body\0
//! ```
//!
//! A bare EOL is a heart-beat. Header values are escaped (`\\`, `\n`, `\r`,
//! `\c`) in every frame except CONNECT and CONNECTED.

use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Duration;

use crate::error::StompError;

/// Versions offered in CONNECT
pub const ACCEPT_VERSION: &str = "1.2,1.1,1.0";

/// WebSocket sub-protocols, most preferred first
pub const SUB_PROTOCOLS: &str = "v12.stomp, v11.stomp, v10.stomp";

/// Heart-beat payload
pub const HEARTBEAT: &str = "\n";

/// Frame command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // client
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    // server
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl FromStr for Command {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "DISCONNECT" => Command::Disconnect,
            "CONNECTED" => Command::Connected,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => return Err(StompError::UnknownCommand(other.to_string())),
        })
    }
}

/// One STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    /// Headers in wire order; on repeats the first one wins
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// CONNECT with version negotiation and heart-beat offer
    pub fn connect(host: &str, heartbeat_out: Duration, heartbeat_in: Duration) -> Self {
        Frame::new(Command::Connect)
            .header("accept-version", ACCEPT_VERSION)
            .header("host", host)
            .header(
                "heart-beat",
                format!("{},{}", heartbeat_out.as_millis(), heartbeat_in.as_millis()),
            )
    }

    /// SUBSCRIBE with automatic acknowledgement
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    /// SEND with explicit content-length
    pub fn send(destination: &str, body: &str, headers: &[(&str, &str)]) -> Self {
        let mut frame = Frame::new(Command::Send).header("destination", destination);
        for (k, v) in headers {
            frame = frame.header(*k, *v);
        }
        frame
            .header("content-length", body.len().to_string())
            .body(body)
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    /// Serialize including the NUL terminator
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (k, v) in &self.headers {
            if escape {
                let _ = writeln!(out, "{}:{}", escape_header(k), escape_header(v));
            } else {
                let _ = writeln!(out, "{}:{}", k, v);
            }
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode every frame in a text message; heart-beats yield nothing
    pub fn decode_all(text: &str) -> Result<Vec<Frame>, StompError> {
        let mut frames = Vec::new();
        let mut rest = text;
        loop {
            let trimmed = rest.trim_start_matches(['\r', '\n']);
            if trimmed.is_empty() {
                return Ok(frames);
            }
            let (frame, consumed) = Frame::decode_one(trimmed)?;
            frames.push(frame);
            rest = &trimmed[consumed..];
        }
    }

    /// Decode a single frame, returning it with the bytes consumed
    fn decode_one(text: &str) -> Result<(Frame, usize), StompError> {
        let (head, body_start) = split_head(text).ok_or(StompError::Unterminated)?;

        let mut lines = head.split('\n').map(|l| l.trim_end_matches('\r'));
        let command: Command = lines.next().ok_or(StompError::Empty)?.parse()?;
        let unescape = command.escapes_headers();

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (k, v) = line
                .split_once(':')
                .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
            if unescape {
                headers.push((unescape_header(k)?, unescape_header(v)?));
            } else {
                headers.push((k.to_string(), v.to_string()));
            }
        }

        let after = &text[body_start..];
        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok());

        let body_len = match content_length {
            Some(len) if len <= after.len() && after.is_char_boundary(len) => len,
            _ => after.find('\0').ok_or(StompError::Unterminated)?,
        };
        let body = after[..body_len].to_string();

        // Skip the body and its NUL
        let mut consumed = body_start + body_len;
        if text[consumed..].starts_with('\0') {
            consumed += 1;
        } else {
            return Err(StompError::Unterminated);
        }

        Ok((
            Frame {
                command,
                headers,
                body,
            },
            consumed,
        ))
    }
}

/// Split at the first blank line, `\n` or `\r\n` terminated
///
/// Returns the head and the offset of the body.
fn split_head(text: &str) -> Option<(&str, usize)> {
    let mut line_start = 0;
    while let Some(offset) = text[line_start..].find('\n') {
        let line_end = line_start + offset;
        if line_start > 0 && text[line_start..line_end].trim_end_matches('\r').is_empty() {
            return Some((&text[..line_start - 1], line_end + 1));
        }
        line_start = line_end + 1;
    }
    None
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::MalformedHeader(s.to_string())),
        }
    }
    Ok(out)
}

/// Negotiated heart-beat periods of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Heartbeat {
    /// How often we must send something; `None` disables
    pub outgoing: Option<Duration>,
    /// How often the broker promised to send something; `None` disables
    pub incoming: Option<Duration>,
}

impl Heartbeat {
    /// Combine our offer with the broker's `heart-beat` header
    ///
    /// Each direction runs at the larger of the two wishes, and only when
    /// both sides want it.
    pub fn negotiate(client_out: Duration, client_in: Duration, server: Option<&str>) -> Self {
        let (sx, sy) = server.map(parse_heartbeat).unwrap_or((0, 0));
        let cx = client_out.as_millis() as u64;
        let cy = client_in.as_millis() as u64;

        let pick = |ours: u64, theirs: u64| {
            (ours != 0 && theirs != 0).then(|| Duration::from_millis(ours.max(theirs)))
        };

        Self {
            outgoing: pick(cx, sy),
            incoming: pick(cy, sx),
        }
    }
}

fn parse_heartbeat(value: &str) -> (u64, u64) {
    let mut parts = value.split(',').map(|p| p.trim().parse::<u64>().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}
