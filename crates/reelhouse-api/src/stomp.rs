//! Minimal STOMP 1.2 frame codec.
//!
//! Frames travel as WebSocket text messages. One message may hold several
//! NUL-terminated frames, and a message consisting only of end-of-line
//! characters is a heart-beat.
//!
//! ```text
//! COMMAND\n
//! header:value\n
//! \n
//! body^@
//! ```

use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Duration;

use strum::{AsRefStr, Display, EnumString};

use crate::error::Error;

pub const STOMP_VERSION: &str = "1.2";

/// End-of-line heart-beat payload.
pub const HEARTBEAT: &str = "\n";

const NUL: char = '\0';

// ── Command ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    // client frames
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    // server frames
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    /// `CONNECT`/`CONNECTED` headers are sent verbatim; every other frame
    /// escapes `\r`, `\n`, `:` and `\`.
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

// ── Frame ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// One unit decoded from a WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Heartbeat,
    Frame(Frame),
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

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for `name`. Repeated headers: the first one wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    // ── Well-known client frames ─────────────────────────────────────

    pub fn connect(host: &str, heartbeat: Duration, authorization: Option<&str>) -> Self {
        let ms = duration_ms(heartbeat);
        let mut frame = Self::new(Command::Connect)
            .header("accept-version", STOMP_VERSION)
            .header("host", host)
            .header("heart-beat", format!("{ms},{ms}"));
        if let Some(auth) = authorization {
            frame = frame.header("Authorization", auth);
        }
        frame
    }

    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .with_body(body)
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).header("id", id)
    }

    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    // ── Encoding ─────────────────────────────────────────────────────

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_ref());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape {
                let _ = writeln!(out, "{}:{}", escape_header(name), escape_header(value));
            } else {
                let _ = writeln!(out, "{name}:{value}");
            }
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            let _ = writeln!(out, "content-length:{}", self.body.len());
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }

    // ── Decoding ─────────────────────────────────────────────────────

    /// Decode every frame (and heart-beat) in one WebSocket text message.
    pub fn decode_all(text: &str) -> Result<Vec<Inbound>, Error> {
        let mut out = Vec::new();
        let mut rest = text;

        loop {
            let trimmed = rest.trim_start_matches(['\r', '\n']);
            if trimmed.len() != rest.len() && trimmed.is_empty() {
                out.push(Inbound::Heartbeat);
            }
            if trimmed.is_empty() {
                break;
            }
            let (frame, remainder) = Self::decode_one(trimmed)?;
            out.push(Inbound::Frame(frame));
            rest = remainder;
        }

        Ok(out)
    }

    fn decode_one(text: &str) -> Result<(Self, &str), Error> {
        let head_end = text
            .find("\n\n")
            .map(|i| (i, i + 2))
            .or_else(|| text.find("\r\n\r\n").map(|i| (i, i + 4)))
            .ok_or_else(|| Error::Stomp("frame has no header terminator".into()))?;

        let head = &text[..head_end.0];
        let after_head = &text[head_end.1..];

        let mut lines = head.lines();
        let command_line = lines.next().unwrap_or_default().trim_end_matches('\r');
        let command = Command::from_str(command_line)
            .map_err(|_| Error::Stomp(format!("unknown command {command_line:?}")))?;

        let unescape = command.escapes_headers();
        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::Stomp(format!("malformed header {line:?}")))?;
            if unescape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_owned(), value.to_owned()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| v.parse::<usize>())
            .transpose()
            .map_err(|e| Error::Stomp(format!("bad content-length: {e}")))?;

        let (body, remainder) = match content_length {
            Some(len) => {
                let body = after_head
                    .get(..len)
                    .ok_or_else(|| Error::Stomp("truncated frame body".into()))?;
                let tail = &after_head[len..];
                let tail = tail
                    .strip_prefix(NUL)
                    .ok_or_else(|| Error::Stomp("frame body not NUL-terminated".into()))?;
                (body, tail)
            }
            None => {
                let end = after_head
                    .find(NUL)
                    .ok_or_else(|| Error::Stomp("frame body not NUL-terminated".into()))?;
                (&after_head[..end], &after_head[end + 1..])
            }
        };

        Ok((
            Self {
                command,
                headers,
                body: body.to_owned(),
            },
            remainder,
        ))
    }
}

// ── Heart-beat negotiation ───────────────────────────────────────────

/// Negotiated `(outgoing, incoming)` heart-beat intervals. `None` means
/// that direction is disabled.
///
/// `client` is what we offered (`cx,cy`), `server_header` the broker's
/// `heart-beat` header (`sx,sy`). We send every `max(cx, sy)` and expect
/// something every `max(cy, sx)`.
pub fn negotiate_heartbeat(
    client: Duration,
    server_header: Option<&str>,
) -> (Option<Duration>, Option<Duration>) {
    let (sx, sy) = server_header
        .and_then(|h| h.split_once(','))
        .and_then(|(a, b)| Some((a.trim().parse::<u64>().ok()?, b.trim().parse::<u64>().ok()?)))
        .unwrap_or((0, 0));

    let cx = duration_ms(client);
    let cy = cx;

    let outgoing = (cx != 0 && sy != 0).then(|| Duration::from_millis(cx.max(sy)));
    let incoming = (cy != 0 && sx != 0).then(|| Duration::from_millis(cy.max(sx)));
    (outgoing, incoming)
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Header escaping ──────────────────────────────────────────────────

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
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
            other => {
                return Err(Error::Stomp(format!("invalid header escape \\{other:?}")));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_connect_keeps_headers_verbatim() {
        let frame = Frame::connect("stream.example.com", Duration::from_secs(10), Some("Bearer abc123"));
        assert_eq!(
            frame.encode(),
            "CONNECT\naccept-version:1.2\nhost:stream.example.com\nheart-beat:10000,10000\nAuthorization:Bearer abc123\n\n\0"
        );
    }

    #[test]
    fn encode_send_adds_content_length() {
        let frame = Frame::send("/app/chat", r#"{"text":"hi"}"#);
        assert_eq!(
            frame.encode(),
            "SEND\ndestination:/app/chat\ncontent-type:application/json\ncontent-length:13\n\n{\"text\":\"hi\"}\0"
        );
    }

    #[test]
    fn escapes_colons_in_subscribe_headers() {
        let frame = Frame::subscribe("sub-0", "/topic/a:b");
        assert!(frame.encode().contains("destination:/topic/a\\cb\n"));
    }

    #[test]
    fn decode_message_frame() {
        let raw = "MESSAGE\ndestination:/user/queue/notifications\nsubscription:sub-0\nmessage-id:7\n\n{\"notificationId\":1}\0";
        let frames = Frame::decode_all(raw).unwrap();
        assert_eq!(frames.len(), 1);
        let Inbound::Frame(frame) = &frames[0] else {
            panic!("expected a frame, got {frames:?}");
        };
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.get("destination"), Some("/user/queue/notifications"));
        assert_eq!(frame.get("subscription"), Some("sub-0"));
        assert_eq!(frame.body, "{\"notificationId\":1}");
    }

    #[test]
    fn decode_heartbeat_only_message() {
        assert_eq!(Frame::decode_all("\n").unwrap(), vec![Inbound::Heartbeat]);
        assert_eq!(Frame::decode_all("\r\n").unwrap(), vec![Inbound::Heartbeat]);
    }

    #[test]
    fn decode_multiple_frames_in_one_message() {
        let raw = "RECEIPT\nreceipt-id:1\n\n\0\nMESSAGE\ndestination:/topic/x\ncontent-length:3\n\na\0b\0";
        let frames = Frame::decode_all(raw).unwrap();
        assert_eq!(frames.len(), 2);
        let Inbound::Frame(second) = &frames[1] else {
            panic!("expected a frame");
        };
        // content-length allows NUL inside the body
        assert_eq!(second.body, "a\0b");
    }

    #[test]
    fn decode_unescapes_headers_and_keeps_first_duplicate() {
        let raw = "MESSAGE\ndestination:/topic/a\\cb\nfoo:first\nfoo:second\n\n\0";
        let frames = Frame::decode_all(raw).unwrap();
        let Inbound::Frame(frame) = &frames[0] else {
            panic!("expected a frame");
        };
        assert_eq!(frame.get("destination"), Some("/topic/a:b"));
        assert_eq!(frame.get("foo"), Some("first"));
    }

    #[test]
    fn decode_connected_with_crlf() {
        let raw = "CONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0";
        let frames = Frame::decode_all(raw).unwrap();
        let Inbound::Frame(frame) = &frames[0] else {
            panic!("expected a frame");
        };
        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.get("version"), Some("1.2"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Frame::decode_all("HELLO\n\n\0").is_err());
        assert!(Frame::decode_all("MESSAGE\ndestination:/x\n\nno terminator").is_err());
        assert!(Frame::decode_all("MESSAGE\nbroken-header\n\n\0").is_err());
    }

    #[test]
    fn heartbeat_negotiation() {
        let ten = Duration::from_secs(10);

        let (out, inc) = negotiate_heartbeat(ten, Some("0,0"));
        assert_eq!((out, inc), (None, None));

        let (out, inc) = negotiate_heartbeat(ten, Some("20000,5000"));
        assert_eq!(out, Some(Duration::from_millis(10_000)));
        assert_eq!(inc, Some(Duration::from_millis(20_000)));

        let (out, inc) = negotiate_heartbeat(Duration::ZERO, Some("4000,4000"));
        assert_eq!((out, inc), (None, None));

        assert_eq!(negotiate_heartbeat(ten, None), (None, None));
    }
}
