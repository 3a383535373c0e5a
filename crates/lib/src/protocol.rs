//! Chat wire protocol: outbound commands, inbound events, and the heartbeat token.
//!
//! Every frame except the heartbeat is a JSON object `{ "cmd", "data", ... }`.
//! Outbound `cmd` values are `join` and `newmsg`; inbound are `error`, `joinOK` and `newchatmsg`.

use serde::{Deserialize, Serialize};

/// Keep-alive token exchanged in both directions outside the JSON protocol.
pub const HEARTBEAT: &str = "p";

/// Room joined by every session.
pub const DEFAULT_ROOM: &str = "test";

/// Author used by the server for automated announcements (joins, welcomes).
pub const SYSTEM_AUTHOR: &str = "chatbot";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("encoding {cmd} command: {source}")]
    Encode {
        cmd: &'static str,
        source: serde_json::Error,
    },
}

/// Wire frame sent to the server: `{ "cmd", "data" }`, in that order.
#[derive(Debug, Serialize)]
struct OutboundFrame<'a> {
    cmd: &'a str,
    data: &'a str,
}

/// Payload of `join`, serialized on its own and carried as the `data` string.
#[derive(Debug, Serialize)]
struct JoinData<'a> {
    nic: &'a str,
    room: &'a str,
}

/// Wire frame received from the server. `data` is omitted by the server when empty.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    cmd: String,
    #[serde(default)]
    data: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    user: String,
    #[serde(default)]
    timestamp: i64,
}

/// Client-originated message. Built from a UI intent, encoded and sent at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join { nickname: String, room: String },
    Message { text: String },
}

impl Command {
    pub fn join(nickname: impl Into<String>) -> Self {
        Command::Join {
            nickname: nickname.into(),
            room: DEFAULT_ROOM.to_string(),
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Command::Message { text: text.into() }
    }

    /// Wire `cmd` value for this command.
    pub fn cmd(&self) -> &'static str {
        match self {
            Command::Join { .. } => "join",
            Command::Message { .. } => "newmsg",
        }
    }

    /// Encode as a text frame. The `join` payload is a nested JSON document carried as a string.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let cmd = self.cmd();
        let encode_err = |source| ProtocolError::Encode { cmd, source };
        match self {
            Command::Join { nickname, room } => {
                let data = serde_json::to_string(&JoinData {
                    nic: nickname,
                    room,
                })
                .map_err(encode_err)?;
                serde_json::to_string(&OutboundFrame { cmd, data: &data }).map_err(encode_err)
            }
            Command::Message { text } => {
                serde_json::to_string(&OutboundFrame { cmd, data: text }).map_err(encode_err)
            }
        }
    }
}

/// Server-originated message, decoded from a raw text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Heartbeat,
    Error {
        detail: String,
    },
    Joined,
    ChatMessage {
        /// Server-assigned message id, when the server sends one.
        id: Option<String>,
        author: String,
        text: String,
        /// Seconds since the Unix epoch.
        timestamp: i64,
    },
    /// A well-formed frame whose `cmd` this client does not know.
    Unknown {
        cmd: String,
    },
}

impl Event {
    pub fn decode(raw: &str) -> Result<Event, ProtocolError> {
        if raw == HEARTBEAT {
            return Ok(Event::Heartbeat);
        }
        let frame: InboundFrame = serde_json::from_str(raw)?;
        Ok(match frame.cmd.as_str() {
            "error" => Event::Error { detail: frame.data },
            "joinOK" => Event::Joined,
            "newchatmsg" => Event::ChatMessage {
                id: frame.id,
                author: frame.user,
                text: frame.data,
                timestamp: frame.timestamp,
            },
            _ => Event::Unknown { cmd: frame.cmd },
        })
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Heartbeat => "heartbeat",
            Event::Error { .. } => "error",
            Event::Joined => "joined",
            Event::ChatMessage { .. } => "chatMessage",
            Event::Unknown { .. } => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_nests_payload_as_string() {
        let raw = Command::join("alice").encode().unwrap();
        assert_eq!(
            raw,
            r#"{"cmd":"join","data":"{\"nic\":\"alice\",\"room\":\"test\"}"}"#
        );
        let outer: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            outer["data"].as_str(),
            Some(r#"{"nic":"alice","room":"test"}"#)
        );
    }

    #[test]
    fn join_escapes_nickname() {
        let raw = Command::join(r#"a"b"#).encode().unwrap();
        let outer: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let inner: serde_json::Value =
            serde_json::from_str(outer["data"].as_str().unwrap()).unwrap();
        assert_eq!(inner["nic"], r#"a"b"#);
        assert_eq!(inner["room"], "test");
    }

    #[test]
    fn message_data_is_plain_text() {
        let raw = Command::message("hello there").encode().unwrap();
        assert_eq!(raw, r#"{"cmd":"newmsg","data":"hello there"}"#);
    }

    #[test]
    fn decode_heartbeat() {
        assert_eq!(Event::decode("p").unwrap(), Event::Heartbeat);
    }

    #[test]
    fn decode_maps_cmd_to_kind() {
        assert_eq!(
            Event::decode(r#"{"cmd":"error","data":"test doesn't exists"}"#).unwrap(),
            Event::Error {
                detail: "test doesn't exists".to_string()
            }
        );
        assert_eq!(Event::decode(r#"{"cmd":"joinOK"}"#).unwrap(), Event::Joined);
        assert_eq!(
            Event::decode(r#"{"cmd":"joinOK","data":""}"#).unwrap(),
            Event::Joined
        );
        assert_eq!(
            Event::decode(
                r#"{"cmd":"newchatmsg","data":"hi","id":"42","timestamp":1000,"user":"alice"}"#
            )
            .unwrap(),
            Event::ChatMessage {
                id: Some("42".to_string()),
                author: "alice".to_string(),
                text: "hi".to_string(),
                timestamp: 1000,
            }
        );
    }

    #[test]
    fn decode_unknown_cmd_is_not_an_error() {
        let ev = Event::decode(r#"{"cmd":"typing","data":"bob"}"#).unwrap();
        assert_eq!(
            ev,
            Event::Unknown {
                cmd: "typing".to_string()
            }
        );
        assert_eq!(ev.kind(), "unknown");
    }

    #[test]
    fn decode_rejects_malformed_frames() {
        for raw in ["", "P", "pp", "not json", "[1,2]", r#"{"data":"x"}"#, r#"{"cmd":7}"#] {
            assert!(
                matches!(Event::decode(raw), Err(ProtocolError::Malformed(_))),
                "expected malformed: {raw:?}"
            );
        }
    }
}
