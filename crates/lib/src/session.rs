//! Transport session: the single connection's lifecycle and the heartbeat reflex.
//!
//! The session performs no I/O. The client driver feeds it transport callbacks
//! (`on_open`, `on_message`, `on_error`, `on_close`) and writes whatever it queued
//! in the outbox back to the socket, in order, after every reaction.

use crate::protocol::{Command, Event, ProtocolError, DEFAULT_ROOM, HEARTBEAT};
use std::collections::VecDeque;
use std::fmt;

/// Path of the chat endpoint on the page's host.
pub const WS_PATH: &str = "/ws";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The endpoint cannot be built from the origin; nothing can proceed.
    #[error("websocket transport unsupported for origin {origin}: {reason}")]
    Unsupported { origin: String, reason: String },
    #[error("cannot send while connection is {0}")]
    NotOpen(ConnectionState),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// What `on_message` did with a raw frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Heartbeat answered; nothing for the dispatcher.
    Echoed,
    Event(Event),
    /// Malformed, or received after close; already logged.
    Dropped,
}

/// Derive the WebSocket endpoint from the page origin: `https` -> `wss`, `http` -> `ws`.
pub fn endpoint_url(origin: &str) -> Result<String, SessionError> {
    let unsupported = |reason: String| SessionError::Unsupported {
        origin: origin.to_string(),
        reason,
    };
    let parsed = url::Url::parse(origin.trim()).map_err(|e| unsupported(e.to_string()))?;
    let scheme = match parsed.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(unsupported(format!("unsupported scheme \"{}\"", other))),
    };
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| unsupported("origin has no host".to_string()))?;
    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}{}", scheme, host, port, WS_PATH),
        None => format!("{}://{}{}", scheme, host, WS_PATH),
    })
}

/// One connection per page load: endpoint, lifecycle state, room, and nickname once joined.
#[derive(Debug)]
pub struct Session {
    url: String,
    state: ConnectionState,
    room: String,
    nickname: Option<String>,
    outbox: VecDeque<String>,
}

impl Session {
    /// Build a session for the given page origin. The session starts in `Connecting`.
    pub fn open(origin: &str) -> Result<Self, SessionError> {
        let url = endpoint_url(origin)?;
        log::debug!("session opening {}", url);
        Ok(Self {
            url,
            state: ConnectionState::Connecting,
            room: DEFAULT_ROOM.to_string(),
            nickname: None,
            outbox: VecDeque::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Record the nickname the server accepted. The first binding is kept for the session's lifetime.
    pub fn bind_nickname(&mut self, nickname: impl Into<String>) {
        if self.nickname.is_none() {
            self.nickname = Some(nickname.into());
        }
    }

    pub fn on_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
            log::info!("websocket opened: {}", self.url);
        }
    }

    /// The single protocol entry point for raw text frames.
    pub fn on_message(&mut self, raw: &str) -> Inbound {
        if self.state == ConnectionState::Closed {
            log::debug!("frame after close dropped");
            return Inbound::Dropped;
        }
        if raw == HEARTBEAT {
            self.outbox.push_back(HEARTBEAT.to_string());
            return Inbound::Echoed;
        }
        log::trace!("-> {}", raw);
        match Event::decode(raw) {
            Ok(event) => Inbound::Event(event),
            Err(e) => {
                log::warn!("dropping inbound frame: {}", e);
                Inbound::Dropped
            }
        }
    }

    /// Transport error. Logged only; the transport reports closure separately.
    pub fn on_error(&mut self, detail: &str) {
        log::warn!("websocket error ({}): {}", self.state, detail);
    }

    /// Terminal. Any frames still queued are discarded.
    pub fn on_close(&mut self) {
        if self.state != ConnectionState::Closed {
            log::info!("websocket closed: {}", self.url);
        }
        self.state = ConnectionState::Closed;
        self.outbox.clear();
    }

    /// Encode `command` and queue it for transmission. Only valid while `Open`.
    pub fn send(&mut self, command: &Command) -> Result<(), SessionError> {
        if self.state != ConnectionState::Open {
            return Err(SessionError::NotOpen(self.state));
        }
        let frame = command.encode()?;
        log::trace!("<- {}", frame);
        self.outbox.push_back(frame);
        Ok(())
    }

    /// Drain queued frames in the order they were queued.
    pub fn take_outbound(&mut self) -> Vec<String> {
        self.outbox.drain(..).collect()
    }
}
