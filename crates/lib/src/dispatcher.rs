//! Protocol dispatcher: UI intents to commands, inbound events to UI effects.
//!
//! State machine: `LoggedOut` -> (`joinOK`) -> `Joined`; either -> (close) -> `Lost`.
//! Front ends never touch the session directly; they send `Intent`s and render `Effect`s.

use crate::protocol::{Command, Event, SYSTEM_AUTHOR};
use crate::session::Session;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    LoggedOut,
    Joined,
    /// Connection lost; nothing further is accepted.
    Lost,
}

/// A user action. Every input adapter (button, enter key, stdin line) maps to one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Join(String),
    Send(String),
}

/// Something the front end must render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Leave the login view; the message list starts empty.
    ShowChatView,
    AppendMessage(ChatLine),
    /// New-message sound cue.
    PlaySound,
    ShowError(String),
    /// Permanent; the only recovery is restarting the client.
    ConnectionLost,
}

/// A chat message ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// `None` for system messages, whose author is not shown.
    pub author: Option<String>,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    /// Rendered with muted styling.
    pub muted: bool,
}

impl ChatLine {
    /// Build from a `newchatmsg` event; `timestamp` is seconds since the epoch.
    pub fn new(author: &str, text: impl Into<String>, timestamp: i64) -> Self {
        let system = author == SYSTEM_AUTHOR;
        Self {
            author: if system { None } else { Some(author.to_string()) },
            text: text.into(),
            sent_at: DateTime::<Utc>::from_timestamp_millis(timestamp.saturating_mul(1000))
                .unwrap_or_default(),
            muted: system,
        }
    }
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    state: ViewState,
    /// Nickname of the join request awaiting `joinOK`.
    pending_nickname: Option<String>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// Turn a user action into at most one outbound command. Intents produce no effects.
    pub fn handle_intent(&mut self, session: &mut Session, intent: Intent) {
        match intent {
            Intent::Join(nickname) => self.request_join(session, &nickname),
            Intent::Send(text) => self.request_send(session, &text),
        }
    }

    fn request_join(&mut self, session: &mut Session, nickname: &str) {
        if self.state != ViewState::LoggedOut {
            log::debug!("join ignored in state {:?}", self.state);
            return;
        }
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return;
        }
        match session.send(&Command::join(nickname)) {
            Ok(()) => self.pending_nickname = Some(nickname.to_string()),
            Err(e) => log::error!("join not sent: {}", e),
        }
    }

    fn request_send(&mut self, session: &mut Session, text: &str) {
        if self.state != ViewState::Joined {
            log::debug!("send ignored in state {:?}", self.state);
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if let Err(e) = session.send(&Command::message(text)) {
            log::error!("message not sent: {}", e);
        }
    }

    pub fn handle_event(&mut self, session: &mut Session, event: Event) -> Vec<Effect> {
        if self.state == ViewState::Lost {
            log::debug!("{} event after connection loss ignored", event.kind());
            return Vec::new();
        }
        match event {
            Event::Heartbeat => Vec::new(),
            Event::Error { detail } => vec![Effect::ShowError(detail)],
            Event::Joined => {
                if self.state == ViewState::Joined {
                    log::debug!("duplicate joinOK ignored");
                    return Vec::new();
                }
                self.state = ViewState::Joined;
                if let Some(nickname) = self.pending_nickname.take() {
                    log::info!("joined room {} as {}", session.room(), nickname);
                    session.bind_nickname(nickname);
                }
                vec![Effect::ShowChatView]
            }
            Event::ChatMessage {
                author,
                text,
                timestamp,
                ..
            } => {
                if self.state != ViewState::Joined {
                    log::debug!("chat message before join dropped");
                    return Vec::new();
                }
                vec![
                    Effect::AppendMessage(ChatLine::new(&author, text, timestamp)),
                    Effect::PlaySound,
                ]
            }
            Event::Unknown { cmd } => {
                log::warn!("unexpected message from server: cmd {:?}", cmd);
                Vec::new()
            }
        }
    }

    /// The connection closed. Terminal for the whole machine.
    pub fn on_closed(&mut self) -> Vec<Effect> {
        if self.state == ViewState::Lost {
            return Vec::new();
        }
        self.state = ViewState::Lost;
        self.pending_nickname = None;
        vec![Effect::ConnectionLost]
    }
}
