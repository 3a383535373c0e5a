//! Terminal rendering of dispatcher effects.

use crate::input::InputMode;
use chatter::dispatcher::{ChatLine, Effect};
use chrono::TimeZone;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Arc;

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BELL: &str = "\x07";

/// Format one chat line as `<time> <author> <text>`; system lines are dimmed and anonymous.
pub fn format_line<Tz>(line: &ChatLine, tz: &Tz, time_format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let time = line.sent_at.with_timezone(tz).format(time_format);
    let body = match &line.author {
        Some(author) => format!("{} {} {}", time, author, line.text),
        None => format!("{} {}", time, line.text),
    };
    if line.muted {
        format!("{}{}{}", DIM, body, RESET)
    } else {
        body
    }
}

pub struct Terminal {
    sound: bool,
    time_format: String,
    /// Switched to messages on the chat view; reopened for a new nickname on a join error.
    input: Arc<InputMode>,
}

impl Terminal {
    pub fn new(sound: bool, time_format: String, input: Arc<InputMode>) -> Self {
        Self {
            sound,
            time_format,
            input,
        }
    }

    /// Render one effect. Returns false once the connection is gone.
    pub fn render(&mut self, effect: Effect) -> bool {
        let mut stdout = io::stdout();
        match effect {
            Effect::ShowChatView => {
                self.input.mark_joined();
                println!("joined the room; type a message and press enter (/quit to leave)");
            }
            Effect::AppendMessage(line) => {
                println!("{}", format_line(&line, &chrono::Local, &self.time_format));
            }
            Effect::PlaySound => {
                if self.sound {
                    print!("{}", BELL);
                }
            }
            Effect::ShowError(detail) => {
                eprintln!("error: {}", detail);
                if !self.input.is_joined() {
                    self.input.join_refused();
                    println!("nickname:");
                }
            }
            Effect::ConnectionLost => {
                eprintln!("connection lost, restart to reconnect");
                return false;
            }
        }
        let _ = stdout.flush();
        true
    }
}
