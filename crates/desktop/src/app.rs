//! Chatter Desktop app state and UI: a login view and a chat view.

use anyhow::Context;
use chatter::client::ClientHandle;
use chatter::config::UiConfig;
use chatter::dispatcher::{ChatLine, Effect, Intent};
use eframe::egui;
use std::time::Duration;
use tokio::sync::mpsc;

/// How often to check for effects while nothing else triggers a repaint.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SEND_BUTTON_WIDTH: f32 = 80.0;
const MESSAGES_MIN_HEIGHT: f32 = 80.0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum View {
    #[default]
    Login,
    Chat,
    /// Connection lost; only a restart recovers.
    Lost,
    /// The client could not be started; nothing else is offered.
    Failed(String),
}

/// State driven by effects, kept apart from the window and the runtime.
#[derive(Debug, Default)]
struct ChatView {
    view: View,
    messages: Vec<ChatLine>,
    error: Option<String>,
}

impl ChatView {
    fn failed(detail: String) -> Self {
        Self {
            view: View::Failed(detail),
            ..Self::default()
        }
    }

    /// Apply one effect. Returns true when the window should request the user's attention.
    fn apply(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::ShowChatView => {
                self.view = View::Chat;
                self.messages.clear();
                self.error = None;
            }
            Effect::AppendMessage(line) => self.messages.push(line),
            Effect::PlaySound => return true,
            Effect::ShowError(detail) => self.error = Some(detail),
            Effect::ConnectionLost => {
                if !matches!(self.view, View::Failed(_)) {
                    self.view = View::Lost;
                }
            }
        }
        false
    }
}

/// The running client: the runtime it lives on and its channels.
struct Connection {
    _runtime: tokio::runtime::Runtime,
    intents: mpsc::UnboundedSender<Intent>,
    effects: mpsc::UnboundedReceiver<Effect>,
}

fn connect() -> anyhow::Result<(Connection, UiConfig)> {
    let (config, _) = chatter::config::load_config(None)?;
    let origin = chatter::config::resolve_origin(&config);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;
    let ClientHandle {
        intents, effects, ..
    } = {
        let _guard = runtime.enter();
        chatter::client::spawn(&origin)?
    };
    log::info!("connecting to {}", origin);
    Ok((
        Connection {
            _runtime: runtime,
            intents,
            effects,
        },
        config.ui,
    ))
}

fn render_line(ui: &mut egui::Ui, line: &ChatLine, time_format: &str) {
    let time = line
        .sent_at
        .with_timezone(&chrono::Local)
        .format(time_format)
        .to_string();
    ui.horizontal_wrapped(|ui| {
        let time = egui::RichText::new(time).small();
        let text = egui::RichText::new(&line.text);
        ui.label(if line.muted { time.weak() } else { time });
        if let Some(author) = &line.author {
            ui.label(egui::RichText::new(author).strong());
        }
        ui.label(if line.muted { text.weak() } else { text });
    });
}

pub struct ChatterApp {
    state: ChatView,
    connection: Option<Connection>,
    nickname_input: String,
    message_input: String,
    sound: bool,
    time_format: String,
}

impl ChatterApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        log::info!("desktop started");
        let (state, connection, ui) = match connect() {
            Ok((connection, ui)) => (ChatView::default(), Some(connection), ui),
            Err(e) => {
                log::error!("client failed to start: {:#}", e);
                (ChatView::failed(format!("{:#}", e)), None, UiConfig::default())
            }
        };
        Self {
            state,
            connection,
            nickname_input: String::new(),
            message_input: String::new(),
            sound: ui.sound,
            time_format: ui.time_format,
        }
    }

    /// Drain pending effects. Call each frame.
    fn poll_effects(&mut self, ctx: &egui::Context) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        let mut attention = false;
        loop {
            match connection.effects.try_recv() {
                Ok(effect) => attention |= self.state.apply(effect),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.state.apply(Effect::ConnectionLost);
                    break;
                }
            }
        }
        if attention && self.sound {
            ctx.send_viewport_cmd(egui::ViewportCommand::RequestUserAttention(
                egui::UserAttentionType::Informational,
            ));
        }
    }

    fn send_intent(&self, intent: Intent) {
        if let Some(connection) = &self.connection {
            if connection.intents.send(intent).is_err() {
                log::debug!("client stopped, intent dropped");
            }
        }
    }

    /// Join intent for both the button and the Enter key.
    fn request_join(&mut self) {
        self.send_intent(Intent::Join(self.nickname_input.clone()));
    }

    /// Send intent for both the button and the Enter key. The compose field is always cleared.
    fn request_send(&mut self) {
        let text = std::mem::take(&mut self.message_input);
        self.send_intent(Intent::Send(text));
    }

    fn ui_error(&self, ui: &mut egui::Ui) {
        if let Some(ref err) = self.state.error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::RED, err);
        }
    }

    fn ui_login(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Join the chat");
        ui.add_space(12.0);
        let mut submit = false;
        ui.horizontal(|ui| {
            ui.label("Nickname");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.nickname_input).hint_text("your nickname"),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
            if ui.button("Enter chatroom").clicked() {
                submit = true;
            }
        });
        if submit {
            self.request_join();
        }
        self.ui_error(ui);
    }

    /// Message list stuck to the bottom, compose row below it.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        let row_height = ui.spacing().interact_size.y + 16.0;
        let error_height = if self.state.error.is_some() { 32.0 } else { 0.0 };
        let messages_height =
            (ui.available_height() - row_height - error_height).max(MESSAGES_MIN_HEIGHT);

        ui.add_space(12.0);
        egui::ScrollArea::vertical()
            .max_height(messages_height)
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.state.messages {
                    render_line(ui, line, &self.time_format);
                }
            });
        ui.separator();

        let mut submit = false;
        ui.horizontal(|ui| {
            let width = (ui.available_width() - SEND_BUTTON_WIDTH).max(100.0);
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.message_input)
                    .hint_text("Message")
                    .desired_width(width),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
                response.request_focus();
            }
            if ui.button("Send").clicked() {
                submit = true;
            }
        });
        if submit {
            self.request_send();
        }
        self.ui_error(ui);
    }
}

impl eframe::App for ChatterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_effects(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.state.view.clone() {
                    View::Login => self.ui_login(ui),
                    View::Chat => self.ui_chat(ui),
                    View::Lost => {
                        ui.add_space(24.0);
                        ui.heading("Connection lost");
                        ui.add_space(8.0);
                        ui.label("Restart Chatter to reconnect.");
                    }
                    View::Failed(detail) => {
                        ui.add_space(24.0);
                        ui.heading("Chatter cannot start");
                        ui.add_space(8.0);
                        ui.label(detail);
                    }
                });
        });

        if self.connection.is_some() && self.state.view != View::Lost {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_view_clears_list_and_error() {
        let mut state = ChatView::default();
        state.apply(Effect::ShowError("nic taken".to_string()));
        assert_eq!(state.view, View::Login);
        assert_eq!(state.error.as_deref(), Some("nic taken"));
        state.apply(Effect::ShowChatView);
        assert_eq!(state.view, View::Chat);
        assert!(state.error.is_none());
        assert!(state.messages.is_empty());
    }

    #[test]
    fn lines_append_in_order_and_sound_asks_attention() {
        let mut state = ChatView::default();
        state.apply(Effect::ShowChatView);
        assert!(!state.apply(Effect::AppendMessage(ChatLine::new("alice", "hi", 1000))));
        assert!(state.apply(Effect::PlaySound));
        state.apply(Effect::AppendMessage(ChatLine::new("bob", "yo", 1001)));
        let texts: Vec<&str> = state.messages.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "yo"]);
    }

    #[test]
    fn connection_loss_is_final_but_keeps_startup_failure() {
        let mut state = ChatView::default();
        state.apply(Effect::ConnectionLost);
        assert_eq!(state.view, View::Lost);

        let mut failed = ChatView::failed("no origin".to_string());
        failed.apply(Effect::ConnectionLost);
        assert_eq!(failed.view, View::Failed("no origin".to_string()));
    }
}
