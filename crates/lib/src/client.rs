//! Async driver: one task owns the socket, the session and the dispatcher.
//!
//! Socket frames and UI intents are handled one at a time, in arrival order, inside a single
//! `select!` loop. After each reaction the session's outbox is flushed before the next one runs.

use crate::dispatcher::{Dispatcher, Effect, Intent};
use crate::session::{ConnectionState, Inbound, Session, SessionError};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Front-end side of a running client: send intents, receive effects.
pub struct ClientHandle {
    pub intents: mpsc::UnboundedSender<Intent>,
    pub effects: mpsc::UnboundedReceiver<Effect>,
    pub task: JoinHandle<()>,
}

/// Build the session for `origin` and start the client task. Must be called inside a tokio runtime.
///
/// An origin that cannot yield a WebSocket endpoint fails here, before any UI interaction.
pub fn spawn(origin: &str) -> Result<ClientHandle, SessionError> {
    let session = Session::open(origin)?;
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let (effect_tx, effect_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, intent_rx, effect_tx));
    Ok(ClientHandle {
        intents: intent_tx,
        effects: effect_rx,
        task,
    })
}

/// Connect and run until the connection closes or the effect receiver is dropped.
pub async fn run(
    mut session: Session,
    mut intents: mpsc::UnboundedReceiver<Intent>,
    effects: mpsc::UnboundedSender<Effect>,
) {
    let mut dispatcher = Dispatcher::new();
    let emit = |produced: Vec<Effect>| {
        for effect in produced {
            let _ = effects.send(effect);
        }
    };

    let mut ws = match tokio_tungstenite::connect_async(session.url()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            session.on_error(&e.to_string());
            session.on_close();
            emit(dispatcher.on_closed());
            return;
        }
    };
    session.on_open();

    let mut intents_open = true;
    loop {
        let produced = tokio::select! {
            biased;

            frame = ws.next() => match frame {
                Some(Ok(Message::Text(raw))) => match session.on_message(&raw) {
                    Inbound::Event(event) => dispatcher.handle_event(&mut session, event),
                    Inbound::Echoed | Inbound::Dropped => Vec::new(),
                },
                Some(Ok(Message::Close(frame))) => {
                    log::debug!("close frame received: {:?}", frame);
                    session.on_close();
                    dispatcher.on_closed()
                }
                // Pings are answered by tungstenite; binary frames are not part of the protocol.
                Some(Ok(_)) => Vec::new(),
                Some(Err(e)) => {
                    session.on_error(&e.to_string());
                    Vec::new()
                }
                None => {
                    session.on_close();
                    dispatcher.on_closed()
                }
            },
            intent = intents.recv(), if intents_open => match intent {
                Some(intent) => {
                    dispatcher.handle_intent(&mut session, intent);
                    Vec::new()
                }
                None => {
                    log::debug!("intent channel closed; still receiving");
                    intents_open = false;
                    Vec::new()
                }
            },
        };
        emit(produced);

        if session.state() == ConnectionState::Closed {
            // Flush the close reply tungstenite queued for the peer; errors once the stream has ended.
            let _ = ws.close(None).await;
            break;
        }
        if effects.is_closed() {
            log::info!("front end gone, closing connection");
            let _ = ws.close(None).await;
            session.on_close();
            break;
        }
        for frame in session.take_outbound() {
            if let Err(e) = ws.send(Message::Text(frame)).await {
                session.on_error(&e.to_string());
                break;
            }
        }
    }
}
