//! WebSocket endpoint. Each connection is one hub consumer.
//!
//! Client frames carry requests (see [`ClientFrame`]); the server pushes
//! replies and subscribed events back on the same socket. The connection task
//! handles one frame at a time, so requests from a single client are applied
//! in the order they were sent.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::messages::{ClientFrame, ServerMessage};
use crate::api::ApiState;
use crate::hub::Consumer;
use crate::sdk::CommandReply;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/events", get(events_socket))
        .with_state(state)
}

async fn events_socket(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: ApiState) {
    let (consumer, mut events) = Consumer::channel(state.event_buffer);
    let id = consumer.id();
    info!("Client {} connected", id);

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_frame(&state, &consumer, &text).await {
                        if send(&mut socket, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Client {} socket error: {}", id, e);
                    break;
                }
            },
            Some(event) = events.recv() => {
                let message = ServerMessage::Event {
                    channel: event.kind,
                    payload: event.payload,
                };
                if send(&mut socket, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    state.service.hub().disconnect(id);
    info!("Client {} disconnected", id);
}

/// Runs one request frame. Returns the reply to send, if the client asked
/// for one.
async fn handle_frame(state: &ApiState, consumer: &Consumer, text: &str) -> Option<ServerMessage> {
    let raw: Value = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Client {} sent invalid JSON: {}", consumer.id(), e);
            return None;
        }
    };
    let id = raw.get("id").cloned();

    let frame: ClientFrame = match serde_json::from_value(raw) {
        Ok(frame) => frame,
        Err(e) => {
            let reply = CommandReply::invalid(format!("Invalid request: {e}"));
            return respond(consumer, id, "unknown", reply);
        }
    };

    let method = frame.request.method();
    let reply = state.service.execute(consumer, frame.request).await;
    respond(consumer, frame.id, method, reply)
}

fn respond(
    consumer: &Consumer,
    id: Option<Value>,
    method: &str,
    reply: CommandReply,
) -> Option<ServerMessage> {
    match id {
        Some(id) => Some(ServerMessage::reply(id, reply)),
        None => {
            if !reply.success {
                warn!(
                    "{} from client {} failed: {}",
                    method,
                    consumer.id(),
                    reply.message
                );
            }
            None
        }
    }
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode outbound message: {}", e);
            return Ok(());
        }
    };
    socket.send(Message::Text(text)).await
}
