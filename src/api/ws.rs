//! WebSocket live-update channel
//!
//! One socket per tenant subscription. Outbound traffic is whatever the
//! BroadcastHub fans out for the connection's tenant, serialized as JSON
//! text frames. Inbound traffic is ignored except for the literal text
//! `ping`, which gets an immediate `pong` reply independent of broadcast
//! traffic.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tracing::debug;

use crate::broadcast::BroadcastHub;
use crate::AppState;

pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws/:tenant_id", get(ws_upgrade))
}

/// GET /ws/:tenant_id
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub.clone(), tenant_id))
}

async fn handle_socket(socket: WebSocket, hub: BroadcastHub, tenant_id: String) {
    let (connection_id, mut events) = hub.connect(&tenant_id).await;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let frame = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        debug!(error = %e, "Failed to serialize live event");
                        continue;
                    }
                };
                if sink.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }

            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if text == "ping" && sink.send(Message::Text("pong".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.disconnect(connection_id).await;
}
