use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tracing::{info, warn};

use crate::state::AppState;

/// Streams every lifecycle transition to the client as a JSON pickup
/// record, after an initial snapshot of the whole store so the client can
/// render without a separate fetch.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.pickup_events_tx.subscribe();

    info!("pickup event stream connected");

    let snapshot = state.store.list_all();
    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
        Err(err) => warn!(error = %err, "failed to serialize store snapshot"),
    }

    let send_task = tokio::spawn(async move {
        while let Ok(pickup) = rx.recv().await {
            let json = match serde_json::to_string(&pickup) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize pickup event");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("pickup event stream disconnected");
}
