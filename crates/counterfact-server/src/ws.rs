//! `WebSocket` handler for committed-fork notifications.
//!
//! Clients connect to `GET /ws/forks` and receive a JSON-encoded
//! [`ForkBroadcast`](crate::state::ForkBroadcast) each time a fork is
//! committed in any session. Lagged clients skip ahead to the newest
//! notification.

use std::ops::ControlFlow;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, ForkBroadcast};

/// `GET /ws/forks`: upgrade and stream fork notices until the client leaves.
pub async fn ws_forks(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut notices = state.subscribe();
    debug!("fork subscriber connected");

    loop {
        let step = tokio::select! {
            notice = notices.recv() => forward(&mut socket, notice).await,
            incoming = socket.recv() => answer(&mut socket, incoming).await,
        };
        if step.is_break() {
            debug!("fork subscriber gone");
            return;
        }
    }
}

/// Push one broadcast item to the client.
async fn forward(
    socket: &mut WebSocket,
    notice: Result<ForkBroadcast, RecvError>,
) -> ControlFlow<()> {
    match notice {
        Ok(notice) => match serde_json::to_string(&notice) {
            Ok(text) => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    return ControlFlow::Break(());
                }
            }
            Err(e) => warn!(error = %e, branch_id = %notice.branch_id, "fork notice not encodable"),
        },
        Err(RecvError::Lagged(skipped)) => debug!(skipped, "fork subscriber behind, resuming at newest"),
        Err(RecvError::Closed) => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

/// Handle a frame sent by the client. Only pings and closes matter.
async fn answer(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, axum::Error>>,
) -> ControlFlow<()> {
    match incoming {
        Some(Ok(Message::Ping(payload))) => {
            if socket.send(Message::Pong(payload)).await.is_err() {
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        }
        Some(Ok(Message::Close(_)) | Err(_)) | None => ControlFlow::Break(()),
        Some(Ok(_)) => ControlFlow::Continue(()),
    }
}
