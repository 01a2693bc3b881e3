use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::engine::tracking::normalize;
use crate::models::package::PackageEvent;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Only forward events for this package.
    pub tracking_number: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let filter = query.tracking_number.as_deref().map(normalize);
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, filter: Option<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.package_events_tx.subscribe();

    info!(tracking_number = ?filter, "websocket client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if !matches_filter(&event, filter.as_deref()) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize package event for ws");
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

    info!("websocket client disconnected");
}

fn matches_filter(event: &PackageEvent, filter: Option<&str>) -> bool {
    let Some(wanted) = filter else {
        return true;
    };
    let tracking_number = match event {
        PackageEvent::Created { tracking_number, .. }
        | PackageEvent::StatusChanged { tracking_number, .. }
        | PackageEvent::Assigned { tracking_number, .. } => tracking_number,
    };
    tracking_number == wanted
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::matches_filter;
    use crate::models::package::PackageEvent;

    #[test]
    fn filters_by_tracking_number() {
        let event = PackageEvent::Assigned {
            package_id: Uuid::new_v4(),
            tracking_number: "KXABC123".to_string(),
            driver_id: Uuid::new_v4(),
            at: Utc::now(),
        };

        assert!(matches_filter(&event, None));
        assert!(matches_filter(&event, Some("KXABC123")));
        assert!(!matches_filter(&event, Some("KXOTHER")));
    }
}
