use tracing::warn;

use crate::error::AppError;
use crate::models::package::PackageEvent;
use crate::state::AppState;

pub async fn enqueue_event(state: &AppState, event: PackageEvent) -> Result<(), AppError> {
    state
        .event_tx
        .send(event)
        .await
        .map_err(|err| AppError::Internal(format!("event queue send failed: {err}")))?;

    state.metrics.events_in_queue.inc();
    Ok(())
}

/// Enqueues an event for a write that is already committed. A closed queue
/// only costs the notification, so it is logged rather than returned.
pub async fn publish_event(state: &AppState, event: PackageEvent) {
    if let Err(err) = enqueue_event(state, event).await {
        warn!(error = %err, "package event dropped");
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{enqueue_event, publish_event};
    use crate::models::package::PackageEvent;
    use crate::state::AppState;

    fn event() -> PackageEvent {
        PackageEvent::Assigned {
            package_id: Uuid::new_v4(),
            tracking_number: "KXTEST".to_string(),
            driver_id: Uuid::new_v4(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn enqueue_tracks_queue_depth() {
        let (state, mut rx) = AppState::offline(16, 16).unwrap();
        enqueue_event(&state, event()).await.unwrap();

        assert_eq!(state.metrics.events_in_queue.get(), 1);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn closed_queue_is_reported_by_enqueue_and_swallowed_by_publish() {
        let (state, rx) = AppState::offline(16, 16).unwrap();
        drop(rx);

        assert!(enqueue_event(&state, event()).await.is_err());
        publish_event(&state, event()).await;
        assert_eq!(state.metrics.events_in_queue.get(), 0);
    }
}
