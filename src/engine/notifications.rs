use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::status;
use crate::error::AppError;
use crate::models::notification::{Notification, NotificationType};
use crate::models::package::{PackageEvent, PackageStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub recipient: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

pub async fn run_notification_engine(
    state: Arc<AppState>,
    mut event_rx: mpsc::Receiver<PackageEvent>,
) {
    info!("notification engine started");

    while let Some(event) = event_rx.recv().await {
        state.metrics.events_in_queue.dec();
        handle_event(&state, &event);

        // No subscribers is the common case.
        if state.package_events_tx.send(event).is_err() {
            debug!("no websocket subscribers for package event");
        }
    }

    warn!("notification engine stopped: event channel closed");
}

/// Turns a package event into the user-facing notification it implies.
pub fn handle_event(state: &AppState, event: &PackageEvent) -> Notification {
    let draft = match event {
        PackageEvent::Created {
            package_id,
            tracking_number,
            recipient,
            ..
        } => NewNotification {
            recipient: recipient.clone(),
            notification_type: NotificationType::PackageUpdate,
            title: "Package Created".to_string(),
            message: format!(
                "Your package {tracking_number} has been created and is awaiting pickup."
            ),
            data: Some(json!({ "package_id": package_id })),
        },
        PackageEvent::StatusChanged {
            package_id,
            tracking_number,
            status,
            recipient,
            ..
        } => NewNotification {
            recipient: recipient.clone(),
            notification_type: if *status == PackageStatus::Delivered {
                NotificationType::DeliveryCompleted
            } else {
                NotificationType::PackageUpdate
            },
            title: "Package Status Updated".to_string(),
            message: format!(
                "Your package {tracking_number} is now {}.",
                status::label(*status).to_lowercase()
            ),
            data: Some(json!({ "package_id": package_id, "status": status })),
        },
        PackageEvent::Assigned {
            package_id,
            tracking_number,
            driver_id,
            ..
        } => NewNotification {
            recipient: driver_id.to_string(),
            notification_type: NotificationType::DeliveryAssigned,
            title: "New Delivery Assigned".to_string(),
            message: format!("You have been assigned package {tracking_number}."),
            data: Some(json!({ "package_id": package_id })),
        },
    };

    add_notification(state, draft)
}

pub fn add_notification(state: &AppState, draft: NewNotification) -> Notification {
    let notification = Notification {
        id: Uuid::new_v4(),
        recipient: draft.recipient,
        notification_type: draft.notification_type,
        title: draft.title,
        message: draft.message,
        data: draft.data,
        read: false,
        created_at: Utc::now(),
    };

    state
        .notifications
        .insert(notification.id, notification.clone());
    notification
}

/// Notifications addressed to any of `recipients` (a user's email and id), newest first.
pub fn list_for(
    state: &AppState,
    recipients: &[String],
    notification_type: Option<NotificationType>,
) -> Vec<Notification> {
    let mut notifications: Vec<Notification> = state
        .notifications
        .iter()
        .filter(|entry| addressed_to(&entry.recipient, recipients))
        .filter(|entry| notification_type.is_none_or(|t| entry.notification_type == t))
        .map(|entry| entry.value().clone())
        .collect();

    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifications
}

pub fn unread_count(state: &AppState, recipients: &[String]) -> usize {
    state
        .notifications
        .iter()
        .filter(|entry| !entry.read && addressed_to(&entry.recipient, recipients))
        .count()
}

pub fn mark_read(state: &AppState, id: Uuid) -> Result<Notification, AppError> {
    let mut notification = state
        .notifications
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("notification {} not found", id)))?;

    notification.read = true;
    Ok(notification.clone())
}

/// Returns how many notifications flipped to read.
pub fn mark_all_read(state: &AppState, recipients: &[String]) -> usize {
    let mut changed = 0;
    for mut entry in state.notifications.iter_mut() {
        if !entry.read && addressed_to(&entry.recipient, recipients) {
            entry.read = true;
            changed += 1;
        }
    }
    changed
}

pub fn delete(state: &AppState, id: Uuid) -> Result<(), AppError> {
    state
        .notifications
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("notification {} not found", id)))
}

fn addressed_to(recipient: &str, recipients: &[String]) -> bool {
    recipients
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(recipient))
}
