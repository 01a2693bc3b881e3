use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::ai::AiClient;
use crate::config::AiConfig;
use crate::error::AppError;
use crate::models::driver::Driver;
use crate::models::notification::Notification;
use crate::models::package::{Package, PackageEvent};
use crate::models::route::Route;
use crate::models::user::Account;
use crate::observability::metrics::Metrics;

pub struct AppState {
    /// Keyed by lower-cased email.
    pub accounts: DashMap<String, Account>,
    pub sessions: DashMap<Uuid, String>,
    pub packages: DashMap<Uuid, Package>,
    pub tracking_index: DashMap<String, Uuid>,
    pub drivers: DashMap<Uuid, Driver>,
    pub routes: DashMap<Uuid, Route>,
    pub notifications: DashMap<Uuid, Notification>,
    pub event_tx: mpsc::Sender<PackageEvent>,
    pub package_events_tx: broadcast::Sender<PackageEvent>,
    pub ai: AiClient,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        event_queue_size: usize,
        event_buffer_size: usize,
        ai_config: &AiConfig,
    ) -> Result<(Self, mpsc::Receiver<PackageEvent>), AppError> {
        let (event_tx, event_rx) = mpsc::channel(event_queue_size);
        let (package_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let ai = AiClient::new(ai_config)
            .map_err(|err| AppError::Internal(format!("failed to build ai client: {err}")))?;

        Ok((
            Self {
                accounts: DashMap::new(),
                sessions: DashMap::new(),
                packages: DashMap::new(),
                tracking_index: DashMap::new(),
                drivers: DashMap::new(),
                routes: DashMap::new(),
                notifications: DashMap::new(),
                event_tx,
                package_events_tx,
                ai,
                metrics: Metrics::new(),
            },
            event_rx,
        ))
    }

    /// State with the upstream AI disabled, as used by tests and local runs without a key.
    pub fn offline(
        event_queue_size: usize,
        event_buffer_size: usize,
    ) -> Result<(Self, mpsc::Receiver<PackageEvent>), AppError> {
        Self::new(event_queue_size, event_buffer_size, &AiConfig::default())
    }
}
