//! Monitoraggio periodico dei servizi a valle

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::services::notifier::{Delivery, Notifier};
use crate::services::recognition::RecognitionClient;
use crate::utils::BackgroundTask;

/// Sonda un singolo servizio; un'istanza per servizio.
///
/// Ogni tick fallito produce un avviso, senza deduplica: un'interruzione
/// prolungata genera un avviso per tick.
#[derive(Clone)]
pub struct HealthMonitor {
    client: RecognitionClient,
    notifier: Arc<dyn Notifier>,
}

impl HealthMonitor {
    pub fn new(client: RecognitionClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    /// Un singolo controllo; restituisce `true` se il servizio risponde
    pub async fn check_once(&self) -> bool {
        match self.client.probe_health().await {
            Ok(()) => {
                tracing::debug!("Servizio {} in salute", self.client.kind());
                true
            }
            Err(e) => {
                tracing::warn!("Health check {} fallito: {}", self.client.kind(), e);
                let delivery = self
                    .notifier
                    .notify(&format!(
                        "Сервис {} недоступен! Сервер не отвечает. ({})",
                        self.client.kind(),
                        e
                    ))
                    .await;
                if let Delivery::Failed(reason) = delivery {
                    tracing::debug!("Avviso health non consegnato: {}", reason);
                }
                false
            }
        }
    }

    pub fn start(self, interval: Duration, shutdown: &CancellationToken) -> BackgroundTask {
        let name = match self.client.kind() {
            crate::models::ServiceKind::Transcription => "health-whisper",
            crate::models::ServiceKind::Ocr => "health-ocr",
        };
        BackgroundTask::spawn_periodic(name, interval, shutdown, move || {
            let monitor = self.clone();
            async move {
                monitor.check_once().await;
            }
        })
    }
}
