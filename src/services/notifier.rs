//! Notifiche all'amministratore, sempre best-effort

use async_trait::async_trait;

use crate::services::telegram::BotApi;

/// Esito della consegna di una notifica.
///
/// Il chiamante può ignorarlo: una notifica fallita viene solo loggata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Nessun destinatario configurato
    Disabled,
    Failed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Delivery;
}

/// Invia gli avvisi in chat privata all'admin tramite la Bot API
#[derive(Debug, Clone)]
pub struct AdminNotifier {
    api: BotApi,
    admin_chat_id: Option<String>,
}

impl AdminNotifier {
    pub fn new(api: BotApi, admin_chat_id: Option<String>) -> Self {
        if admin_chat_id.is_none() {
            tracing::warn!("ADMIN_ID non configurato: notifiche admin disabilitate");
        }
        Self { api, admin_chat_id }
    }
}

#[async_trait]
impl Notifier for AdminNotifier {
    async fn notify(&self, text: &str) -> Delivery {
        let Some(chat_id) = &self.admin_chat_id else {
            tracing::debug!("Notifica admin saltata: {}", text);
            return Delivery::Disabled;
        };

        let message = format!("⚠️ {}", text);
        let send = self.api.send_message(chat_id, &message, None);
        match tokio::time::timeout(crate::config::timeouts::NOTIFY, send).await {
            Ok(Ok(())) => {
                tracing::debug!("Notifica admin inviata");
                Delivery::Sent
            }
            Ok(Err(e)) => {
                tracing::error!("Errore invio notifica admin: {}", e);
                Delivery::Failed(e.to_string())
            }
            Err(_) => {
                tracing::error!("Timeout invio notifica admin");
                Delivery::Failed("timeout".to_string())
            }
        }
    }
}
