pub mod photo;
pub mod reply;
pub mod text;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::models::telegram::Message;
use crate::services::notifier::Notifier;
use crate::services::queue::TaskQueue;
use crate::services::recognition::RecognitionClient;
use crate::services::telegram::BotApi;

/// Dipendenze condivise dagli handler
#[derive(Clone)]
pub struct HandlerContext {
    pub api: BotApi,
    pub queue: TaskQueue,
    pub transcription: RecognitionClient,
    pub ocr: RecognitionClient,
    pub notifier: Arc<dyn Notifier>,
    pub temp_dir: PathBuf,
}

impl HandlerContext {
    /// Risposta di servizio all'utente; un errore viene solo loggato
    pub async fn reply_plain(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.api.send_message(chat_id, text, None).await {
            tracing::warn!("Risposta a chat {} non inviata: {}", chat_id, e);
        }
    }

    /// Errore nella preparazione del job: l'utente e l'admin vengono avvisati,
    /// la coda non viene toccata
    pub async fn report_staging_failure(&self, chat_id: i64, user_text: &str, admin_text: String) {
        tracing::error!("{}", admin_text);
        let _ = self.notifier.notify(&admin_text).await;
        self.reply_plain(chat_id, user_text).await;
    }
}

/// Smista un messaggio in arrivo verso l'handler corrispondente
pub async fn handle_message(ctx: &HandlerContext, message: Message) -> Result<()> {
    let chat_id = message.chat.id;

    if let Some(voice) = message.voice {
        return voice::handle_voice(ctx, chat_id, &voice).await;
    }

    if let Some(photos) = message.photo {
        return photo::handle_photo(ctx, chat_id, &photos).await;
    }

    if let Some(text) = message.text {
        return text::handle_text(ctx, chat_id, &text).await;
    }

    tracing::debug!("Messaggio {} ignorato", message.message_id);
    Ok(())
}
