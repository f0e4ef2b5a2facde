use crate::error::Result;
use crate::models::telegram::ParseMode;
use crate::services::telegram::BotApi;
use crate::utils::{extension_for_lang, timestamped_name};

/// Oltre questa lunghezza (in caratteri) il testo OCR viene inviato come file
pub const MAX_INLINE_CHARS: usize = 4000;

/// Testi mostrati all'utente: volutamente generici, senza dettagli interni
pub mod messages {
    pub const VOICE_ACK: &str = "⏳ Распознаю речь...";
    pub const PHOTO_ACK: &str = "🖼 Распознаю текст на фото...";
    pub const VOICE_FAILED: &str = "Ошибка распознавания.";
    pub const OCR_FAILED: &str = "Ошибка распознавания текста с фото.";
    pub const VOICE_DOWNLOAD_FAILED: &str = "Не удалось скачать аудио.";
    pub const PHOTO_DOWNLOAD_FAILED: &str = "Не удалось скачать фото.";
    pub const QUEUE_FULL: &str = "⏳ Слишком много запросов, попробуйте позже.";
    pub const LONG_TEXT: &str = "📄 Текст слишком длинный — отправляю файл:";
    pub const TRANSCRIPT_HEADER: &str = "Расшифровка:";
    pub const NEXT_VIDEO: &str = "<b>========== СЛЕДУЮЩЕЕ ВИДЕО ==========</b>";
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Html(String),
    Document { filename: String, content: Vec<u8> },
}

impl Reply {
    pub async fn send(self, api: &BotApi, chat_id: i64) -> Result<()> {
        match self {
            Reply::Text(text) => api.send_message(chat_id, &text, None).await,
            Reply::Html(html) => api.send_message(chat_id, &html, Some(ParseMode::Html)).await,
            Reply::Document { filename, content } => {
                api.send_message(chat_id, messages::LONG_TEXT, None).await?;
                api.send_document(chat_id, &filename, content).await
            }
        }
    }
}

/// Messaggio di errore generico a fine job; se fallisce anche questo resta solo il log
pub async fn report_failure(api: &BotApi, chat_id: i64, text: &str) {
    if let Err(e) = api.send_message(chat_id, text, None).await {
        tracing::warn!("Risposta di errore a chat {} non inviata: {}", chat_id, e);
    }
}

pub fn render_transcript(text: &str) -> Reply {
    Reply::Text(format!("{}\n{}", messages::TRANSCRIPT_HEADER, text))
}

/// Testo corto in un blocco `<pre>`, testo lungo come file con estensione
/// dedotta dalla lingua rilevata
pub fn render_ocr(text: &str, lang: Option<&str>) -> Reply {
    if text.chars().count() <= MAX_INLINE_CHARS {
        return Reply::Html(format!("<pre>{}</pre>", escape_html(text)));
    }

    Reply::Document {
        filename: timestamped_name("code", extension_for_lang(lang)),
        content: text.as_bytes().to_vec(),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
