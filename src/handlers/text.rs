use crate::error::Result;
use crate::handlers::reply::{messages, Reply};
use crate::handlers::HandlerContext;

const NEXT_VIDEO_TRIGGER: &str = "следующий";

fn is_next_video(text: &str) -> bool {
    text.to_lowercase().contains(NEXT_VIDEO_TRIGGER)
}

/// Testo libero: l'unico comando riconosciuto è il separatore "следующий"
pub async fn handle_text(ctx: &HandlerContext, chat_id: i64, text: &str) -> Result<()> {
    if !is_next_video(text) {
        return Ok(());
    }

    Reply::Html(messages::NEXT_VIDEO.to_string())
        .send(&ctx.api, chat_id)
        .await
}
