use crate::error::Result;
use crate::handlers::reply::{messages, render_transcript, report_failure};
use crate::handlers::HandlerContext;
use crate::models::telegram::Voice;
use crate::utils::TempFile;

/// Messaggio vocale: scarica l'audio e accoda la trascrizione
pub async fn handle_voice(ctx: &HandlerContext, chat_id: i64, voice: &Voice) -> Result<()> {
    ctx.reply_plain(chat_id, messages::VOICE_ACK).await;

    // Il file appartiene al job: viene rimosso quando il job termina o viene scartato
    let staged = TempFile::create(&ctx.temp_dir, "voice", "ogg").await?;
    if let Err(e) = ctx.api.fetch_media(&voice.file_id, staged.path()).await {
        ctx.report_staging_failure(
            chat_id,
            messages::VOICE_DOWNLOAD_FAILED,
            format!("Ошибка скачивания аудио: {}", e),
        )
        .await;
        return Ok(());
    }

    let api = ctx.api.clone();
    let client = ctx.transcription.clone();
    let submitted = ctx.queue.submit(move || async move {
        let outcome = client.recognize(staged.path()).await;
        drop(staged);

        // Anche una risposta rifiutata dalla Bot API chiude con il messaggio generico
        let replied = match outcome {
            Ok(result) => render_transcript(&result.text).send(&api, chat_id).await,
            Err(e) => Err(e),
        };
        if replied.is_err() {
            report_failure(&api, chat_id, messages::VOICE_FAILED).await;
        }
        replied
    });

    match submitted {
        Ok(job_id) => tracing::info!("Trascrizione accodata: job {} (chat {})", job_id, chat_id),
        Err(_) => ctx.reply_plain(chat_id, messages::QUEUE_FULL).await,
    }

    Ok(())
}
