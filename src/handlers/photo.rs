use crate::error::Result;
use crate::handlers::reply::{messages, render_ocr, report_failure};
use crate::handlers::HandlerContext;
use crate::models::telegram::PhotoSize;
use crate::utils::TempFile;

/// Variante con la risoluzione più alta
fn largest(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos
        .iter()
        .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
}

/// Foto: scarica l'immagine e accoda l'OCR
pub async fn handle_photo(ctx: &HandlerContext, chat_id: i64, photos: &[PhotoSize]) -> Result<()> {
    let Some(photo) = largest(photos) else {
        tracing::debug!("Foto senza varianti dalla chat {}", chat_id);
        return Ok(());
    };

    ctx.reply_plain(chat_id, messages::PHOTO_ACK).await;

    let staged = TempFile::create(&ctx.temp_dir, "img", "jpg").await?;
    if let Err(e) = ctx.api.fetch_media(&photo.file_id, staged.path()).await {
        ctx.report_staging_failure(
            chat_id,
            messages::PHOTO_DOWNLOAD_FAILED,
            format!("OCR bot error: {}", e),
        )
        .await;
        return Ok(());
    }

    let api = ctx.api.clone();
    let client = ctx.ocr.clone();
    let submitted = ctx.queue.submit(move || async move {
        let outcome = client.recognize(staged.path()).await;
        drop(staged);

        let replied = match outcome {
            Ok(result) => {
                render_ocr(&result.text, result.lang.as_deref())
                    .send(&api, chat_id)
                    .await
            }
            Err(e) => Err(e),
        };
        if replied.is_err() {
            report_failure(&api, chat_id, messages::OCR_FAILED).await;
        }
        replied
    });

    match submitted {
        Ok(job_id) => tracing::info!("OCR accodato: job {} (chat {})", job_id, chat_id),
        Err(_) => ctx.reply_plain(chat_id, messages::QUEUE_FULL).await,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::reply::MAX_INLINE_CHARS;
    use crate::handlers::testing::harness;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn sizes() -> Vec<PhotoSize> {
        vec![
            PhotoSize {
                file_id: "small".to_string(),
                width: 90,
                height: 60,
            },
            PhotoSize {
                file_id: "F".to_string(),
                width: 1280,
                height: 853,
            },
        ]
    }

    async fn mount_ocr(h: &crate::handlers::testing::Harness, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/ocr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&h.services)
            .await;
    }

    #[test]
    fn test_largest_variant_chosen() {
        assert_eq!(largest(&sizes()).unwrap().file_id, "F");
        assert!(largest(&[]).is_none());
    }

    #[tokio::test]
    async fn test_short_text_sent_as_pre_block() {
        let h = harness(5).await;
        mount_ocr(&h, json!({ "text": "a < b", "lang": "py" })).await;

        handle_photo(&h.ctx, 5, &sizes()).await.unwrap();
        h.wait_idle().await;

        assert_eq!(
            h.sent_texts().await,
            vec![messages::PHOTO_ACK, "<pre>a &lt; b</pre>"]
        );
        assert_eq!(h.documents_sent().await, 0);
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_long_text_sent_as_document() {
        let h = harness(5).await;
        let long = "x".repeat(MAX_INLINE_CHARS + 10);
        mount_ocr(&h, json!({ "text": long, "lang": "py" })).await;

        handle_photo(&h.ctx, 5, &sizes()).await.unwrap();
        h.wait_idle().await;

        assert_eq!(h.documents_sent().await, 1);
        assert!(h.sent_texts().await.contains(&messages::LONG_TEXT.to_string()));
    }

    #[tokio::test]
    async fn test_failed_document_upload_ends_with_generic_message() {
        let h = harness(5).await;
        let long = "x".repeat(MAX_INLINE_CHARS + 10);
        mount_ocr(&h, json!({ "text": long, "lang": "py" })).await;
        Mock::given(method("POST"))
            .and(path("/botT/sendDocument"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: file is too big",
            })))
            .with_priority(1)
            .mount(&h.telegram)
            .await;

        handle_photo(&h.ctx, 5, &sizes()).await.unwrap();
        h.wait_idle().await;

        assert_eq!(
            h.sent_texts().await,
            vec![messages::PHOTO_ACK, messages::LONG_TEXT, messages::OCR_FAILED]
        );
        let alerts = h.notifier.messages();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("file is too big"));
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_reported_error_generic_reply_no_document() {
        let h = harness(5).await;
        mount_ocr(&h, json!({ "text": "", "error": "no text found" })).await;

        handle_photo(&h.ctx, 5, &sizes()).await.unwrap();
        h.wait_idle().await;

        assert_eq!(
            h.sent_texts().await.last().map(String::as_str),
            Some(messages::OCR_FAILED)
        );
        assert_eq!(h.documents_sent().await, 0);

        let alerts = h.notifier.messages();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("no text found"));
    }

    #[tokio::test]
    async fn test_download_failure_skips_queue() {
        let h = harness(5).await;
        // Solo sendMessage resta montato: getFile fallisce
        let photos = vec![PhotoSize {
            file_id: "F".to_string(),
            width: 1,
            height: 1,
        }];
        h.telegram.reset().await;
        Mock::given(method("POST"))
            .and(path("/botT/sendMessage"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })),
            )
            .mount(&h.telegram)
            .await;

        handle_photo(&h.ctx, 5, &photos).await.unwrap();

        assert!(!h.ctx.queue.is_processing());
        assert_eq!(
            h.sent_texts().await,
            vec![messages::PHOTO_ACK, messages::PHOTO_DOWNLOAD_FAILED]
        );
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.staged_files(), 0);
    }
}
