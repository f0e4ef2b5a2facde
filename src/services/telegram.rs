//! Telegram Bot API client.
//!
//! Only the calls the bot needs: long polling, text and document replies,
//! and media download. Errors never include the request URL, since it
//! carries the bot token.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::timeouts;
use crate::error::{AppError, Result};
use crate::models::telegram::{ApiResponse, File, ParseMode, Update};

#[derive(Clone)]
pub struct BotApi {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for BotApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BotApi {
    pub fn new(base_url: &Url, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BotApi(format!("Errore client HTTP: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::BotApi(format!("{} fallita: {}", method, e.without_url())))?;

        let status = response.status();
        let body: ApiResponse<T> = response.json().await.map_err(|e| {
            AppError::BotApi(format!(
                "{}: risposta non valida (HTTP {}): {}",
                method,
                status,
                e.without_url()
            ))
        })?;

        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(AppError::BotApi(format!(
                "{} rifiutata (HTTP {}): {}",
                method,
                status,
                description.unwrap_or_else(|| "nessuna descrizione".to_string())
            ))),
        }
    }

    /// Long polling degli update a partire da `offset`
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let payload = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let request = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(Duration::from_secs(timeout_secs) + timeouts::BOT_API)
            .json(&payload);

        self.call("getUpdates", request).await
    }

    pub async fn send_message(
        &self,
        chat_id: impl ToString,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<()> {
        let mut payload = json!({
            "chat_id": chat_id.to_string(),
            "text": text,
        });
        if let Some(mode) = parse_mode {
            payload["parse_mode"] = json!(mode.as_str());
        }

        let request = self
            .client
            .post(self.method_url("sendMessage"))
            .timeout(timeouts::BOT_API)
            .json(&payload);

        self.call::<serde_json::Value>("sendMessage", request)
            .await
            .map(|_| ())
    }

    /// Invia un documento generato in memoria
    pub async fn send_document(
        &self,
        chat_id: impl ToString,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<()> {
        let part = Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str(&crate::utils::get_mime_type(filename))
            .map_err(|e| AppError::BotApi(format!("MIME non valido: {}", e)))?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let request = self
            .client
            .post(self.method_url("sendDocument"))
            .timeout(timeouts::UPLOAD)
            .multipart(form);

        self.call::<serde_json::Value>("sendDocument", request)
            .await
            .map(|_| ())
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        let request = self
            .client
            .post(self.method_url("getFile"))
            .timeout(timeouts::BOT_API)
            .json(&json!({ "file_id": file_id }));

        self.call("getFile", request).await
    }

    /// Scarica il contenuto di un file già risolto con `getFile`
    pub async fn download(&self, file: &File) -> Result<Bytes> {
        let file_path = file.file_path.as_deref().ok_or_else(|| {
            AppError::BotApi(format!("File {} senza file_path", file.file_id))
        })?;

        let response = self
            .client
            .get(self.file_url(file_path))
            .timeout(timeouts::MEDIA_DOWNLOAD)
            .send()
            .await
            .map_err(|e| AppError::BotApi(format!("Errore download media: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(AppError::BotApi(format!(
                "Errore HTTP {}: impossibile scaricare il media",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| AppError::BotApi(format!("Errore lettura media: {}", e.without_url())))
    }

    /// Risolve `file_id` e salva il media in `dest`
    pub async fn fetch_media(&self, file_id: &str, dest: &Path) -> Result<u64> {
        let file = self.get_file(file_id).await?;
        let data = self.download(&file).await?;
        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:ABC";

    async fn api(server: &MockServer) -> BotApi {
        BotApi::new(&Url::parse(&server.uri()).unwrap(), TOKEN).unwrap()
    }

    #[tokio::test]
    async fn test_send_message_with_parse_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": "42",
                "text": "<pre>x</pre>",
                "parse_mode": "HTML",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": true, "result": { "message_id": 1 } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .await
            .send_message(42, "<pre>x</pre>", Some(ParseMode::Html))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error_hides_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user",
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .await
            .send_message("42", "ciao", None)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bot was blocked"));
        assert!(!msg.contains(TOKEN));
    }

    #[tokio::test]
    async fn test_fetch_media_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/getFile"))
            .and(body_partial_json(json!({ "file_id": "AwAD" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "file_id": "AwAD", "file_path": "voice/file_1.oga" },
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file/bot123:ABC/voice/file_1.oga"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"OggS".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("voice_1.ogg");
        let written = api(&server).await.fetch_media("AwAD", &dest).await.unwrap();

        assert_eq!(written, 4);
        assert_eq!(std::fs::read(&dest).unwrap(), b"OggS");
    }

    #[tokio::test]
    async fn test_download_without_path_fails() {
        let server = MockServer::start().await;
        let file = File {
            file_id: "x".to_string(),
            file_path: None,
        };
        let err = api(&server).await.download(&file).await.unwrap_err();
        assert!(matches!(err, AppError::BotApi(_)));
    }

    #[tokio::test]
    async fn test_get_updates_parses_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/getUpdates"))
            .and(body_partial_json(json!({ "offset": 10 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{
                    "update_id": 10,
                    "message": { "message_id": 5, "chat": { "id": 7 }, "text": "следующий" }
                }],
            })))
            .mount(&server)
            .await;

        let updates = api(&server).await.get_updates(Some(10), 0).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 10);
    }
}
