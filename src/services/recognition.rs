//! Client per i servizi di trascrizione e OCR.
//!
//! Un'unica implementazione parametrizzata per endpoint: entrambi i servizi
//! accettano un file multipart nel campo `file` e rispondono con
//! `{ text, lang?, error? }`. Nessun retry: una chiamata fallita viene
//! riportata al chiamante così com'è.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};

use crate::config::timeouts;
use crate::error::{AppError, Result};
use crate::models::{RecognitionResponse, RecognitionResult, ServiceKind};
use crate::utils::get_mime_type;

#[derive(Debug, Clone)]
pub struct RecognitionClient {
    kind: ServiceKind,
    endpoint: Url,
    health_url: Url,
    client: Client,
    timeout: Duration,
}

impl RecognitionClient {
    pub fn new(kind: ServiceKind, endpoint: Url) -> Result<Self> {
        Self::with_timeout(kind, endpoint, timeouts::UPLOAD)
    }

    pub fn with_timeout(kind: ServiceKind, endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::InvalidConfig(format!("Errore client HTTP: {}", e)))?;

        Ok(Self {
            kind,
            health_url: health_url_for(&endpoint),
            endpoint,
            client,
            timeout,
        })
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn health_url(&self) -> &Url {
        &self.health_url
    }

    fn unavailable(&self, message: impl std::fmt::Display) -> AppError {
        AppError::DownstreamUnavailable {
            endpoint: self.endpoint.to_string(),
            message: message.to_string(),
        }
    }

    /// Invia il file al servizio e restituisce il testo riconosciuto
    pub async fn recognize(&self, path: &Path) -> Result<RecognitionResult> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        let part = Part::bytes(data)
            .file_name(filename.clone())
            .mime_str(&get_mime_type(&filename))
            .map_err(|e| self.unavailable(e))?;
        let form = Form::new().part("file", part);

        tracing::debug!("Invio {} a {} ({})", filename, self.endpoint, self.kind);

        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("HTTP {} {}", status, body.trim())));
        }

        let body: RecognitionResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("risposta non valida: {}", e)))?;

        self.interpret(body)
    }

    fn interpret(&self, body: RecognitionResponse) -> Result<RecognitionResult> {
        if let Some(message) = body.error.filter(|m| !m.trim().is_empty()) {
            return Err(AppError::ServiceReportedError {
                endpoint: self.endpoint.to_string(),
                message,
            });
        }

        let text = body.text.map(|t| t.trim().to_string()).unwrap_or_default();
        if text.is_empty() {
            return Err(AppError::EmptyResult {
                endpoint: self.endpoint.to_string(),
            });
        }

        Ok(RecognitionResult {
            text,
            lang: body.lang.filter(|l| !l.trim().is_empty()),
        })
    }

    /// `GET <base>/health`: ok solo con HTTP 200
    pub async fn probe_health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.health_url.clone())
            .timeout(timeouts::HEALTH_PROBE)
            .send()
            .await
            .map_err(|e| AppError::DownstreamUnavailable {
                endpoint: self.health_url.to_string(),
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(AppError::DownstreamUnavailable {
                endpoint: self.health_url.to_string(),
                message: format!("HTTP {}", status),
            }),
        }
    }
}

/// L'endpoint di health sta alla radice del servizio
fn health_url_for(endpoint: &Url) -> Url {
    let mut url = endpoint.clone();
    url.set_path("/health");
    url.set_query(None);
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn staged(contents: &[u8], name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(name);
        tokio::fs::write(&file, contents).await.unwrap();
        (dir, file)
    }

    fn client(server: &MockServer, kind: ServiceKind, route: &str) -> RecognitionClient {
        let endpoint = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
        RecognitionClient::new(kind, endpoint).unwrap()
    }

    async fn mount_post(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_health_url_replaces_path() {
        let url = Url::parse("http://whisper:8000/stt?lang=ru").unwrap();
        assert_eq!(health_url_for(&url).as_str(), "http://whisper:8000/health");
    }

    #[tokio::test]
    async fn test_transcription_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stt"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "  привет  " })))
            .expect(1)
            .mount(&server)
            .await;

        let (_dir, file) = staged(b"OggS", "voice_1.ogg").await;
        let result = client(&server, ServiceKind::Transcription, "/stt")
            .recognize(&file)
            .await
            .unwrap();

        assert_eq!(result.text, "привет");
        assert_eq!(result.lang, None);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"voice_1.ogg\""));
    }

    #[tokio::test]
    async fn test_ocr_success_with_lang() {
        let server = MockServer::start().await;
        mount_post(
            &server,
            "/ocr",
            ResponseTemplate::new(200).set_body_json(json!({ "text": "fn main() {}", "lang": "rs" })),
        )
        .await;

        let (_dir, file) = staged(b"jpeg", "img_1.jpg").await;
        let result = client(&server, ServiceKind::Ocr, "/ocr")
            .recognize(&file)
            .await
            .unwrap();
        assert_eq!(result.lang.as_deref(), Some("rs"));
    }

    #[tokio::test]
    async fn test_empty_or_missing_text_is_failure() {
        for body in [json!({ "text": "" }), json!({ "text": "   " }), json!({})] {
            let server = MockServer::start().await;
            mount_post(&server, "/stt", ResponseTemplate::new(200).set_body_json(body)).await;

            let (_dir, file) = staged(b"OggS", "voice_1.ogg").await;
            let err = client(&server, ServiceKind::Transcription, "/stt")
                .recognize(&file)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::EmptyResult { .. }), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn test_reported_error_wins_over_empty_text() {
        let server = MockServer::start().await;
        mount_post(
            &server,
            "/ocr",
            ResponseTemplate::new(200).set_body_json(json!({ "text": "", "error": "no text found" })),
        )
        .await;

        let (_dir, file) = staged(b"jpeg", "img_1.jpg").await;
        let err = client(&server, ServiceKind::Ocr, "/ocr")
            .recognize(&file)
            .await
            .unwrap_err();
        match err {
            AppError::ServiceReportedError { message, .. } => assert_eq!(message, "no text found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_success_status_is_unavailable() {
        let server = MockServer::start().await;
        mount_post(&server, "/stt", ResponseTemplate::new(502).set_body_string("bad gateway")).await;

        let (_dir, file) = staged(b"OggS", "voice_1.ogg").await;
        let err = client(&server, ServiceKind::Transcription, "/stt")
            .recognize(&file)
            .await
            .unwrap_err();
        match err {
            AppError::DownstreamUnavailable { endpoint, message } => {
                assert!(endpoint.ends_with("/stt"));
                assert!(message.contains("502"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_unavailable() {
        let server = MockServer::start().await;
        mount_post(&server, "/stt", ResponseTemplate::new(200).set_body_string("<html>")).await;

        let (_dir, file) = staged(b"OggS", "voice_1.ogg").await;
        let err = client(&server, ServiceKind::Transcription, "/stt")
            .recognize(&file)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DownstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let server = MockServer::start().await;
        mount_post(
            &server,
            "/stt",
            ResponseTemplate::new(200)
                .set_body_json(json!({ "text": "tardi" }))
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let endpoint = Url::parse(&format!("{}/stt", server.uri())).unwrap();
        let client = RecognitionClient::with_timeout(
            ServiceKind::Transcription,
            endpoint,
            Duration::from_millis(100),
        )
        .unwrap();

        let (_dir, file) = staged(b"OggS", "voice_1.ogg").await;
        let started = std::time::Instant::now();
        let err = client.recognize(&file).await.unwrap_err();
        assert!(matches!(err, AppError::DownstreamUnavailable { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let server = MockServer::start().await;
        let err = client(&server, ServiceKind::Ocr, "/ocr")
            .recognize(Path::new("/nonexistent/img_0.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IoError(_)));
    }

    #[tokio::test]
    async fn test_probe_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
            .mount(&server)
            .await;

        let ok = client(&server, ServiceKind::Transcription, "/stt");
        assert!(ok.probe_health().await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_health_non_200_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client(&server, ServiceKind::Ocr, "/ocr");
        assert!(matches!(
            client.probe_health().await,
            Err(AppError::DownstreamUnavailable { .. })
        ));
    }
}
