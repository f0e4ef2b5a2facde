use serde::Deserialize;

/// Servizio di riconoscimento a valle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Transcription,
    Ocr,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKind::Transcription => write!(f, "whisper"),
            ServiceKind::Ocr => write!(f, "ocr"),
        }
    }
}

/// Testo riconosciuto, mai vuoto
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    pub lang: Option<String>,
}

/// Corpo JSON restituito dai servizi: `{ text, lang?, error? }`
#[derive(Debug, Default, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
