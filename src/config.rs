use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub transcription_url: Url,
    pub ocr_url: Url,
    pub admin_chat_id: Option<String>,
    pub temp_dir: PathBuf,
    pub cleanup_interval_minutes: u64,
    pub file_max_age_minutes: u64,
    pub queue_capacity: usize,
    pub health_check_interval_secs: u64,
    pub telegram_api_url: Url,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Costruisce la configurazione da una sorgente chiave/valore arbitraria
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN");
        let transcription_url = get("WHISPER_URL");
        let ocr_url = get("OCR_URL");

        // Segnala tutte le variabili obbligatorie mancanti in una volta
        let mut missing = Vec::new();
        if bot_token.is_none() {
            missing.push("BOT_TOKEN");
        }
        if transcription_url.is_none() {
            missing.push("WHISPER_URL");
        }
        if ocr_url.is_none() {
            missing.push("OCR_URL");
        }

        let (Some(bot_token), Some(transcription_url), Some(ocr_url)) =
            (bot_token, transcription_url, ocr_url)
        else {
            return Err(AppError::ConfigurationMissing(missing));
        };

        let telegram_api_url = get("TELEGRAM_API_URL")
            .unwrap_or_else(|| defaults::TELEGRAM_API_URL.to_string());

        Ok(Self {
            bot_token,
            transcription_url: parse_url("WHISPER_URL", &transcription_url)?,
            ocr_url: parse_url("OCR_URL", &ocr_url)?,
            admin_chat_id: get("ADMIN_ID"),
            temp_dir: get("TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::TEMP_DIR)),
            cleanup_interval_minutes: parse_or(
                &get,
                "CLEANUP_INTERVAL_MINUTES",
                defaults::CLEANUP_INTERVAL_MINUTES,
            ),
            file_max_age_minutes: parse_or(
                &get,
                "FILE_MAX_AGE_MINUTES",
                defaults::FILE_MAX_AGE_MINUTES,
            ),
            queue_capacity: parse_or(&get, "QUEUE_LIMIT", defaults::QUEUE_CAPACITY),
            health_check_interval_secs: parse_or(
                &get,
                "HEALTH_CHECK_INTERVAL_SECS",
                defaults::HEALTH_CHECK_INTERVAL_SECS,
            ),
            telegram_api_url: parse_url("TELEGRAM_API_URL", &telegram_api_url)?,
        })
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_minutes.saturating_mul(60))
    }

    pub fn file_max_age(&self) -> Duration {
        Duration::from_secs(self.file_max_age_minutes.saturating_mul(60))
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url> {
    Url::parse(value.trim()).map_err(|e| AppError::InvalidConfig(format!("{}: {}", key, e)))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("{} non valido ({}), uso il default {}", key, raw, default);
                default
            }
        },
        None => default,
    }
}

pub mod defaults {
    pub const TEMP_DIR: &str = "./tmp";
    pub const CLEANUP_INTERVAL_MINUTES: u64 = 15;
    pub const FILE_MAX_AGE_MINUTES: u64 = 30;
    pub const QUEUE_CAPACITY: usize = 5;
    pub const HEALTH_CHECK_INTERVAL_SECS: u64 = 60;
    pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
}

// Timeout delle chiamate HTTP
pub mod timeouts {
    use std::time::Duration;

    /// Upload del file al servizio di trascrizione/OCR
    pub const UPLOAD: Duration = Duration::from_millis(120_000);
    /// Download del media dalla Bot API
    pub const MEDIA_DOWNLOAD: Duration = Duration::from_millis(30_000);
    pub const HEALTH_PROBE: Duration = Duration::from_millis(5_000);
    pub const NOTIFY: Duration = Duration::from_secs(10);
    /// Chiamate ordinarie alla Bot API (sendMessage, getFile, ...)
    pub const BOT_API: Duration = Duration::from_secs(30);
    /// Long polling di getUpdates (lato server Telegram)
    pub const LONG_POLL_SECS: u64 = 30;
}
