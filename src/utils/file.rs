use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex_lite::Regex;

const UNIQUE_SUFFIX_LEN: usize = 6;

/// Tentativi prima di arrendersi se il nome generato esiste già
const MAX_CREATE_ATTEMPTS: usize = 5;

pub fn get_mime_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}

/// Nome file `<prefix>_<millis>.<ext>`
pub fn timestamped_name(prefix: &str, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        extension
    )
}

/// Nome file `<prefix>_<millis>_<random>.<ext>`, distinto anche per file
/// creati nello stesso millisecondo
pub fn unique_name(prefix: &str, extension: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UNIQUE_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!(
        "{}_{}_{}.{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        suffix,
        extension
    )
}

/// Estensione del file da un tag lingua; ripiega su `txt` se il tag non è
/// un token alfanumerico corto.
pub fn extension_for_lang(lang: Option<&str>) -> &str {
    static LANG_TAG: OnceLock<Regex> = OnceLock::new();
    let re = LANG_TAG.get_or_init(|| Regex::new(r"^[a-z0-9]{1,5}$").expect("regex valida"));

    match lang {
        Some(tag) if re.is_match(tag) => tag,
        _ => "txt",
    }
}

/// File temporaneo posseduto da un solo handler/job.
///
/// Il file viene rimosso quando il guard esce di scope, su qualunque percorso
/// di uscita (successo, errore, panic, job scartato dalla coda).
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Crea un file vuoto con nome univoco nella directory temporanea,
    /// creando la directory se manca. Il file non esisteva prima: nessun
    /// altro guard punta allo stesso percorso.
    pub async fn create(dir: &Path, prefix: &str, extension: &str) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let mut attempt = 0;
        loop {
            let path = dir.join(unique_name(prefix, extension));
            let created = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match created {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists
                    && attempt + 1 < MAX_CREATE_ATTEMPTS =>
                {
                    attempt += 1;
                    tracing::debug!("{} esiste già, nuovo nome", path.display());
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("File temporaneo rimosso: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Errore rimozione {}: {}", self.path.display(), e),
        }
    }
}
