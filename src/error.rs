use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Coda piena: {queued}/{capacity} job in attesa")]
    AdmissionRejected { queued: usize, capacity: usize },

    #[error("Servizio {endpoint} non disponibile: {message}")]
    DownstreamUnavailable { endpoint: String, message: String },

    #[error("Servizio {endpoint} ha restituito un testo vuoto")]
    EmptyResult { endpoint: String },

    #[error("Servizio {endpoint} ha segnalato un errore: {message}")]
    ServiceReportedError { endpoint: String, message: String },

    #[error("Impossibile leggere la directory {}: {source}", path.display())]
    CleanupScanFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Variabili d'ambiente mancanti: {}", .0.join(", "))]
    ConfigurationMissing(Vec<&'static str>),

    #[error("Configurazione non valida: {0}")]
    InvalidConfig(String),

    #[error("Errore Bot API: {0}")]
    BotApi(String),

    #[error("Job terminato con panic: {0}")]
    JobPanicked(String),

    #[error("Errore di I/O: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
