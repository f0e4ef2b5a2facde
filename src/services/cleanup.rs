//! Pulizia periodica della directory temporanea

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::services::notifier::Notifier;
use crate::utils::BackgroundTask;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
}

#[derive(Clone)]
pub struct CleanupScheduler {
    dir: PathBuf,
    max_age: Duration,
    notifier: Arc<dyn Notifier>,
}

impl CleanupScheduler {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            dir: dir.into(),
            max_age,
            notifier,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Un tick: elimina i file più vecchi di `max_age`.
    ///
    /// Directory assente = nessuna operazione. Un errore di lettura della
    /// directory produce un solo avviso admin per il tick.
    pub async fn sweep(&self) -> SweepReport {
        match self.sweep_dir(SystemTime::now()).await {
            Ok(report) => {
                if report.removed > 0 {
                    tracing::info!(
                        "Cleanup completato: {} file rimossi su {}",
                        report.removed,
                        report.scanned
                    );
                }
                report
            }
            Err(e) => {
                tracing::error!("Errore cleanup: {}", e);
                let _ = self.notifier.notify(&format!("Cron error: {}", e)).await;
                SweepReport::default()
            }
        }
    }

    async fn sweep_dir(&self, now: SystemTime) -> Result<SweepReport> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SweepReport::default())
            }
            Err(source) => return Err(self.scan_failure(source)),
        };

        let mut report = SweepReport::default();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => return Err(self.scan_failure(source)),
            };
            report.scanned += 1;

            // Errori sul singolo file: best-effort, si passa al successivo
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("Impossibile leggere {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            if !matches!(age, Some(age) if age > self.max_age) {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!("Rimosso file scaduto: {}", path.display());
                    report.removed += 1;
                }
                Err(e) => tracing::debug!("Errore rimozione {}: {}", path.display(), e),
            }
        }

        Ok(report)
    }

    fn scan_failure(&self, source: std::io::Error) -> AppError {
        AppError::CleanupScanFailure {
            path: self.dir.clone(),
            source,
        }
    }

    pub fn start(self, interval: Duration, shutdown: &CancellationToken) -> BackgroundTask {
        BackgroundTask::spawn_periodic("cleanup", interval, shutdown, move || {
            let scheduler = self.clone();
            async move {
                scheduler.sweep().await;
            }
        })
    }
}
