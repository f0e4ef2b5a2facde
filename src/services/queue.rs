//! Coda sequenziale limitata per i job di riconoscimento.
//!
//! I job vengono eseguiti uno alla volta in ordine FIFO, così ai servizi a
//! valle arriva al massimo una richiesta per volta. Quando la coda è piena la
//! richiesta viene rifiutata subito, senza toccare la coda.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;

use crate::error::{AppError, Result};
use crate::models::{Job, JobId};
use crate::services::notifier::Notifier;

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    /// True finché un drain loop è attivo
    processing: bool,
}

/// Handle clonabile sulla coda condivisa
#[derive(Clone)]
pub struct TaskQueue {
    state: Arc<Mutex<QueueState>>,
    capacity: usize,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl TaskQueue {
    pub fn new(capacity: usize, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            capacity,
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        lock_state(&self.state)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Job in attesa (escluso quello in esecuzione)
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    /// Accoda un job.
    ///
    /// Restituisce `AdmissionRejected` se in coda ci sono già `capacity` job;
    /// in quel caso l'admin viene avvisato in background e il chiamante deve
    /// informare l'utente. Deve essere chiamata dentro un runtime tokio.
    pub fn submit<F, Fut>(&self, action: F) -> Result<JobId>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let job = Job::new(action);
        let id = job.id.clone();

        let start_drain = {
            let mut state = self.lock();
            let queued = state.jobs.len();
            if queued >= self.capacity {
                drop(state);
                return Err(self.reject(queued));
            }

            state.jobs.push_back(job);
            // Solo chi porta il flag da false a true avvia il drain loop
            !std::mem::replace(&mut state.processing, true)
        };

        tracing::debug!("Job {} accodato", id);

        if start_drain {
            let state = self.state.clone();
            let notifier = self.notifier.clone();
            tokio::spawn(drain(state, notifier));
        }

        Ok(id)
    }

    fn reject(&self, queued: usize) -> AppError {
        let err = AppError::AdmissionRejected {
            queued,
            capacity: self.capacity,
        };
        tracing::warn!("{}", err);

        let notifier = self.notifier.clone();
        let message = format!(
            "Переполнение очереди задач: {}/{}",
            queued, self.capacity
        );
        tokio::spawn(async move {
            let _ = notifier.notify(&message).await;
        });

        err
    }
}

fn lock_state(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    // Nessun job gira sotto lock, quindi lo stato resta coerente anche dopo un panic
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Esegue i job uno alla volta finché la coda non è vuota
async fn drain(state: Arc<Mutex<QueueState>>, notifier: Arc<dyn Notifier>) {
    tracing::debug!("Drain loop avviato");

    loop {
        let job = {
            let mut guard = lock_state(&state);
            match guard.jobs.pop_front() {
                Some(job) => job,
                None => {
                    guard.processing = false;
                    break;
                }
            }
        };

        let id = job.id.clone();
        tracing::debug!("Avvio job {}", id);

        let outcome = AssertUnwindSafe(async move { job.into_future().await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(AppError::JobPanicked(panic_message(&*panic))));

        match outcome {
            Ok(()) => tracing::debug!("Job {} completato", id),
            Err(e) => {
                tracing::error!("Job {} fallito: {}", id, e);
                let _ = notifier
                    .notify(&format!("Ошибка задачи {}: {}", id, e))
                    .await;
            }
        }
    }

    tracing::debug!("Coda vuota, drain loop terminato");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic senza messaggio".to_string()
    }
}
