use std::future::Future;

use chrono::Utc;
use futures::future::BoxFuture;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::Result;

const ID_SUFFIX_LEN: usize = 6;

/// Identificativo di un job: timestamp di creazione + suffisso casuale.
///
/// Unico solo all'interno di un singolo processo.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("{}-{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

type JobAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send + 'static>;

/// Un'unità di lavoro in coda: azione asincrona senza argomenti.
///
/// Le risposte all'utente sono effetti collaterali dell'azione stessa;
/// l'eventuale errore restituito viene gestito dal runner della coda.
pub struct Job {
    pub id: JobId,
    action: JobAction,
}

impl Job {
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            id: JobId::generate(),
            action: Box::new(move || Box::pin(action())),
        }
    }

    /// Consuma il job restituendo il future da eseguire
    pub fn into_future(self) -> BoxFuture<'static, Result<()>> {
        (self.action)()
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish()
    }
}
