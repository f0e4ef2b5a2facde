//! Handle for periodic background tasks

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Oltre questo periodo `Instant + period` rischia l'overflow
const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A spawned periodic task together with its stop handle.
#[derive(Debug)]
pub struct BackgroundTask {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `tick` every `period`, the first run one period after start.
    ///
    /// Cancelling `parent` (or calling [`stop`](Self::stop)) drops an
    /// in-flight tick at its next suspension point.
    pub fn spawn_periodic<F, Fut>(
        name: &'static str,
        period: Duration,
        parent: &CancellationToken,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // interval_at va in panic con periodo nullo
        let period = period.clamp(Duration::from_millis(1), MAX_PERIOD);
        let token = parent.child_token();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            _ = cancelled.cancelled() => break,
                            _ = tick() => {}
                        }
                    }
                }
            }
            tracing::debug!("Task {} terminato", name);
        });

        tracing::info!("Task {} avviato (ogni {:?})", name, period);
        Self {
            name,
            token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!("Task {} terminato in modo anomalo: {}", self.name, e);
        }
    }
}
