//! Long polling della Bot API e smistamento degli update

use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio_util::sync::CancellationToken;

use crate::config::timeouts;
use crate::error::{AppError, Result};
use crate::handlers::{self, HandlerContext};
use crate::models::telegram::Update;

/// Un update per chat ogni due secondi; gli altri vengono scartati
const INBOUND_PERIOD: Duration = Duration::from_secs(2);

/// Attesa dopo un errore di polling
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct Dispatcher {
    ctx: Arc<HandlerContext>,
    limiter: DefaultKeyedRateLimiter<i64>,
}

impl Dispatcher {
    pub fn new(ctx: HandlerContext) -> Result<Self> {
        let quota = Quota::with_period(INBOUND_PERIOD)
            .ok_or_else(|| AppError::InvalidConfig("periodo rate limit nullo".to_string()))?;

        Ok(Self {
            ctx: Arc::new(ctx),
            limiter: RateLimiter::keyed(quota),
        })
    }

    /// Rate limit per chat
    fn admit(&self, chat_id: i64) -> bool {
        self.limiter.check_key(&chat_id).is_ok()
    }

    /// Dimentica le chat il cui limite è tornato pieno
    fn prune_idle_chats(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Legge gli update finché `shutdown` non viene cancellato
    pub async fn run(self, shutdown: CancellationToken) {
        let mut offset: Option<i64> = None;
        tracing::info!("Polling update avviato");

        loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = self.ctx.api.get_updates(offset, timeouts::LONG_POLL_SECS) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.dispatch(update);
                    }
                    self.prune_idle_chats();
                }
                Err(e) => {
                    tracing::warn!("Errore polling update: {}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!("Polling update terminato");
    }

    fn dispatch(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };

        let chat_id = message.chat.id;
        if !self.admit(chat_id) {
            tracing::debug!("Update {} scartato (rate limit chat {})", update.update_id, chat_id);
            return;
        }

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = handlers::handle_message(&ctx, message).await {
                tracing::error!("Errore gestione messaggio da chat {}: {}", chat_id, e);
            }
        });
    }
}
