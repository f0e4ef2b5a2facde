use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediabot::bot::Dispatcher;
use mediabot::config::Config;
use mediabot::handlers::HandlerContext;
use mediabot::models::ServiceKind;
use mediabot::services::cleanup::CleanupScheduler;
use mediabot::services::health::HealthMonitor;
use mediabot::services::notifier::{AdminNotifier, Notifier};
use mediabot::services::queue::TaskQueue;
use mediabot::services::recognition::RecognitionClient;
use mediabot::services::telegram::BotApi;

#[tokio::main]
async fn main() {
    // Carica variabili da .env
    dotenvy::dotenv().ok();

    // Inizializza logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediabot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configurazione obbligatoria: senza token ed endpoint il bot non parte
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!("❌ Errore fatale: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> mediabot::Result<()> {
    let api = BotApi::new(&config.telegram_api_url, config.bot_token.clone())?;
    let notifier: Arc<dyn Notifier> =
        Arc::new(AdminNotifier::new(api.clone(), config.admin_chat_id.clone()));

    let transcription =
        RecognitionClient::new(ServiceKind::Transcription, config.transcription_url.clone())?;
    let ocr = RecognitionClient::new(ServiceKind::Ocr, config.ocr_url.clone())?;

    let queue = TaskQueue::new(config.queue_capacity, notifier.clone());

    // Crea directory temporanea
    tokio::fs::create_dir_all(&config.temp_dir).await?;

    let shutdown = CancellationToken::new();

    // Task in background: cleanup e health check dei due servizi
    let background = vec![
        CleanupScheduler::new(&config.temp_dir, config.file_max_age(), notifier.clone())
            .start(config.cleanup_interval(), &shutdown),
        HealthMonitor::new(transcription.clone(), notifier.clone())
            .start(config.health_check_interval(), &shutdown),
        HealthMonitor::new(ocr.clone(), notifier.clone())
            .start(config.health_check_interval(), &shutdown),
    ];

    let ctx = HandlerContext {
        api,
        queue,
        transcription,
        ocr,
        notifier,
        temp_dir: config.temp_dir.clone(),
    };
    let dispatcher = Dispatcher::new(ctx)?;

    tracing::info!("========================================");
    tracing::info!("  mediabot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("========================================");
    tracing::info!("Whisper: {}", config.transcription_url);
    tracing::info!("OCR:     {}", config.ocr_url);
    tracing::info!("Temp:    {}", config.temp_dir.display());
    tracing::info!(
        "Coda: max {} job, cleanup ogni {} min (file > {} min)",
        config.queue_capacity,
        config.cleanup_interval_minutes,
        config.file_max_age_minutes
    );

    let polling = tokio::spawn(dispatcher.run(shutdown.clone()));

    wait_for_signal().await;
    tracing::info!("🛑 Arresto in corso...");
    shutdown.cancel();

    if let Err(e) = polling.await {
        tracing::warn!("Polling terminato in modo anomalo: {}", e);
    }
    for task in background {
        task.stop().await;
    }

    tracing::info!("Bot arrestato");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM non disponibile: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
