use persona_relay_bot::{
    api::start_server,
    channel::TelegramClient,
    config::BotConfig,
    dispatcher::Dispatcher,
    gemini::GeminiClient,
    memory::build_history_store,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(Box::new(e) as Box<dyn std::error::Error>);
        }
    };

    let persona = config.load_persona()?;
    let store = build_history_store(&config)?;
    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?;
    let telegram = Arc::new(TelegramClient::new(config.telegram_token.clone())?);

    info!(
        model = gemini.model(),
        backend = store.backend_name(),
        persona_version = %persona.version,
        persona_fingerprint = %persona.fingerprint(),
        history_window = config.history_window,
        "Bot is running"
    );

    let dispatcher = Arc::new(Dispatcher::new(
        store,
        Arc::new(gemini),
        telegram.clone(),
        persona,
        config.history_window,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let health = config.health_port.map(|port| {
        let mut rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = rx.wait_for(|stop| *stop).await;
            };
            if let Err(e) = start_server(port, shutdown).await {
                error!("Health server stopped: {}", e);
            }
        })
    });

    tokio::select! {
        _ = telegram.run_polling(dispatcher) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = health {
        let _ = handle.await;
    }

    Ok(())
}
