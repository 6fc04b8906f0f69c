use brewcrew_coordinator::config::AppConfig;
use brewcrew_coordinator::coordinator::Coordinator;
use brewcrew_coordinator::routes::create_router_with_coordinator;
use brewcrew_coordinator::scheduler::NotificationScheduler;
use brewcrew_shared::clock::{Clock, SystemClock};
use brewcrew_shared::settings::ensure_default_settings;
use brewcrew_shared::store::memory::MemoryStore;
use brewcrew_shared::store::postgres::PgStore;
use brewcrew_shared::store::Store;
use brewcrew_shared::transport::telegram::TelegramTransport;
use brewcrew_shared::transport::Transport;
use log::{error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting coordinator service");

    let config = AppConfig::from_env()?;
    match &config.database_url {
        Some(url) => {
            info!("Using Postgres store");
            let store = PgStore::connect(url).await?;
            run(Arc::new(store), config).await
        }
        None => {
            warn!("DATABASE_URL not set, state will be lost on restart");
            run(Arc::new(MemoryStore::new()), config).await
        }
    }
}

async fn run<S: Store>(store: Arc<S>, config: AppConfig) -> Result<(), BoxError> {
    ensure_default_settings(store.as_ref()).await?;

    let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(
        &config.telegram_api_url,
        &config.bot_token,
        config.message_ttl,
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        transport.clone(),
        clock.clone(),
        config.policy,
    ));
    if let Some(code) = &config.default_invite_code {
        coordinator.ensure_bootstrap_invite(code).await?;
    }

    let scheduler = NotificationScheduler::new(store, transport, clock, config.policy);
    let cancel = CancellationToken::new();
    let scheduler_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    let app = create_router_with_coordinator(coordinator);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task ended abnormally: {}", e);
    }
    info!("Coordinator service stopped");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    cancel.cancel();
}
