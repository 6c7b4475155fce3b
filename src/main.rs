use anyhow::{Context, Result};
use plant_tracker::{
    accounts::{AccountService, SessionStore},
    config::Config,
    lifecycle::PlantService,
    notifier::{LogNotifier, Notifier, SmtpNotifier},
    routes::{router, AppState},
    scanner::{spawn_scan_loop, OverdueScanner},
    storage::{JsonStore, RecordStore},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plant_tracker=debug,server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let store: Arc<dyn RecordStore> =
        Arc::new(JsonStore::open(&config.data_dir).context("Failed to initialize storage")?);

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Sending reminders over SMTP");
            Arc::new(SmtpNotifier::new(smtp, config.notify_timeout)?)
        }
        None => {
            tracing::warn!("SMTP not configured, reminders will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let scanner = OverdueScanner::new(store.clone(), notifier, config.notify_timeout);
    spawn_scan_loop(scanner, config.scan_interval);

    let state = Arc::new(AppState {
        plants: PlantService::new(store.clone()),
        accounts: AccountService::new(store),
        sessions: SessionStore::new(),
    });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        "Plant tracker v{} listening on http://{} (overdue scan every {}s)",
        env!("CARGO_PKG_VERSION"),
        addr,
        config.scan_interval.as_secs()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received, exiting...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
