use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use lifeline_app::app::api::routes;
use lifeline_app::config::ConfigHandler;
use lifeline_app::context::{ClockHandler, NotifierHandler};
use lifeline_app::db_handler::DbProviderHandler;
use lifeline_core::clock::{Clock, SystemClock};
use lifeline_core::config::load_config;
use lifeline_db::db::connection::create_pool;
use lifeline_db::db::migrate;
use lifeline_service::notify::{Notifier, log::LogNotifier, smtp::SmtpNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Lifeline donation coordination server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    migrate::run_pending(&config.database.url).await?;

    let pool = create_pool(
        &config.database.url,
        u32::from(config.database.max_connections),
    )
    .await?;

    tracing::info!("Database connection pool created.");

    let notifier: Arc<dyn Notifier> = if config.smtp.enabled {
        Arc::new(SmtpNotifier::new(&config.smtp)?)
    } else {
        tracing::warn!("SMTP disabled, outbound email will be logged only");
        Arc::new(LogNotifier)
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(DbProviderHandler { provider: pool })
        .hoop(ConfigHandler {
            settings: config.clone(),
        })
        .hoop(NotifierHandler { notifier })
        .hoop(ClockHandler { clock })
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
