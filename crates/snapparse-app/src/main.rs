use std::sync::Arc;

use clap::Parser;
use snapparse_config::{Config, SettingsStore};
use snapparse_core::SettingsSync;
use snapparse_host::{EventBus, Host, JsonFileStore, LocalStore, MemoryStore, SharedScreen};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use self::cli::Cli;
use self::controller::{AppController, Services};

mod cli;
mod controller;
mod logging;


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::new();
    cli.apply(&mut config);

    let log = logging::init(cli.log_level.as_deref(), cli.log_json);
    tracing::info!("snapparse v{} starting", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let bus = EventBus::new();
    let screen = SharedScreen::default();
    let mut connection = snapparse_io::connect(
        &config.network.host_url,
        bus.clone(),
        screen.clone(),
        cancel.child_token(),
    )
    .await?;

    let store: Arc<dyn LocalStore> = match JsonFileStore::open(&config.storage_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                "[STORAGE] {} unusable, keeping state in memory: {e}",
                config.storage_path.display()
            );
            Arc::new(MemoryStore::new())
        }
    };

    let settings = SettingsStore::default();
    let host: Arc<dyn Host> = connection.host.clone();
    let sync = SettingsSync::new(host, &bus, settings.clone());
    sync.load().await;

    let log_task = tokio::spawn(
        log.follow_settings(settings.subscribe(), cancel.child_token()),
    );

    let controller = AppController::new(
        Services {
            config,
            host: connection.host.clone(),
            bus,
            store,
            clipboard: Arc::new(snapparse_io::system_clipboard()),
            screen,
            settings,
        },
        cancel.clone(),
    );
    let inputs = connection.inputs.clone();
    let mut tasks = controller.spawn_tasks(sync, inputs);

    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("Shutdown requested"),
            Err(e) => tracing::error!("failed to listen for ctrl+c: {e}"),
        },
        _ = &mut connection.reader => {
            tracing::warn!("[WS] host connection closed");
        }
        Some(result) = tasks.join_next() => match result {
            Ok(Ok(())) => tracing::warn!("a controller exited early"),
            Ok(Err(e)) => tracing::error!("controller failed: {e:#}"),
            Err(e) => tracing::error!("controller task panicked: {e}"),
        },
    }

    controller.shutdown();
    while let Some(result) = tasks.join_next().await {
        if let Ok(Err(e)) = result {
            tracing::debug!("task ended with error during shutdown: {e:#}");
        }
    }
    let _ = log_task.await;
    let _ = connection.writer.await;

    tracing::info!("snapparse stopped");
    Ok(())
}
