pub mod audio;
pub mod capture;
pub mod collaborators;
pub mod detection;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod runner;
pub mod sampling;
pub mod sensor;
pub mod settings;
pub mod status;
mod utils;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use runner::ReplayController;
use settings::SettingsStore;

pub use error::{SentryError, SentryResult};

const SETTINGS_ENV: &str = "SENTRY_SETTINGS";

/// Headless entry point: `presence-sentry <replay.jsonl>`.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("presence-sentry starting up...");

    let replay_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: presence-sentry <replay.jsonl>"))?;
    let settings_path = std::env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("settings.json"));

    let settings = SettingsStore::new(settings_path)?.snapshot();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let mut controller = ReplayController::new();

        let mut status_rx = controller.status().subscribe();
        tokio::spawn(async move {
            while status_rx.changed().await.is_ok() {
                let status = status_rx.borrow_and_update().clone();
                log::info!("status: {}", status);
            }
        });

        let cancel_token = controller.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("interrupt received; stopping");
                cancel_token.cancel();
            }
        });

        controller.start(&settings, &replay_path).await?;
        let summary = controller.join().await?;

        log::info!(
            "replay done: {} body frames, {} color frames, {} windows, {} episode(s)",
            summary.body_frames,
            summary.color_frames,
            summary.windows,
            summary.episodes
        );
        Ok::<(), anyhow::Error>(())
    })
}
