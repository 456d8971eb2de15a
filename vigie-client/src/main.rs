//! Vigie client - wiring binary
//!
//! Boots the three consumers against the configured environment and logs
//! what they expose, standing in for the dashboard's presentation layer.
//! Shutdown closes the session and the ticker, then drains the gateway so
//! no notification is lost mid-display.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vigie_client::config::ClientConfig;
use vigie_client::gateway::PushGateway;
use vigie_client::session::SessionManager;
use vigie_client::surface::{ClientSurface, CommandSurface};
use vigie_client::ticker::StreamTicker;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    info!("Vigie client starting...");

    let config = ClientConfig::load();
    let credentials = ClientConfig::credentials_from_env();

    let surface: Arc<dyn ClientSurface> = Arc::new(CommandSurface::new(config.surface.clone()));

    let mut session = SessionManager::new(config.mqtt.clone());
    session.open(&credentials);

    let mut ticker = StreamTicker::new();
    let token = (!credentials.token.is_empty()).then_some(credentials.token.as_str());
    ticker.open(config.stream_url.as_deref(), token);

    let gateway = if credentials.is_complete() {
        Some(PushGateway::spawn(
            credentials.clone(),
            config.mqtt.clone(),
            surface,
            config.dashboard_url.clone(),
        ))
    } else {
        warn!("credentials incomplete, push gateway disabled");
        None
    };

    // Minimal stand-in for the presentation layer: log what the consumers expose.
    if let Some(mut snapshot_rx) = session.watch_snapshot() {
        tokio::spawn(async move {
            while snapshot_rx.changed().await.is_ok() {
                if let Some(snapshot) = snapshot_rx.borrow_and_update().clone() {
                    info!("dashboard snapshot replaced: {}", snapshot.0);
                }
            }
        });
    }

    let ticker_task = tokio::spawn(ticker_log_loop(ticker));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down...");

    // dropping the ticker with its log loop closes the stream transport
    ticker_task.abort();
    session.close();
    if let Some(gateway) = gateway {
        gateway.shutdown().await;
    }

    Ok(())
}

/// Logs newly arrived announcements; the real dashboard renders them instead.
async fn ticker_log_loop(ticker: StreamTicker) {
    let mut last_seen: Option<vigie_client::UpdateAnnouncement> = None;
    let mut interval = tokio::time::interval(Duration::from_secs(2));
    loop {
        interval.tick().await;
        let entries = ticker.announcements();
        let fresh: Vec<_> = entries
            .iter()
            .take_while(|entry| Some(*entry) != last_seen.as_ref())
            .collect();
        // oldest of the fresh batch first, the way a reader would expect
        for announcement in fresh.iter().rev() {
            info!(
                "announcement: [{:?}] {}",
                announcement.kind, announcement.message
            );
        }
        if let Some(newest) = entries.first() {
            last_seen = Some(newest.clone());
        }
    }
}
