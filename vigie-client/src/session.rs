//! Bidirectional dashboard session
//!
//! Maintains one authenticated MQTT session per (token, business_id) pair
//! and exposes the latest dashboard snapshot plus the connection lifecycle.
//! Reconnection and backoff belong to the rumqttc event loop; this module
//! only observes transport state and never runs a competing retry loop.

use crate::config::MqttEndpoint;
use crate::models::{ConnectionState, DashboardSnapshot, SessionCredentials};
use rumqttc::{AsyncClient, ConnectionError, Event, Incoming, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const HELLO_TOPIC: &str = "vigie/dashboard/hello@v1";
pub const DASHBOARD_ROLE: &str = "business-dashboard";

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const ERROR_PAUSE: Duration = Duration::from_secs(2);

/// Per-business topic carrying `dashboardUpdate` envelopes.
pub fn update_topic(business_id: &str) -> String {
    format!("vigie/dashboard/{business_id}/update@v1")
}

/// Envelope received on the update topic. Unknown event tags decode as
/// `Unrecognized` instead of failing the message, so new server events
/// never look like decode errors on an older client.
#[derive(Debug, Deserialize)]
#[serde(tag = "event")]
pub enum DashboardEvent {
    #[serde(rename = "dashboardUpdate")]
    DashboardUpdate { payload: serde_json::Value },
    #[serde(other)]
    Unrecognized,
}

/// Handshake announce published once per CONNACK (matches the
/// dashboard.hello@v1 contract; the role is fixed).
#[derive(Debug, Serialize)]
struct HelloMessage<'a> {
    token: &'a str,
    role: &'static str,
    business_id: &'a str,
}

/// Owns at most one live session. Re-opening tears the previous session
/// down first, so two concurrent sessions for the same context cannot exist.
pub struct SessionManager {
    endpoint: MqttEndpoint,
    live: Option<LiveSession>,
}

impl SessionManager {
    pub fn new(endpoint: MqttEndpoint) -> Self {
        Self {
            endpoint,
            live: None,
        }
    }

    /// Opens the session. Incomplete credentials are a caller contract
    /// violation, not a runtime error: the manager stays idle, exposes no
    /// connection and spins no retry loop.
    pub fn open(&mut self, credentials: &SessionCredentials) {
        if !credentials.is_complete() {
            warn!("session credentials incomplete, dashboard session stays idle");
            return;
        }
        if self.live.is_some() {
            info!("dashboard session already open, replacing it");
            self.close();
        }
        self.live = Some(LiveSession::spawn(credentials.clone(), self.endpoint.clone()));
    }

    /// Idempotent; the transport is torn down deterministically.
    pub fn close(&mut self) {
        if let Some(live) = self.live.take() {
            live.cancel.cancel();
        }
    }

    pub fn is_open(&self) -> bool {
        self.live.is_some()
    }

    /// Latest snapshot, if any update arrived on the current session.
    pub fn snapshot(&self) -> Option<DashboardSnapshot> {
        self.live
            .as_ref()
            .and_then(|live| live.snapshot_rx.borrow().clone())
    }

    /// Read-only subscription to snapshot replacements.
    pub fn watch_snapshot(&self) -> Option<watch::Receiver<Option<DashboardSnapshot>>> {
        self.live.as_ref().map(|live| live.snapshot_rx.clone())
    }

    pub fn state(&self) -> ConnectionState {
        self.live
            .as_ref()
            .map(|live| live.state_rx.borrow().clone())
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn watch_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.live.as_ref().map(|live| live.state_rx.clone())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
    }
}

struct LiveSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    snapshot_rx: watch::Receiver<Option<DashboardSnapshot>>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl LiveSession {
    fn spawn(credentials: SessionCredentials, endpoint: MqttEndpoint) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            credentials,
            endpoint,
            snapshot_tx,
            state_tx,
            cancel.clone(),
        ));
        Self {
            cancel,
            task,
            snapshot_rx,
            state_rx,
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        // release on every exit path: dropping the event loop closes the socket
        self.cancel.cancel();
        self.task.abort();
    }
}

async fn run_session(
    credentials: SessionCredentials,
    endpoint: MqttEndpoint,
    snapshot_tx: watch::Sender<Option<DashboardSnapshot>>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let client_id = format!("vigie-dashboard-{}", credentials.business_id);
    let mut options = MqttOptions::new(&client_id, &endpoint.host, endpoint.port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_clean_session(true);
    options.set_credentials(credentials.business_id.clone(), credentials.token.clone());

    let (client, mut eventloop) = AsyncClient::new(options, 10);
    let topic = update_topic(&credentials.business_id);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = client.disconnect().await;
                state_tx.send_replace(ConnectionState::Disconnected);
                break;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("dashboard session connected as {client_id}");
                    state_tx.send_replace(ConnectionState::Connected);
                    // clean session: every (re)connect needs the subscription and hello again
                    if let Err(e) = announce(&client, &credentials, &topic).await {
                        warn!("dashboard session announce failed: {e}");
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) if publish.topic == topic => {
                    handle_update(&publish.payload, &snapshot_tx);
                }
                Ok(_) => {}
                Err(ConnectionError::ConnectionRefused(code)) => {
                    // bad token: surface to the auth collaborator, the transport keeps retrying
                    error!("dashboard session refused by broker ({code:?}), check credentials");
                    state_tx.send_replace(ConnectionState::Errored(format!(
                        "connection refused: {code:?}"
                    )));
                    tokio::time::sleep(ERROR_PAUSE).await;
                    state_tx.send_replace(ConnectionState::Connecting);
                }
                Err(e) => {
                    warn!("dashboard session transport error: {e}");
                    state_tx.send_replace(ConnectionState::Errored(e.to_string()));
                    // the event loop reconnects with its own backoff on the next poll
                    tokio::time::sleep(ERROR_PAUSE).await;
                    state_tx.send_replace(ConnectionState::Connecting);
                }
            }
        }
    }
}

async fn announce(
    client: &AsyncClient,
    credentials: &SessionCredentials,
    topic: &str,
) -> anyhow::Result<()> {
    client.subscribe(topic, QoS::AtLeastOnce).await?;
    let hello = HelloMessage {
        token: &credentials.token,
        role: DASHBOARD_ROLE,
        business_id: &credentials.business_id,
    };
    let payload = serde_json::to_string(&hello)?;
    client
        .publish(HELLO_TOPIC, QoS::AtLeastOnce, false, payload)
        .await?;
    Ok(())
}

/// Replaces the exposed snapshot wholesale and notifies watchers. The
/// payload shape is deliberately not validated here.
fn handle_update(payload: &[u8], snapshot_tx: &watch::Sender<Option<DashboardSnapshot>>) {
    match serde_json::from_slice::<DashboardEvent>(payload) {
        Ok(DashboardEvent::DashboardUpdate { payload }) => {
            snapshot_tx.send_replace(Some(DashboardSnapshot(payload)));
        }
        Ok(DashboardEvent::Unrecognized) => {
            debug!("unrecognized dashboard event, ignoring");
        }
        Err(e) => warn!("invalid dashboard event payload: {e}"),
    }
}
