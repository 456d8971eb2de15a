//! Background push gateway
//!
//! Runs independently of any open dashboard view: its own subscription
//! receives push deliveries, decodes them, renders OS notifications and
//! routes clicks back into the application. Display and click routing are
//! registered on a task tracker so shutdown waits for them to settle
//! instead of tearing the process down mid-display.

use crate::config::MqttEndpoint;
use crate::models::{PushPayload, SessionCredentials};
use crate::surface::ClientSurface;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

pub const DEFAULT_TITLE: &str = "New notification";
pub const DEFAULT_BODY: &str = "You have a new message";
pub const DEFAULT_ICON: &str = "icons/vigie-192.png";
// the badge is never carried by the payload, it is a fixed asset
pub const DEFAULT_BADGE: &str = "icons/vigie-badge-72.png";
pub const FALLBACK_TARGET: &str = "/";

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const ERROR_PAUSE: Duration = Duration::from_secs(2);

/// Per-business topic carrying push deliveries.
pub fn push_topic(business_id: &str) -> String {
    format!("vigie/push/{business_id}@v1")
}

/// A delivery resolved against the display fallbacks, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsNote {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub url: String,
}

/// Applies the fallbacks from the push contract: generic title/body,
/// default icon and badge, `/` as the click target.
pub fn build_note(payload: PushPayload) -> OsNote {
    OsNote {
        title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
        icon: payload.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        badge: DEFAULT_BADGE.to_string(),
        url: payload
            .data
            .and_then(|data| data.url)
            .unwrap_or_else(|| FALLBACK_TARGET.to_string()),
    }
}

/// Decode step of the delivery state machine. `None` is decode-failed: the
/// delivery is dropped for good, the push transport offers no replay.
pub fn decode_delivery(payload: &[u8]) -> Option<PushPayload> {
    match serde_json::from_slice(payload) {
        Ok(push) => Some(push),
        Err(e) => {
            warn!("dropping undecodable push delivery: {e}");
            None
        }
    }
}

/// Routes a notification click: focus the first open window whose URL
/// contains the stored target, otherwise open a new window at the target.
pub fn route_click<S: ClientSurface + ?Sized>(surface: &S, target: &str, dashboard_url: &str) {
    let matching = surface
        .list_windows()
        .into_iter()
        .find(|window| window.url.contains(target));

    match matching {
        Some(window) => {
            if let Err(e) = surface.focus(&window.id) {
                warn!("failed to focus window {}: {e}", window.id);
            }
        }
        None => {
            let absolute = resolve_target(target, dashboard_url);
            if let Err(e) = surface.open_window(&absolute) {
                warn!("failed to open window at {absolute}: {e}");
            }
        }
    }
}

/// Push targets are usually dashboard-relative paths; absolute URLs pass
/// through untouched.
fn resolve_target(target: &str, dashboard_url: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("{}{}", dashboard_url.trim_end_matches('/'), target)
    }
}

/// Background consumer for push deliveries. Host-lifecycle driven: there is
/// no per-delivery cancellation, only a process-level shutdown that drains
/// whatever is still displaying.
pub struct PushGateway {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    tracker: TaskTracker,
}

impl PushGateway {
    pub fn spawn(
        credentials: SessionCredentials,
        endpoint: MqttEndpoint,
        surface: Arc<dyn ClientSurface>,
        dashboard_url: String,
    ) -> Self {
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_gateway(
            credentials,
            endpoint,
            surface,
            dashboard_url,
            tracker.clone(),
            cancel.clone(),
        ));
        Self {
            cancel,
            task,
            tracker,
        }
    }

    /// Stops the consumer, then waits until every pending display and click
    /// routing sequence has settled.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
        self.tracker.close();
        self.tracker.wait().await;
    }
}

async fn run_gateway(
    credentials: SessionCredentials,
    endpoint: MqttEndpoint,
    surface: Arc<dyn ClientSurface>,
    dashboard_url: String,
    tracker: TaskTracker,
    cancel: CancellationToken,
) {
    let client_id = format!("vigie-gateway-{}", credentials.business_id);
    let mut options = MqttOptions::new(&client_id, &endpoint.host, endpoint.port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_credentials(credentials.business_id.clone(), credentials.token.clone());

    let (client, mut eventloop) = AsyncClient::new(options, 10);
    let topic = push_topic(&credentials.business_id);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = client.disconnect().await;
                break;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("push gateway connected as {client_id}");
                    if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
                        warn!("push subscription failed: {e}");
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) if publish.topic == topic => {
                    handle_delivery(&publish.payload, &tracker, surface.clone(), &dashboard_url);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("push gateway transport error: {e}");
                    // the event loop reconnects on the next poll
                    tokio::time::sleep(ERROR_PAUSE).await;
                }
            }
        }
    }
}

/// received → decode → display. The tracker extends the gateway's lifetime
/// until the display call and any click routing resolve.
fn handle_delivery(
    payload: &[u8],
    tracker: &TaskTracker,
    surface: Arc<dyn ClientSurface>,
    dashboard_url: &str,
) {
    let Some(push) = decode_delivery(payload) else {
        return;
    };
    let note = build_note(push);
    let dashboard_url = dashboard_url.to_string();
    tracker.spawn(async move {
        let shown =
            tokio::task::spawn_blocking(move || display_and_route(note, surface, &dashboard_url))
                .await;
        match shown {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("notification display failed: {e}"),
            Err(e) => warn!("notification task failed: {e}"),
        }
    });
}

/// Blocking: shows the notification and waits for the user's click, then
/// routes it. Runs on the blocking pool, tracked until it settles.
#[cfg(all(unix, not(target_os = "macos")))]
fn display_and_route(
    note: OsNote,
    surface: Arc<dyn ClientSurface>,
    dashboard_url: &str,
) -> anyhow::Result<()> {
    let handle = notify_rust::Notification::new()
        .appname("Vigie")
        .summary(&note.title)
        .body(&note.body)
        .icon(&note.icon)
        .hint(notify_rust::Hint::ImagePath(note.badge.clone()))
        .action("default", "Open")
        .show()?;

    let target = note.url;
    handle.wait_for_action(|action| {
        // clicking the toast dismisses it and fires the default action
        if action == "default" {
            route_click(surface.as_ref(), &target, dashboard_url);
        }
    });
    Ok(())
}

/// Click actions are not supported on this platform; display only.
#[cfg(not(all(unix, not(target_os = "macos"))))]
fn display_and_route(
    note: OsNote,
    _surface: Arc<dyn ClientSurface>,
    _dashboard_url: &str,
) -> anyhow::Result<()> {
    notify_rust::Notification::new()
        .appname("Vigie")
        .summary(&note.title)
        .body(&note.body)
        .icon(&note.icon)
        .show()?;
    Ok(())
}
