//! Read-only announcement stream consumer
//!
//! Opens one authenticated server-sent-event stream and feeds the bounded
//! announcement ring. One malformed message is dropped and logged, never
//! fatal; a transport error closes the stream and it is up to the owner to
//! re-open explicitly. There is no hidden reconnect loop.

use crate::feed::{new_shared, AnnouncementFeed, Shared};
use crate::models::UpdateAnnouncement;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Liveness flags exposed to the presentation layer alongside the feed.
/// `loading` distinguishes "nothing arrived yet" from a genuinely empty
/// feed; it clears on the first received message or the first error and
/// stays cleared until a fresh `open`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerStatus {
    pub loading: bool,
    pub connected: bool,
}

pub struct StreamTicker {
    feed: Shared<AnnouncementFeed>,
    status: Shared<TickerStatus>,
    live: Option<TickerHandle>,
}

struct TickerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl StreamTicker {
    pub fn new() -> Self {
        Self {
            feed: new_shared(AnnouncementFeed::new()),
            status: new_shared(TickerStatus::default()),
            live: None,
        }
    }

    /// Opens the stream. A missing URL is a configuration error: logged,
    /// loading cleared immediately, zero network attempts.
    pub fn open(&mut self, stream_url: Option<&str>, token: Option<&str>) {
        if self.live.is_some() {
            self.close();
        }

        let Some(url) = stream_url.filter(|url| !url.trim().is_empty()) else {
            warn!("no stream url configured, announcement ticker unavailable");
            self.status.lock().loading = false;
            return;
        };

        {
            let mut status = self.status.lock();
            status.loading = true;
            status.connected = false;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_stream(
            url.to_string(),
            token.map(str::to_string),
            self.feed.clone(),
            self.status.clone(),
            cancel.clone(),
        ));
        self.live = Some(TickerHandle { cancel, task });
    }

    /// Idempotent; aborting the task drops the response body and closes the
    /// underlying connection.
    pub fn close(&mut self) {
        self.live = None;
    }

    pub fn is_open(&self) -> bool {
        self.live.is_some()
    }

    /// Recent announcements, newest first, at most [`crate::feed::FEED_CAPACITY`].
    pub fn announcements(&self) -> Vec<UpdateAnnouncement> {
        self.feed.lock().snapshot()
    }

    pub fn status(&self) -> TickerStatus {
        self.status.lock().clone()
    }
}

impl Default for StreamTicker {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_stream(
    url: String,
    token: Option<String>,
    feed: Shared<AnnouncementFeed>,
    status: Shared<TickerStatus>,
    cancel: CancellationToken,
) {
    let client = reqwest::Client::new();
    let mut request = client.get(&url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = tokio::select! {
        _ = cancel.cancelled() => return,
        response = request.send() => response,
    };
    let response = match response {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!("announcement stream rejected: {}", response.status());
            mark_closed(&status);
            return;
        }
        Err(e) => {
            warn!("announcement stream request failed: {e}");
            mark_closed(&status);
            return;
        }
    };

    info!("announcement stream connected: {url}");
    status.lock().connected = true;

    let mut body = response.bytes_stream();
    let mut parser = SseParser::default();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for data in parser.feed_chunk(&bytes) {
                        handle_frame(&data, &feed, &status);
                    }
                }
                Some(Err(e)) => {
                    warn!("announcement stream error: {e}");
                    break;
                }
                None => {
                    info!("announcement stream ended");
                    break;
                }
            }
        }
    }
    mark_closed(&status);
}

fn mark_closed(status: &Shared<TickerStatus>) {
    let mut status = status.lock();
    status.loading = false;
    status.connected = false;
}

/// One message clears the loading flag even when it turns out to be
/// malformed; a bad frame is dropped and logged and the stream stays open.
fn handle_frame(data: &str, feed: &Shared<AnnouncementFeed>, status: &Shared<TickerStatus>) {
    status.lock().loading = false;
    match serde_json::from_str::<UpdateAnnouncement>(data) {
        Ok(announcement) => feed.lock().push(announcement),
        Err(e) => warn!("dropping malformed announcement: {e}"),
    }
}

/// Minimal server-sent-event framing: `data:` lines accumulate until a
/// blank line completes the event. Comments and other fields are skipped.
#[derive(Debug, Default)]
struct SseParser {
    buffer: String,
    data: Vec<String>,
}

impl SseParser {
    /// Consumes a chunk and returns the data payload of every event frame
    /// the chunk completes.
    fn feed_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut completed = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=pos).collect();
            let line = raw.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if !self.data.is_empty() {
                    completed.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            }
            // event:/id:/retry: and ":" comments carry nothing for this consumer
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnnouncementKind;
    use vigie_devkit::builders::VigieMessageBuilder;
    use vigie_devkit::{wait_until, StreamStub};

    #[test]
    fn parser_reassembles_frames_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.feed_chunk(b"data: {\"a\"").is_empty());
        assert!(parser.feed_chunk(b":1}\n").is_empty());
        let frames = parser.feed_chunk(b"\n");
        assert_eq!(frames, vec![r#"{"a":1}"#.to_string()]);
    }

    #[test]
    fn parser_skips_comments_and_other_fields() {
        let mut parser = SseParser::default();
        let frames = parser.feed_chunk(b": keep-alive\nevent: update\ndata: one\n\ndata: two\n\n");
        assert_eq!(frames, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn malformed_frame_leaves_feed_untouched() {
        let feed = new_shared(AnnouncementFeed::new());
        let status = new_shared(TickerStatus {
            loading: true,
            connected: true,
        });

        handle_frame("this is not json", &feed, &status);
        assert!(feed.lock().is_empty());
        // a received message clears loading even when undecodable
        assert!(!status.lock().loading);

        let valid = VigieMessageBuilder::announcement("review", "New review").to_string();
        handle_frame(&valid, &feed, &status);
        assert_eq!(feed.lock().len(), 1);
    }

    #[tokio::test]
    async fn missing_url_fails_fast() {
        let mut ticker = StreamTicker::new();
        ticker.open(None, None);

        assert!(!ticker.is_open(), "no transport must be opened");
        assert!(!ticker.status().loading);

        ticker.open(Some("   "), None);
        assert!(!ticker.is_open());
        assert!(!ticker.status().loading);
    }

    #[tokio::test]
    async fn consumes_stub_stream_and_survives_bad_frame() {
        let stub = StreamStub::spawn(vec![
            VigieMessageBuilder::announcement("appointment", "New appointment").to_string(),
            "definitely not json".to_string(),
            VigieMessageBuilder::announcement("review", "New review").to_string(),
        ])
        .await
        .unwrap();

        let mut ticker = StreamTicker::new();
        ticker.open(Some(&stub.url()), Some("tok-123"));
        assert!(ticker.is_open());

        assert!(
            wait_until(|| ticker.announcements().len() == 2, 5000).await,
            "expected both valid announcements, got {:?}",
            ticker.announcements()
        );

        let entries = ticker.announcements();
        assert_eq!(entries[0].kind, AnnouncementKind::Review);
        assert_eq!(entries[1].kind, AnnouncementKind::Appointment);
        assert!(!ticker.status().loading);

        ticker.close();
        assert!(!ticker.is_open());
    }

    #[tokio::test]
    async fn loading_clears_once_the_stream_ends() {
        let stub = StreamStub::spawn(Vec::new()).await.unwrap();

        let mut ticker = StreamTicker::new();
        ticker.open(Some(&stub.url()), None);

        assert!(
            wait_until(|| !ticker.status().loading && !ticker.status().connected, 5000).await,
            "loading must clear when the stream terminates"
        );
        assert!(ticker.announcements().is_empty());
    }

    #[tokio::test]
    async fn unreachable_stream_clears_loading() {
        // bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let mut ticker = StreamTicker::new();
        ticker.open(Some(&format!("http://127.0.0.1:{port}/events")), None);

        assert!(
            wait_until(|| !ticker.status().loading, 5000).await,
            "first error must clear the loading flag"
        );
        assert!(!ticker.status().connected);
        // no self-reconnect: the consumer stays closed until re-opened
        assert!(ticker.announcements().is_empty());
    }
}
