/*!
Stub de flux server-sent events local

Sert une liste scriptée de frames `data:` sur un port éphémère puis ferme le
flux, ce qui permet de tester le ticker sans serveur réel (y compris les
frames volontairement malformées).
*/

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::Router;
use futures::stream;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Clone)]
struct StubState {
    frames: Vec<String>,
}

pub struct StreamStub {
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl StreamStub {
    /// Démarre le stub; chaque frame devient un event `data:` du flux.
    pub async fn spawn(frames: Vec<String>) -> anyhow::Result<Self> {
        let state = StubState { frames };
        let app = Router::new()
            .route("/events", get(serve_events))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("stream stub server error: {e}");
            }
        });

        Ok(Self { addr, server })
    }

    /// URL du flux à passer au consommateur testé
    pub fn url(&self) -> String {
        format!("http://{}/events", self.addr)
    }
}

impl Drop for StreamStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve_events(
    State(state): State<StubState>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let frames = state.frames.clone();
    Sse::new(stream::iter(
        frames
            .into_iter()
            .map(|frame| Ok(Event::default().data(frame))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_binds_ephemeral_port() {
        env_logger::try_init().ok();
        let stub = StreamStub::spawn(vec!["{}".to_string()]).await.unwrap();
        assert!(stub.url().starts_with("http://127.0.0.1:"));
        assert!(stub.url().ends_with("/events"));
    }
}
