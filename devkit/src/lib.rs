/*!
Vigie Devkit - outillage de développement et de test

Permet de développer et tester les consommateurs Vigie sans infrastructure réelle:
- Builders de messages conformes aux contrats Vigie
- Stub de flux server-sent events local pour le ticker
- Helpers d'attente pour les assertions asynchrones
*/

pub mod builders;
pub mod stream_stub;

pub use builders::VigieMessageBuilder;
pub use stream_stub::StreamStub;

use std::time::Duration;

/// Attend (polling 50ms) que le prédicat devienne vrai, au plus timeout_ms.
pub async fn wait_until<F>(predicate: F, timeout_ms: u64) -> bool
where
    F: Fn() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    predicate()
}
