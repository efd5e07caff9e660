//! Loopback listeners and mock servers for socket-bound tests.
//!
//! Sandboxes that forbid binding 127.0.0.1 skip these tests instead of
//! failing them, unless `IMAGE_FETCHER_REQUIRE_SOCKET_TESTS` is set.

use tokio::net::TcpListener;
use wiremock::MockServer;

const STRICT_ENV: &str = "IMAGE_FETCHER_REQUIRE_SOCKET_TESTS";

fn strict() -> bool {
    matches!(
        std::env::var(STRICT_ENV).as_deref().map(str::trim),
        Ok("1" | "true" | "yes")
    )
}

/// Binds an ephemeral loopback port, or returns `None` when the sandbox
/// does not allow it.
pub(crate) async fn try_listener() -> Option<TcpListener> {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => Some(listener),
        Err(error) => {
            assert!(!strict(), "loopback bind failed ({error}) with {STRICT_ENV} set");
            eprintln!("loopback bind failed ({error}); skipping socket-bound test");
            None
        }
    }
}

/// Starts a wiremock server, or returns `None` when loopback is unavailable.
pub(crate) async fn try_mock_server() -> Option<MockServer> {
    drop(try_listener().await?);
    Some(MockServer::start().await)
}
