//! Skips wiremock-backed tests where localhost sockets cannot be bound.

use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

const REQUIRE_VAR: &str = "TEST_CONTENT_REQUIRE_SOCKET_TESTS";

/// Starts a mock server, or returns `None` (after logging why) when the
/// environment forbids binding localhost. Panics instead when
/// `TEST_CONTENT_REQUIRE_SOCKET_TESTS` is truthy.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let bindable = TcpListener::bind("127.0.0.1:0").is_ok();
    let location = Location::caller();
    async move {
        if bindable {
            return Some(MockServer::start().await);
        }
        let message = format!(
            "[socket-bound-test] no localhost socket for mock service at {}:{}",
            location.file(),
            location.line()
        );
        let required = std::env::var(REQUIRE_VAR)
            .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
        assert!(!required, "{message}. Unset {REQUIRE_VAR} to skip instead.");
        eprintln!("{message}. Skipping; set {REQUIRE_VAR}=1 to fail instead.");
        None
    }
}
