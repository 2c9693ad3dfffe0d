//! Skipping of tests that need a localhost socket.
//!
//! Sandboxed runners may forbid binding sockets. Mock-server tests then skip
//! with a note on stderr, unless `PUBFETCH_REQUIRE_SOCKET_TESTS` asks for a
//! hard failure.

use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

const REQUIRE_SOCKET_TESTS: &str = "PUBFETCH_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_SOCKET_TESTS)
        .is_ok_and(|value| matches!(value.trim(), "1" | "true" | "yes"))
}

/// Returns true when the calling test cannot bind `127.0.0.1` and should
/// return early.
#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    let Err(error) = TcpListener::bind("127.0.0.1:0") else {
        return false;
    };

    let caller = Location::caller();
    if sockets_required() {
        panic!(
            "{}:{}: localhost is not bindable ({error}) and {REQUIRE_SOCKET_TESTS} is set",
            caller.file(),
            caller.line()
        );
    }
    eprintln!(
        "skipping HTTP test at {}:{}: localhost is not bindable ({error})",
        caller.file(),
        caller.line()
    );
    true
}

/// Starts a mock HTTP server, or returns `None` when sockets are unavailable.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let skip = should_skip_socket_bound_test();
    async move {
        if skip {
            None
        } else {
            Some(MockServer::start().await)
        }
    }
}

/// Returns a localhost URL nobody listens on.
pub fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/book.epub")
}
