//! Shared utilities for integration testing.

use std::sync::Arc;

use hearth::config::ServerConfig;
use hearth::exception::Failure;
use hearth::http::RequestContext;
use hearth::server::{Dispatcher, Handler, Server};

/// A config bound to loopback on an ephemeral port.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.host = "127.0.0.1".to_string();
    config.listener.port = 0;
    config
}

/// A dispatcher that never matches, so every request falls through to the
/// static stages.
pub fn miss_dispatcher() -> Arc<dyn Dispatcher> {
    Arc::new(|_ctx: &mut RequestContext| -> Result<bool, Box<dyn Failure>> { Ok(false) })
}

#[allow(dead_code)]
pub fn noop_upgrade() -> Arc<dyn Handler> {
    Arc::new(|_ctx: &mut RequestContext| {})
}

/// Start the server and return its base URL.
#[allow(dead_code)]
pub async fn start(server: &mut Server, dispatcher: Arc<dyn Dispatcher>) -> String {
    server
        .start(dispatcher, Arc::new(|_ctx: &mut RequestContext| {}))
        .await
        .unwrap();
    format!("http://127.0.0.1:{}", server.port().unwrap())
}
