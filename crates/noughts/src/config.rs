//! Client configuration.

use std::time::Duration;

/// Settings for a [`GameController`](crate::GameController).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Room server address, e.g. `ws://127.0.0.1:8080`.
    pub url: String,
    /// How many server events the controller's queue holds. Events past
    /// that wait in the link task until the controller catches up.
    pub event_buffer: usize,
    /// How long to wait for an answer to a request such as a room code.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// A config for the server at `url`, other settings default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the inbound event queue length.
    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size.max(1);
        self
    }

    /// Sets the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080".to_string(),
            event_buffer: 64,
            request_timeout: Duration::from_secs(5),
        }
    }
}
