use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Timing knobs shared by the transports and the negotiation peers.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// How often an unanswered offer is re-sent over the relay.
    pub resend_interval: Duration,
    /// Sleep between message fetches in polling mode.
    pub poll_interval: Duration,
    /// Sleep between session-create attempts in polling mode.
    pub session_retry_interval: Duration,
    /// Lower bound of the push-transport reconnect delay.
    pub backoff_min: Duration,
    /// Upper bound of the push-transport reconnect delay.
    pub backoff_max: Duration,
    /// Randomize reconnect delay growth.
    pub backoff_jitter: bool,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            resend_interval: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(5000),
            session_retry_interval: Duration::from_millis(5000),
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
            backoff_jitter: true,
            ice_servers: Vec::new(),
        }
    }
}
