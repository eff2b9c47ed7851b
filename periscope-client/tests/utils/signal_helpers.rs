use std::time::Duration;

use anyhow::{Context, Result};
use periscope_client::peer::PeerEvent;
use periscope_client::signaling::SignalingEvent;
use periscope_core::PeerConfig;
use tokio::sync::mpsc;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Short intervals so tests finish quickly.
pub fn test_config() -> PeerConfig {
    PeerConfig {
        resend_interval: Duration::from_millis(200),
        poll_interval: Duration::from_millis(50),
        session_retry_interval: Duration::from_millis(50),
        backoff_min: Duration::from_millis(100),
        backoff_max: Duration::from_millis(2000),
        backoff_jitter: true,
        ice_servers: Vec::new(),
    }
}

pub async fn recv_peer_event(
    events: &mut mpsc::UnboundedReceiver<PeerEvent>,
) -> Result<PeerEvent> {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .context("timed out waiting for a peer event")?
        .context("peer event channel closed")
}

/// Skip other events until a `SendOffer` arrives; return its SDP.
pub async fn wait_for_offer(events: &mut mpsc::UnboundedReceiver<PeerEvent>) -> Result<String> {
    loop {
        if let PeerEvent::SendOffer { sdp, .. } = recv_peer_event(events).await? {
            return Ok(sdp);
        }
    }
}

/// Skip other events until a `SendAnswer` arrives; return its SDP.
pub async fn wait_for_answer(events: &mut mpsc::UnboundedReceiver<PeerEvent>) -> Result<String> {
    loop {
        if let PeerEvent::SendAnswer { sdp, .. } = recv_peer_event(events).await? {
            return Ok(sdp);
        }
    }
}

pub async fn wait_for_negotiated(events: &mut mpsc::UnboundedReceiver<PeerEvent>) -> Result<()> {
    loop {
        if let PeerEvent::Negotiated { .. } = recv_peer_event(events).await? {
            return Ok(());
        }
    }
}

pub async fn recv_signaling_event(
    events: &mut mpsc::UnboundedReceiver<SignalingEvent>,
) -> Result<SignalingEvent> {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .context("timed out waiting for a signaling event")?
        .context("signaling event channel closed")
}
