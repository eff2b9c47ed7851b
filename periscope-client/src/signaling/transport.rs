use async_trait::async_trait;
use periscope_core::{ConnectionId, IceCandidate};
use tokio::sync::mpsc;

use super::SignalingEvent;
use crate::error::Result;

/// Uniform surface over the relay. Implemented by [`super::PollingTransport`]
/// (store-and-forward over HTTP) and [`super::PushTransport`] (persistent
/// socket); the negotiation layer depends only on this trait.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    async fn create_connection(&self, connection_id: &ConnectionId) -> Result<()>;

    async fn delete_connection(&self, connection_id: &ConnectionId) -> Result<()>;

    async fn send_offer(&self, connection_id: &ConnectionId, sdp: &str) -> Result<()>;

    async fn send_answer(&self, connection_id: &ConnectionId, sdp: &str) -> Result<()>;

    async fn send_candidate(
        &self,
        connection_id: &ConnectionId,
        candidate: &IceCandidate,
    ) -> Result<()>;

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SignalingEvent>;
}
