use async_trait::async_trait;
use periscope_core::{
    ChannelInfo, IceCandidate, MediaKind, PeerConnectionState, SessionDescription, SignalingState,
    TrackInfo,
};
use tokio::sync::mpsc;

use crate::error::Result;

/// Signals surfaced by the underlying transport-session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A track/channel was added and no negotiation is in flight.
    NegotiationNeeded,
    /// A local candidate was gathered and must be relayed to the remote side.
    Candidate(IceCandidate),
    /// A remote media track arrived.
    Track(TrackInfo),
    /// A remote data channel arrived.
    DataChannel(ChannelInfo),
    ConnectionStateChanged(PeerConnectionState),
}

/// Трейт, который должна реализовать внешняя медиа-подсистема
/// (создание и применение SDP, сбор ICE кандидатов), чтобы пир мог
/// вести переговоры. Её signaling state — единственный источник истины.
#[async_trait]
pub trait TransportSession: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn apply_local_description(&self, description: &SessionDescription) -> Result<()>;

    async fn apply_remote_description(&self, description: &SessionDescription) -> Result<()>;

    async fn add_candidate(&self, candidate: &IceCandidate) -> Result<()>;

    async fn signaling_state(&self) -> SignalingState;

    async fn local_description(&self) -> Option<SessionDescription>;

    async fn add_track(&self, track: TrackInfo) -> Result<()>;

    async fn add_transceiver(&self, kind: MediaKind) -> Result<()>;

    async fn create_data_channel(&self, label: &str) -> Result<()>;

    async fn stats(&self) -> Result<serde_json::Value>;

    async fn close(&self) -> Result<()>;

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent>;
}
