mod candidate;
mod config;
mod connection;
mod description;
mod media;
mod session;
mod signaling;

pub use candidate::IceCandidate;
pub use config::{IceServerConfig, PeerConfig};
pub use connection::ConnectionId;
pub use description::{SdpType, SessionDescription, SignalingState};
pub use media::{ChannelInfo, MediaKind, PeerConnectionState, TrackInfo};
pub use session::SessionId;
pub use signaling::{
    CandidateRequest, ConnectionRequest, CreateConnectionResponse, CreateSessionResponse,
    DescriptionRequest, MessagesResponse, SignalMessage,
};
