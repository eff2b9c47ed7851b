pub mod error;
pub mod orchestrator;
pub mod peer;
pub mod retry;
pub mod signaling;

pub use error::{Error, Result};
pub use orchestrator::{NoopCallbacks, SessionCallbacks, SessionFactory, SessionOrchestrator};
pub use peer::{NegotiationPeer, PeerEvent, SessionEvent, TransportSession};
pub use retry::Backoff;
pub use signaling::{PollingTransport, PushTransport, SignalingEvent, SignalingTransport};
