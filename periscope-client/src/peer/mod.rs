mod negotiation;
mod peer_event;
mod session;

pub use negotiation::{NegotiationPeer, NegotiationState};
pub use peer_event::PeerEvent;
pub use session::{SessionEvent, TransportSession};
