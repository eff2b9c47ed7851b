mod event;
mod polling;
mod push;
mod transport;

pub use event::{EventBus, SignalingEvent};
pub use polling::{PollingTransport, SESSION_ID_HEADER};
pub use push::PushTransport;
pub use transport::SignalingTransport;
