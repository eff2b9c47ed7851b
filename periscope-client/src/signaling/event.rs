use std::sync::Mutex;
use std::time::Duration;

use periscope_core::{ConnectionId, IceCandidate, SignalMessage};
use tokio::sync::mpsc;

/// Local event surface shared by both relay transports: the four wire event
/// kinds plus the push transport's informational reconnect notice.
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    Connected {
        connection_id: ConnectionId,
        polite: bool,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
    Offer {
        connection_id: ConnectionId,
        sdp: String,
    },
    Answer {
        connection_id: ConnectionId,
        sdp: String,
    },
    Candidate {
        connection_id: ConnectionId,
        candidate: IceCandidate,
    },
    Reconnecting {
        delay: Duration,
    },
}

impl SignalingEvent {
    pub fn from_wire(message: SignalMessage) -> Self {
        match message {
            SignalMessage::Connect {
                connection_id,
                polite,
            } => Self::Connected {
                connection_id,
                polite,
            },
            SignalMessage::Disconnect { connection_id } => Self::Disconnected { connection_id },
            SignalMessage::Offer {
                connection_id, sdp, ..
            } => Self::Offer { connection_id, sdp },
            SignalMessage::Answer {
                connection_id, sdp, ..
            } => Self::Answer { connection_id, sdp },
            SignalMessage::Candidate {
                connection_id,
                candidate,
                sdp_mid,
                sdp_m_line_index,
            } => Self::Candidate {
                connection_id,
                candidate: IceCandidate {
                    candidate,
                    sdp_mid,
                    sdp_m_line_index,
                },
            },
        }
    }
}

/// Fan-out of signaling events to any number of subscribers. Subscribers
/// whose receiver is gone are dropped on the next publish.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SignalingEvent>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SignalingEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn publish(&self, event: SignalingEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
