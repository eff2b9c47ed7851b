use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use periscope_client::error::{Error, Result};
use periscope_client::peer::{SessionEvent, TransportSession};
use periscope_core::{
    ChannelInfo, IceCandidate, MediaKind, PeerConnectionState, SdpType, SessionDescription,
    SignalingState, TrackInfo,
};
use tokio::sync::mpsc;

/// In-memory transport-session with real signaling-state bookkeeping.
///
/// Applying a remote offer from `HaveLocalOffer` implicitly rolls the local
/// offer back, mirroring what a browser/webrtc engine does for the polite
/// side of a collision.
pub struct MockTransportSession {
    label: String,
    state: Mutex<SignalingState>,
    local: Mutex<Option<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidate>>,
    tracks: Mutex<Vec<TrackInfo>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
    offer_seq: AtomicU32,
    /// Make the next `apply_remote_description` fail.
    pub fail_remote: AtomicBool,
    /// Make every `add_candidate` fail.
    pub fail_candidates: AtomicBool,
    closed: AtomicBool,
}

impl MockTransportSession {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            state: Mutex::new(SignalingState::Stable),
            local: Mutex::new(None),
            candidates: Mutex::new(Vec::new()),
            tracks: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            offer_seq: AtomicU32::new(0),
            fail_remote: AtomicBool::new(false),
            fail_candidates: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn emit(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn trigger_negotiation_needed(&self) {
        self.emit(SessionEvent::NegotiationNeeded);
    }

    pub fn emit_connection_state(&self, state: PeerConnectionState) {
        self.emit(SessionEvent::ConnectionStateChanged(state));
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.lock().unwrap().len()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportSession for MockTransportSession {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let seq = self.offer_seq.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionDescription::offer(format!(
            "v=0 mock-offer {} #{}",
            self.label, seq
        )))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let state = *self.state.lock().unwrap();
        if state != SignalingState::HaveRemoteOffer {
            return Err(Error::Session(format!(
                "create_answer called in {state:?}"
            )));
        }
        Ok(SessionDescription::answer(format!(
            "v=0 mock-answer {}",
            self.label
        )))
    }

    async fn apply_local_description(&self, description: &SessionDescription) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let next = match (description.kind, *state) {
            (SdpType::Offer, SignalingState::Stable) => SignalingState::HaveLocalOffer,
            (SdpType::Answer, SignalingState::HaveRemoteOffer) => SignalingState::Stable,
            (kind, current) => {
                return Err(Error::Session(format!(
                    "cannot apply local {kind} in {current:?}"
                )));
            }
        };
        *state = next;
        *self.local.lock().unwrap() = Some(description.clone());
        Ok(())
    }

    async fn apply_remote_description(&self, description: &SessionDescription) -> Result<()> {
        if self.fail_remote.load(Ordering::SeqCst) {
            return Err(Error::Session("induced remote description failure".into()));
        }
        let mut state = self.state.lock().unwrap();
        let next = match (description.kind, *state) {
            // Remote offer over a pending local offer rolls the local one back.
            (SdpType::Offer, SignalingState::Stable)
            | (SdpType::Offer, SignalingState::HaveLocalOffer) => SignalingState::HaveRemoteOffer,
            (SdpType::Answer, SignalingState::HaveLocalOffer) => SignalingState::Stable,
            (kind, current) => {
                return Err(Error::Session(format!(
                    "cannot apply remote {kind} in {current:?}"
                )));
            }
        };
        *state = next;
        Ok(())
    }

    async fn add_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        if self.fail_candidates.load(Ordering::SeqCst) {
            return Err(Error::Session("induced candidate failure".into()));
        }
        self.candidates.lock().unwrap().push(candidate.clone());
        Ok(())
    }

    async fn signaling_state(&self) -> SignalingState {
        *self.state.lock().unwrap()
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    async fn add_track(&self, track: TrackInfo) -> Result<()> {
        self.tracks.lock().unwrap().push(track);
        self.trigger_negotiation_needed();
        Ok(())
    }

    async fn add_transceiver(&self, _kind: MediaKind) -> Result<()> {
        self.trigger_negotiation_needed();
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<()> {
        self.emit(SessionEvent::DataChannel(ChannelInfo {
            label: label.to_string(),
        }));
        self.trigger_negotiation_needed();
        Ok(())
    }

    async fn stats(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "label": self.label,
            "candidates": self.candidate_count(),
            "tracks": self.track_count(),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}
