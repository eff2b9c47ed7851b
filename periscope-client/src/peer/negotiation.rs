use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use periscope_core::{
    ConnectionId, IceCandidate, PeerConfig, SdpType, SessionDescription, SignalingState,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::peer::{PeerEvent, SessionEvent, TransportSession};

/// Flags of the perfect-negotiation state machine. The signaling state
/// itself lives in the transport-session; these flags track what this side
/// is currently doing with it.
#[derive(Debug, Default, Clone)]
pub struct NegotiationState {
    /// True only between starting local-offer creation and its completion.
    pub making_offer: bool,
    /// An offer went out and no remote description has arrived since.
    pub waiting_answer: bool,
    /// The last inbound offer was discarded due to glare.
    pub ignore_offer: bool,
    /// A remote answer is being applied right now.
    pub srd_answer_pending: bool,
}

/// One negotiation endpoint per remote connection.
///
/// Owns the transport-session for its lifetime and decides, for every
/// inbound description, whether to apply it, answer it, or discard it.
/// Collisions are resolved by the relay-assigned politeness role: the
/// impolite side never yields to a colliding offer, the polite side rolls
/// its own pending offer back and accepts.
pub struct NegotiationPeer {
    connection_id: ConnectionId,
    polite: bool,
    session: Arc<dyn TransportSession>,
    state: Mutex<NegotiationState>,
    events: mpsc::UnboundedSender<PeerEvent>,
    closed: AtomicBool,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl NegotiationPeer {
    /// Build the peer and start its session-event and offer-resend loops.
    pub fn spawn(
        connection_id: ConnectionId,
        polite: bool,
        session: Arc<dyn TransportSession>,
        config: &PeerConfig,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Arc<Self> {
        let peer = Arc::new(Self {
            connection_id,
            polite,
            session,
            state: Mutex::new(NegotiationState::default()),
            events,
            closed: AtomicBool::new(false),
            tasks: std::sync::Mutex::new(Vec::new()),
        });

        // Subscribe before handing off to the task so events emitted right
        // after construction are not lost.
        let session_events = peer.session.subscribe();
        let session_loop = tokio::spawn(Self::session_loop(peer.clone(), session_events));
        let resend_loop = tokio::spawn(Self::resend_loop(peer.clone(), config.resend_interval));
        peer.tasks
            .lock()
            .unwrap()
            .extend([session_loop, resend_loop]);
        peer
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn polite(&self) -> bool {
        self.polite
    }

    pub fn session(&self) -> &Arc<dyn TransportSession> {
        &self.session
    }

    pub async fn snapshot(&self) -> NegotiationState {
        self.state.lock().await.clone()
    }

    fn is_current(&self, connection_id: &ConnectionId) -> bool {
        !self.closed.load(Ordering::SeqCst) && connection_id == &self.connection_id
    }

    fn emit(&self, event: PeerEvent) {
        if self.events.send(event).is_err() {
            debug!("peer {}: event receiver is gone", self.connection_id);
        }
    }

    async fn session_loop(peer: Arc<Self>, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::NegotiationNeeded => {
                    // An aborted attempt must not take down the peer; the
                    // connection stays open for a later renegotiation.
                    if let Err(e) = peer.renegotiate().await {
                        error!(
                            "peer {}: negotiation attempt aborted: {}",
                            peer.connection_id, e
                        );
                    }
                }
                SessionEvent::Candidate(candidate) => peer.emit(PeerEvent::SendCandidate {
                    connection_id: peer.connection_id.clone(),
                    candidate,
                }),
                SessionEvent::Track(track) => peer.emit(PeerEvent::Track {
                    connection_id: peer.connection_id.clone(),
                    track,
                }),
                SessionEvent::DataChannel(channel) => peer.emit(PeerEvent::DataChannel {
                    connection_id: peer.connection_id.clone(),
                    channel,
                }),
                SessionEvent::ConnectionStateChanged(state) => {
                    debug!("peer {}: connection state {:?}", peer.connection_id, state);
                    if state.is_terminal() {
                        peer.emit(PeerEvent::Disconnected {
                            connection_id: peer.connection_id.clone(),
                        });
                    }
                }
            }
        }
    }

    /// Re-send an unanswered offer every interval until any remote
    /// description arrives. The relay is best-effort; a lost offer frame
    /// would otherwise wedge the negotiation forever.
    async fn resend_loop(peer: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if peer.closed.load(Ordering::SeqCst) {
                break;
            }
            if !peer.state.lock().await.waiting_answer {
                continue;
            }
            match peer.session.local_description().await {
                Some(description) if description.kind == SdpType::Offer => {
                    debug!(
                        "peer {}: answer still pending, re-sending offer",
                        peer.connection_id
                    );
                    peer.emit(PeerEvent::SendOffer {
                        connection_id: peer.connection_id.clone(),
                        sdp: description.sdp,
                    });
                }
                _ => {}
            }
        }
    }

    /// Renegotiation trigger: create and send a local offer. Fired by the
    /// transport-session whenever a track or channel is added while no
    /// negotiation is in flight.
    pub async fn renegotiate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let signaling = self.session.signaling_state().await;
        if signaling != SignalingState::Stable || state.making_offer {
            return Err(Error::InvariantViolated(format!(
                "renegotiation requested in {:?} (making_offer={})",
                signaling, state.making_offer
            )));
        }

        state.making_offer = true;
        let sent = self.make_offer(&mut state).await;
        state.making_offer = false;
        sent
    }

    async fn make_offer(&self, state: &mut NegotiationState) -> Result<()> {
        let offer = self.session.create_offer().await?;
        self.session.apply_local_description(&offer).await?;

        let signaling = self.session.signaling_state().await;
        if offer.kind != SdpType::Offer || signaling != SignalingState::HaveLocalOffer {
            return Err(Error::InvariantViolated(format!(
                "local offer application ended in {:?} with a {} description",
                signaling, offer.kind
            )));
        }

        state.waiting_answer = true;
        info!("peer {}: sending offer", self.connection_id);
        self.emit(PeerEvent::SendOffer {
            connection_id: self.connection_id.clone(),
            sdp: offer.sdp,
        });
        Ok(())
    }

    /// Deliver a remote session description.
    ///
    /// Descriptions for a different connection id are dropped silently.
    /// A colliding offer is discarded on the impolite side; the polite side
    /// implicitly rolls back its own pending offer when applying it.
    pub async fn on_got_description(
        &self,
        connection_id: &ConnectionId,
        description: &SessionDescription,
    ) -> Result<()> {
        if !self.is_current(connection_id) {
            debug!(
                "peer {}: dropping description for {}",
                self.connection_id, connection_id
            );
            return Ok(());
        }

        let mut state = self.state.lock().await;
        let signaling = self.session.signaling_state().await;
        let is_stable = signaling == SignalingState::Stable
            || (signaling == SignalingState::HaveLocalOffer && state.srd_answer_pending);

        state.ignore_offer = description.kind == SdpType::Offer
            && !self.polite
            && (state.making_offer || !is_stable);
        if state.ignore_offer {
            info!(
                "peer {}: glare, discarding colliding offer",
                self.connection_id
            );
            return Ok(());
        }

        state.waiting_answer = false;
        state.srd_answer_pending = description.kind == SdpType::Answer;
        self.session.apply_remote_description(description).await?;
        state.srd_answer_pending = false;

        match description.kind {
            SdpType::Offer => {
                let signaling = self.session.signaling_state().await;
                if signaling != SignalingState::HaveRemoteOffer {
                    return Err(Error::InvariantViolated(format!(
                        "remote offer application ended in {:?}",
                        signaling
                    )));
                }

                let answer = self.session.create_answer().await?;
                self.session.apply_local_description(&answer).await?;

                let signaling = self.session.signaling_state().await;
                if answer.kind != SdpType::Answer || signaling != SignalingState::Stable {
                    return Err(Error::InvariantViolated(format!(
                        "local answer application ended in {:?} with a {} description",
                        signaling, answer.kind
                    )));
                }

                info!("peer {}: sending answer", self.connection_id);
                self.emit(PeerEvent::SendAnswer {
                    connection_id: self.connection_id.clone(),
                    sdp: answer.sdp,
                });
            }
            SdpType::Answer => {
                let signaling = self.session.signaling_state().await;
                if signaling != SignalingState::Stable {
                    return Err(Error::InvariantViolated(format!(
                        "answer application ended in {:?}",
                        signaling
                    )));
                }
                debug!("peer {}: negotiation complete", self.connection_id);
                self.emit(PeerEvent::Negotiated {
                    connection_id: self.connection_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Deliver a remote ICE candidate. Failures while adding are swallowed;
    /// they are only worth a warning when no offer was deliberately ignored
    /// (an ignored offer routinely produces unusable candidates).
    pub async fn on_got_candidate(
        &self,
        connection_id: &ConnectionId,
        candidate: &IceCandidate,
    ) -> Result<()> {
        if !self.is_current(connection_id) {
            return Ok(());
        }
        if let Err(e) = self.session.add_candidate(candidate).await {
            if !self.state.lock().await.ignore_offer {
                warn!(
                    "peer {}: failed to add remote candidate: {}",
                    self.connection_id, e
                );
            }
        }
        Ok(())
    }

    /// Release the transport-session and stop both loops. Safe to call
    /// twice; a closed peer no longer processes inbound messages.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        if let Err(e) = self.session.close().await {
            warn!("peer {}: session close failed: {}", self.connection_id, e);
        }
        info!("peer {} closed", self.connection_id);
    }
}
