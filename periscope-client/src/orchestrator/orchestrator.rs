use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use periscope_core::{ConnectionId, MediaKind, PeerConfig, SessionDescription, TrackInfo};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::orchestrator::SessionCallbacks;
use crate::peer::{NegotiationPeer, PeerEvent, TransportSession};
use crate::signaling::{SignalingEvent, SignalingTransport};

/// Factory producing one transport-session per connection, injected so
/// tests and hosts can choose the media engine.
pub type SessionFactory =
    Arc<dyn Fn(&ConnectionId, &PeerConfig) -> Arc<dyn TransportSession> + Send + Sync>;

/// Owns the shared signaling transport and all negotiation peers, routes
/// relay events to the peer of the matching connection id, and exposes the
/// public session lifecycle.
pub struct SessionOrchestrator {
    inner: Arc<Inner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct Inner {
    transport: Arc<dyn SignalingTransport>,
    callbacks: Arc<dyn SessionCallbacks>,
    session_factory: SessionFactory,
    config: PeerConfig,
    peers: DashMap<ConnectionId, Arc<NegotiationPeer>>,
    /// The most recently created local connection; delegation targets it.
    current: Mutex<Option<ConnectionId>>,
}

impl SessionOrchestrator {
    pub fn new(
        transport: Arc<dyn SignalingTransport>,
        callbacks: Arc<dyn SessionCallbacks>,
        session_factory: SessionFactory,
        config: PeerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                callbacks,
                session_factory,
                config,
                peers: DashMap::new(),
                current: Mutex::new(None),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub async fn start(&self) -> Result<()> {
        self.inner.transport.start().await?;
        let events = self.inner.transport.subscribe();
        let inner = self.inner.clone();
        let task = tokio::spawn(Inner::event_loop(inner, events));
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        let ids: Vec<ConnectionId> = self.inner.peers.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, peer)) = self.inner.peers.remove(&id) {
                peer.close().await;
            }
        }
        self.inner.current.lock().unwrap().take();
        self.inner.transport.stop().await
    }

    /// Ask the relay for a connection slot. The peer itself is built when
    /// the `connect` event comes back carrying the assigned role.
    pub async fn create_connection(
        &self,
        connection_id: Option<ConnectionId>,
    ) -> Result<ConnectionId> {
        let connection_id = connection_id.unwrap_or_else(ConnectionId::generate);
        self.inner.transport.create_connection(&connection_id).await?;
        // Only a connection the relay accepted becomes the delegation target.
        self.inner
            .current
            .lock()
            .unwrap()
            .replace(connection_id.clone());
        Ok(connection_id)
    }

    pub async fn delete_connection(&self) -> Result<()> {
        let current = self.inner.current.lock().unwrap().take();
        let Some(connection_id) = current else {
            return Ok(());
        };
        if let Some((_, peer)) = self.inner.peers.remove(&connection_id) {
            peer.close().await;
        }
        self.inner.transport.delete_connection(&connection_id).await
    }

    /// Add a media track to the current connection's session. `None` when
    /// no peer exists yet.
    pub async fn add_track(&self, track: TrackInfo) -> Option<Result<()>> {
        let peer = self.current_peer()?;
        Some(peer.session().add_track(track).await)
    }

    pub async fn add_transceiver(&self, kind: MediaKind) -> Option<Result<()>> {
        let peer = self.current_peer()?;
        Some(peer.session().add_transceiver(kind).await)
    }

    pub async fn create_data_channel(&self, label: &str) -> Option<Result<()>> {
        let peer = self.current_peer()?;
        Some(peer.session().create_data_channel(label).await)
    }

    pub async fn get_stats(&self) -> Option<Result<serde_json::Value>> {
        let peer = self.current_peer()?;
        Some(peer.session().stats().await)
    }

    pub fn peer(&self, connection_id: &ConnectionId) -> Option<Arc<NegotiationPeer>> {
        self.inner.peer(connection_id)
    }

    fn current_peer(&self) -> Option<Arc<NegotiationPeer>> {
        let connection_id = self.inner.current.lock().unwrap().clone()?;
        self.inner.peer(&connection_id)
    }
}

impl Inner {
    fn peer(&self, connection_id: &ConnectionId) -> Option<Arc<NegotiationPeer>> {
        self.peers.get(connection_id).map(|entry| entry.value().clone())
    }

    async fn event_loop(
        inner: Arc<Inner>,
        mut events: mpsc::UnboundedReceiver<SignalingEvent>,
    ) {
        info!("orchestrator event loop started");
        while let Some(event) = events.recv().await {
            match event {
                SignalingEvent::Connected {
                    connection_id,
                    polite,
                } => Inner::handle_connected(&inner, connection_id, polite).await,

                SignalingEvent::Disconnected { connection_id } => {
                    Inner::drop_peer(&inner, &connection_id).await;
                }

                SignalingEvent::Offer { connection_id, sdp } => {
                    let handled = Inner::deliver_description(
                        &inner,
                        &connection_id,
                        SessionDescription::offer(sdp.clone()),
                    )
                    .await;
                    if handled {
                        inner.callbacks.on_got_offer(&connection_id, &sdp).await;
                    }
                }

                SignalingEvent::Answer { connection_id, sdp } => {
                    let handled = Inner::deliver_description(
                        &inner,
                        &connection_id,
                        SessionDescription::answer(sdp.clone()),
                    )
                    .await;
                    if handled {
                        inner.callbacks.on_got_answer(&connection_id, &sdp).await;
                    }
                }

                SignalingEvent::Candidate {
                    connection_id,
                    candidate,
                } => {
                    let Some(peer) = inner.peer(&connection_id) else {
                        debug!("candidate for unknown connection {}", connection_id);
                        continue;
                    };
                    if let Err(e) = peer.on_got_candidate(&connection_id, &candidate).await {
                        warn!("candidate delivery failed for {}: {}", connection_id, e);
                    }
                }

                SignalingEvent::Reconnecting { delay } => {
                    info!("relay transport reconnecting in {:?}", delay);
                }
            }
        }
        info!("orchestrator event loop finished");
    }

    async fn handle_connected(inner: &Arc<Inner>, connection_id: ConnectionId, polite: bool) {
        if inner.peers.contains_key(&connection_id) {
            debug!("connect for already known connection {}", connection_id);
            return;
        }
        info!(
            "connection {} established (polite={})",
            connection_id, polite
        );

        let session = (inner.session_factory)(&connection_id, &inner.config);
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let peer = NegotiationPeer::spawn(
            connection_id.clone(),
            polite,
            session,
            &inner.config,
            peer_tx,
        );
        inner.peers.insert(connection_id.clone(), peer);

        let route_inner = inner.clone();
        tokio::spawn(Inner::peer_event_loop(route_inner, peer_rx));

        inner.callbacks.on_connect(&connection_id, polite).await;
    }

    /// Forward one peer's outbound events into the shared transport and the
    /// application callbacks. Ends when the peer is dropped.
    async fn peer_event_loop(inner: Arc<Inner>, mut events: mpsc::UnboundedReceiver<PeerEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                PeerEvent::SendOffer { connection_id, sdp } => {
                    if let Err(e) = inner.transport.send_offer(&connection_id, &sdp).await {
                        warn!("failed to send offer for {}: {}", connection_id, e);
                    }
                }
                PeerEvent::SendAnswer { connection_id, sdp } => {
                    if let Err(e) = inner.transport.send_answer(&connection_id, &sdp).await {
                        warn!("failed to send answer for {}: {}", connection_id, e);
                    }
                }
                PeerEvent::SendCandidate {
                    connection_id,
                    candidate,
                } => {
                    if let Err(e) = inner
                        .transport
                        .send_candidate(&connection_id, &candidate)
                        .await
                    {
                        warn!("failed to send candidate for {}: {}", connection_id, e);
                    }
                }
                PeerEvent::Negotiated { connection_id } => {
                    debug!("connection {} negotiated", connection_id);
                }
                PeerEvent::Track {
                    connection_id,
                    track,
                } => inner.callbacks.on_track(&connection_id, &track).await,
                PeerEvent::DataChannel {
                    connection_id,
                    channel,
                } => {
                    inner
                        .callbacks
                        .on_add_channel(&connection_id, &channel)
                        .await
                }
                PeerEvent::Disconnected { connection_id } => {
                    Inner::drop_peer(&inner, &connection_id).await;
                }
            }
        }
    }

    async fn deliver_description(
        inner: &Arc<Inner>,
        connection_id: &ConnectionId,
        description: SessionDescription,
    ) -> bool {
        let Some(peer) = inner.peer(connection_id) else {
            debug!("description for unknown connection {}", connection_id);
            return false;
        };
        if let Err(e) = peer.on_got_description(connection_id, &description).await {
            // The connection stays open for a future renegotiation.
            error!(
                "description application failed for {}: {}",
                connection_id, e
            );
        }
        true
    }

    async fn drop_peer(inner: &Arc<Inner>, connection_id: &ConnectionId) {
        let Some((_, peer)) = inner.peers.remove(connection_id) else {
            return;
        };
        peer.close().await;
        inner.callbacks.on_disconnect(connection_id).await;
    }
}
