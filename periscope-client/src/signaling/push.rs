use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use periscope_core::{ConnectionId, IceCandidate, PeerConfig, SignalMessage};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{EventBus, SignalingEvent, SignalingTransport};
use crate::error::{Error, Result};
use crate::retry::Backoff;

/// Persistent-socket relay client. Inbound frames are re-dispatched by their
/// `type` exactly like in polling mode; outbound calls are fire-and-forget
/// frames. Any socket closure, clean or not, counts as a failure and goes
/// through [`Backoff`] before reconnecting.
pub struct PushTransport {
    shared: Arc<PushShared>,
}

struct PushShared {
    url: String,
    bus: EventBus,
    out_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    backoff: Mutex<Backoff>,
    stopping: AtomicBool,
}

impl PushTransport {
    pub fn new(url: impl Into<String>, config: &PeerConfig) -> Self {
        Self {
            shared: Arc::new(PushShared {
                url: url.into(),
                bus: EventBus::default(),
                out_tx: Mutex::new(None),
                backoff: Mutex::new(Backoff::new(
                    config.backoff_min,
                    config.backoff_max,
                    config.backoff_jitter,
                )),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    fn send_message(&self, message: &SignalMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        let guard = self.shared.out_tx.lock().unwrap();
        let Some(tx) = guard.as_ref() else {
            return Err(Error::NotStarted);
        };
        tx.send(Message::Text(json))
            .map_err(|_| Error::WebSocket("socket writer is gone".to_string()))
    }
}

async fn run_socket(shared: Arc<PushShared>) {
    if shared.stopping.load(Ordering::SeqCst) {
        return;
    }
    let mut stream = match connect_async(&shared.url).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!("relay socket connect failed: {}", e);
            schedule_reconnect(&shared);
            return;
        }
    };
    // stop() may have raced the handshake; discard the socket instead of
    // installing it.
    if shared.stopping.load(Ordering::SeqCst) {
        if let Err(e) = stream.close(None).await {
            debug!("closing raced relay socket failed: {}", e);
        }
        return;
    }
    info!("relay socket connected: {}", shared.url);
    shared.backoff.lock().unwrap().succeed();

    let (mut sink, mut source) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    *shared.out_tx.lock().unwrap() = Some(tx);

    let sender = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<SignalMessage>(&text) {
                Ok(message) => {
                    debug!("relay frame: {:?}", message);
                    shared.bus.publish(SignalingEvent::from_wire(message));
                }
                Err(e) => warn!("invalid relay frame ({}): {}", e, text),
            },
            Ok(Message::Close(_)) => {
                info!("relay socket closed by remote");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("relay socket error: {}", e);
                break;
            }
        }
    }

    sender.abort();
    shared.out_tx.lock().unwrap().take();
    // Even a clean close counts as a failure.
    schedule_reconnect(&shared);
}

fn schedule_reconnect(shared: &Arc<PushShared>) {
    if shared.stopping.load(Ordering::SeqCst) {
        debug!("relay socket stopped locally, not reconnecting");
        return;
    }
    let retry_target = shared.clone();
    let scheduled = shared.backoff.lock().unwrap().fail_with(move || {
        tokio::spawn(run_socket(retry_target));
    });
    match scheduled {
        Ok(delay) => {
            info!("relay socket reconnecting in {:?}", delay);
            shared.bus.publish(SignalingEvent::Reconnecting { delay });
        }
        Err(e) => debug!("reconnect not scheduled: {}", e),
    }
}

#[async_trait]
impl SignalingTransport for PushTransport {
    async fn start(&self) -> Result<()> {
        self.shared.stopping.store(false, Ordering::SeqCst);
        tokio::spawn(run_socket(self.shared.clone()));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.shared.stopping.store(true, Ordering::SeqCst);
        self.shared.backoff.lock().unwrap().cancel();
        if let Some(tx) = self.shared.out_tx.lock().unwrap().take() {
            let _ = tx.send(Message::Close(None));
        }
        Ok(())
    }

    async fn create_connection(&self, connection_id: &ConnectionId) -> Result<()> {
        self.send_message(&SignalMessage::Connect {
            connection_id: connection_id.clone(),
            polite: false,
        })
    }

    async fn delete_connection(&self, connection_id: &ConnectionId) -> Result<()> {
        self.send_message(&SignalMessage::Disconnect {
            connection_id: connection_id.clone(),
        })
    }

    async fn send_offer(&self, connection_id: &ConnectionId, sdp: &str) -> Result<()> {
        self.send_message(&SignalMessage::Offer {
            connection_id: connection_id.clone(),
            sdp: sdp.to_string(),
            polite: None,
        })
    }

    async fn send_answer(&self, connection_id: &ConnectionId, sdp: &str) -> Result<()> {
        self.send_message(&SignalMessage::Answer {
            connection_id: connection_id.clone(),
            sdp: sdp.to_string(),
            polite: None,
        })
    }

    async fn send_candidate(
        &self,
        connection_id: &ConnectionId,
        candidate: &IceCandidate,
    ) -> Result<()> {
        self.send_message(&SignalMessage::Candidate {
            connection_id: connection_id.clone(),
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_m_line_index: candidate.sdp_m_line_index,
        })
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SignalingEvent> {
        self.shared.bus.subscribe()
    }
}
