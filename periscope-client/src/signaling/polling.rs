use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use periscope_core::{
    CandidateRequest, ConnectionId, ConnectionRequest, CreateConnectionResponse,
    CreateSessionResponse, DescriptionRequest, IceCandidate, MessagesResponse, PeerConfig,
    SessionId,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{EventBus, SignalingEvent, SignalingTransport};
use crate::error::{Error, Result};

/// Header carrying the signaling session id on every mutating request.
pub const SESSION_ID_HEADER: &str = "Session-Id";

/// Window subtracted from the first `fromtime` watermark so a fresh session
/// does not replay very stale relay state.
const REPLAY_WINDOW: Duration = Duration::from_secs(30);

/// Store-and-forward relay client. Every outbound exchange is a one-shot
/// HTTP request; inbound messages are fetched by a polling loop and
/// re-dispatched as local [`SignalingEvent`]s.
pub struct PollingTransport {
    shared: Arc<PollingShared>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

struct PollingShared {
    base_url: String,
    http: reqwest::Client,
    poll_interval: Duration,
    session_retry_interval: Duration,
    session: RwLock<Option<SessionId>>,
    bus: EventBus,
}

impl PollingTransport {
    pub fn new(base_url: impl Into<String>, config: &PeerConfig) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            shared: Arc::new(PollingShared {
                base_url,
                http: reqwest::Client::new(),
                poll_interval: config.poll_interval,
                session_retry_interval: config.session_retry_interval,
                session: RwLock::new(None),
                bus: EventBus::default(),
            }),
            poll_task: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.shared.session.read().unwrap().clone()
    }
}

impl PollingShared {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn session(&self) -> Result<SessionId> {
        self.session.read().unwrap().clone().ok_or(Error::NotStarted)
    }

    async fn run(self: Arc<Self>) {
        let session_id = self.acquire_session().await;
        info!("signaling session established: {}", session_id);
        *self.session.write().unwrap() = Some(session_id);

        let mut from_time = now_millis().saturating_sub(REPLAY_WINDOW.as_millis() as i64);
        loop {
            match self.fetch_messages(from_time).await {
                Ok(response) => {
                    from_time = response.datetime.unwrap_or_else(now_millis);
                    for message in response.messages {
                        debug!("relay message: {:?}", message);
                        self.bus.publish(SignalingEvent::from_wire(message));
                    }
                }
                Err(e) => warn!("polling request failed: {}", e),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Ask for a session until the relay grants one.
    async fn acquire_session(&self) -> SessionId {
        loop {
            match self.create_session().await {
                Ok(response) => return response.session_id,
                Err(e) => {
                    warn!("session create failed, retrying: {}", e);
                    tokio::time::sleep(self.session_retry_interval).await;
                }
            }
        }
    }

    async fn create_session(&self) -> Result<CreateSessionResponse> {
        Ok(self
            .http
            .put(self.url("/signaling"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn fetch_messages(&self, from_time: i64) -> Result<MessagesResponse> {
        let session_id = self.session()?;
        Ok(self
            .http
            .get(self.url(&format!("/signaling?fromtime={from_time}")))
            .header(SESSION_ID_HEADER, session_id.to_string())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn post_signal<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let session_id = self.session()?;
        self.http
            .post(self.url(path))
            .header(SESSION_ID_HEADER, session_id.to_string())
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl SignalingTransport for PollingTransport {
    async fn start(&self) -> Result<()> {
        let mut poll_task = self.poll_task.lock().unwrap();
        if poll_task.is_some() {
            return Ok(());
        }
        *poll_task = Some(tokio::spawn(self.shared.clone().run()));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if let Some(task) = self.poll_task.lock().unwrap().take() {
            task.abort();
        }
        let session_id = self.shared.session.write().unwrap().take();
        if let Some(session_id) = session_id {
            // Release the session slot server-side.
            let released = self
                .shared
                .http
                .delete(self.shared.url("/signaling"))
                .header(SESSION_ID_HEADER, session_id.to_string())
                .send()
                .await;
            if let Err(e) = released {
                warn!("failed to release signaling session: {}", e);
            }
        }
        Ok(())
    }

    async fn create_connection(&self, connection_id: &ConnectionId) -> Result<()> {
        let session_id = self.shared.session()?;
        let response: CreateConnectionResponse = self
            .shared
            .http
            .put(self.shared.url("/signaling/connection"))
            .header(SESSION_ID_HEADER, session_id.to_string())
            .json(&ConnectionRequest {
                connection_id: connection_id.clone(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(
            "connection {} created (polite={})",
            response.connection_id, response.polite
        );
        // The relay answers connection creation synchronously.
        self.shared.bus.publish(SignalingEvent::Connected {
            connection_id: response.connection_id,
            polite: response.polite,
        });
        Ok(())
    }

    async fn delete_connection(&self, connection_id: &ConnectionId) -> Result<()> {
        let session_id = self.shared.session()?;
        self.shared
            .http
            .delete(self.shared.url("/signaling/connection"))
            .header(SESSION_ID_HEADER, session_id.to_string())
            .json(&ConnectionRequest {
                connection_id: connection_id.clone(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_offer(&self, connection_id: &ConnectionId, sdp: &str) -> Result<()> {
        self.shared
            .post_signal(
                "/signaling/offer",
                &DescriptionRequest {
                    connection_id: connection_id.clone(),
                    sdp: sdp.to_string(),
                },
            )
            .await
    }

    async fn send_answer(&self, connection_id: &ConnectionId, sdp: &str) -> Result<()> {
        self.shared
            .post_signal(
                "/signaling/answer",
                &DescriptionRequest {
                    connection_id: connection_id.clone(),
                    sdp: sdp.to_string(),
                },
            )
            .await
    }

    async fn send_candidate(
        &self,
        connection_id: &ConnectionId,
        candidate: &IceCandidate,
    ) -> Result<()> {
        self.shared
            .post_signal(
                "/signaling/candidate",
                &CandidateRequest {
                    connection_id: connection_id.clone(),
                    candidate: candidate.candidate.clone(),
                    sdp_mid: candidate.sdp_mid.clone(),
                    sdp_m_line_index: candidate.sdp_m_line_index,
                },
            )
            .await
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SignalingEvent> {
        self.shared.bus.subscribe()
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
