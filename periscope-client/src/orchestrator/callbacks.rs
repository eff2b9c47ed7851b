use async_trait::async_trait;
use periscope_core::{ChannelInfo, ConnectionId, TrackInfo};

/// Колбэки уровня приложения: оркестратор вызывает их по мере
/// прохождения переговоров и жизни соединения.
#[async_trait]
pub trait SessionCallbacks: Send + Sync {
    /// Соединение создано, роль (polite) назначена сервером.
    async fn on_connect(&self, connection_id: &ConnectionId, polite: bool) {
        let _ = (connection_id, polite);
    }

    async fn on_disconnect(&self, connection_id: &ConnectionId) {
        let _ = connection_id;
    }

    async fn on_got_offer(&self, connection_id: &ConnectionId, sdp: &str) {
        let _ = (connection_id, sdp);
    }

    async fn on_got_answer(&self, connection_id: &ConnectionId, sdp: &str) {
        let _ = (connection_id, sdp);
    }

    async fn on_track(&self, connection_id: &ConnectionId, track: &TrackInfo) {
        let _ = (connection_id, track);
    }

    async fn on_add_channel(&self, connection_id: &ConnectionId, channel: &ChannelInfo) {
        let _ = (connection_id, channel);
    }
}

/// Пустая реализация для случаев, когда колбэки не нужны.
pub struct NoopCallbacks;

#[async_trait]
impl SessionCallbacks for NoopCallbacks {}
