use periscope_core::{ChannelInfo, ConnectionId, IceCandidate, TrackInfo};

/// Исходящие события пира, которые его владелец пересылает
/// в сигнальный транспорт или наверх в приложение.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// Локальный SDP Offer готов к отправке через relay.
    SendOffer {
        connection_id: ConnectionId,
        sdp: String,
    },

    /// Локальный SDP Answer готов к отправке.
    SendAnswer {
        connection_id: ConnectionId,
        sdp: String,
    },

    /// Новый локальный ICE кандидат (для пробития NAT).
    SendCandidate {
        connection_id: ConnectionId,
        candidate: IceCandidate,
    },

    /// Переговоры завершены: получен и применён Answer.
    Negotiated { connection_id: ConnectionId },

    /// Удалённый медиатрек добавлен в сессию.
    Track {
        connection_id: ConnectionId,
        track: TrackInfo,
    },

    /// Удалённый data channel добавлен в сессию.
    DataChannel {
        connection_id: ConnectionId,
        channel: ChannelInfo,
    },

    /// Транспортная сессия разорвана; владелец обязан закрыть пира.
    Disconnected { connection_id: ConnectionId },
}
