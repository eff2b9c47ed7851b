use crate::model::connection::ConnectionId;
use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};

/// Wire unit exchanged with the relay, dispatched by its `type` tag.
///
/// The same shapes travel over both relay transports: as queued messages in
/// polling mode and as raw text frames in push mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalMessage {
    #[serde(rename_all = "camelCase")]
    Connect {
        connection_id: ConnectionId,
        /// Relay-assigned role: the party that found the connection id
        /// already occupied is polite. Absent on client-sent frames.
        #[serde(default)]
        polite: bool,
    },
    #[serde(rename_all = "camelCase")]
    Disconnect { connection_id: ConnectionId },
    #[serde(rename_all = "camelCase")]
    Offer {
        connection_id: ConnectionId,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        polite: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    Answer {
        connection_id: ConnectionId,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        polite: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    Candidate {
        connection_id: ConnectionId,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
    },
}

/// `PUT /signaling` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

/// `PUT /signaling/connection` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionResponse {
    pub connection_id: ConnectionId,
    pub polite: bool,
}

/// `GET /signaling?fromtime=<ms>` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    /// Server clock at the time of the fetch; the next `fromtime` watermark.
    pub datetime: Option<i64>,
    pub messages: Vec<SignalMessage>,
}

/// `PUT|DELETE /signaling/connection` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub connection_id: ConnectionId,
}

/// `POST /signaling/offer|answer` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRequest {
    pub connection_id: ConnectionId,
    pub sdp: String,
}

/// `POST /signaling/candidate` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRequest {
    pub connection_id: ConnectionId,
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}
