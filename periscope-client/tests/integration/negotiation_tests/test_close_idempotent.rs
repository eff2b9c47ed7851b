use std::time::Duration;

use anyhow::Result;
use periscope_client::peer::TransportSession;
use periscope_core::{ConnectionId, SessionDescription, SignalingState};

use crate::integration::{init_tracing, spawn_test_peer};

#[tokio::test]
async fn close_is_idempotent_and_stops_inbound_processing() -> Result<()> {
    init_tracing();
    let id = ConnectionId::from("C1");
    let (peer, session, mut events) = spawn_test_peer(&id, false);

    peer.close().await;
    peer.close().await;
    assert!(session.is_closed());

    // A closed peer drops inbound messages for its own id too.
    peer.on_got_description(&id, &SessionDescription::offer("v=0 late"))
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.signaling_state().await, SignalingState::Stable);
    assert!(events.try_recv().is_err(), "no events expected after close");
    Ok(())
}
