use std::time::Duration;

use anyhow::Result;
use periscope_core::{ConnectionId, SessionDescription};

use crate::integration::{init_tracing, spawn_test_peer};
use crate::utils::{wait_for_negotiated, wait_for_offer};

/// An unanswered offer is re-sent every resend interval with the same SDP,
/// and the resends stop as soon as the answer lands.
#[tokio::test(start_paused = true)]
async fn unanswered_offer_is_resent_until_answered() -> Result<()> {
    init_tracing();
    let id = ConnectionId::from("C1");
    let (peer, _session, mut events) = spawn_test_peer(&id, false);

    peer.renegotiate().await?;
    let first = wait_for_offer(&mut events).await?;

    // The paused clock advances straight to the next resend tick.
    let resent = wait_for_offer(&mut events).await?;
    assert_eq!(first, resent);
    let resent_again = wait_for_offer(&mut events).await?;
    assert_eq!(first, resent_again);

    peer.on_got_description(&id, &SessionDescription::answer("v=0 answer"))
        .await?;
    wait_for_negotiated(&mut events).await?;

    // Several intervals worth of silence after the answer.
    let quiet = tokio::time::timeout(Duration::from_millis(700), events.recv()).await;
    assert!(quiet.is_err(), "unexpected event after answer: {quiet:?}");

    peer.close().await;
    Ok(())
}

/// No resends while the peer has nothing outstanding.
#[tokio::test(start_paused = true)]
async fn idle_peer_sends_nothing() -> Result<()> {
    init_tracing();
    let id = ConnectionId::from("C1");
    let (peer, _session, mut events) = spawn_test_peer(&id, false);

    let quiet = tokio::time::timeout(Duration::from_millis(700), events.recv()).await;
    assert!(quiet.is_err(), "unexpected event: {quiet:?}");

    peer.close().await;
    Ok(())
}
