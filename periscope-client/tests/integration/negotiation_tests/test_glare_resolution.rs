use anyhow::Result;
use periscope_client::peer::TransportSession;
use periscope_core::{ConnectionId, SessionDescription, SignalingState};

use crate::integration::{init_tracing, spawn_test_peer};
use crate::utils::{wait_for_answer, wait_for_negotiated, wait_for_offer};

/// Both sides send an offer at the same time. The impolite side discards
/// the colliding offer and keeps its own; the polite side rolls its offer
/// back, answers, and both end up stable.
#[tokio::test]
async fn colliding_offers_converge_to_stable_on_both_sides() -> Result<()> {
    init_tracing();
    let id = ConnectionId::from("C1");
    let (impolite, impolite_session, mut impolite_events) = spawn_test_peer(&id, false);
    let (polite, polite_session, mut polite_events) = spawn_test_peer(&id, true);

    impolite.renegotiate().await?;
    polite.renegotiate().await?;
    let impolite_offer = wait_for_offer(&mut impolite_events).await?;
    let polite_offer = wait_for_offer(&mut polite_events).await?;

    // The polite side's offer reaches the impolite side mid-negotiation
    // and is discarded without touching the session.
    impolite
        .on_got_description(&id, &SessionDescription::offer(polite_offer))
        .await?;
    assert!(impolite.snapshot().await.ignore_offer);
    assert_eq!(
        impolite_session.signaling_state().await,
        SignalingState::HaveLocalOffer
    );

    // The polite side accepts the colliding offer, implicitly rolling its
    // own pending offer back, and answers.
    polite
        .on_got_description(&id, &SessionDescription::offer(impolite_offer))
        .await?;
    let answer = wait_for_answer(&mut polite_events).await?;
    assert_eq!(
        polite_session.signaling_state().await,
        SignalingState::Stable
    );
    assert!(!polite.snapshot().await.waiting_answer);

    // The answer completes the impolite side's original offer.
    impolite
        .on_got_description(&id, &SessionDescription::answer(answer))
        .await?;
    wait_for_negotiated(&mut impolite_events).await?;
    assert_eq!(
        impolite_session.signaling_state().await,
        SignalingState::Stable
    );
    assert!(!impolite.snapshot().await.waiting_answer);

    impolite.close().await;
    polite.close().await;
    Ok(())
}

/// Without a collision the impolite side accepts a remote offer normally.
#[tokio::test]
async fn impolite_side_answers_when_not_mid_offer() -> Result<()> {
    init_tracing();
    let id = ConnectionId::from("C1");
    let (peer, session, mut events) = spawn_test_peer(&id, false);

    peer.on_got_description(&id, &SessionDescription::offer("v=0 remote"))
        .await?;
    let _answer = wait_for_answer(&mut events).await?;
    assert_eq!(session.signaling_state().await, SignalingState::Stable);
    assert!(!peer.snapshot().await.ignore_offer);

    peer.close().await;
    Ok(())
}
