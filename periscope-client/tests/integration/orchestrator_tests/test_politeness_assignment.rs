use anyhow::Result;
use periscope_client::signaling::{SignalingEvent, SignalingTransport};
use periscope_core::ConnectionId;

use crate::integration::init_tracing;
use crate::utils::{MockRelay, recv_signaling_event};

/// The relay contract behind role assignment: whoever creates a connection
/// id first is impolite, whoever finds it occupied is polite, and the
/// `connect` acknowledgement reaches the creator only.
#[tokio::test]
async fn first_creator_is_impolite_second_is_polite() -> Result<()> {
    init_tracing();
    let relay = MockRelay::new();
    let first = relay.client();
    let second = relay.client();
    let mut first_events = first.subscribe();
    let mut second_events = second.subscribe();

    let id = ConnectionId::from("12345");
    first.create_connection(&id).await?;
    match recv_signaling_event(&mut first_events).await? {
        SignalingEvent::Connected {
            connection_id,
            polite,
        } => {
            assert_eq!(connection_id, id);
            assert!(!polite);
        }
        other => anyhow::bail!("unexpected event: {other:?}"),
    }

    second.create_connection(&id).await?;
    match recv_signaling_event(&mut second_events).await? {
        SignalingEvent::Connected {
            connection_id,
            polite,
        } => {
            assert_eq!(connection_id, id);
            assert!(polite);
        }
        other => anyhow::bail!("unexpected event: {other:?}"),
    }

    // The second join is not announced to the first client.
    assert!(first_events.try_recv().is_err());
    Ok(())
}
