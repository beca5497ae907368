//! Session negotiation integration tests
//!
//! Exercises the full offer → answer path against a real in-process client
//! peer connection, plus the registry guarantees around failed offers,
//! concurrent offers, and shutdown.

use framepipe_core::Transform;
use framepipe_webrtc::{Error, Negotiator, SessionRegistry, SessionState, WebRtcConfig};
use std::sync::Arc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::interceptor::registry::Registry as InterceptorRegistry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

// =============================================================================
// Test Helpers
// =============================================================================

/// Host-only config so tests never reach out to a STUN server
fn test_config() -> WebRtcConfig {
    WebRtcConfig {
        stun_servers: vec![],
    }
}

fn test_negotiator(registry: &Arc<SessionRegistry>) -> Negotiator {
    Negotiator::new(Arc::clone(registry), test_config())
}

/// Build a browser-side peer connection and produce a real video offer
async fn client_video_offer() -> (Arc<RTCPeerConnection>, String) {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs().unwrap();
    let interceptors =
        register_default_interceptors(InterceptorRegistry::new(), &mut media_engine).unwrap();
    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(interceptors)
        .build();

    let pc = Arc::new(
        api.new_peer_connection(RTCConfiguration::default())
            .await
            .unwrap(),
    );
    pc.add_transceiver_from_kind(RTPCodecType::Video, None)
        .await
        .unwrap();

    let offer = pc.create_offer(None).await.unwrap();
    let sdp = offer.sdp.clone();
    pc.set_local_description(offer).await.unwrap();
    (pc, sdp)
}

// =============================================================================
// Offer / answer
// =============================================================================

#[tokio::test]
async fn valid_offer_yields_answer_and_registers_one_session() {
    let registry = Arc::new(SessionRegistry::new());
    let negotiator = test_negotiator(&registry);
    let (client, offer_sdp) = client_video_offer().await;

    assert_eq!(registry.len(), 0);
    let answer = negotiator
        .handle_offer(offer_sdp, "offer", Transform::Edge)
        .await
        .unwrap();

    assert!(!answer.sdp.is_empty());
    assert_eq!(answer.sdp_type, "answer");
    assert_eq!(registry.len(), 1);

    let session = registry.get(&answer.session_id).unwrap();
    assert_eq!(session.transform(), Transform::Edge);
    assert_eq!(session.state(), SessionState::Negotiating);

    client.close().await.unwrap();
    registry.close_all().await;
}

#[tokio::test]
async fn malformed_sdp_fails_but_session_stays_registered() {
    let registry = Arc::new(SessionRegistry::new());
    let negotiator = test_negotiator(&registry);

    let result = negotiator
        .handle_offer("this is not an sdp".to_string(), "offer", Transform::None)
        .await;

    assert!(matches!(result, Err(Error::Negotiation(_))));
    // Registered before negotiation, so the failed session is still
    // reachable for cleanup.
    assert_eq!(registry.len(), 1);

    registry.close_all().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn non_offer_description_type_is_rejected_at_the_boundary() {
    let registry = Arc::new(SessionRegistry::new());
    let negotiator = test_negotiator(&registry);
    let (client, offer_sdp) = client_video_offer().await;

    let result = negotiator
        .handle_offer(offer_sdp, "answer", Transform::None)
        .await;
    assert!(matches!(result, Err(Error::Negotiation(_))));
    assert_eq!(registry.len(), 0);

    client.close().await.unwrap();
}

#[tokio::test]
async fn concurrent_offers_negotiate_independently() {
    let registry = Arc::new(SessionRegistry::new());
    let negotiator = Arc::new(test_negotiator(&registry));

    let (client_a, offer_a) = client_video_offer().await;
    let (client_b, offer_b) = client_video_offer().await;

    let (answer_a, answer_b) = tokio::join!(
        negotiator.handle_offer(offer_a, "offer", Transform::Grayscale),
        negotiator.handle_offer(offer_b, "offer", Transform::Edge),
    );
    let answer_a = answer_a.unwrap();
    let answer_b = answer_b.unwrap();

    assert_eq!(registry.len(), 2);
    assert_ne!(answer_a.session_id, answer_b.session_id);

    // No pipe state is shared: neither session has a pipe yet, and each
    // keeps its own transform.
    let session_a = registry.get(&answer_a.session_id).unwrap();
    let session_b = registry.get(&answer_b.session_id).unwrap();
    assert_eq!(session_a.pipe_count(), 0);
    assert_eq!(session_b.pipe_count(), 0);
    assert_eq!(session_a.transform(), Transform::Grayscale);
    assert_eq!(session_b.transform(), Transform::Edge);

    client_a.close().await.unwrap();
    client_b.close().await.unwrap();
    registry.close_all().await;
}

// =============================================================================
// Registry lifecycle
// =============================================================================

#[tokio::test]
async fn add_then_remove_restores_registry_size() {
    let registry = Arc::new(SessionRegistry::new());
    let negotiator = test_negotiator(&registry);
    let (client, offer_sdp) = client_video_offer().await;

    let before = registry.len();
    let answer = negotiator
        .handle_offer(offer_sdp, "offer", Transform::None)
        .await
        .unwrap();
    let session = registry.remove(&answer.session_id).unwrap();
    assert_eq!(registry.len(), before);

    session.close().await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn close_all_is_a_barrier_leaving_every_session_closed() {
    let registry = Arc::new(SessionRegistry::new());
    let negotiator = test_negotiator(&registry);

    let mut sessions = Vec::new();
    let mut clients = Vec::new();
    for _ in 0..3 {
        let (client, offer_sdp) = client_video_offer().await;
        let answer = negotiator
            .handle_offer(offer_sdp, "offer", Transform::None)
            .await
            .unwrap();
        sessions.push(registry.get(&answer.session_id).unwrap());
        clients.push(client);
    }
    assert_eq!(registry.len(), 3);

    registry.close_all().await;

    assert!(registry.is_empty());
    for session in &sessions {
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.pipe_count(), 0);
    }

    for client in clients {
        client.close().await.unwrap();
    }
}

#[tokio::test]
async fn session_close_is_idempotent() {
    let registry = Arc::new(SessionRegistry::new());
    let negotiator = test_negotiator(&registry);
    let (client, offer_sdp) = client_video_offer().await;

    let answer = negotiator
        .handle_offer(offer_sdp, "offer", Transform::None)
        .await
        .unwrap();
    let session = registry.get(&answer.session_id).unwrap();

    session.close().await.unwrap();
    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    client.close().await.unwrap();
    registry.close_all().await;
}
