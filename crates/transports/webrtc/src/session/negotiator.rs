//! Negotiation handler: offer in, answer out, events thereafter
//!
//! Drives the offer → local description → answer flow for one session and
//! wires the engine's notifications into the session's own event loop. The
//! engine callbacks do nothing but forward [`SessionEvent`]s into a channel;
//! a per-session task consumes them, so lifecycle handling reads as one
//! straight-line loop instead of re-entrant closures.
//!
//! The session is registered before the remote description is applied:
//! a negotiation that fails partway still leaves the session reachable for
//! cleanup, never a leaked peer connection.

use crate::config::WebRtcConfig;
use crate::media::{spawn_sender_pump, CodecFactory, RawCodec, RtpFrameSource, TrackPipe};
use crate::session::{Session, SessionId, SessionRegistry, SessionState};
use crate::{Error, Result};
use framepipe_core::Transform;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_VP8};
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry as InterceptorRegistry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Notifications the negotiation engine produces for one session
#[derive(Debug)]
pub enum SessionEvent {
    /// Underlying transport changed state
    StateChanged(RTCPeerConnectionState),
    /// An inbound track arrived
    TrackArrived(Arc<TrackRemote>),
}

/// The negotiated answer handed back to the signaling caller
#[derive(Debug, Clone)]
pub struct AnswerDescription {
    /// Session the answer belongs to
    pub session_id: SessionId,
    /// Local session description text
    pub sdp: String,
    /// Description type, `"answer"`
    pub sdp_type: String,
}

/// Orchestrates offer/answer exchange and session wiring
pub struct Negotiator {
    registry: Arc<SessionRegistry>,
    config: WebRtcConfig,
    codecs: Arc<dyn CodecFactory>,
}

impl Negotiator {
    /// Create a negotiator over the given registry and engine config
    ///
    /// Uses the raw passthrough codec boundary; swap in a real backend with
    /// [`Negotiator::with_codec_factory`].
    pub fn new(registry: Arc<SessionRegistry>, config: WebRtcConfig) -> Self {
        Self {
            registry,
            config,
            codecs: Arc::new(RawCodec),
        }
    }

    /// Replace the codec collaborator
    pub fn with_codec_factory(mut self, codecs: Arc<dyn CodecFactory>) -> Self {
        self.codecs = codecs;
        self
    }

    /// Handle one remote offer, returning the negotiated local answer
    ///
    /// The session is created and registered before the remote description
    /// is applied; on a negotiation error it stays registered (and
    /// reachable for `close_all`) while the error surfaces to the caller.
    pub async fn handle_offer(
        &self,
        sdp: String,
        sdp_type: &str,
        transform: Transform,
    ) -> Result<AnswerDescription> {
        if sdp_type != "offer" {
            return Err(Error::Negotiation(format!(
                "unsupported session description type: {sdp_type:?}"
            )));
        }

        let peer_connection = self.build_peer_connection().await?;
        let session = Session::new(transform, Arc::clone(&peer_connection));
        let session_id = session.id();
        info!(session = %session_id, transform = %transform, "session created for offer");

        self.registry.add(Arc::clone(&session));
        session.set_state(SessionState::Negotiating);

        // The outbound track has to be in place before the answer is
        // generated so the remote peer learns about it; the pipe output is
        // attached to it when the inbound track shows up.
        let out_track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            format!("framepipe-{session_id}"),
            "framepipe".to_owned(),
        ));
        let rtp_sender = peer_connection
            .add_track(Arc::clone(&out_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| Error::WebRtc(format!("failed to add outbound track: {e}")))?;

        // Drain RTCP on the sender so its interceptors keep running; the
        // task ends when the sender closes.
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while rtp_sender.read(&mut rtcp_buf).await.is_ok() {}
        });

        let (event_tx, event_rx) = mpsc::channel(16);
        wire_engine_events(&peer_connection, event_tx);
        tokio::spawn(run_session_events(
            Arc::clone(&session),
            Arc::clone(&self.registry),
            Arc::clone(&self.codecs),
            out_track,
            event_rx,
        ));

        let offer = RTCSessionDescription::offer(sdp)
            .map_err(|e| Error::Negotiation(format!("invalid offer SDP: {e}")))?;
        peer_connection
            .set_remote_description(offer)
            .await
            .map_err(|e| Error::Negotiation(format!("failed to apply remote description: {e}")))?;

        let answer = peer_connection
            .create_answer(None)
            .await
            .map_err(|e| Error::Negotiation(format!("failed to create answer: {e}")))?;
        peer_connection
            .set_local_description(answer)
            .await
            .map_err(|e| Error::Negotiation(format!("failed to set local description: {e}")))?;

        let local = peer_connection
            .local_description()
            .await
            .ok_or_else(|| Error::Negotiation("local description missing after answer".into()))?;

        info!(session = %session_id, "answer generated");
        Ok(AnswerDescription {
            session_id,
            sdp: local.sdp,
            sdp_type: local.sdp_type.to_string(),
        })
    }

    /// Build a peer connection per the engine's API builder sequence
    async fn build_peer_connection(&self) -> Result<Arc<RTCPeerConnection>> {
        self.config.validate()?;

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::WebRtc(format!("failed to register codecs: {e}")))?;

        let interceptors = register_default_interceptors(InterceptorRegistry::new(), &mut media_engine)
            .map_err(|e| Error::WebRtc(format!("failed to register interceptors: {e}")))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptors)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.config.stun_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let peer_connection = api
            .new_peer_connection(rtc_config)
            .await
            .map_err(|e| Error::WebRtc(format!("failed to create peer connection: {e}")))?;
        Ok(Arc::new(peer_connection))
    }
}

/// Point the engine's callbacks at the session's event channel
///
/// The callbacks themselves stay trivial; everything stateful happens in
/// [`run_session_events`].
fn wire_engine_events(
    peer_connection: &Arc<RTCPeerConnection>,
    event_tx: mpsc::Sender<SessionEvent>,
) {
    let state_tx = event_tx.clone();
    peer_connection.on_peer_connection_state_change(Box::new(move |state| {
        let state_tx = state_tx.clone();
        Box::pin(async move {
            let _ = state_tx.send(SessionEvent::StateChanged(state)).await;
        })
    }));

    peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
        let track_tx = event_tx.clone();
        Box::pin(async move {
            let _ = track_tx.send(SessionEvent::TrackArrived(track)).await;
        })
    }));
}

/// Per-session event loop
///
/// Consumes engine notifications until the session is over. Transport
/// failure triggers close and deregistration here; nothing is surfaced to a
/// caller because no caller is waiting once the answer has been returned.
async fn run_session_events(
    session: Arc<Session>,
    registry: Arc<SessionRegistry>,
    codecs: Arc<dyn CodecFactory>,
    out_track: Arc<TrackLocalStaticSample>,
    mut events: mpsc::Receiver<SessionEvent>,
) {
    let mut out_track = Some(out_track);

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::StateChanged(RTCPeerConnectionState::Connected) => {
                info!(session = %session.id(), "transport connected");
                session.set_state(SessionState::Connected);
            }
            SessionEvent::StateChanged(RTCPeerConnectionState::Failed) => {
                warn!(session = %session.id(), "transport failed, closing session");
                session.set_state(SessionState::Failed);
                registry.remove(&session.id());
                if let Err(e) = session.close().await {
                    warn!(session = %session.id(), "close after failure reported: {e}");
                }
                break;
            }
            SessionEvent::StateChanged(RTCPeerConnectionState::Closed) => {
                debug!(session = %session.id(), "transport closed");
                break;
            }
            SessionEvent::StateChanged(state) => {
                debug!(session = %session.id(), ?state, "transport state change");
            }
            SessionEvent::TrackArrived(track) => {
                if track.kind() != RTPCodecType::Video {
                    // Audio passes through the engine untouched.
                    debug!(session = %session.id(), kind = %track.kind(), "ignoring non-video track");
                    continue;
                }
                let Some(out_track) = out_track.take() else {
                    warn!(session = %session.id(), "additional video track ignored, outbound already attached");
                    continue;
                };
                info!(
                    session = %session.id(),
                    transform = %session.transform(),
                    "attaching track pipe to inbound video track"
                );
                let source = RtpFrameSource::new(track, codecs.new_decoder());
                let pipe = TrackPipe::new(source, session.transform());
                let pump = spawn_sender_pump(session.id(), pipe, codecs.new_encoder(), out_track);
                session.add_pump(pump);
            }
        }
    }

    debug!(session = %session.id(), "session event loop ended");
}
