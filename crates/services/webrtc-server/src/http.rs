//! HTTP signaling boundary
//!
//! Three routes: `POST /offer` runs the offer/answer exchange, `GET /check`
//! reports the live session count, `GET /` is a liveness blurb. Request
//! payloads are strongly typed at the boundary; a missing or mistyped field
//! fails the request in the extractor instead of surfacing later as a
//! null-shaped error. CORS is permissive so any page can talk to the
//! server, matching the deployment this fronts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use framepipe_core::Transform;
use framepipe_webrtc::{Negotiator, SessionRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    /// Live session membership, also consulted by the shutdown hook
    pub registry: Arc<SessionRegistry>,
    /// Offer/answer orchestrator
    pub negotiator: Arc<Negotiator>,
}

/// Body of `POST /offer`
#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    /// Remote session description text
    pub sdp: String,
    /// Description type, expected `"offer"`
    #[serde(rename = "type")]
    pub sdp_type: String,
    /// Transform selector; free text, unknown names behave as `none`
    #[serde(default = "default_transform")]
    pub transform: String,
}

fn default_transform() -> String {
    "none".to_string()
}

/// Body of a successful `POST /offer` response
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    /// Local session description text
    pub sdp: String,
    /// Description type, `"answer"`
    #[serde(rename = "type")]
    pub sdp_type: String,
}

/// Body of a failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Underlying failure message
    pub error: String,
}

/// Body of `GET /check`
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    /// Current session registry size
    pub active_connections: usize,
    /// Fixed status marker
    pub status: &'static str,
}

/// Build the signaling router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/offer", post(offer))
        .route("/check", get(check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "FramePipe video transform server" }))
}

async fn offer(
    State(state): State<AppState>,
    Json(request): Json<OfferRequest>,
) -> Result<Json<AnswerResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(transform = %request.transform, "received offer");

    let transform = Transform::from_name(&request.transform);
    match state
        .negotiator
        .handle_offer(request.sdp, &request.sdp_type, transform)
        .await
    {
        Ok(answer) => {
            info!(session = %answer.session_id, "answer returned");
            Ok(Json(AnswerResponse {
                sdp: answer.sdp,
                sdp_type: answer.sdp_type,
            }))
        }
        Err(e) => {
            error!("offer failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

async fn check(State(state): State<AppState>) -> Json<CheckResponse> {
    Json(CheckResponse {
        active_connections: state.registry.len(),
        status: "running",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use framepipe_webrtc::WebRtcConfig;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let registry = Arc::new(SessionRegistry::new());
        let negotiator = Arc::new(Negotiator::new(
            Arc::clone(&registry),
            WebRtcConfig {
                stun_servers: vec![],
            },
        ));
        AppState {
            registry,
            negotiator,
        }
    }

    async fn body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn index_reports_liveness() {
        let response = app(test_state())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn check_reports_registry_size() {
        let response = app(test_state())
            .oneshot(Request::get("/check").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response.into_body()).await;
        assert_eq!(body["active_connections"], 0);
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn malformed_sdp_returns_server_fault_with_message() {
        let state = test_state();
        let registry = Arc::clone(&state.registry);

        let request = Request::post("/offer")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "sdp": "garbage",
                    "type": "offer",
                    "transform": "edge",
                })
                .to_string(),
            ))
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().contains("Negotiation"));
        // The failed session is registered for later cleanup.
        assert_eq!(registry.len(), 1);

        registry.close_all().await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn missing_sdp_field_fails_in_the_extractor() {
        let state = test_state();
        let registry = Arc::clone(&state.registry);

        let request = Request::post("/offer")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"type": "offer"}"#))
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
        // Rejected at the boundary: no session was ever created.
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn transform_field_defaults_to_none() {
        let request: OfferRequest =
            serde_json::from_str(r#"{"sdp": "v=0", "type": "offer"}"#).unwrap();
        assert_eq!(request.transform, "none");
        assert_eq!(Transform::from_name(&request.transform), Transform::None);
    }
}
