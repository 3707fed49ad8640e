//! Recommendation API routes.

use super::state::ServerState;
use crate::catalog::CatalogCredential;
use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const HEADER_AUTHORIZATION: &str = "Authorization";
const HEADER_USER_ID: &str = "X-User-Id";

pub enum CredentialRejection {
    Missing,
}

impl IntoResponse for CredentialRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "detail": "missing catalog credentials" })),
        )
            .into_response()
    }
}

/// The identity collaborator validates the caller upstream and forwards
/// the catalog credential as bearer token + user id headers; this
/// extractor only carries them, it does not validate.
impl FromRequestParts<ServerState> for CatalogCredential {
    type Rejection = CredentialRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let access_token = parts
            .headers
            .get(HEADER_AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        let user_id = parts
            .headers
            .get(HEADER_USER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match (user_id, access_token) {
            (Some(user_id), Some(access_token)) => Ok(CatalogCredential {
                user_id,
                access_token,
            }),
            _ => {
                debug!("Request without catalog credentials");
                Err(CredentialRejection::Missing)
            }
        }
    }
}

#[derive(Deserialize)]
struct RecommendBody {
    query: String,
}

async fn recommend(
    credential: CatalogCredential,
    State(state): State<ServerState>,
    Json(body): Json<RecommendBody>,
) -> Response {
    let request = state.engine.recommend(&credential, &body.query);
    match tokio::time::timeout(state.request_timeout, request).await {
        Ok(Ok(recommendations)) => Json(recommendations).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(serde_json::json!({ "detail": "request timed out" })),
        )
            .into_response(),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_sec: u64,
    providers: Vec<String>,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH")),
        uptime_sec: state.start_time.elapsed().as_secs(),
        providers: state.providers.clone(),
    })
}

pub fn make_routes(state: ServerState) -> Router {
    Router::new()
        .route("/recommend", post(recommend))
        .route("/health", get(health))
        .with_state(state)
}
