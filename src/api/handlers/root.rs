use crate::api::basic_auth::BasicAuthGate;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{info, instrument};

// axum handler for the protected endpoint
#[instrument(skip_all)]
pub async fn root(gate: Extension<BasicAuthGate>, headers: HeaderMap) -> Response {
    match gate.require(&headers).await {
        Ok(principal) => {
            info!(username = %principal.username, "authenticated");
            (StatusCode::OK, format!("Hello, {}!", principal.username)).into_response()
        }
        Err(challenge) => challenge,
    }
}
