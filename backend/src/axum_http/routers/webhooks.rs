use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use crates::webhooks::signer::{SIGNATURE_HEADER, WebhookSigner};
use serde::Serialize;
use tracing::{info, warn};

use crate::axum_http::error_responses::AppError;

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

pub fn routes(signer: Arc<WebhookSigner>) -> Router {
    Router::new()
        .route("/verify", post(verify_signature))
        .with_state(signer)
}

/// Recomputes the signature over the raw request body, the same bytes a merchant
/// receives from delivery.
pub async fn verify_signature(
    State(signer): State<Arc<WebhookSigner>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            warn!("webhook: verify request without signature");
            AppError::BadRequest("Missing signature".to_string())
        })?;

    serde_json::from_slice::<serde_json::Value>(&body)
        .map_err(|_| AppError::BadRequest("Body must be valid JSON".to_string()))?;

    let valid = signer.verify(&body, signature);
    info!(valid, "webhook: signature checked");

    Ok(Json(VerifyResponse { valid }))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderName, HeaderValue, StatusCode};

    use super::*;

    #[tokio::test]
    async fn accepts_matching_signature() {
        let signer = Arc::new(WebhookSigner::new("secret"));
        let body = Bytes::from_static(br#"{"event":"payment.succeeded"}"#);
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(SIGNATURE_HEADER.as_bytes()).unwrap(),
            HeaderValue::from_str(&signer.sign(&body).unwrap()).unwrap(),
        );

        let response = verify_signature(State(signer), headers, body)
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_signature_is_bad_request() {
        let signer = Arc::new(WebhookSigner::new("secret"));
        let result = verify_signature(State(signer), HeaderMap::new(), Bytes::from_static(b"{}")).await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
