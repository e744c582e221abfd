//! Payment gateway callback.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use unistream_core::TransactionId;

use crate::crypto::verify_signature;
use crate::economy;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// Gateway state that completes a transaction.
pub const APPROVED_STATE: &str = "approved";

/// Gateway callback payload.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    /// Our transaction id, echoed back by the gateway.
    pub transaction_id: TransactionId,
    /// Gateway payment state.
    pub state: String,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
    /// Whether the transaction is now completed.
    pub completed: bool,
    /// Whether it had been completed by an earlier callback.
    pub already_completed: bool,
}

/// Handle a payment gateway callback.
///
/// `approved` completes the transaction; any other state leaves it pending.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    if let Some(secret) = &state.config.payment_webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing payment signature".into()))?;
        if !verify_signature(secret, &body, signature) {
            tracing::warn!("Invalid payment webhook signature");
            return Err(ApiError::Unauthorized);
        }
    } else if state.config.allow_simulated_payments {
        tracing::warn!("Payment webhook secret not configured - accepting unsigned callback in simulated mode");
    } else {
        tracing::warn!("Payment webhook secret not configured - refusing unsigned callback");
        return Err(ApiError::Forbidden(
            "payment callbacks are disabled until a webhook secret is configured".into(),
        ));
    }

    let callback: PaymentCallback =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        transaction_id = %callback.transaction_id,
        state = %callback.state,
        "Received payment webhook"
    );

    if callback.state != APPROVED_STATE {
        tracing::info!(
            transaction_id = %callback.transaction_id,
            state = %callback.state,
            "Payment not approved - transaction stays pending"
        );
        return Ok(Json(WebhookResponse {
            received: true,
            completed: false,
            already_completed: false,
        }));
    }

    let completion =
        economy::complete_transaction(state.store.as_ref(), &callback.transaction_id).await?;

    Ok(Json(WebhookResponse {
        received: true,
        completed: true,
        already_completed: completion.already_completed,
    }))
}
