//! Checkout and simulated payment completion.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use unistream_core::{TransactionId, TransactionKind, TransactionStatus, UserId};
use unistream_store::Completion;

use crate::auth::AuthUser;
use crate::economy::{self, CheckoutRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// Checkout response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// The pending transaction.
    pub transaction_id: TransactionId,
    /// What is being paid for.
    pub kind: TransactionKind,
    /// Coins granted on completion (1 for a subscription).
    pub amount: i64,
    /// Price in cents.
    pub price_cents: i64,
    /// XP granted on completion.
    pub points: i64,
    /// Where the frontend sends the user to pay.
    pub checkout_url: String,
}

/// Open a pending checkout for a coin pack or a subscription.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let tx = economy::create_checkout(state.store.as_ref(), &auth.user_id, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            checkout_url: format!("{}/checkout/{}", state.config.frontend_url, tx.id),
            transaction_id: tx.id,
            kind: tx.kind,
            amount: tx.amount,
            price_cents: tx.price_cents,
            points: tx.points,
        }),
    ))
}

/// Completion response.
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    /// The transaction.
    pub transaction_id: TransactionId,
    /// What was paid for.
    pub kind: TransactionKind,
    /// Final status.
    pub status: TransactionStatus,
    /// Owner's coins after the credit.
    pub coins: i64,
    /// Owner's points after the credit.
    pub points: i64,
    /// Channel of a subscription.
    pub target_streamer_id: Option<UserId>,
    /// Whether this call found the transaction already completed.
    pub already_completed: bool,
    /// Whether a subscription row was opened.
    pub subscription_created: bool,
}

impl From<Completion> for CompletionResponse {
    fn from(c: Completion) -> Self {
        Self {
            transaction_id: c.transaction.id,
            kind: c.transaction.kind,
            status: c.transaction.status,
            coins: c.user.coins,
            points: c.user.points,
            target_streamer_id: c.transaction.target_streamer_id,
            already_completed: c.already_completed,
            subscription_created: c.subscription_created,
        }
    }
}

/// Simulated completion request.
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    /// The pending transaction.
    pub transaction_id: TransactionId,
}

/// Complete one of the caller's own checkouts without the gateway.
///
/// Only available when simulated payments are enabled.
pub async fn complete(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CompleteRequest>,
) -> Result<Json<CompletionResponse>, ApiError> {
    if !state.config.allow_simulated_payments {
        return Err(ApiError::Forbidden("simulated payments are disabled".into()));
    }

    let tx = state
        .store
        .get_transaction(&body.transaction_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("transaction not found: {}", body.transaction_id)))?;
    if tx.user_id != auth.user_id {
        return Err(ApiError::Forbidden("not your transaction".into()));
    }

    tracing::info!(user_id = %auth.user_id, transaction_id = %tx.id, "Simulated payment approved");

    let completion = economy::complete_transaction(state.store.as_ref(), &tx.id).await?;
    Ok(Json(CompletionResponse::from(completion)))
}
