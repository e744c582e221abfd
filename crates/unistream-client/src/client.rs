//! Unistream HTTP client implementation.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use unistream_core::{GiftId, Role, TransactionId, UserId};

use crate::error::ClientError;
use crate::types::{
    Account, AccountNotice, ApiErrorResponse, Checkout, CheckoutRequest, CoinPack, CompleteRequest, Completion,
    Gift, GiftReceipt, GiftsEnvelope, LiveStream, LoginRequest, PacksEnvelope, ProgressEnvelope,
    RedeemReceipt, RegisterRequest, SendGiftRequest, Session, StartStreamRequest, StreamStopped,
    StreamerProgress, StreamsEnvelope, SubscriptionStatus, TransactionPage, Unsubscribed,
    VerifyRequest,
};

/// Unistream API client.
///
/// Public catalog calls work without a session. Everything that acts on an
/// account needs a token from [`UnistreamClient::login`], attached with
/// [`UnistreamClient::with_token`]. New accounts must be confirmed with
/// [`UnistreamClient::verify`] before they can log in.
#[derive(Debug, Clone)]
pub struct UnistreamClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl UnistreamClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the unistream service (e.g., `"http://localhost:8080"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: options.token,
        })
    }

    /// Return a copy of this client that authenticates as `token`.
    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Create an account. The server emails a confirmation token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn register(
        &self,
        email: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
        role: Role,
    ) -> Result<AccountNotice, ClientError> {
        let request = RegisterRequest {
            email: email.into(),
            name: name.into(),
            password: password.into(),
            role,
        };
        let response = self
            .request(Method::POST, "/v1/auth/register")
            .json(&request)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Confirm an account with the token from its registration email.
    ///
    /// # Errors
    ///
    /// Returns an API error with code `bad_request` for unknown or used tokens.
    pub async fn verify(&self, token: &str) -> Result<AccountNotice, ClientError> {
        let response = self
            .request(Method::POST, "/v1/auth/verify")
            .json(&VerifyRequest { token })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Exchange email and password for a session token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] on wrong credentials, and an API
    /// error with status 403 while the account is unverified.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .request(Method::POST, "/v1/auth/login")
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// The signed-in account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn me(&self) -> Result<Account, ClientError> {
        self.get_authed("/v1/users/me").await
    }

    /// The signed-in fan's level with every streamer they supported.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn community_progress(&self) -> Result<Vec<StreamerProgress>, ClientError> {
        let envelope: ProgressEnvelope = self.get_authed("/v1/users/me/community-progress").await?;
        Ok(envelope.streamers)
    }

    /// A page of the signed-in user's ledger history.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn transactions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionPage, ClientError> {
        self.get_authed(&format!(
            "/v1/users/me/transactions?limit={limit}&offset={offset}"
        ))
        .await
    }

    // ========================================================================
    // Shop
    // ========================================================================

    /// The gift catalog, or the gifts currently offered on one channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn gifts(&self, streamer_id: Option<&UserId>) -> Result<Vec<Gift>, ClientError> {
        let path = match streamer_id {
            Some(id) => format!("/v1/store/gifts?streamer_id={id}"),
            None => "/v1/store/gifts".to_string(),
        };
        let response = self.request(Method::GET, &path).send().await?;
        let envelope: GiftsEnvelope = Self::handle_response(response).await?;
        Ok(envelope.gifts)
    }

    /// Coin packs on sale.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn coin_packs(&self) -> Result<Vec<CoinPack>, ClientError> {
        let response = self.request(Method::GET, "/v1/store/packs").send().await?;
        let envelope: PacksEnvelope = Self::handle_response(response).await?;
        Ok(envelope.packs)
    }

    /// Send a gift to a streamer.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientFunds`] when the balance is too low.
    pub async fn send_gift(
        &self,
        streamer_id: &UserId,
        gift_id: GiftId,
    ) -> Result<GiftReceipt, ClientError> {
        self.post_authed(
            "/v1/gifts/send",
            &SendGiftRequest {
                streamer_id,
                gift_id,
            },
        )
        .await
    }

    /// Exchange points for coins.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientPoints`] when the balance is too low.
    pub async fn redeem_points(&self) -> Result<RedeemReceipt, ClientError> {
        let response = self
            .authed(Method::POST, "/v1/store/redeem")?
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// Open a checkout for a coin pack or a subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<Checkout, ClientError> {
        self.post_authed("/v1/payments/checkout", request).await
    }

    /// Complete a checkout without the gateway. Only available when the
    /// service allows simulated payments.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn complete_payment(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Completion, ClientError> {
        self.post_authed("/v1/payments/complete", &CompleteRequest { transaction_id })
            .await
    }

    // ========================================================================
    // Live sessions
    // ========================================================================

    /// Go live.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn start_stream(
        &self,
        title: &str,
        category: Option<&str>,
    ) -> Result<LiveStream, ClientError> {
        self.post_authed("/v1/streams/start", &StartStreamRequest { title, category })
            .await
    }

    /// End the running broadcast.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn stop_stream(&self) -> Result<StreamStopped, ClientError> {
        let response = self
            .authed(Method::POST, "/v1/streams/stop")?
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Everyone live right now.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn live_streams(&self) -> Result<Vec<LiveStream>, ClientError> {
        let response = self.request(Method::GET, "/v1/streams/live").send().await?;
        let envelope: StreamsEnvelope = Self::handle_response(response).await?;
        Ok(envelope.streams)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscription state with one channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn subscription(
        &self,
        streamer_id: &UserId,
    ) -> Result<SubscriptionStatus, ClientError> {
        self.get_authed(&format!("/v1/subscriptions/{streamer_id}"))
            .await
    }

    /// Cancel a subscription and receive the streamer's farewell.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when not subscribed.
    pub async fn unsubscribe(&self, streamer_id: &UserId) -> Result<Unsubscribed, ClientError> {
        let response = self
            .authed(Method::DELETE, &format!("/v1/subscriptions/{streamer_id}"))?
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    async fn get_authed<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.authed(Method::GET, path)?.send().await?;
        Self::handle_response(response).await
    }

    async fn post_authed<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.authed(Method::POST, path)?.json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let details = api_error.error.details.as_ref();
                let detail = |key: &str| {
                    details
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0)
                };

                // Map specific error codes to typed errors
                match api_error.error.code.as_str() {
                    "insufficient_funds" => Err(ClientError::InsufficientFunds {
                        balance: detail("balance"),
                        required: detail("required"),
                    }),
                    "insufficient_points" => Err(ClientError::InsufficientPoints {
                        balance: detail("balance"),
                        required: detail("required"),
                    }),
                    "unauthorized" => Err(ClientError::Unauthorized),
                    "not_found" => Err(ClientError::NotFound(api_error.error.message)),
                    code => {
                        tracing::debug!(code, status = status.as_u16(), "API error");
                        Err(ClientError::Api {
                            code: code.to_string(),
                            message: api_error.error.message,
                            status: status.as_u16(),
                        })
                    }
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Session token to start with.
    pub token: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            token: None,
        }
    }
}

impl ClientOptions {
    /// Create options that start out signed in.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }
}
