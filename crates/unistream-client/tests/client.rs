//! Client tests against a mocked service.

use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unistream_client::{CheckoutRequest, ClientError, UnistreamClient};
use unistream_core::{GiftId, TransactionId, TransactionStatus, UserId};

async fn signed_in(server: &MockServer) -> UnistreamClient {
    UnistreamClient::new(server.uri())
        .unwrap()
        .with_token("test-token")
}

#[tokio::test]
async fn login_returns_a_session() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .and(body_json(json!({"email": "ana@ulima.edu.pe", "password": "secret123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-abc",
            "user": {
                "id": user_id,
                "email": "ana@ulima.edu.pe",
                "name": "Ana",
                "role": "fan",
                "description": null,
                "coins": 120,
                "points": 40,
                "level": {"level": 1, "points_in_level": 40, "points_to_next_level": 460},
                "level_threshold": 500,
                "streamer_level": 1,
                "total_live_hours": 0.0,
                "is_live": false
            }
        })))
        .mount(&server)
        .await;

    let client = UnistreamClient::new(server.uri()).unwrap();
    let session = client.login("ana@ulima.edu.pe", "secret123").await.unwrap();
    assert_eq!(session.token, "jwt-abc");
    assert_eq!(session.user.id, user_id);
    assert_eq!(session.user.coins, 120);
}

#[tokio::test]
async fn verify_then_unverified_login_is_reported() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();

    Mock::given(method("POST"))
        .and(path("/v1/auth/verify"))
        .and(body_json(json!({"token": "abc123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Account verified.",
            "user": {
                "id": user_id,
                "email": "ana@ulima.edu.pe",
                "name": "Ana",
                "role": "fan",
                "is_verified": true,
                "coins": 100,
                "points": 0,
                "level_threshold": 500,
                "streamer_level": 1,
                "total_live_hours": 0.0,
                "is_live": false
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "forbidden", "message": "verify your email before logging in"}
        })))
        .mount(&server)
        .await;

    let client = UnistreamClient::new(server.uri()).unwrap();
    let notice = client.verify("abc123").await.unwrap();
    assert!(notice.user.is_verified);
    assert_eq!(notice.user.coins, 100);

    match client.login("beto@ulima.edu.pe", "secret123").await {
        Err(ClientError::Api { code, status, .. }) => {
            assert_eq!(code, "forbidden");
            assert_eq!(status, 403);
        }
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn send_gift_carries_the_token() {
    let server = MockServer::start().await;
    let streamer = UserId::generate();
    let tx = TransactionId::generate();

    Mock::given(method("POST"))
        .and(path("/v1/gifts/send"))
        .and(bearer_token("test-token"))
        .and(body_json(json!({"streamer_id": streamer, "gift_id": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transaction_id": tx,
            "coins": 70,
            "points": 500,
            "xp_gained": 500,
            "level_up": true,
            "new_level": 2,
            "message": "You sent Fuego! You earned 500 XP."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = signed_in(&server)
        .await
        .send_gift(&streamer, GiftId(4))
        .await
        .unwrap();
    assert_eq!(receipt.transaction_id, tx);
    assert!(receipt.level_up);
    assert_eq!(receipt.new_level, 2);
}

#[tokio::test]
async fn insufficient_funds_is_typed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/gifts/send"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "code": "insufficient_funds",
                "message": "insufficient funds: balance=49, required=50",
                "details": {"balance": 49, "required": 50}
            }
        })))
        .mount(&server)
        .await;

    let err = signed_in(&server)
        .await
        .send_gift(&UserId::generate(), GiftId(4))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::InsufficientFunds {
            balance: 49,
            required: 50
        }
    ));
}

#[tokio::test]
async fn unknown_error_codes_keep_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/streams/stop"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": "invalid_state", "message": "not live"}
        })))
        .mount(&server)
        .await;

    let err = signed_in(&server).await.stop_stream().await.unwrap_err();
    match err {
        ClientError::Api {
            code,
            message,
            status,
        } => {
            assert_eq!(code, "invalid_state");
            assert_eq!(message, "not live");
            assert_eq!(status, 409);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_errors_are_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/store/packs"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = UnistreamClient::new(server.uri()).unwrap();
    let err = client.coin_packs().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 502, .. }));
}

#[tokio::test]
async fn unauthorized_and_not_found_are_typed() {
    let server = MockServer::start().await;
    let streamer = UserId::generate();

    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "unauthorized", "message": "Unauthorized"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/v1/subscriptions/{streamer}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "not_found", "message": "subscription not found"}
        })))
        .mount(&server)
        .await;

    let client = signed_in(&server).await;
    assert!(matches!(client.me().await, Err(ClientError::Unauthorized)));
    assert!(matches!(
        client.unsubscribe(&streamer).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn channel_gifts_use_the_query() {
    let server = MockServer::start().await;
    let streamer = UserId::generate();

    Mock::given(method("GET"))
        .and(path("/v1/store/gifts"))
        .and(query_param("streamer_id", streamer.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gifts": [
                {"id": 1, "name": "Rosa", "cost": 5, "emoji": "🌹", "owner_id": null},
                {"id": 11, "name": "Cafecito", "cost": 15, "emoji": "☕", "owner_id": streamer}
            ]
        })))
        .mount(&server)
        .await;

    let client = UnistreamClient::new(server.uri()).unwrap();
    let gifts = client.gifts(Some(&streamer)).await.unwrap();
    assert_eq!(gifts.len(), 2);
    assert!(gifts[0].is_default());
    assert_eq!(gifts[1].owner_id, Some(streamer));
}

#[tokio::test]
async fn checkout_then_complete() {
    let server = MockServer::start().await;
    let tx = TransactionId::generate();

    Mock::given(method("POST"))
        .and(path("/v1/payments/checkout"))
        .and(body_json(json!({"kind": "coins", "pack_id": 2})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "transaction_id": tx,
            "kind": "PURCHASE",
            "amount": 550,
            "price_cents": 2500,
            "points": 60,
            "checkout_url": format!("http://localhost:5173/checkout/{tx}")
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/payments/complete"))
        .and(body_json(json!({"transaction_id": tx})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transaction_id": tx,
            "kind": "PURCHASE",
            "status": "COMPLETED",
            "coins": 550,
            "points": 60,
            "target_streamer_id": null,
            "already_completed": false,
            "subscription_created": false
        })))
        .mount(&server)
        .await;

    let client = signed_in(&server).await;
    let checkout = client
        .checkout(&CheckoutRequest::Coins { pack_id: 2 })
        .await
        .unwrap();
    assert_eq!(checkout.price_cents, 2500);

    let done = client.complete_payment(&checkout.transaction_id).await.unwrap();
    assert_eq!(done.status, TransactionStatus::Completed);
    assert_eq!(done.coins, 550);
    assert!(!done.already_completed);
}

#[tokio::test]
async fn signed_out_client_does_not_call_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = UnistreamClient::new(server.uri()).unwrap();
    assert!(matches!(client.me().await, Err(ClientError::MissingToken)));
}
