//! REST Client Integration Tests
//!
//! Run the REST client against an axum server that mimics the platform API.
//!
//! Run with: cargo test -p integration-tests --test rest_tests

use axum::extract::{OriginalUri, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use cord_common::RestConfig;
use cord_core::{CreateMessage, Embed, Snowflake};
use cord_rest::{LoginOutcome, RestClient, RestError};
use integration_tests::{spawn_api, MockApi, Recorder};
use serde_json::{json, Value};

const TOKEN: &str = "user-token";

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

// ============================================================================
// Mock handlers
// ============================================================================

async fn create_message(
    State(recorder): State<Recorder>,
    OriginalUri(uri): OriginalUri,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorder.record(uri.path(), authorization(&headers), body.clone());
    Json(json!({
        "id": "900",
        "channel_id": channel_id,
        "author": { "id": "1", "username": "cord" },
        "content": body["content"].as_str().unwrap_or_default(),
    }))
}

async fn typing(State(recorder): State<Recorder>, OriginalUri(uri): OriginalUri, headers: HeaderMap) -> StatusCode {
    recorder.record(uri.path(), authorization(&headers), Value::Null);
    StatusCode::NO_CONTENT
}

async fn create_thread(
    State(recorder): State<Recorder>,
    OriginalUri(uri): OriginalUri,
    Path((channel_id, _message_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    recorder.record(uri.path(), authorization(&headers), body.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "id": "950", "name": body["name"].clone(), "parent_id": channel_id, "type": 11 })),
    )
}

async fn accept_invite(
    State(recorder): State<Recorder>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    recorder.record(uri.path(), authorization(&headers), body);
    if code == "expired" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Unknown Invite", "code": 10006 })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "code": code,
            "guild": { "id": "300", "name": "Rustaceans" },
            "channel": { "id": "301", "name": "general" },
        })),
    )
}

async fn login(State(recorder): State<Recorder>, OriginalUri(uri): OriginalUri, Json(body): Json<Value>) -> impl IntoResponse {
    recorder.record(uri.path(), None, body.clone());
    match body["login"].as_str().unwrap_or_default() {
        "mfa@example.com" => (
            StatusCode::OK,
            Json(json!({ "token": null, "mfa": true, "ticket": "ticket-1" })),
        ),
        "captcha@example.com" => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "captcha_key": ["captcha-required"], "captcha_sitekey": "site-key" })),
        ),
        "wrong@example.com" => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid Form Body", "code": 50035 })),
        ),
        _ => (StatusCode::OK, Json(json!({ "token": TOKEN, "user_id": "1" }))),
    }
}

async fn totp(State(recorder): State<Recorder>, OriginalUri(uri): OriginalUri, Json(body): Json<Value>) -> impl IntoResponse {
    recorder.record(uri.path(), None, body.clone());
    if body["code"] == "123456" && body["ticket"] == "ticket-1" {
        (StatusCode::OK, Json(json!({ "token": "mfa-token" })))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid two-factor code", "code": 60008 })),
        )
    }
}

async fn start() -> (MockApi, Recorder, RestClient) {
    let recorder = Recorder::default();
    let routes = Router::new()
        .route("/channels/:channel_id/messages", post(create_message))
        .route("/channels/:channel_id/typing", post(typing))
        .route("/channels/:channel_id/messages/:message_id/threads", post(create_thread))
        .route("/invites/:code", post(accept_invite))
        .route("/auth/login", post(login))
        .route("/auth/mfa/totp", post(totp))
        .with_state(recorder.clone());

    let api = spawn_api(Router::new().nest("/api/v9", routes)).await.unwrap();
    let client = RestClient::new(&RestConfig {
        base_url: api.base_url(),
        timeout_secs: 5,
    })
    .unwrap();

    (api, recorder, client)
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_send_plain_message() {
    let (_api, recorder, client) = start().await;
    let client = client.with_token(TOKEN);

    let message = client.send_message(Snowflake::new(42), "hello").await.unwrap();
    assert_eq!(message.id.get(), 900);
    assert_eq!(message.channel_id.get(), 42);
    assert_eq!(message.content, "hello");

    let request = recorder.last().unwrap();
    assert_eq!(request.path, "/api/v9/channels/42/messages");
    assert_eq!(request.authorization.as_deref(), Some(TOKEN));
    assert_eq!(request.body, json!({ "content": "hello" }));
}

#[tokio::test]
async fn test_send_embed_message() {
    let (_api, recorder, client) = start().await;
    let client = client.with_token(TOKEN);

    let body = CreateMessage::default().with_embed(Embed::new().with_title("Status").with_color(0x00ff00));
    client.send_message(Snowflake::new(42), body).await.unwrap();

    let request = recorder.last().unwrap();
    assert!(request.body.get("content").is_none());
    assert_eq!(request.body["embeds"][0]["title"], "Status");
    assert_eq!(request.body["embeds"][0]["color"], 0x00ff00);
}

#[tokio::test]
async fn test_send_typing_expects_no_content() {
    let (_api, recorder, client) = start().await;
    let client = client.with_token(TOKEN);

    client.send_typing(Snowflake::new(7)).await.unwrap();
    let request = recorder.last().unwrap();
    assert_eq!(request.path, "/api/v9/channels/7/typing");
    assert_eq!(request.authorization.as_deref(), Some(TOKEN));
}

#[tokio::test]
async fn test_create_thread() {
    let (_api, recorder, client) = start().await;
    let client = client.with_token(TOKEN);

    let thread = client
        .create_thread(Snowflake::new(10), Snowflake::new(20), "discussion", 1440)
        .await
        .unwrap();
    assert_eq!(thread.id.get(), 950);
    assert_eq!(thread.name.as_deref(), Some("discussion"));
    assert_eq!(thread.parent_id, Some(Snowflake::new(10)));

    let request = recorder.last().unwrap();
    assert_eq!(request.path, "/api/v9/channels/10/messages/20/threads");
    assert_eq!(
        request.body,
        json!({ "name": "discussion", "type": 11, "auto_archive_duration": 1440, "location": "Message" })
    );
}

#[tokio::test]
async fn test_requests_without_token_never_leave() {
    let (_api, recorder, client) = start().await;

    let err = client.send_message(Snowflake::new(1), "hi").await.unwrap_err();
    assert!(matches!(err, RestError::MissingToken));
    let err = client.join_guild("abc").await.unwrap_err();
    assert!(matches!(err, RestError::MissingToken));
    assert!(recorder.requests().is_empty());
}

// ============================================================================
// Invites
// ============================================================================

#[tokio::test]
async fn test_join_guild_from_url() {
    let (_api, recorder, client) = start().await;
    let client = client.with_token(TOKEN);

    let invite = client.join_guild("https://discord.gg/rust").await.unwrap();
    assert_eq!(invite.code, "rust");
    assert_eq!(invite.guild.unwrap().name, "Rustaceans");

    let request = recorder.last().unwrap();
    assert_eq!(request.path, "/api/v9/invites/rust");
    assert_eq!(request.body, json!({}));
}

#[tokio::test]
async fn test_join_guild_api_error() {
    let (_api, _recorder, client) = start().await;
    let client = client.with_token(TOKEN);

    let err = client.join_guild("expired").await.unwrap_err();
    match err {
        RestError::Api { status, message } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(message, "Unknown Invite");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_guild_invalid_invite() {
    let (_api, recorder, client) = start().await;
    let client = client.with_token(TOKEN);

    let err = client.join_guild("https://discord.gg/").await.unwrap_err();
    assert!(matches!(err, RestError::InvalidInvite(_)));
    assert!(recorder.requests().is_empty());
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_returns_token() {
    let (_api, recorder, client) = start().await;

    let outcome = client.login("user@example.com", "hunter2").await.unwrap();
    assert_eq!(outcome, LoginOutcome::Token(TOKEN.to_string()));

    let request = recorder.last().unwrap();
    assert_eq!(request.path, "/api/v9/auth/login");
    assert_eq!(request.authorization, None);
    assert_eq!(
        request.body,
        json!({
            "login": "user@example.com",
            "password": "hunter2",
            "undelete": false,
            "captcha_key": null,
            "login_source": null,
            "gift_code_sku_id": null,
        })
    );
}

#[tokio::test]
async fn test_login_with_totp() {
    let (_api, _recorder, client) = start().await;

    let outcome = client.login("mfa@example.com", "hunter2").await.unwrap();
    let LoginOutcome::MfaRequired { ticket } = outcome else {
        panic!("expected MFA, got {outcome:?}");
    };
    assert_eq!(ticket, "ticket-1");

    let err = client.submit_totp("000000", &ticket).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    let token = client.submit_totp("123456", &ticket).await.unwrap();
    assert_eq!(token, "mfa-token");

    let mut client = client;
    client.set_token(token);
    assert_eq!(client.token(), Some("mfa-token"));
}

#[tokio::test]
async fn test_login_captcha_and_rejection() {
    let (_api, _recorder, client) = start().await;

    let outcome = client.login("captcha@example.com", "hunter2").await.unwrap();
    assert_eq!(
        outcome,
        LoginOutcome::CaptchaRequired {
            sitekey: Some("site-key".to_string())
        }
    );

    let err = client.login("wrong@example.com", "hunter2").await.unwrap_err();
    match err {
        RestError::Api { status, message } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(message, "Invalid Form Body");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}
