use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::Query;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clap::Parser;
use parkwatch_cli::app::App;
use parkwatch_cli::commands::Cli;
use parkwatch_cli::error::CliError;
use parkwatch_client::ClientError;
use parkwatch_core::ParkwatchConfig;
use serde_json::{json, Value};

const TOKEN: &str = "token-1";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some("Bearer token-1")
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "No token" }))).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "secret" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response();
    }
    (
        [(header::SET_COOKIE, "refreshToken=r-1; Path=/; HttpOnly")],
        Json(json!({ "message": "Login successful", "accessToken": TOKEN })),
    )
        .into_response()
}

async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logged out" }))
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "user": { "_id": "u1", "username": "alice", "role": "admin", "businessId": "biz-1" }
    }))
    .into_response()
}

async fn areas(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([{ "_id": "a1", "name": "Lot A", "capacity": 120, "location": "North gate" }]))
        .into_response()
}

async fn staff(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if query.get("businessId").map(String::as_str) != Some("biz-1") {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "businessId" }))).into_response();
    }
    Json(json!({
        "staff": [{
            "_id": "s1", "username": "bob", "firstName": "Bob", "lastName": "Tran",
            "email": "bob@example.com", "role": "user"
        }],
        "pagination": { "currentPage": 1, "totalPages": 1, "totalStaff": 1, "limit": 10 }
    }))
    .into_response()
}

async fn blacklist_check(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let listed = query.get("plateNumber").map(String::as_str) == Some("51A12345");
    Json(json!({
        "isBlacklisted": listed,
        "data": listed.then(|| json!({
            "_id": "b1", "businessId": "biz-1", "plateNumber": "51A12345", "reason": "unpaid fees"
        }))
    }))
    .into_response()
}

async fn qa(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        { "keyword": "peak", "question": "When is the peak hour?" },
        { "keyword": "capacity", "question": "How full is Lot A?" }
    ]))
    .into_response()
}

async fn update_name(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body != json!({ "firstName": "Alice", "lastName": "Tran", "address": "12 Le Loi" }) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": body }))).into_response();
    }
    Json(json!({ "message": "Name updated successfully" })).into_response()
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/parking/area", get(areas))
        .route("/api/staff/list-staff", get(staff))
        .route("/api/blacklist/check", get(blacklist_check))
        .route("/api/qa", get(qa))
        .route("/api/account/update-name", put(update_name));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/", addr)
}

fn config(api_base_url: String, session: PathBuf) -> ParkwatchConfig {
    let mut config = ParkwatchConfig::default();
    config.backend.api_base_url = api_base_url;
    config.session.path = Some(session);
    config
}

/// One CLI invocation: a fresh app and a fresh client every time.
async fn parkwatch(config: &ParkwatchConfig, args: &[&str]) -> Result<String, CliError> {
    let argv = std::iter::once("parkwatch").chain(args.iter().copied());
    let cli = Cli::try_parse_from(argv).unwrap();
    App::with_config(cli, config.clone()).execute().await
}

#[tokio::test]
async fn session_survives_between_invocations() {
    let base = spawn_backend().await;
    let dir = std::env::temp_dir().join(format!("parkwatch-cli-flow-{}", std::process::id()));
    let config = config(base, dir.join("session.json"));

    let err = parkwatch(&config, &["whoami"]).await.unwrap_err();
    assert!(matches!(err, CliError::Client(ClientError::NotAuthenticated)));

    let err = parkwatch(&config, &["login", "-u", "alice", "-p", "wrong"])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CliError::Client(ClientError::Validation { status: 400, .. })
    ));

    let out = parkwatch(&config, &["login", "-u", "alice", "-p", "secret"])
        .await
        .unwrap();
    assert_eq!(out, "Login successful");

    let out = parkwatch(&config, &["areas", "list"]).await.unwrap();
    assert_eq!(out, "a1  Lot A  ?/120  North gate");

    let out = parkwatch(&config, &["blacklist", "check", " 51a12345 "])
        .await
        .unwrap();
    assert_eq!(out, "51A12345 is blacklisted: unpaid fees");

    // Business id comes from the logged-in user.
    let out = parkwatch(&config, &["staff", "list"]).await.unwrap();
    assert!(out.starts_with("s1  bob  Bob Tran"), "{}", out);
    assert!(out.ends_with("page 1/1 (1 total)"), "{}", out);

    let out = parkwatch(&config, &["suggest", "peak", "--format", "json"])
        .await
        .unwrap();
    let items: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(items[0]["question"], "When is the peak hour?");

    let out = parkwatch(&config, &["logout"]).await.unwrap();
    assert_eq!(out, "Logged out");
    let err = parkwatch(&config, &["areas", "list"]).await.unwrap_err();
    assert!(matches!(err, CliError::Client(ClientError::NotAuthenticated)));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn config_show_prints_effective_settings() {
    let config = config(
        "http://127.0.0.1:9/api/".to_string(),
        std::env::temp_dir().join("parkwatch-cli-unused.json"),
    );
    let out = parkwatch(&config, &["config", "show", "--format", "json"])
        .await
        .unwrap();
    let shown: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(shown["backend"]["api_base_url"], "http://127.0.0.1:9/api/");
    assert_eq!(shown["realtime"]["max_attempts"], 5);
}

#[tokio::test]
async fn account_update_sends_profile_fields() {
    let base = spawn_backend().await;
    let dir = std::env::temp_dir().join(format!("parkwatch-cli-account-{}", std::process::id()));
    let config = config(base, dir.join("session.json"));

    parkwatch(&config, &["login", "-u", "alice", "-p", "secret"])
        .await
        .unwrap();
    let out = parkwatch(
        &config,
        &[
            "account", "update", "--first-name", "Alice", "--last-name", "Tran", "--address",
            "12 Le Loi",
        ],
    )
    .await
    .unwrap();
    assert_eq!(out, "Name updated successfully");

    let err = parkwatch(
        &config,
        &["account", "update", "--first-name", "Alice", "--last-name", " "],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CliError::Client(ClientError::Argument(_))));

    let _ = std::fs::remove_dir_all(dir);
}
