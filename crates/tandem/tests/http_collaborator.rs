//! The HTTP collaborator against an in-process mock of the web API.

use std::net::SocketAddr;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tandem::{AuthError, ClientHandle, HttpCollaborator, TandemClient, TandemError};
use tandem_state::MemorySurface;
use tandem_protocol::{ParticipantId, Username};

fn session_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("session="))
        .find(|user| !user.is_empty())
        .map(str::to_owned)
}

async fn get_ip() -> Json<Value> {
    Json(json!({ "ip": "192.0.2.7" }))
}

async fn session_status(headers: HeaderMap) -> Json<Value> {
    match session_user(&headers) {
        Some(user) => Json(json!({ "loggedIn": true, "username": user })),
        None => Json(json!({ "loggedIn": false })),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret" {
        let cookie = format!("session={}; Path=/", body["username"].as_str().unwrap_or(""));
        ([(header::SET_COOKIE, cookie)], Json(json!({ "message": "ok" }))).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid username or password" })),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        (StatusCode::CONFLICT, "Username already exists\n").into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn logout() -> Response {
    ([(header::SET_COOKIE, "session=; Path=/")], StatusCode::OK).into_response()
}

async fn start_api() -> String {
    let app = Router::new()
        .route("/get-ip", get(get_ip))
        .route("/session-status", get(session_status))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_network_identity() {
    let api = HttpCollaborator::new(start_api().await).unwrap();
    let ip = api.network_identity().await.unwrap();
    assert_eq!(ip, ParticipantId::from("192.0.2.7"));
}

#[tokio::test]
async fn test_login_sets_username() {
    let api = HttpCollaborator::new(start_api().await).unwrap();

    let before = api.resolve().await.unwrap();
    assert_eq!(before.username, None);

    api.login("alice", "secret").await.unwrap();
    let after = api.resolve().await.unwrap();
    assert_eq!(after.participant, ParticipantId::from("192.0.2.7"));
    assert_eq!(after.username, Some(Username::from("alice")));

    api.logout().await.unwrap();
    assert!(!api.session_status().await.unwrap().logged_in());
}

#[tokio::test]
async fn test_bad_login_surfaces_server_message() {
    let api = HttpCollaborator::new(start_api().await).unwrap();
    let err = api.login("alice", "wrong").await.unwrap_err();
    match err {
        AuthError::Rejected { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid username or password");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plain_text_rejection() {
    let api = HttpCollaborator::new(start_api().await).unwrap();
    let err = api.register("taken", "secret").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Rejected { status: 409, ref message } if message == "Username already exists"
    ));
}

#[tokio::test]
async fn test_builder_resolves_identity() {
    let api = HttpCollaborator::new(start_api().await).unwrap();
    api.login("bob", "secret").await.unwrap();

    // No broker is listening; the client starts anyway and keeps retrying.
    let client = TandemClient::builder()
        .config(tandem::ClientConfig::default().broker_url("ws://127.0.0.1:9/ws"))
        .resolve_identity(&api)
        .await
        .unwrap()
        .start(tandem_state::MemorySurface::new())
        .unwrap();

    let session = client.shutdown().await.unwrap();
    let identity = session.dispatcher().identity();
    assert_eq!(identity.participant, ParticipantId::from("192.0.2.7"));
    assert_eq!(identity.username, Some(Username::from("bob")));
}

/// A client that never reaches a broker; only its identity matters here.
async fn offline_client(api: &HttpCollaborator) -> ClientHandle<MemorySurface> {
    TandemClient::builder()
        .config(tandem::ClientConfig::default().broker_url("ws://127.0.0.1:9/ws"))
        .resolve_identity(api)
        .await
        .unwrap()
        .start(MemorySurface::new())
        .unwrap()
}

#[tokio::test]
async fn test_client_login_adopts_session_username() {
    let api = HttpCollaborator::new(start_api().await).unwrap();
    let client = offline_client(&api).await;

    let username = client.login(&api, "carol", "secret").await.unwrap();
    assert_eq!(username, Some(Username::from("carol")));

    let session = client.shutdown().await.unwrap();
    assert_eq!(
        session.dispatcher().identity().username,
        Some(Username::from("carol"))
    );
}

#[tokio::test]
async fn test_client_refused_login_keeps_identity_and_reports_message() {
    let api = HttpCollaborator::new(start_api().await).unwrap();
    let client = offline_client(&api).await;

    let err = client.login(&api, "carol", "wrong").await.unwrap_err();
    match err {
        TandemError::Auth(AuthError::Rejected { message, .. }) => {
            assert_eq!(message, "Invalid username or password");
        }
        other => panic!("expected a rejected login, got {other:?}"),
    }

    let err = client.register(&api, "taken", "secret").await.unwrap_err();
    assert!(matches!(
        err,
        TandemError::Auth(AuthError::Rejected { status: 409, .. })
    ));

    let session = client.shutdown().await.unwrap();
    assert_eq!(session.dispatcher().identity().username, None);
}

#[tokio::test]
async fn test_client_register_then_login_then_logout() {
    let api = HttpCollaborator::new(start_api().await).unwrap();
    let client = offline_client(&api).await;

    // Registering does not open a session on this server.
    assert_eq!(client.register(&api, "erin", "secret").await.unwrap(), None);
    assert_eq!(
        client.login(&api, "erin", "secret").await.unwrap(),
        Some(Username::from("erin"))
    );

    client.logout(&api).await.unwrap();
    assert!(!api.session_status().await.unwrap().logged_in());

    let session = client.shutdown().await.unwrap();
    assert_eq!(session.dispatcher().identity().username, None);
}
