use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use maintenance_server::config::Config;
use maintenance_server::platform::StatusQuery;
use maintenance_server::service::Maintenance;
use maintenance_server::sessions::SessionPlatform;
use maintenance_server::settings::DEFAULT_CONFIG;
use maintenance_server::state::MaintenanceState;
use maintenance_server::{AppState, create_app};
use maintenance_store::{AccessControlList, ConfigDocument, MemoryBackend};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;
// for `oneshot` method

const TOKEN: &str = "test-admin-token";
const STEVE: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";
const ALEX: &str = "853c80ef-3c37-49fd-aa49-938b674adae6";

struct TestServer {
    app: axum::Router,
    service: Arc<Maintenance>,
    sessions: Arc<SessionPlatform>,
}

/// Helper to create the app over in-memory documents
fn setup(config_yaml: &str, admin_token: Option<&str>) -> TestServer {
    let settings = ConfigDocument::load(Box::new(MemoryBackend::from_yaml(config_yaml).unwrap()))
        .expect("Failed to load config document");
    let whitelist = ConfigDocument::load(Box::new(MemoryBackend::from_yaml("").unwrap()))
        .expect("Failed to load whitelist document");

    let whitelist = Arc::new(AccessControlList::load(whitelist).unwrap());
    let sessions = Arc::new(SessionPlatform::new(whitelist.clone(), 20));
    let service = Arc::new(Maintenance::new(
        MaintenanceState::load(settings),
        whitelist,
        sessions.clone(),
    ));

    let config = Config::default();
    let app = create_app(
        AppState {
            service: service.clone(),
            sessions: sessions.clone(),
            admin_token: admin_token.map(str::to_string),
            task_timeout: Duration::from_secs(5),
        },
        config.request_body_limit,
        config.request_timeout,
    );
    TestServer {
        app,
        service,
        sessions,
    }
}

/// Helper with the bundled defaults and an admin token
fn default_server() -> TestServer {
    setup(DEFAULT_CONFIG, Some(TOKEN))
}

/// Helper to send a request and get response
async fn send_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut request_builder = Request::builder().uri(uri).method(method);

    // Add Authorization header if provided
    if let Some(token) = auth_token {
        request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
    }

    // Build request with body
    let request = if let Some(json_body) = body {
        request_builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json_body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    // Try to parse as JSON, or return empty object
    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let server = default_server();
    let (status, _body) = send_request(&server.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoint_with_post_method() {
    let server = default_server();
    let (status, _body) = send_request(&server.app, "POST", "/health", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_status_reports_idle_server() {
    let server = default_server();

    let (status, body) = send_request(&server.app, "GET", "/status", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maintenance"], false);
    assert_eq!(body["timer_message"], "§7-");
    assert!(body.get("timer").is_none());
    assert_eq!(body["online"], 0);
    assert_eq!(body["max"], 20);
}

#[tokio::test]
async fn test_status_shows_running_timer() {
    let server = default_server();
    server.service.start_timer(90, true);

    let (status, body) = send_request(&server.app, "GET", "/status", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer_message"], "§700:01:30");
    assert_eq!(body["timer"]["seconds_remaining"], 90);
    assert_eq!(body["timer"]["target_state"], true);
    assert_eq!(body["timer"]["recurring"], false);
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

#[tokio::test]
async fn test_enabling_keeps_sessions_by_default() {
    let server = default_server();
    send_request(
        &server.app,
        "POST",
        "/join",
        Some(json!({ "uuid": STEVE, "name": "Steve" })),
        None,
    )
    .await;

    server.service.set_maintenance(true);

    assert!(server.sessions.is_online(STEVE.parse().unwrap()).await);
}

#[tokio::test]
async fn test_status_ping_message_when_enabled() {
    let config = DEFAULT_CONFIG.replace("enable-ping-messages: false", "enable-ping-messages: true");
    let server = setup(&config, None);

    let (_, body) = send_request(&server.app, "GET", "/status", None, None).await;
    assert!(body["ping_message"].as_str().unwrap().contains("maintenance"));

    let server = default_server();
    let (_, body) = send_request(&server.app, "GET", "/status", None, None).await;
    assert!(body.get("ping_message").is_none());
}

#[tokio::test]
async fn test_join_allowed_without_maintenance() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/join",
        Some(json!({ "uuid": STEVE, "name": "Steve" })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert!(body.get("message").is_none());
    assert!(server.sessions.is_online(STEVE.parse().unwrap()).await);
}

#[tokio::test]
async fn test_join_refused_during_maintenance() {
    let server = default_server();
    server.service.set_maintenance(true);

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/join",
        Some(json!({ "uuid": STEVE, "name": "Steve" })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert!(body["message"].as_str().unwrap().contains("maintenance"));
    assert!(!server.sessions.is_online(STEVE.parse().unwrap()).await);
}

#[tokio::test]
async fn test_whitelisted_player_joins_during_maintenance() {
    let server = default_server();
    server
        .service
        .whitelist()
        .add(ALEX.parse().unwrap(), "Alex")
        .unwrap();
    server.service.set_maintenance(true);

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/join",
        Some(json!({ "uuid": ALEX, "name": "Alex" })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn test_join_rejects_bad_input() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/join",
        Some(json!({ "uuid": "not-a-uuid", "name": "Steve" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not-a-uuid"));

    let (status, _body) = send_request(
        &server.app,
        "POST",
        "/join",
        Some(json!({ "uuid": STEVE, "name": "Bad-Name" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leave_removes_session() {
    let server = default_server();
    send_request(
        &server.app,
        "POST",
        "/join",
        Some(json!({ "uuid": STEVE, "name": "Steve" })),
        None,
    )
    .await;

    let (status, _body) =
        send_request(&server.app, "POST", "/leave", Some(json!({ "uuid": STEVE })), None).await;

    assert_eq!(status, StatusCode::OK);
    let (_, body) = send_request(&server.app, "GET", "/status", None, None).await;
    assert_eq!(body["online"], 0);
}

#[tokio::test]
async fn test_enabling_kicks_non_whitelisted_sessions() {
    let config = DEFAULT_CONFIG.replace("kick-on-maintenance: false", "kick-on-maintenance: true");
    let server = setup(&config, Some(TOKEN));
    server
        .service
        .whitelist()
        .add(ALEX.parse().unwrap(), "Alex")
        .unwrap();
    for (uuid, name) in [(STEVE, "Steve"), (ALEX, "Alex")] {
        send_request(
            &server.app,
            "POST",
            "/join",
            Some(json!({ "uuid": uuid, "name": name })),
            None,
        )
        .await;
    }

    let (status, _body) = send_request(
        &server.app,
        "POST",
        "/maintenance",
        Some(json!({ "enabled": true })),
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!server.sessions.is_online(STEVE.parse().unwrap()).await);
    assert!(server.sessions.is_online(ALEX.parse().unwrap()).await);
}

// =============================================================================
// ADMIN AUTH
// =============================================================================

#[tokio::test]
async fn test_admin_route_without_token() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/maintenance",
        Some(json!({ "enabled": true })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    assert!(!server.service.is_maintenance());
}

#[tokio::test]
async fn test_admin_route_with_wrong_token() {
    let server = default_server();

    let (status, _body) = send_request(
        &server.app,
        "POST",
        "/timer/cancel",
        None,
        Some("wrong-token"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_open_without_configured_token() {
    let server = setup(DEFAULT_CONFIG, None);

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/maintenance",
        Some(json!({ "enabled": true })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert!(server.service.is_maintenance());
}

// =============================================================================
// TIMERS
// =============================================================================

#[tokio::test]
async fn test_start_timer() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/timer/start",
        Some(json!({ "seconds": 30, "enable": true })),
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seconds_remaining"], 30);
    assert_eq!(body["target_state"], true);
    assert_eq!(body["recurring"], false);
}

#[tokio::test]
async fn test_start_timer_towards_current_mode_conflicts() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/timer/start",
        Some(json!({ "seconds": 30, "enable": false })),
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Maintenance is already disabled");
}

#[tokio::test]
async fn test_start_timer_rejects_non_positive_duration() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/timer/start",
        Some(json!({ "seconds": 0, "enable": true })),
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "seconds must be positive (got 0)");
    assert_eq!(server.service.timer_status(), None);
}

#[tokio::test]
async fn test_schedule_and_cancel() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/timer/schedule",
        Some(json!({ "delay": 60, "duration": 30 })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seconds_remaining"], 60);
    assert_eq!(body["recurring"], true);

    let (status, body) =
        send_request(&server.app, "POST", "/timer/cancel", None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);

    let (_, body) = send_request(&server.app, "POST", "/timer/cancel", None, Some(TOKEN)).await;
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn test_manual_mode_change_cancels_timer() {
    let server = default_server();
    server.service.start_timer(120, true);

    let (status, _body) = send_request(
        &server.app,
        "POST",
        "/maintenance",
        Some(json!({ "enabled": true })),
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(server.service.is_maintenance());
    assert_eq!(server.service.timer_status(), None);
}

// =============================================================================
// WHITELIST
// =============================================================================

#[tokio::test]
async fn test_whitelist_add_list_remove() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "POST",
        "/whitelist",
        Some(json!({ "uuid": STEVE, "name": "Steve" })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["added"], true);

    // Adding again is not an error
    let (status, body) = send_request(
        &server.app,
        "POST",
        "/whitelist",
        Some(json!({ "uuid": STEVE, "name": "Steve" })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], false);

    let (status, body) = send_request(&server.app, "GET", "/whitelist", None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "uuid": STEVE, "name": "Steve" }]));

    let (status, _body) = send_request(
        &server.app,
        "DELETE",
        &format!("/whitelist/{STEVE}"),
        None,
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!server.service.whitelist().contains(STEVE.parse::<Uuid>().unwrap()));
}

#[tokio::test]
async fn test_whitelist_remove_unknown_player() {
    let server = default_server();

    let (status, body) = send_request(
        &server.app,
        "DELETE",
        &format!("/whitelist/{ALEX}"),
        None,
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(ALEX));
}

#[tokio::test]
async fn test_reload_picks_up_defaults() {
    let server = default_server();

    let (status, _body) = send_request(&server.app, "POST", "/reload", None, Some(TOKEN)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!server.service.is_maintenance());
}
