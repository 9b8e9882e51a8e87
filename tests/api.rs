//! End-to-end API tests: the full router over an in-memory SQLite store.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use studyhall::admin::seed_admin_account;
use studyhall::auth::jwt::verify_token;
use studyhall::config::AppConfig;
use studyhall::db::create_pool;
use studyhall::{build_router, AppState};

struct TestApp {
    router: Router,
    state: AppState,
    // Holds the upload directory alive for the test's duration.
    _upload_dir: tempfile::TempDir,
}

async fn spawn_app() -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = AppConfig::for_tests(upload_dir.path().to_str().unwrap());
    let pool = create_pool(&config.database).await.unwrap();
    seed_admin_account(&pool, &config).await.unwrap();

    let state = AppState::new(config, pool);
    TestApp {
        router: build_router(state.clone()),
        state,
        _upload_dir: upload_dir,
    }
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn signup(app: &TestApp, username: &str, email: &str, password: &str) -> Value {
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/signup",
            json!({ "username": username, "email": email, "password": password }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    body
}

async fn login_token(app: &TestApp, email: &str, password: &str) -> String {
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/login",
            json!({ "email": email, "password": password }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn admin_token(app: &TestApp) -> String {
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/admin/login",
            json!({
                "email": app.state.config.admin_email.clone(),
                "password": app.state.config.admin_password.clone(),
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

// =============================================================================
// Signup and login
// =============================================================================

#[tokio::test]
async fn signup_then_login_round_trips_identity() {
    let app = spawn_app().await;

    let body = signup(&app, "alice", "a@x.com", "pw1").await;
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["token"].is_string());

    // login yields a token whose claims decode to the same identity
    let token = login_token(&app, "a@x.com", "pw1").await;
    let claims = verify_token(&token, &app.state.config.jwt_secret).unwrap();
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(claims.role, None);

    // wrong password
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/login",
            json!({ "email": "a@x.com", "password": "wrong" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn signup_validates_and_rejects_duplicates() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/signup",
            json!({ "username": "alice", "email": "a@x.com" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");

    signup(&app, "alice", "a@x.com", "pw1").await;

    // same email, different username
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/signup",
            json!({ "username": "alice2", "email": "a@x.com", "password": "pw2" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");

    // same username, different email
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/signup",
            json!({ "username": "alice", "email": "a2@x.com", "password": "pw2" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn stored_password_is_never_plaintext() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;

    let user = studyhall::db::users::find_by_email(&app.state.pool, "a@x.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(user.password, "pw1");
    assert!(user.password.starts_with("$argon2"));
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = spawn_app().await;
    let (status, body) = send(
        &app.router,
        json_request("POST", "/api/login", json!({ "email": "a@x.com" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");
}

// =============================================================================
// Access middleware
// =============================================================================

#[tokio::test]
async fn profile_requires_and_echoes_token_claims() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;
    let token = login_token(&app, "a@x.com", "pw1").await;

    let (status, body) = send(&app.router, get_request("/api/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "a@x.com");

    let (status, body) = send(&app.router, get_request("/api/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access token required");

    let (status, body) = send(
        &app.router,
        get_request("/api/profile", Some("not-a-real-token")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = spawn_app().await;

    // Hand-craft a well-formed token that is already past its expiry.
    let now = chrono::Utc::now().timestamp();
    let claims = studyhall::auth::Claims {
        sub: 1,
        username: "alice".into(),
        email: "a@x.com".into(),
        role: None,
        iat: now - 86_401,
        exp: now - 1,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(app.state.config.jwt_secret.as_bytes()),
    )
    .unwrap();

    let (status, body) = send(&app.router, get_request("/api/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn admin_routes_enforce_role_not_just_validity() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;
    let user_token = login_token(&app, "a@x.com", "pw1").await;

    // Valid, unexpired, but role-less token: 403
    let (status, body) = send(
        &app.router,
        get_request("/api/admin/users", Some(&user_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient admin privileges");

    // No header at all: 401
    let (status, body) = send(&app.router, get_request("/api/admin/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Admin token required");
}

#[tokio::test]
async fn seeded_admin_can_log_in_and_list_users() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;

    let token = admin_token(&app).await;
    let claims = verify_token(&token, &app.state.config.jwt_secret).unwrap();
    assert!(claims.is_admin());

    let (status, body) = send(&app.router, get_request("/api/admin/users", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
    assert!(users[0].get("password").is_none());
}

#[tokio::test]
async fn admin_login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/admin/login",
            json!({ "email": app.state.config.admin_email.clone(), "password": "wrong" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid admin credentials");
}

// =============================================================================
// Progress tracking
// =============================================================================

#[tokio::test]
async fn progress_upsert_is_last_write_wins() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;
    let token = login_token(&app, "a@x.com", "pw1").await;

    for value in [40, 85] {
        let (status, body) = send(
            &app.router,
            json_request(
                "POST",
                "/api/progress",
                json!({ "chapterId": 3, "progress": value }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Progress saved successfully");
    }

    let (status, body) = send(&app.router, get_request("/api/progress", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["progress"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["chapter_id"], 3);
    assert_eq!(rows[0]["progress"], 85);

    let (status, _) = send(
        &app.router,
        json_request("POST", "/api/progress", json!({ "chapterId": 1, "progress": 1 }), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Content
// =============================================================================

fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let boundary = "testboundary0123456789";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                boundary, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn content_lifecycle_without_file() {
    let app = spawn_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/admin/content",
            &token,
            &[
                ("title", "Cell Structure Notes"),
                ("type", "note"),
                ("content", "The cell is the basic unit of life."),
                ("chapter_id", "1"),
                ("is_premium", "true"),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {}", body);
    assert_eq!(body["message"], "Content created successfully");
    assert!(body["fileUrl"].is_null());
    let id = body["id"].as_i64().unwrap();

    // Admin listing carries all columns, including updated_at.
    let (status, body) = send(
        &app.router,
        get_request("/api/admin/content?type=note", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["content"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].get("updated_at").is_some());

    // Public listing returns the premium row to an anonymous caller.
    let (status, body) = send(&app.router, get_request("/api/content", None)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["content"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], "note");
    assert_eq!(rows[0]["is_premium"], true);

    // Filters
    let (_, body) = send(&app.router, get_request("/api/content?type=video", None)).await;
    assert!(body["content"].as_array().unwrap().is_empty());
    let (_, body) = send(
        &app.router,
        get_request("/api/content?type=note&chapter_id=1", None),
    )
    .await;
    assert_eq!(body["content"].as_array().unwrap().len(), 1);

    // Delete removes the row; the second attempt is a 404.
    let uri = format!("/api/admin/content/{}", id);
    let mut request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Content deleted successfully");

    request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Content not found");
}

#[tokio::test]
async fn content_delete_removes_uploaded_file() {
    let app = spawn_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/admin/content",
            &token,
            &[("title", "Worksheet"), ("type", "worksheet")],
            Some(("worksheet.pdf", b"%PDF-1.4 fake")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {}", body);

    let file_url = body["fileUrl"].as_str().unwrap().to_string();
    assert!(file_url.starts_with("/uploads/"));
    assert!(file_url.ends_with(".pdf"));

    let stored = std::path::Path::new(&app.state.config.upload_dir)
        .join(file_url.strip_prefix("/uploads/").unwrap());
    assert!(stored.exists());

    let id = body["id"].as_i64().unwrap();
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/admin/content/{}", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!stored.exists());
}

#[tokio::test]
async fn content_create_requires_title_and_type() {
    let app = spawn_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app.router,
        multipart_request("/api/admin/content", &token, &[("title", "No type")], None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title and type are required");
}

#[tokio::test]
async fn premium_content_is_gated_but_static() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;
    let token = login_token(&app, "a@x.com", "pw1").await;

    let (status, body) = send(
        &app.router,
        get_request("/api/premium-content", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Premium content access granted");
    assert_eq!(body["content"].as_array().unwrap().len(), 3);

    let (status, _) = send(&app.router, get_request("/api/premium-content", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Admin views and user control
// =============================================================================

#[tokio::test]
async fn stats_aggregates_progress() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;
    let user_token = login_token(&app, "a@x.com", "pw1").await;

    for (chapter, value) in [(1, 50), (2, 100)] {
        send(
            &app.router,
            json_request(
                "POST",
                "/api/progress",
                json!({ "chapterId": chapter, "progress": value }),
                Some(&user_token),
            ),
        )
        .await;
    }

    let token = admin_token(&app).await;
    let (status, body) = send(&app.router, get_request("/api/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 1);
    assert_eq!(body["totalProgress"], 2);
    assert_eq!(body["averageProgress"], 75);
}

#[tokio::test]
async fn dashboard_joins_all_aggregates() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;
    login_token(&app, "a@x.com", "pw1").await;

    let token = admin_token(&app).await;
    let (status, body) = send(
        &app.router,
        get_request("/api/admin/dashboard", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 1);
    assert_eq!(body["totalAdmins"], 1);
    assert_eq!(body["totalContent"], 0);
    assert!(body["recentActivities"].is_array());
    assert!(body["activeSessions"].is_array());
    assert!(body["systemLogs"].is_array());
    let summary = body["userProgressSummary"].as_array().unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["username"], "alice");
}

#[tokio::test]
async fn login_leaves_activity_and_session_trail() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;
    login_token(&app, "a@x.com", "pw1").await;

    let token = admin_token(&app).await;

    // The recorder writes in the background; poll until the rows land.
    let mut activities = Value::Null;
    let mut sessions = Value::Null;
    for _ in 0..100 {
        let (_, body) = send(
            &app.router,
            get_request("/api/admin/activities", Some(&token)),
        )
        .await;
        activities = body["activities"].clone();
        let (_, body) = send(
            &app.router,
            get_request("/api/admin/sessions", Some(&token)),
        )
        .await;
        sessions = body["sessions"].clone();

        if !activities.as_array().unwrap().is_empty()
            && !sessions.as_array().unwrap().is_empty()
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let activities = activities.as_array().unwrap();
    assert!(!activities.is_empty(), "login activity never recorded");
    assert_eq!(activities[0]["action"], "LOGIN");
    assert_eq!(activities[0]["username"], "alice");

    let sessions = sessions.as_array().unwrap();
    assert!(!sessions.is_empty(), "login session never recorded");
    assert_eq!(sessions[0]["username"], "alice");
    // The stored token is not part of the admin view.
    assert!(sessions[0].get("token").is_none());
}

#[tokio::test]
async fn failed_login_leaves_warning_log() {
    let app = spawn_app().await;
    signup(&app, "alice", "a@x.com", "pw1").await;

    send(
        &app.router,
        json_request(
            "POST",
            "/api/login",
            json!({ "email": "a@x.com", "password": "wrong" }),
            None,
        ),
    )
    .await;

    let token = admin_token(&app).await;
    let mut logs = Value::Null;
    for _ in 0..100 {
        let (_, body) = send(
            &app.router,
            get_request("/api/admin/logs?level=WARNING", Some(&token)),
        )
        .await;
        logs = body["logs"].clone();
        if !logs.as_array().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let logs = logs.as_array().unwrap();
    assert!(!logs.is_empty(), "failed login never logged");
    assert_eq!(logs[0]["level"], "WARNING");
    assert!(logs[0]["message"]
        .as_str()
        .unwrap()
        .contains("Failed login attempt"));
}

#[tokio::test]
async fn user_control_actions() {
    let app = spawn_app().await;
    let body = signup(&app, "alice", "a@x.com", "pw1").await;
    let user_id = body["user"]["id"].as_i64().unwrap();
    let token = admin_token(&app).await;

    let control = |action: &str| {
        json_request(
            "POST",
            &format!("/api/admin/users/{}/control", user_id),
            json!({ "action": action }),
            Some(&token),
        )
    };

    // suspend
    let (status, body) = send(&app.router, control("suspend")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User suspended successfully");

    // reset_password: the temporary password becomes the real credential
    let (status, body) = send(&app.router, control("reset_password")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newPassword"], "temp123");
    login_token(&app, "a@x.com", "temp123").await;

    // unknown action
    let (status, body) = send(&app.router, control("explode")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid action");

    // delete, then the login fails and a second delete is a 404
    let (status, body) = send(&app.router, control("delete")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/login",
            json!({ "email": "a@x.com", "password": "temp123" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app.router, control("delete")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

// =============================================================================
// Misc surface
// =============================================================================

#[tokio::test]
async fn health_and_fallback() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, get_request("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, body) = send(&app.router, get_request("/api/no-such-route", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route not found");
}
