use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, AuthResponse, Cycle, DailyLog, Insight, Prediction, Settings};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if body.is_some() {
        builder = builder.header(http::header::CONTENT_TYPE, "application/json");
    }
    builder.body(body.unwrap_or_default().to_string()).unwrap()
}

async fn send(app: &Router, req: Request<String>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn register(app: &Router, email: &str) -> String {
    let body = format!(r#"{{"email":"{email}","password":"pw","firstName":"Ada"}}"#);
    let resp = send(app, request("POST", "/auth/register", None, Some(&body))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let auth: AuthResponse = body_json(resp).await;
    assert_eq!(auth.user.email, email);
    assert_eq!(auth.user.first_name.as_deref(), Some("Ada"));
    auth.token
}

// --- auth ---

#[tokio::test]
async fn register_then_login() {
    let app = app();
    register(&app, "a@b.com").await;

    let resp = send(
        &app,
        request("POST", "/auth/login", None, Some(r#"{"email":"a@b.com","password":"pw"}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let auth: AuthResponse = body_json(resp).await;
    assert!(!auth.token.is_empty());
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let app = app();
    register(&app, "a@b.com").await;

    let resp = send(
        &app,
        request("POST", "/auth/login", None, Some(r#"{"email":"a@b.com","password":"nope"}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_is_409() {
    let app = app();
    register(&app, "a@b.com").await;
    let resp = send(
        &app,
        request("POST", "/auth/register", None, Some(r#"{"email":"a@b.com","password":"x"}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn protected_routes_require_bearer() {
    let app = app();
    for uri in ["/cycles", "/daily-logs", "/settings", "/user/profile", "/predictions/latest"] {
        let resp = send(&app, request("GET", uri, None, None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");

        let resp = send(&app, request("GET", uri, Some("bogus"), None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn profile_update_changes_names_only() {
    let app = app();
    let token = register(&app, "a@b.com").await;
    let resp = send(
        &app,
        request(
            "PUT",
            "/user/profile",
            Some(&token),
            Some(r#"{"id":"ignored","email":"x@y.z","lastName":"Lovelace"}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let user: mock_server::User = body_json(resp).await;
    assert_eq!(user.email, "a@b.com");
    assert_eq!(user.last_name.as_deref(), Some("Lovelace"));
    assert!(user.first_name.is_none());
}

// --- cycles ---

#[tokio::test]
async fn cycle_lifecycle() {
    let app = app();
    let token = register(&app, "a@b.com").await;

    let resp = send(&app, request("GET", "/cycles/current", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
        &app,
        request(
            "POST",
            "/cycles",
            Some(&token),
            Some(r#"{"userId":"","startDate":"2025-09-01","isComplete":false}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Cycle = body_json(resp).await;
    let id = created.id.clone().unwrap();
    assert!(!created.user_id.is_empty());
    assert!(created.created_at.is_some());

    let resp = send(&app, request("GET", "/cycles/current", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let current: Cycle = body_json(resp).await;
    assert_eq!(current.id, created.id);

    let resp = send(
        &app,
        request(
            "PUT",
            &format!("/cycles/{id}"),
            Some(&token),
            Some(r#"{"userId":"","startDate":"2025-09-01","endDate":"2025-09-28","isComplete":true}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Cycle = body_json(resp).await;
    assert_eq!(updated.cycle_length, Some(28));

    let resp = send(&app, request("GET", "/cycles/current", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, request("DELETE", &format!("/cycles/{id}"), Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&app, request("DELETE", &format!("/cycles/{id}"), Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cycles_are_scoped_per_user() {
    let app = app();
    let alice = register(&app, "alice@x.com").await;
    let bob = register(&app, "bob@x.com").await;

    send(
        &app,
        request("POST", "/cycles", Some(&alice), Some(r#"{"startDate":"2025-09-01"}"#)),
    )
    .await;

    let resp = send(&app, request("GET", "/cycles", Some(&bob), None)).await;
    let cycles: Vec<Cycle> = body_json(resp).await;
    assert!(cycles.is_empty());
}

// --- daily logs ---

#[tokio::test]
async fn daily_logs_filter_and_lookup_by_date() {
    let app = app();
    let token = register(&app, "a@b.com").await;

    for date in ["2025-09-01", "2025-09-05", "2025-09-10"] {
        let body = format!(r#"{{"date":"{date}","flowLevel":"light","symptoms":["cramps"]}}"#);
        let resp = send(&app, request("POST", "/daily-logs", Some(&token), Some(&body))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(
        &app,
        request(
            "GET",
            "/daily-logs?startDate=2025-09-02&endDate=2025-09-10",
            Some(&token),
            None,
        ),
    )
    .await;
    let logs: Vec<DailyLog> = body_json(resp).await;
    let dates: Vec<String> = logs.iter().map(|l| l.date.to_string()).collect();
    assert_eq!(dates, vec!["2025-09-10", "2025-09-05"]);

    let resp = send(&app, request("GET", "/daily-logs/2025-09-05", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, request("GET", "/daily-logs/2025-09-06", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, request("GET", "/daily-logs/yesterday", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_log_for_same_day_conflicts() {
    let app = app();
    let token = register(&app, "a@b.com").await;
    let body = r#"{"date":"2025-09-01"}"#;
    send(&app, request("POST", "/daily-logs", Some(&token), Some(body))).await;
    let resp = send(&app, request("POST", "/daily-logs", Some(&token), Some(body))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// --- insights ---

#[tokio::test]
async fn generated_batches_overlap_previous_insight() {
    let app = app();
    let token = register(&app, "a@b.com").await;

    let resp = send(&app, request("POST", "/insights/generate", Some(&token), None)).await;
    let first: Vec<Insight> = body_json(resp).await;
    assert_eq!(first.len(), 1);

    let resp = send(&app, request("POST", "/insights/generate", Some(&token), None)).await;
    let second: Vec<Insight> = body_json(resp).await;
    assert_eq!(second.len(), 2);
    assert_eq!(second[1].id, first[0].id);

    let resp = send(&app, request("GET", "/insights?limit=1", Some(&token), None)).await;
    let listed: Vec<Insight> = body_json(resp).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, second[0].id);

    let resp = send(
        &app,
        request("POST", &format!("/insights/{}/read", first[0].id), Some(&token), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body, serde_json::json!({}));
}

// --- predictions ---

#[tokio::test]
async fn prediction_needs_a_cycle() {
    let app = app();
    let token = register(&app, "a@b.com").await;

    let resp = send(&app, request("GET", "/predictions/latest", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, request("POST", "/predictions/generate", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    send(
        &app,
        request("POST", "/cycles", Some(&token), Some(r#"{"startDate":"2025-09-01"}"#)),
    )
    .await;
    let resp = send(&app, request("POST", "/predictions/generate", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let prediction: Prediction = body_json(resp).await;
    assert_eq!(prediction.next_period_date.to_string(), "2025-09-29");
    assert_eq!(prediction.ovulation_date.to_string(), "2025-09-15");
    assert_eq!(prediction.fertility_window.start.to_string(), "2025-09-10");

    let resp = send(&app, request("GET", "/predictions/latest", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- settings ---

#[tokio::test]
async fn settings_absent_until_first_put() {
    let app = app();
    let token = register(&app, "a@b.com").await;

    let resp = send(&app, request("GET", "/settings", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
        &app,
        request("PUT", "/settings", Some(&token), Some(r#"{"cycleLength":30,"darkMode":true}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let saved: Settings = body_json(resp).await;
    assert!(saved.id.is_some());

    let resp = send(&app, request("GET", "/settings", Some(&token), None)).await;
    let fetched: Settings = body_json(resp).await;
    assert_eq!(fetched, saved);
    assert_eq!(fetched.cycle_length, Some(30));
}
