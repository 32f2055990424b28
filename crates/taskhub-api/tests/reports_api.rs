//! Report routes over the in-memory store and queue.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use taskhub_api::{AppState, build_router};
use taskhub_auth::{JwtDecoder, JwtEncoder};
use taskhub_core::config::{AuthConfig, CorsConfig};
use taskhub_core::traits::queue::JobQueue;
use taskhub_core::types::{TenantId, UserId};
use taskhub_database::{MemoryReportStore, ReportStore};
use taskhub_entity::report::ReportStatusKind;
use taskhub_entity::user::UserRole;
use taskhub_queue::memory::MemoryJobQueue;

struct TestApp {
    router: Router,
    store: Arc<MemoryReportStore>,
    queue: Arc<MemoryJobQueue>,
    encoder: JwtEncoder,
    tenant: TenantId,
}

struct Caller {
    token: String,
}

impl TestApp {
    fn new() -> Self {
        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            ..AuthConfig::default()
        };
        let store = Arc::new(MemoryReportStore::new());
        let queue = Arc::new(MemoryJobQueue::new("report-generation"));
        let state = AppState::new(store.clone(), queue.clone(), JwtDecoder::new(&auth), 1);

        Self {
            router: build_router(state, &CorsConfig::default()),
            store,
            queue,
            encoder: JwtEncoder::new(&auth, 60),
            tenant: TenantId::new(),
        }
    }

    fn caller(&self, role: UserRole) -> Caller {
        self.caller_in(self.tenant, role)
    }

    fn caller_in(&self, tenant: TenantId, role: UserRole) -> Caller {
        let token = self
            .encoder
            .issue(UserId::new(), tenant, role, "Tester")
            .expect("token");
        Caller { token }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<&Caller>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", caller.token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    async fn generate(&self, caller: &Caller, scope: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/reports/generate",
            Some(caller),
            Some(json!({
                "type": "WEEKLY",
                "fromDate": "2024-01-01",
                "toDate": "2024-01-07",
                "scope": scope,
            })),
        )
        .await
    }
}

fn report_id(body: &Value) -> String {
    body["data"]["reportId"]
        .as_str()
        .expect("reportId")
        .to_string()
}

#[tokio::test]
async fn test_generate_returns_created_and_enqueues() {
    let app = TestApp::new();
    let manager = app.caller(UserRole::Manager);

    let (status, body) = app.generate(&manager, "TEAM").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let id = report_id(&body);

    let stats = app.queue.stats().await.expect("stats");
    assert_eq!(stats.waiting, 1);

    let (status, body) = app
        .send(Method::GET, &format!("/api/reports/{id}"), Some(&manager), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "GENERATING");
    assert_eq!(body["data"]["snapshots"], json!([]));
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/reports", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let forged = Caller {
        token: "not-a-jwt".to_string(),
    };
    let (status, _) = app
        .send(Method::GET, "/api/reports", Some(&forged), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_operator_team_request_is_forbidden() {
    let app = TestApp::new();
    let operator = app.caller(UserRole::Operator);

    let (status, body) = app.generate(&operator, "TEAM").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
    assert_eq!(app.queue.stats().await.expect("stats").waiting, 0);
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let app = TestApp::new();
    let pm = app.caller(UserRole::ProjectManager);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/reports/generate",
            Some(&pm),
            Some(json!({
                "type": "CUSTOM",
                "fromDate": "2024-02-01",
                "toDate": "2024-01-01",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/reports/generate",
            Some(&pm),
            Some(json!({ "type": "YEARLY" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::GET, "/api/reports/not-a-uuid", Some(&pm), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listing_follows_role_visibility() {
    let app = TestApp::new();
    let pm = app.caller(UserRole::ProjectManager);
    let first = app.caller(UserRole::Operator);
    let second = app.caller(UserRole::Operator);

    app.generate(&first, "EMPLOYEE").await;
    app.generate(&second, "EMPLOYEE").await;
    app.generate(&pm, "TEAM").await;

    let (status, body) = app.send(Method::GET, "/api/reports", Some(&pm), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 3);

    let (_, body) = app
        .send(Method::GET, "/api/reports?page=1&page_size=10", Some(&first), None)
        .await;
    assert_eq!(body["data"]["total_items"], 1);

    let (_, body) = app
        .send(Method::GET, "/api/reports?status=READY", Some(&pm), None)
        .await;
    assert_eq!(body["data"]["total_items"], 0);

    let (status, body) = app
        .send(Method::GET, "/api/reports/summary", Some(&pm), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["generating"], 3);
    assert_eq!(body["data"]["weekly"], 3);
}

#[tokio::test]
async fn test_reports_of_others_are_not_found() {
    let app = TestApp::new();
    let owner = app.caller(UserRole::Operator);
    let other = app.caller(UserRole::Manager);
    let foreign_pm = app.caller_in(TenantId::new(), UserRole::ProjectManager);

    let (_, body) = app.generate(&owner, "EMPLOYEE").await;
    let uri = format!("/api/reports/{}", report_id(&body));

    let (status, _) = app.send(Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.send(Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    let (status, _) = app.send(Method::GET, &uri, Some(&foreign_pm), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_retry_requires_failed_report() {
    let app = TestApp::new();
    let pm = app.caller(UserRole::ProjectManager);

    let (_, body) = app.generate(&pm, "EMPLOYEE").await;
    let id = report_id(&body);
    let uri = format!("/api/reports/{id}/retry");

    let (status, body) = app.send(Method::POST, &uri, Some(&pm), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    app.store
        .mark_failed(id.parse().expect("id"), "Browser exited with code 1", None)
        .await
        .expect("fail");

    let (status, body) = app.send(Method::POST, &uri, Some(&pm), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "GENERATING");

    let report = app
        .store
        .find_report(id.parse().expect("id"))
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(report.status, ReportStatusKind::Generating);
}

#[tokio::test]
async fn test_unreachable_queue_fails_request_with_503() {
    let app = TestApp::new();
    let pm = app.caller(UserRole::ProjectManager);
    app.queue.set_reachable(false);

    let (status, body) = app.generate(&pm, "EMPLOYEE").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");

    app.queue.set_reachable(true);
    let (_, body) = app
        .send(Method::GET, "/api/reports?status=FAILED", Some(&pm), None)
        .await;
    assert_eq!(body["data"]["total_items"], 1);
    let reason = body["data"]["items"][0]["failureReason"]
        .as_str()
        .expect("failure reason");
    assert!(reason.contains("ECONNREFUSED"), "{reason}");
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = app
        .send(Method::GET, "/api/health/detailed", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "connected");
    assert_eq!(body["data"]["jobs"]["waiting"], 0);

    app.store.set_healthy(false);
    let (status, body) = app
        .send(Method::GET, "/api/health/detailed", None, None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["status"], "degraded");
    assert_eq!(body["data"]["database"], "unavailable");
}
