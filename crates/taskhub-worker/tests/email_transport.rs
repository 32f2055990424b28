//! HTTP email transport against a mock mail API.

use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskhub_core::config::NotifierConfig;
use taskhub_core::error::ErrorKind;
use taskhub_core::traits::mailer::{EmailMessage, EmailTransport};
use taskhub_worker::alerts::HttpEmailTransport;

fn config(server: &MockServer) -> NotifierConfig {
    NotifierConfig {
        enabled: true,
        admin_email: "ops@example.com".to_string(),
        from: "alerts@taskhub.dev".to_string(),
        api_url: format!("{}/emails", server.uri()),
        api_key: "re_test_key".to_string(),
        timeout_seconds: 5,
    }
}

fn message() -> EmailMessage {
    EmailMessage {
        to: "ops@example.com".to_string(),
        subject: "[TaskHub] Job 42 failed on report-generation".to_string(),
        html: "<h2>Report job failed</h2>".to_string(),
    }
}

#[tokio::test]
async fn test_send_posts_json_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test_key"))
        .and(body_json(serde_json::json!({
            "from": "alerts@taskhub.dev",
            "to": "ops@example.com",
            "subject": "[TaskHub] Job 42 failed on report-generation",
            "html": "<h2>Report job failed</h2>",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "em_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpEmailTransport::new(&config(&server)).expect("transport");
    transport.send(&message()).await.expect("sent");
}

#[tokio::test]
async fn test_error_status_is_an_external_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("mail backend down"))
        .mount(&server)
        .await;

    let transport = HttpEmailTransport::new(&config(&server)).expect("transport");
    let err = transport.send(&message()).await.expect_err("rejected");
    assert_eq!(err.kind, ErrorKind::ExternalService);
    assert!(err.message.contains("500"));
    assert!(err.message.contains("mail backend down"));
}
