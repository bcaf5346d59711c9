//! Backend API clients over the reqwest transport.

use std::sync::Arc;

use dashboard_auth::{
    ApiClient, ApiRequest, AuthError, CreditOperation, CreditsApi, JobsApi, MockAuthenticator,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::setup_mock_server;

fn client(auth: MockAuthenticator) -> Arc<ApiClient<MockAuthenticator>> {
    Arc::new(ApiClient::new(Arc::new(auth)).expect("Failed to build client"))
}

fn jobs_api(server: &MockServer, auth: MockAuthenticator) -> JobsApi<MockAuthenticator> {
    JobsApi::new(client(auth), &format!("{}/prod/v1", server.uri())).expect("Invalid base URL")
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/prod/v1/admin/jobs"))
        .and(query_param("limit", "100"))
        .and(header("authorization", "Bearer token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [{ "jobId": "j-1", "userId": "u-1", "status": "COMPLETED" }],
            "count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = jobs_api(&server, MockAuthenticator::with_token("token-abc"));
    let response = api.list_jobs(dashboard_auth::api::DEFAULT_JOB_LIMIT).await;

    assert!(response.ok);
    assert_eq!(response.status, 200);
    assert_eq!(response.data["jobs"][0]["userId"], "u-1");
    assert_eq!(
        response.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
}

#[tokio::test]
async fn test_admin_route_falls_back_to_public_route() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/prod/v1/admin/jobs/job-9/logs"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prod/v1/jobs/job-9/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "logs": ["started"] })))
        .expect(1)
        .mount(&server)
        .await;

    let api = jobs_api(&server, MockAuthenticator::with_token("t"));
    let response = api.get_job_logs("job-9").await;

    assert!(response.ok);
    assert_eq!(response.data["logs"][0], "started");
}

#[tokio::test]
async fn test_missing_token_sends_unauthenticated_request() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/prod/v1/jobs"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthorized" })))
        .mount(&server)
        .await;

    let auth = MockAuthenticator::new();
    auth.queue_token(Err(AuthError::refresh_failed("revoked")));
    let api = jobs_api(&server, auth);

    let response = api.submit_job(json!({ "prompt": "sunset" })).await;

    assert_eq!(response.status, 401);
    assert_eq!(response.data["message"], "Unauthorized");
    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_credit_update_body() {
    let server = setup_mock_server().await;
    Mock::given(method("PUT"))
        .and(path("/credits/admin"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "userId": "u-1", "credits": 25, "operation": "add" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "credits": 125 })))
        .expect(1)
        .mount(&server)
        .await;

    let api = CreditsApi::new(client(MockAuthenticator::with_token("t")), &server.uri())
        .expect("Invalid base URL");
    let response = api.admin_update_credits("u-1", 25, CreditOperation::Add).await;

    assert_eq!(response.json::<serde_json::Value>().unwrap()["credits"], 125);
}

#[tokio::test]
async fn test_plain_text_body_and_transport_failure() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let client = client(MockAuthenticator::with_token("t"));
    let response = client
        .call(ApiRequest::get(format!("{}/health", server.uri())).skip_auth())
        .await;
    assert!(!response.ok);
    assert_eq!(response.data, json!("Internal Server Error"));

    let uri = server.uri();
    drop(server);
    let response = client.call(ApiRequest::get(format!("{}/health", uri))).await;
    assert_eq!(response.status, 0);
    assert!(response.error.is_some());
    assert_eq!(response.request_id.len(), 7);
}
