//! Integration tests for the session-aware client

use ecogaspi_core::{
    AppProfile, CredentialStorage, Credentials, MemoryStorage, Session, SessionEvent, UserProfile,
};
use ecogaspi_http::{ApiClient, ClientError, FilePart, PendingRequest};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn admin_user() -> Value {
    json!({
        "id": "u1",
        "phoneNumber": "0700000000",
        "firstName": "Awa",
        "lastName": "Kone",
        "roles": ["SUPER_ADMIN"]
    })
}

fn session_with(access: &str, refresh: &str) -> Session {
    let session = Session::in_memory(AppProfile::Admin);
    session
        .login(&Credentials {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            user: serde_json::from_value::<UserProfile>(admin_user()).unwrap(),
        })
        .unwrap();
    session
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"}))
}

async fn mount_refresh(server: &MockServer, refresh_token: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": refresh_token})))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_client_builder() {
    let client = ApiClient::builder()
        .base_url("http://localhost:8080/api/v1/")
        .session(Session::in_memory(AppProfile::Admin))
        .build()
        .unwrap();

    assert_eq!(client.base_url(), "http://localhost:8080/api/v1");
}

#[tokio::test]
async fn test_client_builder_requires_base_url_and_session() {
    let result = ApiClient::builder()
        .session(Session::in_memory(AppProfile::Admin))
        .build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));

    let result = ApiClient::builder().base_url("http://localhost:8080").build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_bearer_token_is_attached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchants/stats"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"total": 3}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), session_with("A1", "R1")).unwrap();
    let stats: Value = client
        .fetch(&PendingRequest::get("merchants/stats"))
        .await
        .unwrap();

    assert_eq!(stats["total"], 3);
}

#[tokio::test]
async fn test_anonymous_request_has_no_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), Session::in_memory(AppProfile::Storefront)).unwrap();
    client
        .send(&PendingRequest::get("products/categories"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/42"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"accessToken": "A2", "refreshToken": "R2"}
        })),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/products/42"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"id": 42, "name": "Yaourt"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with("A1", "R1");
    let mut events = session.subscribe();
    let client = ApiClient::new(server.uri(), session.clone()).unwrap();

    let product: Value = client
        .fetch(&PendingRequest::get("products/42"))
        .await
        .unwrap();

    assert_eq!(product["name"], "Yaourt");
    assert_eq!(session.access_token().as_deref(), Some("A2"));
    assert_eq!(session.refresh_token().as_deref(), Some("R2"));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);

    let requests = server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|r| r.url.path() == "/auth/refresh")
        .unwrap();
    assert!(!refresh.headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_missing_refresh_token_ends_session_without_refresh_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchants"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", ResponseTemplate::new(200), 0).await;

    let storage = MemoryStorage::new();
    storage.set_item("ecogaspi_admin_token", "A1").unwrap();
    storage
        .set_item("ecogaspi_admin_user", &admin_user().to_string())
        .unwrap();
    let session = Session::new(AppProfile::Admin, storage);
    assert!(session.init());
    let mut events = session.subscribe();

    let client = ApiClient::new(server.uri(), session.clone()).unwrap();
    let result = client.send(&PendingRequest::get("merchants")).await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Ended);
    assert_eq!(session.access_token(), None);
    assert_eq!(session.user(), None);
}

#[tokio::test]
async fn test_retried_request_is_not_retried_again() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/annonces/pending"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"accessToken": "A2"})),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/admin/annonces/pending"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Still no"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with("A1", "R1");
    let client = ApiClient::new(server.uri(), session.clone()).unwrap();
    let result = client
        .send(&PendingRequest::get("/admin/annonces/pending"))
        .await;

    match result {
        Err(ClientError::AuthenticationFailed(message)) => assert_eq!(message, "Still no"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(session.access_token().as_deref(), Some("A2"));
    assert_eq!(session.refresh_token().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_rejected_refresh_ends_session_and_returns_original_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(401).set_body_json(json!({"message": "Refresh token revoked"})),
        1,
    )
    .await;

    let session = session_with("A1", "R1");
    let mut events = session.subscribe();
    let client = ApiClient::new(server.uri(), session.clone()).unwrap();

    let result = client.send(&PendingRequest::get("/auth/me")).await;

    match result {
        Err(ClientError::AuthenticationFailed(message)) => assert_eq!(message, "Token expired"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Ended);
    assert_eq!(session.credentials(), None);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_unsuccessful_refresh_envelope_ends_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"success": false, "message": "Invalid refresh token"})),
        1,
    )
    .await;

    let session = session_with("A1", "R1");
    let mut events = session.subscribe();
    let client = ApiClient::new(server.uri(), session.clone()).unwrap();

    let result = client.send(&PendingRequest::get("products")).await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Ended);
    assert_eq!(session.access_token(), None);
}

#[tokio::test]
async fn test_refresh_transport_failure_ends_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchants"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"accessToken": "A2"}))
            .set_delay(Duration::from_secs(3)),
        1,
    )
    .await;

    let session = session_with("A1", "R1");
    let mut events = session.subscribe();
    let client = ApiClient::builder()
        .base_url(server.uri())
        .session(session.clone())
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let result = client.send(&PendingRequest::get("merchants")).await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Ended);
    assert_eq!(session.access_token(), None);
    assert_eq!(session.refresh_token(), None);
}

#[tokio::test]
async fn test_refresh_demoting_user_ends_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/annonces/pending"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    let mut demoted = admin_user();
    demoted["roles"] = json!(["CLIENT"]);
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"accessToken": "A2", "refreshToken": "R2", "user": demoted}
        })),
        1,
    )
    .await;

    let session = session_with("A1", "R1");
    let mut events = session.subscribe();
    let client = ApiClient::new(server.uri(), session.clone()).unwrap();

    let result = client.send(&PendingRequest::get("admin/annonces/pending")).await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Ended);
    assert!(events.try_recv().is_err());
    assert_eq!(session.credentials(), None);
}

#[tokio::test]
async fn test_other_errors_pass_through() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchants/stats"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/merchants/7"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Not yours"})))
        .mount(&server)
        .await;
    mount_refresh(&server, "R1", ResponseTemplate::new(200), 0).await;

    let session = session_with("A1", "R1");
    let mut events = session.subscribe();
    let client = ApiClient::new(server.uri(), session.clone()).unwrap();

    let result = client.send(&PendingRequest::get("merchants/stats")).await;
    match result {
        Err(ClientError::ServerError { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database down");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let result = client.send(&PendingRequest::delete("merchants/7")).await;
    match result {
        Err(ClientError::Forbidden(message)) => assert_eq!(message, "Not yours"),
        other => panic!("unexpected result: {other:?}"),
    }

    assert!(events.try_recv().is_err());
    assert_eq!(session.access_token().as_deref(), Some("A1"));
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"accessToken": "A2", "refreshToken": "R2"}})),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), session_with("A1", "R1")).unwrap();
    let merchants = PendingRequest::get("merchants");
    let products = PendingRequest::get("products");

    let (first, second) = tokio::join!(client.send(&merchants), client.send(&products));

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(client.session().access_token().as_deref(), Some("A2"));
}

#[tokio::test]
async fn test_retry_resends_json_body() {
    let server = MockServer::start().await;
    let body = json!({"name": "Boulangerie du Plateau", "storeName": "BDP"});

    Mock::given(method("POST"))
        .and(path("/merchants"))
        .and(header("authorization", "Bearer A1"))
        .and(body_json(&body))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"accessToken": "A2"})),
        1,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/merchants"))
        .and(header("authorization", "Bearer A2"))
        .and(body_json(&body))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"success": true, "data": {"id": "m1"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), session_with("A1", "R1")).unwrap();
    let created: Value = client
        .fetch(&PendingRequest::post("merchants").json(&body).unwrap())
        .await
        .unwrap();

    assert_eq!(created["id"], "m1");
}

#[tokio::test]
async fn test_retry_resends_file_upload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/image"))
        .and(header("authorization", "Bearer A1"))
        .and(body_string_contains("photo.jpg"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({"accessToken": "A2"})),
        1,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/upload/image"))
        .and(header("authorization", "Bearer A2"))
        .and(body_string_contains("photo.jpg"))
        .and(body_string_contains("JPEGDATA"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"url": "/uploads/photo.jpg"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), session_with("A1", "R1")).unwrap();
    let file = FilePart::new("photo.jpg", &b"JPEGDATA"[..]).mime("image/jpeg");
    let uploaded: Value = client
        .fetch(&PendingRequest::post("upload/image").file(file))
        .await
        .unwrap();

    assert_eq!(uploaded["url"], "/uploads/photo.jpg");
}

#[tokio::test]
async fn test_explicit_refresh_failure_reports_expired_session() {
    let server = MockServer::start().await;
    mount_refresh(&server, "R1", ResponseTemplate::new(500), 1).await;

    let session = session_with("A1", "R1");
    let mut events = session.subscribe();
    let client = ApiClient::new(server.uri(), session.clone()).unwrap();

    let result = client.refresh_session().await;

    assert!(matches!(result, Err(ClientError::SessionExpired)));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Ended);
    assert_eq!(session.refresh_token(), None);
}
