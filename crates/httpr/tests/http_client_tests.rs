//! Integration tests for the reqwest-backed transport.

use httpr::{Error, HttpTransport, Request, Service, ServiceConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_transport_creation() {
    let transport = HttpTransport::new(&ServiceConfig::default());
    assert!(transport.is_ok());
}

#[tokio::test]
async fn test_transport_from_client() {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .expect("Failed to build client");

    let service = Service::builder()
        .host("https://example.com")
        .transport(Arc::new(HttpTransport::from_client(client)))
        .build()
        .expect("Failed to build service");

    assert_eq!(service.get("/api").uri(), "https://example.com/api");
}

#[tokio::test]
async fn test_request_builder_chain() {
    let mut request = Request::new("POST", "https://example.com/api")
        .header("Content-Type", "application/json")
        .header("Authorization", "Bearer token123")
        .param("page", "1")
        .param("limit", "10")
        .json(&serde_json::json!({"name": "test", "value": 42}));

    let wire = request.wire_request().expect("valid request");
    assert_eq!(wire.method(), reqwest::Method::POST);
    assert_eq!(wire.url().as_str(), "https://example.com/api?page=1&limit=10");
    assert_eq!(wire.headers()["authorization"], "Bearer token123");
    // An explicit content type is not duplicated by the JSON body.
    assert_eq!(wire.headers().get_all("content-type").iter().count(), 1);
}

#[tokio::test]
async fn test_late_builder_error_is_a_send_failure() {
    let hooks = Arc::new(AtomicUsize::new(0));
    let mut request = Request::new("GET", "http://127.0.0.1:9/file").before_send({
        let hooks = hooks.clone();
        move |req| {
            hooks.fetch_add(1, Ordering::SeqCst);
            *req.url_mut() = "ftp://example.com/file".parse().unwrap();
        }
    });

    let envelope = request.execute().await;

    // The hook already ran, so this is not reported as a materialization error.
    assert_eq!(hooks.load(Ordering::SeqCst), 1);
    match envelope.error() {
        Some(err @ Error::Transport(_)) => assert!(!err.is_materialization()),
        other => panic!("expected transport error, got {other:?}"),
    }
}

// Note: We use wiremock for mocked HTTP tests
#[cfg(feature = "integration-tests")]
mod integration_tests {
    use super::*;
    use httpr::Group;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer, config: ServiceConfig) -> Service {
        Service::builder()
            .host(server.uri())
            .header("Accept", "application/json")
            .config(config)
            .build()
            .expect("Failed to build service")
    }

    #[tokio::test]
    async fn test_get_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/test"))
            .and(query_param("page", "2"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hello, World!"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, ServiceConfig::default());
        let response = service
            .get("/test")
            .param("page", "2")
            .response()
            .await
            .expect("Request failed");

        assert_eq!(response.status(), 200);
        assert!(response.is_success());

        let body = response.text().await.expect("Failed to read body");
        assert_eq!(body, "Hello, World!");
    }

    #[tokio::test]
    async fn test_post_json_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/users"))
            .and(body_json(serde_json::json!({"name": "John"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": 1, "name": "John"})),
            )
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, ServiceConfig::default());
        let response = service
            .post("/api/users")
            .json(&serde_json::json!({"name": "John"}))
            .response()
            .await
            .expect("Request failed");

        assert_eq!(response.status(), 201);

        let data: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(data["id"], 1);
        assert_eq!(data["name"], "John");
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .expect(2)
            .mount(&mock_server)
            .await;

        let service = service(
            &mock_server,
            ServiceConfig::default().timeout(Duration::from_millis(100)),
        );
        let envelope = service
            .get("/slow")
            .retry_delays([Duration::from_millis(10)])
            .execute()
            .await;

        assert!(matches!(envelope.error(), Some(Error::Timeout)));
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/not-found"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, ServiceConfig::default());
        let response = service
            .get("/not-found")
            .retry_delays([Duration::from_millis(10), Duration::from_millis(10)])
            .response()
            .await
            .expect("Request failed");

        assert_eq!(response.status(), 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind and drop a server so the port is known to be closed.
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let envelope = Request::new("GET", format!("{uri}/gone")).execute().await;

        assert!(envelope.error().is_some_and(Error::is_transport));
    }

    #[tokio::test]
    async fn test_parallel_group_against_server() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(5)
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, ServiceConfig::default().debug(true));
        let group = Group::new((0..5).map(|i| service.get(format!("/items/{i}"))));

        let envelopes = group.parallel().collect().await;

        assert_eq!(envelopes.len(), 5);
        assert!(envelopes.iter().all(|e| e.is_ok()));
    }

    #[tokio::test]
    async fn test_dump_against_server() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dump"))
            .respond_with(ResponseTemplate::new(200).set_body_string("dumped"))
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, ServiceConfig::default());
        let response = service.get("/dump").response().await.expect("Request failed");
        let dump = response.dump().await.expect("Failed to dump");

        assert!(dump.starts_with("GET /dump HTTP/1.1\r\n"));
        assert!(dump.contains("accept: application/json\r\n"));
        assert!(dump.contains("dumped"));
        assert!(dump.contains("Summary: start at"));
    }
}
