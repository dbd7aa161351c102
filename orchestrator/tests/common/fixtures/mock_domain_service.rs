//! Mock domain service for testing
//!
//! A fake owner of some tenant collections that answers the internal export
//! and restore endpoints, so the orchestrator can be exercised without any
//! real service running.

use domain_agent::schema::Collection;
use domain_agent::types::{INTERNAL_SECRET_HEADER, TENANT_HEADER};
use orchestrator::config::ServiceConfig;
use orchestrator::http::{build_http_client, DomainServiceClient, HttpDomainClient};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

use super::test_data::INTERNAL_SECRET;

/// Client for a service whose port has nothing listening on it
pub fn unreachable_client(name: &str, collections: &[Collection]) -> Arc<dyn DomainServiceClient> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let service = ServiceConfig {
        name: name.to_string(),
        base_url: format!("http://127.0.0.1:{}", port),
        collections: collections.to_vec(),
    };
    let http = build_http_client(Duration::from_secs(2), Duration::from_secs(1)).expect("http client");
    Arc::new(HttpDomainClient::new(&service, INTERNAL_SECRET, http))
}

/// Mock domain service owning `collections`
pub struct MockDomainService {
    pub server: MockServer,
    pub base_url: String,
    pub name: String,
    pub collections: Vec<Collection>,
}

impl MockDomainService {
    pub async fn start(name: &str, collections: &[Collection]) -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self {
            server,
            base_url,
            name: name.to_string(),
            collections: collections.to_vec(),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            collections: self.collections.clone(),
        }
    }

    /// Client talking to this mock with the shared test secret
    pub fn client(&self, request_timeout: Duration) -> Arc<dyn DomainServiceClient> {
        let http = build_http_client(request_timeout, Duration::from_secs(1)).expect("http client");
        Arc::new(HttpDomainClient::new(&self.service_config(), INTERNAL_SECRET, http))
    }

    /// Mock a successful export of `data` (collection name -> records)
    pub async fn mock_export(&self, tenant_id: &str, data: Value) {
        Mock::given(method("GET"))
            .and(path("/internal/export"))
            .and(header(INTERNAL_SECRET_HEADER, INTERNAL_SECRET))
            .and(header(TENANT_HEADER, tenant_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": data
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock an export of every owned collection as empty
    pub async fn mock_empty_export(&self, tenant_id: &str) {
        let data: Map<String, Value> = self
            .collections
            .iter()
            .map(|c| (c.name().to_string(), json!([])))
            .collect();
        self.mock_export(tenant_id, Value::Object(data)).await;
    }

    /// Mock export failing with an HTTP status
    pub async fn mock_export_failure(&self, status_code: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/internal/export"))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Mock an export that answers later than any test timeout
    pub async fn mock_export_hang(&self, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/internal/export"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": {}}))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Mock a restore that reports every sent record as restored
    pub async fn mock_restore_success(&self) {
        Mock::given(method("POST"))
            .and(path("/internal/restore"))
            .and(header(INTERNAL_SECRET_HEADER, INTERNAL_SECRET))
            .respond_with(|request: &Request| {
                let body: Map<String, Value> = serde_json::from_slice(&request.body).unwrap_or_default();
                let counts: Map<String, Value> = body
                    .iter()
                    .map(|(name, records)| {
                        let restored = records.as_array().map(Vec::len).unwrap_or(0);
                        (name.clone(), json!({"restored": restored, "skipped": 0}))
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": counts}))
            })
            .mount(&self.server)
            .await;
    }

    /// Mock a restore rejected by the service
    pub async fn mock_restore_failure(&self, status_code: u16) {
        Mock::given(method("POST"))
            .and(path("/internal/restore"))
            .respond_with(ResponseTemplate::new(status_code).set_body_json(json!({
                "success": false,
                "error": "restore failed"
            })))
            .mount(&self.server)
            .await;
    }

    /// Bodies of every restore call received so far
    pub async fn restore_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == "/internal/restore")
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Headers of the first restore call, lower-cased name -> value
    pub async fn first_restore_header(&self, name: &str) -> Option<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .find(|r| r.url.path() == "/internal/restore")
            .and_then(|r| r.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string))
    }
}

/// The five services of the platform
pub struct MockPlatform {
    pub identity: MockDomainService,
    pub content: MockDomainService,
    pub comments: MockDomainService,
    pub files: MockDomainService,
    pub analytics: MockDomainService,
}

impl MockPlatform {
    pub async fn start() -> Self {
        use Collection::*;
        Self {
            identity: MockDomainService::start("identity", &[Users]).await,
            content: MockDomainService::start(
                "content",
                &[Categories, Tags, Pages, Posts, Drafts, Bookmarks, Likes],
            )
            .await,
            comments: MockDomainService::start("comments", &[Comments]).await,
            files: MockDomainService::start("files", &[Images, BugReports]).await,
            analytics: MockDomainService::start("analytics", &[PageViews, SiteVisitors]).await,
        }
    }

    /// In dispatch order
    pub fn services(&self) -> [&MockDomainService; 5] {
        [
            &self.identity,
            &self.content,
            &self.comments,
            &self.files,
            &self.analytics,
        ]
    }

    pub fn clients(&self, request_timeout: Duration) -> Vec<Arc<dyn DomainServiceClient>> {
        self.services().iter().map(|s| s.client(request_timeout)).collect()
    }
}
