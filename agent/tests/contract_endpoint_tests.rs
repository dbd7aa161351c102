//! Router-level tests for the internal export/restore endpoints

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use domain_agent::schema::Collection;
use domain_agent::types::{ExportResponse, RestoreResponse, INTERNAL_SECRET_HEADER, TENANT_HEADER};
use domain_agent::{router, AppState, TenantStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "test-internal-secret";

async fn app(collections: &[Collection]) -> Router {
    let store = TenantStore::in_memory(collections).await.unwrap();
    router(Arc::new(AppState {
        internal_secret: SECRET.to_string(),
        store,
    }))
}

fn export_request(secret: Option<&str>, tenant: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/internal/export");
    if let Some(secret) = secret {
        builder = builder.header(INTERNAL_SECRET_HEADER, secret);
    }
    if let Some(tenant) = tenant {
        builder = builder.header(TENANT_HEADER, tenant);
    }
    builder.body(Body::empty()).unwrap()
}

fn restore_request(tenant: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/internal/restore")
        .header(INTERNAL_SECRET_HEADER, SECRET)
        .header(TENANT_HEADER, tenant)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_export_requires_internal_secret() {
    let app = app(&Collection::ALL).await;

    let response = app.clone().oneshot(export_request(None, Some("t1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(export_request(Some("wrong"), Some("t1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_export_requires_tenant_header() {
    let app = app(&Collection::ALL).await;
    let response = app.oneshot(export_request(Some(SECRET), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_restore_then_export_over_http() {
    let app = app(&[Collection::Posts, Collection::Comments]).await;
    let body = json!({
        "posts": [{"id": "p1", "title": "Hello"}],
        "comments": [
            {"id": "cm1", "postId": "p1"},
            {"id": "cm2", "postId": "gone"}
        ],
        "widgets": [{"id": "w1"}]
    });

    let response = app
        .clone()
        .oneshot(restore_request("t1", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let restored: RestoreResponse = body_json(response).await;
    assert!(restored.success);
    let counts = restored.data.unwrap();
    assert_eq!(counts["posts"].restored, 1);
    assert_eq!(counts["comments"].restored, 1);
    assert_eq!(counts["comments"].skipped, 1);
    assert!(!counts.contains_key("widgets"));

    let response = app.oneshot(export_request(Some(SECRET), Some("t1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let exported: ExportResponse = body_json(response).await;
    let data = exported.data.unwrap();
    assert_eq!(data["posts"].len(), 1);
    assert_eq!(data["comments"].len(), 1);
    assert_eq!(data.len(), 2);
}

#[tokio::test]
async fn test_restore_rejects_non_object_records() {
    let app = app(&Collection::ALL).await;
    let response = app
        .oneshot(restore_request("t1", r#"{"posts": [1, 2, 3]}"#.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_health_lists_owned_collections() {
    let app = app(&[Collection::PageViews, Collection::SiteVisitors]).await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = body_json(response).await;
    assert_eq!(body["collections"], json!(["pageViews", "siteVisitors"]));
}

#[tokio::test]
async fn test_restore_accepts_bodies_larger_than_axum_default_limit() {
    let app = app(&[Collection::Posts]).await;
    let filler = "x".repeat(1000);
    let posts: Vec<Value> = (0..3000)
        .map(|i| json!({"id": format!("p{}", i), "title": format!("Post {}", i), "body": filler}))
        .collect();
    let body = json!({ "posts": posts }).to_string();
    assert!(body.len() > 2 * 1024 * 1024);

    let response = app
        .clone()
        .oneshot(restore_request("t1", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let restored: RestoreResponse = body_json(response).await;
    assert_eq!(restored.data.unwrap()["posts"].restored, 3000);

    let response = app.oneshot(export_request(Some(SECRET), Some("t1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let exported: ExportResponse = body_json(response).await;
    let data = exported.data.unwrap();
    assert_eq!(data["posts"].len(), 3000);
    assert_eq!(data["posts"][0].get("body"), Some(&json!(filler)));
}
