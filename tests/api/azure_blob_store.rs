use crate::{
    helpers::{TestApi, json_response},
    mock_blob_service::{MockBlobService, MockIdentityService, MockState},
};
use axum::http::StatusCode;
use bytes::Bytes;
use healthcare_functions::{
    config::AzureAuth,
    models::blob::BlobItem,
    services::{
        azure_blob_store::AzureBlobStore,
        blob_store::{BlobStore, StoreError},
    },
};
use serde_json::json;
use std::sync::Arc;

fn shared_key_store(endpoint: &str) -> AzureBlobStore {
    AzureBlobStore::new(
        endpoint,
        "devacct",
        AzureAuth::SharedKey("c2VjcmV0LWtleQ==".into()),
        "healthcare-data",
    )
}

fn identity_store(endpoint: &str, identity: &MockIdentityService) -> AzureBlobStore {
    AzureBlobStore::new(
        endpoint,
        "devacct",
        AzureAuth::ManagedIdentity {
            identity_endpoint: Some(identity.endpoint.clone()),
            client_id: Some("client-123".into()),
        },
        "healthcare-data",
    )
}

fn names(blobs: Vec<BlobItem>) -> Vec<String> {
    blobs.into_iter().map(|b| b.name).collect()
}

fn bearer_tokens(mock: &MockBlobService) -> Vec<String> {
    mock.state
        .requests()
        .into_iter()
        .map(|r| r.authorization.unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn upload_sends_signed_block_blob() {
    let mock = MockBlobService::spawn(MockState::default().with_container("healthcare-data")).await;
    let store = shared_key_store(&mock.endpoint);

    let url = store
        .upload(
            "healthcare-data",
            "patients/p 1.json",
            Bytes::from_static(b"{}"),
            "application/json",
        )
        .await
        .unwrap();

    assert_eq!(
        url,
        format!("{}/healthcare-data/patients/p%201.json", mock.endpoint)
    );
    let stored = mock.state.containers.lock().unwrap()["healthcare-data"]["patients/p 1.json"].clone();
    assert_eq!(&stored.content[..], b"{}");
    assert_eq!(stored.content_type, "application/json");

    let requests = mock.state.requests();
    let put = requests.last().unwrap();
    assert_eq!(put.method, "PUT");
    assert!(
        put.authorization
            .as_deref()
            .unwrap()
            .starts_with("SharedKey devacct:")
    );
    assert!(put.ms_version.is_some());

    let content = store
        .download("healthcare-data", "patients/p 1.json")
        .await
        .unwrap();
    assert_eq!(&content[..], b"{}");
}

#[tokio::test]
async fn list_follows_continuation_markers() {
    let state = MockState {
        page_size: 2,
        ..MockState::default()
    }
    .with_container("raw");
    let mock = MockBlobService::spawn(state).await;
    let store = shared_key_store(&mock.endpoint);

    for name in ["a.txt", "b.txt", "c.txt", "d/e.txt", "f&g.txt"] {
        store
            .upload("raw", name, Bytes::from(name.to_string()), "text/plain")
            .await
            .unwrap();
    }

    let blobs = store.list("raw", None).await.unwrap();
    let names: Vec<_> = blobs.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt", "d/e.txt", "f&g.txt"]);
    assert_eq!(blobs[3].size, 7);
    assert!(blobs[0].last_modified.is_some());

    let list_calls = mock
        .state
        .requests()
        .into_iter()
        .filter(|r| r.path == "/raw")
        .count();
    assert_eq!(list_calls, 3);
}

#[tokio::test]
async fn list_prefixes_need_not_end_at_a_slash() {
    let mock = MockBlobService::spawn(MockState::default().with_container("raw")).await;
    let store = shared_key_store(&mock.endpoint);

    for name in ["b.txt", "bb/c.txt", "d/e.txt", "d/ef.txt", "d/x.txt"] {
        store
            .upload("raw", name, Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap();
    }

    assert_eq!(
        names(store.list("raw", Some("d/")).await.unwrap()),
        vec!["d/e.txt", "d/ef.txt", "d/x.txt"]
    );
    assert_eq!(
        names(store.list("raw", Some("d/e")).await.unwrap()),
        vec!["d/e.txt", "d/ef.txt"]
    );
    assert_eq!(
        names(store.list("raw", Some("b")).await.unwrap()),
        vec!["b.txt", "bb/c.txt"]
    );
}

#[tokio::test]
async fn not_found_responses_are_mapped() {
    let mock = MockBlobService::spawn(MockState::default().with_container("raw")).await;
    let store = shared_key_store(&mock.endpoint);

    assert!(matches!(
        store.download("raw", "ghost.txt").await,
        Err(StoreError::BlobNotFound { blob, .. }) if blob == "ghost.txt"
    ));

    let err = store
        .upload("missing", "a.txt", Bytes::from_static(b"x"), "text/plain")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ContainerNotFound(name) if name == "missing"));

    assert!(store.list("missing", None).await.is_err());
}

#[tokio::test]
async fn sas_credential_is_sent_as_query() {
    let mock = MockBlobService::spawn(MockState::default().with_container("raw")).await;
    let store = AzureBlobStore::new(
        &format!("{}/?sv=2021-08-06&sig=abc", mock.endpoint),
        "devacct",
        AzureAuth::Sas("sv=2021-08-06&sig=abc".into()),
        "raw",
    );

    let url = store
        .upload("raw", "a.txt", Bytes::from_static(b"x"), "text/plain")
        .await
        .unwrap();
    assert!(!url.contains("sig="));

    store.list("raw", None).await.unwrap();
    store.check_ready().await.unwrap();

    let requests = mock.state.requests();
    assert_eq!(requests.len(), 3);
    for request in requests {
        assert_eq!(request.query.get("sig").map(String::as_str), Some("abc"));
        assert!(request.authorization.is_none());
    }
}

#[tokio::test]
async fn service_errors_surface_the_status() {
    let state = MockState {
        forced_error: Some((StatusCode::FORBIDDEN, "AuthorizationFailure")),
        ..MockState::default()
    };
    let mock = MockBlobService::spawn(state).await;
    let store = shared_key_store(&mock.endpoint);

    assert!(matches!(
        store.check_ready().await.unwrap_err(),
        StoreError::ObjectStore(_)
    ));

    let err = store.list("raw", None).await.unwrap_err();
    assert!(matches!(err, StoreError::ObjectStore(_)));
    assert!(err.to_string().contains("403"), "{err}");

    let api = TestApi::spawn_with_store(Arc::new(store)).await;
    let (status, body) = json_response(api.get("/datalake/list?container=raw").await).await;
    assert_eq!(status, 500);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("List operation failed: "),
        "{body}"
    );

    let (status, _) = json_response(api.get("/ready").await).await;
    assert_eq!(status, 503);
}

#[tokio::test]
async fn managed_identity_token_is_fetched_once_and_reused() {
    let identity = MockIdentityService::spawn(3600).await;
    let mock = MockBlobService::spawn(MockState::default().with_container("raw")).await;
    let store = identity_store(&mock.endpoint, &identity);

    store
        .upload("raw", "a.txt", Bytes::from_static(b"x"), "text/plain")
        .await
        .unwrap();
    store.list("raw", None).await.unwrap();
    store.download("raw", "a.txt").await.unwrap();

    let token_requests = identity.requests();
    assert_eq!(token_requests.len(), 1);
    let request = &token_requests[0];
    assert_eq!(request.metadata.as_deref(), Some("true"));
    assert_eq!(
        request.query.get("client_id").map(String::as_str),
        Some("client-123")
    );
    assert!(
        request
            .query
            .get("resource")
            .unwrap()
            .starts_with("https://storage.azure.com")
    );
    assert!(request.query.contains_key("api-version"));

    assert_eq!(bearer_tokens(&mock), vec!["Bearer token-1"; 3]);
}

#[tokio::test]
async fn expired_managed_identity_token_is_refreshed() {
    let identity = MockIdentityService::spawn(0).await;
    let mock = MockBlobService::spawn(MockState::default().with_container("raw")).await;
    let store = identity_store(&mock.endpoint, &identity);

    store
        .upload("raw", "a.txt", Bytes::from_static(b"x"), "text/plain")
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    store.list("raw", None).await.unwrap();

    assert_eq!(identity.requests().len(), 2);
    assert_eq!(
        bearer_tokens(&mock),
        vec!["Bearer token-1", "Bearer token-2"]
    );
}

#[tokio::test]
async fn configured_managed_identity_reaches_the_blob_service() {
    let identity = MockIdentityService::spawn(3600).await;
    let mock = MockBlobService::spawn(MockState::default().with_container("healthcare-data")).await;
    let api = TestApi::spawn_configured(&[
        ("STORAGE_ACCOUNT_URL", mock.endpoint.as_str()),
        ("IDENTITY_ENDPOINT", identity.endpoint.as_str()),
        ("AZURE_CLIENT_ID", "client-123"),
    ])
    .await;

    let (status, body) = json_response(
        api.post_upload(&json!({ "blob_name": "visit.txt", "content": "checked in" }))
            .await,
    )
    .await;
    assert_eq!(status, 200, "{body}");

    let (status, body) = json_response(api.get("/ready").await).await;
    assert_eq!(status, 200, "{body}");

    assert_eq!(identity.requests().len(), 1);
    assert!(
        bearer_tokens(&mock)
            .iter()
            .all(|auth| auth == "Bearer token-1")
    );
}

#[tokio::test]
async fn api_round_trip_through_azure_store() {
    let mock = MockBlobService::spawn(MockState::default().with_container("healthcare-data")).await;
    let api = TestApi::spawn_with_store(Arc::new(shared_key_store(&mock.endpoint))).await;

    let (status, body) = json_response(
        api.post_upload(&json!({ "blob_name": "visit.txt", "content": "checked in" }))
            .await,
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(
        body["blob_url"],
        format!("{}/healthcare-data/visit.txt", mock.endpoint)
    );
    let stored = mock.state.containers.lock().unwrap()["healthcare-data"]["visit.txt"].clone();
    assert_eq!(stored.content_type, "text/plain; charset=utf-8");

    let (status, body) = json_response(api.get("/api/datalake/list").await).await;
    assert_eq!(status, 200);
    assert_eq!(body["blob_count"], 1);
    assert_eq!(body["blobs"][0]["name"], "visit.txt");
    assert_eq!(body["blobs"][0]["size"], 10);
    assert!(body["blobs"][0]["content_type"].is_null());
    assert_eq!(body["blobs"][0]["last_modified"], "2025-10-15T09:30:00Z");

    let (status, body) =
        json_response(api.get("/datalake/download?blob_name=visit.txt").await).await;
    assert_eq!(status, 200);
    assert_eq!(body["content"], "checked in");

    let (status, body) = json_response(api.get("/datalake/list?container=archive").await).await;
    assert_eq!(status, 500);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("List operation failed"),
        "{body}"
    );

    let (status, body) = json_response(api.get("/ready").await).await;
    assert_eq!(status, 200);
    assert_eq!(body["checks"]["storage"]["backend"], "azure");
}
