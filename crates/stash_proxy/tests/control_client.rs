//! Control client: port discovery and the `/clearCache` call.

use std::sync::Arc;

use http::StatusCode;
use stash_proxy::{CLEAR_CACHE_PATH, ControlClient, ProxyError};
use stash_store::{ConfigStore, MemoryStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn calls_clear_cache_on_registered_port() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CLEAR_CACHE_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store: Arc<dyn ConfigStore> = Arc::new(MemoryStore::new());
    store.set_port(server.address().port()).unwrap();

    let client = ControlClient::new(store).unwrap().with_host("127.0.0.1");
    client.clear_remote_cache().await.expect("clear succeeds");
}

#[tokio::test]
async fn no_registered_port_means_no_server_running() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let store: Arc<dyn ConfigStore> = Arc::new(MemoryStore::new());
    store.set_port(server.address().port()).unwrap();
    store.unset_port().unwrap();

    let client = ControlClient::new(store).unwrap().with_host("127.0.0.1");
    let err = client.clear_remote_cache().await.unwrap_err();
    assert!(matches!(err, ProxyError::NoServerRunning));
}

#[tokio::test]
async fn non_success_answer_is_request_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CLEAR_CACHE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store: Arc<dyn ConfigStore> = Arc::new(MemoryStore::new());
    store.set_port(server.address().port()).unwrap();

    let client = ControlClient::new(store).unwrap().with_host("127.0.0.1");
    let err = client.clear_remote_cache().await.unwrap_err();
    match err {
        ProxyError::RequestFailed { status, url, .. } => {
            assert_eq!(status, Some(StatusCode::INTERNAL_SERVER_ERROR));
            assert!(url.ends_with(CLEAR_CACHE_PATH));
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[test]
fn endpoint_defaults_to_localhost() {
    let store: Arc<dyn ConfigStore> = Arc::new(MemoryStore::new());
    let client = ControlClient::new(store).unwrap();
    assert_eq!(client.endpoint(3010), "http://localhost:3010/clearCache");
}
