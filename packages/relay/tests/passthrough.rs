use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stagefs_core::{ContentType, FrameId, StatusCode};
use stagefs_relay::{AssetRelay, RelayConfig, RelayError, ReqwestPassthrough};

fn relay() -> AssetRelay {
    let passthrough = ReqwestPassthrough::new(Duration::from_secs(5)).unwrap();
    AssetRelay::new(RelayConfig::default(), Arc::new(passthrough))
}

#[tokio::test]
async fn non_virtual_requests_are_fetched_unmodified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leopard@^1/dist/index.esm.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("export class Project {}", "application/javascript"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let relay = relay();
    let url = format!("{}/leopard@^1/dist/index.esm.js", server.uri());

    // No caching: both requests reach the server.
    for _ in 0..2 {
        let content = relay.handle_request(&url, FrameId::new()).await.unwrap();
        assert_eq!(content.status, StatusCode::OK);
        assert_eq!(content.content_type, ContentType::JAVASCRIPT);
        assert_eq!(&content.body[..], b"export class Project {}");
    }
}

#[tokio::test]
async fn upstream_status_is_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/style.css"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let relay = relay();
    let content = relay
        .handle_request(&format!("{}/style.css", server.uri()), FrameId::new())
        .await
        .unwrap();
    assert!(content.is_not_found());
}

#[tokio::test]
async fn missing_content_type_defaults_to_octet_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
        .mount(&server)
        .await;

    let relay = relay();
    let content = relay
        .handle_request(&format!("{}/blob", server.uri()), FrameId::new())
        .await
        .unwrap();
    assert_eq!(content.content_type, ContentType::OCTET_STREAM);
    assert_eq!(content.len(), 3);
}

#[tokio::test]
async fn unreachable_host_is_a_passthrough_error() {
    let relay = relay();
    let err = relay
        .handle_request("http://127.0.0.1:1/app.js", FrameId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Passthrough { .. }));
}
