use std::sync::Arc;

use bytes::Bytes;

use stagefs_channel::{ChannelConfig, Link, Message};
use stagefs_core::{ContentType, FrameId};
use stagefs_relay::{AssetRelay, ReqwestPassthrough, RelayConfig};

fn relay() -> AssetRelay {
    let passthrough = ReqwestPassthrough::with_default_timeout().unwrap();
    AssetRelay::new(RelayConfig::default(), Arc::new(passthrough))
}

#[tokio::test]
async fn attached_frame_serves_files_over_the_link() {
    let relay = relay();
    let frame_id = FrameId::new();
    let (relay_side, frame_side) = Link::pair(
        &relay.config().origin,
        "http://editor.localhost:3000",
        &ChannelConfig::default(),
    );
    let pump = relay
        .attach(frame_id, "http://editor.localhost:3000/", relay_side)
        .unwrap();

    let frame_ep = frame_side.endpoint;
    let mut frame_inbox = frame_side.inbox;

    // The presentation frame: learn its id, then answer getFile requests.
    let responder = {
        let frame_ep = frame_ep.clone();
        tokio::spawn(async move {
            let mut served = Vec::new();
            while served.len() < 3 {
                let Some(message) = frame_inbox.next_message(&frame_ep).await else {
                    break;
                };
                if let Message::GetFile { request_id, path } = message {
                    let file_content = match path.as_str() {
                        "/leopard/index.html" => Some(Bytes::from_static(b"<html>")),
                        "/leopard/index.js" => Some(Bytes::from_static(b"js")),
                        _ => None,
                    };
                    served.push(path);
                    frame_ep
                        .send(Message::GetFileResponse {
                            request_id,
                            file_content,
                        })
                        .await
                        .unwrap();
                }
            }
            served
        })
    };

    let reply = frame_ep
        .call(|request_id| Message::GetClientId { request_id })
        .await
        .unwrap();
    assert!(matches!(
        reply,
        Message::GetClientIdResponse { client_id, .. } if client_id == frame_id
    ));

    let consumer = FrameId::new();
    let document = relay.config().consumer_url(frame_id);
    let html = relay.handle_request(&document, consumer).await.unwrap();
    assert_eq!(html.content_type, ContentType::HTML);

    let js = relay
        .handle_request("http://localhost:8601/leopard/index.js", consumer)
        .await
        .unwrap();
    assert_eq!(&js.body[..], b"js");

    let missing = relay
        .handle_request("http://localhost:8601/leopard/nope.png", consumer)
        .await
        .unwrap();
    assert!(missing.is_not_found());

    let served = responder.await.unwrap();

    // Closing the link ends the pump and drops the session.
    drop(frame_ep);
    pump.await.unwrap();
    assert_eq!(relay.session_count(), 0);
    assert_eq!(
        served,
        vec!["/leopard/index.html", "/leopard/index.js", "/leopard/nope.png"]
    );
}
