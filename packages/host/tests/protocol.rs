use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bytes::Bytes;
use stagefs_channel::{ChannelConfig, Connection, Endpoint, Link, Message};
use stagefs_host::{EditorHost, HostError, ScratchDocument};

const HOST: &str = "vscode-webview://editor";
const FRAME: &str = "http://localhost:8601";

/// Start a host for `path` and a stand-in presentation frame that answers
/// `getScratchFile` with `project`.
fn start(path: &Path, project: &'static [u8]) -> (EditorHost, Endpoint) {
    let (host_conn, frame_conn) = Link::pair(HOST, FRAME, &ChannelConfig::default());
    let host = EditorHost::open(path, host_conn.endpoint).unwrap();
    host.spawn(host_conn.inbox);

    let Connection {
        endpoint,
        mut inbox,
    } = frame_conn;
    let responder = endpoint.clone();
    tokio::spawn(async move {
        while let Some(message) = inbox.next_message(&responder).await {
            if let Message::GetScratchFile { request_id } = message {
                responder
                    .send(Message::Response {
                        request_id,
                        body: Some(Bytes::from_static(project)),
                    })
                    .await
                    .unwrap();
            }
        }
    });
    (host, endpoint)
}

async fn load(frame: &Endpoint) -> Bytes {
    match frame
        .call(|request_id| Message::LoadScratchFile { request_id })
        .await
        .unwrap()
    {
        Message::LoadScratchFileResponse { body, .. } => body,
        other => panic!("unexpected {other:?}"),
    }
}

async fn get_file(frame: &Endpoint, path: &str) -> Option<Bytes> {
    let path = path.to_string();
    match frame
        .call(|request_id| Message::GetFile { request_id, path })
        .await
        .unwrap()
    {
        Message::GetFileResponse { file_content, .. } => file_content,
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn load_returns_document_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.sb3");
    fs::write(&path, b"sb3 bytes").unwrap();

    let (_host, frame) = start(&path, b"");
    assert_eq!(load(&frame).await, Bytes::from_static(b"sb3 bytes"));
}

#[tokio::test]
async fn new_document_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (_host, frame) = start(&dir.path().join("new.sb3"), b"");
    assert!(load(&frame).await.is_empty());
}

#[tokio::test]
async fn get_file_stays_inside_project_folder() {
    let dir = tempfile::tempdir().unwrap();
    let project_dir = dir.path().join("project");
    fs::create_dir_all(project_dir.join("leopard")).unwrap();
    fs::write(project_dir.join("leopard/index.js"), b"js").unwrap();
    fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

    let (_host, frame) = start(&project_dir.join("game.sb3"), b"");

    assert_eq!(
        get_file(&frame, "/leopard/index.js").await,
        Some(Bytes::from_static(b"js"))
    );
    assert_eq!(get_file(&frame, "/leopard/missing.js").await, None);
    assert_eq!(get_file(&frame, "../secret.txt").await, None);
    assert_eq!(get_file(&frame, "/").await, None);
}

#[tokio::test]
async fn save_leopard_files_replaces_output_folder() {
    let dir = tempfile::tempdir().unwrap();
    let leopard = dir.path().join("leopard");
    fs::create_dir_all(leopard.join("Old")).unwrap();
    fs::write(leopard.join("Old/stale.js"), b"stale").unwrap();

    let (_host, frame) = start(&dir.path().join("game.sb3"), b"");

    let mut body = BTreeMap::new();
    body.insert("./index.html".to_string(), Bytes::from_static(b"<html>"));
    body.insert("./Cat/Cat.js".to_string(), Bytes::from_static(b"class Cat {}"));
    body.insert("./Cat/costumes/a.svg".to_string(), Bytes::new());

    let reply = frame
        .call(|request_id| Message::SaveLeopardFiles { request_id, body })
        .await
        .unwrap();
    assert!(matches!(reply, Message::SaveLeopardFilesResponse { .. }));

    assert!(!leopard.join("Old").exists());
    assert_eq!(fs::read(leopard.join("index.html")).unwrap(), b"<html>");
    assert_eq!(fs::read(leopard.join("Cat/Cat.js")).unwrap(), b"class Cat {}");
    assert!(fs::read(leopard.join("Cat/costumes/a.svg")).unwrap().is_empty());
}

#[tokio::test]
async fn content_changed_marks_dirty_and_save_cleans() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.sb3");
    fs::write(&path, b"old").unwrap();

    let (host, frame) = start(&path, b"new project");
    assert!(!host.is_dirty());

    frame.send(Message::ScratchContentChanged).await.unwrap();
    // Messages are handled in order, so once this reply arrives the
    // notification has been processed.
    load(&frame).await;
    assert!(host.is_dirty());

    host.save().await.unwrap();
    assert!(!host.is_dirty());
    assert_eq!(fs::read(&path).unwrap(), b"new project");
    assert_eq!(host.document().data(), &Bytes::from_static(b"new project"));
    assert_eq!(host.endpoint().pending_calls(), 0);
}

#[tokio::test]
async fn save_as_and_backup_leave_document_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.sb3");
    fs::write(&path, b"old").unwrap();

    let (host, frame) = start(&path, b"edited");
    frame.send(Message::ScratchContentChanged).await.unwrap();
    load(&frame).await;

    let copy = dir.path().join("copies/copy.sb3");
    host.save_as(&copy).await.unwrap();
    assert_eq!(fs::read(&copy).unwrap(), b"edited");
    assert!(host.is_dirty());

    let backup = host.backup(&dir.path().join("backup.sb3")).await.unwrap();
    assert_eq!(fs::read(&backup.path).unwrap(), b"edited");
    let restored = ScratchDocument::open_backup(&path, &backup.path).unwrap();
    assert_eq!(restored.path(), path.as_path());
    assert_eq!(restored.data(), &Bytes::from_static(b"edited"));
    assert!(restored.is_dirty());
    backup.delete();
    assert!(!backup.path.exists());

    host.revert().unwrap();
    assert!(!host.is_dirty());
    assert_eq!(host.document().data(), &Bytes::from_static(b"old"));
}

#[tokio::test]
async fn save_without_project_body_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (host_conn, frame_conn) = Link::pair(HOST, FRAME, &ChannelConfig::default());
    let host = EditorHost::open(dir.path().join("game.sb3"), host_conn.endpoint).unwrap();
    host.spawn(host_conn.inbox);

    let Connection {
        endpoint,
        mut inbox,
    } = frame_conn;
    tokio::spawn(async move {
        while let Some(message) = inbox.next_message(&endpoint).await {
            if let Message::GetScratchFile { request_id } = message {
                endpoint
                    .send(Message::Response {
                        request_id,
                        body: None,
                    })
                    .await
                    .unwrap();
            }
        }
    });

    assert!(matches!(host.save().await, Err(HostError::EmptyProject)));
    assert!(!dir.path().join("game.sb3").exists());
}
