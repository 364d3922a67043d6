use std::fs;
use std::path::{Path, PathBuf};

use stagefs_cli::commands;
use stagefs_core::StatusCode;
use stagefs_relay::RelayConfig;
use stagefs_transcode::{ProjectBundle, TranscodeOptions};

fn blank_project(dir: &Path) -> PathBuf {
    let path = dir.join("game.sb3");
    fs::write(&path, ProjectBundle::blank().to_sb3().unwrap()).unwrap();
    path
}

#[test]
fn transcode_writes_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let project = blank_project(dir.path());
    let out = dir.path().join("out");

    let written =
        commands::transcode_to_dir(&project, &out, &TranscodeOptions::default()).unwrap();
    assert_eq!(written.len(), 4);
    assert!(out.join("index.html").is_file());
    assert!(out.join("Stage/Stage.js").is_file());
    assert!(out.join("Stage/costumes/backdrop1.svg").is_file());
}

#[test]
fn transcode_rejects_non_projects() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("broken.sb3");
    fs::write(&project, b"not a zip").unwrap();

    let err = commands::transcode_to_dir(&project, &dir.path().join("out"), &TranscodeOptions::default())
        .unwrap_err();
    assert!(format!("{:#}", err).contains("parse project"));
    assert!(!dir.path().join("out").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn preview_serves_document_and_modules() {
    let dir = tempfile::tempdir().unwrap();
    let project = blank_project(dir.path());

    let paths = vec![
        "/leopard/Stage/Stage.js".to_string(),
        "leopard/Stage/missing.js".to_string(),
    ];
    let served = commands::preview(
        &project,
        &paths,
        RelayConfig::default(),
        TranscodeOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(served.len(), 3);
    assert!(served[0].url.contains("/leopard/index.html?parentAppClientId="));
    assert_eq!(served[0].status, StatusCode::OK);
    assert_eq!(served[0].content_type, "text/html");
    assert!(served[0].size > 0);

    assert_eq!(served[1].status, StatusCode::OK);
    assert_eq!(served[1].content_type, "application/javascript");
    assert_eq!(served[2].status, StatusCode::NOT_FOUND);

    assert!(dir.path().join("leopard/index.html").is_file());
}

#[tokio::test]
async fn slot_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let project = blank_project(dir.path());
    let root = dir.path().join("slot");

    let count = commands::slot_save(&root, None, &project, None, &TranscodeOptions::default())
        .await
        .unwrap();
    assert_eq!(count, 4);
    assert!(root.join("scratch/game.sb3").is_file());
    assert!(root.join("leopard/Stage/Stage.js").is_file());

    let out = dir.path().join("restored");
    let written = commands::slot_load(&root, None, &out).await.unwrap();
    assert_eq!(written.len(), 5);
    assert_eq!(
        fs::read(out.join("game.sb3")).unwrap(),
        fs::read(&project).unwrap()
    );
    assert!(out.join("leopard/index.html").is_file());
}

#[tokio::test]
async fn slot_save_uses_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    let project = blank_project(dir.path());
    let leopard = dir.path().join("leopard");
    fs::create_dir_all(leopard.join("Stage")).unwrap();
    fs::write(leopard.join("index.html"), b"<html>").unwrap();
    fs::write(leopard.join("Stage/Stage.js"), b"").unwrap();

    let root = dir.path().join("slot");
    let count = commands::slot_save(
        &root,
        None,
        &project,
        Some(&leopard),
        &TranscodeOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(count, 2);
    assert_eq!(fs::read(root.join("leopard/index.html")).unwrap(), b"<html>");
    assert!(fs::read(root.join("leopard/Stage/Stage.js")).unwrap().is_empty());
}
