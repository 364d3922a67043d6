use std::collections::BTreeMap;
use std::fs;

use bytes::Bytes;
use stagefs_storage::{AssetSet, NamedFile, StorageSlot};

fn sample() -> AssetSet {
    let mut files = BTreeMap::new();
    files.insert("./index.html".to_string(), Bytes::from_static(b"<html>"));
    files.insert("./Cat/Cat.js".to_string(), Bytes::from_static(b"class Cat {}"));
    files.insert("./Cat/costumes/cat.svg".to_string(), Bytes::from_static(b"<svg/>"));
    files.insert("./Stage/sounds/pop.wav".to_string(), Bytes::new());
    AssetSet::from_files(
        NamedFile {
            name: "game.sb3".into(),
            data: Bytes::from_static(b"PK\x03\x04"),
        },
        files,
    )
    .unwrap()
}

#[test]
fn save_then_load_round_trips_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let slot = StorageSlot::new(dir.path().join("data"));
    let assets = sample();

    slot.save_assets(&assets).unwrap();
    assert_eq!(slot.load_assets().unwrap(), assets);
}

#[test]
fn layout_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let slot = StorageSlot::new(dir.path());
    slot.save_assets(&sample()).unwrap();

    assert!(dir.path().join("scratch/game.sb3").is_file());
    assert!(dir.path().join("leopard/index.html").is_file());
    assert!(dir.path().join("leopard/Cat/costumes/cat.svg").is_file());
    assert_eq!(
        fs::metadata(dir.path().join("leopard/Stage/sounds/pop.wav"))
            .unwrap()
            .len(),
        0
    );

    let map = slot.load().unwrap();
    let keys: Vec<&str> = map.files_map.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "leopard/Cat/Cat.js",
            "leopard/Cat/costumes/cat.svg",
            "leopard/Stage/sounds/pop.wav",
            "leopard/index.html",
            "scratch/game.sb3",
        ]
    );
    assert_eq!(map.files_map["scratch/game.sb3"].file, "game.sb3");
    assert_eq!(map.files_map["leopard/index.html"].content, "PGh0bWw+");
}

#[test]
fn save_replaces_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    let slot = StorageSlot::new(dir.path());
    slot.save_assets(&sample()).unwrap();

    let smaller = AssetSet::new(
        NamedFile {
            name: "other.sb3".into(),
            data: Bytes::from_static(b"other"),
        },
        Vec::new(),
    );
    slot.save_assets(&smaller).unwrap();

    assert!(!dir.path().join("scratch/game.sb3").exists());
    assert!(!dir.path().join("leopard").exists());
    assert_eq!(slot.load_assets().unwrap(), smaller);
}
