//! Subcommand implementations.
//!
//! Each returns what it did so callers can print or check it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use bytes::Bytes;
use stagefs_channel::Link;
use stagefs_core::{fs_tree, FrameId, StatusCode, VirtualPath};
use stagefs_host::EditorHost;
use stagefs_preview::PresentationFrame;
use stagefs_relay::{AssetRelay, RelayConfig};
use stagefs_storage::{AssetSet, NamedFile, StorageClient, StorageSlot};
use stagefs_transcode::{transcode, ProjectBundle, TranscodeOptions};
use tracing::{debug, info};

const EDITOR_ORIGIN: &str = "vscode-webview://stagefs.editor";
const PRESENTATION_ORIGIN: &str = "vscode-webview://stagefs.preview";

fn read_project(path: &Path) -> anyhow::Result<ProjectBundle> {
    let bytes = fs::read(path).with_context(|| format!("read project '{}'", path.display()))?;
    ProjectBundle::from_sb3(&bytes).with_context(|| format!("parse project '{}'", path.display()))
}

fn write_files(out: &Path, files: &BTreeMap<String, Bytes>) -> anyhow::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for (name, data) in files {
        let path = VirtualPath::parse(name)
            .ok()
            .filter(|p| !p.is_empty())
            .with_context(|| format!("unsafe output path '{}'", name))?;
        let target = fs_tree::write_under(out, &path, data)
            .with_context(|| format!("write '{}'", fs_tree::resolve_under(out, &path).display()))?;
        written.push(target);
    }
    Ok(written)
}

/// Transcode `project` and write the bundle beneath `out`.
pub fn transcode_to_dir(
    project: &Path,
    out: &Path,
    options: &TranscodeOptions,
) -> anyhow::Result<Vec<PathBuf>> {
    let bundle = transcode(&read_project(project)?, options)?;
    let written = write_files(out, &bundle.into_files())?;
    info!(out = %out.display(), files = written.len(), "bundle written");
    Ok(written)
}

/// One response observed through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub url: String,
    pub status: StatusCode,
    pub content_type: String,
    pub size: usize,
}

impl std::fmt::Display for Served {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:<24} {:>8}  {}",
            self.status.as_u16(),
            self.content_type,
            self.size,
            self.url
        )
    }
}

/// Absolute URL for `path` on the relay origin; full URLs pass through.
fn request_url(config: &RelayConfig, path: &str) -> String {
    if path.contains("://") {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            config.origin.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Run the editor host, a presentation frame and the relay in-process,
/// generate the bundle for `project`, load the document as a consumer
/// frame would, then request each of `paths`.
///
/// Generated files are written to the `leopard` folder next to `project`.
pub async fn preview(
    project: &Path,
    paths: &[String],
    config: RelayConfig,
    options: TranscodeOptions,
) -> anyhow::Result<Vec<Served>> {
    let relay = AssetRelay::with_config(config.clone())?;

    let (host_side, frame_host_side) =
        Link::pair(EDITOR_ORIGIN, PRESENTATION_ORIGIN, &config.channel);
    let (relay_side, frame_relay_side) =
        Link::pair(&config.origin, PRESENTATION_ORIGIN, &config.channel);

    let frame_id = FrameId::new();
    relay.attach(frame_id, &format!("{}/", PRESENTATION_ORIGIN), relay_side)?;

    let host = EditorHost::open(project, host_side.endpoint)?;
    host.spawn(host_side.inbox);

    let frame = PresentationFrame::new(
        frame_host_side.endpoint,
        frame_relay_side.endpoint,
        config.clone(),
        options,
    );
    frame.spawn(frame_host_side.inbox, frame_relay_side.inbox);

    frame.start().await?;
    let version = frame.generate().await?;
    debug!(version, "bundle handed to host");

    let Some(document) = frame.consumer_url() else {
        bail!("presentation frame has no client id");
    };
    let consumer = FrameId::new();

    let mut served = Vec::with_capacity(paths.len() + 1);
    let urls = std::iter::once(document).chain(paths.iter().map(|p| request_url(&config, p)));
    for url in urls {
        let content = relay.respond(&url, consumer).await;
        served.push(Served {
            url,
            status: content.status,
            content_type: content.content_type.as_str().to_string(),
            size: content.len(),
        });
    }
    relay.unregister(consumer);
    Ok(served)
}

enum Slot {
    Local(StorageSlot),
    Remote(StorageClient),
}

impl Slot {
    fn open(root: &Path, server: Option<&str>) -> anyhow::Result<Self> {
        Ok(match server {
            Some(base) => Slot::Remote(StorageClient::with_default_timeout(base)?),
            None => Slot::Local(StorageSlot::new(root)),
        })
    }

    async fn save(&self, assets: &AssetSet) -> anyhow::Result<()> {
        match self {
            Slot::Local(slot) => slot.save_assets(assets)?,
            Slot::Remote(client) => client.save(assets).await?,
        }
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<AssetSet> {
        Ok(match self {
            Slot::Local(slot) => slot.load_assets()?,
            Slot::Remote(client) => client.load_assets().await?,
        })
    }
}

/// Store `project` in the slot with either the files under `leopard` or a
/// fresh transcode. Returns the number of generated files stored.
pub async fn slot_save(
    root: &Path,
    server: Option<&str>,
    project: &Path,
    leopard: Option<&Path>,
    options: &TranscodeOptions,
) -> anyhow::Result<usize> {
    let data = fs::read(project).with_context(|| format!("read project '{}'", project.display()))?;
    let name = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("'{}' has no file name", project.display()))?;

    let files = match leopard {
        Some(dir) => read_tree(dir)?,
        None => {
            let bundle = ProjectBundle::from_sb3(&data)
                .with_context(|| format!("parse project '{}'", project.display()))?;
            transcode(&bundle, options)?.into_files()
        }
    };

    let scratch = NamedFile {
        name,
        data: Bytes::from(data),
    };
    let assets = AssetSet::from_files(scratch, files)?;
    Slot::open(root, server)?.save(&assets).await?;
    Ok(assets.leopard().len())
}

/// Copy the slot's contents into `out`: the project at the top, generated
/// files under `out/leopard`.
pub async fn slot_load(
    root: &Path,
    server: Option<&str>,
    out: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let assets = Slot::open(root, server)?.load().await?;

    let mut files = BTreeMap::new();
    files.insert(assets.scratch.name.clone(), assets.scratch.data.clone());
    for file in assets.leopard() {
        files.insert(
            format!("{}/{}", stagefs_storage::LEOPARD_FOLDER, file.relative_path()),
            file.data.clone(),
        );
    }
    write_files(out, &files)
}

/// Every file beneath `dir`, keyed by `./`-relative path.
fn read_tree(dir: &Path) -> anyhow::Result<BTreeMap<String, Bytes>> {
    let mut files = BTreeMap::new();
    let relative = fs_tree::walk_files(dir).with_context(|| format!("walk '{}'", dir.display()))?;
    if relative.is_empty() {
        bail!("no generated files under '{}'", dir.display());
    }
    for path in relative {
        let full = dir.join(&path);
        let data = fs::read(&full).with_context(|| format!("read '{}'", full.display()))?;
        let key = path
            .iter()
            .map(|c| c.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(format!("./{}", key), Bytes::from(data));
    }
    Ok(files)
}
