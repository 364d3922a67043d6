//! # stagefs-transcode
//!
//! Turns a Scratch 3 project into a Leopard bundle: one module per actor, an
//! entry module, the assets, and a single self-contained `index.html` in
//! which every module is inlined and every asset is a `data:` URI.
//!
//! ```rust,no_run
//! use stagefs_transcode::{transcode, ProjectBundle, TranscodeOptions};
//!
//! # fn main() -> Result<(), stagefs_transcode::TranscodeError> {
//! let sb3 = std::fs::read("project.sb3").unwrap();
//! let project = ProjectBundle::from_sb3(&sb3)?;
//! let bundle = transcode(&project, &TranscodeOptions::default())?;
//! assert!(bundle.document().is_some());
//! # Ok(())
//! # }
//! ```

mod blocks;
mod bundle;
mod codegen;
mod emit;
mod error;
mod inline;
mod merge;
mod names;
mod options;
mod project;

use stagefs_core::ContentType;
use tracing::{debug, instrument};

pub use bundle::{Bundle, BundleEntry, EntryKind};
pub use error::{Result, TranscodeError};
pub use names::{file_stem, identifier, Case, NameSet};
pub use options::TranscodeOptions;
pub use project::{Block, BlockEntry, Costume, Project, ProjectBundle, Sound, Target};

/// Transcode `project` into a bundle.
///
/// Either the whole bundle is produced or an error is returned. Equal inputs
/// give byte-identical bundles.
#[instrument(skip_all, fields(targets = project.project().targets.len()))]
pub fn transcode(project: &ProjectBundle, options: &TranscodeOptions) -> Result<Bundle> {
    let generated = codegen::generate(project, options);

    let mut bundle = Bundle::default();
    let mut assets = inline::AssetMap::new();
    for asset in &generated.assets {
        let bytes = project
            .asset(&asset.file)
            .cloned()
            .ok_or_else(|| TranscodeError::format(format!("missing asset {}", asset.file)))?;
        bundle.insert(
            asset.url.clone(),
            EntryKind::Asset,
            asset.content_type.clone(),
            bytes.clone(),
        );
        assets.insert(asset.url.clone(), (asset.content_type.clone(), bytes));
    }
    for (path, source) in &generated.modules {
        bundle.insert(
            path.clone(),
            EntryKind::Module,
            ContentType::JAVASCRIPT,
            source.clone(),
        );
    }

    let script = merge::merge(
        codegen::DOCUMENT,
        &codegen::document_script(options),
        &generated.modules,
        &options.library_url,
    )?;
    let script = inline::inline_assets(&script, &assets);
    let document = codegen::document(&script, options);
    bundle.insert(
        codegen::DOCUMENT,
        EntryKind::Document,
        ContentType::HTML,
        document,
    );

    debug!(
        modules = generated.modules.len(),
        assets = assets.len(),
        "transcoded"
    );
    Ok(bundle)
}
