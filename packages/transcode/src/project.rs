//! Scratch 3 project model and `.sb3` loading.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read, Write};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::TranscodeError;

/// The decoded `project.json`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Project {
    pub targets: Vec<Target>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// A stage or sprite.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub is_stage: bool,
    pub name: String,
    /// id -> `[name, value]`
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    /// id -> `[name, [items...]]`
    #[serde(default)]
    pub lists: BTreeMap<String, Value>,
    /// id -> name
    #[serde(default)]
    pub broadcasts: BTreeMap<String, String>,
    #[serde(default)]
    pub blocks: BTreeMap<String, BlockEntry>,
    #[serde(default)]
    pub costumes: Vec<Costume>,
    #[serde(default)]
    pub sounds: Vec<Sound>,
    #[serde(default)]
    pub current_costume: usize,
    #[serde(default)]
    pub layer_order: i64,
    #[serde(default = "defaults::volume")]
    pub volume: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "defaults::size")]
    pub size: f64,
    #[serde(default = "defaults::direction")]
    pub direction: f64,
    #[serde(default = "defaults::visible")]
    pub visible: bool,
    #[serde(default = "defaults::rotation_style")]
    pub rotation_style: String,
}

mod defaults {
    pub fn volume() -> f64 {
        100.0
    }
    pub fn size() -> f64 {
        100.0
    }
    pub fn direction() -> f64 {
        90.0
    }
    pub fn visible() -> bool {
        true
    }
    pub fn rotation_style() -> String {
        "all around".to_string()
    }
}

/// An entry of a target's block map. Top-level variable and list reporters
/// are stored as bare arrays rather than block objects.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BlockEntry {
    Block(Block),
    Primitive(Value),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub opcode: String,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub shadow: bool,
    #[serde(default)]
    pub top_level: bool,
    #[serde(default)]
    pub mutation: Option<BTreeMap<String, Value>>,
}

impl Block {
    /// First element of a field, e.g. the variable name of `["my var", "id"]`.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            Value::Array(parts) => parts.first()?.as_str(),
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Second element of a field: the referenced id, if any.
    pub fn field_id(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            Value::Array(parts) => parts.get(1)?.as_str(),
            _ => None,
        }
    }

    /// A mutation attribute as a string.
    pub fn mutation_str(&self, name: &str) -> Option<&str> {
        self.mutation.as_ref()?.get(name)?.as_str()
    }

    /// A mutation attribute holding a JSON-encoded string array.
    pub fn mutation_list(&self, name: &str) -> Vec<String> {
        match self.mutation.as_ref().and_then(|m| m.get(name)) {
            Some(Value::String(encoded)) => serde_json::from_str(encoded).unwrap_or_default(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Block ids referenced from this block's inputs.
    fn input_refs(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().filter_map(|input| match input {
            Value::Array(parts) => Some(parts.iter().skip(1).filter_map(Value::as_str)),
            _ => None,
        })
        .flatten()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Costume {
    pub asset_id: String,
    pub name: String,
    #[serde(default)]
    pub md5ext: Option<String>,
    pub data_format: String,
    #[serde(default)]
    pub bitmap_resolution: Option<f64>,
    #[serde(default)]
    pub rotation_center_x: f64,
    #[serde(default)]
    pub rotation_center_y: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub asset_id: String,
    pub name: String,
    #[serde(default)]
    pub md5ext: Option<String>,
    pub data_format: String,
}

/// Archive name of an asset: `md5ext` when present, else `assetId.dataFormat`.
fn asset_file(md5ext: &Option<String>, asset_id: &str, data_format: &str) -> String {
    md5ext
        .clone()
        .unwrap_or_else(|| format!("{}.{}", asset_id, data_format))
}

impl Costume {
    pub fn asset_file(&self) -> String {
        asset_file(&self.md5ext, &self.asset_id, &self.data_format)
    }
}

impl Sound {
    pub fn asset_file(&self) -> String {
        asset_file(&self.md5ext, &self.asset_id, &self.data_format)
    }
}

impl Target {
    /// Parsed blocks, skipping top-level primitives.
    pub fn scripts(&self) -> BTreeMap<&str, &Block> {
        self.blocks
            .iter()
            .filter_map(|(id, entry)| match entry {
                BlockEntry::Block(block) => Some((id.as_str(), block)),
                BlockEntry::Primitive(_) => None,
            })
            .collect()
    }
}

/// A project together with the asset files it references.
#[derive(Debug, Clone)]
pub struct ProjectBundle {
    json: Bytes,
    project: Project,
    assets: BTreeMap<String, Bytes>,
}

impl ProjectBundle {
    /// Load a `.sb3` archive: `project.json` plus assets named by `md5ext`.
    pub fn from_sb3(bytes: &[u8]) -> Result<Self, TranscodeError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| TranscodeError::format(format!("not an sb3 archive: {}", e)))?;

        let mut json = None;
        let mut assets = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .map_err(zip::result::ZipError::Io)?;
            if name == "project.json" {
                json = Some(buf);
            } else {
                assets.insert(name, Bytes::from(buf));
            }
        }

        let json = json.ok_or_else(|| TranscodeError::format("archive has no project.json"))?;
        Self::from_parts(json, assets)
    }

    /// Build from a `project.json` document and its assets keyed by file name.
    pub fn from_parts(
        json: impl Into<Bytes>,
        assets: BTreeMap<String, Bytes>,
    ) -> Result<Self, TranscodeError> {
        let json = json.into();
        let project: Project = serde_json::from_slice(&json)
            .map_err(|e| TranscodeError::format(format!("project.json: {}", e)))?;
        let bundle = Self {
            json,
            project,
            assets,
        };
        bundle.validate()?;
        debug!(
            targets = bundle.project.targets.len(),
            assets = bundle.assets.len(),
            "project loaded"
        );
        Ok(bundle)
    }

    /// The project a fresh editor starts with: a stage with one empty
    /// backdrop and nothing else.
    pub fn blank() -> Self {
        const BACKDROP_ID: &str = "cd21514d0531fdffb22204e0ec5ed84a";
        const BACKDROP: &[u8] = br#"<svg version="1.1" width="2" height="2" viewBox="-1 -1 2 2" xmlns="http://www.w3.org/2000/svg"></svg>"#;

        let stage = Target {
            is_stage: true,
            name: "Stage".to_string(),
            variables: BTreeMap::new(),
            lists: BTreeMap::new(),
            broadcasts: BTreeMap::new(),
            blocks: BTreeMap::new(),
            costumes: vec![Costume {
                asset_id: BACKDROP_ID.to_string(),
                name: "backdrop1".to_string(),
                md5ext: Some(format!("{}.svg", BACKDROP_ID)),
                data_format: "svg".to_string(),
                bitmap_resolution: Some(1.0),
                rotation_center_x: 240.0,
                rotation_center_y: 180.0,
            }],
            sounds: Vec::new(),
            current_costume: 0,
            layer_order: 0,
            volume: defaults::volume(),
            x: 0.0,
            y: 0.0,
            size: defaults::size(),
            direction: defaults::direction(),
            visible: defaults::visible(),
            rotation_style: defaults::rotation_style(),
        };
        let project = Project {
            targets: vec![stage],
            extensions: Vec::new(),
        };
        let json = serde_json::to_vec(&project).unwrap_or_default();
        let mut assets = BTreeMap::new();
        assets.insert(
            format!("{}.svg", BACKDROP_ID),
            Bytes::from_static(BACKDROP),
        );
        Self {
            json: Bytes::from(json),
            project,
            assets,
        }
    }

    /// Write back out as a `.sb3` archive.
    pub fn to_sb3(&self) -> Result<Vec<u8>, TranscodeError> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);

            writer.start_file("project.json", options)?;
            writer
                .write_all(&self.json)
                .map_err(zip::result::ZipError::Io)?;
            for (name, content) in &self.assets {
                writer.start_file(name.as_str(), options)?;
                writer.write_all(content).map_err(zip::result::ZipError::Io)?;
            }
            writer.finish()?;
        }
        Ok(buf)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn asset(&self, file: &str) -> Option<&Bytes> {
        self.assets.get(file)
    }

    pub fn stage(&self) -> &Target {
        // validate() guarantees exactly one stage.
        self.project
            .targets
            .iter()
            .find(|t| t.is_stage)
            .unwrap_or(&self.project.targets[0])
    }

    /// Sprites in layer order.
    pub fn sprites(&self) -> Vec<&Target> {
        let mut sprites: Vec<&Target> =
            self.project.targets.iter().filter(|t| !t.is_stage).collect();
        sprites.sort_by_key(|t| t.layer_order);
        sprites
    }

    fn validate(&self) -> Result<(), TranscodeError> {
        let stages = self.project.targets.iter().filter(|t| t.is_stage).count();
        if stages != 1 {
            return Err(TranscodeError::format(format!(
                "expected exactly one stage, found {}",
                stages
            )));
        }

        for target in &self.project.targets {
            self.validate_target(target)?;
        }
        Ok(())
    }

    fn validate_target(&self, target: &Target) -> Result<(), TranscodeError> {
        for costume in &target.costumes {
            let file = costume.asset_file();
            if !self.assets.contains_key(&file) {
                return Err(TranscodeError::format(format!(
                    "{}: costume '{}' references missing asset {}",
                    target.name, costume.name, file
                )));
            }
        }
        for sound in &target.sounds {
            let file = sound.asset_file();
            if !self.assets.contains_key(&file) {
                return Err(TranscodeError::format(format!(
                    "{}: sound '{}' references missing asset {}",
                    target.name, sound.name, file
                )));
            }
        }

        let ids: HashSet<&str> = target.blocks.keys().map(String::as_str).collect();
        for (id, entry) in &target.blocks {
            let block = match entry {
                BlockEntry::Block(block) => block,
                BlockEntry::Primitive(Value::Array(_)) => continue,
                BlockEntry::Primitive(_) => {
                    return Err(TranscodeError::format(format!(
                        "{}: block {} is not a block",
                        target.name, id
                    )))
                }
            };
            let dangling = block
                .next
                .as_deref()
                .into_iter()
                .chain(block.input_refs())
                .find(|r| !ids.contains(r));
            if let Some(missing) = dangling {
                return Err(TranscodeError::format(format!(
                    "{}: block {} references unknown block {}",
                    target.name, id, missing
                )));
            }
        }
        if let Some(id) = find_cycle(target) {
            return Err(TranscodeError::format(format!(
                "{}: block {} is part of a cycle",
                target.name, id
            )));
        }
        Ok(())
    }
}

/// A block that can reach itself through `next` or input links.
///
/// Depth-first with an explicit stack; each block is finished once.
fn find_cycle(target: &Target) -> Option<&str> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Open,
        Done,
    }

    fn edges<'t>(target: &'t Target, id: &str) -> Vec<&'t str> {
        match target.blocks.get(id) {
            Some(BlockEntry::Block(block)) => block
                .next
                .as_deref()
                .into_iter()
                .chain(block.input_refs())
                .collect(),
            _ => Vec::new(),
        }
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for root in target.blocks.keys() {
        let root = root.as_str();
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root, Mark::Open);
        let mut pending = vec![(root, edges(target, root).into_iter())];
        while let Some((id, children)) = pending.last_mut() {
            match children.next() {
                Some(child) => match marks.get(child) {
                    Some(Mark::Open) => return Some(child),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::Open);
                        pending.push((child, edges(target, child).into_iter()));
                    }
                },
                None => {
                    marks.insert(*id, Mark::Done);
                    pending.pop();
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_project_is_valid() {
        let blank = ProjectBundle::blank();
        blank.validate().unwrap();
        assert!(blank.sprites().is_empty());
        assert_eq!(blank.stage().costumes.len(), 1);

        let reloaded = ProjectBundle::from_sb3(&blank.to_sb3().unwrap()).unwrap();
        assert_eq!(reloaded.stage().name, "Stage");
        assert!(reloaded
            .asset("cd21514d0531fdffb22204e0ec5ed84a.svg")
            .is_some());
    }

    #[test]
    fn declared_entry_sizes_are_not_trusted() {
        let mut sb3 = ProjectBundle::blank().to_sb3().unwrap();
        // Claim almost 4 GiB for every entry in the central directory.
        let mut at = 0;
        while let Some(offset) = sb3[at..].windows(4).position(|w| w == b"PK\x01\x02") {
            let header = at + offset;
            sb3[header + 24..header + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
            at = header + 4;
        }

        match ProjectBundle::from_sb3(&sb3) {
            Ok(bundle) => assert_eq!(bundle.stage().name, "Stage"),
            Err(err) => assert!(matches!(
                err,
                TranscodeError::Archive(_) | TranscodeError::ProjectFormat(_)
            )),
        }
    }

    #[test]
    fn mutation_lists_decode_json_strings() {
        let block: Block = serde_json::from_value(serde_json::json!({
            "opcode": "procedures_prototype",
            "mutation": { "proccode": "go %s %b", "argumentnames": "[\"a\",\"b\"]" }
        }))
        .unwrap();
        assert_eq!(block.mutation_str("proccode"), Some("go %s %b"));
        assert_eq!(block.mutation_list("argumentnames"), vec!["a", "b"]);
        assert!(block.mutation_list("argumentids").is_empty());
    }

    #[test]
    fn sprites_sorted_by_layer() {
        let json = serde_json::json!({
            "targets": [
                { "isStage": true, "name": "Stage" },
                { "isStage": false, "name": "Top", "layerOrder": 2 },
                { "isStage": false, "name": "Bottom", "layerOrder": 1 }
            ]
        });
        let bundle =
            ProjectBundle::from_parts(serde_json::to_vec(&json).unwrap(), BTreeMap::new()).unwrap();
        let names: Vec<&str> = bundle.sprites().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Bottom", "Top"]);
    }
}
