//! Replacing asset URLs with `data:` URIs.

use std::collections::BTreeMap;

use base64::Engine as _;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use stagefs_core::ContentType;

lazy_static! {
    static ref RELATIVE_LITERAL: Regex = Regex::new(r#""(\.{1,2}/[^"\\]*)""#).unwrap();
    static ref COSTUMES_OPEN: Regex = Regex::new(r"^(\s*)this\.costumes = \[\s*$").unwrap();
}

/// Asset bytes keyed by the relative URL used in generated code.
pub(crate) type AssetMap = BTreeMap<String, (ContentType, Bytes)>;

pub(crate) fn data_uri(content_type: &ContentType, body: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(body)
    )
}

fn is_vector(line: &str, assets: &AssetMap) -> bool {
    RELATIVE_LITERAL.captures_iter(line).any(|caps| {
        assets
            .get(&caps[1])
            .is_some_and(|(content_type, _)| content_type.is_svg())
    })
}

fn replace_literals(line: &str, assets: &AssetMap) -> String {
    RELATIVE_LITERAL
        .replace_all(line, |caps: &Captures<'_>| match assets.get(&caps[1]) {
            Some((content_type, body)) => format!("\"{}\"", data_uri(content_type, body)),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Inline every known asset URL in `script`.
///
/// The runtime decides whether a costume is a bitmap by looking for `.svg`
/// in its URL, which a data URI no longer has. Each multi-line
/// `this.costumes = [` block is therefore followed by an
/// `isBitmap = false` override for every vector costume in it.
pub(crate) fn inline_assets(script: &str, assets: &AssetMap) -> String {
    let mut out = String::with_capacity(script.len());
    // (indentation, costumes seen, vector indices)
    let mut costumes: Option<(String, usize, Vec<usize>)> = None;

    for line in script.lines() {
        out.push_str(&replace_literals(line, assets));
        out.push('\n');

        if let Some((indent, count, vectors)) = costumes.as_mut() {
            let trimmed = line.trim();
            if trimmed.starts_with("new Costume(") {
                if is_vector(line, assets) {
                    vectors.push(*count);
                }
                *count += 1;
            } else if trimmed == "];" {
                for index in vectors.iter() {
                    out.push_str(&format!(
                        "{}this.costumes[{}].isBitmap = false;\n",
                        indent, index
                    ));
                }
                costumes = None;
            }
            continue;
        }

        if let Some(caps) = COSTUMES_OPEN.captures(line) {
            costumes = Some((caps[1].to_string(), 0, Vec::new()));
        }
    }

    if !script.ends_with('\n') {
        out.pop();
    }
    out
}
