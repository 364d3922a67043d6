//! Flattening generated modules into one inline script.
//!
//! Relative imports are replaced by the imported module's text, each module
//! at most once. Imports of the runtime library are collected and hoisted
//! into a single import at the top so its classes are bound exactly once.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::error::{Result, TranscodeError};

lazy_static! {
    static ref IMPORT: Regex =
        Regex::new(r#"^\s*import\s+(.+?)\s+from\s+"([^"]+)"\s*;?\s*$"#).unwrap();
    static ref EXPORT_DEFAULT_DECL: Regex =
        Regex::new(r"^(\s*)export\s+default\s+((?:async\s+)?(?:class|function)\b.*)$").unwrap();
    static ref EXPORT_DEFAULT_NAME: Regex =
        Regex::new(r"^\s*export\s+default\s+[\w$]+\s*;?\s*$").unwrap();
    static ref EXPORT_DECL: Regex =
        Regex::new(r"^(\s*)export\s+((?:const|let|var|class|function|async)\b.*)$").unwrap();
    static ref EXPORT_LIST: Regex =
        Regex::new(r#"^\s*export\s*\{[^}]*\}\s*(?:from\s+"[^"]*")?\s*;?\s*$"#).unwrap();
    static ref DEFAULT_EXPORT_IDENT: Regex = Regex::new(
        r"(?m)^\s*export\s+default\s+(?:(?:async\s+)?(?:class|function\*?)\s+)?([\w$]+)"
    )
    .unwrap();
}

/// One name bound by an import clause.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Binding {
    imported: String,
    local: String,
}

impl Binding {
    fn render(&self) -> String {
        if self.imported == self.local {
            self.local.clone()
        } else {
            format!("{} as {}", self.imported, self.local)
        }
    }
}

/// Parse `Default`, `{ a, b as c }` or `Default, { a }`.
fn parse_clause(clause: &str) -> Option<Vec<Binding>> {
    let clause = clause.trim();
    if clause.starts_with('*') {
        return None;
    }
    let (default, named) = match clause.find('{') {
        Some(open) => {
            let close = clause.rfind('}')?;
            (
                clause[..open].trim().trim_end_matches(',').trim(),
                &clause[open + 1..close],
            )
        }
        None => (clause, ""),
    };

    let mut bindings = Vec::new();
    if !default.is_empty() {
        bindings.push(Binding {
            imported: "default".to_string(),
            local: default.to_string(),
        });
    }
    for spec in named.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mut parts = spec.split_whitespace();
        let imported = parts.next()?.to_string();
        let local = match (parts.next(), parts.next()) {
            (Some("as"), Some(local)) => local.to_string(),
            (None, _) => imported.clone(),
            _ => return None,
        };
        bindings.push(Binding { imported, local });
    }
    Some(bindings)
}

/// Resolve a relative specifier against the directory of `importer`.
pub(crate) fn resolve(importer: &str, specifier: &str) -> String {
    let mut parts: Vec<&str> = importer
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    parts.pop();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("./{}", parts.join("/"))
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

struct Merger<'m> {
    modules: &'m BTreeMap<String, String>,
    library_url: &'m str,
    library: BTreeSet<Binding>,
    inlined: HashSet<String>,
    out: Vec<String>,
}

impl<'m> Merger<'m> {
    fn merge_module(&mut self, path: &str, source: &str) -> Result<()> {
        let modules = self.modules;
        for line in source.lines() {
            let Some(caps) = IMPORT.captures(line) else {
                if let Some(line) = strip_export(line) {
                    self.out.push(line);
                }
                continue;
            };
            let clause = &caps[1];
            let specifier = &caps[2];

            if specifier == self.library_url {
                let bindings = parse_clause(clause).ok_or_else(|| TranscodeError::Merge {
                    module: path.to_string(),
                    message: format!("unsupported import clause `{}`", clause),
                })?;
                self.library.extend(bindings);
                continue;
            }
            if !is_relative(specifier) {
                self.out.push(line.to_string());
                continue;
            }

            let target = resolve(path, specifier);
            let Some(module) = modules.get(&target) else {
                return Err(TranscodeError::Merge {
                    module: path.to_string(),
                    message: format!("unresolved import {}", specifier),
                });
            };
            let bindings = parse_clause(clause).ok_or_else(|| TranscodeError::Merge {
                module: path.to_string(),
                message: format!("unsupported import clause `{}`", clause),
            })?;

            if self.inlined.insert(target.clone()) {
                trace!(module = %target, importer = path, "inlining");
                self.merge_module(&target, module)?;
            }

            for binding in bindings {
                let exported = if binding.imported == "default" {
                    default_export(module).ok_or_else(|| TranscodeError::Merge {
                        module: target.clone(),
                        message: "no default export".to_string(),
                    })?
                } else {
                    binding.imported.clone()
                };
                if exported != binding.local {
                    self.out
                        .push(format!("const {} = {};", binding.local, exported));
                }
            }
        }
        Ok(())
    }
}

/// Name bound by a module's default export.
fn default_export(source: &str) -> Option<String> {
    DEFAULT_EXPORT_IDENT
        .captures(source)
        .map(|caps| caps[1].to_string())
}

/// Drop or rewrite export syntax. `None` means the line disappears.
fn strip_export(line: &str) -> Option<String> {
    if let Some(caps) = EXPORT_DEFAULT_DECL.captures(line) {
        return Some(format!("{}{}", &caps[1], &caps[2]));
    }
    if EXPORT_DEFAULT_NAME.is_match(line) || EXPORT_LIST.is_match(line) {
        return None;
    }
    if let Some(caps) = EXPORT_DECL.captures(line) {
        return Some(format!("{}{}", &caps[1], &caps[2]));
    }
    Some(line.to_string())
}

/// Merge `entry` (located at `entry_path`) with every module it reaches.
pub(crate) fn merge(
    entry_path: &str,
    entry: &str,
    modules: &BTreeMap<String, String>,
    library_url: &str,
) -> Result<String> {
    let mut merger = Merger {
        modules,
        library_url,
        library: BTreeSet::new(),
        inlined: HashSet::new(),
        out: Vec::new(),
    };
    merger.merge_module(entry_path, entry)?;

    let mut script = String::new();
    if !merger.library.is_empty() {
        let bindings: Vec<String> = merger.library.iter().map(Binding::render).collect();
        script.push_str(&format!(
            "import {{ {} }} from {};\n\n",
            bindings.join(", "),
            crate::emit::js_string(library_url)
        ));
    }
    for line in merger.out {
        script.push_str(&line);
        script.push('\n');
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIB: &str = "https://example.test/lib.js";

    fn modules(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn clauses() {
        let b = parse_clause("{ Stage as StageBase, Trigger }").unwrap();
        assert_eq!(b[0].render(), "Stage as StageBase");
        assert_eq!(b[1].render(), "Trigger");

        let b = parse_clause("Cat").unwrap();
        assert_eq!(b[0].imported, "default");
        assert_eq!(b[0].local, "Cat");

        let b = parse_clause("Def, { a }").unwrap();
        assert_eq!(b.len(), 2);

        assert!(parse_clause("* as ns").is_none());
    }

    #[test]
    fn resolves_relative_specifiers() {
        assert_eq!(resolve("./index.html", "./index.js"), "./index.js");
        assert_eq!(resolve("./index.js", "./Cat/Cat.js"), "./Cat/Cat.js");
        assert_eq!(resolve("./Cat/Cat.js", "../Stage/Stage.js"), "./Stage/Stage.js");
    }

    #[test]
    fn hoists_library_and_inlines_once() {
        let lib_a = format!("import {{ Sprite, Costume }} from \"{}\";", LIB);
        let lib_b = format!("import {{ Project, Sprite }} from \"{}\";", LIB);
        let cat = format!("{}\nexport default class Cat extends Sprite {{}}", lib_a);
        let index = format!(
            "{}\nimport Cat from \"./Cat/Cat.js\";\nimport Cat2 from \"./Cat/Cat.js\";\nconst project = new Project(Cat);\nexport default project;",
            lib_b
        );
        let mods = modules(&[("./Cat/Cat.js", &cat), ("./index.js", &index)]);

        let script = merge(
            "./index.html",
            "import project from \"./index.js\";\nproject.run();",
            &mods,
            LIB,
        )
        .unwrap();

        assert_eq!(script.matches("import ").count(), 1);
        assert!(script.starts_with(&format!(
            "import {{ Costume, Project, Sprite }} from \"{}\";",
            LIB
        )));
        assert_eq!(script.matches("class Cat extends Sprite").count(), 1);
        assert!(script.contains("const Cat2 = Cat;"));
        assert!(!script.contains("export"));
        assert!(script.ends_with("project.run();\n"));
    }

    #[test]
    fn unresolved_import_fails() {
        let err = merge("./index.html", "import x from \"./missing.js\";", &BTreeMap::new(), LIB)
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Merge { .. }));
    }

    #[test]
    fn export_stripping() {
        assert_eq!(
            strip_export("export default class A extends B {").as_deref(),
            Some("class A extends B {")
        );
        assert_eq!(strip_export("export default project;"), None);
        assert_eq!(strip_export("export { a, b };"), None);
        assert_eq!(strip_export("  export const x = 1;").as_deref(), Some("  const x = 1;"));
        assert_eq!(strip_export("const y = 2;").as_deref(), Some("const y = 2;"));
    }
}
