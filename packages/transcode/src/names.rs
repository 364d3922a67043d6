//! Turning arbitrary Scratch names into JavaScript identifiers and file names.

use std::collections::HashSet;

const JS_RESERVED: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while", "with", "yield",
];

/// Names a generated actor class must never take.
pub(crate) const ACTOR_RESERVED: &[&str] = &[
    "Color", "Costume", "Project", "Sound", "Sprite", "Stage", "StageBase", "Trigger", "Watcher",
];

/// Members of the runtime's sprite and stage classes. Generated methods must
/// not shadow them.
pub(crate) const MEMBER_RESERVED: &[&str] = &[
    "andClones", "answer", "arrayIncludes", "askAndWait", "audioEffects", "broadcast",
    "broadcastAndWait", "clearPen", "clones", "colorTouching", "compare", "constructor",
    "costume", "costumeNumber", "costumes", "createClone", "degToRad", "deleteThisClone",
    "direction", "effects", "glide", "goto", "ifOnEdgeBounce", "indexInArray", "itemOf",
    "keyPressed", "letterOf", "mouse", "move", "moveAhead", "moveBehind", "parent",
    "penDown", "playSoundUntilDone", "radToDeg", "radToScratch", "random", "restartTimer",
    "say", "sayAndWait", "scratchToDeg", "scratchToRad", "size", "sounds", "sprites", "stage",
    "stamp", "startSound", "stopAllSounds", "stringIncludes", "think", "thinkAndWait", "timer",
    "toBoolean", "toNumber", "toString", "touching", "triggers", "vars", "visible", "wait",
    "warp", "watchers", "x", "y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    /// `myVariable`
    Camel,
    /// `MySprite`
    Pascal,
}

/// Convert `raw` into a valid identifier in the given case.
///
/// Words are split on anything that is not alphanumeric. A leading digit
/// gets a `_` prefix and reserved words get a `_` suffix.
pub fn identifier(raw: &str, case: Case) -> String {
    let mut out = String::new();
    for (i, word) in raw
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        let Some(first) = chars.next() else { continue };
        let capitalize = case == Case::Pascal || i > 0;
        if capitalize {
            out.extend(first.to_uppercase());
        } else {
            out.extend(first.to_lowercase());
        }
        out.push_str(chars.as_str());
    }

    if out.is_empty() {
        out.push_str(match case {
            Case::Camel => "unnamed",
            Case::Pascal => "Unnamed",
        });
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if JS_RESERVED.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// Convert `raw` into a path-safe file stem: ASCII alphanumerics, `-` and
/// `_` are kept, everything else becomes `_`.
pub fn file_stem(raw: &str) -> String {
    let stem: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

/// Hands out names that are unique within one scope.
#[derive(Debug, Default, Clone)]
pub struct NameSet {
    used: HashSet<String>,
}

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reserved(reserved: &[&str]) -> Self {
        Self {
            used: reserved.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Claim `base`, or `base2`, `base3`, ... if taken.
    pub fn claim(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
