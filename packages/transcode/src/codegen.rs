//! Generating actor modules, the entry module and the document.

use std::collections::BTreeMap;

use serde_json::Value;
use stagefs_core::ContentType;

use crate::blocks::{rotation_style, ActorScope, ScriptCompiler, VarTable};
use crate::emit::{js_number, js_string, CodeWriter};
use crate::names::{file_stem, identifier, Case, NameSet, ACTOR_RESERVED, MEMBER_RESERVED};
use crate::options::TranscodeOptions;
use crate::project::{ProjectBundle, Target};

pub(crate) const ENTRY_MODULE: &str = "./index.js";
pub(crate) const DOCUMENT: &str = "./index.html";

/// An asset referenced from generated code.
#[derive(Debug, Clone)]
pub(crate) struct AssetRef {
    /// Relative URL used in the module, e.g. `./Cat/costumes/costume1.svg`.
    pub url: String,
    /// Archive file name in the project bundle.
    pub file: String,
    pub content_type: ContentType,
}

/// Everything generated from one project, before merging.
#[derive(Debug, Default)]
pub(crate) struct Generated {
    /// Module URL -> source. Includes [`ENTRY_MODULE`].
    pub modules: BTreeMap<String, String>,
    pub assets: Vec<AssetRef>,
}

struct Actor<'a> {
    target: &'a Target,
    class: String,
}

impl Actor<'_> {
    fn module_url(&self) -> String {
        format!("./{0}/{0}.js", self.class)
    }
}

pub(crate) fn generate(project: &ProjectBundle, options: &TranscodeOptions) -> Generated {
    let stage = Actor {
        target: project.stage(),
        class: "Stage".to_string(),
    };

    let mut classes = NameSet::with_reserved(ACTOR_RESERVED);
    let sprites: Vec<Actor<'_>> = project
        .sprites()
        .into_iter()
        .map(|target| Actor {
            class: classes.claim(&identifier(&target.name, Case::Pascal)),
            target,
        })
        .collect();
    let sprite_classes: BTreeMap<String, String> = sprites
        .iter()
        .map(|a| (a.target.name.clone(), a.class.clone()))
        .collect();

    let stage_vars = variable_names(stage.target);

    let mut generated = Generated::default();
    for actor in std::iter::once(&stage).chain(sprites.iter()) {
        let (source, assets) = actor_module(actor, &stage_vars, &sprite_classes, options);
        generated.modules.insert(actor.module_url(), source);
        generated.assets.extend(assets);
    }
    generated
        .modules
        .insert(ENTRY_MODULE.to_string(), entry_module(&stage, &sprites, options));
    generated
}

#[derive(Debug, Clone)]
struct VarDecl {
    id: String,
    name: String,
    ident: String,
    is_list: bool,
}

/// Variables then lists of a target, each with a unique identifier.
fn variable_names(target: &Target) -> Vec<VarDecl> {
    let mut names = NameSet::new();
    let mut out = Vec::new();
    for (map, is_list) in [(&target.variables, false), (&target.lists, true)] {
        for (id, entry) in map {
            let name = entry
                .get(0)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            out.push(VarDecl {
                id: id.clone(),
                ident: names.claim(&identifier(&name, Case::Camel)),
                name,
                is_list,
            });
        }
    }
    out
}

fn actor_module(
    actor: &Actor<'_>,
    stage_vars: &[VarDecl],
    sprite_classes: &BTreeMap<String, String>,
    options: &TranscodeOptions,
) -> (String, Vec<AssetRef>) {
    let target = actor.target;
    let own_vars = if target.is_stage {
        stage_vars.to_vec()
    } else {
        variable_names(target)
    };

    let mut vars = VarTable::default();
    for v in &own_vars {
        vars.insert(&v.id, &v.name, v.is_list, format!("this.vars.{}", v.ident));
    }
    if !target.is_stage {
        for v in stage_vars {
            vars.insert(&v.id, &v.name, v.is_list, format!("this.stage.vars.{}", v.ident));
        }
    }

    let mut scope = ActorScope {
        is_stage: target.is_stage,
        blocks: target.scripts(),
        vars,
        sprite_classes,
        procedures: BTreeMap::new(),
    };
    let mut methods = NameSet::with_reserved(MEMBER_RESERVED);
    scope.collect_procedures(&mut methods);
    let scripts = scope.scripts(&mut methods);

    let mut w = CodeWriter::new(options.indent_width);
    w.line("/* eslint-disable require-yield, eqeqeq */");
    w.blank();
    if target.is_stage {
        w.line(format!(
            "import {{ Stage as StageBase, Trigger, Watcher, Costume, Color, Sound }} from {};",
            js_string(&options.library_url)
        ));
    } else {
        w.line(format!(
            "import {{ Sprite, Trigger, Watcher, Costume, Color, Sound }} from {};",
            js_string(&options.library_url)
        ));
    }
    w.blank();
    w.open(format!(
        "export default class {} extends {} {{",
        actor.class,
        if target.is_stage { "StageBase" } else { "Sprite" }
    ));
    w.open("constructor(...args) {");
    w.line("super(...args);");
    w.blank();

    let mut assets = Vec::new();
    let mut stems = NameSet::new();
    let costumes: Vec<String> = target
        .costumes
        .iter()
        .map(|costume| {
            let ext = costume.data_format.to_ascii_lowercase();
            let url = format!(
                "./{}/costumes/{}.{}",
                actor.class,
                stems.claim(&file_stem(&costume.name)),
                ext
            );
            let resolution = match costume.bitmap_resolution {
                Some(r) if r > 0.0 && ext != "svg" => r,
                _ => 1.0,
            };
            let line = format!(
                "new Costume({}, {}, {{ x: {}, y: {} }}),",
                js_string(&costume.name),
                js_string(&url),
                js_number(costume.rotation_center_x / resolution),
                js_number(costume.rotation_center_y / resolution)
            );
            assets.push(AssetRef {
                content_type: ContentType::for_extension(&ext),
                file: costume.asset_file(),
                url,
            });
            line
        })
        .collect();
    array_property(&mut w, "this.costumes", &costumes);
    w.blank();

    let mut stems = NameSet::new();
    let sounds: Vec<String> = target
        .sounds
        .iter()
        .map(|sound| {
            let ext = sound.data_format.to_ascii_lowercase();
            let url = format!(
                "./{}/sounds/{}.{}",
                actor.class,
                stems.claim(&file_stem(&sound.name)),
                ext
            );
            let line = format!("new Sound({}, {}),", js_string(&sound.name), js_string(&url));
            assets.push(AssetRef {
                content_type: ContentType::for_extension(&ext),
                file: sound.asset_file(),
                url,
            });
            line
        })
        .collect();
    array_property(&mut w, "this.sounds", &sounds);
    w.blank();

    let triggers: Vec<String> = scripts
        .iter()
        .filter_map(|s| s.trigger.as_ref().map(|t| format!("{},", t)))
        .collect();
    array_property(&mut w, "this.triggers", &triggers);

    if !own_vars.is_empty() {
        w.blank();
    }
    for v in &own_vars {
        let entry = if v.is_list {
            target.lists.get(&v.id)
        } else {
            target.variables.get(&v.id)
        };
        let value = entry.and_then(|e| e.get(1)).unwrap_or(&Value::Null);
        w.line(format!("this.vars.{} = {};", v.ident, js_value(value)));
    }
    w.close("}");

    for script in &scripts {
        w.blank();
        w.open(format!("*{}({}) {{", script.method, script.params.join(", ")));
        ScriptCompiler::new(&scope, script).stack(&mut w, script.first);
        w.close("}");
    }
    w.close("}");

    (w.finish(), assets)
}

fn array_property(w: &mut CodeWriter, property: &str, items: &[String]) {
    if items.is_empty() {
        w.line(format!("{} = [];", property));
        return;
    }
    w.open(format!("{} = [", property));
    for item in items {
        w.line(item);
    }
    w.close("];");
}

fn js_value(value: &Value) -> String {
    match value {
        Value::Number(n) => js_number(n.as_f64().unwrap_or_default()),
        Value::String(s) => js_string(s),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(js_value).collect();
            format!("[{}]", items.join(", "))
        }
        _ => "0".to_string(),
    }
}

fn entry_module(stage: &Actor<'_>, sprites: &[Actor<'_>], options: &TranscodeOptions) -> String {
    let mut w = CodeWriter::new(options.indent_width);
    w.line(format!(
        "import {{ Project, Sprite }} from {};",
        js_string(&options.library_url)
    ));
    w.blank();
    for actor in std::iter::once(stage).chain(sprites.iter()) {
        w.line(format!(
            "import {} from {};",
            actor.class,
            js_string(&actor.module_url())
        ));
    }
    w.blank();
    w.line(format!(
        "const stage = new Stage({{ costumeNumber: {} }});",
        stage.target.current_costume + 1
    ));
    w.blank();

    if sprites.is_empty() {
        w.line("const sprites = {};");
    } else {
        w.open("const sprites = {");
        for actor in sprites {
            let t = actor.target;
            w.open(format!("{}: new {}({{", actor.class, actor.class));
            w.line(format!("x: {},", js_number(t.x)));
            w.line(format!("y: {},", js_number(t.y)));
            w.line(format!("direction: {},", js_number(t.direction)));
            w.line(format!("rotationStyle: {},", rotation_style(&t.rotation_style)));
            w.line(format!("costumeNumber: {},", t.current_costume + 1));
            w.line(format!("size: {},", js_number(t.size)));
            w.line(format!("visible: {},", t.visible));
            w.line(format!("layerOrder: {},", t.layer_order));
            w.close("}),");
        }
        w.close("};");
    }
    w.blank();
    w.open("const project = new Project(stage, sprites, {");
    w.line(format!("frameRate: {},", options.frame_rate));
    w.close("});");
    w.line("export default project;");
    w.finish()
}

/// The inline script of the document, before merging.
pub(crate) fn document_script(options: &TranscodeOptions) -> String {
    let mut w = CodeWriter::new(options.indent_width);
    w.line(format!("import project from {};", js_string(ENTRY_MODULE)));
    w.blank();
    w.line("project.attach(\"#project\");");
    if options.include_green_flag {
        w.blank();
        w.open("document.querySelector(\"#greenFlag\").addEventListener(\"click\", () => {");
        w.line("project.greenFlag();");
        w.close("});");
    }
    if options.autoplay {
        w.blank();
        w.line("project.greenFlag();");
    }
    w.finish()
}

/// Wrap a merged script into the top-level document.
pub(crate) fn document(script: &str, options: &TranscodeOptions) -> String {
    let mut w = CodeWriter::new(options.indent_width);
    w.line("<!DOCTYPE html>");
    w.open("<html>");
    w.open("<head>");
    w.line("<meta charset=\"utf-8\" />");
    w.line(format!(
        "<link rel=\"stylesheet\" href=\"{}\" />",
        html_attr(&options.stylesheet_url)
    ));
    w.close("</head>");
    w.open("<body>");
    if options.include_green_flag {
        w.line("<button id=\"greenFlag\">Green Flag</button>");
    }
    w.line("<div id=\"project\"></div>");
    w.open("<script type=\"module\">");
    w.block(&script.replace("</script", "<\\/script"));
    w.close("</script>");
    w.close("</body>");
    w.close("</html>");
    w.finish()
}

fn html_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}
