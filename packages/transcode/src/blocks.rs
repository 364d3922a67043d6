//! Compiling block scripts into generator methods.
//!
//! Statements are written straight into the module's [`CodeWriter`];
//! reporters come back as [`Expr`] values that remember whether they are
//! already a number, string or boolean so conversions are only emitted when
//! needed.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::emit::{js_number, js_string, CodeWriter};
use crate::names::{identifier, Case, NameSet};
use crate::project::Block;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Number,
    String,
    Boolean,
    Any,
}

#[derive(Debug, Clone)]
struct Expr {
    code: String,
    kind: Kind,
}

impl Expr {
    fn new(code: impl Into<String>, kind: Kind) -> Self {
        Self {
            code: code.into(),
            kind,
        }
    }

    fn number(n: f64) -> Self {
        Self::new(js_number(n), Kind::Number)
    }

    fn string(s: &str) -> Self {
        Self::new(js_string(s), Kind::String)
    }

    fn boolean(code: impl Into<String>) -> Self {
        Self::new(code, Kind::Boolean)
    }

    fn any(code: impl Into<String>) -> Self {
        Self::new(code, Kind::Any)
    }

    fn unsupported(opcode: &str) -> Self {
        Self::any(format!("/* unsupported: {} */ null", opcode))
    }

    fn num(self) -> String {
        match self.kind {
            Kind::Number => self.code,
            _ => format!("this.toNumber({})", self.code),
        }
    }

    fn text(self) -> String {
        match self.kind {
            Kind::String => self.code,
            _ => format!("this.toString({})", self.code),
        }
    }

    fn bool(self) -> String {
        match self.kind {
            Kind::Boolean => self.code,
            _ => format!("this.toBoolean({})", self.code),
        }
    }
}

/// How variables and lists of the current actor are addressed.
#[derive(Debug, Default, Clone)]
pub(crate) struct VarTable {
    by_id: HashMap<String, String>,
    by_name: HashMap<(String, bool), String>,
}

impl VarTable {
    /// Register a variable (or list) under `access`, e.g. `this.vars.score`.
    pub fn insert(&mut self, id: &str, name: &str, is_list: bool, access: String) {
        self.by_id.insert(id.to_string(), access.clone());
        self.by_name
            .entry((name.to_string(), is_list))
            .or_insert(access);
    }

    fn lookup(&self, id: Option<&str>, name: &str, is_list: bool) -> Option<&String> {
        id.and_then(|id| self.by_id.get(id))
            .or_else(|| self.by_name.get(&(name.to_string(), is_list)))
    }
}

/// A custom block definition, callable as a generator method.
#[derive(Debug, Clone)]
pub(crate) struct Procedure {
    pub method: String,
    pub arg_ids: Vec<String>,
    pub arg_names: Vec<String>,
    pub params: Vec<String>,
    pub warp: bool,
}

/// Everything the compiler needs to know about one actor.
pub(crate) struct ActorScope<'a> {
    pub is_stage: bool,
    pub blocks: BTreeMap<&'a str, &'a Block>,
    pub vars: VarTable,
    /// Raw sprite name -> generated class name, for every sprite.
    pub sprite_classes: &'a BTreeMap<String, String>,
    /// proccode -> procedure.
    pub procedures: BTreeMap<String, Procedure>,
}

/// A hat script or procedure definition that becomes one method.
pub(crate) struct Script<'a> {
    pub method: String,
    pub params: Vec<String>,
    pub trigger: Option<String>,
    pub first: Option<&'a str>,
    pub procedure: Option<String>,
}

impl<'a> ActorScope<'a> {
    /// Collect procedure definitions, claiming method names for them.
    pub fn collect_procedures(&mut self, methods: &mut NameSet) {
        for block in self.blocks.values() {
            if block.opcode != "procedures_definition" {
                continue;
            }
            let Some(prototype) = input_block_id(block, "custom_block")
                .and_then(|id| self.blocks.get(id))
            else {
                continue;
            };
            let Some(proccode) = prototype.mutation_str("proccode") else {
                continue;
            };
            if self.procedures.contains_key(proccode) {
                continue;
            }

            let label: String = proccode
                .split_whitespace()
                .filter(|w| !w.starts_with('%'))
                .collect::<Vec<_>>()
                .join(" ");
            let method = methods.claim(&identifier(&label, Case::Camel));

            let arg_names = prototype.mutation_list("argumentnames");
            let mut params_set = NameSet::new();
            let params = arg_names
                .iter()
                .map(|n| params_set.claim(&identifier(n, Case::Camel)))
                .collect();
            let warp = match prototype.mutation.as_ref().and_then(|m| m.get("warp")) {
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => s == "true",
                _ => false,
            };

            self.procedures.insert(
                proccode.to_string(),
                Procedure {
                    method,
                    arg_ids: prototype.mutation_list("argumentids"),
                    arg_names,
                    params,
                    warp,
                },
            );
        }
    }

    /// Hat scripts and procedure definitions, in block id order.
    pub fn scripts(&self, methods: &mut NameSet) -> Vec<Script<'a>> {
        let mut scripts = Vec::new();
        for (&id, &block) in &self.blocks {
            if !block.top_level {
                continue;
            }
            let first = block.next.as_deref();
            let hat = match block.opcode.as_str() {
                "event_whenflagclicked" => Some((
                    "whenGreenFlagClicked".to_string(),
                    "Trigger.GREEN_FLAG".to_string(),
                )),
                "event_whenkeypressed" => {
                    let key = block.field("KEY_OPTION").unwrap_or("space");
                    Some((
                        format!("whenKey{}Pressed", identifier(key, Case::Pascal)),
                        format!("Trigger.KEY_PRESSED, {{ key: {} }}", js_string(key)),
                    ))
                }
                "event_whenthisspriteclicked" => Some((
                    "whenThisSpriteClicked".to_string(),
                    "Trigger.CLICKED".to_string(),
                )),
                "event_whenstageclicked" => Some((
                    "whenStageClicked".to_string(),
                    "Trigger.CLICKED".to_string(),
                )),
                "event_whenbroadcastreceived" => {
                    let name = block.field("BROADCAST_OPTION").unwrap_or("message1");
                    Some((
                        format!("whenIReceive{}", identifier(name, Case::Pascal)),
                        format!("Trigger.BROADCAST, {{ name: {} }}", js_string(name)),
                    ))
                }
                "control_start_as_clone" => Some((
                    "startAsClone".to_string(),
                    "Trigger.CLONE_START".to_string(),
                )),
                _ => None,
            };

            if let Some((base, trigger)) = hat {
                let method = methods.claim(&base);
                scripts.push(Script {
                    trigger: Some(format!("new Trigger({}, this.{})", trigger, method)),
                    method,
                    params: Vec::new(),
                    first,
                    procedure: None,
                });
                continue;
            }

            if block.opcode == "procedures_definition" {
                let proccode = input_block_id(block, "custom_block")
                    .and_then(|pid| self.blocks.get(pid))
                    .and_then(|p| p.mutation_str("proccode"));
                if let Some(procedure) = proccode.and_then(|p| self.procedures.get(p)) {
                    scripts.push(Script {
                        method: procedure.method.clone(),
                        params: procedure.params.clone(),
                        trigger: None,
                        first,
                        procedure: proccode.map(str::to_string),
                    });
                }
            } else {
                tracing::trace!(block = id, opcode = %block.opcode, "skipping loose script");
            }
        }
        scripts
    }
}

/// Compiles the body of one script.
pub(crate) struct ScriptCompiler<'s, 'a> {
    scope: &'s ActorScope<'a>,
    params: HashMap<String, String>,
    warp: bool,
    loop_depth: usize,
    /// Blocks currently being compiled, so a looping graph ends instead of
    /// recursing forever.
    active: HashSet<String>,
}

impl<'s, 'a> ScriptCompiler<'s, 'a> {
    pub fn new(scope: &'s ActorScope<'a>, script: &Script<'a>) -> Self {
        let (params, warp) = match script
            .procedure
            .as_ref()
            .and_then(|p| scope.procedures.get(p))
        {
            Some(procedure) => (
                procedure
                    .arg_names
                    .iter()
                    .cloned()
                    .zip(procedure.params.iter().cloned())
                    .collect(),
                procedure.warp,
            ),
            None => (HashMap::new(), false),
        };
        Self {
            scope,
            params,
            warp,
            loop_depth: 0,
            active: HashSet::new(),
        }
    }

    /// Emit a chain of statements starting at `first`.
    pub fn stack(&mut self, w: &mut CodeWriter, first: Option<&str>) {
        let mut chain = Vec::new();
        let mut next = first;
        while let Some(id) = next {
            let Some(block) = self.block(id) else {
                break;
            };
            if !self.active.insert(id.to_string()) {
                w.line(format!("/* cycle at block {} */", id));
                break;
            }
            chain.push(id.to_string());
            self.statement(w, block);
            next = block.next.as_deref();
        }
        for id in chain {
            self.active.remove(&id);
        }
    }

    fn block(&self, id: &str) -> Option<&'a Block> {
        self.scope.blocks.get(id).copied()
    }

    fn target_prefix(&self) -> &'static str {
        if self.scope.is_stage {
            "this"
        } else {
            "this.stage"
        }
    }

    fn sprite_ref(&self, raw: &str) -> String {
        let class = self
            .scope
            .sprite_classes
            .get(raw)
            .map(String::as_str)
            .unwrap_or(raw);
        format!("this.sprites[{}]", js_string(class))
    }

    fn loop_var(&self) -> String {
        match self.loop_depth {
            0 => "i".to_string(),
            n => format!("i{}", n + 1),
        }
    }

    fn substack(&mut self, w: &mut CodeWriter, block: &Block, name: &str, yields: bool) {
        self.loop_depth += usize::from(yields);
        self.stack(w, input_block_id(block, name));
        self.loop_depth -= usize::from(yields);
        if yields && !self.warp {
            w.line("yield;");
        }
    }

    fn statement(&mut self, w: &mut CodeWriter, block: &Block) {
        let op = block.opcode.as_str();
        match op {
            // Motion
            "motion_movesteps" => {
                let steps = self.num(block, "STEPS");
                w.line(format!("this.move({});", steps));
            }
            "motion_turnright" => {
                let deg = self.num(block, "DEGREES");
                w.line(format!("this.direction += {};", deg));
            }
            "motion_turnleft" => {
                let deg = self.num(block, "DEGREES");
                w.line(format!("this.direction -= {};", deg));
            }
            "motion_goto" => {
                let (x, y) = self.position_of(block, "TO");
                w.line(format!("this.goto({}, {});", x, y));
            }
            "motion_gotoxy" => {
                let x = self.num(block, "X");
                let y = self.num(block, "Y");
                w.line(format!("this.goto({}, {});", x, y));
            }
            "motion_glideto" => {
                let secs = self.num(block, "SECS");
                let (x, y) = self.position_of(block, "TO");
                w.line(format!("yield* this.glide({}, {}, {});", secs, x, y));
            }
            "motion_glidesecstoxy" => {
                let secs = self.num(block, "SECS");
                let x = self.num(block, "X");
                let y = self.num(block, "Y");
                w.line(format!("yield* this.glide({}, {}, {});", secs, x, y));
            }
            "motion_pointindirection" => {
                let dir = self.num(block, "DIRECTION");
                w.line(format!("this.direction = {};", dir));
            }
            "motion_pointtowards" => match self.menu(block, "TOWARDS").as_deref() {
                Some("_random_") => w.line("this.direction = this.random(-180, 180);"),
                Some("_mouse_") => w.line(
                    "this.direction = this.radToScratch(Math.atan2(this.mouse.y - this.y, this.mouse.x - this.x));",
                ),
                Some(sprite) => {
                    let s = self.sprite_ref(sprite);
                    w.line(format!(
                        "this.direction = this.radToScratch(Math.atan2({s}.y - this.y, {s}.x - this.x));"
                    ));
                }
                None => w.line(format!("/* unsupported: {} */", op)),
            },
            "motion_changexby" => {
                let dx = self.num(block, "DX");
                w.line(format!("this.x += {};", dx));
            }
            "motion_setx" => {
                let x = self.num(block, "X");
                w.line(format!("this.x = {};", x));
            }
            "motion_changeyby" => {
                let dy = self.num(block, "DY");
                w.line(format!("this.y += {};", dy));
            }
            "motion_sety" => {
                let y = self.num(block, "Y");
                w.line(format!("this.y = {};", y));
            }
            "motion_ifonedgebounce" => w.line("this.ifOnEdgeBounce();"),
            "motion_setrotationstyle" => {
                let style = rotation_style(block.field("STYLE").unwrap_or("all around"));
                w.line(format!("this.rotationStyle = {};", style));
            }

            // Looks
            "looks_sayforsecs" | "looks_thinkforsecs" => {
                let msg = self.any(block, "MESSAGE");
                let secs = self.num(block, "SECS");
                let method = if op == "looks_sayforsecs" {
                    "sayAndWait"
                } else {
                    "thinkAndWait"
                };
                w.line(format!("yield* this.{}({}, {});", method, msg, secs));
            }
            "looks_say" | "looks_think" => {
                let msg = self.any(block, "MESSAGE");
                let method = if op == "looks_say" { "say" } else { "think" };
                w.line(format!("this.{}({});", method, msg));
            }
            "looks_switchcostumeto" => {
                let costume = self.menu_or_any(block, "COSTUME");
                w.line(format!("this.costume = {};", costume));
            }
            "looks_nextcostume" => w.line("this.costumeNumber++;"),
            "looks_switchbackdropto" => {
                let backdrop = self.menu_or_any(block, "BACKDROP");
                w.line(format!("{}.costume = {};", self.target_prefix(), backdrop));
            }
            "looks_nextbackdrop" => {
                w.line(format!("{}.costumeNumber++;", self.target_prefix()));
            }
            "looks_changesizeby" => {
                let change = self.num(block, "CHANGE");
                w.line(format!("this.size += {};", change));
            }
            "looks_setsizeto" => {
                let size = self.num(block, "SIZE");
                w.line(format!("this.size = {};", size));
            }
            "looks_changeeffectby" => {
                let effect = block.field("EFFECT").unwrap_or("color").to_lowercase();
                let change = self.num(block, "CHANGE");
                w.line(format!("this.effects.{} += {};", effect, change));
            }
            "looks_seteffectto" => {
                let effect = block.field("EFFECT").unwrap_or("color").to_lowercase();
                let value = self.num(block, "VALUE");
                w.line(format!("this.effects.{} = {};", effect, value));
            }
            "looks_cleargraphiceffects" => w.line("this.effects.clear();"),
            "looks_show" => w.line("this.visible = true;"),
            "looks_hide" => w.line("this.visible = false;"),
            "looks_gotofrontback" => match block.field("FRONT_BACK") {
                Some("back") => w.line("this.moveBehind();"),
                _ => w.line("this.moveAhead();"),
            },
            "looks_goforwardbackwardlayers" => {
                let num = self.num(block, "NUM");
                match block.field("FORWARD_BACKWARD") {
                    Some("backward") => w.line(format!("this.moveBehind({});", num)),
                    _ => w.line(format!("this.moveAhead({});", num)),
                }
            }

            // Sound
            "sound_playuntildone" => {
                let sound = self.menu_or_any(block, "SOUND_MENU");
                w.line(format!("yield* this.playSoundUntilDone({});", sound));
            }
            "sound_play" => {
                let sound = self.menu_or_any(block, "SOUND_MENU");
                w.line(format!("yield* this.startSound({});", sound));
            }
            "sound_stopallsounds" => w.line("this.stopAllSounds();"),
            "sound_changevolumeby" => {
                let v = self.num(block, "VOLUME");
                w.line(format!("this.audioEffects.volume += {};", v));
            }
            "sound_setvolumeto" => {
                let v = self.num(block, "VOLUME");
                w.line(format!("this.audioEffects.volume = {};", v));
            }
            "sound_changeeffectby" => {
                let effect = block.field("EFFECT").unwrap_or("pitch").to_lowercase();
                let v = self.num(block, "VALUE");
                w.line(format!("this.audioEffects.{} += {};", effect, v));
            }
            "sound_seteffectto" => {
                let effect = block.field("EFFECT").unwrap_or("pitch").to_lowercase();
                let v = self.num(block, "VALUE");
                w.line(format!("this.audioEffects.{} = {};", effect, v));
            }
            "sound_cleareffects" => w.line("this.audioEffects.clear();"),

            // Events
            "event_broadcast" => {
                let name = self.broadcast(block);
                w.line(format!("this.broadcast({});", name));
            }
            "event_broadcastandwait" => {
                let name = self.broadcast(block);
                w.line(format!("yield* this.broadcastAndWait({});", name));
            }

            // Control
            "control_wait" => {
                let secs = self.num(block, "DURATION");
                w.line(format!("yield* this.wait({});", secs));
            }
            "control_repeat" => {
                let times = self.num(block, "TIMES");
                let i = self.loop_var();
                w.open(format!("for (let {i} = 0; {i} < {times}; {i}++) {{"));
                self.substack(w, block, "SUBSTACK", true);
                w.close("}");
            }
            "control_forever" => {
                w.open("while (true) {");
                self.substack(w, block, "SUBSTACK", true);
                w.close("}");
            }
            "control_if" => {
                let cond = self.condition(block);
                w.open(format!("if ({}) {{", cond));
                self.substack(w, block, "SUBSTACK", false);
                w.close("}");
            }
            "control_if_else" => {
                let cond = self.condition(block);
                w.open(format!("if ({}) {{", cond));
                self.substack(w, block, "SUBSTACK", false);
                w.branch("} else {");
                self.substack(w, block, "SUBSTACK2", false);
                w.close("}");
            }
            "control_wait_until" => {
                let cond = self.condition(block);
                w.open(format!("while (!{}) {{", paren(&cond)));
                w.line("yield;");
                w.close("}");
            }
            "control_repeat_until" => {
                let cond = self.condition(block);
                w.open(format!("while (!{}) {{", paren(&cond)));
                self.substack(w, block, "SUBSTACK", true);
                w.close("}");
            }
            "control_stop" => match block.field("STOP_OPTION") {
                Some("this script") => w.line("return;"),
                other => w.line(format!(
                    "/* unsupported: control_stop {} */",
                    other.unwrap_or("")
                )),
            },
            "control_create_clone_of" => match self.menu(block, "CLONE_OPTION").as_deref() {
                Some("_myself_") | None => w.line("this.createClone();"),
                Some(sprite) => w.line(format!("{}.createClone();", self.sprite_ref(sprite))),
            },
            "control_delete_this_clone" => w.line("this.deleteThisClone();"),

            // Sensing
            "sensing_askandwait" => {
                let question = self.any(block, "QUESTION");
                w.line(format!("yield* this.askAndWait({});", question));
            }
            "sensing_resettimer" => w.line("this.restartTimer();"),

            // Data
            "data_setvariableto" => {
                let value = self.any(block, "VALUE");
                match self.variable(block, "VARIABLE", false) {
                    Some(var) => w.line(format!("{} = {};", var, value)),
                    None => w.line(format!("/* unsupported: {} */", op)),
                }
            }
            "data_changevariableby" => {
                let value = self.num(block, "VALUE");
                match self.variable(block, "VARIABLE", false) {
                    Some(var) => w.line(format!("{var} = this.toNumber({var}) + {value};")),
                    None => w.line(format!("/* unsupported: {} */", op)),
                }
            }
            "data_addtolist" => {
                let item = self.any(block, "ITEM");
                self.list_statement(w, block, op, |list| format!("{}.push({});", list, item));
            }
            "data_deleteoflist" => {
                let index = self.num(block, "INDEX");
                self.list_statement(w, block, op, |list| {
                    format!("{}.splice({} - 1, 1);", list, index)
                });
            }
            "data_deletealloflist" => {
                self.list_statement(w, block, op, |list| format!("{} = [];", list));
            }
            "data_insertatlist" => {
                let index = self.num(block, "INDEX");
                let item = self.any(block, "ITEM");
                self.list_statement(w, block, op, |list| {
                    format!("{}.splice({} - 1, 0, {});", list, index, item)
                });
            }
            "data_replaceitemoflist" => {
                let index = self.num(block, "INDEX");
                let item = self.any(block, "ITEM");
                self.list_statement(w, block, op, |list| {
                    format!("{}.splice({} - 1, 1, {});", list, index, item)
                });
            }

            // Custom blocks
            "procedures_call" => {
                let proccode = block.mutation_str("proccode").unwrap_or_default();
                match self.scope.procedures.get(proccode) {
                    Some(procedure) => {
                        let procedure = procedure.clone();
                        let args: Vec<String> = procedure
                            .arg_ids
                            .iter()
                            .map(|id| {
                                self.input(block, id)
                                    .map(|e| e.code)
                                    .unwrap_or_else(|| "\"\"".to_string())
                            })
                            .collect();
                        w.line(format!(
                            "yield* this.{}({});",
                            procedure.method,
                            args.join(", ")
                        ));
                    }
                    None => w.line(format!("/* unsupported: {} {} */", op, proccode)),
                }
            }

            _ => w.line(format!("/* unsupported: {} */", op)),
        }
    }

    fn list_statement(
        &mut self,
        w: &mut CodeWriter,
        block: &Block,
        op: &str,
        render: impl FnOnce(&str) -> String,
    ) {
        match self.variable(block, "LIST", true) {
            Some(list) => w.line(render(&list)),
            None => w.line(format!("/* unsupported: {} */", op)),
        }
    }

    fn variable(&self, block: &Block, field: &str, is_list: bool) -> Option<String> {
        let name = block.field(field)?;
        self.scope
            .vars
            .lookup(block.field_id(field), name, is_list)
            .cloned()
    }

    fn condition(&mut self, block: &Block) -> String {
        self.input(block, "CONDITION")
            .map(Expr::bool)
            .unwrap_or_else(|| "false".to_string())
    }

    fn num(&mut self, block: &Block, name: &str) -> String {
        self.input(block, name)
            .unwrap_or_else(|| Expr::number(0.0))
            .num()
    }

    fn any(&mut self, block: &Block, name: &str) -> String {
        self.input(block, name)
            .map(|e| e.code)
            .unwrap_or_else(|| "\"\"".to_string())
    }

    fn text(&mut self, block: &Block, name: &str) -> String {
        self.input(block, name)
            .unwrap_or_else(|| Expr::string(""))
            .text()
    }

    /// The raw value of a menu shadow plugged into `input`.
    fn menu(&self, block: &Block, input: &str) -> Option<String> {
        let menu = self.block(input_block_id(block, input)?)?;
        if !menu.shadow {
            return None;
        }
        menu.fields
            .keys()
            .next()
            .and_then(|f| menu.field(f))
            .map(str::to_string)
    }

    /// A menu value as a string literal, or whatever reporter was dropped
    /// over the menu.
    fn menu_or_any(&mut self, block: &Block, input: &str) -> String {
        match self.menu(block, input) {
            Some(value) => js_string(&value),
            None => self.any(block, input),
        }
    }

    fn broadcast(&mut self, block: &Block) -> String {
        self.menu_or_any(block, "BROADCAST_INPUT")
    }

    fn position_of(&mut self, block: &Block, input: &str) -> (String, String) {
        match self.menu(block, input).as_deref() {
            Some("_random_") => (
                "this.random(-240, 240)".to_string(),
                "this.random(-180, 180)".to_string(),
            ),
            Some("_mouse_") | None => ("this.mouse.x".to_string(), "this.mouse.y".to_string()),
            Some(sprite) => {
                let s = self.sprite_ref(sprite);
                (format!("{}.x", s), format!("{}.y", s))
            }
        }
    }

    fn input(&mut self, block: &Block, name: &str) -> Option<Expr> {
        let Value::Array(parts) = block.inputs.get(name)? else {
            return None;
        };
        let value = match parts.get(1) {
            Some(Value::Null) | None => parts.get(2)?,
            Some(v) => v,
        };
        match value {
            Value::String(id) => self.reporter(id),
            Value::Array(primitive) => self.primitive(primitive),
            _ => None,
        }
    }

    fn primitive(&self, parts: &[Value]) -> Option<Expr> {
        let code = parts.first()?.as_u64()?;
        let raw = match parts.get(1)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        let expr = match code {
            4..=8 => match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Expr::number(n),
                _ if raw.trim().is_empty() => Expr::number(0.0),
                _ => Expr::string(&raw),
            },
            10 => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() && js_number(n) == raw => Expr::number(n),
                _ => Expr::string(&raw),
            },
            9 | 11 => Expr::string(&raw),
            12 | 13 => {
                let id = parts.get(2).and_then(Value::as_str);
                let is_list = code == 13;
                let access = self.scope.vars.lookup(id, &raw, is_list)?;
                if is_list {
                    Expr::string_code(format!("{}.join(\" \")", access))
                } else {
                    Expr::any(access.clone())
                }
            }
            _ => return None,
        };
        Some(expr)
    }

    fn reporter(&mut self, id: &str) -> Option<Expr> {
        let block = self.block(id)?;
        if !self.active.insert(id.to_string()) {
            return Some(Expr::unsupported(&block.opcode));
        }
        let expr = self.reporter_expr(block);
        self.active.remove(id);
        expr
    }

    fn reporter_expr(&mut self, block: &Block) -> Option<Expr> {
        let op = block.opcode.as_str();

        // Menu shadows report their field.
        if block.shadow && block.inputs.is_empty() {
            if let Some(value) = block.fields.keys().next().and_then(|f| block.field(f)) {
                return Some(Expr::string(value));
            }
        }

        let expr = match op {
            "motion_xposition" => Expr::new("this.x", Kind::Number),
            "motion_yposition" => Expr::new("this.y", Kind::Number),
            "motion_direction" => Expr::new("this.direction", Kind::Number),

            "looks_size" => Expr::new("this.size", Kind::Number),
            "looks_costumenumbername" => match block.field("NUMBER_NAME") {
                Some("name") => Expr::new("this.costume.name", Kind::String),
                _ => Expr::new("this.costumeNumber", Kind::Number),
            },
            "looks_backdropnumbername" => match block.field("NUMBER_NAME") {
                Some("name") => Expr::new(
                    format!("{}.costume.name", self.target_prefix()),
                    Kind::String,
                ),
                _ => Expr::new(
                    format!("{}.costumeNumber", self.target_prefix()),
                    Kind::Number,
                ),
            },

            "sound_volume" => Expr::new("this.audioEffects.volume", Kind::Number),

            "sensing_touchingobject" => {
                let target = match self.menu(block, "TOUCHINGOBJECTMENU").as_deref() {
                    Some("_mouse_") => "\"mouse\"".to_string(),
                    Some("_edge_") => "\"edge\"".to_string(),
                    Some(sprite) => format!("{}.andClones()", self.sprite_ref(sprite)),
                    None => return Some(Expr::unsupported(op)),
                };
                Expr::boolean(format!("this.touching({})", target))
            }
            "sensing_keypressed" => {
                let key = self.menu_or_any(block, "KEY_OPTION");
                Expr::boolean(format!("this.keyPressed({})", key))
            }
            "sensing_mousedown" => Expr::boolean("this.mouse.down"),
            "sensing_mousex" => Expr::new("this.mouse.x", Kind::Number),
            "sensing_mousey" => Expr::new("this.mouse.y", Kind::Number),
            "sensing_timer" => Expr::new("this.timer", Kind::Number),
            "sensing_answer" => Expr::new("this.answer", Kind::String),

            "operator_add" | "operator_subtract" | "operator_multiply" | "operator_divide" => {
                let symbol = match op {
                    "operator_add" => "+",
                    "operator_subtract" => "-",
                    "operator_multiply" => "*",
                    _ => "/",
                };
                let a = self.num(block, "NUM1");
                let b = self.num(block, "NUM2");
                Expr::new(format!("({} {} {})", a, symbol, b), Kind::Number)
            }
            "operator_mod" => {
                let a = self.num(block, "NUM1");
                let b = self.num(block, "NUM2");
                Expr::new(
                    format!("((({a} % {b}) + {b}) % {b})", a = a, b = b),
                    Kind::Number,
                )
            }
            "operator_random" => {
                let from = self.num(block, "FROM");
                let to = self.num(block, "TO");
                Expr::new(format!("this.random({}, {})", from, to), Kind::Number)
            }
            "operator_lt" | "operator_gt" | "operator_equals" => {
                let a = self.any(block, "OPERAND1");
                let b = self.any(block, "OPERAND2");
                let cmp = match op {
                    "operator_lt" => "< 0",
                    "operator_gt" => "> 0",
                    _ => "=== 0",
                };
                Expr::boolean(format!("this.compare({}, {}) {}", a, b, cmp))
            }
            "operator_and" | "operator_or" => {
                let a = self.input(block, "OPERAND1").map(Expr::bool);
                let b = self.input(block, "OPERAND2").map(Expr::bool);
                let symbol = if op == "operator_and" { "&&" } else { "||" };
                Expr::boolean(format!(
                    "({} {} {})",
                    a.unwrap_or_else(|| "false".into()),
                    symbol,
                    b.unwrap_or_else(|| "false".into())
                ))
            }
            "operator_not" => {
                let a = self
                    .input(block, "OPERAND")
                    .map(Expr::bool)
                    .unwrap_or_else(|| "false".into());
                Expr::boolean(format!("!{}", paren(&a)))
            }
            "operator_join" => {
                let a = self.text(block, "STRING1");
                let b = self.text(block, "STRING2");
                Expr::new(format!("({} + {})", a, b), Kind::String)
            }
            "operator_letter_of" => {
                let s = self.any(block, "STRING");
                let i = self.num(block, "LETTER");
                Expr::new(format!("this.letterOf({}, {} - 1)", s, i), Kind::String)
            }
            "operator_length" => {
                let s = self.text(block, "STRING");
                Expr::new(format!("{}.length", s), Kind::Number)
            }
            "operator_contains" => {
                let a = self.any(block, "STRING1");
                let b = self.any(block, "STRING2");
                Expr::boolean(format!("this.stringIncludes({}, {})", a, b))
            }
            "operator_round" => {
                let n = self.num(block, "NUM");
                Expr::new(format!("Math.round({})", n), Kind::Number)
            }
            "operator_mathop" => {
                let n = self.num(block, "NUM");
                let code = match block.field("OPERATOR").unwrap_or("abs") {
                    "abs" => format!("Math.abs({})", n),
                    "floor" => format!("Math.floor({})", n),
                    "ceiling" => format!("Math.ceil({})", n),
                    "sqrt" => format!("Math.sqrt({})", n),
                    "sin" => format!("Math.sin(this.degToRad({}))", n),
                    "cos" => format!("Math.cos(this.degToRad({}))", n),
                    "tan" => format!("Math.tan(this.degToRad({}))", n),
                    "asin" => format!("this.radToDeg(Math.asin({}))", n),
                    "acos" => format!("this.radToDeg(Math.acos({}))", n),
                    "atan" => format!("this.radToDeg(Math.atan({}))", n),
                    "ln" => format!("Math.log({})", n),
                    "log" => format!("Math.log10({})", n),
                    "e ^" => format!("Math.E ** {}", n),
                    "10 ^" => format!("10 ** {}", n),
                    _ => return Some(Expr::unsupported(op)),
                };
                Expr::new(code, Kind::Number)
            }

            "data_variable" => match self.variable(block, "VARIABLE", false) {
                Some(var) => Expr::any(var),
                None => Expr::unsupported(op),
            },
            "data_listcontents" => match self.variable(block, "LIST", true) {
                Some(list) => Expr::string_code(format!("{}.join(\" \")", list)),
                None => Expr::unsupported(op),
            },
            "data_itemoflist" => {
                let index = self.num(block, "INDEX");
                match self.variable(block, "LIST", true) {
                    Some(list) => Expr::any(format!("this.itemOf({}, {} - 1)", list, index)),
                    None => Expr::unsupported(op),
                }
            }
            "data_lengthoflist" => match self.variable(block, "LIST", true) {
                Some(list) => Expr::new(format!("{}.length", list), Kind::Number),
                None => Expr::unsupported(op),
            },
            "data_listcontainsitem" => {
                let item = self.any(block, "ITEM");
                match self.variable(block, "LIST", true) {
                    Some(list) => Expr::boolean(format!("this.arrayIncludes({}, {})", list, item)),
                    None => Expr::unsupported(op),
                }
            }

            "argument_reporter_string_number" | "argument_reporter_boolean" => {
                let name = block.field("VALUE").unwrap_or_default();
                match self.params.get(name) {
                    Some(param) => Expr::any(param.clone()),
                    None if op == "argument_reporter_boolean" => Expr::boolean("false"),
                    None => Expr::string(""),
                }
            }

            _ => Expr::unsupported(op),
        };
        Some(expr)
    }
}

impl Expr {
    fn string_code(code: String) -> Self {
        Self::new(code, Kind::String)
    }
}

/// The block id plugged into `input`, skipping primitives.
pub(crate) fn input_block_id<'b>(block: &'b Block, input: &str) -> Option<&'b str> {
    match block.inputs.get(input)? {
        Value::Array(parts) => parts.get(1).and_then(Value::as_str),
        _ => None,
    }
}

pub(crate) fn rotation_style(style: &str) -> &'static str {
    match style {
        "left-right" => "Sprite.RotationStyle.LEFT_RIGHT",
        "don't rotate" => "Sprite.RotationStyle.DONT_ROTATE",
        _ => "Sprite.RotationStyle.ALL_AROUND",
    }
}

/// Wrap in parentheses unless already a single parenthesized group or a
/// plain call.
fn paren(code: &str) -> String {
    if code.starts_with('(') && code.ends_with(')') {
        code.to_string()
    } else {
        format!("({})", code)
    }
}
