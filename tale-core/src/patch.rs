//! The narrator's intent patch.
//!
//! The narrator returns a sparse JSON object describing what happened. It is
//! untrusted: any field may be missing, mistyped or nonsensical. Parsing
//! never fails; each field is read on its own and anything that cannot be
//! understood becomes `None` plus a [`PatchDiagnostic`].
//!
//! Keys are matched without regard to case or underscores, so
//! `playerAttackHitsEnemy` and `player_attack_hits_enemy` are the same
//! field. Numbers may arrive as JSON numbers or numeric strings, booleans
//! as JSON booleans or `"true"`/`"false"`.

use crate::character::{Ability, Companion};
use crate::content::normalize_id;
use crate::dice::DiceExpression;
use crate::encounter::EnemyTemplate;
use crate::items::DamageType;
use crate::status::{ActionKind, EffectDuration, EffectPayload};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The field was present but could not be read.
    Malformed,
    /// The key is not part of the patch contract.
    UnknownField,
    /// The field named content that does not exist.
    UnknownReference,
    /// The field was understood but not allowed in this context.
    Rejected,
}

/// A note about a patch field that was dropped or adjusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDiagnostic {
    pub field: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl PatchDiagnostic {
    pub fn new(field: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    fn malformed(field: &str, expected: &str, value: &Value) -> Self {
        Self::new(
            field,
            DiagnosticKind::Malformed,
            format!("expected {expected}, got {value}"),
        )
    }
}

impl fmt::Display for PatchDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::Malformed => "malformed",
            DiagnosticKind::UnknownField => "unknown field",
            DiagnosticKind::UnknownReference => "unknown reference",
            DiagnosticKind::Rejected => "rejected",
        };
        write!(f, "{} ({kind}): {}", self.field, self.message)
    }
}

// ============================================================================
// Patch types
// ============================================================================

/// An enemy named by id or described inline.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateRef {
    Id(String),
    Inline(EnemyTemplate),
}

/// A status effect named by id or described inline.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEffectRef {
    Id(String),
    Inline(InlineStatusEffect),
}

/// A narrator-authored status effect. `duration` is `None` when it was
/// missing or unreadable.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineStatusEffect {
    pub id: String,
    pub name: String,
    pub duration: Option<EffectDuration>,
    pub payload: EffectPayload,
}

/// A companion named by id or described inline.
#[derive(Debug, Clone, PartialEq)]
pub enum CompanionRef {
    Id(String),
    Inline(Companion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestPatch {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestUpdate {
    pub id: String,
    pub note: String,
}

/// Everything the narrator may ask for in one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrativeIntentPatch {
    pub player_attack_hits_enemy: Option<bool>,
    pub enemy_attack_hits_player: Option<bool>,
    pub end_combat: Option<bool>,
    pub hp_delta: Option<i64>,
    pub xp_delta: Option<i64>,
    pub currency_delta: Option<i64>,
    pub currency_context: Option<String>,
    pub time_delta: Option<i64>,
    pub start_combat: Option<TemplateRef>,
    pub start_encounter: Option<String>,
    pub add_status_effect: Option<StatusEffectRef>,
    pub remove_status_effect: Option<String>,
    pub achievement: Option<String>,
    pub add_quest: Option<QuestPatch>,
    pub complete_quest: Option<String>,
    pub update_quest: Option<QuestUpdate>,
    pub recruit_companion: Option<CompanionRef>,
    pub add_fact: Option<String>,
}

impl NarrativeIntentPatch {
    /// Parse raw narrator output. Invalid JSON yields an empty patch.
    pub fn from_json(json: &str) -> (Self, Vec<PatchDiagnostic>) {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::from_value(&value),
            Err(e) => (
                Self::default(),
                vec![PatchDiagnostic::new(
                    "patch",
                    DiagnosticKind::Malformed,
                    format!("invalid JSON: {e}"),
                )],
            ),
        }
    }

    /// Read every recognised field from a JSON value.
    pub fn from_value(value: &Value) -> (Self, Vec<PatchDiagnostic>) {
        let mut patch = Self::default();
        let mut diagnostics = Vec::new();

        let object = match value {
            Value::Object(object) => object,
            Value::Null => return (patch, diagnostics),
            other => {
                diagnostics.push(PatchDiagnostic::malformed("patch", "an object", other));
                return (patch, diagnostics);
            }
        };

        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            let mut reader = FieldReader {
                field: key,
                diagnostics: &mut diagnostics,
            };
            match normalize_key(key).as_str() {
                "playerattackhitsenemy" => patch.player_attack_hits_enemy = reader.bool(value),
                "enemyattackhitsplayer" => patch.enemy_attack_hits_player = reader.bool(value),
                "endcombat" => patch.end_combat = reader.bool(value),
                "hpdelta" => patch.hp_delta = reader.int(value),
                "xpdelta" => patch.xp_delta = reader.int(value),
                "currencydelta" => patch.currency_delta = reader.int(value),
                "currencycontext" => patch.currency_context = reader.text(value),
                "timedelta" => patch.time_delta = reader.int(value),
                "startcombat" => patch.start_combat = reader.start_combat(value),
                "startencounter" => patch.start_encounter = reader.reference(value),
                "addstatuseffect" => patch.add_status_effect = reader.status_effect(value),
                "removestatuseffect" => patch.remove_status_effect = reader.reference(value),
                "achievement" => patch.achievement = reader.text(value),
                "addquest" => patch.add_quest = reader.quest(value),
                "completequest" => patch.complete_quest = reader.reference(value),
                "updatequest" => patch.update_quest = reader.quest_update(value),
                "recruitcompanion" => patch.recruit_companion = reader.companion(value),
                "addfact" => patch.add_fact = reader.text(value),
                _ => reader.diagnostics.push(PatchDiagnostic::new(
                    key.as_str(),
                    DiagnosticKind::UnknownField,
                    "ignored",
                )),
            }
        }

        (patch, diagnostics)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ============================================================================
// Lenient readers
// ============================================================================

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    let float = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            n.as_f64()?
        }
        Value::String(s) => {
            let s = s.trim().replace(',', "");
            if let Ok(i) = s.parse::<i64>() {
                return Some(i);
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if float.is_finite() {
        Some(float.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    } else {
        None
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Case- and underscore-insensitive access to an inline object.
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn get(&self, names: &[&str]) -> Option<&'a Value> {
        self.0
            .iter()
            .find(|(key, value)| {
                !value.is_null() && names.iter().any(|n| normalize_key(key) == *n)
            })
            .map(|(_, value)| value)
    }

    fn text(&self, names: &[&str]) -> Option<String> {
        self.get(names).and_then(as_text)
    }

    fn int(&self, names: &[&str]) -> Option<i64> {
        self.get(names).and_then(as_int)
    }

    fn float(&self, names: &[&str]) -> Option<f64> {
        let value = match self.get(names)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        value.filter(|f| f.is_finite())
    }

    fn dice(&self, names: &[&str]) -> Option<DiceExpression> {
        match self.get(names)? {
            Value::String(s) => DiceExpression::parse(s).ok(),
            Value::Number(n) => n.as_i64().map(|v| DiceExpression::flat(clamp_i32(v))),
            _ => None,
        }
    }

    fn strings(&self, names: &[&str]) -> Vec<String> {
        match self.get(names) {
            Some(Value::Array(items)) => items.iter().filter_map(as_text).collect(),
            Some(other) => as_text(other).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

struct FieldReader<'a> {
    field: &'a str,
    diagnostics: &'a mut Vec<PatchDiagnostic>,
}

impl FieldReader<'_> {
    fn reject<T>(&mut self, expected: &str, value: &Value) -> Option<T> {
        self.diagnostics
            .push(PatchDiagnostic::malformed(self.field, expected, value));
        None
    }

    fn bool(&mut self, value: &Value) -> Option<bool> {
        as_bool(value).or_else(|| self.reject("a boolean", value))
    }

    fn int(&mut self, value: &Value) -> Option<i64> {
        as_int(value).or_else(|| self.reject("a number", value))
    }

    fn text(&mut self, value: &Value) -> Option<String> {
        as_text(value).or_else(|| self.reject("a string", value))
    }

    /// An id given bare or as `{ "id": ... }`.
    fn reference(&mut self, value: &Value) -> Option<String> {
        let id = match value {
            Value::Object(object) => Fields(object).text(&["id", "name", "title"]),
            other => as_text(other),
        };
        id.or_else(|| self.reject("an id", value))
    }

    fn start_combat(&mut self, value: &Value) -> Option<TemplateRef> {
        let template = match value {
            Value::Object(object) => {
                let fields = Fields(object);
                match fields.get(&["enemytemplate", "enemy", "template"]) {
                    Some(Value::Object(inline)) => inline_enemy(&Fields(inline)).map(TemplateRef::Inline),
                    Some(other) => as_text(other).map(TemplateRef::Id),
                    // The template fields may sit directly on `startCombat`.
                    None => inline_enemy(&fields).map(TemplateRef::Inline),
                }
            }
            other => as_text(other).map(TemplateRef::Id),
        };
        template.or_else(|| self.reject("an enemy template id or object", value))
    }

    fn status_effect(&mut self, value: &Value) -> Option<StatusEffectRef> {
        let effect = match value {
            Value::Object(object) => {
                let fields = Fields(object);
                let inline_keys = [
                    "duration",
                    "healthperturn",
                    "hpperturn",
                    "manaperturn",
                    "staminaperturn",
                    "abilitymodifiers",
                    "armorclass",
                    "acmodifier",
                    "speed",
                    "damage",
                    "disables",
                    "disableaction",
                    "resistances",
                    "vulnerabilities",
                ];
                if fields.get(&inline_keys).is_some() {
                    inline_status(&fields).map(StatusEffectRef::Inline)
                } else {
                    fields.text(&["id", "name"]).map(StatusEffectRef::Id)
                }
            }
            other => as_text(other).map(StatusEffectRef::Id),
        };
        effect.or_else(|| self.reject("a status effect id or object", value))
    }

    fn quest(&mut self, value: &Value) -> Option<QuestPatch> {
        let quest = match value {
            Value::Object(object) => {
                let fields = Fields(object);
                fields.text(&["title", "name", "id"]).map(|title| QuestPatch {
                    id: fields
                        .text(&["id"])
                        .map(|id| normalize_id(&id))
                        .unwrap_or_else(|| normalize_id(&title)),
                    description: fields
                        .text(&["description", "details", "objective"])
                        .unwrap_or_default(),
                    title,
                })
            }
            other => as_text(other).map(|title| QuestPatch {
                id: normalize_id(&title),
                title,
                description: String::new(),
            }),
        };
        quest.or_else(|| self.reject("a quest title or object", value))
    }

    fn quest_update(&mut self, value: &Value) -> Option<QuestUpdate> {
        let update = match value {
            Value::Object(object) => {
                let fields = Fields(object);
                fields.text(&["id", "title", "name"]).map(|id| QuestUpdate {
                    id,
                    note: fields
                        .text(&["note", "progress", "description", "update"])
                        .unwrap_or_default(),
                })
            }
            _ => None,
        };
        update.or_else(|| self.reject("a quest update object", value))
    }

    fn companion(&mut self, value: &Value) -> Option<CompanionRef> {
        let companion = match value {
            Value::Object(object) => {
                let fields = Fields(object);
                if fields.get(&["hp", "maxhp", "health"]).is_some() {
                    inline_companion(&fields).map(CompanionRef::Inline)
                } else {
                    fields.text(&["id", "name"]).map(CompanionRef::Id)
                }
            }
            other => as_text(other).map(CompanionRef::Id),
        };
        companion.or_else(|| self.reject("a companion id or object", value))
    }
}

fn inline_enemy(fields: &Fields<'_>) -> Option<EnemyTemplate> {
    let name = fields.text(&["name"])?;
    let hp = fields.int(&["hp", "maxhp", "health"])?;
    let id = fields.text(&["id"]).unwrap_or_else(|| name.clone());
    let mut template = EnemyTemplate::new(
        normalize_id(&id),
        name,
        clamp_i32(hp).max(1),
        fields
            .int(&["armorclass", "ac"])
            .map(clamp_i32)
            .unwrap_or(12),
        fields
            .dice(&["damage", "damageroll", "attack"])
            .unwrap_or_else(|| DiceExpression::flat(3)),
    )
    .with_challenge_rating(
        fields
            .float(&["challengerating", "cr"])
            .unwrap_or(0.5)
            .max(0.0),
    )
    .with_speed(fields.int(&["speed"]).map(clamp_i32).unwrap_or(30))
    .with_xp(
        fields
            .int(&["xpvalue", "xp"])
            .map(|xp| xp.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(50),
    );
    template.damage_type = fields
        .text(&["damagetype"])
        .and_then(|t| DamageType::from_name(&t));
    template.loot = fields.strings(&["loot", "loottable"]);
    Some(template)
}

fn parse_duration(value: &Value) -> Option<EffectDuration> {
    if let Value::String(s) = value {
        let s = s.trim().to_lowercase();
        if s == "permanent" || s == "forever" {
            return Some(EffectDuration::Permanent);
        }
    }
    match as_int(value)? {
        -1 => Some(EffectDuration::Permanent),
        n if n > 0 => Some(EffectDuration::Turns(n.min(u32::MAX as i64) as u32)),
        _ => None,
    }
}

fn inline_status(fields: &Fields<'_>) -> Option<InlineStatusEffect> {
    let name = fields.text(&["name", "id"])?;
    let id = fields
        .text(&["id"])
        .map(|id| normalize_id(&id))
        .unwrap_or_else(|| normalize_id(&name));

    let mut payload = EffectPayload::default();
    payload.per_turn.health = fields
        .int(&["healthperturn", "hpperturn"])
        .map(clamp_i32);
    payload.per_turn.mana = fields.int(&["manaperturn"]).map(clamp_i32);
    payload.per_turn.stamina = fields.int(&["staminaperturn"]).map(clamp_i32);
    payload.armor_class = fields.int(&["armorclass", "acmodifier"]).map(clamp_i32);
    payload.speed = fields.int(&["speed"]).map(clamp_i32);
    payload.damage = fields.int(&["damage"]).map(clamp_i32);
    payload.disables = fields
        .text(&["disables", "disableaction"])
        .and_then(|kind| ActionKind::from_name(&kind));
    if let Some(Value::Object(mods)) = fields.get(&["abilitymodifiers"]) {
        for (ability, modifier) in mods {
            if let (Some(ability), Some(modifier)) = (Ability::from_name(ability), as_int(modifier))
            {
                payload.ability_modifiers.insert(ability, clamp_i32(modifier));
            }
        }
    }
    payload.resistances = fields
        .strings(&["resistances"])
        .iter()
        .filter_map(|t| DamageType::from_name(t))
        .collect();
    payload.vulnerabilities = fields
        .strings(&["vulnerabilities"])
        .iter()
        .filter_map(|t| DamageType::from_name(t))
        .collect();

    Some(InlineStatusEffect {
        id,
        name,
        duration: fields.get(&["duration"]).and_then(parse_duration),
        payload,
    })
}

fn inline_companion(fields: &Fields<'_>) -> Option<Companion> {
    let name = fields.text(&["name"])?;
    let hp = fields.int(&["hp", "maxhp", "health"])?;
    let id = fields
        .text(&["id"])
        .map(|id| normalize_id(&id))
        .unwrap_or_else(|| normalize_id(&name));
    let mut companion = Companion::new(id, name, clamp_i32(hp).max(1));
    if let Some(ac) = fields.int(&["armorclass", "ac"]) {
        companion = companion.with_armor_class(clamp_i32(ac));
    }
    let attack_bonus = fields
        .int(&["attackbonus"])
        .map(clamp_i32)
        .unwrap_or(companion.attack_bonus);
    let damage = fields
        .dice(&["damage", "damageroll"])
        .unwrap_or_else(|| companion.damage.clone());
    companion = companion.with_attack(attack_bonus, damage);
    if let Some(loyalty) = fields.int(&["loyalty"]) {
        companion = companion.with_loyalty(clamp_i32(loyalty));
    }
    Some(companion)
}
