//! Turning a parsed patch into commands the kernel can trust.
//!
//! [`sanitize`] resolves every reference against the content tables, clamps
//! every number, and drops anything the current action does not allow. The
//! output, [`TurnCommands`], is the only form of narrator input the rest of
//! the turn sees.

use crate::character::Companion;
use crate::config::KernelConfig;
use crate::content::{normalize_id, ContentTables};
use crate::encounter::{EncounterDefinition, EnemyTemplate};
use crate::patch::{
    CompanionRef, DiagnosticKind, NarrativeIntentPatch, PatchDiagnostic, QuestPatch, QuestUpdate,
    StatusEffectRef, TemplateRef,
};
use crate::status::{ActionKind, EffectDuration, StatusEffect};
use regex::Regex;
use tracing::warn;

lazy_static::lazy_static! {
    static ref AMOUNT_WITH_UNIT: Option<Regex> =
        Regex::new(r"(?i)(\d[\d,]*)\s*(gold|gp|silver|sp|copper|cp)\b").ok();
    static ref UNIT_WORD: Option<Regex> =
        Regex::new(r"(?i)\b(gold|gp|silver|sp|copper|cp)\b").ok();
    static ref ARRIVED_AT: Option<Regex> =
        Regex::new(r"(?i)^\s*arrived\s+at\s+(.+?)[.!]?\s*$").ok();
}

/// Coin denomination named in currency context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyUnit {
    Gold,
    Silver,
    Copper,
}

impl CurrencyUnit {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "gold" | "gp" => Some(CurrencyUnit::Gold),
            "silver" | "sp" => Some(CurrencyUnit::Silver),
            "copper" | "cp" => Some(CurrencyUnit::Copper),
            _ => None,
        }
    }

    /// Value of one coin in the smallest denomination.
    pub fn scale(&self) -> i64 {
        match self {
            CurrencyUnit::Gold => 10_000,
            CurrencyUnit::Silver => 100,
            CurrencyUnit::Copper => 1,
        }
    }
}

/// The unit a currency delta was meant in.
///
/// A `<number> <unit>` pair whose number matches the delta wins; otherwise
/// the first unit word in the text.
pub fn detect_unit(delta: i64, context: &str) -> Option<CurrencyUnit> {
    let magnitude = delta.unsigned_abs();
    if let Some(pattern) = AMOUNT_WITH_UNIT.as_ref() {
        for caps in pattern.captures_iter(context) {
            let amount = caps[1].replace(',', "").parse::<u64>().ok();
            if amount == Some(magnitude) {
                return CurrencyUnit::from_word(&caps[2]);
            }
        }
    }
    UNIT_WORD
        .as_ref()?
        .captures(context)
        .and_then(|caps| CurrencyUnit::from_word(&caps[1]))
}

/// Convert a narrator currency delta to the smallest denomination.
///
/// Small magnitudes are assumed to be counted in the unit the context names
/// (gold below 10,000, silver below 100). The result is always clamped to
/// the configured per-patch bounds.
pub fn sanitize_currency(delta: i64, context: &str, config: &KernelConfig) -> i64 {
    let scaled = match detect_unit(delta, context) {
        Some(unit @ CurrencyUnit::Gold) if delta.unsigned_abs() < 10_000 => {
            delta.saturating_mul(unit.scale())
        }
        Some(unit @ CurrencyUnit::Silver) if delta.unsigned_abs() < 100 => {
            delta.saturating_mul(unit.scale())
        }
        _ => delta,
    };
    scaled.clamp(config.currency_delta_min, config.currency_delta_max)
}

/// How combat should begin.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatStart {
    Single(EnemyTemplate),
    Encounter(EncounterDefinition),
}

/// Validated commands for one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnCommands {
    pub player_hits: bool,
    pub enemy_hits: bool,
    pub end_combat: bool,
    pub hp_delta: Option<i32>,
    pub xp_gain: Option<u32>,
    pub currency_delta: Option<i64>,
    pub minutes: Option<u32>,
    pub start_combat: Option<CombatStart>,
    pub add_status: Option<StatusEffect>,
    pub remove_status: Option<String>,
    pub achievement: Option<String>,
    pub add_quest: Option<QuestPatch>,
    pub complete_quest: Option<String>,
    pub update_quest: Option<QuestUpdate>,
    pub recruit: Option<Companion>,
    pub fact: Option<String>,
    /// Destination from an honored "Arrived at X" fact.
    pub travel_to: Option<String>,
}

/// What the sanitizer needs to know about the turn.
pub struct SanitizeContext<'a> {
    pub action: ActionKind,
    pub narration: &'a str,
    pub tables: &'a dyn ContentTables,
    pub config: &'a KernelConfig,
}

fn unknown(field: &str, id: &str, diagnostics: &mut Vec<PatchDiagnostic>) {
    warn!(field, id, "patch references unknown content, skipping");
    diagnostics.push(PatchDiagnostic::new(
        field,
        DiagnosticKind::UnknownReference,
        format!("no such id: {id}"),
    ));
}

/// Validate `patch` into [`TurnCommands`].
pub fn sanitize(
    patch: &NarrativeIntentPatch,
    context: &SanitizeContext<'_>,
) -> (TurnCommands, Vec<PatchDiagnostic>) {
    let config = context.config;
    let tables = context.tables;
    let mut diagnostics = Vec::new();
    let mut commands = TurnCommands {
        player_hits: patch.player_attack_hits_enemy.unwrap_or(false),
        enemy_hits: patch.enemy_attack_hits_player.unwrap_or(false),
        end_combat: patch.end_combat.unwrap_or(false),
        ..Default::default()
    };

    commands.hp_delta = patch
        .hp_delta
        .map(|d| d.clamp(-(config.max_hp_delta as i64), config.max_hp_delta as i64) as i32)
        .filter(|d| *d != 0);

    commands.xp_gain = patch
        .xp_delta
        .filter(|xp| *xp > 0)
        .map(|xp| xp.min(u32::MAX as i64) as u32);

    commands.minutes = patch
        .time_delta
        .filter(|t| *t > 0)
        .map(|t| t.min(u32::MAX as i64) as u32);

    commands.currency_delta = patch
        .currency_delta
        .map(|delta| {
            let text = patch.currency_context.as_deref().unwrap_or(context.narration);
            sanitize_currency(delta, text, config)
        })
        .filter(|d| *d != 0);

    // Combat start. A named encounter wins over a single enemy.
    if let Some(id) = &patch.start_encounter {
        match tables.encounter(id) {
            Some(encounter) => commands.start_combat = Some(CombatStart::Encounter(encounter)),
            None => unknown("startEncounter", id, &mut diagnostics),
        }
    }
    if let Some(template) = &patch.start_combat {
        let resolved = match template {
            TemplateRef::Id(id) => {
                let found = tables.enemy_template(id);
                if found.is_none() {
                    unknown("startCombat", id, &mut diagnostics);
                }
                found
            }
            TemplateRef::Inline(template) => Some(template.clone()),
        };
        match (resolved, &commands.start_combat) {
            (Some(_), Some(_)) => diagnostics.push(PatchDiagnostic::new(
                "startCombat",
                DiagnosticKind::Rejected,
                "startEncounter already given",
            )),
            (Some(template), None) => commands.start_combat = Some(CombatStart::Single(template)),
            (None, _) => {}
        }
    }

    if let Some(effect) = &patch.add_status_effect {
        commands.add_status = match effect {
            StatusEffectRef::Id(id) => {
                let found = tables.status_effect(id);
                if found.is_none() {
                    unknown("addStatusEffect", id, &mut diagnostics);
                }
                found
            }
            StatusEffectRef::Inline(inline) => Some(StatusEffect {
                id: inline.id.clone(),
                name: inline.name.clone(),
                duration: inline
                    .duration
                    .unwrap_or(EffectDuration::Turns(config.default_status_duration)),
                payload: inline.payload.clone(),
            }),
        };
    }
    commands.remove_status = patch.remove_status_effect.as_deref().map(normalize_id);

    if let Some(companion) = &patch.recruit_companion {
        commands.recruit = match companion {
            CompanionRef::Id(id) => {
                let found = tables.companion(id);
                if found.is_none() {
                    unknown("recruitCompanion", id, &mut diagnostics);
                }
                found
            }
            CompanionRef::Inline(companion) => Some(companion.clone()),
        };
    }

    commands.achievement = patch.achievement.clone();
    commands.add_quest = patch.add_quest.clone();
    // Quests are keyed by normalized id.
    commands.complete_quest = patch.complete_quest.as_deref().map(normalize_id);
    commands.update_quest = patch.update_quest.clone().map(|mut update| {
        update.id = normalize_id(&update.id);
        update
    });

    if let Some(fact) = &patch.add_fact {
        let destination = ARRIVED_AT
            .as_ref()
            .and_then(|re| re.captures(fact))
            .map(|caps| caps[1].trim().to_string());
        match destination {
            Some(place) if context.action != ActionKind::Travel => {
                warn!(fact = %fact, action = %context.action, "location change without travel, rejecting");
                diagnostics.push(PatchDiagnostic::new(
                    "addFact",
                    DiagnosticKind::Rejected,
                    format!("cannot arrive at {place} without travelling"),
                ));
            }
            Some(place) => {
                commands.travel_to = Some(place);
                commands.fact = Some(fact.clone());
            }
            None => commands.fact = Some(fact.clone()),
        }
    }

    (commands, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Catalog;
    use serde_json::json;

    fn run(
        patch: serde_json::Value,
        action: ActionKind,
        narration: &str,
    ) -> (TurnCommands, Vec<PatchDiagnostic>) {
        let catalog = Catalog::standard();
        let config = KernelConfig::default();
        let (patch, _) = NarrativeIntentPatch::from_value(&patch);
        sanitize(
            &patch,
            &SanitizeContext {
                action,
                narration,
                tables: &catalog,
                config: &config,
            },
        )
    }

    #[test]
    fn test_gold_is_rescaled() {
        let config = KernelConfig::default();
        assert_eq!(sanitize_currency(5, "found 5 gold", &config), 50_000);
        assert_eq!(sanitize_currency(-3, "paid 3 gp", &config), -30_000);
        assert_eq!(sanitize_currency(40, "40 silver pieces", &config), 4_000);
        assert_eq!(sanitize_currency(250, "250 silver", &config), 250);
        assert_eq!(sanitize_currency(7, "7 copper", &config), 7);
        assert_eq!(sanitize_currency(12, "a small pouch", &config), 12);
    }

    #[test]
    fn test_currency_is_clamped() {
        let config = KernelConfig::default();
        assert_eq!(sanitize_currency(9_000_000, "a dragon hoard", &config), 500_000);
        assert_eq!(sanitize_currency(9_000_000, "9000000 gold", &config), 500_000);
        assert_eq!(sanitize_currency(-50, "lost 50 gold", &config), -200_000);
    }

    #[test]
    fn test_matching_amount_picks_the_unit() {
        assert_eq!(
            detect_unit(30, "3 gold and 30 silver"),
            Some(CurrencyUnit::Silver)
        );
        assert_eq!(detect_unit(8, "some gold and silver"), Some(CurrencyUnit::Gold));
        assert_eq!(detect_unit(8, "a golden idol"), None);
    }

    #[test]
    fn test_narration_is_fallback_context() {
        let (commands, _) = run(
            json!({ "currencyDelta": 2 }),
            ActionKind::Explore,
            "You pocket 2 gold coins.",
        );
        assert_eq!(commands.currency_delta, Some(20_000));
    }

    #[test]
    fn test_numeric_bounds() {
        let (commands, _) = run(
            json!({ "hpDelta": -500, "xpDelta": -20, "timeDelta": 0 }),
            ActionKind::Other,
            "",
        );
        assert_eq!(commands.hp_delta, Some(-100));
        assert_eq!(commands.xp_gain, None);
        assert_eq!(commands.minutes, None);
    }

    #[test]
    fn test_references_resolved() {
        let (commands, diagnostics) = run(
            json!({
                "startCombat": { "enemyTemplate": "dragon" },
                "addStatusEffect": "poisoned",
                "recruitCompanion": "brenna"
            }),
            ActionKind::Talk,
            "",
        );
        assert!(commands.start_combat.is_none());
        assert_eq!(commands.add_status.unwrap().id, "poisoned");
        assert_eq!(commands.recruit.unwrap().id, "brenna");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownReference);
    }

    #[test]
    fn test_encounter_wins_over_single_enemy() {
        let (commands, diagnostics) = run(
            json!({ "startEncounter": "wolf_pack", "startCombat": { "enemyTemplate": "goblin" } }),
            ActionKind::Explore,
            "",
        );
        assert!(matches!(
            commands.start_combat,
            Some(CombatStart::Encounter(ref e)) if e.id == "wolf_pack"
        ));
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Rejected);
    }

    #[test]
    fn test_inline_status_gets_default_duration() {
        let (commands, _) = run(
            json!({ "addStatusEffect": { "name": "Dizzy", "duration": "soon" } }),
            ActionKind::Other,
            "",
        );
        assert_eq!(
            commands.add_status.unwrap().duration,
            EffectDuration::Turns(3)
        );
    }

    #[test]
    fn test_arrival_requires_travel() {
        let (commands, diagnostics) = run(
            json!({ "addFact": "Arrived at Greywater." }),
            ActionKind::Talk,
            "",
        );
        assert!(commands.fact.is_none());
        assert!(commands.travel_to.is_none());
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Rejected);

        let (commands, _) = run(
            json!({ "addFact": "Arrived at Greywater." }),
            ActionKind::Travel,
            "",
        );
        assert_eq!(commands.travel_to.as_deref(), Some("Greywater"));

        let (commands, _) = run(
            json!({ "addFact": "The innkeeper owes you a favor" }),
            ActionKind::Talk,
            "",
        );
        assert_eq!(
            commands.fact.as_deref(),
            Some("The innkeeper owes you a favor")
        );
    }
}
