//! Status effects and their per-turn lifecycle.
//!
//! Effects are applied once (duplicates by id are ignored), ticked once per
//! turn and removed when their duration runs out. Resource deltas from all
//! active effects are summed before clamping, so a +5 regeneration and a -3
//! poison net to +2 even when the pool is empty.

use crate::character::{Ability, Character};
use crate::items::DamageType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Closed set of action categories a player can take.
///
/// Used by status effects that disable a kind of action and by the travel
/// rule for location facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    CastSpell,
    UseItem,
    Equip,
    Flee,
    Travel,
    Talk,
    Explore,
    Other,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Attack => "attack",
            ActionKind::CastSpell => "cast a spell",
            ActionKind::UseItem => "use an item",
            ActionKind::Equip => "change equipment",
            ActionKind::Flee => "flee",
            ActionKind::Travel => "travel",
            ActionKind::Talk => "talk",
            ActionKind::Explore => "explore",
            ActionKind::Other => "act",
        }
    }

    /// Lenient parse for narrator-supplied strings.
    pub fn from_name(name: &str) -> Option<ActionKind> {
        let normalized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "attack" | "melee" | "combat" => Some(ActionKind::Attack),
            "cast" | "castspell" | "spell" | "magic" => Some(ActionKind::CastSpell),
            "useitem" | "item" | "use" => Some(ActionKind::UseItem),
            "equip" | "unequip" => Some(ActionKind::Equip),
            "flee" | "run" => Some(ActionKind::Flee),
            "travel" | "move" => Some(ActionKind::Travel),
            "talk" | "speak" => Some(ActionKind::Talk),
            "explore" | "search" => Some(ActionKind::Explore),
            "other" => Some(ActionKind::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How long an effect lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectDuration {
    /// Counted down once per turn; removed on reaching zero.
    Turns(u32),
    Permanent,
}

impl EffectDuration {
    pub fn is_permanent(&self) -> bool {
        matches!(self, EffectDuration::Permanent)
    }
}

/// Per-turn changes to the three resource pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDeltas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamina: Option<i32>,
}

impl ResourceDeltas {
    pub fn is_empty(&self) -> bool {
        self.health.is_none() && self.mana.is_none() && self.stamina.is_none()
    }
}

/// What an effect does while active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectPayload {
    #[serde(default)]
    pub per_turn: ResourceDeltas,
    #[serde(default)]
    pub ability_modifiers: BTreeMap<Ability, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_class: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disables: Option<ActionKind>,
    #[serde(default)]
    pub resistances: BTreeSet<DamageType>,
    #[serde(default)]
    pub vulnerabilities: BTreeSet<DamageType>,
}

/// An active condition on a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub id: String,
    pub name: String,
    pub duration: EffectDuration,
    #[serde(default)]
    pub payload: EffectPayload,
}

impl StatusEffect {
    pub fn new(id: impl Into<String>, name: impl Into<String>, duration: EffectDuration) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration,
            payload: EffectPayload::default(),
        }
    }

    pub fn with_health_per_turn(mut self, delta: i32) -> Self {
        self.payload.per_turn.health = Some(delta);
        self
    }

    pub fn with_mana_per_turn(mut self, delta: i32) -> Self {
        self.payload.per_turn.mana = Some(delta);
        self
    }

    pub fn with_stamina_per_turn(mut self, delta: i32) -> Self {
        self.payload.per_turn.stamina = Some(delta);
        self
    }

    pub fn with_ability_modifier(mut self, ability: Ability, modifier: i32) -> Self {
        *self.payload.ability_modifiers.entry(ability).or_insert(0) += modifier;
        self
    }

    pub fn with_armor_class(mut self, modifier: i32) -> Self {
        self.payload.armor_class = Some(modifier);
        self
    }

    pub fn with_speed(mut self, modifier: i32) -> Self {
        self.payload.speed = Some(modifier);
        self
    }

    pub fn with_damage(mut self, modifier: i32) -> Self {
        self.payload.damage = Some(modifier);
        self
    }

    pub fn disabling(mut self, kind: ActionKind) -> Self {
        self.payload.disables = Some(kind);
        self
    }

    pub fn with_resistance(mut self, damage_type: DamageType) -> Self {
        self.payload.resistances.insert(damage_type);
        self
    }

    pub fn with_vulnerability(mut self, damage_type: DamageType) -> Self {
        self.payload.vulnerabilities.insert(damage_type);
        self
    }
}

/// Result of [`apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// An effect with the same id is already active; nothing changed.
    AlreadyActive,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Summed deltas actually requested this tick (before clamping).
    pub health: i32,
    pub mana: i32,
    pub stamina: i32,
    /// Ids of effects that expired.
    pub expired: Vec<String>,
    /// Human-readable log lines.
    pub messages: Vec<String>,
}

/// Add `effect` unless one with the same id is already active.
pub fn apply(mut character: Character, effect: StatusEffect) -> (Character, ApplyOutcome) {
    if character.has_effect(&effect.id) {
        debug!(effect = %effect.id, "status effect already active, ignoring");
        return (character, ApplyOutcome::AlreadyActive);
    }
    debug!(effect = %effect.id, duration = ?effect.duration, "status effect applied");
    character.status_effects.push(effect);
    (character, ApplyOutcome::Applied)
}

/// Remove the effect with `id`. Returns whether anything was removed.
pub fn remove(mut character: Character, id: &str) -> (Character, bool) {
    let before = character.status_effects.len();
    character.status_effects.retain(|e| e.id != id);
    let removed = character.status_effects.len() != before;
    (character, removed)
}

/// Advance every active effect by one turn.
pub fn tick(mut character: Character) -> (Character, TickReport) {
    let mut report = TickReport::default();

    for effect in &character.status_effects {
        let deltas = effect.payload.per_turn;
        report.health += deltas.health.unwrap_or(0);
        report.mana += deltas.mana.unwrap_or(0);
        report.stamina += deltas.stamina.unwrap_or(0);
    }

    character.health = character.health.adjust(report.health);
    character.mana = character.mana.adjust(report.mana);
    character.stamina = character.stamina.adjust(report.stamina);

    let mut remaining = Vec::with_capacity(character.status_effects.len());
    for mut effect in character.status_effects {
        match effect.duration {
            EffectDuration::Permanent => remaining.push(effect),
            EffectDuration::Turns(n) => {
                let left = n.saturating_sub(1);
                if left == 0 {
                    report.messages.push(format!("{} has worn off.", effect.name));
                    report.expired.push(effect.id);
                } else {
                    effect.duration = EffectDuration::Turns(left);
                    remaining.push(effect);
                }
            }
        }
    }
    character.status_effects = remaining;

    (character, report)
}

/// The first active effect that disables `kind`, if any.
pub fn disabling_effect(character: &Character, kind: ActionKind) -> Option<&StatusEffect> {
    character
        .status_effects
        .iter()
        .find(|e| e.payload.disables == Some(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterClass;

    fn hero() -> Character {
        Character::new("Mira", CharacterClass::Fighter)
            .with_health(20)
            .with_mana(10)
    }

    #[test]
    fn test_apply_rejects_duplicates() {
        let poison = StatusEffect::new("poisoned", "Poisoned", EffectDuration::Turns(3))
            .with_health_per_turn(-2);
        let (character, first) = apply(hero(), poison.clone());
        let (character, second) = apply(character, poison);
        assert_eq!(first, ApplyOutcome::Applied);
        assert_eq!(second, ApplyOutcome::AlreadyActive);
        assert_eq!(character.status_effects.len(), 1);
    }

    #[test]
    fn test_deltas_sum_before_clamping() {
        let mut character = hero();
        character.health.current = 0;
        let (character, _) = apply(
            character,
            StatusEffect::new("regen", "Regeneration", EffectDuration::Turns(5))
                .with_health_per_turn(5),
        );
        let (character, _) = apply(
            character,
            StatusEffect::new("poisoned", "Poisoned", EffectDuration::Turns(5))
                .with_health_per_turn(-3),
        );
        let (character, report) = tick(character);
        assert_eq!(report.health, 2);
        assert_eq!(character.health.current, 2);
    }

    #[test]
    fn test_tick_clamps_to_max() {
        let (character, _) = apply(
            hero(),
            StatusEffect::new("blessed", "Blessed", EffectDuration::Permanent)
                .with_health_per_turn(50)
                .with_mana_per_turn(-50),
        );
        let (character, _) = tick(character);
        assert_eq!(character.health.current, 20);
        assert_eq!(character.mana.current, 0);
    }

    #[test]
    fn test_expiry_message_and_permanent_effects() {
        let (character, _) = apply(
            hero(),
            StatusEffect::new("haste", "Haste", EffectDuration::Turns(1)),
        );
        let (character, _) = apply(
            character,
            StatusEffect::new("cursed", "Cursed", EffectDuration::Permanent),
        );
        let (character, report) = tick(character);
        assert_eq!(report.expired, vec!["haste".to_string()]);
        assert_eq!(report.messages, vec!["Haste has worn off.".to_string()]);
        assert!(character.has_effect("cursed"));

        let (character, report) = tick(character);
        assert!(report.expired.is_empty());
        assert!(character.has_effect("cursed"));
    }

    #[test]
    fn test_durations_count_down() {
        let (character, _) = apply(
            hero(),
            StatusEffect::new("shield", "Shield", EffectDuration::Turns(3)),
        );
        let (character, _) = tick(character);
        assert_eq!(
            character.status_effects[0].duration,
            EffectDuration::Turns(2)
        );
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let (character, removed) = remove(hero(), "missing");
        assert!(!removed);
        assert!(character.status_effects.is_empty());
    }

    #[test]
    fn test_disabling_effect_lookup() {
        let (character, _) = apply(
            hero(),
            StatusEffect::new("silenced", "Silenced", EffectDuration::Turns(2))
                .disabling(ActionKind::CastSpell),
        );
        assert!(disabling_effect(&character, ActionKind::CastSpell).is_some());
        assert!(disabling_effect(&character, ActionKind::Attack).is_none());
    }

    #[test]
    fn test_action_kind_from_name() {
        assert_eq!(ActionKind::from_name("cast_spell"), Some(ActionKind::CastSpell));
        assert_eq!(ActionKind::from_name("Attack"), Some(ActionKind::Attack));
        assert_eq!(ActionKind::from_name("dance"), None);
    }
}
