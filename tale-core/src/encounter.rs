//! Enemy templates and level scaling.
//!
//! A template carries a challenge rating. The rating maps to the band of
//! player levels it is meant for; a player above the band's midpoint faces
//! tougher instances (more hit points, a flat damage bonus), a player below
//! it faces weaker ones.

use crate::content::ContentTables;
use crate::dice::DiceExpression;
use crate::items::DamageType;
use serde::{Deserialize, Serialize};
use tracing::warn;

const MAX_LEVEL: u8 = 20;

/// Challenge rating to intended player level band, ascending by rating.
const CR_BANDS: &[(f64, u8, u8)] = &[
    (0.0, 1, 1),
    (0.125, 1, 1),
    (0.25, 1, 2),
    (0.5, 1, 3),
    (1.0, 1, 4),
    (2.0, 3, 5),
    (3.0, 4, 6),
    (4.0, 5, 7),
    (5.0, 6, 9),
    (6.0, 7, 10),
    (7.0, 8, 11),
    (8.0, 9, 12),
    (9.0, 10, 13),
    (10.0, 11, 14),
];

/// Static enemy definition from the content tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub id: String,
    pub name: String,
    pub hp: i32,
    pub armor_class: i32,
    pub damage: DiceExpression,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    #[serde(default)]
    pub challenge_rating: f64,
    #[serde(default = "default_speed")]
    pub speed: i32,
    #[serde(default)]
    pub xp_value: u32,
    #[serde(default)]
    pub loot: Vec<String>,
}

fn default_speed() -> i32 {
    30
}

impl EnemyTemplate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        hp: i32,
        armor_class: i32,
        damage: DiceExpression,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hp,
            armor_class,
            damage,
            damage_type: None,
            challenge_rating: 0.0,
            speed: default_speed(),
            xp_value: 0,
            loot: Vec::new(),
        }
    }

    pub fn with_challenge_rating(mut self, cr: f64) -> Self {
        self.challenge_rating = cr;
        self
    }

    pub fn with_speed(mut self, speed: i32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp_value = xp;
        self
    }

    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = Some(damage_type);
        self
    }

    pub fn with_loot(mut self, item_id: impl Into<String>) -> Self {
        self.loot.push(item_id.into());
        self
    }
}

/// A list of template ids that appear together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub enemies: Vec<String>,
}

/// One enemy in a combat roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// `<template id>#<ordinal>`, unique within one roster.
    pub instance_id: String,
    pub template_id: String,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub armor_class: i32,
    pub damage: DiceExpression,
    pub damage_type: Option<DamageType>,
    pub challenge_rating: f64,
    pub speed: i32,
    pub xp_value: u32,
    pub loot: Vec<String>,
}

impl Enemy {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Subtract damage, never below zero. Returns the hp actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_sub(amount.max(0)).max(0);
        before - self.hp
    }

    /// Currency dropped on defeat: `floor(cr * 50)`.
    pub fn currency_reward(&self) -> i64 {
        (self.challenge_rating.max(0.0) * 50.0).floor() as i64
    }
}

/// The player level band a challenge rating is tuned for.
pub fn level_band(challenge_rating: f64) -> (u8, u8) {
    let cr = challenge_rating.max(0.0);
    if let Some(&(_, lo, hi)) = CR_BANDS.iter().find(|(band_cr, _, _)| cr <= *band_cr) {
        return (lo, hi);
    }
    let cr = cr.floor();
    let lo = (cr + 1.0).min(MAX_LEVEL as f64) as u8;
    let hi = (cr + 4.0).min(MAX_LEVEL as f64) as u8;
    (lo, hi)
}

/// Hit point multiplier and flat damage bonus for a rating at a player level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub hp_multiplier: f64,
    pub damage_bonus: i32,
}

pub fn scaling_for(challenge_rating: f64, player_level: u8) -> Scaling {
    let (lo, hi) = level_band(challenge_rating);
    let midpoint = (lo as f64 + hi as f64) / 2.0;
    let level_diff = player_level as f64 - midpoint;
    Scaling {
        hp_multiplier: (1.0 + 0.1 * level_diff).clamp(0.5, 2.0),
        damage_bonus: ((0.5 * level_diff).floor() as i32).clamp(0, 5),
    }
}

/// Instantiate `template` scaled for `player_level`.
pub fn scale_enemy(template: &EnemyTemplate, player_level: u8, ordinal: usize) -> Enemy {
    let scaling = scaling_for(template.challenge_rating, player_level);
    let max_hp = ((template.hp.max(1) as f64 * scaling.hp_multiplier).round() as i32).max(1);

    Enemy {
        instance_id: format!("{}#{}", template.id, ordinal),
        template_id: template.id.clone(),
        name: template.name.clone(),
        hp: max_hp,
        max_hp,
        armor_class: template.armor_class,
        damage: template.damage.clone().with_bonus(scaling.damage_bonus),
        damage_type: template.damage_type,
        challenge_rating: template.challenge_rating,
        speed: template.speed,
        xp_value: template.xp_value,
        loot: template.loot.clone(),
    }
}

/// Build a roster from an encounter definition.
///
/// Each listed id becomes one scaled instance; the ordinal is the 1-based
/// position in the definition, so repeated ids stay distinct. Unknown ids
/// are skipped.
pub fn expand_encounter(
    definition: &EncounterDefinition,
    tables: &dyn ContentTables,
    player_level: u8,
) -> Vec<Enemy> {
    definition
        .enemies
        .iter()
        .enumerate()
        .filter_map(|(index, template_id)| match tables.enemy_template(template_id) {
            Some(template) => Some(scale_enemy(&template, player_level, index + 1)),
            None => {
                warn!(
                    encounter = %definition.id,
                    template = %template_id,
                    "unknown enemy template in encounter, skipping"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Catalog;

    fn goblin() -> EnemyTemplate {
        EnemyTemplate::new("goblin", "Goblin", 20, 13, DiceExpression::parse("1d6+1").unwrap())
            .with_challenge_rating(1.0)
            .with_xp(50)
    }

    #[test]
    fn test_level_band_lookup() {
        assert_eq!(level_band(0.25), (1, 2));
        assert_eq!(level_band(0.3), (1, 3));
        assert_eq!(level_band(4.0), (5, 7));
        assert_eq!(level_band(12.0), (13, 16));
        assert_eq!(level_band(18.0), (19, 20));
    }

    #[test]
    fn test_scaling_at_midpoint_is_neutral() {
        let scaling = scaling_for(4.0, 6);
        assert_eq!(scaling.hp_multiplier, 1.0);
        assert_eq!(scaling.damage_bonus, 0);
    }

    #[test]
    fn test_scaling_is_clamped() {
        let strong = scaling_for(0.0, 20);
        assert_eq!(strong.hp_multiplier, 2.0);
        assert_eq!(strong.damage_bonus, 5);

        let weak = scaling_for(10.0, 1);
        assert_eq!(weak.hp_multiplier, 0.5);
        assert_eq!(weak.damage_bonus, 0);
    }

    #[test]
    fn test_scale_enemy_adjusts_hp_and_damage_modifier() {
        // CR 1 band is 1..=4, midpoint 2.5; level 7 is 4.5 above.
        let enemy = scale_enemy(&goblin(), 7, 1);
        assert_eq!(enemy.instance_id, "goblin#1");
        assert_eq!(enemy.max_hp, 29);
        assert_eq!(enemy.hp, 29);
        assert_eq!(enemy.damage.to_string(), "1d6+3");
    }

    #[test]
    fn test_expand_encounter_keeps_duplicates_distinct() {
        let catalog = Catalog::new().with_enemy(goblin());
        let definition = EncounterDefinition {
            id: "ambush".into(),
            name: "Ambush".into(),
            enemies: vec!["goblin".into(), "ogre".into(), "goblin".into()],
        };
        let roster = expand_encounter(&definition, &catalog, 1);
        let ids: Vec<_> = roster.iter().map(|e| e.instance_id.as_str()).collect();
        assert_eq!(ids, vec!["goblin#1", "goblin#3"]);
    }

    #[test]
    fn test_take_damage_never_negative() {
        let mut enemy = scale_enemy(&goblin(), 2, 1);
        let lost = enemy.take_damage(100);
        assert_eq!(enemy.hp, 0);
        assert_eq!(lost, enemy.max_hp);
        assert_eq!(enemy.take_damage(-5), 0);
        assert!(!enemy.is_alive());
    }

    #[test]
    fn test_currency_reward_floors() {
        let enemy = scale_enemy(&goblin().with_challenge_rating(0.125), 1, 1);
        assert_eq!(enemy.currency_reward(), 6);
    }
}
