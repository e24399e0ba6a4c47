//! Experience thresholds and level-ups.

use crate::character::{Ability, Character};
use crate::dice::RollSource;
use crate::stats::derive_stats;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const MAX_LEVEL: u8 = 20;

/// Feats that add flat hit points every level.
const PER_LEVEL_HP_FEATS: &[(&str, i32)] = &[("tough", 2)];

/// XP needed to leave `level`.
pub fn xp_to_next_level(level: u8) -> u32 {
    level as u32 * 100 + 150
}

/// One level gained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub new_level: u8,
    pub hit_die_roll: u32,
    pub hp_gained: i32,
}

/// Spend XP on as many level-ups as it covers.
///
/// Each level rolls the class hit die once, adds the effective CON modifier
/// from [`derive_stats`] (at least 1 total) and per-level feat bonuses,
/// raises max HP, then refills every resource. At the level cap XP keeps accumulating.
pub fn apply_experience<R: RollSource + ?Sized>(
    mut character: Character,
    rolls: &mut R,
) -> (Character, Vec<LevelUp>) {
    let mut level_ups = Vec::new();
    let con = derive_stats(&character).modifier(Ability::Constitution);
    let feat_bonus: i32 = PER_LEVEL_HP_FEATS
        .iter()
        .filter(|(feat, _)| character.has_feat(feat))
        .map(|(_, bonus)| bonus)
        .sum();

    while character.level < MAX_LEVEL
        && character.experience >= xp_to_next_level(character.level)
    {
        character.experience -= xp_to_next_level(character.level);
        character.level += 1;

        let roll = rolls.roll_die(character.class.hit_die().sides());
        let gained = (roll as i32 + con).max(1) + feat_bonus;
        character.health = character.health.grow(gained).refill();
        character.mana = character.mana.refill();
        character.stamina = character.stamina.refill();

        info!(
            level = character.level,
            hp_gained = gained,
            max_hp = character.health.max,
            "level up"
        );
        level_ups.push(LevelUp {
            new_level: character.level,
            hit_die_roll: roll,
            hp_gained: gained,
        });
    }

    (character, level_ups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AbilityScores, CharacterClass};
    use crate::status::{self, EffectDuration, StatusEffect};
    use crate::testing::ScriptedRolls;

    fn fighter(con: u8) -> Character {
        Character::new("Oda", CharacterClass::Fighter)
            .with_ability_scores(AbilityScores::new(15, 12, con, 10, 10, 10))
            .with_health(12)
            .with_stamina(10)
    }

    #[test]
    fn test_threshold() {
        assert_eq!(xp_to_next_level(1), 250);
        assert_eq!(xp_to_next_level(4), 550);
    }

    #[test]
    fn test_single_level_up() {
        let mut character = fighter(14).with_experience(260);
        character.health.current = 3;
        character.stamina.current = 0;
        let mut rolls = ScriptedRolls::new([1]);
        let (character, ups) = apply_experience(character, &mut rolls);

        assert_eq!(character.level, 2);
        assert_eq!(character.experience, 10);
        assert_eq!(ups.len(), 1);
        assert_eq!(ups[0].hp_gained, 3);
        assert_eq!(character.health.max, 15);
        assert_eq!(character.health.current, 15);
        assert!(character.stamina.is_full());
    }

    #[test]
    fn test_minimum_gain_and_tough() {
        let character = fighter(3).with_experience(250);
        let mut rolls = ScriptedRolls::new([2]);
        let (plain, ups) = apply_experience(character.clone(), &mut rolls);
        assert_eq!(ups[0].hp_gained, 1);
        assert_eq!(plain.health.max, 13);

        let mut rolls = ScriptedRolls::new([2]);
        let (tough, ups) = apply_experience(character.with_feat("tough"), &mut rolls);
        assert_eq!(ups[0].hp_gained, 3);
        assert_eq!(tough.health.max, 15);
    }

    #[test]
    fn test_effective_constitution_counts() {
        let hardy = StatusEffect::new("hardy", "Hardy", EffectDuration::Permanent)
            .with_ability_modifier(Ability::Constitution, 4);
        let (character, _) = status::apply(fighter(10).with_experience(250), hardy);
        let mut rolls = ScriptedRolls::new([5]);
        let (character, ups) = apply_experience(character, &mut rolls);
        assert_eq!(ups[0].hp_gained, 7);
        assert_eq!(character.health.max, 19);
    }

    #[test]
    fn test_multiple_level_ups() {
        let character = fighter(10).with_experience(250 + 350 + 100);
        let mut rolls = ScriptedRolls::new([5, 5]);
        let (character, ups) = apply_experience(character, &mut rolls);
        assert_eq!(character.level, 3);
        assert_eq!(character.experience, 100);
        assert_eq!(ups.len(), 2);
    }

    #[test]
    fn test_level_cap() {
        let character = fighter(10).with_level(20).with_experience(100_000);
        let mut rolls = ScriptedRolls::new([]);
        let (character, ups) = apply_experience(character, &mut rolls);
        assert!(ups.is_empty());
        assert_eq!(character.level, 20);
        assert_eq!(character.experience, 100_000);
    }
}
