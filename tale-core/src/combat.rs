//! Combat resolution.
//!
//! A [`Combat`] is a roster of enemies plus a phase. Each player turn during
//! combat runs one exchange through [`resolve_exchange`]:
//!
//! 1. the current target is the first living enemy in roster order;
//! 2. the player's hit lands only if the narrator confirmed it;
//! 3. active companions attack the current target in turn;
//! 4. living enemies retaliate if the narrator said they hit;
//! 5. a dead player ends combat before any rewards are handed out;
//! 6. enemies that fell this exchange grant XP, loot and currency;
//! 7. combat ends in victory when the roster is cleared or the narrator
//!    ends it.
//!
//! Fleeing is a separate check, [`attempt_flee`], made before narration.

use crate::character::{Ability, Character};
use crate::content::ContentTables;
use crate::dice::RollSource;
use crate::encounter::Enemy;
use crate::stats::{derive_stats, DamageFormula, DerivedStats};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Hit chance (percent) for each enemy when more than one is alive.
pub const MULTI_ENEMY_HIT_CHANCE: u32 = 60;
/// Chance (percent) that a landed enemy hit goes to a companion instead.
pub const COMPANION_REDIRECT_CHANCE: u32 = 30;

const FLEE_DC_FLOOR: i32 = 8;
const FLEE_DC_FAST: i32 = 15;
const FLEE_DC_NORMAL: i32 = 10;
const FAST_ENEMY_SPEED: i32 = 40;

/// How a combat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    PlayerDeath,
    Fled,
}

impl fmt::Display for CombatOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatOutcome::Victory => write!(f, "victory"),
            CombatOutcome::PlayerDeath => write!(f, "player death"),
            CombatOutcome::Fled => write!(f, "fled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    Active,
    Resolved(CombatOutcome),
}

/// An ongoing or finished fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combat {
    pub roster: Vec<Enemy>,
    pub phase: CombatPhase,
    pub round: u32,
}

impl Combat {
    pub fn new(roster: Vec<Enemy>) -> Self {
        Self {
            roster,
            phase: CombatPhase::Active,
            round: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == CombatPhase::Active
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        match self.phase {
            CombatPhase::Active => None,
            CombatPhase::Resolved(outcome) => Some(outcome),
        }
    }

    /// Enemies still standing, in roster order.
    pub fn alive(&self) -> impl Iterator<Item = &Enemy> {
        self.roster.iter().filter(|e| e.is_alive())
    }

    pub fn current_target(&self) -> Option<&Enemy> {
        self.alive().next()
    }

    fn current_target_index(&self) -> Option<usize> {
        self.roster.iter().position(|e| e.is_alive())
    }

    pub fn is_cleared(&self) -> bool {
        self.roster.iter().all(|e| !e.is_alive())
    }

    /// Move to a terminal phase. Has no effect once resolved.
    pub fn resolve(&mut self, outcome: CombatOutcome) {
        if !self.is_active() {
            return;
        }
        self.phase = CombatPhase::Resolved(outcome);
    }
}

/// Something that happened during an exchange or flee attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    PlayerHit {
        target: String,
        damage: i32,
        remaining: i32,
    },
    CompanionAttack {
        companion: String,
        target: String,
        roll: i32,
        hit: bool,
        damage: i32,
    },
    EnemyMissed {
        enemy: String,
    },
    EnemyHitPlayer {
        enemy: String,
        damage: i32,
    },
    EnemyHitCompanion {
        enemy: String,
        companion: String,
        damage: i32,
    },
    CompanionKnockedOut {
        companion: String,
    },
    EnemyDefeated {
        enemy: String,
        xp: u32,
        currency: i64,
        loot: Vec<String>,
    },
    FleeSucceeded {
        roll: i32,
        dc: i32,
    },
    FleeFailed {
        roll: i32,
        dc: i32,
    },
    PlayerDefeated,
    Victory,
}

impl fmt::Display for CombatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatEvent::PlayerHit {
                target,
                damage,
                remaining,
            } => write!(f, "You hit {target} for {damage} damage ({remaining} HP left)."),
            CombatEvent::CompanionAttack {
                companion,
                target,
                hit: true,
                damage,
                ..
            } => write!(f, "{companion} hits {target} for {damage} damage."),
            CombatEvent::CompanionAttack {
                companion, target, ..
            } => write!(f, "{companion} misses {target}."),
            CombatEvent::EnemyMissed { enemy } => write!(f, "{enemy} misses."),
            CombatEvent::EnemyHitPlayer { enemy, damage } => {
                write!(f, "{enemy} hits you for {damage} damage.")
            }
            CombatEvent::EnemyHitCompanion {
                enemy,
                companion,
                damage,
            } => write!(f, "{enemy} hits {companion} for {damage} damage."),
            CombatEvent::CompanionKnockedOut { companion } => {
                write!(f, "{companion} is knocked out!")
            }
            CombatEvent::EnemyDefeated {
                enemy,
                xp,
                currency,
                loot,
            } => {
                write!(f, "{enemy} is defeated! +{xp} XP, +{currency} coin")?;
                if !loot.is_empty() {
                    write!(f, ", found {}", loot.join(", "))?;
                }
                write!(f, ".")
            }
            CombatEvent::FleeSucceeded { roll, dc } => {
                write!(f, "You escape! ({roll} vs DC {dc})")
            }
            CombatEvent::FleeFailed { roll, dc } => {
                write!(f, "You fail to escape. ({roll} vs DC {dc})")
            }
            CombatEvent::PlayerDefeated => write!(f, "You have fallen."),
            CombatEvent::Victory => write!(f, "Victory!"),
        }
    }
}

/// Probabilities used during retaliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    pub multi_enemy_hit_chance: u32,
    pub companion_redirect_chance: u32,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            multi_enemy_hit_chance: MULTI_ENEMY_HIT_CHANCE,
            companion_redirect_chance: COMPANION_REDIRECT_CHANCE,
        }
    }
}

/// What the narrator confirmed for this exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeIntent {
    pub player_hits: bool,
    pub enemy_hits: bool,
    pub end_combat: bool,
    /// Damage for this turn's hit; the weapon formula when `None`.
    pub player_damage: Option<DamageFormula>,
}

/// Totals granted by kill processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub xp: u32,
    pub currency: i64,
    pub items: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExchangeResult {
    pub character: Character,
    pub combat: Combat,
    pub events: Vec<CombatEvent>,
    pub rewards: Rewards,
    pub outcome: Option<CombatOutcome>,
}

/// Run one combat exchange.
pub fn resolve_exchange<R: RollSource + ?Sized>(
    mut character: Character,
    mut combat: Combat,
    intent: &ExchangeIntent,
    rules: &CombatRules,
    tables: &dyn ContentTables,
    rolls: &mut R,
) -> ExchangeResult {
    let mut events = Vec::new();
    let mut rewards = Rewards::default();

    if !combat.is_active() {
        let outcome = combat.outcome();
        return ExchangeResult {
            character,
            combat,
            events,
            rewards,
            outcome,
        };
    }

    combat.round += 1;
    let stats = derive_stats(&character);
    let alive_before: Vec<bool> = combat.roster.iter().map(Enemy::is_alive).collect();

    // Player attack.
    if intent.player_hits {
        if let Some(index) = combat.current_target_index() {
            let formula = intent.player_damage.as_ref().unwrap_or(&stats.damage);
            let damage = formula.roll(rolls);
            let target = &mut combat.roster[index];
            target.take_damage(damage);
            events.push(CombatEvent::PlayerHit {
                target: target.name.clone(),
                damage,
                remaining: target.hp,
            });
        }
    }

    // Companion assists.
    for companion in character.companions.iter().filter(|c| c.can_fight()) {
        let Some(index) = combat.current_target_index() else {
            break;
        };
        let target = &mut combat.roster[index];
        let natural = rolls.d20() as i32;
        let roll = natural.saturating_add(companion.attack_bonus);
        let hit = natural == 20 || (natural != 1 && roll >= target.armor_class);
        let damage = if hit {
            let dealt = companion.damage.roll(rolls).total.max(0);
            target.take_damage(dealt)
        } else {
            0
        };
        events.push(CombatEvent::CompanionAttack {
            companion: companion.name.clone(),
            target: target.name.clone(),
            roll,
            hit,
            damage,
        });
    }

    // Enemy retaliation.
    if intent.enemy_hits {
        retaliate(&mut character, &combat, &stats, rules, rolls, &mut events);
    }

    if !character.is_alive() {
        info!(round = combat.round, "player defeated in combat");
        events.push(CombatEvent::PlayerDefeated);
        combat.resolve(CombatOutcome::PlayerDeath);
        return ExchangeResult {
            character,
            combat,
            events,
            rewards,
            outcome: Some(CombatOutcome::PlayerDeath),
        };
    }

    // Kill processing.
    for (enemy, was_alive) in combat.roster.iter().zip(alive_before) {
        if !was_alive || enemy.is_alive() {
            continue;
        }
        let mut loot = Vec::new();
        for item_id in &enemy.loot {
            match tables.item(item_id) {
                Some(item) => {
                    loot.push(item.name.clone());
                    rewards.items.push(item.id.clone());
                    character.inventory.push(item);
                }
                None => warn!(enemy = %enemy.instance_id, item = %item_id, "unknown loot item, skipping"),
            }
        }
        let currency = enemy.currency_reward();
        character.experience = character.experience.saturating_add(enemy.xp_value);
        character = character.adjust_currency(currency);
        rewards.xp = rewards.xp.saturating_add(enemy.xp_value);
        rewards.currency = rewards.currency.saturating_add(currency);
        debug!(enemy = %enemy.instance_id, xp = enemy.xp_value, currency, "enemy defeated");
        events.push(CombatEvent::EnemyDefeated {
            enemy: enemy.name.clone(),
            xp: enemy.xp_value,
            currency,
            loot,
        });
    }

    if combat.is_cleared() || intent.end_combat {
        info!(round = combat.round, "combat won");
        events.push(CombatEvent::Victory);
        combat.resolve(CombatOutcome::Victory);
    }

    let outcome = combat.outcome();
    ExchangeResult {
        character,
        combat,
        events,
        rewards,
        outcome,
    }
}

/// Every living enemy attacks once.
///
/// With several enemies alive each hit lands independently at the
/// configured chance. Each landed hit may instead strike a random conscious
/// companion; a companion dropped to 0 leaves the pool for the rest of the
/// turn. Damage to the player is summed and applied once at the end.
fn retaliate<R: RollSource + ?Sized>(
    character: &mut Character,
    combat: &Combat,
    stats: &DerivedStats,
    rules: &CombatRules,
    rolls: &mut R,
    events: &mut Vec<CombatEvent>,
) {
    let attackers: Vec<&Enemy> = combat.alive().collect();
    let dampened = attackers.len() > 1;
    let mut pool: Vec<usize> = character
        .companions
        .iter()
        .enumerate()
        .filter(|(_, c)| c.can_fight())
        .map(|(i, _)| i)
        .collect();
    let mut player_damage: i32 = 0;

    for enemy in attackers {
        if dampened && !rolls.chance(rules.multi_enemy_hit_chance) {
            events.push(CombatEvent::EnemyMissed {
                enemy: enemy.name.clone(),
            });
            continue;
        }

        if !pool.is_empty() && rolls.chance(rules.companion_redirect_chance) {
            let slot = rolls.pick(pool.len());
            let companion = &mut character.companions[pool[slot]];
            let damage = enemy.damage.roll(rolls).total.max(0);
            companion.hp = companion.hp.adjust(-damage);
            events.push(CombatEvent::EnemyHitCompanion {
                enemy: enemy.name.clone(),
                companion: companion.name.clone(),
                damage,
            });
            if companion.hp.is_empty() {
                companion.active = false;
                events.push(CombatEvent::CompanionKnockedOut {
                    companion: companion.name.clone(),
                });
                pool.remove(slot);
            }
            continue;
        }

        let rolled = enemy.damage.roll(rolls).total;
        let damage = stats.damage_taken(rolled, enemy.damage_type);
        player_damage = player_damage.saturating_add(damage);
        events.push(CombatEvent::EnemyHitPlayer {
            enemy: enemy.name.clone(),
            damage,
        });
    }

    character.health = character.health.adjust(-player_damage);
}

/// Result of a flee attempt.
#[derive(Debug, Clone)]
pub struct FleeResult {
    pub character: Character,
    pub combat: Combat,
    pub escaped: bool,
    pub roll: i32,
    pub dc: i32,
    pub events: Vec<CombatEvent>,
}

/// Difficulty to escape an enemy moving at `speed`.
pub fn flee_dc(speed: i32) -> i32 {
    let dc = if speed >= FAST_ENEMY_SPEED {
        FLEE_DC_FAST
    } else {
        FLEE_DC_NORMAL
    };
    dc.max(FLEE_DC_FLOOR)
}

/// Try to escape: `d20 + DEX` against the current target's flee DC.
///
/// On failure the current target gets one free attack that cannot be
/// dampened or redirected.
pub fn attempt_flee<R: RollSource + ?Sized>(
    mut character: Character,
    mut combat: Combat,
    rolls: &mut R,
) -> FleeResult {
    let mut events = Vec::new();
    let stats = derive_stats(&character);

    let Some(target) = combat.current_target().cloned() else {
        combat.resolve(CombatOutcome::Fled);
        events.push(CombatEvent::FleeSucceeded { roll: 0, dc: 0 });
        return FleeResult {
            character,
            combat,
            escaped: true,
            roll: 0,
            dc: 0,
            events,
        };
    };

    let dc = flee_dc(target.speed);
    let roll = rolls.d20() as i32 + stats.modifier(Ability::Dexterity);
    let escaped = roll >= dc;
    debug!(roll, dc, escaped, "flee attempt");

    if escaped {
        combat.resolve(CombatOutcome::Fled);
        events.push(CombatEvent::FleeSucceeded { roll, dc });
    } else {
        events.push(CombatEvent::FleeFailed { roll, dc });
        let rolled = target.damage.roll(rolls).total;
        let damage = stats.damage_taken(rolled, target.damage_type);
        character.health = character.health.adjust(-damage);
        events.push(CombatEvent::EnemyHitPlayer {
            enemy: target.name.clone(),
            damage,
        });
        if !character.is_alive() {
            events.push(CombatEvent::PlayerDefeated);
            combat.resolve(CombatOutcome::PlayerDeath);
        }
    }

    FleeResult {
        character,
        combat,
        escaped,
        roll,
        dc,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AbilityScores, CharacterClass, Companion};
    use crate::content::Catalog;
    use crate::dice::DiceExpression;
    use crate::encounter::{scale_enemy, EnemyTemplate};
    use crate::testing::ScriptedRolls;

    fn enemy(id: &str, hp: i32, damage: &str, ordinal: usize) -> Enemy {
        let template = EnemyTemplate::new(id, id, hp, 12, DiceExpression::parse(damage).unwrap())
            .with_challenge_rating(1.0)
            .with_xp(50)
            .with_loot("dagger");
        // Level 3 adds no damage bonus at CR 1; hp is pinned below.
        let mut enemy = scale_enemy(&template, 3, ordinal);
        enemy.hp = hp;
        enemy.max_hp = hp;
        enemy
    }

    fn fighter(hp: i32) -> Character {
        Character::new("Rook", CharacterClass::Fighter)
            .with_ability_scores(AbilityScores::new(16, 14, 14, 10, 10, 10))
            .with_health(hp)
    }

    fn hit(player_damage: i32) -> ExchangeIntent {
        ExchangeIntent {
            player_hits: true,
            player_damage: Some(DamageFormula::new(
                DiceExpression::flat(player_damage),
                0,
                crate::items::DamageType::Slashing,
            )),
            ..Default::default()
        }
    }

    #[test]
    fn test_flee_dc() {
        assert_eq!(flee_dc(30), 10);
        assert_eq!(flee_dc(40), 15);
        assert_eq!(flee_dc(0), 10);
    }

    #[test]
    fn test_player_hit_and_auto_target() {
        let combat = Combat::new(vec![
            enemy("goblin", 5, "1d4", 1),
            enemy("goblin", 5, "1d4", 2),
            enemy("goblin", 5, "1d4", 3),
        ]);
        let catalog = Catalog::standard();
        let mut rolls = ScriptedRolls::new([]);

        let result = resolve_exchange(
            fighter(20),
            combat,
            &hit(9),
            &CombatRules::default(),
            &catalog,
            &mut rolls,
        );
        assert_eq!(result.combat.roster[0].hp, 0);
        assert_eq!(result.rewards.xp, 50);
        assert_eq!(result.rewards.currency, 50);
        assert_eq!(result.rewards.items, vec!["dagger".to_string()]);
        assert_eq!(result.character.experience, 50);
        assert_eq!(
            result.combat.current_target().unwrap().instance_id,
            "goblin#2"
        );

        let result = resolve_exchange(
            result.character,
            result.combat,
            &hit(2),
            &CombatRules::default(),
            &catalog,
            &mut rolls,
        );
        assert_eq!(result.combat.roster[0].hp, 0);
        assert_eq!(result.combat.roster[1].hp, 3);
        assert!(result.outcome.is_none());
    }

    #[test]
    fn test_lone_enemy_always_hits_and_damage_is_summed_after_resistance() {
        let combat = Combat::new(vec![enemy("orc", 20, "6", 1)]);
        let intent = ExchangeIntent {
            enemy_hits: true,
            ..Default::default()
        };
        let mut rolls = ScriptedRolls::new([]);
        let result = resolve_exchange(
            fighter(20),
            combat,
            &intent,
            &CombatRules::default(),
            &Catalog::new(),
            &mut rolls,
        );
        assert_eq!(result.character.health.current, 14);
    }

    #[test]
    fn test_multi_enemy_hits_are_dampened() {
        let combat = Combat::new(vec![enemy("a", 10, "4", 1), enemy("b", 10, "4", 2)]);
        let intent = ExchangeIntent {
            enemy_hits: true,
            ..Default::default()
        };
        // First enemy: 61 misses. Second: 60 hits.
        let mut rolls = ScriptedRolls::new([61, 60]);
        let result = resolve_exchange(
            fighter(20),
            combat,
            &intent,
            &CombatRules::default(),
            &Catalog::new(),
            &mut rolls,
        );
        assert_eq!(result.character.health.current, 16);
        assert_eq!(
            result.events[0],
            CombatEvent::EnemyMissed {
                enemy: "a".to_string()
            }
        );
    }

    #[test]
    fn test_redirect_knocks_out_companion() {
        let combat = Combat::new(vec![enemy("ogre", 30, "9", 1)]);
        let character = fighter(20).with_companion(
            Companion::new("grey", "Grey", 5)
                .with_armor_class(30)
                .with_attack(0, DiceExpression::flat(1)),
        );
        let intent = ExchangeIntent {
            enemy_hits: true,
            ..Default::default()
        };
        // Companion rolls a 2 and misses. Redirect roll 30 succeeds, pick the only companion.
        let mut rolls = ScriptedRolls::new([2, 30, 1]);
        let result = resolve_exchange(
            character,
            combat,
            &intent,
            &CombatRules::default(),
            &Catalog::new(),
            &mut rolls,
        );
        assert_eq!(result.character.health.current, 20);
        assert!(!result.character.companions[0].active);
        assert_eq!(result.character.companions[0].hp.current, 0);
        assert!(result.events.contains(&CombatEvent::CompanionKnockedOut {
            companion: "Grey".to_string()
        }));
    }

    #[test]
    fn test_companions_attack_current_target() {
        let combat = Combat::new(vec![enemy("rat", 3, "1", 1), enemy("rat", 3, "1", 2)]);
        let character = fighter(20)
            .with_companion(
                Companion::new("kit", "Kit", 10).with_attack(4, DiceExpression::flat(5)),
            )
            .with_companion(
                Companion::new("brenna", "Brenna", 10).with_attack(4, DiceExpression::flat(5)),
            );
        // Both companions roll 15: 19 vs AC 12 hits.
        let mut rolls = ScriptedRolls::new([15, 15]);
        let result = resolve_exchange(
            character,
            combat,
            &ExchangeIntent::default(),
            &CombatRules::default(),
            &Catalog::new(),
            &mut rolls,
        );
        assert!(result.combat.is_cleared());
        assert_eq!(result.outcome, Some(CombatOutcome::Victory));
        assert_eq!(result.rewards.xp, 100);
    }

    #[test]
    fn test_extreme_attack_and_damage_values_saturate() {
        let character = fighter(20).with_companion(
            Companion::new("kit", "Kit", 10).with_attack(i32::MAX, DiceExpression::flat(i32::MAX)),
        );
        let mut rolls = ScriptedRolls::new([15]);
        let result = resolve_exchange(
            character,
            Combat::new(vec![enemy("wyrm", 50, "1", 1)]),
            &ExchangeIntent::default(),
            &CombatRules::default(),
            &Catalog::new(),
            &mut rolls,
        );
        assert_eq!(result.combat.roster[0].hp, 0);
        assert_eq!(result.outcome, Some(CombatOutcome::Victory));

        let combat = Combat::new(vec![
            enemy("wyrm", 50, "2147483647", 1),
            enemy("wyrm", 50, "2147483647", 2),
        ]);
        let intent = ExchangeIntent {
            enemy_hits: true,
            ..Default::default()
        };
        // Both dampened hit checks pass.
        let mut rolls = ScriptedRolls::new([1, 1]);
        let result = resolve_exchange(
            fighter(20),
            combat,
            &intent,
            &CombatRules::default(),
            &Catalog::new(),
            &mut rolls,
        );
        assert_eq!(result.character.health.current, 0);
        assert_eq!(result.outcome, Some(CombatOutcome::PlayerDeath));
    }

    #[test]
    fn test_death_blocks_rewards() {
        let combat = Combat::new(vec![enemy("troll", 4, "10", 1)]);
        let intent = ExchangeIntent {
            enemy_hits: true,
            ..hit(10)
        };
        let mut player = fighter(20);
        player.health.current = 5;
        let mut rolls = ScriptedRolls::new([]);
        let result = resolve_exchange(
            player,
            combat,
            &intent,
            &CombatRules::default(),
            &Catalog::standard(),
            &mut rolls,
        );
        // The killed troll no longer retaliates; nothing hits the player.
        assert_eq!(result.outcome, Some(CombatOutcome::Victory));

        let combat = Combat::new(vec![enemy("troll", 4, "10", 1), enemy("troll", 30, "10", 2)]);
        let mut player = fighter(20);
        player.health.current = 5;
        // The second troll survives and, alone, always hits.
        let result = resolve_exchange(
            player,
            combat,
            &intent,
            &CombatRules::default(),
            &Catalog::standard(),
            &mut rolls,
        );
        assert_eq!(result.outcome, Some(CombatOutcome::PlayerDeath));
        assert_eq!(result.combat.roster[0].hp, 0);
        assert_eq!(result.character.experience, 0);
        assert!(result.character.inventory.is_empty());
        assert_eq!(result.character.currency, 0);
        assert_eq!(result.rewards, Rewards::default());
    }

    #[test]
    fn test_end_combat_flag() {
        let combat = Combat::new(vec![enemy("guard", 10, "1", 1)]);
        let intent = ExchangeIntent {
            end_combat: true,
            ..Default::default()
        };
        let mut rolls = ScriptedRolls::new([]);
        let result = resolve_exchange(
            fighter(10),
            combat,
            &intent,
            &CombatRules::default(),
            &Catalog::new(),
            &mut rolls,
        );
        assert_eq!(result.outcome, Some(CombatOutcome::Victory));
        assert_eq!(result.combat.roster[0].hp, 10);
    }

    #[test]
    fn test_flee_success_takes_no_damage() {
        let combat = Combat::new(vec![enemy("bandit", 10, "5", 1)]);
        let mut rolls = ScriptedRolls::new([15]);
        let result = attempt_flee(fighter(12), combat, &mut rolls);
        assert!(result.escaped);
        assert_eq!(result.roll, 17);
        assert_eq!(result.dc, 10);
        assert_eq!(result.combat.outcome(), Some(CombatOutcome::Fled));
        assert_eq!(result.character.health.current, 12);
    }

    #[test]
    fn test_failed_flee_can_kill() {
        let mut fast = enemy("wolf", 10, "8", 1);
        fast.speed = 40;
        let combat = Combat::new(vec![fast]);
        let mut player = fighter(12);
        player.health.current = 6;
        let mut rolls = ScriptedRolls::new([10]);
        let result = attempt_flee(player, combat, &mut rolls);
        assert!(!result.escaped);
        assert_eq!(result.dc, 15);
        assert_eq!(result.character.health.current, 0);
        assert_eq!(result.combat.outcome(), Some(CombatOutcome::PlayerDeath));
    }
}
