//! Combat scenarios driven through whole turns.
//!
//! Dice are scripted, so every expected number below follows from the
//! standard catalog: goblins scale to 7 HP at level 1, a longsword hit from
//! the sample fighter is `1d8 + 3`.

use serde_json::json;
use tale_core::combat::CombatEvent;
use tale_core::content::ContentTables;
use tale_core::encounter::scale_enemy;
use tale_core::testing::{
    assert_hp, assert_in_combat, assert_not_in_combat, sample_fighter, ScriptedRolls, TestHarness,
};
use tale_core::{Catalog, Combat, CombatOutcome, GameState, PlayerAction, TurnError, TurnOutcome};

/// A state already mid-fight against the given catalog enemies.
fn fighting(enemy_ids: &[&str], current_hp: i32) -> GameState {
    let catalog = Catalog::standard();
    let mut character = sample_fighter("Test Hero");
    character.health = character.health.with_current(current_hp);
    let roster = enemy_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let template = catalog.enemy_template(id).expect("catalog enemy");
            scale_enemy(&template, character.level, i + 1)
        })
        .collect();
    let mut state = GameState::new(character, "Old Road");
    state.combat = Some(Combat::new(roster));
    state
}

// =============================================================================
// Starting fights
// =============================================================================

#[tokio::test]
async fn test_encounter_starts_without_exchange() {
    let mut harness = TestHarness::new();
    harness.expect_patch(
        "Three goblins leap from the brush!",
        json!({ "startEncounter": "goblin_ambush" }),
    );

    let report = harness.act(PlayerAction::Explore).await.unwrap();

    assert_eq!(report.outcome, TurnOutcome::CombatStarted);
    assert!(report.combat_events.is_empty());
    assert_in_combat(&harness);

    let combat = harness.state().combat.as_ref().unwrap();
    let ids: Vec<&str> = combat.roster.iter().map(|e| e.instance_id.as_str()).collect();
    assert_eq!(ids, vec!["goblin#1", "goblin#2", "goblin#3"]);
    assert!(combat.roster.iter().all(|e| e.hp == 7));
    assert_hp(&harness, 12, 12);
}

#[tokio::test]
async fn test_kill_grants_rewards_and_advances_target() {
    let mut harness = TestHarness::new().with_rolls(ScriptedRolls::new([8]));
    harness
        .expect_patch("Goblins!", json!({ "startEncounter": "goblin_ambush" }))
        .expect_patch(
            "Your blade cuts the first goblin down.",
            json!({ "playerAttackHitsEnemy": true }),
        );

    harness.act(PlayerAction::Explore).await.unwrap();
    let report = harness.act(PlayerAction::Attack).await.unwrap();

    assert_eq!(report.outcome, TurnOutcome::Continue);
    assert!(report.combat_events.contains(&CombatEvent::PlayerHit {
        target: "Goblin".to_string(),
        damage: 11,
        remaining: 0,
    }));

    let character = harness.character();
    assert_eq!(character.experience, 50);
    assert_eq!(character.currency, 12);
    assert!(character.inventory.iter().any(|item| item.id == "dagger"));

    let combat = harness.state().combat.as_ref().unwrap();
    assert_eq!(combat.current_target().unwrap().instance_id, "goblin#2");
    assert_eq!(combat.alive().count(), 2);
}

#[tokio::test]
async fn test_second_start_is_rejected_while_fighting() {
    let mut harness = TestHarness::with_state(fighting(&["goblin"], 12));
    harness.expect_patch("An ogre lumbers over.", json!({ "startCombat": "ogre" }));

    let report = harness.act(PlayerAction::Talk).await.unwrap();

    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.field == "startCombat"));
    let combat = harness.state().combat.as_ref().unwrap();
    assert_eq!(combat.roster.len(), 1);
    assert_eq!(combat.roster[0].template_id, "goblin");
}

// =============================================================================
// Victory and death
// =============================================================================

#[tokio::test]
async fn test_clearing_roster_is_victory() {
    let mut harness =
        TestHarness::with_state(fighting(&["goblin"], 12)).with_rolls(ScriptedRolls::new([6]));
    harness.expect_patch("The goblin falls.", json!({ "playerAttackHitsEnemy": true }));

    let report = harness.act(PlayerAction::Attack).await.unwrap();

    assert_eq!(report.outcome, TurnOutcome::CombatEnded(CombatOutcome::Victory));
    assert!(report.combat_events.contains(&CombatEvent::Victory));
    assert_not_in_combat(&harness);
    assert_eq!(harness.character().experience, 50);
}

#[tokio::test]
async fn test_death_in_same_exchange_blocks_loot() {
    // The player's hit kills goblin#1, then goblin#2 lands 1d6 = 6 on a
    // player with 5 HP.
    let mut harness = TestHarness::with_state(fighting(&["goblin", "goblin"], 5))
        .with_rolls(ScriptedRolls::new([8, 6]));
    harness.expect_patch(
        "You strike, but the second goblin's blade finds you.",
        json!({ "playerAttackHitsEnemy": true, "enemyAttackHitsPlayer": true }),
    );

    let report = harness.act(PlayerAction::Attack).await.unwrap();

    assert_eq!(report.outcome, TurnOutcome::PlayerDeath);
    assert!(report.combat_events.contains(&CombatEvent::PlayerDefeated));
    assert!(!report
        .combat_events
        .iter()
        .any(|e| matches!(e, CombatEvent::EnemyDefeated { .. })));

    let character = harness.character();
    assert_eq!(character.health.current, 0);
    assert_eq!(character.experience, 0);
    assert_eq!(character.currency, 0);
    assert!(!character.inventory.iter().any(|item| item.id == "dagger"));
    assert_not_in_combat(&harness);
}

#[tokio::test]
async fn test_turn_after_death_is_game_over() {
    let mut harness = TestHarness::new();
    harness.expect_patch("A rockslide buries you.", json!({ "hpDelta": -500 }));

    let report = harness.act(PlayerAction::Explore).await.unwrap();
    assert_eq!(report.outcome, TurnOutcome::PlayerDeath);
    assert!(harness.session.is_over());

    let turn = harness.state().turn;
    let err = harness.act(PlayerAction::Explore).await.unwrap_err();
    assert_eq!(err, TurnError::GameOver);
    assert_eq!(harness.state().turn, turn);
}

#[tokio::test]
async fn test_hp_delta_ignored_during_combat() {
    let mut harness = TestHarness::with_state(fighting(&["goblin"], 12));
    harness.expect_patch("You trade glares.", json!({ "hpDelta": -5 }));

    let report = harness.act(PlayerAction::Talk).await.unwrap();

    assert_hp(&harness, 12, 12);
    assert!(report.diagnostics.iter().any(|d| d.field == "hpDelta"));
    assert_in_combat(&harness);
}

// =============================================================================
// Flee
// =============================================================================

#[tokio::test]
async fn test_flee_success_ends_combat() {
    // d20 15 + DEX 2 = 17 against a speed 30 goblin (DC 10).
    let mut harness =
        TestHarness::with_state(fighting(&["goblin"], 12)).with_rolls(ScriptedRolls::new([15]));
    harness.expect_narrative("You slip away into the trees.");

    let report = harness.act(PlayerAction::Flee).await.unwrap();

    assert_eq!(report.outcome, TurnOutcome::CombatEnded(CombatOutcome::Fled));
    assert!(report
        .combat_events
        .contains(&CombatEvent::FleeSucceeded { roll: 17, dc: 10 }));
    assert_not_in_combat(&harness);
    assert_hp(&harness, 12, 12);
}

#[tokio::test]
async fn test_failed_flee_from_wolf_can_kill() {
    // d20 2 + DEX 2 = 4 against a speed 40 wolf (DC 15); the free bite kills.
    let mut harness =
        TestHarness::with_state(fighting(&["wolf"], 1)).with_rolls(ScriptedRolls::new([2]));
    harness.expect_patch(
        "The wolf drags you down.",
        json!({ "xpDelta": 500, "achievement": "Survivor" }),
    );

    let report = harness.act(PlayerAction::Flee).await.unwrap();

    assert_eq!(report.outcome, TurnOutcome::PlayerDeath);
    assert!(report
        .combat_events
        .contains(&CombatEvent::FleeFailed { roll: 4, dc: 15 }));
    assert_eq!(harness.character().experience, 0);
    assert!(harness.state().achievements.is_empty());
    assert_not_in_combat(&harness);
    assert_eq!(
        harness.act(PlayerAction::Flee).await.unwrap_err(),
        TurnError::GameOver
    );
}

#[tokio::test]
async fn test_failed_flee_keeps_fighting() {
    let mut harness = TestHarness::with_state(fighting(&["goblin"], 12))
        .with_rolls(ScriptedRolls::new([3, 4]));
    harness.expect_narrative("You stumble on a root.");

    let report = harness.act(PlayerAction::Flee).await.unwrap();

    // d20 3 + 2 = 5 misses DC 10; the goblin hits for 1d6 = 4.
    assert_eq!(report.outcome, TurnOutcome::Continue);
    assert_hp(&harness, 8, 12);
    assert_in_combat(&harness);
}

#[tokio::test]
async fn test_failed_flee_skips_the_exchange() {
    // Only the free hit lands; the narrator's exchange flags are ignored.
    let mut harness = TestHarness::with_state(fighting(&["goblin"], 12))
        .with_rolls(ScriptedRolls::new([3, 4, 8, 6]));
    harness.expect_patch(
        "You trade blows as you try to break away.",
        json!({
            "playerAttackHitsEnemy": true,
            "enemyAttackHitsPlayer": true,
            "achievement": "Stubborn"
        }),
    );

    let report = harness.act(PlayerAction::Flee).await.unwrap();

    assert_eq!(
        report.combat_events,
        vec![
            CombatEvent::FleeFailed { roll: 5, dc: 10 },
            CombatEvent::EnemyHitPlayer {
                enemy: "Goblin".to_string(),
                damage: 4,
            },
        ]
    );
    assert_eq!(report.outcome, TurnOutcome::Continue);
    assert_hp(&harness, 8, 12);
    assert_in_combat(&harness);
    let combat = harness.state().combat.as_ref().unwrap();
    assert_eq!(combat.roster[0].hp, 7);
    assert_eq!(harness.character().experience, 0);
    assert!(harness.state().achievements.contains("Stubborn"));
}
