//! Testing utilities.
//!
//! - [`ScriptedRolls`] for deterministic dice
//! - [`MockNarrator`] for scripted narration without a model
//! - [`TestHarness`] for driving whole turns
//! - assertion helpers, plus the sample characters from [`crate::content`]

use crate::character::Character;
use crate::config::KernelConfig;
use crate::content::{Catalog, ContentTables};
use crate::dice::RollSource;
use crate::narrator::{
    Narration, NarrationRequest, Narrator, NarratorError, ScriptedNarrator, ScriptedReply,
};
use crate::session::{GameSession, PlayerAction, TurnError, TurnReport};
use crate::world::GameState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub use crate::content::{sample_fighter, sample_wizard};

// ============================================================================
// Dice
// ============================================================================

/// Dice that return a fixed sequence.
///
/// Each value is clamped to the die being rolled. Once the script runs out
/// every roll returns the fallback (1 unless changed).
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    values: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedRolls {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
            fallback: 1,
        }
    }

    pub fn with_fallback(mut self, value: u32) -> Self {
        self.fallback = value;
        self
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RollSource for ScriptedRolls {
    fn roll_die(&mut self, sides: u32) -> u32 {
        let value = self.values.pop_front().unwrap_or(self.fallback);
        value.clamp(1, sides.max(1))
    }
}

// ============================================================================
// Narrator
// ============================================================================

/// A narrator that replays scripted replies and remembers what it was asked.
#[derive(Debug, Default)]
pub struct MockNarrator {
    script: ScriptedNarrator,
    requests: Mutex<Vec<NarrationRequest>>,
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, reply: ScriptedReply) {
        self.script.push(reply);
    }

    /// Every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<NarrationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<Narration, NarratorError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.script.narrate(request).await
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Drives a [`GameSession`] with a mock narrator and the standard catalog.
pub struct TestHarness {
    pub session: GameSession,
    pub narrator: Arc<MockNarrator>,
}

impl TestHarness {
    /// A harness around a sample fighter.
    pub fn new() -> Self {
        Self::with_character(sample_fighter("Test Hero"))
    }

    pub fn with_character(character: Character) -> Self {
        Self::with_state(GameState::new(character, "Crossroads"))
    }

    pub fn with_state(state: GameState) -> Self {
        let narrator = Arc::new(MockNarrator::new());
        let tables: Arc<dyn ContentTables> = Arc::new(Catalog::standard());
        let session = GameSession::new(state, narrator.clone(), tables)
            .with_rolls(ScriptedRolls::new([]));
        Self { session, narrator }
    }

    pub fn with_rolls(mut self, rolls: impl RollSource + Send + 'static) -> Self {
        self.session = self.session.with_rolls(rolls);
        self
    }

    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.session = self.session.with_config(config);
        self
    }

    /// Queue narration with no patch.
    pub fn expect_narrative(&mut self, prose: impl Into<String>) -> &mut Self {
        self.narrator
            .queue(ScriptedReply::Reply(Narration::prose(prose)));
        self
    }

    /// Queue narration with a patch.
    pub fn expect_patch(&mut self, prose: impl Into<String>, patch: Value) -> &mut Self {
        self.narrator
            .queue(ScriptedReply::Reply(Narration::new(prose, patch)));
        self
    }

    pub fn expect_failure(&mut self, reason: impl Into<String>) -> &mut Self {
        self.narrator.queue(ScriptedReply::Fail(reason.into()));
        self
    }

    /// Queue a reply that arrives only after `delay`.
    pub fn expect_stall(&mut self, delay: Duration, prose: impl Into<String>) -> &mut Self {
        self.narrator
            .queue(ScriptedReply::Stall(delay, Narration::prose(prose)));
        self
    }

    pub async fn act(&mut self, action: PlayerAction) -> Result<TurnReport, TurnError> {
        self.session.take_turn(action).await
    }

    pub fn character(&self) -> &Character {
        self.session.character()
    }

    pub fn state(&self) -> &GameState {
        self.session.state()
    }

    /// Current HP as (current, max).
    pub fn player_hp(&self) -> (i32, i32) {
        let hp = self.character().health;
        (hp.current, hp.max)
    }

    pub fn in_combat(&self) -> bool {
        self.session.in_combat()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert player HP is at expected values.
#[track_caller]
pub fn assert_hp(harness: &TestHarness, current: i32, max: i32) {
    let (actual_current, actual_max) = harness.player_hp();
    assert_eq!(
        (actual_current, actual_max),
        (current, max),
        "Expected HP {current}/{max}, got {actual_current}/{actual_max}"
    );
}

#[track_caller]
pub fn assert_in_combat(harness: &TestHarness) {
    assert!(harness.in_combat(), "Expected to be in combat");
}

#[track_caller]
pub fn assert_not_in_combat(harness: &TestHarness) {
    assert!(!harness.in_combat(), "Expected to NOT be in combat");
}

/// Assert every resource of the player is within its bounds.
#[track_caller]
pub fn assert_resources_in_bounds(character: &Character) {
    for (name, resource) in [
        ("health", character.health),
        ("mana", character.mana),
        ("stamina", character.stamina),
    ] {
        assert!(
            0 <= resource.current && resource.current <= resource.max,
            "{name} out of bounds: {}/{}",
            resource.current,
            resource.max
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scripted_rolls_clamp_and_fall_back() {
        let mut rolls = ScriptedRolls::new([25, 3]);
        assert_eq!(rolls.roll_die(20), 20);
        assert_eq!(rolls.roll_die(6), 3);
        assert_eq!(rolls.roll_die(6), 1);

        let mut rolls = ScriptedRolls::new([]).with_fallback(4);
        assert_eq!(rolls.roll_die(8), 4);
        assert_eq!(rolls.remaining(), 0);
    }

    #[tokio::test]
    async fn test_harness_records_requests() {
        let mut harness = TestHarness::new();
        harness
            .expect_narrative("You stand in a dusty tavern.")
            .expect_patch("Time passes.", json!({ "timeDelta": 30 }));

        let first = harness.act(PlayerAction::Explore).await.unwrap();
        assert_eq!(first.narration, "You stand in a dusty tavern.");
        harness.act(PlayerAction::Talk).await.unwrap();

        let requests = harness.narrator.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].location, "Crossroads");
        assert_eq!(harness.state().clock.hour, 10);
        assert_eq!(harness.state().clock.minute, 30);
        assert_hp(&harness, 12, 12);
        assert_not_in_combat(&harness);
    }
}
