//! Replay of a scripted game.
//!
//! A script is a JSON list of turns. Each turn names the player action and
//! what the narrator says back:
//!
//! ```json
//! [
//!   { "action": "explore", "narration": "Goblins!", "patch": { "startEncounter": "goblin_ambush" } },
//!   { "action": "attack", "narration": "You swing.", "patch": { "playerAttackHitsEnemy": true } },
//!   { "action": "flee", "fail": "model overloaded" }
//! ]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tale_core::narrator::ScriptedReply;
use tale_core::{GameSession, Narration, PlayerAction, TurnReport};
use tracing::{info, warn};

/// One scripted turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptTurn {
    #[serde(flatten)]
    pub action: PlayerAction,
    #[serde(default)]
    pub narration: String,
    #[serde(default)]
    pub patch: Value,
    /// Make the narrator fail this turn with the given reason.
    #[serde(default)]
    pub fail: Option<String>,
}

impl ScriptTurn {
    pub fn reply(&self) -> ScriptedReply {
        match &self.fail {
            Some(reason) => ScriptedReply::Fail(reason.clone()),
            None => ScriptedReply::Reply(Narration::new(self.narration.clone(), self.patch.clone())),
        }
    }
}

pub async fn load_script(path: &Path) -> Result<Vec<ScriptTurn>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing script {}", path.display()))
}

/// Play every scripted action. Illegal actions are reported and skipped;
/// the replay stops at the first death.
pub async fn run(session: &mut GameSession, turns: &[ScriptTurn]) -> Result<()> {
    print_status(session);
    println!();

    for step in turns {
        println!("> {}", step.action);
        match session.take_turn(step.action.clone()).await {
            Ok(report) => print_report(&report),
            Err(err) => {
                warn!(action = %step.action, error = %err, "action rejected");
                println!("[REJECTED] {}", err.toast());
            }
        }
        println!();

        if session.is_over() {
            info!(turn = session.state().turn, "replay ended with player death");
            break;
        }
    }

    print_status(session);
    Ok(())
}

fn print_report(report: &TurnReport) {
    println!("{}", report.narration);
    if report.narration_failed {
        println!("[NARRATOR FAILED]");
    }
    for event in &report.combat_events {
        println!("[COMBAT] {event}");
    }
    for message in &report.messages {
        println!("[INFO] {message}");
    }
    for diagnostic in &report.diagnostics {
        println!("[PATCH] {diagnostic}");
    }
    println!("[OUTCOME] {:?}", report.outcome);
}

fn print_status(session: &GameSession) {
    let state = session.state();
    let character = &state.character;
    let stats = session.stats();
    println!("[STATUS]");
    println!(
        "  Character: {} (level {} {})",
        character.name, character.level, character.class
    );
    println!("  Location: {} ({})", state.location, state.clock);
    println!(
        "  HP: {}  Mana: {}  AC: {}",
        character.health, character.mana, stats.armor_class
    );
    println!("  XP: {}  Currency: {}", character.experience, character.currency);
    if !character.status_effects.is_empty() {
        let names: Vec<&str> = character.status_effects.iter().map(|e| e.name.as_str()).collect();
        println!("  Conditions: {}", names.join(", "));
    }
    if let Some(combat) = state.combat.as_ref() {
        let enemies: Vec<String> = combat
            .alive()
            .map(|e| format!("{} ({}/{})", e.instance_id, e.hp, e.max_hp))
            .collect();
        println!("  Fighting: {}", enemies.join(", "));
    }
}
