//! GameSession - the turn orchestrator.
//!
//! A session owns the authoritative [`GameState`] and resolves one
//! [`PlayerAction`] at a time:
//!
//! 1. validate the action (illegal actions change nothing),
//! 2. settle everything that does not depend on the narrator (mana costs,
//!    item use, equipment changes, flee rolls),
//! 3. await the narrator, bounded by the configured timeout,
//! 4. parse and sanitize the patch, then tick status effects, run the combat
//!    exchange or direct edits, apply world changes and level-ups.
//!
//! If the narrator fails, step 4 skips the patch and a fallback narration is
//! reported; everything from step 2 stands.

use crate::character::{Character, ResourceKind};
use crate::combat::{attempt_flee, resolve_exchange, Combat, CombatEvent, CombatOutcome, ExchangeIntent};
use crate::config::KernelConfig;
use crate::content::{normalize_id, ContentTables, SpellDefinition};
use crate::dice::RollSource;
use crate::encounter::{expand_encounter, scale_enemy};
use crate::items::{EquipError, EquipSlot, Equipped, ItemEffect, ItemKind};
use crate::narrator::{NarrationRequest, Narrator, NarratorError};
use crate::patch::{DiagnosticKind, NarrativeIntentPatch, PatchDiagnostic};
use crate::persist::{PersistError, SavedGame};
use crate::progression::{apply_experience, LevelUp};
use crate::sanitize::{sanitize, CombatStart, SanitizeContext, TurnCommands};
use crate::stats::{derive_stats, DamageFormula, DerivedStats};
use crate::status::{self, ActionKind, ApplyOutcome};
use crate::world::{GameState, HistoryKind, Quest};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// History lines handed to the narrator.
const NARRATOR_HISTORY: usize = 10;

// ============================================================================
// Actions and errors
// ============================================================================

/// What the player chose to do this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    Attack,
    CastSpell { spell_id: String },
    UseItem { item_id: String },
    Equip {
        item_id: String,
        /// Defaults to the item's natural slot.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<EquipSlot>,
    },
    Unequip { slot: EquipSlot },
    Flee,
    Travel { destination: String },
    Talk,
    Explore,
    Other { text: String },
}

impl PlayerAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PlayerAction::Attack => ActionKind::Attack,
            PlayerAction::CastSpell { .. } => ActionKind::CastSpell,
            PlayerAction::UseItem { .. } => ActionKind::UseItem,
            PlayerAction::Equip { .. } | PlayerAction::Unequip { .. } => ActionKind::Equip,
            PlayerAction::Flee => ActionKind::Flee,
            PlayerAction::Travel { .. } => ActionKind::Travel,
            PlayerAction::Talk => ActionKind::Talk,
            PlayerAction::Explore => ActionKind::Explore,
            PlayerAction::Other { .. } => ActionKind::Other,
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerAction::Attack => write!(f, "Attack"),
            PlayerAction::CastSpell { spell_id } => write!(f, "Cast {spell_id}"),
            PlayerAction::UseItem { item_id } => write!(f, "Use {item_id}"),
            PlayerAction::Equip {
                item_id,
                slot: Some(slot),
            } => write!(f, "Equip {item_id} ({slot})"),
            PlayerAction::Equip { item_id, .. } => write!(f, "Equip {item_id}"),
            PlayerAction::Unequip { slot } => write!(f, "Unequip {slot}"),
            PlayerAction::Flee => write!(f, "Flee"),
            PlayerAction::Travel { destination } => write!(f, "Travel to {destination}"),
            PlayerAction::Talk => write!(f, "Talk"),
            PlayerAction::Explore => write!(f, "Explore"),
            PlayerAction::Other { text } => write!(f, "{text}"),
        }
    }
}

/// An action the current state does not allow. The message is the toast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalAction {
    #[error("There is nothing to flee from.")]
    NothingToFlee,

    #[error("You don't know the spell {0}.")]
    UnknownSpell(String),

    #[error("Not enough mana for {spell}: need {cost}, have {available}.")]
    InsufficientMana {
        spell: String,
        cost: i32,
        available: i32,
    },

    #[error("You don't have {0}.")]
    MissingItem(String),

    #[error("{0} can't be used.")]
    NotUsable(String),

    #[error("{0}")]
    CannotEquip(#[from] EquipError),

    #[error("Nothing is equipped in the {0} slot.")]
    SlotEmpty(EquipSlot),

    #[error("You can't {action} while {effect}.")]
    Disabled { action: ActionKind, effect: String },
}

/// Errors from [`GameSession::take_turn`]. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error(transparent)]
    Illegal(#[from] IllegalAction),

    #[error("Your adventure has ended.")]
    GameOver,
}

impl TurnError {
    /// Short message for the player.
    pub fn toast(&self) -> String {
        self.to_string()
    }
}

// ============================================================================
// Reports
// ============================================================================

/// How the turn left things.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Continue,
    CombatStarted,
    CombatEnded(CombatOutcome),
    PlayerDeath,
}

/// Everything that happened in one turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub turn: u64,
    pub narration: String,
    /// The narrator failed or timed out; only pre-narration effects applied.
    pub narration_failed: bool,
    pub narrator_error: Option<NarratorError>,
    pub messages: Vec<String>,
    pub combat_events: Vec<CombatEvent>,
    pub diagnostics: Vec<PatchDiagnostic>,
    pub level_ups: Vec<LevelUp>,
    /// Derived stats after the turn, for display.
    pub stats: DerivedStats,
    pub outcome: TurnOutcome,
}

/// Accumulates results while a turn is resolved.
#[derive(Default)]
struct TurnLog {
    messages: Vec<String>,
    combat_events: Vec<CombatEvent>,
    diagnostics: Vec<PatchDiagnostic>,
    narrator_error: Option<NarratorError>,
    combat_started: bool,
    combat_ended: Option<CombatOutcome>,
    /// The flee roll already settled this turn's exchange.
    fled_this_turn: bool,
}

impl TurnLog {
    fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn resolved_lines(&self) -> Vec<String> {
        self.messages
            .iter()
            .cloned()
            .chain(self.combat_events.iter().map(ToString::to_string))
            .collect()
    }
}

/// A validated action, with the lookups it needs.
enum Prepared {
    Plain,
    Spell(SpellDefinition),
    Consume { index: usize, effect: ItemEffect },
    Equip { index: usize, equipped: Equipped },
    Unequip(EquipSlot),
    Flee,
}

// ============================================================================
// Session
// ============================================================================

/// A running game.
pub struct GameSession {
    state: GameState,
    narrator: Box<dyn Narrator>,
    tables: Arc<dyn ContentTables>,
    config: KernelConfig,
    rolls: Box<dyn RollSource + Send>,
}

impl GameSession {
    pub fn new(
        state: GameState,
        narrator: impl Narrator + 'static,
        tables: Arc<dyn ContentTables>,
    ) -> Self {
        Self {
            state,
            narrator: Box::new(narrator),
            tables,
            config: KernelConfig::default(),
            rolls: Box::new(StdRng::from_entropy()),
        }
    }

    /// Resume from a save.
    pub fn resume(
        saved: SavedGame,
        narrator: impl Narrator + 'static,
        tables: Arc<dyn ContentTables>,
    ) -> Self {
        Self::new(saved.state, narrator, tables)
    }

    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the dice, e.g. with a seeded or scripted source.
    pub fn with_rolls(mut self, rolls: impl RollSource + Send + 'static) -> Self {
        self.rolls = Box::new(rolls);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn character(&self) -> &Character {
        &self.state.character
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn stats(&self) -> DerivedStats {
        derive_stats(&self.state.character)
    }

    pub fn in_combat(&self) -> bool {
        self.state.in_combat()
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn snapshot(&self) -> SavedGame {
        SavedGame::new(self.state.clone(), self.config.history_limit)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        self.snapshot().save(path).await
    }

    /// Resolve one player action.
    pub async fn take_turn(&mut self, action: PlayerAction) -> Result<TurnReport, TurnError> {
        if self.state.is_over() {
            return Err(TurnError::GameOver);
        }
        let prepared = self.validate(&action).map_err(|err| {
            debug!(action = %action, error = %err, "illegal action rejected");
            err
        })?;

        self.state.turn += 1;
        let turn = self.state.turn;
        let kind = action.kind();
        let history_limit = self.config.history_limit;
        self.state
            .record(HistoryKind::PlayerAction, action.to_string(), history_limit);
        let mut log = TurnLog::default();

        // Settled before the narrator is asked; kept whatever it says.
        let character = self.state.character.clone();
        let (mut character, spell_damage) = self.pre_narration(character, prepared, &mut log);

        let request = self.narration_request(&action, &character, &log);
        let limit = self.config.narrator_timeout();
        let narration = match timeout(limit, self.narrator.narrate(&request)).await {
            Ok(Ok(narration)) => Some(narration),
            Ok(Err(err)) => {
                warn!(turn, error = %err, "narrator failed, using fallback narration");
                log.narrator_error = Some(err);
                None
            }
            Err(_) => {
                warn!(turn, timeout_ms = self.config.narrator_timeout_ms, "narrator timed out, using fallback narration");
                log.narrator_error = Some(NarratorError::Timeout(limit));
                None
            }
        };
        let narration_failed = narration.is_none();
        let prose = narration
            .as_ref()
            .map(|n| n.prose.clone())
            .unwrap_or_else(|| self.config.fallback_narration.clone());

        let commands = match &narration {
            Some(narration) if character.is_alive() => {
                let (patch, mut diagnostics) = NarrativeIntentPatch::from_value(&narration.patch);
                let context = SanitizeContext {
                    action: kind,
                    narration: &narration.prose,
                    tables: self.tables.as_ref(),
                    config: &self.config,
                };
                let (commands, rejected) = sanitize(&patch, &context);
                diagnostics.extend(rejected);
                for diagnostic in &diagnostics {
                    debug!(turn, %diagnostic, "patch diagnostic");
                }
                log.diagnostics = diagnostics;
                Some(commands)
            }
            _ => None,
        };

        if character.is_alive() {
            let (ticked, report) = status::tick(character);
            character = ticked;
            log.messages.extend(report.messages);
        }

        if let Some(commands) = commands {
            if character.is_alive() {
                character = self.apply_commands(character, commands, spell_damage, &mut log);
            }
        }

        if !character.is_alive() {
            self.state.combat = None;
            info!(turn, "player has died");
        }

        let level_ups = if character.is_alive() {
            let (leveled, level_ups) = apply_experience(character, &mut *self.rolls);
            character = leveled;
            level_ups
        } else {
            Vec::new()
        };
        for level_up in &level_ups {
            log.say(format!(
                "You reached level {}! (+{} max HP)",
                level_up.new_level, level_up.hp_gained
            ));
        }

        let character = character.normalized_with_cap(self.config.max_active_companions);
        let stats = derive_stats(&character);
        self.state.character = character;

        let outcome = if !self.state.character.is_alive() {
            TurnOutcome::PlayerDeath
        } else if let Some(ended) = log.combat_ended {
            TurnOutcome::CombatEnded(ended)
        } else if log.combat_started {
            TurnOutcome::CombatStarted
        } else {
            TurnOutcome::Continue
        };

        self.state
            .record(HistoryKind::Narration, prose.clone(), history_limit);
        for message in &log.messages {
            self.state
                .record(HistoryKind::System, message.clone(), history_limit);
        }

        Ok(TurnReport {
            turn,
            narration: prose,
            narration_failed,
            narrator_error: log.narrator_error,
            messages: log.messages,
            combat_events: log.combat_events,
            diagnostics: log.diagnostics,
            level_ups,
            stats,
            outcome,
        })
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    fn validate(&self, action: &PlayerAction) -> Result<Prepared, IllegalAction> {
        let character = &self.state.character;
        let kind = action.kind();
        if let Some(effect) = status::disabling_effect(character, kind) {
            return Err(IllegalAction::Disabled {
                action: kind,
                effect: effect.name.clone(),
            });
        }

        match action {
            PlayerAction::CastSpell { spell_id } => {
                let id = normalize_id(spell_id);
                let known = character.known_spells.iter().any(|s| normalize_id(s) == id);
                let spell = self
                    .tables
                    .spell(&id)
                    .filter(|_| known)
                    .ok_or_else(|| IllegalAction::UnknownSpell(spell_id.clone()))?;
                if character.mana.current < spell.mana_cost {
                    return Err(IllegalAction::InsufficientMana {
                        spell: spell.name,
                        cost: spell.mana_cost,
                        available: character.mana.current,
                    });
                }
                Ok(Prepared::Spell(spell))
            }
            PlayerAction::UseItem { item_id } => {
                let index = inventory_index(character, item_id)
                    .ok_or_else(|| IllegalAction::MissingItem(item_id.clone()))?;
                let item = &character.inventory[index];
                match &item.kind {
                    ItemKind::Consumable { effect } => Ok(Prepared::Consume {
                        index,
                        effect: effect.clone(),
                    }),
                    _ => Err(IllegalAction::NotUsable(item.name.clone())),
                }
            }
            PlayerAction::Equip { item_id, slot } => {
                let index = inventory_index(character, item_id)
                    .ok_or_else(|| IllegalAction::MissingItem(item_id.clone()))?;
                let item = character.inventory[index].clone();
                let equipped = character.equipment.clone().equip(item, *slot)?;
                Ok(Prepared::Equip { index, equipped })
            }
            PlayerAction::Unequip { slot } => match character.equipment.get(*slot) {
                Some(_) => Ok(Prepared::Unequip(*slot)),
                None => Err(IllegalAction::SlotEmpty(*slot)),
            },
            PlayerAction::Flee => {
                let has_target = self
                    .state
                    .combat
                    .as_ref()
                    .filter(|c| c.is_active())
                    .and_then(Combat::current_target)
                    .is_some();
                if has_target {
                    Ok(Prepared::Flee)
                } else {
                    Err(IllegalAction::NothingToFlee)
                }
            }
            PlayerAction::Attack
            | PlayerAction::Travel { .. }
            | PlayerAction::Talk
            | PlayerAction::Explore
            | PlayerAction::Other { .. } => Ok(Prepared::Plain),
        }
    }

    // ------------------------------------------------------------------------
    // Pre-narration phase
    // ------------------------------------------------------------------------

    /// Returns the character and, for an attack spell, the damage that
    /// replaces the weapon formula this turn.
    fn pre_narration(
        &mut self,
        mut character: Character,
        prepared: Prepared,
        log: &mut TurnLog,
    ) -> (Character, Option<DamageFormula>) {
        match prepared {
            Prepared::Plain => (character, None),
            Prepared::Spell(spell) => {
                character = character.adjust_resource(ResourceKind::Mana, -spell.mana_cost);
                log.say(format!("You cast {}.", spell.name));
                if let Some(healing) = &spell.healing {
                    let healed = healing.roll(&mut *self.rolls).total.max(0);
                    character = character.adjust_resource(ResourceKind::Health, healed);
                    log.say(format!("{} restores {healed} HP.", spell.name));
                }
                if let Some(effect_id) = &spell.applies {
                    character = self.apply_effect_by_id(character, effect_id, log);
                }
                let damage = spell
                    .damage
                    .as_ref()
                    .map(|dice| derive_stats(&character).spell_damage(dice, spell.damage_type));
                (character, damage)
            }
            Prepared::Consume { index, effect } => {
                let item = character.inventory.remove(index);
                log.say(format!("You use {}.", item.name));
                character = match effect {
                    ItemEffect::Heal { dice } => {
                        let healed = dice.roll(&mut *self.rolls).total.max(0);
                        log.say(format!("You recover {healed} HP."));
                        character.adjust_resource(ResourceKind::Health, healed)
                    }
                    ItemEffect::RestoreMana { amount } => {
                        log.say(format!("You recover {amount} mana."));
                        character.adjust_resource(ResourceKind::Mana, amount)
                    }
                    ItemEffect::RestoreStamina { amount } => {
                        log.say(format!("You recover {amount} stamina."));
                        character.adjust_resource(ResourceKind::Stamina, amount)
                    }
                    ItemEffect::ApplyStatus { effect_id } => {
                        self.apply_effect_by_id(character, &effect_id, log)
                    }
                };
                (character, None)
            }
            Prepared::Equip { index, equipped } => {
                let item = character.inventory.remove(index);
                log.say(format!("You equip {}.", item.name));
                character.equipment = equipped.equipment;
                for displaced in equipped.displaced {
                    log.say(format!("{} goes back in your pack.", displaced.name));
                    character.inventory.push(displaced);
                }
                (character, None)
            }
            Prepared::Unequip(slot) => {
                let (equipment, removed) = character.equipment.unequip(slot);
                character.equipment = equipment;
                if let Some(item) = removed {
                    log.say(format!("You unequip {}.", item.name));
                    character.inventory.push(item);
                }
                (character, None)
            }
            Prepared::Flee => {
                let Some(combat) = self.state.combat.take() else {
                    return (character, None);
                };
                let result = attempt_flee(character, combat, &mut *self.rolls);
                log.fled_this_turn = true;
                log.combat_events.extend(result.events);
                match result.combat.outcome() {
                    Some(outcome) => log.combat_ended = Some(outcome),
                    None => self.state.combat = Some(result.combat),
                }
                (result.character, None)
            }
        }
    }

    fn apply_effect_by_id(
        &self,
        character: Character,
        effect_id: &str,
        log: &mut TurnLog,
    ) -> Character {
        match self.tables.status_effect(effect_id) {
            Some(effect) => self.apply_effect(character, effect, log),
            None => {
                warn!(effect = effect_id, "unknown status effect, skipping");
                character
            }
        }
    }

    fn apply_effect(
        &self,
        character: Character,
        effect: status::StatusEffect,
        log: &mut TurnLog,
    ) -> Character {
        let name = effect.name.clone();
        let (character, outcome) = status::apply(character, effect);
        if outcome == ApplyOutcome::Applied {
            log.say(format!("You are now affected by {name}."));
        }
        character
    }

    fn narration_request(
        &self,
        action: &PlayerAction,
        character: &Character,
        log: &TurnLog,
    ) -> NarrationRequest {
        let enemies = self
            .state
            .combat
            .iter()
            .flat_map(|c| c.alive())
            .map(|e| e.name.clone())
            .collect();
        NarrationRequest {
            turn: self.state.turn,
            action: action.kind(),
            description: action.to_string(),
            character_name: character.name.clone(),
            hp: (character.health.current, character.health.max),
            location: self.state.location.clone(),
            in_combat: self.state.in_combat(),
            enemies,
            resolved: log.resolved_lines(),
            recent_history: self
                .state
                .recent_history(NARRATOR_HISTORY)
                .map(|e| e.text.clone())
                .collect(),
        }
    }

    // ------------------------------------------------------------------------
    // Narration-dependent phase
    // ------------------------------------------------------------------------

    fn apply_commands(
        &mut self,
        mut character: Character,
        mut commands: TurnCommands,
        spell_damage: Option<DamageFormula>,
        log: &mut TurnLog,
    ) -> Character {
        let mut started_now = false;
        if let Some(start) = commands.start_combat.take() {
            if self.state.in_combat() {
                log.diagnostics.push(PatchDiagnostic::new(
                    "startCombat",
                    DiagnosticKind::Rejected,
                    "combat already in progress",
                ));
            } else {
                let roster = match start {
                    CombatStart::Single(template) => {
                        vec![scale_enemy(&template, character.level, 1)]
                    }
                    CombatStart::Encounter(definition) => {
                        expand_encounter(&definition, self.tables.as_ref(), character.level)
                    }
                };
                if roster.is_empty() {
                    warn!("encounter has no known enemies, combat not started");
                } else {
                    let names: Vec<&str> = roster.iter().map(|e| e.name.as_str()).collect();
                    info!(enemies = roster.len(), "combat started");
                    log.say(format!("Combat begins: {}.", names.join(", ")));
                    self.state.combat = Some(Combat::new(roster));
                    log.combat_started = true;
                    started_now = true;
                }
            }
        }

        let fighting = self.state.in_combat();
        if let Some(combat) = self.state.combat.take() {
            // A fresh fight only trades blows if the narrator says someone landed one.
            if log.fled_this_turn
                || (started_now && !commands.player_hits && !commands.enemy_hits)
            {
                self.state.combat = Some(combat);
            } else {
                let intent = ExchangeIntent {
                    player_hits: commands.player_hits,
                    enemy_hits: commands.enemy_hits,
                    end_combat: commands.end_combat,
                    player_damage: spell_damage,
                };
                let result = resolve_exchange(
                    character,
                    combat,
                    &intent,
                    &self.config.combat,
                    self.tables.as_ref(),
                    &mut *self.rolls,
                );
                character = result.character;
                log.combat_events.extend(result.events);
                match result.outcome {
                    Some(outcome) => log.combat_ended = Some(outcome),
                    None => self.state.combat = Some(result.combat),
                }
                if !character.is_alive() {
                    return character;
                }
            }
        }

        if let Some(delta) = commands.hp_delta {
            if fighting {
                log.diagnostics.push(PatchDiagnostic::new(
                    "hpDelta",
                    DiagnosticKind::Rejected,
                    "damage during combat comes from the exchange",
                ));
            } else {
                character = character.adjust_resource(ResourceKind::Health, delta);
                if delta < 0 {
                    log.say(format!("You take {} damage.", -delta));
                } else {
                    log.say(format!("You recover {delta} HP."));
                }
            }
        }

        self.apply_world_edits(character, commands, log)
    }

    fn apply_world_edits(
        &mut self,
        mut character: Character,
        edits: TurnCommands,
        log: &mut TurnLog,
    ) -> Character {
        if let Some(id) = edits.remove_status {
            let (updated, removed) = status::remove(character, &id);
            character = updated;
            if removed {
                log.say(format!("{id} is removed."));
            }
        }
        if let Some(effect) = edits.add_status {
            character = self.apply_effect(character, effect, log);
        }

        if let Some(xp) = edits.xp_gain {
            character.experience = character.experience.saturating_add(xp);
            log.say(format!("+{xp} XP"));
        }
        if let Some(delta) = edits.currency_delta {
            character = character.adjust_currency(delta);
            log.say(format!("Currency {delta:+}"));
        }
        if let Some(minutes) = edits.minutes {
            self.state.advance_clock(minutes);
        }

        if let Some(achievement) = edits.achievement {
            if self.state.unlock_achievement(achievement.clone()) {
                log.say(format!("Achievement unlocked: {achievement}"));
            }
        }
        if let Some(quest) = edits.add_quest {
            let title = quest.title.clone();
            if self
                .state
                .add_quest(Quest::new(quest.id, quest.title, quest.description))
            {
                log.say(format!("New quest: {title}"));
            }
        }
        if let Some(update) = edits.update_quest {
            if !self.state.update_quest(&update.id, update.note) {
                warn!(quest = %update.id, "update for unknown quest, skipping");
            }
        }
        if let Some(id) = edits.complete_quest {
            if self.state.complete_quest(&id) {
                log.say(format!("Quest complete: {id}"));
            } else {
                warn!(quest = %id, "completion for unknown or finished quest, skipping");
            }
        }

        if let Some(mut companion) = edits.recruit {
            if character.companions.iter().any(|c| c.id == companion.id) {
                debug!(companion = %companion.id, "companion already recruited");
            } else {
                if companion.active
                    && character.active_companion_count() >= self.config.max_active_companions
                {
                    companion = companion.inactive();
                    log.say(format!("{} joins you, waiting in reserve.", companion.name));
                } else {
                    log.say(format!("{} joins you.", companion.name));
                }
                character.companions.push(companion);
            }
        }

        if let Some(fact) = edits.fact {
            self.state.add_fact(fact);
        }
        if let Some(place) = edits.travel_to {
            info!(from = %self.state.location, to = %place, "location changed");
            log.say(format!("You arrive at {place}."));
            self.state.location = place;
        }

        character
    }
}

fn inventory_index(character: &Character, item_id: &str) -> Option<usize> {
    let id = normalize_id(item_id);
    character
        .inventory
        .iter()
        .position(|item| normalize_id(&item.id) == id)
}
