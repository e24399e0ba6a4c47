//! World state owned by the turn orchestrator.
//!
//! [`GameState`] is the authoritative copy of everything a save file holds:
//! the character, any combat in progress, the clock, quests and the
//! bounded history.

use crate::character::Character;
use crate::combat::Combat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Time
// ============================================================================

const MINUTES_PER_HOUR: u32 = 60;
const HOURS_PER_DAY: u32 = 24;
const DAYS_PER_MONTH: u32 = 30;
const MONTHS_PER_YEAR: u32 = 12;

/// In-game calendar: twelve months of thirty days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl GameTime {
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
        }
    }

    /// Minutes since the start of year 0.
    fn to_minutes(self) -> i64 {
        let days = (self.year as i64 * MONTHS_PER_YEAR as i64 + (self.month as i64 - 1))
            * DAYS_PER_MONTH as i64
            + (self.day as i64 - 1);
        (days * HOURS_PER_DAY as i64 + self.hour as i64) * MINUTES_PER_HOUR as i64
            + self.minute as i64
    }

    fn from_minutes(total: i64) -> Self {
        let minute = total.rem_euclid(MINUTES_PER_HOUR as i64);
        let hours = total.div_euclid(MINUTES_PER_HOUR as i64);
        let hour = hours.rem_euclid(HOURS_PER_DAY as i64);
        let days = hours.div_euclid(HOURS_PER_DAY as i64);
        let day = days.rem_euclid(DAYS_PER_MONTH as i64);
        let months = days.div_euclid(DAYS_PER_MONTH as i64);
        let month = months.rem_euclid(MONTHS_PER_YEAR as i64);
        let year = months.div_euclid(MONTHS_PER_YEAR as i64);
        Self {
            year: year as i32,
            month: month as u8 + 1,
            day: day as u8 + 1,
            hour: hour as u8,
            minute: minute as u8,
        }
    }

    pub fn advanced_by(self, minutes: u32) -> Self {
        Self::from_minutes(self.to_minutes() + minutes as i64)
    }

    pub fn is_daytime(&self) -> bool {
        (6..18).contains(&self.hour)
    }

    pub fn time_of_day(&self) -> &'static str {
        match self.hour {
            5..=7 => "dawn",
            8..=11 => "morning",
            12..=13 => "midday",
            14..=17 => "afternoon",
            18..=20 => "evening",
            _ => "night",
        }
    }
}

impl Default for GameTime {
    fn default() -> Self {
        Self::new(1492, 3, 1, 10, 0)
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

// ============================================================================
// Quests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: QuestStatus,
    pub notes: Vec<String>,
}

impl Quest {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            status: QuestStatus::Active,
            notes: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == QuestStatus::Active
    }
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    PlayerAction,
    Narration,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub turn: u64,
    pub kind: HistoryKind,
    pub text: String,
    pub time: GameTime,
}

// ============================================================================
// Game State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub character: Character,
    /// Present only while a fight is active.
    pub combat: Option<Combat>,
    pub clock: GameTime,
    pub location: String,
    pub quests: Vec<Quest>,
    pub achievements: BTreeSet<String>,
    pub facts: Vec<String>,
    pub history: Vec<HistoryEntry>,
    pub turn: u64,
}

impl GameState {
    pub fn new(character: Character, location: impl Into<String>) -> Self {
        Self {
            character,
            combat: None,
            clock: GameTime::default(),
            location: location.into(),
            quests: Vec::new(),
            achievements: BTreeSet::new(),
            facts: Vec::new(),
            history: Vec::new(),
            turn: 0,
        }
    }

    pub fn in_combat(&self) -> bool {
        self.combat.as_ref().is_some_and(Combat::is_active)
    }

    /// The game ends when the character dies.
    pub fn is_over(&self) -> bool {
        !self.character.is_alive()
    }

    /// Append to the history, dropping the oldest entries past `limit`.
    pub fn record(&mut self, kind: HistoryKind, text: impl Into<String>, limit: usize) {
        self.history.push(HistoryEntry {
            turn: self.turn,
            kind,
            text: text.into(),
            time: self.clock,
        });
        truncate_history(&mut self.history, limit);
    }

    pub fn recent_history(&self, count: usize) -> impl Iterator<Item = &HistoryEntry> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip)
    }

    pub fn advance_clock(&mut self, minutes: u32) {
        self.clock = self.clock.advanced_by(minutes);
    }

    pub fn quest(&self, id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    /// Returns false if a quest with the same id already exists.
    pub fn add_quest(&mut self, quest: Quest) -> bool {
        if self.quest(&quest.id).is_some() {
            return false;
        }
        self.quests.push(quest);
        true
    }

    /// Returns false if the quest is unknown or already complete.
    pub fn complete_quest(&mut self, id: &str) -> bool {
        match self.quests.iter_mut().find(|q| q.id == id && q.is_active()) {
            Some(quest) => {
                quest.status = QuestStatus::Completed;
                true
            }
            None => false,
        }
    }

    pub fn update_quest(&mut self, id: &str, note: impl Into<String>) -> bool {
        match self.quests.iter_mut().find(|q| q.id == id) {
            Some(quest) => {
                quest.notes.push(note.into());
                true
            }
            None => false,
        }
    }

    /// Returns false if the achievement was already unlocked.
    pub fn unlock_achievement(&mut self, id: impl Into<String>) -> bool {
        self.achievements.insert(id.into())
    }

    /// Returns false for a fact already recorded.
    pub fn add_fact(&mut self, fact: impl Into<String>) -> bool {
        let fact = fact.into();
        if self.facts.contains(&fact) {
            return false;
        }
        self.facts.push(fact);
        true
    }
}

/// Keep only the most recent `limit` entries.
pub fn truncate_history(history: &mut Vec<HistoryEntry>, limit: usize) {
    if history.len() > limit {
        history.drain(..history.len() - limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterClass;

    fn state() -> GameState {
        GameState::new(Character::new("Mira", CharacterClass::Rogue), "Crossroads")
    }

    #[test]
    fn test_clock_rolls_over() {
        let clock = GameTime::new(1492, 12, 30, 23, 50).advanced_by(15);
        assert_eq!(clock, GameTime::new(1493, 1, 1, 0, 5));

        let clock = GameTime::default().advanced_by(60 * 24 * 31);
        assert_eq!(clock, GameTime::new(1492, 4, 2, 10, 0));
    }

    #[test]
    fn test_time_of_day() {
        assert_eq!(GameTime::new(1, 1, 1, 6, 0).time_of_day(), "dawn");
        assert!(GameTime::new(1, 1, 1, 12, 0).is_daytime());
        assert!(!GameTime::new(1, 1, 1, 22, 0).is_daytime());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = state();
        for i in 0..60 {
            state.turn = i;
            state.record(HistoryKind::PlayerAction, format!("action {i}"), 50);
        }
        assert_eq!(state.history.len(), 50);
        assert_eq!(state.history[0].text, "action 10");
        let recent: Vec<_> = state.recent_history(2).map(|e| e.text.as_str()).collect();
        assert_eq!(recent, ["action 58", "action 59"]);
    }

    #[test]
    fn test_quest_lifecycle() {
        let mut state = state();
        assert!(state.add_quest(Quest::new("rats", "Rat Problem", "Clear the cellar")));
        assert!(!state.add_quest(Quest::new("rats", "Again", "")));
        assert!(state.update_quest("rats", "Found a tunnel"));
        assert!(state.complete_quest("rats"));
        assert!(!state.complete_quest("rats"));
        assert!(!state.complete_quest("dragons"));
        assert_eq!(state.quest("rats").unwrap().notes, ["Found a tunnel"]);
    }

    #[test]
    fn test_facts_and_achievements_dedupe() {
        let mut state = state();
        assert!(state.add_fact("The mill is haunted"));
        assert!(!state.add_fact("The mill is haunted"));
        assert!(state.unlock_achievement("first_blood"));
        assert!(!state.unlock_achievement("first_blood"));
    }
}
