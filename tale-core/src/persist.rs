//! Save and load of the game state.
//!
//! Saves are pretty-printed JSON. History is cut to the most recent entries
//! before writing, so a save never grows with play time.

use crate::config::HISTORY_LIMIT;
use crate::world::{truncate_history, GameState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save file version.
pub const SAVE_VERSION: u32 = 1;

/// A saved game with everything needed to resume play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub version: u32,

    /// Seconds since the Unix epoch.
    pub saved_at: String,

    pub state: GameState,
}

impl SavedGame {
    /// Snapshot `state`, keeping at most `history_limit` history entries.
    pub fn new(mut state: GameState, history_limit: usize) -> Self {
        truncate_history(&mut state.history, history_limit);
        Self {
            version: SAVE_VERSION,
            saved_at: timestamp_now(),
            state,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let mut saved: Self = serde_json::from_str(json)?;
        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }
        // Hand-edited saves can carry more history than we ever write.
        truncate_history(&mut saved.state.history, HISTORY_LIMIT);
        saved.state.character = saved.state.character.normalized();
        Ok(saved)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        fs::write(path, self.to_json()?).await?;
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json(&content)
    }
}

/// Auto-save file name for a character.
pub fn auto_save_path(base_dir: impl AsRef<Path>, character_name: &str) -> PathBuf {
    let sanitized = character_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    base_dir.as_ref().join(format!("{sanitized}_autosave.json"))
}

fn timestamp_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Character, CharacterClass};
    use crate::world::HistoryKind;

    fn state_with_history(entries: usize) -> GameState {
        let mut state = GameState::new(
            Character::new("Oda", CharacterClass::Fighter).with_currency(1_234),
            "Greywater",
        );
        for i in 0..entries {
            state.history.push(crate::world::HistoryEntry {
                turn: i as u64,
                kind: HistoryKind::Narration,
                text: format!("entry {i}"),
                time: state.clock,
            });
        }
        state
    }

    #[test]
    fn test_history_truncated_on_save() {
        let saved = SavedGame::new(state_with_history(80), 50);
        assert_eq!(saved.state.history.len(), 50);
        assert_eq!(saved.state.history[0].text, "entry 30");
    }

    #[test]
    fn test_version_mismatch() {
        let mut saved = SavedGame::new(state_with_history(0), 50);
        saved.version = 99;
        let json = serde_json::to_string(&saved).unwrap();
        match SavedGame::from_json(&json) {
            Err(PersistError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("expected version mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_auto_save_path() {
        let path = auto_save_path("/saves", "Oda the Bold");
        assert_eq!(path, PathBuf::from("/saves/Oda_the_Bold_autosave.json"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("tale-persist-{}", std::process::id()));
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("save.json");

        let saved = SavedGame::new(state_with_history(3), 50);
        saved.save(&path).await.unwrap();
        let loaded = SavedGame::load(&path).await.unwrap();

        assert_eq!(loaded.state, saved.state);
        assert_eq!(loaded.state.character.currency, 1_234);
        fs::remove_dir_all(&dir).await.unwrap();
    }
}
