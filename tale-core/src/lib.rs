//! Character mechanics and combat resolution for an AI-narrated RPG.
//!
//! A narrator (a language model, behind the [`Narrator`] trait) describes
//! each turn in prose and returns a loose JSON patch of what happened. This
//! crate turns that patch into consistent game state:
//! - derived stats from equipment, feats and status effects
//! - status effect ticks and expiry
//! - encounter scaling and multi-enemy combat with companions
//! - flee checks, experience and level-ups
//! - a sanitizer that bounds every number the narrator sends
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tale_core::{Catalog, GameSession, GameState, PlayerAction, ScriptedNarrator};
//! use tale_core::content::sample_fighter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = GameState::new(sample_fighter("Thorin"), "The Rusty Dragon Inn");
//!     let mut session = GameSession::new(state, ScriptedNarrator::default(), Arc::new(Catalog::standard()));
//!
//!     let report = session.take_turn(PlayerAction::Explore).await?;
//!     println!("{}", report.narration);
//!
//!     session.save("my_game.json").await?;
//!     Ok(())
//! }
//! ```

pub mod character;
pub mod combat;
pub mod config;
pub mod content;
pub mod dice;
pub mod encounter;
pub mod items;
pub mod narrator;
pub mod patch;
pub mod persist;
pub mod progression;
pub mod sanitize;
pub mod session;
pub mod stats;
pub mod status;
pub mod testing;
pub mod world;

// Primary public API
pub use character::{Ability, AbilityScores, Character, CharacterClass, Companion, Resource};
pub use combat::{Combat, CombatEvent, CombatOutcome, CombatRules};
pub use config::KernelConfig;
pub use content::{Catalog, ContentTables};
pub use dice::{DiceExpression, RollSource};
pub use narrator::{Narration, NarrationRequest, Narrator, NarratorError, ScriptedNarrator};
pub use patch::{NarrativeIntentPatch, PatchDiagnostic};
pub use persist::{PersistError, SavedGame};
pub use session::{GameSession, IllegalAction, PlayerAction, TurnError, TurnOutcome, TurnReport};
pub use stats::{derive_stats, DerivedStats};
pub use status::{ActionKind, StatusEffect};
pub use world::GameState;
