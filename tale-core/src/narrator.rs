//! The boundary to the language model that narrates each turn.
//!
//! The kernel never builds prompts or talks to the network. It hands a
//! [`NarrationRequest`] to a [`Narrator`] and gets back prose plus a raw
//! JSON patch, which is parsed and sanitized before anything is applied.

use crate::status::ActionKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Errors from a narrator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarratorError {
    #[error("Narrator failed: {0}")]
    Failed(String),

    #[error("Narrator timed out after {0:?}")]
    Timeout(Duration),
}

/// What the narrator is told about the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub turn: u64,
    pub action: ActionKind,
    /// The player's action in words.
    pub description: String,
    pub character_name: String,
    pub hp: (i32, i32),
    pub location: String,
    pub in_combat: bool,
    /// Names of living enemies, in target order.
    pub enemies: Vec<String>,
    /// Mechanical results already settled before narration.
    pub resolved: Vec<String>,
    /// Most recent history lines, oldest first.
    pub recent_history: Vec<String>,
}

/// Prose plus the untrusted patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narration {
    pub prose: String,
    #[serde(default)]
    pub patch: Value,
}

impl Narration {
    pub fn new(prose: impl Into<String>, patch: Value) -> Self {
        Self {
            prose: prose.into(),
            patch,
        }
    }

    /// Narration with nothing to apply.
    pub fn prose(prose: impl Into<String>) -> Self {
        Self::new(prose, Value::Null)
    }
}

#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, request: &NarrationRequest) -> Result<Narration, NarratorError>;
}

#[async_trait]
impl<T: Narrator + ?Sized> Narrator for Arc<T> {
    async fn narrate(&self, request: &NarrationRequest) -> Result<Narration, NarratorError> {
        (**self).narrate(request).await
    }
}

/// One scripted narrator reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Reply(Narration),
    Fail(String),
    /// Sleep before replying, to exercise the turn timeout.
    Stall(Duration, Narration),
}

/// Replays a fixed queue of replies, in order.
///
/// Used for replays and tests. Once the queue runs dry every call returns a
/// patch-free narration.
#[derive(Debug, Default)]
pub struct ScriptedNarrator {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedNarrator {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn narrate(&self, _request: &NarrationRequest) -> Result<Narration, NarratorError> {
        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(ScriptedReply::Reply(narration)) => Ok(narration),
            Some(ScriptedReply::Fail(reason)) => Err(NarratorError::Failed(reason)),
            Some(ScriptedReply::Stall(delay, narration)) => {
                tokio::time::sleep(delay).await;
                Ok(narration)
            }
            None => Ok(Narration::prose("The narrator has no more scripted responses.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> NarrationRequest {
        NarrationRequest {
            turn: 1,
            action: ActionKind::Explore,
            description: "look around".to_string(),
            character_name: "Mira".to_string(),
            hp: (10, 10),
            location: "Crossroads".to_string(),
            in_combat: false,
            enemies: Vec::new(),
            resolved: Vec::new(),
            recent_history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let narrator = ScriptedNarrator::new([
            ScriptedReply::Reply(Narration::new("A crow caws.", json!({ "timeDelta": 10 }))),
            ScriptedReply::Fail("rate limited".to_string()),
        ]);

        let first = narrator.narrate(&request()).await.unwrap();
        assert_eq!(first.prose, "A crow caws.");
        assert_eq!(first.patch["timeDelta"], 10);

        let second = narrator.narrate(&request()).await;
        assert_eq!(second, Err(NarratorError::Failed("rate limited".to_string())));

        let third = narrator.narrate(&request()).await.unwrap();
        assert!(third.prose.contains("no more scripted"));
        assert!(third.patch.is_null());
        assert_eq!(narrator.remaining(), 0);
    }

    #[test]
    fn test_narration_patch_defaults_to_null() {
        let narration: Narration = serde_json::from_str(r#"{ "prose": "Rain." }"#).unwrap();
        assert!(narration.patch.is_null());
    }
}
