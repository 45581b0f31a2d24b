use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    emotion::EmotionMap,
    personality::{EmotionalProfile, MemoryProfile, PersonalityProfile, SelfAwarenessProfile},
};

/// History length kept on a player record by the orchestration layer.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One prompt/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueEntry {
    /// Unique identifier.
    pub id: Uuid,
    /// What the player said.
    pub prompt: String,
    /// What the character answered.
    pub response: String,
    /// Emotions attached to the response.
    #[serde(default)]
    pub emotions: EmotionMap,
    /// Topic label, when known.
    #[serde(default)]
    pub topic: Option<String>,
    /// When the exchange happened.
    pub timestamp: DateTime<Utc>,
    /// Annotations written by the runtime.
    #[serde(default)]
    pub metadata: IndexMap<String, serde_json::Value>,
}

impl DialogueEntry {
    /// Creates an entry stamped now.
    #[must_use]
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            response: response.into(),
            emotions: EmotionMap::new(),
            topic: None,
            timestamp: Utc::now(),
            metadata: IndexMap::new(),
        }
    }

    /// Attaches emotions.
    #[must_use]
    pub fn with_emotions(mut self, emotions: EmotionMap) -> Self {
        self.emotions = emotions;
        self
    }

    /// Sets the topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Character record owned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Identifier used by the player store.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current emotional state.
    #[serde(default)]
    pub emotions: EmotionMap,
    /// Exchanges, oldest first.
    #[serde(default)]
    pub dialogue_history: Vec<DialogueEntry>,
    /// Personality facets.
    #[serde(default)]
    pub personality: PersonalityProfile,
    /// Emotional tendencies.
    #[serde(default)]
    pub emotional_profile: EmotionalProfile,
    /// Reflective tendencies.
    #[serde(default)]
    pub self_awareness: SelfAwarenessProfile,
    /// Memory tendencies.
    #[serde(default)]
    pub memory_profile: MemoryProfile,
}

impl Player {
    /// Creates a player with default profiles and an empty history.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let emotional_profile = EmotionalProfile::default();
        Self {
            id: id.into(),
            name: name.into(),
            emotions: emotional_profile.baseline.clone(),
            dialogue_history: Vec::new(),
            personality: PersonalityProfile::default(),
            emotional_profile,
            self_awareness: SelfAwarenessProfile::default(),
            memory_profile: MemoryProfile::default(),
        }
    }

    /// Replaces the personality.
    #[must_use]
    pub fn with_personality(mut self, personality: PersonalityProfile) -> Self {
        self.personality = personality;
        self
    }

    /// Appends an exchange and keeps only the newest `limit` entries.
    pub fn record_dialogue(&mut self, entry: DialogueEntry, limit: usize) {
        self.dialogue_history.push(entry);
        let limit = limit.max(1);
        if self.dialogue_history.len() > limit {
            let excess = self.dialogue_history.len() - limit;
            self.dialogue_history.drain(..excess);
        }
    }

    /// The newest `count` entries, oldest first.
    #[must_use]
    pub fn recent_history(&self, count: usize) -> &[DialogueEntry] {
        let start = self.dialogue_history.len().saturating_sub(count);
        &self.dialogue_history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_trimmed_to_limit() {
        let mut player = Player::new("npc-1", "Mira");
        for idx in 0..55 {
            player.record_dialogue(
                DialogueEntry::new(format!("prompt {idx}"), "ok"),
                DEFAULT_HISTORY_LIMIT,
            );
        }
        assert_eq!(player.dialogue_history.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(player.dialogue_history[0].prompt, "prompt 5");
        assert_eq!(player.recent_history(2)[1].prompt, "prompt 54");
    }

    #[test]
    fn recent_history_handles_short_records() {
        let player = Player::new("npc-2", "Oren");
        assert!(player.recent_history(10).is_empty());
    }

    #[test]
    fn player_json_round_trip() {
        let mut player = Player::new("npc-3", "Tamsin");
        player.record_dialogue(
            DialogueEntry::new("hello", "greetings")
                .with_topic("greeting")
                .with_metadata("awareness", serde_json::json!(0.5)),
            10,
        );
        let json = serde_json::to_string(&player).unwrap();
        let restored: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, player);
    }
}
