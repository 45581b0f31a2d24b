use serde::{Deserialize, Serialize};

use crate::{emotion::EmotionMap, text};

/// Declared speaking style of a character.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    /// Measured, polite register.
    Formal,
    /// Relaxed everyday speech.
    #[default]
    Casual,
    /// Jokes and light teasing.
    Playful,
    /// Reasoned, evidence-driven replies.
    Analytical,
    /// Warm, validating replies.
    Empathetic,
}

impl CommunicationStyle {
    /// Short label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Formal => "formal",
            Self::Casual => "casual",
            Self::Playful => "playful",
            Self::Analytical => "analytical",
            Self::Empathetic => "empathetic",
        }
    }

    /// Words and phrases that signal this style.
    #[must_use]
    pub const fn markers(self) -> &'static [&'static str] {
        match self {
            Self::Formal => &[
                "certainly", "indeed", "please", "regarding", "therefore", "shall", "kindly",
            ],
            Self::Casual => &["hey", "yeah", "cool", "gonna", "kinda", "okay", "stuff"],
            Self::Playful => &["haha", "fun", "imagine", "silly", "wink", "game", "joke"],
            Self::Analytical => &[
                "because", "therefore", "data", "consider", "analysis", "evidence", "likely",
            ],
            Self::Empathetic => &["feel", "understand", "sorry", "care", "hear", "together"],
        }
    }

    /// How well `text` matches the style, in `[0.4, 1.0]`.
    ///
    /// Every distinct marker adds 0.15 on top of a 0.4 baseline.
    #[must_use]
    pub fn alignment_score(self, text: &str) -> f32 {
        let hits = self
            .markers()
            .iter()
            .filter(|marker| text::contains_phrase(text, marker))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let hits = hits as f32;
        0.15f32.mul_add(hits, 0.4).min(1.0)
    }
}

/// Scalar personality facets, all in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    /// Openness to experience.
    pub openness: f32,
    /// Conscientiousness.
    pub conscientiousness: f32,
    /// Extraversion.
    pub extraversion: f32,
    /// Agreeableness.
    pub agreeableness: f32,
    /// Neuroticism.
    pub neuroticism: f32,
    /// Drive to explore topics.
    pub curiosity: f32,
    /// Sensitivity to others' feelings.
    pub empathy: f32,
    /// Tendency toward humour.
    pub humor: f32,
    /// Declared speaking style.
    pub communication_style: CommunicationStyle,
    /// Values the character defends.
    #[serde(default)]
    pub core_values: Vec<String>,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self {
            openness: 0.6,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.6,
            neuroticism: 0.3,
            curiosity: 0.6,
            empathy: 0.6,
            humor: 0.4,
            communication_style: CommunicationStyle::default(),
            core_values: vec!["honesty".into(), "kindness".into()],
        }
    }
}

impl PersonalityProfile {
    /// Copy with every facet clamped to `[0, 1]`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            openness: self.openness.clamp(0.0, 1.0),
            conscientiousness: self.conscientiousness.clamp(0.0, 1.0),
            extraversion: self.extraversion.clamp(0.0, 1.0),
            agreeableness: self.agreeableness.clamp(0.0, 1.0),
            neuroticism: self.neuroticism.clamp(0.0, 1.0),
            curiosity: self.curiosity.clamp(0.0, 1.0),
            empathy: self.empathy.clamp(0.0, 1.0),
            humor: self.humor.clamp(0.0, 1.0),
            communication_style: self.communication_style,
            core_values: self.core_values.clone(),
        }
    }
}

/// Long-running emotional tendencies of a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalProfile {
    /// Resting emotional state.
    #[serde(default)]
    pub baseline: EmotionMap,
    /// How quickly emotions swing, `[0, 1]`.
    pub volatility: f32,
    /// Emotions the character usually shows.
    #[serde(default)]
    pub predominant_emotions: Vec<String>,
    /// Breadth of emotions the character can express, `[0, 1]`.
    pub emotional_range: f32,
}

impl Default for EmotionalProfile {
    fn default() -> Self {
        Self {
            baseline: EmotionMap::from([("calm".to_string(), 0.5), ("curiosity".to_string(), 0.4)]),
            volatility: 0.3,
            predominant_emotions: vec!["calm".into(), "curiosity".into()],
            emotional_range: 0.5,
        }
    }
}

/// How reflective the character is about itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelfAwarenessProfile {
    /// Habit of reflecting on its own responses.
    pub self_reflection_level: f32,
    /// Awareness of its own thinking.
    pub metacognitive_awareness: f32,
    /// Stability of its sense of self.
    pub identity_coherence: f32,
}

impl Default for SelfAwarenessProfile {
    fn default() -> Self {
        Self {
            self_reflection_level: 0.5,
            metacognitive_awareness: 0.5,
            identity_coherence: 0.6,
        }
    }
}

/// Memory tendencies of the character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryProfile {
    /// How much of past exchanges is retained.
    pub retention: f32,
    /// How readily memories link to each other.
    pub associative_strength: f32,
}

impl Default for MemoryProfile {
    fn default() -> Self {
        Self {
            retention: 0.7,
            associative_strength: 0.5,
        }
    }
}
