use std::collections::HashSet;

use indexmap::IndexMap;
use psyche_persona::{text, DialogueEntry, EmotionMap, EmotionMapExt};
use serde::{Deserialize, Serialize};

/// Topic used when a prompt carries no content words.
pub const FALLBACK_TOPIC: &str = "general";

const NOVELTY_WINDOW: usize = 5;

/// Per-turn input signal describing the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimuli {
    /// Main topic of the prompt.
    pub primary_topic: String,
    /// Other topics mentioned, at most three.
    #[serde(default)]
    pub secondary_topics: Vec<String>,
    /// How unfamiliar the prompt is, `[0, 1]`.
    pub novelty: f32,
    /// How forceful the prompt is, `[0, 1]`.
    pub intensity: f32,
    /// How hard the prompt is to process, `[0, 1]`.
    pub complexity: f32,
    /// Emotional charge of the turn, `[0, 1]`.
    pub emotional_intensity: f32,
}

impl Stimuli {
    /// Creates mid-range stimuli for `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            primary_topic: topic.into(),
            secondary_topics: Vec::new(),
            novelty: 0.5,
            intensity: 0.5,
            complexity: 0.5,
            emotional_intensity: 0.5,
        }
    }

    /// Sets novelty.
    #[must_use]
    pub const fn with_novelty(mut self, novelty: f32) -> Self {
        self.novelty = novelty;
        self
    }

    /// Sets intensity.
    #[must_use]
    pub const fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Sets complexity.
    #[must_use]
    pub const fn with_complexity(mut self, complexity: f32) -> Self {
        self.complexity = complexity;
        self
    }

    /// Sets emotional intensity.
    #[must_use]
    pub const fn with_emotional_intensity(mut self, emotional_intensity: f32) -> Self {
        self.emotional_intensity = emotional_intensity;
        self
    }

    /// Copy with every scalar clamped to `[0, 1]` (NaN becomes 0).
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            primary_topic: self.primary_topic.clone(),
            secondary_topics: self.secondary_topics.iter().take(3).cloned().collect(),
            novelty: unit(self.novelty),
            intensity: unit(self.intensity),
            complexity: unit(self.complexity),
            emotional_intensity: unit(self.emotional_intensity),
        }
    }
}

/// How strongly memories were activated by the turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryActivation {
    /// Overall activation, `[0, 1]`.
    pub activation_level: f32,
    /// Relevance of the best memory, `[0, 1]`.
    pub relevance: f32,
    /// Effort spent retrieving, `[0, 1]`.
    pub processing_load: f32,
    /// Number of memories surfaced.
    pub active_memories: usize,
}

impl Default for MemoryActivation {
    fn default() -> Self {
        Self {
            activation_level: 0.1,
            relevance: 0.0,
            processing_load: 0.1,
            active_memories: 0,
        }
    }
}

impl MemoryActivation {
    /// Derives activation from ranked memory scores in `[0, 1]`.
    #[must_use]
    pub fn from_scores(scores: &[f32]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        #[allow(clippy::cast_precision_loss)]
        let count = scores.len() as f32;
        let mean = scores.iter().copied().map(unit).sum::<f32>() / count;
        let best = scores.iter().copied().map(unit).fold(0.0, f32::max);
        Self {
            activation_level: (count / 5.0).min(1.0).mul_add(0.5, mean * 0.5),
            relevance: best,
            processing_load: mean.mul_add(0.3, count / 10.0).min(1.0),
            active_memories: scores.len(),
        }
    }

    /// Fully saturated activation.
    #[must_use]
    pub const fn saturated() -> Self {
        Self {
            activation_level: 1.0,
            relevance: 1.0,
            processing_load: 1.0,
            active_memories: 10,
        }
    }
}

/// Optional scene information that competes for attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnvironmentalContext {
    /// Where the exchange happens.
    #[serde(default)]
    pub location: Option<String>,
    /// Background noise and distraction, `[0, 1]`.
    #[serde(default)]
    pub ambient_distraction: f32,
    /// Number of onlookers, normalised to `[0, 1]`.
    #[serde(default)]
    pub social_presence: f32,
}

impl EnvironmentalContext {
    /// Attention demand the scene adds to the turn.
    #[must_use]
    pub fn attention_demand(&self) -> f32 {
        unit(self.ambient_distraction).mul_add(0.3, unit(self.social_presence) * 0.1)
    }
}

/// Turns a raw prompt into [`Stimuli`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StimulusExtractor;

impl StimulusExtractor {
    /// Extracts stimuli from the prompt, the optional context string, the
    /// recent history and the character's current emotions.
    #[must_use]
    pub fn extract(
        prompt: &str,
        context: Option<&str>,
        recent_history: &[DialogueEntry],
        emotions: &EmotionMap,
    ) -> Stimuli {
        let mut words = text::content_tokens(prompt);
        if words.is_empty() {
            if let Some(context) = context {
                words = text::content_tokens(context);
            }
        }

        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for word in &words {
            *counts.entry(word.clone()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
        // Stable sort keeps first occurrence ahead on ties.
        ranked.sort_by(|a, b| b.1.cmp(a.1));
        let primary_topic = ranked
            .first()
            .map_or_else(|| FALLBACK_TOPIC.to_string(), |(word, _)| (*word).clone());
        let secondary_topics = ranked
            .iter()
            .skip(1)
            .take(3)
            .map(|(word, _)| (*word).clone())
            .collect();

        Stimuli {
            primary_topic,
            secondary_topics,
            novelty: novelty(&words, recent_history),
            intensity: intensity(prompt),
            complexity: complexity(prompt),
            emotional_intensity: unit(emotions.peak_intensity()),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn novelty(words: &[String], recent_history: &[DialogueEntry]) -> f32 {
    if words.is_empty() {
        return 0.5;
    }
    let start = recent_history.len().saturating_sub(NOVELTY_WINDOW);
    let seen: HashSet<String> = recent_history[start..]
        .iter()
        .flat_map(|entry| {
            text::content_tokens(&entry.prompt)
                .into_iter()
                .chain(text::content_tokens(&entry.response))
        })
        .collect();
    let unseen = words.iter().filter(|word| !seen.contains(*word)).count();
    unseen as f32 / words.len() as f32
}

#[allow(clippy::cast_precision_loss)]
fn intensity(prompt: &str) -> f32 {
    let exclamations = prompt.matches('!').count().min(3);
    let questions = prompt.matches('?').count().min(2);
    let words = text::tokens(prompt);
    let shouted = prompt
        .split_whitespace()
        .filter(|w| w.chars().filter(char::is_ascii_alphabetic).count() > 1)
        .filter(|w| !w.chars().any(|c| c.is_ascii_lowercase()))
        .count();
    let shout_ratio = if words.is_empty() {
        0.0
    } else {
        shouted as f32 / words.len() as f32
    };
    let raw = 0.15f32.mul_add(exclamations as f32, 0.3) + 0.1 * questions as f32 + 0.3 * shout_ratio;
    unit(raw)
}

#[allow(clippy::cast_precision_loss)]
fn complexity(prompt: &str) -> f32 {
    let words = text::tokens(prompt);
    if words.is_empty() {
        return 0.0;
    }
    let avg_len = words.iter().map(String::len).sum::<usize>() as f32 / words.len() as f32;
    let clauses = prompt
        .chars()
        .filter(|c| matches!(c, ',' | ';' | ':' | '.' | '?' | '!'))
        .count()
        .max(1);
    let clause_score = (clauses as f32 / 4.0).min(1.0);
    let length_score = (words.len() as f32 / 30.0).min(1.0);
    unit((avg_len / 8.0).min(1.0).mul_add(0.4, clause_score * 0.3) + length_score * 0.3)
}

pub(crate) fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_primary_and_secondary_topics() {
        let stimuli = StimulusExtractor::extract(
            "The ruins! Tell me about the ruins near the harbor and the lighthouse.",
            None,
            &[],
            &EmotionMap::from([("awe".to_string(), 0.8)]),
        );
        assert_eq!(stimuli.primary_topic, "ruins");
        assert_eq!(stimuli.secondary_topics, vec!["near", "harbor", "lighthouse"]);
        assert!((stimuli.novelty - 1.0).abs() < f32::EPSILON);
        assert!((stimuli.emotional_intensity - 0.8).abs() < f32::EPSILON);
        assert!(stimuli.intensity > 0.3);
    }

    #[test]
    fn repeated_topics_are_less_novel() {
        let history = vec![DialogueEntry::new(
            "What about the harbor ruins?",
            "The harbor ruins are old.",
        )];
        let stimuli =
            StimulusExtractor::extract("harbor ruins lanterns", None, &history, &EmotionMap::new());
        assert!((stimuli.novelty - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_prompt_falls_back() {
        let stimuli = StimulusExtractor::extract("", Some(""), &[], &EmotionMap::new());
        assert_eq!(stimuli.primary_topic, FALLBACK_TOPIC);
        assert!((stimuli.novelty - 0.5).abs() < f32::EPSILON);
        assert!(stimuli.complexity.abs() < f32::EPSILON);
    }

    #[test]
    fn memory_activation_from_scores() {
        let activation = MemoryActivation::from_scores(&[0.9, 0.5]);
        assert_eq!(activation.active_memories, 2);
        assert!((activation.relevance - 0.9).abs() < f32::EPSILON);
        assert!((activation.activation_level - 0.55).abs() < 1e-6);
        assert!(MemoryActivation::from_scores(&[]).relevance.abs() < f32::EPSILON);
    }

    #[test]
    fn clamped_stimuli_stay_in_unit_range() {
        let wild = Stimuli::new("storm").with_novelty(3.0).with_intensity(f32::NAN);
        let tame = wild.clamped();
        assert!((tame.novelty - 1.0).abs() < f32::EPSILON);
        assert!(tame.intensity.abs() < f32::EPSILON);
    }
}
