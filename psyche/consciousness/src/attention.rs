use indexmap::IndexMap;
use psyche_persona::{EmotionMap, EmotionMapExt};
use serde::{Deserialize, Serialize};

use crate::stimuli::{unit, MemoryActivation, Stimuli};

const MAX_SECONDARY_FOCI: usize = 3;

/// Where attention currently sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionFocus {
    /// Topic holding attention.
    pub primary_focus: String,
    /// Topics at the edge of attention, at most three.
    #[serde(default)]
    pub secondary_foci: Vec<String>,
    /// Strength of focus, `[0, 1]`.
    pub intensity: f32,
    /// How unified the focus is, `[0, 1]`.
    pub coherence: f32,
    /// Resistance to sudden change, `[0, 1]`.
    pub focus_stability: f32,
    /// Named demands competing for attention.
    #[serde(default)]
    pub attention_demands: IndexMap<String, f32>,
}

impl Default for AttentionFocus {
    fn default() -> Self {
        Self {
            primary_focus: "idle".into(),
            secondary_foci: Vec::new(),
            intensity: 0.3,
            coherence: 0.6,
            focus_stability: 0.8,
            attention_demands: IndexMap::new(),
        }
    }
}

impl AttentionFocus {
    /// Sum of all attention demands.
    #[must_use]
    pub fn total_demand(&self) -> f32 {
        self.attention_demands.values().copied().sum()
    }
}

/// Moves attention toward the new stimuli.
///
/// Pure: the result depends only on the arguments.
#[must_use]
pub fn update_attention_focus(
    current: &AttentionFocus,
    stimuli: &Stimuli,
    emotional_influence: &EmotionMap,
) -> AttentionFocus {
    let stimuli = stimuli.clamped();
    let emotional_peak = unit(emotional_influence.peak_intensity());

    let intensity = unit((0.6 * stimuli.intensity).mul_add(stimuli.novelty, 0.4 * emotional_peak));
    let continuity = if stimuli.primary_topic == current.primary_focus {
        0.8
    } else {
        0.3
    };
    let coherence = unit(0.5f32.mul_add(continuity, 0.5 * 0.3f32.mul_add(-stimuli.complexity, 1.0)));
    let focus_stability = (1.0 - (intensity - current.intensity).abs()).max(0.2);

    let mut secondary_foci: Vec<String> = Vec::with_capacity(MAX_SECONDARY_FOCI);
    let carried = std::iter::once(&current.primary_focus)
        .filter(|focus| *focus != &stimuli.primary_topic && focus.as_str() != "idle");
    for topic in carried.chain(stimuli.secondary_topics.iter()) {
        if secondary_foci.len() == MAX_SECONDARY_FOCI {
            break;
        }
        if topic != &stimuli.primary_topic && !secondary_foci.contains(topic) {
            secondary_foci.push(topic.clone());
        }
    }

    // Saturated stimuli sum to 2.5, enough to cap the load on their own.
    let mut attention_demands = IndexMap::new();
    attention_demands.insert("topic".to_string(), stimuli.intensity * 0.8);
    attention_demands.insert("novelty".to_string(), stimuli.novelty * 0.7);
    attention_demands.insert("complexity".to_string(), stimuli.complexity * 0.7);
    attention_demands.insert(
        "emotion".to_string(),
        stimuli.emotional_intensity.max(emotional_peak) * 0.3,
    );

    AttentionFocus {
        primary_focus: stimuli.primary_topic,
        secondary_foci,
        intensity,
        coherence,
        focus_stability,
        attention_demands,
    }
}

/// Awareness derived from attention, memory, emotions and the previous level.
///
/// Never drops below 0.2.
#[must_use]
pub fn calculate_awareness_level(
    attention: &AttentionFocus,
    memory: &MemoryActivation,
    emotional_state: &EmotionMap,
    previous_awareness: f32,
) -> f32 {
    let attention_part = 0.4 * unit(attention.intensity) * unit(attention.coherence);
    let memory_part = 0.3 * unit(memory.activation_level) * unit(memory.relevance);
    let clarity = unit(emotional_state.peak_intensity());
    #[allow(clippy::cast_precision_loss)]
    let complexity = (emotional_state.active_emotions(0.1).len() as f32 / 4.0).min(1.0);
    let emotional_part = 0.2 * (clarity + complexity) / 2.0;
    let continuity = 0.1 * unit(previous_awareness);
    let total = attention_part + memory_part + emotional_part + continuity;
    if total.is_nan() {
        return 0.2;
    }
    total.clamp(0.2, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emotions(values: &[(&str, f32)]) -> EmotionMap {
        values.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn intensity_blends_stimuli_and_emotion() {
        let current = AttentionFocus::default();
        let stimuli = Stimuli::new("market")
            .with_intensity(0.8)
            .with_novelty(0.5)
            .with_complexity(0.0);
        let next = update_attention_focus(&current, &stimuli, &emotions(&[("joy", 0.5)]));
        assert!((next.intensity - 0.44).abs() < 1e-6);
        // Topic changed: continuity 0.3, complexity term 1.0.
        assert!((next.coherence - 0.65).abs() < 1e-6);
        assert!((next.focus_stability - 0.86).abs() < 1e-6);
        assert_eq!(next.primary_focus, "market");
    }

    #[test]
    fn continuing_topic_raises_coherence() {
        let current = AttentionFocus {
            primary_focus: "market".into(),
            ..AttentionFocus::default()
        };
        let stimuli = Stimuli::new("market").with_complexity(1.0);
        let next = update_attention_focus(&current, &stimuli, &EmotionMap::new());
        assert!((next.coherence - 0.75).abs() < 1e-6);
    }

    #[test]
    fn stability_has_a_floor() {
        let current = AttentionFocus {
            intensity: 0.0,
            ..AttentionFocus::default()
        };
        let stimuli = Stimuli::new("fire").with_intensity(1.0).with_novelty(1.0);
        let next = update_attention_focus(&current, &stimuli, &emotions(&[("fear", 1.0)]));
        assert!((next.intensity - 1.0).abs() < f32::EPSILON);
        assert!((next.focus_stability - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn previous_focus_moves_to_secondary() {
        let current = AttentionFocus {
            primary_focus: "harbor".into(),
            ..AttentionFocus::default()
        };
        let mut stimuli = Stimuli::new("storm");
        stimuli.secondary_topics = vec!["ships".into(), "harbor".into(), "gulls".into(), "rain".into()];
        let next = update_attention_focus(&current, &stimuli, &EmotionMap::new());
        assert_eq!(next.secondary_foci, vec!["harbor", "ships", "gulls"]);
    }

    #[test]
    fn saturated_stimuli_demand_the_full_load() {
        let stimuli = Stimuli::new("everything")
            .with_intensity(1.0)
            .with_novelty(1.0)
            .with_complexity(1.0)
            .with_emotional_intensity(1.0);
        let next = update_attention_focus(&AttentionFocus::default(), &stimuli, &EmotionMap::new());
        assert!(next.total_demand() >= 2.5 - 1e-5);
        assert!((next.attention_demands["topic"] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn awareness_respects_floor_and_cap() {
        let dull = AttentionFocus {
            intensity: 0.0,
            coherence: 0.0,
            ..AttentionFocus::default()
        };
        let floor = calculate_awareness_level(&dull, &MemoryActivation::default(), &EmotionMap::new(), 0.0);
        assert!((floor - 0.2).abs() < f32::EPSILON);

        let sharp = AttentionFocus {
            intensity: 1.0,
            coherence: 1.0,
            ..AttentionFocus::default()
        };
        let all = emotions(&[("joy", 1.0), ("awe", 1.0), ("fear", 1.0), ("hope", 1.0)]);
        let cap = calculate_awareness_level(&sharp, &MemoryActivation::saturated(), &all, 1.0);
        assert!((cap - 1.0).abs() < 1e-6);
    }
}
