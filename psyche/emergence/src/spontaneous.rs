use psyche_consciousness::ConsciousnessState;
use psyche_persona::PersonalityProfile;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    engine::EmergentBehaviorResult,
    traits::EmergenceType,
};

/// Kind of unprompted behaviour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpontaneousBehaviorType {
    /// Wanders onto a related subject.
    Tangent,
    /// Slips in a joke.
    Humor,
    /// Lets a feeling spill over.
    EmotionalOutburst,
    /// Comments on its own thinking.
    SelfReflection,
}

/// Unprompted behaviour to weave into a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpontaneousBehavior {
    /// Kind.
    pub behavior_type: SpontaneousBehaviorType,
    /// Hint for the reply generator.
    pub description: String,
    /// Strength, `[0, 1]`.
    pub intensity: f32,
    /// What triggered it.
    pub trigger: String,
}

/// Stage of behaviour-level consciousness emergence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencePhase {
    /// Nothing notable yet.
    PreEmergent,
    /// Complexity accumulating.
    ComplexityBuilding,
    /// Recognisable emergent patterns.
    EmergentPatterns,
    /// Fully emerged.
    FullEmergence,
}

impl EmergencePhase {
    /// Phase for an emergence probability and complexity.
    #[must_use]
    pub fn classify(probability: f32, complexity: f32) -> Self {
        if probability > 0.8 && complexity > 0.7 {
            Self::FullEmergence
        } else if probability > 0.6 {
            Self::EmergentPatterns
        } else if probability > 0.4 {
            Self::ComplexityBuilding
        } else {
            Self::PreEmergent
        }
    }
}

/// Assessment of how far emergent behaviour has progressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorConsciousnessEmergence {
    /// Behavioural complexity, `[0, 1]`.
    pub current_complexity: f32,
    /// Signals of emergence that were observed.
    pub indicators: Vec<String>,
    /// `min(1, 0.4·complexity + 0.2·indicators + 0.4·metacognition)`.
    pub emergence_probability: f32,
    /// Phase derived from probability and complexity.
    pub phase: EmergencePhase,
}

pub(crate) fn spontaneous<R: Rng>(
    personality: &PersonalityProfile,
    state: &ConsciousnessState,
    rng: &mut R,
) -> Vec<SpontaneousBehavior> {
    let p = personality.clamped();
    let spontaneity = 0.4f32
        .mul_add(p.openness, 0.3f32.mul_add(p.humor, 0.3 * state.awareness_level))
        .clamp(0.0, 1.0);
    let candidates = [
        (
            SpontaneousBehaviorType::Tangent,
            p.curiosity,
            format!("drift from {} to something related", state.attention_focus.primary_focus),
            "curiosity",
        ),
        (
            SpontaneousBehaviorType::Humor,
            p.humor,
            "lighten the moment with a small joke".to_string(),
            "humor",
        ),
        (
            SpontaneousBehaviorType::EmotionalOutburst,
            p.neuroticism * state.cognitive_load,
            "let a flash of feeling show".to_string(),
            "cognitive_load",
        ),
        (
            SpontaneousBehaviorType::SelfReflection,
            state.metacognition_level,
            "remark on how it is thinking about this".to_string(),
            "metacognition",
        ),
    ];
    candidates
        .into_iter()
        .filter_map(|(behavior_type, weight, description, trigger)| {
            let chance = weight.clamp(0.0, 1.0) * spontaneity * 0.5;
            (rng.gen::<f32>() < chance).then(|| SpontaneousBehavior {
                behavior_type,
                description,
                intensity: (weight * spontaneity).clamp(0.0, 1.0),
                trigger: trigger.to_string(),
            })
        })
        .collect()
}

pub(crate) fn assess(
    result: &EmergentBehaviorResult,
    state: &ConsciousnessState,
) -> BehaviorConsciousnessEmergence {
    let current_complexity = 0.4f32
        .mul_add(
            result.emergence_level,
            0.3f32.mul_add(
                state.consciousness_quality.overall_quality,
                0.3 * result.behavior_novelty,
            ),
        )
        .clamp(0.0, 1.0);

    let mut indicators = Vec::new();
    if result
        .emergent_traits
        .iter()
        .any(|t| t.emergence_type == EmergenceType::ThresholdEmergence)
    {
        indicators.push("amplified_traits".to_string());
    }
    if result
        .emergent_traits
        .iter()
        .any(|t| t.emergence_type == EmergenceType::NovelSynthesis)
    {
        indicators.push("novel_synthesis".to_string());
    }
    if state.awareness_level > 0.7 {
        indicators.push("heightened_awareness".to_string());
    }
    if result.coherence.overall > 0.7 {
        indicators.push("coherent_behavior".to_string());
    }
    if state.metacognition_level > 0.6 {
        indicators.push("metacognitive_depth".to_string());
    }

    #[allow(clippy::cast_precision_loss)]
    let indicator_term = 0.2 * indicators.len() as f32;
    let emergence_probability = 0.4f32
        .mul_add(
            current_complexity,
            0.4f32.mul_add(state.metacognition_level, indicator_term),
        )
        .clamp(0.0, 1.0);
    BehaviorConsciousnessEmergence {
        current_complexity,
        phase: EmergencePhase::classify(emergence_probability, current_complexity),
        indicators,
        emergence_probability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_thresholds() {
        assert_eq!(EmergencePhase::classify(0.9, 0.8), EmergencePhase::FullEmergence);
        assert_eq!(EmergencePhase::classify(0.9, 0.5), EmergencePhase::EmergentPatterns);
        assert_eq!(EmergencePhase::classify(0.5, 0.9), EmergencePhase::ComplexityBuilding);
        assert_eq!(EmergencePhase::classify(0.4, 0.9), EmergencePhase::PreEmergent);
    }
}
