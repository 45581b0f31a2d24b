use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::ConsciousnessState;

const AWARENESS_SHIFT: f32 = 0.2;
const LOAD_SHIFT: f32 = 0.3;
const METACOGNITIVE_SHIFT: f32 = 0.15;

/// Which scalar moved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionType {
    /// Awareness moved by more than 0.2.
    AwarenessShift,
    /// Cognitive load moved by more than 0.3.
    CognitiveLoadShift,
    /// Metacognition moved by more than 0.15.
    MetacognitiveShift,
}

/// Direction of a transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransitionDirection {
    /// Value went up.
    Increasing,
    /// Value went down.
    Decreasing,
}

impl TransitionDirection {
    fn of(delta: f32) -> Self {
        if delta >= 0.0 {
            Self::Increasing
        } else {
            Self::Decreasing
        }
    }

    /// `"increasing"` or `"decreasing"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
        }
    }
}

impl fmt::Display for TransitionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A significant change between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessTransition {
    /// Which scalar moved.
    pub transition_type: TransitionType,
    /// Value before.
    pub from: f32,
    /// Value after.
    pub to: f32,
    /// Absolute change.
    pub magnitude: f32,
    /// Up or down.
    pub direction: TransitionDirection,
    /// When the change was detected.
    pub detected_at: DateTime<Utc>,
}

/// Returns the first matching transition, checked in priority order:
/// awareness, then cognitive load, then metacognition.
#[must_use]
pub fn detect_consciousness_transitions(
    previous: &ConsciousnessState,
    current: &ConsciousnessState,
) -> Option<ConsciousnessTransition> {
    let checks = [
        (
            TransitionType::AwarenessShift,
            previous.awareness_level,
            current.awareness_level,
            AWARENESS_SHIFT,
        ),
        (
            TransitionType::CognitiveLoadShift,
            previous.cognitive_load,
            current.cognitive_load,
            LOAD_SHIFT,
        ),
        (
            TransitionType::MetacognitiveShift,
            previous.metacognition_level,
            current.metacognition_level,
            METACOGNITIVE_SHIFT,
        ),
    ];
    checks
        .into_iter()
        .find(|(_, from, to, threshold)| (to - from).abs() > *threshold)
        .map(|(transition_type, from, to, _)| ConsciousnessTransition {
            transition_type,
            from,
            to,
            magnitude: (to - from).abs(),
            direction: TransitionDirection::of(to - from),
            detected_at: Utc::now(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(awareness: f32, load: f32, meta: f32) -> ConsciousnessState {
        ConsciousnessState {
            awareness_level: awareness,
            cognitive_load: load,
            metacognition_level: meta,
            ..ConsciousnessState::default()
        }
    }

    #[test]
    fn awareness_shift_is_detected_as_increasing() {
        let transition =
            detect_consciousness_transitions(&state(0.5, 0.4, 0.5), &state(0.8, 0.4, 0.5)).unwrap();
        assert_eq!(transition.transition_type, TransitionType::AwarenessShift);
        assert_eq!(transition.direction.as_str(), "increasing");
        assert!((transition.magnitude - 0.3).abs() < 1e-6);
    }

    #[test]
    fn only_the_highest_priority_rule_fires() {
        let transition =
            detect_consciousness_transitions(&state(0.9, 0.1, 0.9), &state(0.6, 0.9, 0.2)).unwrap();
        assert_eq!(transition.transition_type, TransitionType::AwarenessShift);
        assert_eq!(transition.direction, TransitionDirection::Decreasing);
    }

    #[test]
    fn lower_priority_rules_apply_in_order() {
        let load = detect_consciousness_transitions(&state(0.5, 0.1, 0.5), &state(0.6, 0.5, 0.9))
            .unwrap();
        assert_eq!(load.transition_type, TransitionType::CognitiveLoadShift);
        let meta = detect_consciousness_transitions(&state(0.5, 0.1, 0.5), &state(0.5, 0.2, 0.7))
            .unwrap();
        assert_eq!(meta.transition_type, TransitionType::MetacognitiveShift);
    }

    #[test]
    fn small_moves_are_ignored() {
        assert!(
            detect_consciousness_transitions(&state(0.5, 0.4, 0.5), &state(0.6, 0.5, 0.6)).is_none()
        );
    }
}
