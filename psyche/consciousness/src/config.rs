use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::state::MAX_STREAM_CAPACITY;

/// Tunables for the consciousness state manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessConfig {
    /// Artificial delay awaited before each update, in milliseconds.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,
    /// Chance of a metacognitive insight when the previous metacognition exceeds 0.7.
    #[serde(default = "default_metacognitive_insight_probability")]
    pub metacognitive_insight_probability: f32,
    /// Period of the idle loop, in milliseconds.
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
    /// Period of the background fluctuation task, in milliseconds.
    #[serde(default = "default_fluctuation_period_ms")]
    pub fluctuation_period_ms: u64,
    /// Relative noise applied to awareness by the fluctuation task.
    #[serde(default = "default_fluctuation_amplitude")]
    pub fluctuation_amplitude: f32,
    /// Retained consciousness events, at most 20.
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
}

impl Default for ConsciousnessConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: default_processing_delay_ms(),
            metacognitive_insight_probability: default_metacognitive_insight_probability(),
            idle_interval_ms: default_idle_interval_ms(),
            fluctuation_period_ms: default_fluctuation_period_ms(),
            fluctuation_amplitude: default_fluctuation_amplitude(),
            stream_capacity: default_stream_capacity(),
        }
    }
}

impl ConsciousnessConfig {
    /// Copy with the processing delay removed.
    #[must_use]
    pub const fn without_delay(mut self) -> Self {
        self.processing_delay_ms = 0;
        self
    }

    /// Copy with out-of-range values pulled back into range. Non-finite
    /// numbers fall back to their defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let unit_or = |value: f32, fallback: f32| {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };
        self.metacognitive_insight_probability = unit_or(
            self.metacognitive_insight_probability,
            default_metacognitive_insight_probability(),
        );
        self.fluctuation_amplitude =
            unit_or(self.fluctuation_amplitude, default_fluctuation_amplitude());
        self.idle_interval_ms = self.idle_interval_ms.max(1);
        self.fluctuation_period_ms = self.fluctuation_period_ms.max(1);
        self.stream_capacity = self.stream_capacity.clamp(1, MAX_STREAM_CAPACITY);
        self
    }

    /// Processing delay as a duration.
    #[must_use]
    pub const fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    /// Idle interval as a duration.
    #[must_use]
    pub const fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    /// Fluctuation period as a duration.
    #[must_use]
    pub const fn fluctuation_period(&self) -> Duration {
        Duration::from_millis(self.fluctuation_period_ms)
    }
}

const fn default_processing_delay_ms() -> u64 {
    40
}

const fn default_metacognitive_insight_probability() -> f32 {
    0.3
}

const fn default_idle_interval_ms() -> u64 {
    500
}

const fn default_fluctuation_period_ms() -> u64 {
    5_000
}

const fn default_fluctuation_amplitude() -> f32 {
    0.05
}

const fn default_stream_capacity() -> usize {
    MAX_STREAM_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_values() {
        let config = ConsciousnessConfig {
            metacognitive_insight_probability: 4.0,
            idle_interval_ms: 0,
            stream_capacity: 99,
            ..ConsciousnessConfig::default()
        }
        .sanitized();
        assert!((config.metacognitive_insight_probability - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.idle_interval(), Duration::from_millis(1));
        assert_eq!(config.stream_capacity, MAX_STREAM_CAPACITY);
    }

    #[test]
    fn non_finite_values_fall_back_to_defaults() {
        let config = ConsciousnessConfig {
            fluctuation_amplitude: f32::NAN,
            metacognitive_insight_probability: f32::INFINITY,
            ..ConsciousnessConfig::default()
        }
        .sanitized();
        assert!((config.fluctuation_amplitude - 0.05).abs() < f32::EPSILON);
        assert!((config.metacognitive_insight_probability - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: ConsciousnessConfig = serde_json::from_str(r#"{"idle_interval_ms": 20}"#).unwrap();
        assert_eq!(config.idle_interval_ms, 20);
        assert_eq!(config.processing_delay_ms, 40);
        assert!((config.fluctuation_amplitude - 0.05).abs() < f32::EPSILON);
    }
}
