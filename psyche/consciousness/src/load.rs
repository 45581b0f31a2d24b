use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::stimuli::{unit, MemoryActivation};

/// Load above which a turn counts as overload.
pub const OVERLOAD_THRESHOLD: f32 = 0.8;

/// Coarse classification of a load value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadBand {
    /// Below 0.3.
    Low,
    /// 0.3 up to 0.6.
    Moderate,
    /// 0.6 up to the overload threshold.
    High,
    /// Above the overload threshold.
    Overloaded,
}

/// Aggregates demand signals into a single load scalar. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct CognitiveLoadMonitor;

impl CognitiveLoadMonitor {
    /// `0.4·Σdemands + 0.3·memory load + 0.2·min(1, emotions) + 0.1·metacognition`,
    /// capped to `[0, 1]`.
    #[must_use]
    pub fn calculate(
        attention_demands: &IndexMap<String, f32>,
        memory_activation: &MemoryActivation,
        emotional_processing_sum: f32,
        metacognitive_activity: f32,
    ) -> f32 {
        let demand: f32 = attention_demands
            .values()
            .copied()
            .filter(|v| v.is_finite())
            .sum();
        let emotional = if emotional_processing_sum.is_finite() {
            emotional_processing_sum.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let load = 0.1f32.mul_add(
            unit(metacognitive_activity),
            0.4f32.mul_add(demand, 0.3 * unit(memory_activation.processing_load)) + 0.2 * emotional,
        );
        unit(load)
    }

    /// Band for a load value.
    #[must_use]
    pub fn band(load: f32) -> LoadBand {
        match load {
            l if l > OVERLOAD_THRESHOLD => LoadBand::Overloaded,
            l if l >= 0.6 => LoadBand::High,
            l if l >= 0.3 => LoadBand::Moderate,
            _ => LoadBand::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demands(values: &[f32]) -> IndexMap<String, f32> {
        values
            .iter()
            .enumerate()
            .map(|(idx, v)| (format!("d{idx}"), *v))
            .collect()
    }

    #[test]
    fn weighted_sum() {
        let memory = MemoryActivation {
            processing_load: 0.5,
            ..MemoryActivation::default()
        };
        let load = CognitiveLoadMonitor::calculate(&demands(&[0.25, 0.25]), &memory, 0.5, 0.5);
        // 0.2 + 0.15 + 0.1 + 0.05
        assert!((load - 0.5).abs() < 1e-6);
        assert_eq!(CognitiveLoadMonitor::band(load), LoadBand::Moderate);
    }

    #[test]
    fn saturates_at_one() {
        let load = CognitiveLoadMonitor::calculate(
            &demands(&[1.0, 1.0, 1.0]),
            &MemoryActivation::saturated(),
            5.0,
            1.0,
        );
        assert!((load - 1.0).abs() < f32::EPSILON);
        assert_eq!(CognitiveLoadMonitor::band(load), LoadBand::Overloaded);
    }

    #[test]
    fn empty_inputs_give_low_load() {
        let memory = MemoryActivation {
            processing_load: 0.0,
            ..MemoryActivation::default()
        };
        let load = CognitiveLoadMonitor::calculate(&IndexMap::new(), &memory, f32::NAN, 0.0);
        assert!(load.abs() < f32::EPSILON);
        assert_eq!(CognitiveLoadMonitor::band(load), LoadBand::Low);
    }
}
