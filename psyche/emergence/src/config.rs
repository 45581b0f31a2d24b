use serde::{Deserialize, Serialize};

/// Tunables for the emergent behaviour engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergenceConfig {
    /// Chance that a strong random gene sample synthesises a novel trait.
    #[serde(default = "default_novel_synthesis_probability")]
    pub novel_synthesis_probability: f32,
    /// Half-width of the uniform mutation noise.
    #[serde(default = "default_mutation_noise")]
    pub mutation_noise: f32,
    /// Chance that a strong environmental pressure spawns an adaptive gene.
    #[serde(default = "default_adaptive_gene_chance")]
    pub adaptive_gene_chance: f32,
    /// Chance that a highly successful pattern spawns a learned gene.
    #[serde(default = "default_learned_gene_chance")]
    pub learned_gene_chance: f32,
    /// Maximum emergent traits per result.
    #[serde(default = "default_max_traits")]
    pub max_traits: usize,
    /// Artificial delay awaited by each operation, in milliseconds.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,
}

impl Default for EmergenceConfig {
    fn default() -> Self {
        Self {
            novel_synthesis_probability: default_novel_synthesis_probability(),
            mutation_noise: default_mutation_noise(),
            adaptive_gene_chance: default_adaptive_gene_chance(),
            learned_gene_chance: default_learned_gene_chance(),
            max_traits: default_max_traits(),
            processing_delay_ms: default_processing_delay_ms(),
        }
    }
}

/// Hard cap on emergent traits per result.
pub const MAX_EMERGENT_TRAITS: usize = 5;

impl EmergenceConfig {
    /// Copy with every value forced into the range the engine relies on.
    ///
    /// Non-finite numbers fall back to their defaults and `max_traits` is
    /// kept within `1..=5`.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let unit_or = |value: f32, fallback: f32| {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };
        self.novel_synthesis_probability = unit_or(
            self.novel_synthesis_probability,
            default_novel_synthesis_probability(),
        );
        self.mutation_noise = if self.mutation_noise.is_finite() {
            self.mutation_noise.abs().min(1.0)
        } else {
            default_mutation_noise()
        };
        self.adaptive_gene_chance =
            unit_or(self.adaptive_gene_chance, default_adaptive_gene_chance());
        self.learned_gene_chance = unit_or(self.learned_gene_chance, default_learned_gene_chance());
        self.max_traits = self.max_traits.clamp(1, MAX_EMERGENT_TRAITS);
        self
    }

    /// Copy with the processing delay removed.
    #[must_use]
    pub const fn without_delay(mut self) -> Self {
        self.processing_delay_ms = 0;
        self
    }
}

const fn default_novel_synthesis_probability() -> f32 {
    0.15
}

const fn default_mutation_noise() -> f32 {
    0.1
}

const fn default_adaptive_gene_chance() -> f32 {
    0.3
}

const fn default_learned_gene_chance() -> f32 {
    0.2
}

const fn default_max_traits() -> usize {
    MAX_EMERGENT_TRAITS
}

const fn default_processing_delay_ms() -> u64 {
    80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_caps_traits_and_repairs_noise() {
        let config = EmergenceConfig {
            max_traits: 12,
            mutation_noise: f32::NAN,
            novel_synthesis_probability: 3.0,
            ..EmergenceConfig::default()
        }
        .sanitized();
        assert_eq!(config.max_traits, MAX_EMERGENT_TRAITS);
        assert!((config.mutation_noise - 0.1).abs() < f32::EPSILON);
        assert!((config.novel_synthesis_probability - 1.0).abs() < f32::EPSILON);

        let negative = EmergenceConfig {
            max_traits: 0,
            mutation_noise: -0.3,
            ..EmergenceConfig::default()
        }
        .sanitized();
        assert_eq!(negative.max_traits, 1);
        assert!((negative.mutation_noise - 0.3).abs() < f32::EPSILON);
    }
}
