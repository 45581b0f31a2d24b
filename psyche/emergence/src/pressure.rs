use psyche_persona::Variable;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::gene::BehaviorGene;

/// Kind of contextual pressure; matches genes whose trait or family shares
/// the label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PressureType {
    /// Pushes thinking genes.
    Cognitive,
    /// Pushes social genes.
    Social,
    /// Pushes emotional genes.
    Emotional,
    /// Pushes expressive genes.
    Expressive,
    /// Pushes adaptive genes.
    Adaptive,
    /// Applies only to the listed traits.
    Environmental,
}

impl PressureType {
    /// Lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cognitive => "cognitive",
            Self::Social => "social",
            Self::Emotional => "emotional",
            Self::Expressive => "expressive",
            Self::Adaptive => "adaptive",
            Self::Environmental => "environmental",
        }
    }
}

/// Situational force acting on genes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualPressure {
    /// Kind.
    pub pressure_type: PressureType,
    /// Strength; negative values push the other way.
    pub intensity: f32,
    /// Multiplier applied to the intensity.
    pub selection_strength: f32,
    /// Trait names the pressure targets directly.
    #[serde(default)]
    pub affected_traits: Vec<String>,
}

impl ContextualPressure {
    /// Creates a pressure with selection strength 1.
    #[must_use]
    pub fn new(pressure_type: PressureType, intensity: f32) -> Self {
        Self {
            pressure_type,
            intensity,
            selection_strength: 1.0,
            affected_traits: Vec::new(),
        }
    }

    /// Sets the selection strength.
    #[must_use]
    pub const fn with_selection_strength(mut self, selection_strength: f32) -> Self {
        self.selection_strength = selection_strength;
        self
    }

    /// Adds a directly targeted trait.
    #[must_use]
    pub fn affecting(mut self, trait_name: impl Into<String>) -> Self {
        self.affected_traits.push(trait_name.into());
        self
    }

    /// Whether the pressure acts on `gene`.
    #[must_use]
    pub fn applies_to(&self, gene: &BehaviorGene) -> bool {
        self.affected_traits.iter().any(|t| t == &gene.trait_name)
            || self.pressure_type.label() == gene.trait_name
            || self.pressure_type.label() == gene.gene_family.label()
    }

    /// `intensity · selection_strength`, 0 for non-finite inputs.
    #[must_use]
    pub fn force(&self) -> f32 {
        let force = self.intensity * self.selection_strength;
        if force.is_finite() {
            force
        } else {
            0.0
        }
    }
}

/// Applies summed pressure plus `0.3·awareness` to every gene.
///
/// Opposing pressures cancel algebraically.
#[must_use]
pub fn apply_pressures(
    genes: &[BehaviorGene],
    pressures: &[ContextualPressure],
    awareness: f32,
) -> Vec<BehaviorGene> {
    let awareness = if awareness.is_finite() { awareness } else { 0.0 };
    genes
        .iter()
        .map(|gene| {
            let total: f32 = pressures
                .iter()
                .filter(|p| p.applies_to(gene))
                .map(ContextualPressure::force)
                .sum::<f32>()
                + awareness * 0.3;
            let mut expression = Variable::new("expression", gene.expression);
            let mut dominance = Variable::new("dominance", gene.dominance);
            expression.add(total * 0.1);
            dominance.add(total * 0.05);
            BehaviorGene {
                expression: expression.value(),
                dominance: dominance.value(),
                ..gene.clone()
            }
        })
        .collect()
}

/// Mutates each gene with probability `mutation_rate·(1+awareness)`,
/// shifting expression by `U[-noise, noise]`.
///
/// Always draws two numbers per gene, the roll and the shift, so equal seeds
/// stay aligned. A non-finite `noise` mutates nothing.
pub fn mutate<R: Rng>(
    genes: &mut [BehaviorGene],
    awareness: f32,
    noise: f32,
    rng: &mut R,
) -> Vec<String> {
    let noise = if noise.is_finite() { noise.abs().min(1.0) } else { 0.0 };
    let mut mutated = Vec::new();
    for gene in genes {
        let chance = gene.mutation_rate * (1.0 + awareness);
        let roll: f32 = rng.gen();
        let shift: f32 = rng.gen_range(-noise..=noise);
        if roll < chance {
            let mut expression = Variable::new("expression", gene.expression);
            gene.expression = expression.add(shift);
            mutated.push(gene.trait_name.clone());
        }
    }
    mutated
}
