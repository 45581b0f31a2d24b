use std::collections::HashSet;

use chrono::{DateTime, Utc};
use psyche_persona::{text, DialogueEntry, PersonalityProfile, Variable};
use serde::{Deserialize, Serialize};

/// Mutation rate of freshly extracted genes.
pub const BASE_MUTATION_RATE: f32 = 0.05;

/// Family a gene belongs to; hybrids are bred within a family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeneFamily {
    /// Thinking habits.
    Cognitive,
    /// Behaviour toward others.
    Social,
    /// Feeling habits.
    Emotional,
    /// How things are said.
    Expressive,
    /// Response to change.
    Adaptive,
}

impl GeneFamily {
    /// Every family, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Cognitive,
        Self::Social,
        Self::Emotional,
        Self::Expressive,
        Self::Adaptive,
    ];

    /// Lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cognitive => "cognitive",
            Self::Social => "social",
            Self::Emotional => "emotional",
            Self::Expressive => "expressive",
            Self::Adaptive => "adaptive",
        }
    }
}

/// One quantified personality facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorGene {
    /// Trait name, e.g. `curiosity`.
    #[serde(rename = "trait")]
    pub trait_name: String,
    /// How strongly the trait shows, `[0, 1]`.
    pub expression: f32,
    /// How much the trait wins over others, `[0, 1]`.
    pub dominance: f32,
    /// Base chance of mutating per generation.
    pub mutation_rate: f32,
    /// Family.
    pub gene_family: GeneFamily,
}

impl BehaviorGene {
    /// Creates a gene whose dominance follows its expression.
    #[must_use]
    pub fn new(trait_name: impl Into<String>, expression: f32, gene_family: GeneFamily) -> Self {
        let expression = Variable::new("expression", expression).value();
        let dominance = Variable::new("dominance", (expression - 0.5).mul_add(0.6, 0.5)).value();
        Self {
            trait_name: trait_name.into(),
            expression,
            dominance,
            mutation_rate: BASE_MUTATION_RATE,
            gene_family,
        }
    }

    /// `(expression + dominance) / 2`.
    #[must_use]
    pub fn strength(&self) -> f32 {
        (self.expression + self.dominance) / 2.0
    }
}

/// Record of one evolution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionEvent {
    /// Generation produced by the step.
    pub generation: u32,
    /// Genes reinforced by successful feedback.
    pub selected_traits: Vec<String>,
    /// Genes added by adaptation, learning or crossbreeding.
    pub new_traits: Vec<String>,
    /// Keys of the environmental pressures applied.
    pub pressure_keys: Vec<String>,
    /// Fitness after the step.
    pub fitness: f32,
    /// When the step ran.
    pub timestamp: DateTime<Utc>,
}

/// Gene pool carried across generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDNA {
    /// Genes, in extraction order followed by additions.
    pub genes: Vec<BehaviorGene>,
    /// Number of evolution steps applied.
    pub generation: u32,
    /// One event per evolution step.
    #[serde(default)]
    pub evolution_history: Vec<EvolutionEvent>,
    /// Fitness, `[0, 1]`.
    pub fitness: f32,
}

impl BehaviorDNA {
    /// Generation-zero DNA extracted from a personality and its history.
    #[must_use]
    pub fn from_personality(personality: &PersonalityProfile, history: &[DialogueEntry]) -> Self {
        Self {
            genes: extract_genes(personality, history),
            generation: 0,
            evolution_history: Vec::new(),
            fitness: 0.5,
        }
    }

    /// Gene with the given trait name.
    #[must_use]
    pub fn gene(&self, trait_name: &str) -> Option<&BehaviorGene> {
        self.genes.iter().find(|gene| gene.trait_name == trait_name)
    }
}

/// Fixed-shape gene set derived from personality scalars and history stats.
#[must_use]
pub fn extract_genes(personality: &PersonalityProfile, history: &[DialogueEntry]) -> Vec<BehaviorGene> {
    let p = personality.clamped();
    vec![
        BehaviorGene::new("curiosity", p.curiosity, GeneFamily::Cognitive),
        BehaviorGene::new("diligence", p.conscientiousness, GeneFamily::Cognitive),
        BehaviorGene::new("empathy", p.empathy, GeneFamily::Social),
        BehaviorGene::new("sociability", p.extraversion, GeneFamily::Social),
        BehaviorGene::new(
            "emotional_openness",
            (p.openness + p.empathy) / 2.0,
            GeneFamily::Emotional,
        ),
        BehaviorGene::new(
            "emotional_complexity",
            emotional_complexity(history),
            GeneFamily::Emotional,
        ),
        BehaviorGene::new("humor", p.humor, GeneFamily::Expressive),
        BehaviorGene::new("verbosity", verbosity(history), GeneFamily::Expressive),
        BehaviorGene::new(
            "adaptability",
            (p.openness + (1.0 - p.neuroticism)) / 2.0,
            GeneFamily::Adaptive,
        ),
        BehaviorGene::new("creativity", (p.openness + p.humor) / 2.0, GeneFamily::Adaptive),
    ]
}

/// Mean reply length in characters over 300; 0.5 without history.
#[allow(clippy::cast_precision_loss)]
fn verbosity(history: &[DialogueEntry]) -> f32 {
    if history.is_empty() {
        return 0.5;
    }
    let total: usize = history.iter().map(|entry| entry.response.chars().count()).sum();
    (total as f32 / history.len() as f32 / 300.0).min(1.0)
}

/// Distinct emotions seen in history over 8; 0.3 without any.
#[allow(clippy::cast_precision_loss)]
fn emotional_complexity(history: &[DialogueEntry]) -> f32 {
    let distinct: HashSet<&str> = history
        .iter()
        .flat_map(|entry| entry.emotions.keys().map(String::as_str))
        .collect();
    if distinct.is_empty() {
        0.3
    } else {
        (distinct.len() as f32 / 8.0).min(1.0)
    }
}

/// Distinct prompt topics per entry, `[0, 1]`; 0.5 without history.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn topic_diversity(history: &[DialogueEntry]) -> f32 {
    if history.is_empty() {
        return 0.5;
    }
    let topics: HashSet<String> = history
        .iter()
        .filter_map(|entry| {
            entry
                .topic
                .clone()
                .or_else(|| text::content_tokens(&entry.prompt).into_iter().next())
        })
        .collect();
    (topics.len() as f32 / history.len() as f32).min(1.0)
}

#[cfg(test)]
mod tests {
    use psyche_persona::EmotionMap;

    use super::*;

    #[test]
    fn dominance_tracks_expression() {
        let gene = BehaviorGene::new("curiosity", 1.0, GeneFamily::Cognitive);
        assert!((gene.dominance - 0.8).abs() < 1e-6);
        let gene = BehaviorGene::new("curiosity", 0.0, GeneFamily::Cognitive);
        assert!((gene.dominance - 0.2).abs() < 1e-6);
    }

    #[test]
    fn gene_set_has_fixed_shape() {
        let genes = extract_genes(&PersonalityProfile::default(), &[]);
        assert_eq!(genes.len(), 10);
        for family in GeneFamily::ALL {
            assert_eq!(genes.iter().filter(|g| g.gene_family == family).count(), 2);
        }
        let openness = genes.iter().find(|g| g.trait_name == "emotional_openness").unwrap();
        assert!((openness.expression - 0.6).abs() < 1e-6);
    }

    #[test]
    fn history_stats_shape_genes() {
        let history = vec![DialogueEntry::new("x", "a".repeat(150)).with_emotions(EmotionMap::from([
            ("joy".to_string(), 0.5),
            ("awe".to_string(), 0.5),
        ]))];
        let genes = extract_genes(&PersonalityProfile::default(), &history);
        let verbosity = genes.iter().find(|g| g.trait_name == "verbosity").unwrap();
        assert!((verbosity.expression - 0.5).abs() < 1e-6);
        let complexity = genes
            .iter()
            .find(|g| g.trait_name == "emotional_complexity")
            .unwrap();
        assert!((complexity.expression - 0.25).abs() < 1e-6);
    }

    #[test]
    fn dna_json_round_trip_is_exact() {
        let mut dna = BehaviorDNA::from_personality(&PersonalityProfile::default(), &[]);
        dna.generation = 3;
        dna.fitness = 0.612_345_7;
        dna.genes[0].expression = 0.123_456_79;
        dna.evolution_history.push(EvolutionEvent {
            generation: 3,
            selected_traits: vec!["curiosity".into()],
            new_traits: vec!["hybrid_curiosity_diligence".into()],
            pressure_keys: vec!["crowd".into()],
            fitness: 0.612_345_7,
            timestamp: Utc::now(),
        });
        let json = serde_json::to_string(&dna).unwrap();
        assert!(json.contains("\"trait\":\"curiosity\""));
        let restored: BehaviorDNA = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, dna);
    }
}
