use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::gene::BehaviorGene;

const COMBINATION_THRESHOLD: f32 = 0.7;
const HYPER_EXPRESSION: f32 = 0.85;
const HYPER_DOMINANCE: f32 = 0.8;
const SYNTHESIS_MEAN: f32 = 0.6;
const SYNTHESIS_SAMPLE: usize = 3;

/// How a trait came about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergenceType {
    /// Two genes reinforcing each other.
    GeneCombination,
    /// One gene pushed past its limits.
    ThresholdEmergence,
    /// A random blend of several genes.
    NovelSynthesis,
}

/// Behaviour pattern not explicitly authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergentTrait {
    /// Trait name.
    pub name: String,
    /// Strength, `[0, 1]`.
    pub strength: f32,
    /// Genes it emerged from.
    pub origin_genes: Vec<String>,
    /// Mechanism.
    pub emergence_type: EmergenceType,
    /// How surprising it is, `[0, 1]`.
    pub novelty: f32,
}

fn expression_of(genes: &[BehaviorGene], trait_name: &str) -> f32 {
    genes
        .iter()
        .find(|gene| gene.trait_name == trait_name)
        .map_or(0.0, |gene| gene.expression)
}

/// Runs the combination, threshold and synthesis rules in that order and
/// keeps the first `max_traits` results.
///
/// The synthesis sample and draw are always taken so equal seeds stay
/// aligned.
pub fn detect_emergent_traits<R: Rng>(
    genes: &[BehaviorGene],
    synthesis_probability: f32,
    max_traits: usize,
    rng: &mut R,
) -> Vec<EmergentTrait> {
    let mut traits = Vec::new();

    let curiosity = expression_of(genes, "curiosity");
    let openness = expression_of(genes, "emotional_openness");
    if curiosity * openness > COMBINATION_THRESHOLD {
        traits.push(EmergentTrait {
            name: "empathetic_curiosity".into(),
            strength: (curiosity * openness).min(1.0),
            origin_genes: vec!["curiosity".into(), "emotional_openness".into()],
            emergence_type: EmergenceType::GeneCombination,
            novelty: 0.6,
        });
    }

    for gene in genes {
        if gene.expression > HYPER_EXPRESSION && gene.dominance > HYPER_DOMINANCE {
            traits.push(EmergentTrait {
                name: format!("hyper_{}", gene.trait_name),
                strength: gene.expression,
                origin_genes: vec![gene.trait_name.clone()],
                emergence_type: EmergenceType::ThresholdEmergence,
                novelty: 0.4,
            });
        }
    }

    let sample: Vec<&BehaviorGene> = genes.choose_multiple(rng, SYNTHESIS_SAMPLE).collect();
    let draw: f32 = rng.gen();
    if sample.len() == SYNTHESIS_SAMPLE {
        #[allow(clippy::cast_precision_loss)]
        let mean = sample.iter().map(|gene| gene.expression).sum::<f32>() / SYNTHESIS_SAMPLE as f32;
        if mean > SYNTHESIS_MEAN && draw < synthesis_probability {
            traits.push(EmergentTrait {
                name: "novel_behavioral_synthesis".into(),
                strength: mean,
                origin_genes: sample.iter().map(|gene| gene.trait_name.clone()).collect(),
                emergence_type: EmergenceType::NovelSynthesis,
                novelty: 0.9,
            });
        }
    }

    traits.truncate(max_traits);
    traits
}

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;
    use crate::gene::GeneFamily;

    fn gene(name: &str, expression: f32, dominance: f32) -> BehaviorGene {
        BehaviorGene {
            dominance,
            ..BehaviorGene::new(name, expression, GeneFamily::Cognitive)
        }
    }

    #[test]
    fn combination_and_threshold_rules() {
        let genes = vec![
            gene("curiosity", 0.9, 0.5),
            gene("emotional_openness", 0.9, 0.5),
            gene("humor", 0.9, 0.9),
        ];
        let traits = detect_emergent_traits(&genes, 0.0, 5, &mut SmallRng::seed_from_u64(1));
        let names: Vec<&str> = traits.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["empathetic_curiosity", "hyper_humor"]);
    }

    #[test]
    fn certain_synthesis_fires_on_strong_genes() {
        let genes = vec![gene("a", 0.7, 0.5), gene("b", 0.7, 0.5), gene("c", 0.7, 0.5)];
        let traits = detect_emergent_traits(&genes, 1.0, 5, &mut SmallRng::seed_from_u64(2));
        assert_eq!(traits.len(), 1);
        assert_eq!(traits[0].emergence_type, EmergenceType::NovelSynthesis);
        assert_eq!(traits[0].origin_genes.len(), 3);
    }

    #[test]
    fn traits_are_capped() {
        let genes: Vec<BehaviorGene> = (0..8).map(|i| gene(&format!("g{i}"), 0.95, 0.95)).collect();
        let traits = detect_emergent_traits(&genes, 1.0, 5, &mut SmallRng::seed_from_u64(3));
        assert_eq!(traits.len(), 5);
    }
}
