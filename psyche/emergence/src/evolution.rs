use chrono::Utc;
use indexmap::IndexMap;
use psyche_persona::Variable;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::gene::{BehaviorDNA, BehaviorGene, EvolutionEvent, GeneFamily};

const SUCCESS_THRESHOLD: f32 = 0.7;
const LEARNED_THRESHOLD: f32 = 0.8;
const ADAPTIVE_PRESSURE: f32 = 0.6;
const UNMATCHED_DECAY: f32 = 0.95;
const HYBRID_PREFIX: &str = "hybrid_";

/// Observed outcome of a behaviour pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorFeedback {
    /// Pattern label, matched against gene trait names by substring.
    pub pattern: String,
    /// Share of successful uses, `[0, 1]`.
    pub success_rate: f32,
    /// Number of observations.
    #[serde(default)]
    pub occurrences: u32,
}

impl BehaviorFeedback {
    /// Creates feedback for `pattern`.
    #[must_use]
    pub fn new(pattern: impl Into<String>, success_rate: f32) -> Self {
        Self {
            pattern: pattern.into(),
            success_rate,
            occurrences: 1,
        }
    }
}

/// Chances for stochastic gene creation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EvolutionOdds {
    pub adaptive: f32,
    pub learned: f32,
}

fn matches(trait_name: &str, pattern: &str) -> bool {
    !pattern.is_empty() && (trait_name.contains(pattern) || pattern.contains(trait_name))
}

fn has_gene(genes: &[BehaviorGene], trait_name: &str) -> bool {
    genes.iter().any(|gene| gene.trait_name == trait_name)
}

/// Shannon entropy of the family distribution in bits, divided by 3.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn genetic_diversity(genes: &[BehaviorGene]) -> f32 {
    if genes.is_empty() {
        return 0.0;
    }
    let total = genes.len() as f32;
    let entropy: f32 = GeneFamily::ALL
        .iter()
        .map(|family| genes.iter().filter(|g| g.gene_family == *family).count())
        .filter(|count| *count > 0)
        .map(|count| {
            let p = count as f32 / total;
            -p * p.log2()
        })
        .sum();
    (entropy / 3.0).clamp(0.0, 1.0)
}

#[allow(clippy::cast_precision_loss)]
fn fitness(genes: &[BehaviorGene], successful: &[&BehaviorFeedback]) -> f32 {
    let strength = if genes.is_empty() {
        0.0
    } else {
        genes.iter().map(BehaviorGene::strength).sum::<f32>() / genes.len() as f32
    };
    let alignment = if successful.is_empty() {
        0.5
    } else {
        let matched = successful
            .iter()
            .filter(|fb| genes.iter().any(|g| matches(&g.trait_name, &fb.pattern)))
            .count();
        matched as f32 / successful.len() as f32
    };
    0.4f32
        .mul_add(strength, 0.4f32.mul_add(alignment, 0.2 * genetic_diversity(genes)))
        .clamp(0.0, 1.0)
}

/// Breeds one hybrid per family with at least two non-hybrid members,
/// replacing an existing hybrid of the same name.
fn crossbreed(genes: &mut Vec<BehaviorGene>) -> Vec<String> {
    let mut created = Vec::new();
    for family in GeneFamily::ALL {
        let parents: Vec<&BehaviorGene> = genes
            .iter()
            .filter(|g| g.gene_family == family && !g.trait_name.starts_with(HYBRID_PREFIX))
            .take(2)
            .collect();
        let [first, second] = parents.as_slice() else {
            continue;
        };
        let hybrid = BehaviorGene {
            trait_name: format!("{HYBRID_PREFIX}{}_{}", first.trait_name, second.trait_name),
            expression: (first.expression + second.expression) / 2.0,
            dominance: first.dominance.max(second.dominance),
            mutation_rate: (first.mutation_rate + second.mutation_rate) / 2.0,
            gene_family: family,
        };
        created.push(hybrid.trait_name.clone());
        if let Some(existing) = genes.iter_mut().find(|g| g.trait_name == hybrid.trait_name) {
            *existing = hybrid;
        } else {
            genes.push(hybrid);
        }
    }
    created
}

pub(crate) fn evolve<R: Rng>(
    dna: &BehaviorDNA,
    feedback: &[BehaviorFeedback],
    environmental_pressures: &IndexMap<String, f32>,
    odds: EvolutionOdds,
    rng: &mut R,
) -> BehaviorDNA {
    let successful: Vec<&BehaviorFeedback> = feedback
        .iter()
        .filter(|fb| fb.success_rate > SUCCESS_THRESHOLD)
        .collect();

    let mut selected_traits = Vec::new();
    let mut genes: Vec<BehaviorGene> = dna
        .genes
        .iter()
        .map(|gene| {
            let rates: Vec<f32> = successful
                .iter()
                .filter(|fb| matches(&gene.trait_name, &fb.pattern))
                .map(|fb| fb.success_rate.clamp(0.0, 1.0))
                .collect();
            let mut next = gene.clone();
            if rates.is_empty() {
                next.dominance = Variable::new("dominance", gene.dominance * UNMATCHED_DECAY).value();
            } else {
                #[allow(clippy::cast_precision_loss)]
                let mean = rates.iter().sum::<f32>() / rates.len() as f32;
                let mut dominance = Variable::new("dominance", gene.dominance);
                let mut expression = Variable::new("expression", gene.expression);
                next.dominance = dominance.add(mean * 0.1);
                next.expression = expression.add(mean * 0.05);
                selected_traits.push(gene.trait_name.clone());
            }
            next
        })
        .collect();

    let mut new_traits = Vec::new();
    for (key, intensity) in environmental_pressures {
        if *intensity > ADAPTIVE_PRESSURE && rng.gen::<f32>() < odds.adaptive {
            let name = format!("adaptive_{key}");
            if !has_gene(&genes, &name) {
                genes.push(BehaviorGene {
                    mutation_rate: 0.1,
                    ..BehaviorGene::new(name.clone(), intensity * 0.6, GeneFamily::Adaptive)
                });
                new_traits.push(name);
            }
        }
    }
    for fb in feedback {
        if fb.success_rate >= LEARNED_THRESHOLD && rng.gen::<f32>() < odds.learned {
            let name = format!("learned_{}", fb.pattern);
            if !has_gene(&genes, &name) {
                let family = dna
                    .genes
                    .iter()
                    .find(|g| matches(&g.trait_name, &fb.pattern))
                    .map_or(GeneFamily::Adaptive, |g| g.gene_family);
                genes.push(BehaviorGene::new(name.clone(), fb.success_rate * 0.7, family));
                new_traits.push(name);
            }
        }
    }
    new_traits.extend(crossbreed(&mut genes));

    let generation = dna.generation.saturating_add(1);
    let fitness = fitness(&genes, &successful);
    let mut evolution_history = dna.evolution_history.clone();
    evolution_history.push(EvolutionEvent {
        generation,
        selected_traits,
        new_traits,
        pressure_keys: environmental_pressures.keys().cloned().collect(),
        fitness,
        timestamp: Utc::now(),
    });
    BehaviorDNA {
        genes,
        generation,
        evolution_history,
        fitness,
    }
}

#[cfg(test)]
mod tests {
    use psyche_persona::PersonalityProfile;
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    const NEVER: EvolutionOdds = EvolutionOdds {
        adaptive: 0.0,
        learned: 0.0,
    };

    #[test]
    fn successful_patterns_select_genes() {
        let dna = BehaviorDNA::from_personality(&PersonalityProfile::default(), &[]);
        let feedback = vec![BehaviorFeedback::new("curio", 0.9), BehaviorFeedback::new("humor", 0.2)];
        let next = evolve(&dna, &feedback, &IndexMap::new(), NEVER, &mut SmallRng::seed_from_u64(1));
        let before = dna.gene("curiosity").unwrap();
        let after = next.gene("curiosity").unwrap();
        assert!((after.dominance - (before.dominance + 0.09)).abs() < 1e-6);
        let humor_before = dna.gene("humor").unwrap().dominance;
        assert!((next.gene("humor").unwrap().dominance - humor_before * 0.95).abs() < 1e-6);
        assert_eq!(next.evolution_history[0].selected_traits, vec!["curiosity"]);
    }

    #[test]
    fn one_hybrid_per_family() {
        let dna = BehaviorDNA::from_personality(&PersonalityProfile::default(), &[]);
        let first = evolve(&dna, &[], &IndexMap::new(), NEVER, &mut SmallRng::seed_from_u64(1));
        assert_eq!(first.genes.len(), 15);
        assert!(first.gene("hybrid_curiosity_diligence").is_some());
        let second = evolve(&first, &[], &IndexMap::new(), NEVER, &mut SmallRng::seed_from_u64(1));
        assert_eq!(second.genes.len(), 15);
        assert_eq!(second.generation, 2);
        assert_eq!(second.evolution_history.len(), 2);
    }

    #[test]
    fn certain_odds_add_adaptive_and_learned_genes() {
        let dna = BehaviorDNA::from_personality(&PersonalityProfile::default(), &[]);
        let pressures = IndexMap::from([("crowd".to_string(), 0.9), ("quiet".to_string(), 0.2)]);
        let feedback = vec![BehaviorFeedback::new("storytelling", 0.95)];
        let always = EvolutionOdds {
            adaptive: 1.0,
            learned: 1.0,
        };
        let next = evolve(&dna, &feedback, &pressures, always, &mut SmallRng::seed_from_u64(4));
        assert!(next.gene("adaptive_crowd").is_some());
        assert!(next.gene("adaptive_quiet").is_none());
        assert_eq!(
            next.gene("learned_storytelling").unwrap().gene_family,
            GeneFamily::Adaptive
        );
        assert_eq!(next.evolution_history[0].pressure_keys, vec!["crowd", "quiet"]);
    }

    #[test]
    fn diversity_is_normalized_entropy() {
        let dna = BehaviorDNA::from_personality(&PersonalityProfile::default(), &[]);
        // Five equally sized families.
        assert!((genetic_diversity(&dna.genes) - 5f32.log2() / 3.0).abs() < 1e-5);
        assert!(genetic_diversity(&dna.genes[..1]).abs() < f32::EPSILON);
    }
}
