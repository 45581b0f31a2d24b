use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use psyche_consciousness::ConsciousnessState;
use psyche_logging::{LogLevel, Telemetry};
use psyche_persona::{DialogueEntry, PersonalityProfile};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::sleep;

use crate::{
    config::EmergenceConfig,
    evolution::{self, BehaviorFeedback, EvolutionOdds},
    gene::{extract_genes, topic_diversity, BehaviorDNA, BehaviorGene},
    pressure::{apply_pressures, mutate, ContextualPressure},
    spontaneous::{self, BehaviorConsciousnessEmergence, SpontaneousBehavior},
    traits::{detect_emergent_traits, EmergenceType, EmergentTrait},
};

/// Agreement of the emergent behaviour with who the character is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorCoherence {
    /// How close the expressed genes stay to the extracted baseline.
    pub personality_alignment: f32,
    /// How well trait novelty matches the exploratory range of the history.
    pub history_consistency: f32,
    /// Mean of the two.
    pub overall: f32,
}

/// Reply modifier derived from one emergent trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergentResponse {
    /// Trait the modifier comes from.
    pub trait_name: String,
    /// Hint for the reply generator.
    pub modifier: String,
    /// Novelty, `[0, 1]`.
    pub novelty: f32,
    /// Coherence with the personality, `[0, 1]`.
    pub coherence: f32,
    /// `novelty · (1 - coherence)`.
    pub unexpectedness: f32,
}

/// Output of one emergent behaviour pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergentBehaviorResult {
    /// Genes after pressure and mutation.
    pub genes: Vec<BehaviorGene>,
    /// Genes that mutated.
    pub mutated_genes: Vec<String>,
    /// Detected traits, at most the configured cap.
    pub emergent_traits: Vec<EmergentTrait>,
    /// Coherence validation.
    pub coherence: BehaviorCoherence,
    /// One modifier per trait.
    pub responses: Vec<EmergentResponse>,
    /// `0.4·count/5 + 0.3·min(1, Σstrength/3) + 0.3·mean expression`.
    pub emergence_level: f32,
    /// Blend of trait novelty and gene drift.
    pub behavior_novelty: f32,
    /// Blend of coherence, emergence and dominance.
    pub evolutionary_fitness: f32,
    /// When the pass ran.
    pub generated_at: DateTime<Utc>,
}

#[allow(clippy::cast_precision_loss)]
fn mean_by(genes: &[BehaviorGene], f: impl Fn(&BehaviorGene) -> f32) -> f32 {
    if genes.is_empty() {
        0.0
    } else {
        genes.iter().map(f).sum::<f32>() / genes.len() as f32
    }
}

fn mean_drift(baseline: &[BehaviorGene], current: &[BehaviorGene]) -> f32 {
    let diffs: Vec<f32> = baseline
        .iter()
        .zip(current)
        .map(|(a, b)| (a.expression - b.expression).abs())
        .collect();
    if diffs.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let len = diffs.len() as f32;
    diffs.iter().sum::<f32>() / len
}

fn validate_coherence(
    baseline: &[BehaviorGene],
    genes: &[BehaviorGene],
    traits: &[EmergentTrait],
    history: &[DialogueEntry],
) -> BehaviorCoherence {
    let personality_alignment = (1.0 - mean_drift(baseline, genes)).clamp(0.0, 1.0);
    let trait_novelty = if traits.is_empty() {
        0.5
    } else {
        #[allow(clippy::cast_precision_loss)]
        let len = traits.len() as f32;
        traits.iter().map(|t| t.novelty).sum::<f32>() / len
    };
    let history_consistency = (1.0 - (trait_novelty - topic_diversity(history)).abs()).clamp(0.0, 1.0);
    BehaviorCoherence {
        personality_alignment,
        history_consistency,
        overall: (personality_alignment + history_consistency) / 2.0,
    }
}

fn response_for(emergent: &EmergentTrait, coherence: f32) -> EmergentResponse {
    let modifier = match emergent.emergence_type {
        EmergenceType::GeneCombination => {
            format!("blend {} into one gesture", emergent.origin_genes.join(" and "))
        }
        EmergenceType::ThresholdEmergence => {
            let origin = emergent.origin_genes.first().map_or("it", String::as_str);
            format!("lean hard into {origin}")
        }
        EmergenceType::NovelSynthesis => {
            format!("try an unfamiliar mix of {}", emergent.origin_genes.join(", "))
        }
    };
    let coherence = (coherence * (0.5 + emergent.strength / 2.0)).clamp(0.0, 1.0);
    EmergentResponse {
        trait_name: emergent.name.clone(),
        modifier,
        novelty: emergent.novelty,
        coherence,
        unexpectedness: (emergent.novelty * (1.0 - coherence)).clamp(0.0, 1.0),
    }
}

/// Models personality as genes under pressure and detects emergent traits.
#[derive(Debug)]
pub struct EmergentBehaviorEngine {
    config: EmergenceConfig,
    rng: Mutex<SmallRng>,
    telemetry: Option<Telemetry>,
}

impl Default for EmergentBehaviorEngine {
    fn default() -> Self {
        Self::new(EmergenceConfig::default())
    }
}

impl EmergentBehaviorEngine {
    /// Creates an engine seeded from entropy. The config is sanitized first.
    #[must_use]
    pub fn new(config: EmergenceConfig) -> Self {
        Self {
            config: config.sanitized(),
            rng: Mutex::new(SmallRng::from_entropy()),
            telemetry: None,
        }
    }

    /// Creates an engine with a deterministic seed.
    #[must_use]
    pub fn seeded(config: EmergenceConfig, seed: u64) -> Self {
        Self {
            config: config.sanitized(),
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
            telemetry: None,
        }
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Active tunables.
    #[must_use]
    pub const fn config(&self) -> &EmergenceConfig {
        &self.config
    }

    async fn simulate_processing(&self) {
        if self.config.processing_delay_ms > 0 {
            sleep(Duration::from_millis(self.config.processing_delay_ms)).await;
        }
    }

    /// Extracts genes, applies pressure and mutation, then detects and
    /// scores emergent traits.
    pub async fn generate_emergent_behavior(
        &self,
        base_personality: &PersonalityProfile,
        contextual_pressures: &[ContextualPressure],
        conversation_history: &[DialogueEntry],
        consciousness_state: &ConsciousnessState,
    ) -> EmergentBehaviorResult {
        self.simulate_processing().await;
        let awareness = consciousness_state.awareness_level;
        let baseline = extract_genes(base_personality, conversation_history);
        let mut genes = apply_pressures(&baseline, contextual_pressures, awareness);
        let (mutated_genes, emergent_traits) = {
            let mut rng = self.rng.lock();
            let mutated = mutate(&mut genes, awareness, self.config.mutation_noise, &mut *rng);
            let traits = detect_emergent_traits(
                &genes,
                self.config.novel_synthesis_probability,
                self.config.max_traits,
                &mut *rng,
            );
            (mutated, traits)
        };

        let coherence = validate_coherence(&baseline, &genes, &emergent_traits, conversation_history);
        let responses: Vec<EmergentResponse> = emergent_traits
            .iter()
            .map(|t| response_for(t, coherence.overall))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let trait_count = emergent_traits.len() as f32;
        let strength_sum: f32 = emergent_traits.iter().map(|t| t.strength).sum();
        let mean_expression = mean_by(&genes, |g| g.expression);
        let emergence_level = 0.4f32
            .mul_add(
                trait_count / 5.0,
                0.3f32.mul_add((strength_sum / 3.0).min(1.0), 0.3 * mean_expression),
            )
            .clamp(0.0, 1.0);
        let trait_novelty = if emergent_traits.is_empty() {
            0.0
        } else {
            emergent_traits.iter().map(|t| t.novelty).sum::<f32>() / trait_count
        };
        let drift = (mean_drift(&baseline, &genes) * 5.0).min(1.0);
        let behavior_novelty = 0.6f32.mul_add(trait_novelty, 0.4 * drift).clamp(0.0, 1.0);
        let evolutionary_fitness = 0.4f32
            .mul_add(
                coherence.overall,
                0.3f32.mul_add(emergence_level, 0.3 * mean_by(&genes, |g| g.dominance)),
            )
            .clamp(0.0, 1.0);

        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Info,
                "emergence.behavior.generated",
                json!({
                    "traits": emergent_traits.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                    "emergence_level": emergence_level,
                    "pressures": contextual_pressures.len(),
                }),
            );
            if !emergent_traits.is_empty() {
                let _ = tel
                    .event(
                        "emergence.traits.detected",
                        json!({
                            "traits": emergent_traits,
                            "emergence_level": emergence_level,
                        }),
                    )
                    .await;
            }
        }

        EmergentBehaviorResult {
            genes,
            mutated_genes,
            emergent_traits,
            coherence,
            responses,
            emergence_level,
            behavior_novelty,
            evolutionary_fitness,
            generated_at: Utc::now(),
        }
    }

    /// Advances `current_dna` by exactly one generation.
    pub async fn evolve_behavior_dna(
        &self,
        current_dna: &BehaviorDNA,
        feedback: &[BehaviorFeedback],
        environmental_pressures: &IndexMap<String, f32>,
    ) -> BehaviorDNA {
        self.simulate_processing().await;
        let odds = EvolutionOdds {
            adaptive: self.config.adaptive_gene_chance,
            learned: self.config.learned_gene_chance,
        };
        let next = {
            let mut rng = self.rng.lock();
            evolution::evolve(current_dna, feedback, environmental_pressures, odds, &mut *rng)
        };
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Info,
                "emergence.dna.evolved",
                json!({
                    "generation": next.generation,
                    "genes": next.genes.len(),
                    "fitness": next.fitness,
                }),
            );
        }
        next
    }

    /// Unprompted behaviours suggested by personality and state.
    pub async fn generate_spontaneous_behavior(
        &self,
        personality: &PersonalityProfile,
        consciousness_state: &ConsciousnessState,
    ) -> Vec<SpontaneousBehavior> {
        self.simulate_processing().await;
        let mut rng = self.rng.lock();
        spontaneous::spontaneous(personality, consciousness_state, &mut *rng)
    }

    /// Assesses how far behaviour-level consciousness has emerged.
    pub async fn simulate_behavior_consciousness_emergence(
        &self,
        behavior: &EmergentBehaviorResult,
        consciousness_state: &ConsciousnessState,
    ) -> BehaviorConsciousnessEmergence {
        self.simulate_processing().await;
        spontaneous::assess(behavior, consciousness_state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use psyche_event_bus::{EventPublisher, MemoryEventBus};

    use super::*;
    use crate::{config::MAX_EMERGENT_TRAITS, pressure::PressureType, spontaneous::EmergencePhase};

    fn engine(seed: u64) -> EmergentBehaviorEngine {
        EmergentBehaviorEngine::seeded(EmergenceConfig::default().without_delay(), seed)
    }

    fn pressure(intensity: f32) -> Vec<ContextualPressure> {
        vec![ContextualPressure::new(PressureType::Environmental, intensity).affecting("curiosity")]
    }

    fn curious() -> PersonalityProfile {
        PersonalityProfile {
            curiosity: 0.85,
            openness: 0.85,
            empathy: 0.85,
            ..PersonalityProfile::default()
        }
    }

    #[tokio::test]
    async fn stronger_pressure_never_lowers_emergence() {
        let state = ConsciousnessState::default();
        let trials = 40;
        let (mut level_high, mut level_low) = (0.0, 0.0);
        let (mut traits_high, mut traits_low) = (0, 0);
        for seed in 0..trials {
            let high = engine(seed)
                .generate_emergent_behavior(&curious(), &pressure(0.9), &[], &state)
                .await;
            let low = engine(seed)
                .generate_emergent_behavior(&curious(), &pressure(0.2), &[], &state)
                .await;
            level_high += high.emergence_level;
            level_low += low.emergence_level;
            traits_high += high.emergent_traits.len();
            traits_low += low.emergent_traits.len();
        }
        assert!(level_high >= level_low);
        assert!(traits_high >= traits_low);
    }

    #[tokio::test]
    async fn results_stay_in_range_for_extreme_input() {
        let extreme = PersonalityProfile {
            openness: 1.0,
            conscientiousness: 1.0,
            extraversion: 1.0,
            agreeableness: 1.0,
            neuroticism: 1.0,
            curiosity: 1.0,
            empathy: 1.0,
            humor: 1.0,
            ..PersonalityProfile::default()
        };
        let state = ConsciousnessState {
            awareness_level: 1.0,
            ..ConsciousnessState::default()
        };
        let pressures = vec![
            ContextualPressure::new(PressureType::Cognitive, 50.0),
            ContextualPressure::new(PressureType::Social, -50.0),
        ];
        let result = engine(7)
            .generate_emergent_behavior(&extreme, &pressures, &[], &state)
            .await;
        assert!(result.emergent_traits.len() <= 5);
        assert_eq!(result.responses.len(), result.emergent_traits.len());
        for value in [
            result.emergence_level,
            result.behavior_novelty,
            result.evolutionary_fitness,
            result.coherence.overall,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert!(result
            .genes
            .iter()
            .all(|g| (0.0..=1.0).contains(&g.expression) && (0.0..=1.0).contains(&g.dominance)));
    }

    #[tokio::test]
    async fn misconfigured_engine_still_caps_traits() {
        let saturated = PersonalityProfile {
            openness: 1.0,
            conscientiousness: 1.0,
            extraversion: 1.0,
            agreeableness: 1.0,
            curiosity: 1.0,
            empathy: 1.0,
            humor: 1.0,
            ..PersonalityProfile::default()
        };
        let config = EmergenceConfig {
            max_traits: 12,
            mutation_noise: f32::NAN,
            novel_synthesis_probability: 1.0,
            ..EmergenceConfig::default().without_delay()
        };
        let engine = EmergentBehaviorEngine::seeded(config, 2);
        assert_eq!(engine.config().max_traits, MAX_EMERGENT_TRAITS);
        let pressures = vec![
            ContextualPressure::new(PressureType::Cognitive, 1.0),
            ContextualPressure::new(PressureType::Social, 1.0),
            ContextualPressure::new(PressureType::Expressive, 1.0),
        ];
        let state = ConsciousnessState {
            awareness_level: 1.0,
            ..ConsciousnessState::default()
        };
        for _ in 0..5 {
            let result = engine
                .generate_emergent_behavior(&saturated, &pressures, &[], &state)
                .await;
            assert!(result.emergent_traits.len() <= MAX_EMERGENT_TRAITS);
        }
    }

    #[tokio::test]
    async fn empathetic_curiosity_emerges_for_curious_personality() {
        let config = EmergenceConfig {
            mutation_noise: 0.0,
            ..EmergenceConfig::default().without_delay()
        };
        let result = EmergentBehaviorEngine::seeded(config, 3)
            .generate_emergent_behavior(&curious(), &pressure(0.9), &[], &ConsciousnessState::default())
            .await;
        assert!(result
            .emergent_traits
            .iter()
            .any(|t| t.name == "empathetic_curiosity"));
    }

    #[tokio::test]
    async fn evolution_advances_one_generation() {
        let engine = engine(1);
        let dna = BehaviorDNA::from_personality(&PersonalityProfile::default(), &[]);
        let pressures = IndexMap::from([("crowd".to_string(), 0.9)]);
        let feedback = vec![BehaviorFeedback::new("empathy", 0.85)];
        let mut current = dna;
        for expected in 1..=4 {
            current = engine.evolve_behavior_dna(&current, &feedback, &pressures).await;
            assert_eq!(current.generation, expected);
            assert_eq!(current.evolution_history.len(), expected as usize);
            assert!((0.0..=1.0).contains(&current.fitness));
        }
    }

    #[tokio::test]
    async fn emergence_assessment_uses_phase_thresholds() {
        let engine = engine(5);
        let state = ConsciousnessState {
            awareness_level: 0.9,
            metacognition_level: 0.9,
            ..ConsciousnessState::default()
        };
        let behavior = engine
            .generate_emergent_behavior(&curious(), &pressure(0.9), &[], &state)
            .await;
        let emergence = engine
            .simulate_behavior_consciousness_emergence(&behavior, &state)
            .await;
        assert!(emergence.indicators.contains(&"heightened_awareness".to_string()));
        assert!(emergence.indicators.contains(&"metacognitive_depth".to_string()));
        // Two indicators plus 0.4·0.9 already exceed 0.6.
        assert!(emergence.emergence_probability > 0.6);
        assert!(matches!(
            emergence.phase,
            EmergencePhase::EmergentPatterns | EmergencePhase::FullEmergence
        ));
    }

    #[tokio::test]
    async fn spontaneous_behaviors_are_bounded() {
        let engine = engine(9);
        let state = ConsciousnessState::default();
        for _ in 0..20 {
            let behaviors = engine
                .generate_spontaneous_behavior(&curious(), &state)
                .await;
            assert!(behaviors.len() <= 4);
            assert!(behaviors.iter().all(|b| (0.0..=1.0).contains(&b.intensity)));
        }
    }

    #[tokio::test]
    async fn detected_traits_are_logged_and_published() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emergence.log");
        let bus = Arc::new(MemoryEventBus::new(16));
        let publisher: Arc<dyn EventPublisher> = bus.clone();
        let telemetry = Telemetry::builder("emergence")
            .log_path(&path)
            .event_publisher(publisher)
            .build()
            .unwrap();
        let config = EmergenceConfig {
            mutation_noise: 0.0,
            ..EmergenceConfig::default().without_delay()
        };
        let engine = EmergentBehaviorEngine::seeded(config, 11).with_telemetry(telemetry);
        engine
            .generate_emergent_behavior(&curious(), &pressure(0.9), &[], &ConsciousnessState::default())
            .await;
        let log = std::fs::read_to_string(path).unwrap();
        assert!(log.contains("emergence.behavior.generated"));
        assert_eq!(bus.replay("emergence.traits").len(), 1);
    }
}
