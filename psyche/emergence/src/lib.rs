#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Emergent behaviour: personality genes shaped by contextual pressure,
//! mutation, trait detection and generational evolution.

/// Runtime tunables.
pub mod config;
/// Async engine entry points and result types.
pub mod engine;
/// Generational evolution of behaviour DNA.
pub mod evolution;
/// Genes and DNA.
pub mod gene;
/// Contextual pressure and mutation.
pub mod pressure;
/// Spontaneous behaviour and emergence assessment.
pub mod spontaneous;
/// Emergent trait rules.
pub mod traits;

pub use config::{EmergenceConfig, MAX_EMERGENT_TRAITS};
pub use engine::{BehaviorCoherence, EmergentBehaviorEngine, EmergentBehaviorResult, EmergentResponse};
pub use evolution::BehaviorFeedback;
pub use gene::{extract_genes, BehaviorDNA, BehaviorGene, EvolutionEvent, GeneFamily, BASE_MUTATION_RATE};
pub use pressure::{apply_pressures, mutate, ContextualPressure, PressureType};
pub use spontaneous::{
    BehaviorConsciousnessEmergence, EmergencePhase, SpontaneousBehavior, SpontaneousBehaviorType,
};
pub use traits::{detect_emergent_traits, EmergenceType, EmergentTrait};
