#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Self-awareness engine: behavioural self-analysis, emotional self-awareness,
//! self-examination, internal monologue and evolution tracking.

/// Async engine entry points.
pub mod engine;
/// Trend tracking across successive insights.
pub mod evolution;
/// Self-examination over dialogue history.
pub mod examination;
/// Behavioural and emotional self-analysis.
pub mod insight;
/// Narrative thoughts derived from state and insight.
pub mod monologue;
mod stats;

pub use engine::{SelfAwarenessConfig, SelfAwarenessEngine};
pub use evolution::{EvolutionTrend, SelfAwarenessEvolution};
pub use examination::{
    ImprovementInsight, PersonalityConsistencyAnalysis, ResponsePatternAnalysis,
    SelfExaminationResult, UncertaintyMarker, UncertaintyType,
};
pub use insight::{
    BehaviorSelfAnalysis, EmotionalSelfAwareness, MetacognitiveInsight, MetacognitiveInsightType,
    ProcessingMetrics, SelfAwarenessInsight,
};
pub use monologue::{InternalMonologue, MonologueTheme, MonologueThought};
