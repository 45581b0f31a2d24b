#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Consciousness simulation: attention, awareness, cognitive load, and the
//! manager that owns the single live [`ConsciousnessState`].

/// Attention focus and awareness models.
pub mod attention;
/// Runtime tunables.
pub mod config;
/// Idle-period decay and reporting.
pub mod idle;
/// Cognitive load aggregation.
pub mod load;
/// Single-writer state manager.
pub mod manager;
/// State snapshot, events, and quality metrics.
pub mod state;
/// Per-turn stimulus extraction.
pub mod stimuli;
/// Transition detection between two snapshots.
pub mod transition;

pub use attention::{calculate_awareness_level, update_attention_focus, AttentionFocus};
pub use config::ConsciousnessConfig;
pub use idle::ConsciousnessIdleSimulation;
pub use load::{CognitiveLoadMonitor, LoadBand};
pub use manager::{ConsciousnessStateManager, ConsciousnessStateManagerBuilder, ConsciousnessUpdate};
pub use state::{
    ConsciousnessEvent, ConsciousnessEventType, ConsciousnessQuality, ConsciousnessState,
    ConsciousnessStream, MAX_STREAM_CAPACITY,
};
pub use stimuli::{EnvironmentalContext, MemoryActivation, StimulusExtractor, Stimuli};
pub use transition::{
    detect_consciousness_transitions, ConsciousnessTransition, TransitionDirection, TransitionType,
};
