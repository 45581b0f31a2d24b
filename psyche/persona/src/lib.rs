#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Persona model shared by the Psyche engines: bounded variables, emotions,
//! personality profiles, and the player record with its dialogue history.

/// Emotion maps and helpers.
pub mod emotion;
/// Personality and profile structs.
pub mod personality;
/// Player record and dialogue history.
pub mod player;
/// Text helpers shared by the analysers.
pub mod text;
/// Bounded scalar cells.
pub mod variable;

pub use emotion::{EmotionMap, EmotionMapExt};
pub use personality::{
    CommunicationStyle, EmotionalProfile, MemoryProfile, PersonalityProfile, SelfAwarenessProfile,
};
pub use player::{DialogueEntry, Player, DEFAULT_HISTORY_LIMIT};
pub use variable::Variable;
