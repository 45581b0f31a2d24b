#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Conscious dialogue orchestration: wires the consciousness, self-awareness
//! and emergence engines around a remote dialogue API, a player store and a
//! memory service.

/// Dialogue API contract and clients.
pub mod client;
/// TOML runtime configuration.
pub mod config;
/// Turn and collaborator errors.
pub mod error;
/// Memory retrieval contract and keyword ranking.
pub mod memory;
/// The per-turn pipeline.
pub mod service;
/// Player persistence contract.
pub mod store;

pub use client::{
    DialogueClient, DialogueOptions, DialogueResponse, HistoryTurn, HttpDialogueClient,
    ScriptedDialogueClient,
};
pub use config::{ConfigError, DialogueConfig, PsycheConfig, TelemetryConfig};
pub use error::DialogueError;
pub use memory::{EnhancedConversationContext, KeywordMemoryService, MemoryService, RankedMemory};
pub use service::{
    ConsciousDialogueService, ConsciousDialogueServiceBuilder, ConsciousnessSummary,
    EnhancedDialogueResponse, TurnContext,
};
pub use store::{InMemoryPlayerStore, PlayerStore};
