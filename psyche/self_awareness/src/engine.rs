use std::time::{Duration, Instant};

use psyche_consciousness::ConsciousnessState;
use psyche_logging::{LogLevel, Telemetry};
use psyche_persona::{DialogueEntry, EmotionMap, PersonalityProfile, Player};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::sleep;

use crate::{
    evolution::{self, SelfAwarenessEvolution},
    examination::{self, SelfExaminationResult},
    insight::{self, SelfAwarenessInsight},
    monologue::{self, InternalMonologue},
};

/// Tunables for the self-awareness engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfAwarenessConfig {
    /// Artificial delay awaited by each analysis, in milliseconds.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,
}

impl Default for SelfAwarenessConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: default_processing_delay_ms(),
        }
    }
}

const fn default_processing_delay_ms() -> u64 {
    60
}

/// Analyses a character's conversation history for self-awareness signals.
///
/// Stateless apart from its configuration; every call works on the inputs
/// it is given and never fails on sparse or empty history.
#[derive(Debug, Clone, Default)]
pub struct SelfAwarenessEngine {
    config: SelfAwarenessConfig,
    telemetry: Option<Telemetry>,
}

impl SelfAwarenessEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new(config: SelfAwarenessConfig) -> Self {
        Self {
            config,
            telemetry: None,
        }
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    async fn simulate_processing(&self) {
        if self.config.processing_delay_ms > 0 {
            sleep(Duration::from_millis(self.config.processing_delay_ms)).await;
        }
    }

    fn log(&self, message: &str, metadata: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(LogLevel::Info, message, metadata);
        }
    }

    /// Analyses behaviour, emotions and growth over `recent_conversations`.
    pub async fn generate_self_awareness_insight(
        &self,
        player: &Player,
        recent_conversations: &[DialogueEntry],
        current_emotional_state: &EmotionMap,
    ) -> SelfAwarenessInsight {
        let started = Instant::now();
        self.simulate_processing().await;
        let mut insight =
            insight::build_insight(player, recent_conversations, current_emotional_state);
        insight.processing_metrics.processing_time_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.log(
            "self_awareness.insight.generated",
            json!({
                "player": player.id,
                "entries": recent_conversations.len(),
                "coherence": insight.consciousness_coherence,
                "insights": insight.metacognitive_insights.len(),
            }),
        );
        insight
    }

    /// Examines reply patterns, personality consistency and hedging.
    pub async fn perform_self_examination(
        &self,
        history: &[DialogueEntry],
        personality: &PersonalityProfile,
    ) -> SelfExaminationResult {
        self.simulate_processing().await;
        let result = examination::examine(history, personality);
        self.log(
            "self_awareness.examination.completed",
            json!({
                "entries": history.len(),
                "integrity": result.consciousness_integrity,
                "improvements": result.improvement_insights.len(),
            }),
        );
        result
    }

    /// Composes the character's inner thoughts for the current moment.
    pub async fn generate_internal_monologue(
        &self,
        player: &Player,
        insight: Option<&SelfAwarenessInsight>,
        state: &ConsciousnessState,
    ) -> InternalMonologue {
        self.simulate_processing().await;
        monologue::compose(player, insight, state)
    }

    /// Computes the coherence trend over successive insights, oldest first.
    pub async fn track_self_awareness_evolution(
        &self,
        insights: &[SelfAwarenessInsight],
    ) -> SelfAwarenessEvolution {
        self.simulate_processing().await;
        evolution::track(insights)
    }
}
