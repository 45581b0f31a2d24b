use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use indexmap::IndexMap;
use parking_lot::Mutex;
use psyche_consciousness::{
    detect_consciousness_transitions, ConsciousnessIdleSimulation, ConsciousnessState,
    ConsciousnessStateManager, ConsciousnessTransition, ConsciousnessUpdate, EnvironmentalContext,
    MemoryActivation, StimulusExtractor, Stimuli,
};
use psyche_emergence::{
    ContextualPressure, EmergentBehaviorEngine, EmergentBehaviorResult, PressureType,
    SpontaneousBehavior,
};
use psyche_event_bus::{EventPublisher, FileEventPublisher};
use psyche_logging::{LogLevel, Telemetry};
use psyche_persona::{emotion::blend, DialogueEntry};
use psyche_self_awareness::{InternalMonologue, SelfAwarenessEngine, SelfAwarenessInsight};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::{
    client::{DialogueClient, DialogueOptions, DialogueResponse, HistoryTurn},
    config::{DialogueConfig, PsycheConfig},
    error::DialogueError,
    memory::MemoryService,
    store::PlayerStore,
};

/// Exchanges used for stimuli, emergence and the forwarded history.
const RECENT_WINDOW: usize = 5;
/// Exchanges the self-awareness engine reflects on.
const REFLECTION_WINDOW: usize = 10;
const HIGH_LOAD: f32 = 0.7;
/// History metadata key holding the 1-based turn index.
const TURN_KEY: &str = "turn";

/// Per-turn input besides the prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnContext {
    /// Free-text context forwarded to the dialogue API.
    pub text: Option<String>,
    /// Scene competing for attention.
    pub environment: Option<EnvironmentalContext>,
}

impl TurnContext {
    /// Context with only a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            environment: None,
        }
    }

    /// Adds a scene.
    #[must_use]
    pub fn with_environment(mut self, environment: EnvironmentalContext) -> Self {
        self.environment = Some(environment);
        self
    }
}

/// Consciousness figures attached to a reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsciousnessSummary {
    /// Version of the state the turn produced.
    pub version: u64,
    /// Awareness.
    pub awareness_level: f32,
    /// Cognitive load.
    pub cognitive_load: f32,
    /// Metacognition.
    pub metacognition_level: f32,
    /// State coherence.
    pub state_coherence: f32,
    /// Overall quality.
    pub overall_quality: f32,
    /// Attention focus.
    pub primary_focus: String,
}

impl From<&ConsciousnessState> for ConsciousnessSummary {
    fn from(state: &ConsciousnessState) -> Self {
        Self {
            version: state.version,
            awareness_level: state.awareness_level,
            cognitive_load: state.cognitive_load,
            metacognition_level: state.metacognition_level,
            state_coherence: state.state_coherence,
            overall_quality: state.consciousness_quality.overall_quality,
            primary_focus: state.attention_focus.primary_focus.clone(),
        }
    }
}

/// Reply annotated with everything the turn derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedDialogueResponse {
    /// Reply from the dialogue API.
    pub response: DialogueResponse,
    /// State after the turn.
    pub consciousness: ConsciousnessSummary,
    /// Most significant change against the pre-turn state.
    pub transition: Option<ConsciousnessTransition>,
    /// Present on self-awareness turns.
    pub self_awareness: Option<SelfAwarenessInsight>,
    /// Present on self-awareness turns.
    pub internal_monologue: Option<InternalMonologue>,
    /// Present when emergent behaviour ran.
    pub emergent_behavior: Option<EmergentBehaviorResult>,
    /// Unprompted behaviours suggested for the reply.
    pub spontaneous_behaviors: Vec<SpontaneousBehavior>,
    /// Memories forwarded with the request.
    pub memories_used: usize,
    /// 1-based turn index for the player.
    pub turn_number: usize,
    /// Wall time spent on the turn.
    pub processing_time_ms: u64,
}

/// Builder for [`ConsciousDialogueService`].
pub struct ConsciousDialogueServiceBuilder {
    client: Arc<dyn DialogueClient>,
    players: Arc<dyn PlayerStore>,
    memory: Arc<dyn MemoryService>,
    config: DialogueConfig,
    consciousness: Option<Arc<ConsciousnessStateManager>>,
    self_awareness: SelfAwarenessEngine,
    emergence: Option<EmergentBehaviorEngine>,
    seed: Option<u64>,
    telemetry: Option<Telemetry>,
}

impl ConsciousDialogueServiceBuilder {
    /// Sets turn orchestration settings.
    #[must_use]
    pub fn config(mut self, config: DialogueConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing consciousness manager.
    #[must_use]
    pub fn consciousness(mut self, manager: Arc<ConsciousnessStateManager>) -> Self {
        self.consciousness = Some(manager);
        self
    }

    /// Sets the self-awareness engine.
    #[must_use]
    pub fn self_awareness(mut self, engine: SelfAwarenessEngine) -> Self {
        self.self_awareness = engine;
        self
    }

    /// Sets the emergent behaviour engine.
    #[must_use]
    pub fn emergence(mut self, engine: EmergentBehaviorEngine) -> Self {
        self.emergence = Some(engine);
        self
    }

    /// Seeds the emergent-behaviour roll.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Finalizes the service.
    #[must_use]
    pub fn build(self) -> ConsciousDialogueService {
        let rng = self
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        ConsciousDialogueService {
            config: self.config,
            client: self.client,
            players: self.players,
            memory: self.memory,
            consciousness: self
                .consciousness
                .unwrap_or_else(|| Arc::new(ConsciousnessStateManager::default())),
            self_awareness: self.self_awareness,
            emergence: self.emergence.unwrap_or_default(),
            rng: Mutex::new(rng),
            cancel: CancellationToken::new(),
            background: Mutex::new(Vec::new()),
            telemetry: self.telemetry,
        }
    }
}

/// Runs the per-turn pipeline around a remote dialogue API.
///
/// One service owns one consciousness manager; turns for different players
/// share it and are serialised by its write gate.
pub struct ConsciousDialogueService {
    config: DialogueConfig,
    client: Arc<dyn DialogueClient>,
    players: Arc<dyn PlayerStore>,
    memory: Arc<dyn MemoryService>,
    consciousness: Arc<ConsciousnessStateManager>,
    self_awareness: SelfAwarenessEngine,
    emergence: EmergentBehaviorEngine,
    rng: Mutex<SmallRng>,
    cancel: CancellationToken,
    background: Mutex<Vec<JoinHandle<()>>>,
    telemetry: Option<Telemetry>,
}

impl fmt::Debug for ConsciousDialogueService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsciousDialogueService")
            .field("config", &self.config)
            .field("consciousness_version", &self.consciousness.snapshot().version)
            .field("background_tasks", &self.background.lock().len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ConsciousDialogueService {
    /// Returns a builder over the three collaborators.
    #[must_use]
    pub fn builder(
        client: Arc<dyn DialogueClient>,
        players: Arc<dyn PlayerStore>,
        memory: Arc<dyn MemoryService>,
    ) -> ConsciousDialogueServiceBuilder {
        ConsciousDialogueServiceBuilder {
            client,
            players,
            memory,
            config: DialogueConfig::default(),
            consciousness: None,
            self_awareness: SelfAwarenessEngine::default(),
            emergence: None,
            seed: None,
            telemetry: None,
        }
    }

    /// Wires engines and telemetry sinks from a loaded configuration.
    pub fn from_config(
        config: &PsycheConfig,
        client: Arc<dyn DialogueClient>,
        players: Arc<dyn PlayerStore>,
        memory: Arc<dyn MemoryService>,
    ) -> anyhow::Result<Self> {
        let publisher = match &config.telemetry.event_log {
            Some(path) => {
                let file: Arc<dyn EventPublisher> = Arc::new(
                    FileEventPublisher::new(path)
                        .with_context(|| format!("opening event log {}", path.display()))?,
                );
                Some(file)
            }
            None => None,
        };
        let telemetry_for = |module: &str| -> anyhow::Result<Option<Telemetry>> {
            if config.telemetry.log_dir.is_none() && publisher.is_none() {
                return Ok(None);
            }
            let mut builder = Telemetry::builder(module);
            if let Some(dir) = &config.telemetry.log_dir {
                builder = builder.log_path(dir.join(format!("{module}.log")));
            }
            if let Some(publisher) = &publisher {
                builder = builder.event_publisher(Arc::clone(publisher));
            }
            builder
                .build()
                .map(Some)
                .with_context(|| format!("building {module} telemetry"))
        };

        let mut manager = ConsciousnessStateManager::builder().config(config.consciousness.clone());
        let mut self_awareness = SelfAwarenessEngine::new(config.self_awareness);
        let mut emergence = config.seed.map_or_else(
            || EmergentBehaviorEngine::new(config.emergence.clone()),
            |seed| EmergentBehaviorEngine::seeded(config.emergence.clone(), seed),
        );
        if let Some(seed) = config.seed {
            manager = manager.seed(seed);
        }
        if let Some(telemetry) = telemetry_for("consciousness")? {
            manager = manager.telemetry(telemetry);
        }
        if let Some(telemetry) = telemetry_for("self_awareness")? {
            self_awareness = self_awareness.with_telemetry(telemetry);
        }
        if let Some(telemetry) = telemetry_for("emergence")? {
            emergence = emergence.with_telemetry(telemetry);
        }

        let mut builder = Self::builder(client, players, memory)
            .config(config.dialogue.clone())
            .consciousness(Arc::new(manager.build()))
            .self_awareness(self_awareness)
            .emergence(emergence);
        if let Some(seed) = config.seed {
            builder = builder.seed(seed);
        }
        if let Some(telemetry) = telemetry_for("dialogue")? {
            builder = builder.telemetry(telemetry);
        }
        Ok(builder.build())
    }

    /// Turn orchestration settings.
    #[must_use]
    pub const fn config(&self) -> &DialogueConfig {
        &self.config
    }

    /// Shared consciousness manager.
    #[must_use]
    pub const fn consciousness(&self) -> &Arc<ConsciousnessStateManager> {
        &self.consciousness
    }

    /// Runs one turn within the configured time budget.
    ///
    /// On timeout the player is not saved and the consciousness state stays
    /// at whatever was last published.
    #[instrument(skip_all, fields(player = %player_id))]
    pub async fn generate_response(
        &self,
        player_id: &str,
        prompt: &str,
        context: &TurnContext,
    ) -> Result<EnhancedDialogueResponse, DialogueError> {
        let budget = self.config.turn_timeout();
        let Ok(result) = timeout(budget, self.run_turn(player_id, prompt, context)).await else {
            warn!(?budget, "dialogue turn timed out");
            self.log(
                LogLevel::Warn,
                "dialogue.turn.timeout",
                json!({ "player": player_id, "budget_ms": self.config.turn_timeout_ms }),
            );
            return Err(DialogueError::Timeout(budget));
        };
        if let Err(err) = &result {
            warn!(error = %err, "dialogue turn failed");
            self.log(
                LogLevel::Warn,
                "dialogue.turn.failed",
                json!({ "player": player_id, "error": err.to_string() }),
            );
        }
        result
    }

    async fn run_turn(
        &self,
        player_id: &str,
        prompt: &str,
        context: &TurnContext,
    ) -> Result<EnhancedDialogueResponse, DialogueError> {
        let started = Instant::now();
        let mut player = self.players.get_player(player_id).await?;

        let memories = self
            .memory
            .find_relevant_memories(&player, prompt, self.config.max_memories)
            .await?;
        let memory_context = self
            .memory
            .generate_conversation_context(&player, prompt, &memories)
            .await?;
        let scores: Vec<f32> = memories.iter().map(|memory| memory.score).collect();

        let recent = player.recent_history(RECENT_WINDOW);
        let stimuli =
            StimulusExtractor::extract(prompt, context.text.as_deref(), recent, &player.emotions);
        let ConsciousnessUpdate {
            previous,
            current: state,
        } = self
            .consciousness
            .update_for_profile(
                &player.self_awareness,
                &stimuli,
                &player.emotions,
                &MemoryActivation::from_scores(&scores),
                context.environment.as_ref(),
            )
            .await;
        let transition = detect_consciousness_transitions(&previous, &state);

        let turn_number = next_turn(&player.dialogue_history);
        let (self_awareness, internal_monologue) =
            if turn_number % self.config.self_awareness_interval.max(1) == 0 {
                let insight = self
                    .self_awareness
                    .generate_self_awareness_insight(
                        &player,
                        player.recent_history(REFLECTION_WINDOW),
                        &player.emotions,
                    )
                    .await;
                let monologue = self
                    .self_awareness
                    .generate_internal_monologue(&player, Some(&insight), &state)
                    .await;
                (Some(insight), Some(monologue))
            } else {
                (None, None)
            };

        let pressures = contextual_pressures(&stimuli, &state, context.environment.as_ref());
        let strong = pressures
            .iter()
            .any(|pressure| pressure.intensity > self.config.strong_pressure_threshold);
        let roll: f32 = self.rng.lock().gen();
        let emergent_behavior = if strong || roll < self.config.emergent_probability {
            Some(
                self.emergence
                    .generate_emergent_behavior(&player.personality, &pressures, recent, &state)
                    .await,
            )
        } else {
            None
        };
        let spontaneous_behaviors = self
            .emergence
            .generate_spontaneous_behavior(&player.personality, &state)
            .await;

        let summary = ConsciousnessSummary::from(&state);
        let options = DialogueOptions {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            emotions: player.emotions.clone(),
            recent_history: recent
                .iter()
                .map(|entry| HistoryTurn {
                    prompt: entry.prompt.clone(),
                    response: entry.response.clone(),
                })
                .collect(),
            memory_context: Some(memory_context),
            metadata: turn_metadata(
                &summary,
                transition.as_ref(),
                self_awareness.as_ref(),
                emergent_behavior.as_ref(),
                &spontaneous_behaviors,
            ),
        };
        let response = self
            .client
            .generate_dialogue(prompt, context.text.as_deref(), &options)
            .await?;

        let mut entry = DialogueEntry::new(prompt, response.text.clone())
            .with_emotions(response.emotions.clone())
            .with_topic(stimuli.primary_topic.clone())
            .with_metadata(TURN_KEY, json!(turn_number))
            .with_metadata("consciousness", json!(summary));
        if let Some(transition) = &transition {
            entry = entry.with_metadata("transition", json!(transition));
        }
        if let Some(behavior) = &emergent_behavior {
            let names: Vec<&str> = behavior
                .emergent_traits
                .iter()
                .map(|t| t.name.as_str())
                .collect();
            entry = entry.with_metadata("emergent_traits", json!(names));
        }
        player.record_dialogue(entry, self.config.history_limit);
        if !response.emotions.is_empty() {
            player.emotions = blend(
                &player.emotions,
                &response.emotions,
                self.config.emotion_blend_weight,
            );
        }
        self.players.update_player(&player).await?;

        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            turn = turn_number,
            awareness = state.awareness_level,
            emergent = emergent_behavior.is_some(),
            "dialogue turn completed"
        );
        if let Some(tel) = &self.telemetry {
            let payload = json!({
                "player": player.id,
                "turn": turn_number,
                "state_version": state.version,
                "transition": transition.as_ref().map(|t| t.transition_type),
                "self_awareness": self_awareness.is_some(),
                "emergent": emergent_behavior.is_some(),
                "memories": memories.len(),
                "elapsed_ms": processing_time_ms,
            });
            let _ = tel.log(LogLevel::Info, "dialogue.turn.completed", payload.clone());
            let _ = tel.event("dialogue.turn.completed", payload).await;
        }

        Ok(EnhancedDialogueResponse {
            response,
            consciousness: summary,
            transition,
            self_awareness,
            internal_monologue,
            emergent_behavior,
            spontaneous_behaviors,
            memories_used: memories.len(),
            turn_number,
            processing_time_ms,
        })
    }

    /// Spawns background awareness fluctuation. Needs a Tokio runtime; a
    /// second call, or a call after shutdown, does nothing.
    pub fn start_background(&self) {
        let mut handles = self.background.lock();
        if !handles.is_empty() || self.cancel.is_cancelled() {
            return;
        }
        handles.push(
            self.consciousness
                .spawn_background_fluctuation(self.cancel.child_token()),
        );
        info!("background fluctuation started");
    }

    /// Lets the consciousness idle; ends early on shutdown.
    pub async fn simulate_idle(
        &self,
        duration: Duration,
        background_thoughts: &[String],
    ) -> ConsciousnessIdleSimulation {
        self.consciousness
            .simulate_consciousness_idle(duration, background_thoughts, &self.cancel)
            .await
    }

    /// Cancels idle and background work and waits for the background task.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles = std::mem::take(&mut *self.background.lock());
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "background task ended abnormally");
            }
        }
        self.log(LogLevel::Info, "dialogue.service.shutdown", json!({}));
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(level, message, metadata);
        }
    }
}

/// Continues the numbering stored on the newest entry; trimmed histories
/// keep counting.
fn next_turn(history: &[DialogueEntry]) -> usize {
    history
        .last()
        .and_then(|entry| entry.metadata.get(TURN_KEY))
        .and_then(Value::as_u64)
        .and_then(|turn| usize::try_from(turn).ok())
        .map_or(history.len() + 1, |turn| turn + 1)
}

/// Pressures the turn puts on the character's genes.
fn contextual_pressures(
    stimuli: &Stimuli,
    state: &ConsciousnessState,
    environment: Option<&EnvironmentalContext>,
) -> Vec<ContextualPressure> {
    let mut pressures = vec![
        ContextualPressure::new(PressureType::Cognitive, stimuli.complexity),
        ContextualPressure::new(PressureType::Emotional, stimuli.emotional_intensity),
        ContextualPressure::new(PressureType::Expressive, stimuli.intensity),
        ContextualPressure::new(PressureType::Environmental, stimuli.novelty)
            .affecting("curiosity")
            .affecting("adaptability"),
    ];
    if let Some(environment) = environment {
        pressures.push(ContextualPressure::new(
            PressureType::Social,
            environment.social_presence,
        ));
    }
    if state.cognitive_load > HIGH_LOAD {
        pressures.push(ContextualPressure::new(
            PressureType::Adaptive,
            state.cognitive_load,
        ));
    }
    pressures.retain(|pressure| pressure.intensity > 0.0);
    pressures
}

fn turn_metadata(
    summary: &ConsciousnessSummary,
    transition: Option<&ConsciousnessTransition>,
    insight: Option<&SelfAwarenessInsight>,
    behavior: Option<&EmergentBehaviorResult>,
    spontaneous: &[SpontaneousBehavior],
) -> IndexMap<String, Value> {
    let mut metadata = IndexMap::new();
    metadata.insert("consciousness".to_string(), json!(summary));
    if let Some(transition) = transition {
        metadata.insert("transition".to_string(), json!(transition));
    }
    if let Some(insight) = insight {
        metadata.insert(
            "self_directed_questions".to_string(),
            json!(insight.self_directed_questions),
        );
    }
    if let Some(behavior) = behavior {
        let modifiers: Vec<Value> = behavior
            .responses
            .iter()
            .map(|r| json!({ "trait": r.trait_name, "modifier": r.modifier }))
            .collect();
        metadata.insert("emergent_modifiers".to_string(), Value::Array(modifiers));
    }
    if !spontaneous.is_empty() {
        let hints: Vec<&str> = spontaneous.iter().map(|s| s.description.as_str()).collect();
        metadata.insert("spontaneous_behaviors".to_string(), json!(hints));
    }
    metadata
}

#[cfg(test)]
mod tests {
    use psyche_consciousness::ConsciousnessConfig;
    use psyche_emergence::EmergenceConfig;
    use psyche_persona::{EmotionMap, Player};
    use psyche_self_awareness::SelfAwarenessConfig;

    use super::*;
    use crate::{
        client::ScriptedDialogueClient, memory::KeywordMemoryService, store::InMemoryPlayerStore,
    };

    struct Harness {
        service: ConsciousDialogueService,
        client: Arc<ScriptedDialogueClient>,
        store: Arc<InMemoryPlayerStore>,
    }

    fn harness_with(client: ScriptedDialogueClient, config: DialogueConfig) -> Harness {
        let client = Arc::new(client);
        let store = Arc::new(InMemoryPlayerStore::new());
        store.insert(Player::new("p1", "Mira"));
        let manager = ConsciousnessStateManager::builder()
            .config(ConsciousnessConfig::default().without_delay())
            .seed(3)
            .build();
        let service = ConsciousDialogueService::builder(
            client.clone(),
            store.clone(),
            Arc::new(KeywordMemoryService::default()),
        )
        .config(config)
        .consciousness(Arc::new(manager))
        .self_awareness(SelfAwarenessEngine::new(SelfAwarenessConfig {
            processing_delay_ms: 0,
        }))
        .emergence(EmergentBehaviorEngine::seeded(
            EmergenceConfig::default().without_delay(),
            3,
        ))
        .seed(3)
        .build();
        Harness {
            service,
            client,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(
            ScriptedDialogueClient::new(["Well met, traveller."]),
            DialogueConfig::default(),
        )
    }

    #[tokio::test]
    async fn turn_records_history_and_saves_once() {
        let h = harness();
        let reply = h
            .service
            .generate_response("p1", "Where can I find the old lighthouse?", &TurnContext::default())
            .await
            .unwrap();
        assert_eq!(reply.response.text, "Well met, traveller.");
        assert_eq!(reply.turn_number, 1);
        assert_eq!(h.store.write_count(), 1);
        let player = h.store.get("p1").unwrap();
        assert_eq!(player.dialogue_history.len(), 1);
        let entry = &player.dialogue_history[0];
        assert!(entry.metadata.contains_key("consciousness"));
        assert_eq!(entry.topic.as_deref(), Some(reply.consciousness.primary_focus.as_str()));
        assert!(reply.consciousness.version >= 1);
    }

    #[tokio::test]
    async fn concurrent_players_each_get_their_own_turn() {
        let h = harness();
        let mut reflective = Player::new("p2", "Oren");
        reflective.self_awareness.metacognitive_awareness = 1.0;
        h.store.insert(reflective);
        let ctx = TurnContext::default();
        let (first, second) = tokio::join!(
            h.service.generate_response("p1", "Where is the market?", &ctx),
            h.service.generate_response("p2", "What do you think of yourself?", &ctx),
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        let mut versions = vec![first.consciousness.version, second.consciousness.version];
        versions.sort_unstable();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(first.turn_number, 1);
        assert_eq!(second.turn_number, 1);
        assert_eq!(h.store.write_count(), 2);
        assert_eq!(h.store.get("p2").unwrap().dialogue_history.len(), 1);
    }

    #[tokio::test]
    async fn request_carries_derived_metadata() {
        let h = harness();
        h.service
            .generate_response("p1", "Tell me about the harbour", &TurnContext::text("at the docks"))
            .await
            .unwrap();
        let received = h.client.received();
        assert_eq!(received.len(), 1);
        let (prompt, options) = &received[0];
        assert_eq!(prompt, "Tell me about the harbour");
        assert_eq!(options.player_name, "Mira");
        assert!(options.metadata.contains_key("consciousness"));
        assert!(options.memory_context.is_some());
    }

    #[tokio::test]
    async fn self_awareness_runs_every_third_turn() {
        let h = harness();
        let mut flags = Vec::new();
        for prompt in ["First question here", "Second question here", "Third question here"] {
            let reply = h
                .service
                .generate_response("p1", prompt, &TurnContext::default())
                .await
                .unwrap();
            flags.push((reply.self_awareness.is_some(), reply.internal_monologue.is_some()));
        }
        assert_eq!(flags, vec![(false, false), (false, false), (true, true)]);
        assert_eq!(h.store.write_count(), 3);
    }

    #[tokio::test]
    async fn emergent_behaviour_follows_probability() {
        let always = harness_with(
            ScriptedDialogueClient::new(["ok"]),
            DialogueConfig {
                emergent_probability: 1.0,
                ..DialogueConfig::default()
            },
        );
        let reply = always
            .service
            .generate_response("p1", "hello there", &TurnContext::default())
            .await
            .unwrap();
        assert!(reply.emergent_behavior.is_some());

        let never = harness_with(
            ScriptedDialogueClient::new(["ok"]),
            DialogueConfig {
                emergent_probability: 0.0,
                strong_pressure_threshold: 1.0,
                ..DialogueConfig::default()
            },
        );
        let reply = never
            .service
            .generate_response("p1", "hello there", &TurnContext::default())
            .await
            .unwrap();
        assert!(reply.emergent_behavior.is_none());
    }

    #[tokio::test]
    async fn reply_emotions_blend_into_player() {
        let h = harness_with(
            ScriptedDialogueClient::new(["Splendid!"])
                .with_emotions(EmotionMap::from([("joy".to_string(), 1.0)])),
            DialogueConfig::default(),
        );
        h.service
            .generate_response("p1", "Good news everyone", &TurnContext::default())
            .await
            .unwrap();
        let player = h.store.get("p1").unwrap();
        assert!((player.emotions["joy"] - 0.3).abs() < 1e-6);
        assert!((player.emotions["calm"] - 0.35).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unknown_player_is_not_found() {
        let h = harness();
        let err = h
            .service
            .generate_response("ghost", "hello", &TurnContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DialogueError::NotFound(_)));
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn remote_failure_leaves_player_unsaved() {
        let h = harness_with(
            ScriptedDialogueClient::new(["unused"]).failing(502, "bad gateway"),
            DialogueConfig::default(),
        );
        let err = h
            .service
            .generate_response("p1", "hello", &TurnContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DialogueError::RemoteService { status: 502, .. }));
        assert_eq!(h.store.write_count(), 0);
        assert!(h.store.get("p1").unwrap().dialogue_history.is_empty());
    }

    #[tokio::test]
    async fn slow_turn_times_out() {
        let h = harness_with(
            ScriptedDialogueClient::new(["late"]).with_latency(Duration::from_millis(300)),
            DialogueConfig {
                turn_timeout_ms: 50,
                ..DialogueConfig::default()
            },
        );
        let err = h
            .service
            .generate_response("p1", "hello", &TurnContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DialogueError::Timeout(budget) if budget == Duration::from_millis(50)));
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn history_is_trimmed_to_limit() {
        let h = harness_with(
            ScriptedDialogueClient::new(["noted"]),
            DialogueConfig {
                history_limit: 2,
                ..DialogueConfig::default()
            },
        );
        for prompt in ["one apple", "two pears", "three plums"] {
            h.service
                .generate_response("p1", prompt, &TurnContext::default())
                .await
                .unwrap();
        }
        let history = h.store.get("p1").unwrap().dialogue_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].prompt, "three plums");
        let reply = h
            .service
            .generate_response("p1", "four figs", &TurnContext::default())
            .await
            .unwrap();
        assert_eq!(reply.turn_number, 4);
    }

    #[tokio::test]
    async fn shutdown_stops_background_and_idle() {
        let h = harness();
        h.service.start_background();
        h.service.start_background();
        h.service.shutdown().await;
        let report = h
            .service
            .simulate_idle(Duration::from_secs(5), &[])
            .await;
        assert!(!report.completed);
        assert_eq!(report.ticks_completed, 0);
    }

    #[tokio::test]
    async fn config_wires_telemetry_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let config = PsycheConfig {
            consciousness: ConsciousnessConfig::default().without_delay(),
            self_awareness: SelfAwarenessConfig {
                processing_delay_ms: 0,
            },
            emergence: EmergenceConfig::default().without_delay(),
            telemetry: crate::config::TelemetryConfig {
                log_dir: Some(dir.path().join("logs")),
                event_log: Some(dir.path().join("events.jsonl")),
            },
            seed: Some(9),
            ..PsycheConfig::default()
        };
        let store = Arc::new(InMemoryPlayerStore::new());
        store.insert(Player::new("p1", "Mira"));
        let service = ConsciousDialogueService::from_config(
            &config,
            Arc::new(ScriptedDialogueClient::new(["hi"])),
            store,
            Arc::new(KeywordMemoryService::default()),
        )
        .unwrap();
        service
            .generate_response("p1", "hello", &TurnContext::default())
            .await
            .unwrap();
        let log = std::fs::read_to_string(dir.path().join("logs/dialogue.log")).unwrap();
        assert!(log.contains("dialogue.turn.completed"));
        let events = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
        assert!(events.contains("dialogue.turn.completed"));
    }

    #[test]
    fn calm_turns_produce_only_positive_pressures() {
        let stimuli = Stimuli {
            novelty: 0.0,
            ..Stimuli::new("weather")
        };
        let state = ConsciousnessState::default();
        let pressures = contextual_pressures(&stimuli, &state, None);
        assert!(pressures.iter().all(|p| p.intensity > 0.0));
        assert!(pressures
            .iter()
            .all(|p| p.pressure_type != PressureType::Social));
    }
}
