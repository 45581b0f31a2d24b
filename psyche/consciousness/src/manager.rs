use std::{sync::Arc, time::Duration};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use psyche_logging::{LogLevel, Telemetry};
use psyche_persona::{EmotionMap, EmotionMapExt, SelfAwarenessProfile};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde_json::json;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::{interval_at, sleep, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    attention::{calculate_awareness_level, update_attention_focus},
    config::ConsciousnessConfig,
    idle::{self, ConsciousnessIdleSimulation},
    load::{CognitiveLoadMonitor, OVERLOAD_THRESHOLD},
    state::{
        state_coherence, ConsciousnessEvent, ConsciousnessEventType, ConsciousnessQuality,
        ConsciousnessState, ConsciousnessStream,
    },
    stimuli::{unit, EnvironmentalContext, MemoryActivation, Stimuli},
};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const ATTENTION_SHIFT_NOVELTY: f32 = 0.6;
const AWARENESS_FLUCTUATION_DELTA: f32 = 0.1;
const METACOGNITIVE_GATE: f32 = 0.7;

/// Result of a turn update.
#[derive(Debug, Clone)]
pub struct ConsciousnessUpdate {
    /// State the update replaced.
    pub previous: Arc<ConsciousnessState>,
    /// State the update published.
    pub current: ConsciousnessState,
}

/// Builder for [`ConsciousnessStateManager`].
#[derive(Debug, Default)]
pub struct ConsciousnessStateManagerBuilder {
    config: ConsciousnessConfig,
    seed: Option<u64>,
    telemetry: Option<Telemetry>,
    profile: SelfAwarenessProfile,
    initial_state: Option<ConsciousnessState>,
}

impl ConsciousnessStateManagerBuilder {
    /// Sets the runtime tunables.
    #[must_use]
    pub fn config(mut self, config: ConsciousnessConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds the random source for reproducible runs.
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

    /// Sets the self-awareness profile feeding metacognition.
    #[must_use]
    pub const fn profile(mut self, profile: SelfAwarenessProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Starts from the given state instead of the default one.
    #[must_use]
    pub fn initial_state(mut self, state: ConsciousnessState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Finalizes the manager.
    #[must_use]
    pub fn build(self) -> ConsciousnessStateManager {
        let config = self.config.sanitized();
        let mut state = self.initial_state.unwrap_or_default();
        if state.consciousness_stream.capacity() != config.stream_capacity {
            let mut stream = ConsciousnessStream::with_capacity(config.stream_capacity);
            for event in state.consciousness_stream.iter() {
                stream.push(event.clone());
            }
            state.consciousness_stream = stream;
        }
        let rng = self
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        let (state_tx, _) = watch::channel(Arc::new(state));
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        ConsciousnessStateManager {
            config,
            profile: RwLock::new(self.profile),
            write_gate: tokio::sync::Mutex::new(()),
            state_tx,
            events_tx,
            rng: Mutex::new(rng),
            telemetry: self.telemetry,
        }
    }
}

/// Owner of the single live [`ConsciousnessState`].
///
/// Every writer (turn updates, the idle loop, background fluctuation) takes
/// the same async write gate for its whole read-modify-publish cycle, so two
/// updates never interleave. Readers receive `Arc` snapshots from a watch
/// channel and never wait on writers.
#[derive(Debug)]
pub struct ConsciousnessStateManager {
    config: ConsciousnessConfig,
    profile: RwLock<SelfAwarenessProfile>,
    write_gate: tokio::sync::Mutex<()>,
    state_tx: watch::Sender<Arc<ConsciousnessState>>,
    events_tx: broadcast::Sender<ConsciousnessEvent>,
    rng: Mutex<SmallRng>,
    telemetry: Option<Telemetry>,
}

impl Default for ConsciousnessStateManager {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConsciousnessStateManager {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> ConsciousnessStateManagerBuilder {
        ConsciousnessStateManagerBuilder::default()
    }

    /// Active tunables.
    #[must_use]
    pub const fn config(&self) -> &ConsciousnessConfig {
        &self.config
    }

    /// Copy of the latest published state.
    #[must_use]
    pub fn current(&self) -> ConsciousnessState {
        ConsciousnessState::clone(&self.state_tx.borrow())
    }

    /// Shared handle to the latest published state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ConsciousnessState> {
        Arc::clone(&self.state_tx.borrow())
    }

    /// Receiver that always holds the latest published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConsciousnessState>> {
        self.state_tx.subscribe()
    }

    /// Receiver of every event emitted after the call.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConsciousnessEvent> {
        self.events_tx.subscribe()
    }

    /// Replay of the bounded event stream, oldest first.
    #[must_use]
    pub fn recent_events(&self) -> Vec<ConsciousnessEvent> {
        self.state_tx
            .borrow()
            .consciousness_stream
            .iter()
            .cloned()
            .collect()
    }

    /// Replaces the self-awareness profile used for metacognition.
    pub fn set_self_awareness_profile(&self, profile: SelfAwarenessProfile) {
        *self.profile.write() = profile;
    }

    /// Runs one turn through attention, awareness, load and metacognition and
    /// publishes the resulting state.
    ///
    /// Metacognition uses the manager-wide profile. Dropping the future before
    /// it resolves leaves the previously published state untouched.
    pub async fn update_consciousness_state(
        &self,
        stimuli: &Stimuli,
        emotional_state: &EmotionMap,
        memory_activation: &MemoryActivation,
        environment: Option<&EnvironmentalContext>,
    ) -> ConsciousnessState {
        self.apply_update(None, stimuli, emotional_state, memory_activation, environment)
            .await
            .current
    }

    /// Same as [`Self::update_consciousness_state`], but metacognition reads
    /// `profile` instead of the manager-wide one.
    ///
    /// The returned `previous` is read under the write gate, so it is exactly
    /// the state this update was computed from.
    pub async fn update_for_profile(
        &self,
        profile: &SelfAwarenessProfile,
        stimuli: &Stimuli,
        emotional_state: &EmotionMap,
        memory_activation: &MemoryActivation,
        environment: Option<&EnvironmentalContext>,
    ) -> ConsciousnessUpdate {
        self.apply_update(
            Some(profile),
            stimuli,
            emotional_state,
            memory_activation,
            environment,
        )
        .await
    }

    async fn apply_update(
        &self,
        profile: Option<&SelfAwarenessProfile>,
        stimuli: &Stimuli,
        emotional_state: &EmotionMap,
        memory_activation: &MemoryActivation,
        environment: Option<&EnvironmentalContext>,
    ) -> ConsciousnessUpdate {
        let _gate = self.write_gate.lock().await;
        let delay = self.config.processing_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let previous = self.snapshot();
        let metacognitive_awareness = profile.map_or_else(
            || self.profile.read().metacognitive_awareness,
            |profile| profile.metacognitive_awareness,
        );
        let (next, emitted) = self.compute_update(
            &previous,
            metacognitive_awareness,
            stimuli,
            emotional_state,
            memory_activation,
            environment,
        );
        let published = self.publish(next, emitted.clone());

        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Info,
                "consciousness.update.completed",
                json!({
                    "version": published.version,
                    "awareness": published.awareness_level,
                    "cognitive_load": published.cognitive_load,
                    "metacognition": published.metacognition_level,
                    "focus": published.attention_focus.primary_focus,
                }),
            );
            if !emitted.is_empty() {
                let kinds: Vec<&str> = emitted.iter().map(|e| e.event_type.as_str()).collect();
                let _ = tel
                    .event(
                        "consciousness.events",
                        json!({ "version": published.version, "events": kinds }),
                    )
                    .await;
            }
        }
        ConsciousnessUpdate {
            previous,
            current: published,
        }
    }

    fn compute_update(
        &self,
        previous: &ConsciousnessState,
        metacognitive_awareness: f32,
        stimuli: &Stimuli,
        emotional_state: &EmotionMap,
        memory_activation: &MemoryActivation,
        environment: Option<&EnvironmentalContext>,
    ) -> (ConsciousnessState, Vec<ConsciousnessEvent>) {
        let stimuli = stimuli.clamped();
        let mut attention =
            update_attention_focus(&previous.attention_focus, &stimuli, emotional_state);
        if let Some(environment) = environment {
            attention
                .attention_demands
                .insert("environment".into(), unit(environment.attention_demand()));
        }

        let awareness = calculate_awareness_level(
            &attention,
            memory_activation,
            emotional_state,
            previous.awareness_level,
        );
        let load = CognitiveLoadMonitor::calculate(
            &attention.attention_demands,
            memory_activation,
            emotional_state.total_intensity(),
            previous.metacognition_level,
        );
        let metacognition = unit(
            0.4f32.mul_add(
                awareness,
                0.3f32.mul_add(
                    1.0 - load,
                    0.2f32.mul_add(
                        unit(metacognitive_awareness),
                        0.1 * previous.metacognition_level,
                    ),
                ),
            ),
        );

        let mut emitted = Vec::new();
        if stimuli.novelty > ATTENTION_SHIFT_NOVELTY {
            emitted.push(
                ConsciousnessEvent::new(
                    ConsciousnessEventType::AttentionShift,
                    format!("attention shifted to '{}'", attention.primary_focus),
                    stimuli.novelty,
                )
                .with_meta("topic", &attention.primary_focus)
                .with_meta("novelty", format!("{:.3}", stimuli.novelty)),
            );
        }
        let awareness_delta = awareness - previous.awareness_level;
        if awareness_delta.abs() > AWARENESS_FLUCTUATION_DELTA {
            emitted.push(
                ConsciousnessEvent::new(
                    ConsciousnessEventType::AwarenessFluctuation,
                    if awareness_delta > 0.0 {
                        "awareness sharpened"
                    } else {
                        "awareness dimmed"
                    },
                    awareness_delta.abs() * 2.0,
                )
                .with_meta("from", format!("{:.3}", previous.awareness_level))
                .with_meta("to", format!("{awareness:.3}")),
            );
        }
        if load > OVERLOAD_THRESHOLD {
            emitted.push(
                ConsciousnessEvent::new(
                    ConsciousnessEventType::CognitiveOverload,
                    "cognitive load exceeded capacity",
                    load,
                )
                .with_meta("load", format!("{load:.3}")),
            );
        }
        // Gated on the previous turn's metacognition, not the new value.
        if previous.metacognition_level > METACOGNITIVE_GATE
            && self.rng.lock().gen::<f32>() < self.config.metacognitive_insight_probability
        {
            emitted.push(
                ConsciousnessEvent::new(
                    ConsciousnessEventType::MetacognitiveInsight,
                    "noticed its own train of thought",
                    metacognition,
                )
                .with_meta(
                    "previous_metacognition",
                    format!("{:.3}", previous.metacognition_level),
                ),
            );
        }

        let mut stream = previous.consciousness_stream.clone();
        for event in &emitted {
            stream.push(event.clone());
        }

        let next = ConsciousnessState {
            version: previous.version,
            awareness_level: awareness,
            cognitive_load: load,
            metacognition_level: metacognition,
            state_coherence: state_coherence(awareness, attention.intensity, metacognition),
            consciousness_quality: ConsciousnessQuality::derive(
                awareness,
                attention.coherence,
                load,
                metacognition,
            ),
            attention_focus: attention,
            consciousness_stream: stream,
            timestamp: Utc::now(),
        };
        (next, emitted)
    }

    /// Caller must hold the write gate.
    fn publish(
        &self,
        mut next: ConsciousnessState,
        emitted: Vec<ConsciousnessEvent>,
    ) -> ConsciousnessState {
        let version = self.state_tx.borrow().version + 1;
        next.version = version;
        next.timestamp = Utc::now();
        self.state_tx.send_replace(Arc::new(next.clone()));
        for event in emitted {
            // No subscribers is fine.
            let _ = self.events_tx.send(event);
        }
        next
    }

    /// Lets the state decay in steps of the configured idle interval until
    /// `duration` elapses or `cancel` fires.
    ///
    /// Each step is published whole; cancellation between steps leaves the
    /// last published state intact.
    pub async fn simulate_consciousness_idle(
        &self,
        duration: Duration,
        background_thoughts: &[String],
        cancel: &CancellationToken,
    ) -> ConsciousnessIdleSimulation {
        let start = self.snapshot();
        let deadline = Instant::now() + duration;
        let step_interval = self.config.idle_interval();
        let mut idle_events = Vec::new();
        let mut completed = false;

        loop {
            let now = Instant::now();
            if now >= deadline {
                completed = true;
                break;
            }
            let step = step_interval.min(deadline - now);
            tokio::select! {
                () = cancel.cancelled() => break,
                () = sleep(step) => {}
            }

            let _gate = self.write_gate.lock().await;
            let previous = self.snapshot();
            let (event_type, noise, intensity) = {
                let mut rng = self.rng.lock();
                let idx = rng.gen_range(0..ConsciousnessEventType::IDLE.len());
                (
                    ConsciousnessEventType::IDLE[idx],
                    rng.gen::<f32>(),
                    rng.gen_range(0.1..0.4),
                )
            };
            let thought = (!background_thoughts.is_empty())
                .then(|| background_thoughts[idle_events.len() % background_thoughts.len()].as_str());
            let event = idle::idle_event(event_type, thought, intensity);
            let mut next = idle::decay(&previous, noise);
            next.consciousness_stream.push(event.clone());
            self.publish(next, vec![event.clone()]);
            idle_events.push(event);
        }

        let end = self.snapshot();
        let insights = idle::idle_insights(&start, &end, &idle_events, completed);
        let report = ConsciousnessIdleSimulation {
            requested: duration,
            ticks_completed: idle_events.len(),
            consciousness_shift: idle::consciousness_shift(&start, &end),
            idle_events,
            insights,
            completed,
            final_state_version: end.version,
        };
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(
                LogLevel::Debug,
                "consciousness.idle.finished",
                json!({
                    "ticks": report.ticks_completed,
                    "completed": report.completed,
                    "shift": report.consciousness_shift,
                }),
            );
        }
        report
    }

    /// Runs [`Self::simulate_consciousness_idle`] on a spawned task.
    pub fn spawn_idle_simulation(
        self: &Arc<Self>,
        duration: Duration,
        background_thoughts: Vec<String>,
        cancel: CancellationToken,
    ) -> JoinHandle<ConsciousnessIdleSimulation> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager
                .simulate_consciousness_idle(duration, &background_thoughts, &cancel)
                .await
        })
    }

    /// Nudges awareness by uniform relative noise, clamped to `[0.3, 1]`.
    /// Returns the new awareness.
    pub async fn fluctuate(&self) -> f32 {
        let _gate = self.write_gate.lock().await;
        let previous = self.snapshot();
        let amplitude = self.config.fluctuation_amplitude;
        let factor = 1.0 + self.rng.lock().gen_range(-amplitude..=amplitude);
        let awareness = (previous.awareness_level * factor).clamp(0.3, 1.0);

        let mut next = ConsciousnessState::clone(&previous);
        next.awareness_level = awareness;
        next.consciousness_quality = ConsciousnessQuality::derive(
            awareness,
            next.attention_focus.coherence,
            next.cognitive_load,
            next.metacognition_level,
        );
        next.state_coherence = state_coherence(
            awareness,
            next.attention_focus.intensity,
            next.metacognition_level,
        );
        self.publish(next, Vec::new());
        awareness
    }

    /// Spawns the periodic fluctuation task; it exits when `cancel` fires.
    pub fn spawn_background_fluctuation(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let period = manager.config.fluctuation_period();
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let awareness = manager.fluctuate().await;
                        if let Some(tel) = &manager.telemetry {
                            let _ = tel.log(
                                LogLevel::Debug,
                                "consciousness.fluctuation.tick",
                                json!({ "awareness": awareness }),
                            );
                        }
                    }
                }
            }
        })
    }
}
