use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{attention::AttentionFocus, stimuli::unit};

/// Upper bound on retained consciousness events.
pub const MAX_STREAM_CAPACITY: usize = 20;

/// Kinds of discrete consciousness events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsciousnessEventType {
    /// A novel stimulus pulled attention.
    AttentionShift,
    /// Awareness moved by more than 0.1 in one update.
    AwarenessFluctuation,
    /// Load crossed the overload threshold.
    CognitiveOverload,
    /// A metacognitive insight surfaced.
    MetacognitiveInsight,
    /// Idle: background processing.
    BackgroundProcessing,
    /// Idle: memory consolidation.
    MemoryConsolidation,
    /// Idle: quiet reflection.
    IdleReflection,
}

impl ConsciousnessEventType {
    /// Event types produced by the idle loop.
    pub const IDLE: [Self; 3] = [
        Self::BackgroundProcessing,
        Self::MemoryConsolidation,
        Self::IdleReflection,
    ];

    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AttentionShift => "ATTENTION_SHIFT",
            Self::AwarenessFluctuation => "AWARENESS_FLUCTUATION",
            Self::CognitiveOverload => "COGNITIVE_OVERLOAD",
            Self::MetacognitiveInsight => "METACOGNITIVE_INSIGHT",
            Self::BackgroundProcessing => "BACKGROUND_PROCESSING",
            Self::MemoryConsolidation => "MEMORY_CONSOLIDATION",
            Self::IdleReflection => "IDLE_REFLECTION",
        }
    }
}

/// One entry of the consciousness stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessEvent {
    /// Kind of event.
    pub event_type: ConsciousnessEventType,
    /// Human-readable description.
    pub description: String,
    /// Strength, `[0, 1]`.
    pub intensity: f32,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Extra string annotations.
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
}

impl ConsciousnessEvent {
    /// Creates an event stamped now; intensity is clamped.
    #[must_use]
    pub fn new(
        event_type: ConsciousnessEventType,
        description: impl Into<String>,
        intensity: f32,
    ) -> Self {
        Self {
            event_type,
            description: description.into(),
            intensity: unit(intensity),
            timestamp: Utc::now(),
            metadata: IndexMap::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// Bounded FIFO of consciousness events; the oldest entry is dropped first.
///
/// Deserialized streams are re-bounded, so stored data can never exceed the cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredStream")]
pub struct ConsciousnessStream {
    capacity: usize,
    events: VecDeque<ConsciousnessEvent>,
}

#[derive(Deserialize)]
struct StoredStream {
    capacity: usize,
    events: Vec<ConsciousnessEvent>,
}

impl From<StoredStream> for ConsciousnessStream {
    fn from(stored: StoredStream) -> Self {
        let mut stream = Self::with_capacity(stored.capacity);
        for event in stored.events {
            stream.push(event);
        }
        stream
    }
}

impl Default for ConsciousnessStream {
    fn default() -> Self {
        Self::with_capacity(MAX_STREAM_CAPACITY)
    }
}

impl ConsciousnessStream {
    /// Creates an empty stream. Capacity is clamped to `1..=20`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_STREAM_CAPACITY);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends an event, evicting the oldest ones beyond capacity.
    pub fn push(&mut self, event: ConsciousnessEvent) {
        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the stream is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum retained events.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConsciousnessEvent> {
        self.events.iter()
    }

    /// Newest event.
    #[must_use]
    pub fn latest(&self) -> Option<&ConsciousnessEvent> {
        self.events.back()
    }

    /// Whether any retained event has the given type.
    #[must_use]
    pub fn contains(&self, event_type: ConsciousnessEventType) -> bool {
        self.events.iter().any(|e| e.event_type == event_type)
    }
}

/// Summary quality metrics of a state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessQuality {
    /// `(awareness + attention coherence) / 2`.
    pub clarity: f32,
    /// `1 - cognitive load`.
    pub efficiency: f32,
    /// Metacognition level.
    pub depth: f32,
    /// Attention coherence.
    pub coherence: f32,
    /// `0.4·clarity + 0.3·efficiency + 0.3·depth`.
    pub overall_quality: f32,
}

impl ConsciousnessQuality {
    /// Derives the quality block from the core scalars.
    #[must_use]
    pub fn derive(awareness: f32, attention_coherence: f32, load: f32, metacognition: f32) -> Self {
        let clarity = unit((awareness + attention_coherence) / 2.0);
        let efficiency = unit(1.0 - load);
        let depth = unit(metacognition);
        let overall_quality = unit(0.4f32.mul_add(clarity, 0.3f32.mul_add(efficiency, 0.3 * depth)));
        Self {
            clarity,
            efficiency,
            depth,
            coherence: unit(attention_coherence),
            overall_quality,
        }
    }
}

/// Snapshot of the simulated consciousness.
///
/// Published whole by the manager; readers never see a partially built value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessState {
    /// Monotonic publication counter.
    pub version: u64,
    /// Awareness, `[0.2, 1]` after any update.
    pub awareness_level: f32,
    /// Cognitive load, `[0, 1]`.
    pub cognitive_load: f32,
    /// Metacognition, `[0, 1]`.
    pub metacognition_level: f32,
    /// Internal agreement of the scalars, `[0, 1]`.
    pub state_coherence: f32,
    /// Current focus.
    pub attention_focus: AttentionFocus,
    /// Recent events.
    pub consciousness_stream: ConsciousnessStream,
    /// Quality metrics.
    pub consciousness_quality: ConsciousnessQuality,
    /// When this snapshot was built.
    pub timestamp: DateTime<Utc>,
}

impl Default for ConsciousnessState {
    fn default() -> Self {
        let attention_focus = AttentionFocus::default();
        let awareness_level = 0.5;
        let cognitive_load = 0.3;
        let metacognition_level = 0.5;
        Self {
            version: 0,
            awareness_level,
            cognitive_load,
            metacognition_level,
            state_coherence: state_coherence(
                awareness_level,
                attention_focus.intensity,
                metacognition_level,
            ),
            consciousness_quality: ConsciousnessQuality::derive(
                awareness_level,
                attention_focus.coherence,
                cognitive_load,
                metacognition_level,
            ),
            attention_focus,
            consciousness_stream: ConsciousnessStream::default(),
            timestamp: Utc::now(),
        }
    }
}

/// `0.6·(1-|awareness-intensity|) + 0.4·(meta>0.5 ? 1-|meta-awareness| : 0.7)`.
#[must_use]
pub fn state_coherence(awareness: f32, attention_intensity: f32, metacognition: f32) -> f32 {
    let alignment = 1.0 - (awareness - attention_intensity).abs();
    let reflective = if metacognition > 0.5 {
        1.0 - (metacognition - awareness).abs()
    } else {
        0.7
    };
    unit(0.6f32.mul_add(alignment, 0.4 * reflective))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_drops_oldest_first() {
        let mut stream = ConsciousnessStream::default();
        for idx in 0..25 {
            stream.push(
                ConsciousnessEvent::new(ConsciousnessEventType::IdleReflection, "tick", 0.2)
                    .with_meta("idx", idx),
            );
        }
        assert_eq!(stream.len(), MAX_STREAM_CAPACITY);
        let first = stream.iter().next().unwrap();
        assert_eq!(first.metadata["idx"], "5");
        assert_eq!(stream.latest().unwrap().metadata["idx"], "24");
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(ConsciousnessStream::with_capacity(500).capacity(), MAX_STREAM_CAPACITY);
        assert_eq!(ConsciousnessStream::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn quality_weights() {
        let quality = ConsciousnessQuality::derive(0.8, 0.6, 0.4, 0.5);
        assert!((quality.clarity - 0.7).abs() < 1e-6);
        assert!((quality.efficiency - 0.6).abs() < 1e-6);
        assert!((quality.overall_quality - 0.61).abs() < 1e-6);
    }

    #[test]
    fn coherence_uses_flat_term_for_low_metacognition() {
        assert!((state_coherence(0.5, 0.5, 0.4) - 0.88).abs() < 1e-6);
        assert!((state_coherence(0.6, 0.4, 0.8) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn oversized_stored_stream_is_rebounded() {
        let events: Vec<serde_json::Value> = (0..30)
            .map(|idx| {
                serde_json::to_value(ConsciousnessEvent::new(
                    ConsciousnessEventType::IdleReflection,
                    format!("thought {idx}"),
                    0.5,
                ))
                .unwrap()
            })
            .collect();
        let raw = serde_json::json!({ "capacity": 500, "events": events });
        let stream: ConsciousnessStream = serde_json::from_value(raw).unwrap();
        assert_eq!(stream.capacity(), MAX_STREAM_CAPACITY);
        assert_eq!(stream.len(), MAX_STREAM_CAPACITY);
        assert_eq!(stream.iter().next().unwrap().description, "thought 10");
        assert_eq!(stream.latest().unwrap().description, "thought 29");
    }

    #[test]
    fn state_json_round_trip_preserves_every_field() {
        let mut state = ConsciousnessState::default();
        state.version = 7;
        state.awareness_level = 0.734_512_3;
        state
            .attention_focus
            .attention_demands
            .insert("novelty".into(), 0.333_333_34);
        state.consciousness_stream.push(
            ConsciousnessEvent::new(ConsciousnessEventType::AttentionShift, "shift", 0.9)
                .with_meta("topic", "ruins"),
        );
        let json = serde_json::to_string(&state).unwrap();
        let restored: ConsciousnessState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
