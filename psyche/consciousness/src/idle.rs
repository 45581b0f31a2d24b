use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::state::{
    state_coherence, ConsciousnessEvent, ConsciousnessEventType, ConsciousnessQuality,
    ConsciousnessState,
};

/// Report produced by one idle period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessIdleSimulation {
    /// Requested idle time.
    pub requested: Duration,
    /// Decay steps applied and published.
    pub ticks_completed: usize,
    /// One event per completed tick, oldest first.
    pub idle_events: Vec<ConsciousnessEvent>,
    /// Mean absolute change of awareness, attention intensity and load.
    pub consciousness_shift: f32,
    /// Qualitative observations about the idle period.
    pub insights: Vec<String>,
    /// `false` when cancelled before the requested time elapsed.
    pub completed: bool,
    /// Version of the last published state.
    pub final_state_version: u64,
}

/// One idle decay step. `noise` is expected in `[0, 1]`.
pub(crate) fn decay(previous: &ConsciousnessState, noise: f32) -> ConsciousnessState {
    let mut next = previous.clone();
    next.attention_focus.intensity = (next.attention_focus.intensity * 0.95).clamp(0.0, 1.0);
    next.attention_focus.coherence = (next.attention_focus.coherence * 0.98).clamp(0.0, 1.0);
    let awareness = 0.05f32.mul_add(noise.clamp(0.0, 1.0), previous.awareness_level * 0.95);
    next.awareness_level = if awareness.is_nan() {
        0.2
    } else {
        awareness.clamp(0.2, 1.0)
    };
    next.cognitive_load = (previous.cognitive_load * 0.9).clamp(0.0, 1.0);
    next.consciousness_quality = ConsciousnessQuality::derive(
        next.awareness_level,
        next.attention_focus.coherence,
        next.cognitive_load,
        next.metacognition_level,
    );
    next.state_coherence = state_coherence(
        next.awareness_level,
        next.attention_focus.intensity,
        next.metacognition_level,
    );
    next
}

pub(crate) fn idle_event(
    event_type: ConsciousnessEventType,
    thought: Option<&str>,
    intensity: f32,
) -> ConsciousnessEvent {
    let description = match (event_type, thought) {
        (ConsciousnessEventType::MemoryConsolidation, Some(thought)) => {
            format!("consolidating memories around '{thought}'")
        }
        (ConsciousnessEventType::IdleReflection, Some(thought)) => {
            format!("drifting reflection on '{thought}'")
        }
        (_, Some(thought)) => format!("background processing of '{thought}'"),
        (ConsciousnessEventType::MemoryConsolidation, None) => "consolidating recent memories".into(),
        (ConsciousnessEventType::IdleReflection, None) => "quiet reflection".into(),
        (_, None) => "background processing".into(),
    };
    let event = ConsciousnessEvent::new(event_type, description, intensity);
    match thought {
        Some(thought) => event.with_meta("thought", thought),
        None => event,
    }
}

/// Mean of the absolute changes of awareness, attention intensity and load.
pub(crate) fn consciousness_shift(start: &ConsciousnessState, end: &ConsciousnessState) -> f32 {
    let awareness = (end.awareness_level - start.awareness_level).abs();
    let intensity = (end.attention_focus.intensity - start.attention_focus.intensity).abs();
    let load = (end.cognitive_load - start.cognitive_load).abs();
    ((awareness + intensity + load) / 3.0).clamp(0.0, 1.0)
}

pub(crate) fn idle_insights(
    start: &ConsciousnessState,
    end: &ConsciousnessState,
    events: &[ConsciousnessEvent],
    completed: bool,
) -> Vec<String> {
    let mut insights = Vec::new();
    if events.is_empty() {
        insights.push("idle period ended before any background activity".to_string());
        return insights;
    }
    if end.cognitive_load < start.cognitive_load {
        insights.push(format!(
            "cognitive load eased from {:.2} to {:.2}",
            start.cognitive_load, end.cognitive_load
        ));
    }
    if end.attention_focus.intensity < start.attention_focus.intensity {
        insights.push(format!(
            "attention loosened its hold on '{}'",
            end.attention_focus.primary_focus
        ));
    }
    let consolidations = events
        .iter()
        .filter(|e| e.event_type == ConsciousnessEventType::MemoryConsolidation)
        .count();
    if consolidations > 0 {
        insights.push(format!("{consolidations} memory consolidation pass(es) ran"));
    }
    if consciousness_shift(start, end) > 0.1 {
        insights.push("rest noticeably reshaped the state of mind".to_string());
    }
    if !completed {
        insights.push("idle period was interrupted".to_string());
    }
    insights
}
