use serde::{Deserialize, Serialize};

use crate::{insight::SelfAwarenessInsight, stats::mean};

const TREND_THRESHOLD: f32 = 0.05;

/// Direction of self-awareness over time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionTrend {
    /// Coherence is rising.
    Ascending,
    /// No meaningful change.
    Stable,
    /// Coherence is falling.
    Declining,
}

/// Trend of consciousness coherence across successive insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfAwarenessEvolution {
    /// Coherence per insight, oldest first.
    pub trajectory: Vec<f32>,
    /// Newest minus oldest coherence.
    pub growth_rate: f32,
    /// First differences of the trajectory.
    pub velocity: Vec<f32>,
    /// Mean of the second differences.
    pub acceleration: f32,
    /// Overall direction.
    pub trend: EvolutionTrend,
    /// Notable points along the way.
    pub milestones: Vec<String>,
}

pub(crate) fn track(insights: &[SelfAwarenessInsight]) -> SelfAwarenessEvolution {
    let trajectory: Vec<f32> = insights
        .iter()
        .map(|insight| insight.consciousness_coherence)
        .collect();
    let growth_rate = match (trajectory.first(), trajectory.last()) {
        (Some(oldest), Some(newest)) => newest - oldest,
        _ => 0.0,
    };
    let velocity: Vec<f32> = trajectory.windows(2).map(|w| w[1] - w[0]).collect();
    let second: Vec<f32> = velocity.windows(2).map(|w| w[1] - w[0]).collect();
    let acceleration = mean(&second).unwrap_or(0.0);
    let trend = if growth_rate > TREND_THRESHOLD {
        EvolutionTrend::Ascending
    } else if growth_rate < -TREND_THRESHOLD {
        EvolutionTrend::Declining
    } else {
        EvolutionTrend::Stable
    };

    let mut milestones = Vec::new();
    if let Some(idx) = trajectory.iter().position(|c| *c >= 0.7) {
        milestones.push(format!("coherence reached 0.7 at insight {}", idx + 1));
    }
    if let Some(idx) = insights
        .iter()
        .position(|insight| !insight.metacognitive_insights.is_empty())
    {
        milestones.push(format!("first self-observation at insight {}", idx + 1));
    }
    if let Some((idx, jump)) = velocity
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .filter(|(_, jump)| **jump > 0.1)
    {
        milestones.push(format!("largest leap of {jump:.2} before insight {}", idx + 2));
    }

    SelfAwarenessEvolution {
        trajectory,
        growth_rate,
        velocity,
        acceleration,
        trend,
        milestones,
    }
}
