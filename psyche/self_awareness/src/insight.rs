use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use psyche_persona::{text, DialogueEntry, EmotionMap, EmotionMapExt, Player};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stats::{mean, unit, variance};

const MAX_QUESTIONS: usize = 5;
const CONSISTENCY_THRESHOLD: f32 = 0.7;
const DISTINCT_TOPIC_THRESHOLD: usize = 8;
const GROWTH_THRESHOLD: f32 = 0.1;
const ACTIVE_EMOTION_THRESHOLD: f32 = 0.3;

const EXISTENTIAL_QUESTIONS: [&str; 3] = [
    "Who am I beyond these conversations?",
    "What does it mean for me to remember someone?",
    "Am I the same self from one exchange to the next?",
];

/// How the character's recent replies match its declared style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSelfAnalysis {
    /// Alignment of each reply with the declared style, oldest first.
    pub alignment_scores: Vec<f32>,
    /// `1 - variance(alignment_scores)`, 0.5 without history.
    pub behavior_consistency: f32,
    /// Mean alignment, 0.5 without history.
    pub personality_expression: f32,
    /// Label of the declared style.
    pub declared_style: String,
    /// Trust in the analysis; grows with the number of replies.
    pub confidence: f32,
}

/// What the character can tell about its own feelings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalSelfAwareness {
    /// Peak of the current emotions, 0.3 when there are none.
    pub emotional_clarity: f32,
    /// Overlap between current and historically predominant emotions.
    pub emotional_accuracy: f32,
    /// Awareness of the emotional mix as a whole.
    pub meta_emotional_awareness: f32,
    /// Emotions currently above 0.3.
    pub active_emotions: Vec<String>,
    /// Up to three emotions that dominated past replies.
    pub historical_emotions: Vec<String>,
}

/// Kind of self-observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetacognitiveInsightType {
    /// Replies drift from the declared style.
    InconsistencyRecognition,
    /// Many distinct topics were handled.
    CapabilityRecognition,
    /// Emotional vocabulary widened over time.
    GrowthRecognition,
}

/// One observation the character makes about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetacognitiveInsight {
    /// Kind of observation.
    pub insight_type: MetacognitiveInsightType,
    /// Narrative description.
    pub description: String,
    /// Confidence, `[0, 1]`.
    pub confidence: f32,
}

/// Bookkeeping for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    /// History entries examined.
    pub entries_analyzed: usize,
    /// Wall time spent, in milliseconds.
    pub processing_time_ms: u64,
    /// Fraction of a full analysis window that was available.
    pub analysis_depth: f32,
}

/// Aggregate self-awareness produced by one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfAwarenessInsight {
    /// Unique identifier.
    pub id: Uuid,
    /// Behavioural self-analysis.
    pub behavior_analysis: BehaviorSelfAnalysis,
    /// Emotional self-awareness.
    pub emotional_awareness: EmotionalSelfAwareness,
    /// Observations about itself.
    pub metacognitive_insights: Vec<MetacognitiveInsight>,
    /// `0.4·consistency + 0.3·clarity + 0.3·expression`.
    pub consciousness_coherence: f32,
    /// Deduplicated questions, at most five.
    pub self_directed_questions: Vec<String>,
    /// Overall reflectiveness, never negative.
    pub self_reflection_level: f32,
    /// Bookkeeping.
    pub processing_metrics: ProcessingMetrics,
    /// When the insight was produced.
    pub generated_at: DateTime<Utc>,
}

pub(crate) fn analyze_behavior(player: &Player, recent: &[DialogueEntry]) -> BehaviorSelfAnalysis {
    let style = player.personality.communication_style;
    let alignment_scores: Vec<f32> = recent
        .iter()
        .map(|entry| style.alignment_score(&entry.response))
        .collect();
    let behavior_consistency = variance(&alignment_scores).map_or(0.5, |v| unit(1.0 - v));
    let personality_expression = mean(&alignment_scores).map_or(0.5, unit);
    #[allow(clippy::cast_precision_loss)]
    let confidence = (recent.len() as f32 / 10.0).clamp(0.2, 1.0);
    BehaviorSelfAnalysis {
        alignment_scores,
        behavior_consistency,
        personality_expression,
        declared_style: style.label().to_string(),
        confidence,
    }
}

/// Up to three emotion names with the largest summed intensity across
/// `entries`; earlier names win ties.
pub(crate) fn predominant_emotions(entries: &[DialogueEntry]) -> Vec<String> {
    let mut totals: IndexMap<&str, f32> = IndexMap::new();
    for entry in entries {
        for (name, value) in &entry.emotions {
            if value.is_finite() {
                *totals.entry(name.as_str()).or_insert(0.0) += value;
            }
        }
    }
    let mut ranked: Vec<(&str, f32)> = totals.into_iter().filter(|(_, v)| *v > 0.0).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(3)
        .map(|(name, _)| name.to_string())
        .collect()
}

pub(crate) fn analyze_emotions(
    player: &Player,
    recent: &[DialogueEntry],
    emotional_state: &EmotionMap,
) -> EmotionalSelfAwareness {
    let emotional_clarity = if emotional_state.is_empty() {
        0.3
    } else {
        unit(emotional_state.peak_intensity())
    };

    let active_emotions = emotional_state.active_emotions(ACTIVE_EMOTION_THRESHOLD);
    let mut historical_emotions = predominant_emotions(recent);
    if historical_emotions.is_empty() {
        historical_emotions = player
            .emotional_profile
            .predominant_emotions
            .iter()
            .take(3)
            .cloned()
            .collect();
    }
    let current: HashSet<&str> = active_emotions.iter().map(String::as_str).collect();
    let historical: HashSet<&str> = historical_emotions.iter().map(String::as_str).collect();
    let emotional_accuracy = jaccard(&current, &historical);

    let present = emotional_state.active_emotions(0.1);
    let balance = if emotional_state.is_empty() {
        0.5
    } else {
        unit(1.0 - (emotional_state.peak_intensity() - emotional_state.mean_intensity()))
    };
    #[allow(clippy::cast_precision_loss)]
    let breadth = (present.len() as f32 / 5.0).min(1.0);
    let meta_emotional_awareness = unit(0.5f32.mul_add(breadth, 0.5 * balance));

    EmotionalSelfAwareness {
        emotional_clarity,
        emotional_accuracy,
        meta_emotional_awareness,
        active_emotions,
        historical_emotions,
    }
}

/// Set-overlap ratio, 0.5 when both sets are empty.
#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.5;
    }
    a.intersection(b).count() as f32 / a.union(b).count() as f32
}

fn entry_topic(entry: &DialogueEntry) -> Option<String> {
    entry
        .topic
        .clone()
        .or_else(|| text::content_tokens(&entry.prompt).into_iter().next())
}

fn emotional_vocabulary(entries: &[DialogueEntry]) -> usize {
    entries
        .iter()
        .flat_map(|entry| entry.emotions.active_emotions(0.1))
        .collect::<HashSet<_>>()
        .len()
}

/// Relative growth of distinct emotions between the older and newer half.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn vocabulary_growth(entries: &[DialogueEntry]) -> f32 {
    let (older, newer) = entries.split_at(entries.len() / 2);
    let before = emotional_vocabulary(older);
    let after = emotional_vocabulary(newer);
    (after as f32 - before as f32) / before.max(1) as f32
}

pub(crate) fn metacognitive_insights(
    behavior: &BehaviorSelfAnalysis,
    recent: &[DialogueEntry],
) -> Vec<MetacognitiveInsight> {
    let mut insights = Vec::new();
    if recent.len() >= 2 && behavior.behavior_consistency < CONSISTENCY_THRESHOLD {
        insights.push(MetacognitiveInsight {
            insight_type: MetacognitiveInsightType::InconsistencyRecognition,
            description: format!(
                "my replies keep drifting away from my {} voice",
                behavior.declared_style
            ),
            confidence: unit(1.0 - behavior.behavior_consistency),
        });
    }

    let topics: HashSet<String> = recent.iter().filter_map(entry_topic).collect();
    if topics.len() > DISTINCT_TOPIC_THRESHOLD {
        #[allow(clippy::cast_precision_loss)]
        let confidence = (topics.len() as f32 / 16.0).min(1.0);
        insights.push(MetacognitiveInsight {
            insight_type: MetacognitiveInsightType::CapabilityRecognition,
            description: format!("I have handled {} different topics recently", topics.len()),
            confidence,
        });
    }

    if recent.len() >= 4 {
        let growth = vocabulary_growth(recent);
        if growth > GROWTH_THRESHOLD {
            insights.push(MetacognitiveInsight {
                insight_type: MetacognitiveInsightType::GrowthRecognition,
                description: "the range of feelings I express has been widening".to_string(),
                confidence: unit(growth),
            });
        }
    }
    insights
}

pub(crate) fn self_directed_questions(
    insights: &[MetacognitiveInsight],
    emotional: &EmotionalSelfAwareness,
) -> Vec<String> {
    let mut candidates: Vec<String> = insights
        .iter()
        .map(|insight| match insight.insight_type {
            MetacognitiveInsightType::InconsistencyRecognition => {
                "Why do I sound different from one reply to the next?".to_string()
            }
            MetacognitiveInsightType::CapabilityRecognition => {
                "What draws me toward so many different subjects?".to_string()
            }
            MetacognitiveInsightType::GrowthRecognition => {
                "How have my feelings been changing lately?".to_string()
            }
        })
        .collect();
    if emotional.emotional_clarity < 0.4 {
        candidates.push("What am I actually feeling right now?".to_string());
    }
    if emotional.emotional_accuracy < 0.3 {
        candidates.push("Why do I feel differently from how I usually do?".to_string());
    }
    candidates.extend(EXISTENTIAL_QUESTIONS.iter().map(ToString::to_string));

    let mut seen = HashSet::new();
    candidates.retain(|question| seen.insert(question.clone()));
    candidates.truncate(MAX_QUESTIONS);
    candidates
}

/// Builds the insight; `processing_time_ms` is filled in by the engine.
pub(crate) fn build_insight(
    player: &Player,
    recent: &[DialogueEntry],
    emotional_state: &EmotionMap,
) -> SelfAwarenessInsight {
    let behavior_analysis = analyze_behavior(player, recent);
    let emotional_awareness = analyze_emotions(player, recent, emotional_state);
    let metacognitive_insights = metacognitive_insights(&behavior_analysis, recent);
    let self_directed_questions = self_directed_questions(&metacognitive_insights, &emotional_awareness);
    let consciousness_coherence = unit(0.4f32.mul_add(
        behavior_analysis.behavior_consistency,
        0.3f32.mul_add(
            emotional_awareness.emotional_clarity,
            0.3 * behavior_analysis.personality_expression,
        ),
    ));
    #[allow(clippy::cast_precision_loss)]
    let analysis_depth = (recent.len() as f32 / 10.0).min(1.0);
    let self_reflection_level = unit(0.5f32.mul_add(
        unit(player.self_awareness.self_reflection_level),
        0.3f32.mul_add(emotional_awareness.meta_emotional_awareness, 0.2 * analysis_depth),
    ));
    SelfAwarenessInsight {
        id: Uuid::new_v4(),
        behavior_analysis,
        emotional_awareness,
        metacognitive_insights,
        consciousness_coherence,
        self_directed_questions,
        self_reflection_level,
        processing_metrics: ProcessingMetrics {
            entries_analyzed: recent.len(),
            processing_time_ms: 0,
            analysis_depth,
        },
        generated_at: Utc::now(),
    }
}
