use std::collections::HashSet;

use chrono::{DateTime, Utc};
use psyche_persona::{text, DialogueEntry, PersonalityProfile};
use serde::{Deserialize, Serialize};

use crate::stats::{mean, unit, variance};

const CONSISTENCY_THRESHOLD: f32 = 0.7;
const AUTHENTICITY_THRESHOLD: f32 = 0.8;
const UNCERTAINTY_THRESHOLD: f32 = 0.3;

/// Category of an uncertainty marker, matched in priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UncertaintyType {
    /// "not sure", "uncertain".
    Knowledge,
    /// "maybe", "perhaps".
    Decision,
    /// "might".
    Predictive,
    /// "could".
    Possibility,
}

impl UncertaintyType {
    const PRIORITY: [(Self, &'static [&'static str]); 4] = [
        (Self::Knowledge, &["not sure", "uncertain"]),
        (Self::Decision, &["maybe", "perhaps"]),
        (Self::Predictive, &["might"]),
        (Self::Possibility, &["could"]),
    ];

    /// First category whose marker appears in `text`, with the marker.
    #[must_use]
    pub fn classify(text: &str) -> Option<(Self, &'static str)> {
        Self::PRIORITY.iter().find_map(|(kind, markers)| {
            markers
                .iter()
                .find(|marker| text::contains_phrase(text, marker))
                .map(|marker| (*kind, *marker))
        })
    }
}

/// Hedge found in one reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyMarker {
    /// Index of the entry in the examined history.
    pub entry_index: usize,
    /// Matched phrase.
    pub marker: String,
    /// Category.
    pub uncertainty_type: UncertaintyType,
}

/// Shape of the replies over the examined history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePatternAnalysis {
    /// Mean reply length in words.
    pub average_length: f32,
    /// `1 - coefficient of variation` of reply length, 0.5 without history.
    pub response_consistency: f32,
    /// Mean number of emotions attached per reply.
    pub emotional_richness: f32,
    /// Share of replies that ask something back.
    pub question_ratio: f32,
    /// Topic diversity plus length variation; may exceed 1.
    pub adaptability_index: f32,
}

/// Agreement of the replies with the declared personality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityConsistencyAnalysis {
    /// Mean style alignment.
    pub mean_alignment: f32,
    /// Variance of style alignment.
    pub alignment_variance: f32,
    /// `1 - variance`.
    pub consistency_score: f32,
    /// How genuine the expressed personality reads.
    pub authenticity_score: f32,
}

/// Suggested area of improvement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementInsight {
    /// Short area label.
    pub area: String,
    /// What to change.
    pub description: String,
    /// Urgency, `[0, 1]`.
    pub priority: f32,
}

/// Result of examining the dialogue history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfExaminationResult {
    /// Reply shape.
    pub response_patterns: ResponsePatternAnalysis,
    /// Personality agreement.
    pub personality_consistency: PersonalityConsistencyAnalysis,
    /// Hedges, at most one per reply.
    pub uncertainty_markers: Vec<UncertaintyMarker>,
    /// Share of replies containing a hedge.
    pub uncertainty_level: f32,
    /// Suggested improvements.
    pub improvement_insights: Vec<ImprovementInsight>,
    /// `0.4·response + 0.4·personality + 0.2·min(1, adaptability)`.
    pub consciousness_integrity: f32,
    /// When the examination ran.
    pub examined_at: DateTime<Utc>,
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn response_patterns(history: &[DialogueEntry]) -> ResponsePatternAnalysis {
    if history.is_empty() {
        return ResponsePatternAnalysis {
            average_length: 0.0,
            response_consistency: 0.5,
            emotional_richness: 0.0,
            question_ratio: 0.0,
            adaptability_index: 0.0,
        };
    }
    let lengths: Vec<f32> = history
        .iter()
        .map(|entry| text::tokens(&entry.response).len() as f32)
        .collect();
    let average_length = mean(&lengths).unwrap_or(0.0);
    let deviation = variance(&lengths).unwrap_or(0.0).sqrt();
    let variation = if average_length > 0.0 {
        deviation / average_length
    } else {
        0.0
    };
    let richness: Vec<f32> = history.iter().map(|entry| entry.emotions.len() as f32).collect();
    let questions = history
        .iter()
        .filter(|entry| entry.response.contains('?'))
        .count();
    let topics: HashSet<String> = history
        .iter()
        .filter_map(|entry| {
            entry
                .topic
                .clone()
                .or_else(|| text::content_tokens(&entry.prompt).into_iter().next())
        })
        .collect();
    let count = history.len() as f32;
    ResponsePatternAnalysis {
        average_length,
        response_consistency: unit(1.0 - variation),
        emotional_richness: mean(&richness).unwrap_or(0.0),
        question_ratio: questions as f32 / count,
        adaptability_index: topics.len() as f32 / count + variation,
    }
}

pub(crate) fn personality_consistency(
    history: &[DialogueEntry],
    personality: &PersonalityProfile,
) -> PersonalityConsistencyAnalysis {
    let style = personality.communication_style;
    let scores: Vec<f32> = history
        .iter()
        .map(|entry| style.alignment_score(&entry.response))
        .collect();
    let Some(mean_alignment) = mean(&scores) else {
        return PersonalityConsistencyAnalysis {
            mean_alignment: 0.5,
            alignment_variance: 0.0,
            consistency_score: 0.5,
            authenticity_score: 0.5,
        };
    };
    let alignment_variance = variance(&scores).unwrap_or(0.0);
    let consistency_score = unit(1.0 - alignment_variance);
    let authenticity_score = unit(0.6f32.mul_add(mean_alignment, 0.4 * consistency_score));
    PersonalityConsistencyAnalysis {
        mean_alignment,
        alignment_variance,
        consistency_score,
        authenticity_score,
    }
}

pub(crate) fn uncertainty_markers(history: &[DialogueEntry]) -> Vec<UncertaintyMarker> {
    history
        .iter()
        .enumerate()
        .filter_map(|(entry_index, entry)| {
            UncertaintyType::classify(&entry.response).map(|(uncertainty_type, marker)| {
                UncertaintyMarker {
                    entry_index,
                    marker: marker.to_string(),
                    uncertainty_type,
                }
            })
        })
        .collect()
}

pub(crate) fn examine(
    history: &[DialogueEntry],
    personality: &PersonalityProfile,
) -> SelfExaminationResult {
    let response_patterns = response_patterns(history);
    let personality_consistency = personality_consistency(history, personality);
    let uncertainty_markers = uncertainty_markers(history);
    #[allow(clippy::cast_precision_loss)]
    let uncertainty_level = if history.is_empty() {
        0.0
    } else {
        uncertainty_markers.len() as f32 / history.len() as f32
    };

    let mut improvement_insights = Vec::new();
    if !history.is_empty() {
        if personality_consistency.consistency_score < CONSISTENCY_THRESHOLD {
            improvement_insights.push(ImprovementInsight {
                area: "consistency".into(),
                description: format!(
                    "keep replies closer to the {} voice",
                    personality.communication_style.label()
                ),
                priority: unit(CONSISTENCY_THRESHOLD - personality_consistency.consistency_score + 0.5),
            });
        }
        if personality_consistency.authenticity_score < AUTHENTICITY_THRESHOLD {
            improvement_insights.push(ImprovementInsight {
                area: "authenticity".into(),
                description: "let core values and style show more plainly".into(),
                priority: unit(AUTHENTICITY_THRESHOLD - personality_consistency.authenticity_score + 0.3),
            });
        }
        if uncertainty_level > UNCERTAINTY_THRESHOLD {
            improvement_insights.push(ImprovementInsight {
                area: "confidence".into(),
                description: "hedge less when the answer is known".into(),
                priority: unit(uncertainty_level),
            });
        }
    }

    let consciousness_integrity = unit(0.4f32.mul_add(
        response_patterns.response_consistency,
        0.4f32.mul_add(
            personality_consistency.consistency_score,
            0.2 * response_patterns.adaptability_index.min(1.0),
        ),
    ));

    SelfExaminationResult {
        response_patterns,
        personality_consistency,
        uncertainty_markers,
        uncertainty_level,
        improvement_insights,
        consciousness_integrity,
        examined_at: Utc::now(),
    }
}
