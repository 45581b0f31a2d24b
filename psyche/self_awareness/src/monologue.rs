use psyche_consciousness::ConsciousnessState;
use psyche_persona::{EmotionMapExt, Player};
use serde::{Deserialize, Serialize};

use crate::{insight::SelfAwarenessInsight, stats::unit};

/// Theme of one inner thought.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MonologueTheme {
    /// What currently holds attention.
    Focus,
    /// How the character is feeling.
    Emotion,
    /// Observations about itself.
    SelfReflection,
    /// Strain from load.
    Strain,
    /// Open questions about identity.
    Existential,
}

/// One inner thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonologueThought {
    /// Theme.
    pub theme: MonologueTheme,
    /// Thought text.
    pub content: String,
    /// Salience, `[0, 1]`.
    pub intensity: f32,
}

/// Inner narrative for a moment in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalMonologue {
    /// Thoughts, most salient first.
    pub thoughts: Vec<MonologueThought>,
    /// Thoughts joined into prose.
    pub narrative: String,
    /// Theme of the most salient thought.
    pub dominant_theme: MonologueTheme,
}

pub(crate) fn compose(
    player: &Player,
    insight: Option<&SelfAwarenessInsight>,
    state: &ConsciousnessState,
) -> InternalMonologue {
    let mut thoughts = vec![MonologueThought {
        theme: MonologueTheme::Focus,
        content: format!(
            "My attention keeps returning to {}.",
            state.attention_focus.primary_focus
        ),
        intensity: unit(state.attention_focus.intensity),
    }];

    if let Some((emotion, value)) = player.emotions.dominant_emotion() {
        thoughts.push(MonologueThought {
            theme: MonologueTheme::Emotion,
            content: format!("There is {emotion} in me right now."),
            intensity: unit(value),
        });
    }

    if state.cognitive_load > 0.7 {
        thoughts.push(MonologueThought {
            theme: MonologueTheme::Strain,
            content: "So much is happening at once; I should slow down.".to_string(),
            intensity: unit(state.cognitive_load),
        });
    }

    if let Some(insight) = insight {
        for observation in insight.metacognitive_insights.iter().take(2) {
            thoughts.push(MonologueThought {
                theme: MonologueTheme::SelfReflection,
                content: format!("I notice that {}.", observation.description),
                intensity: unit(observation.confidence),
            });
        }
        if let Some(question) = insight.self_directed_questions.first() {
            thoughts.push(MonologueThought {
                theme: MonologueTheme::Existential,
                content: question.clone(),
                intensity: unit(insight.self_reflection_level),
            });
        }
    } else if state.metacognition_level > 0.6 {
        thoughts.push(MonologueThought {
            theme: MonologueTheme::SelfReflection,
            content: "I can watch my own thoughts forming.".to_string(),
            intensity: unit(state.metacognition_level),
        });
    }

    thoughts.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    let dominant_theme = thoughts
        .first()
        .map_or(MonologueTheme::Focus, |thought| thought.theme);
    let narrative = thoughts
        .iter()
        .map(|thought| thought.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    InternalMonologue {
        thoughts,
        narrative,
        dominant_theme,
    }
}
