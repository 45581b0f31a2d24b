use std::collections::HashSet;

use async_trait::async_trait;
use psyche_persona::{text, EmotionMapExt, Player};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DialogueError;

const MAX_CONTEXT_TOPICS: usize = 5;

/// Past exchange ranked against the current prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMemory {
    /// History entry the memory comes from.
    pub entry_id: Uuid,
    /// Prompt of that entry.
    pub prompt: String,
    /// Response of that entry.
    pub response: String,
    /// Relevance, `[0, 1]`.
    pub score: f32,
}

/// Conversation context assembled from ranked memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedConversationContext {
    /// One-line summary for the dialogue API.
    pub summary: String,
    /// Memories backing the summary, best first.
    pub memories: Vec<RankedMemory>,
    /// Topics drawn from the memories.
    pub topics: Vec<String>,
    /// Dominant emotion of the character, when any.
    pub emotional_tone: Option<String>,
}

/// Memory retrieval contract.
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Up to `limit` past exchanges relevant to `prompt`, best first.
    async fn find_relevant_memories(
        &self,
        player: &Player,
        prompt: &str,
        limit: usize,
    ) -> Result<Vec<RankedMemory>, DialogueError>;

    /// Builds the context forwarded with the next request.
    async fn generate_conversation_context(
        &self,
        player: &Player,
        prompt: &str,
        memories: &[RankedMemory],
    ) -> Result<EnhancedConversationContext, DialogueError>;
}

/// Ranks the player's own history by token overlap and recency.
#[derive(Debug, Clone, Copy)]
pub struct KeywordMemoryService {
    recency_weight: f32,
}

impl Default for KeywordMemoryService {
    fn default() -> Self {
        Self::new(0.3)
    }
}

impl KeywordMemoryService {
    /// Creates a service; `recency_weight` is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(recency_weight: f32) -> Self {
        Self {
            recency_weight: recency_weight.clamp(0.0, 1.0),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn rank(&self, player: &Player, prompt: &str) -> Vec<RankedMemory> {
        let wanted: HashSet<String> = text::content_tokens(prompt).into_iter().collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        let total = player.dialogue_history.len() as f32;
        let mut ranked: Vec<RankedMemory> = player
            .dialogue_history
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let seen: HashSet<String> = text::content_tokens(&entry.prompt)
                    .into_iter()
                    .chain(text::content_tokens(&entry.response))
                    .collect();
                let overlap = wanted.intersection(&seen).count();
                if overlap == 0 {
                    return None;
                }
                let overlap = overlap as f32 / wanted.len() as f32;
                let recency = (index + 1) as f32 / total;
                Some(RankedMemory {
                    entry_id: entry.id,
                    prompt: entry.prompt.clone(),
                    response: entry.response.clone(),
                    score: (1.0 - self.recency_weight)
                        .mul_add(overlap, self.recency_weight * recency)
                        .clamp(0.0, 1.0),
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

#[async_trait]
impl MemoryService for KeywordMemoryService {
    async fn find_relevant_memories(
        &self,
        player: &Player,
        prompt: &str,
        limit: usize,
    ) -> Result<Vec<RankedMemory>, DialogueError> {
        let mut ranked = self.rank(player, prompt);
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn generate_conversation_context(
        &self,
        player: &Player,
        prompt: &str,
        memories: &[RankedMemory],
    ) -> Result<EnhancedConversationContext, DialogueError> {
        let prompt_tokens: HashSet<String> = text::content_tokens(prompt).into_iter().collect();
        let mut topics: Vec<String> = Vec::new();
        for token in memories
            .iter()
            .flat_map(|memory| text::content_tokens(&memory.prompt))
        {
            if prompt_tokens.contains(&token) && !topics.contains(&token) {
                topics.push(token);
            }
            if topics.len() == MAX_CONTEXT_TOPICS {
                break;
            }
        }
        let summary = match memories.first() {
            Some(best) => format!(
                "{} recalls {} related exchange(s); closest: \"{}\"",
                player.name,
                memories.len(),
                best.prompt
            ),
            None => format!("{} has no related memories", player.name),
        };
        Ok(EnhancedConversationContext {
            summary,
            memories: memories.to_vec(),
            topics,
            emotional_tone: player
                .emotions
                .dominant_emotion()
                .map(|(name, _)| name.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use psyche_persona::DialogueEntry;

    use super::*;

    fn player() -> Player {
        let mut player = Player::new("p1", "Mira");
        for (prompt, response) in [
            ("Where is the dragon lair?", "North of the river."),
            ("Do you sell potions?", "Only healing ones."),
            ("Tell me about the dragon", "It sleeps most days."),
        ] {
            player.record_dialogue(DialogueEntry::new(prompt, response), 50);
        }
        player
    }

    #[tokio::test]
    async fn overlap_and_recency_rank_memories() {
        let service = KeywordMemoryService::default();
        let memories = service
            .find_relevant_memories(&player(), "Is the dragon awake?", 5)
            .await
            .unwrap();
        assert_eq!(memories.len(), 2);
        assert_eq!(memories[0].prompt, "Tell me about the dragon");
        assert!(memories[0].score > memories[1].score);
    }

    #[tokio::test]
    async fn limit_and_empty_prompt() {
        let service = KeywordMemoryService::default();
        let player = player();
        assert_eq!(
            service
                .find_relevant_memories(&player, "dragon potions", 1)
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(service
            .find_relevant_memories(&player, "?!", 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn context_summarises_memories() {
        let service = KeywordMemoryService::default();
        let player = player();
        let memories = service
            .find_relevant_memories(&player, "dragon", 5)
            .await
            .unwrap();
        let context = service
            .generate_conversation_context(&player, "dragon", &memories)
            .await
            .unwrap();
        assert_eq!(context.topics, vec!["dragon"]);
        assert!(context.summary.contains("Mira recalls 2"));
        assert_eq!(context.emotional_tone.as_deref(), Some("calm"));

        let empty = service
            .generate_conversation_context(&player, "weather", &[])
            .await
            .unwrap();
        assert!(empty.summary.contains("no related memories"));
    }
}
