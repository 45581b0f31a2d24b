use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use psyche_persona::Player;

use crate::error::DialogueError;

/// Persistence contract for player records.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Loads a player; `NotFound` when the id is unknown.
    async fn get_player(&self, player_id: &str) -> Result<Player, DialogueError>;

    /// Writes the player back, replacing the stored record.
    async fn update_player(&self, player: &Player) -> Result<(), DialogueError>;
}

/// Process-local store, used offline and in tests.
#[derive(Debug, Default)]
pub struct InMemoryPlayerStore {
    players: RwLock<IndexMap<String, Player>>,
    writes: AtomicUsize,
}

impl InMemoryPlayerStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a record without counting it as a write.
    pub fn insert(&self, player: Player) {
        self.players.write().insert(player.id.clone(), player);
    }

    /// Current record for `player_id`.
    #[must_use]
    pub fn get(&self, player_id: &str) -> Option<Player> {
        self.players.read().get(player_id).cloned()
    }

    /// Number of `update_player` calls served.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PlayerStore for InMemoryPlayerStore {
    async fn get_player(&self, player_id: &str) -> Result<Player, DialogueError> {
        self.get(player_id)
            .ok_or_else(|| DialogueError::NotFound(player_id.to_string()))
    }

    async fn update_player(&self, player: &Player) -> Result<(), DialogueError> {
        self.players
            .write()
            .insert(player.id.clone(), player.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_player_is_not_found() {
        let store = InMemoryPlayerStore::new();
        let err = store.get_player("ghost").await.unwrap_err();
        assert!(matches!(err, DialogueError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn updates_replace_and_count() {
        let store = InMemoryPlayerStore::new();
        store.insert(Player::new("p1", "Mira"));
        let mut player = store.get_player("p1").await.unwrap();
        player.name = "Mira the Bold".into();
        store.update_player(&player).await.unwrap();
        assert_eq!(store.get("p1").unwrap().name, "Mira the Bold");
        assert_eq!(store.write_count(), 1);
    }
}
