// Persistence seam for match state. The engine talks to a `MatchStore`
// trait so the host can swap the in-memory store for a real backend, and
// innings saves fan out over a broadcast channel for live scoreboards.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::scoring::models::Innings;
use crate::scoring::orchestrator::MatchState;

const WATCH_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("match {0} not found")]
    MatchNotFound(String),
    #[error("innings {1} of match {0} not found")]
    InningsNotFound(String, u8),
}

/// One innings save, as broadcast to live watchers.
#[derive(Debug, Clone)]
pub struct InningsUpdate {
    pub match_id: String,
    pub inning_number: u8,
    pub innings: Innings,
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn load_match(&self, match_id: &str) -> Result<MatchState, StoreError>;
    async fn save_match(&self, match_id: &str, state: &MatchState) -> Result<(), StoreError>;
    async fn load_innings(&self, match_id: &str, inning_number: u8)
        -> Result<Innings, StoreError>;
    async fn save_innings(&self, match_id: &str, innings: &Innings) -> Result<(), StoreError>;
    /// Subscribe to innings saves across all matches. Slow receivers drop
    /// intermediate updates rather than blocking writers.
    fn watch_innings(&self) -> broadcast::Receiver<InningsUpdate>;
}

pub struct InMemoryMatchStore {
    matches: Arc<RwLock<HashMap<String, MatchState>>>,
    updates: broadcast::Sender<InningsUpdate>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            matches: Arc::new(RwLock::new(HashMap::new())),
            updates,
        }
    }
}

impl Default for InMemoryMatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn load_match(&self, match_id: &str) -> Result<MatchState, StoreError> {
        let matches = self.matches.read().await;
        matches
            .get(match_id)
            .cloned()
            .ok_or_else(|| StoreError::MatchNotFound(match_id.to_string()))
    }

    async fn save_match(&self, match_id: &str, state: &MatchState) -> Result<(), StoreError> {
        let mut matches = self.matches.write().await;
        matches.insert(match_id.to_string(), state.clone());
        debug!(match_id, "match saved");
        Ok(())
    }

    async fn load_innings(
        &self,
        match_id: &str,
        inning_number: u8,
    ) -> Result<Innings, StoreError> {
        let matches = self.matches.read().await;
        let state = matches
            .get(match_id)
            .ok_or_else(|| StoreError::MatchNotFound(match_id.to_string()))?;
        state
            .innings
            .iter()
            .find(|i| i.inning_number == inning_number)
            .cloned()
            .ok_or_else(|| StoreError::InningsNotFound(match_id.to_string(), inning_number))
    }

    async fn save_innings(&self, match_id: &str, innings: &Innings) -> Result<(), StoreError> {
        {
            let mut matches = self.matches.write().await;
            let state = matches
                .get_mut(match_id)
                .ok_or_else(|| StoreError::MatchNotFound(match_id.to_string()))?;
            match state
                .innings
                .iter_mut()
                .find(|i| i.inning_number == innings.inning_number)
            {
                Some(slot) => *slot = innings.clone(),
                None => state.innings.push(innings.clone()),
            }
        }
        // Nobody watching is fine.
        let _ = self.updates.send(InningsUpdate {
            match_id: match_id.to_string(),
            inning_number: innings.inning_number,
            innings: innings.clone(),
        });
        Ok(())
    }

    fn watch_innings(&self) -> broadcast::Receiver<InningsUpdate> {
        self.updates.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::models::{TeamRoster, TossDecision};

    fn sample_match() -> MatchState {
        MatchState::new(
            TeamRoster::new("Tigers", &["Asha", "Banu", "Chitra"]),
            TeamRoster::new("Lions", &["Zoya", "Yash", "Xavi"]),
            1,
            "Tigers",
            TossDecision::Bat,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn round_trips_a_match() {
        let store = InMemoryMatchStore::new();
        let state = sample_match();
        store.save_match("m1", &state).await.unwrap();
        let loaded = store.load_match("m1").await.unwrap();
        assert_eq!(loaded.innings[0].batting_team, "Tigers");
    }

    #[tokio::test]
    async fn missing_match_is_an_error() {
        let store = InMemoryMatchStore::new();
        assert_eq!(
            store.load_match("nope").await.unwrap_err(),
            StoreError::MatchNotFound("nope".to_string())
        );
        assert_eq!(
            store.load_innings("nope", 1).await.unwrap_err(),
            StoreError::MatchNotFound("nope".to_string())
        );
    }

    #[tokio::test]
    async fn innings_saves_reach_watchers() {
        let store = InMemoryMatchStore::new();
        let state = sample_match();
        store.save_match("m1", &state).await.unwrap();

        let mut watcher = store.watch_innings();
        let mut innings = state.innings[0].clone();
        innings.total_runs = 12;
        store.save_innings("m1", &innings).await.unwrap();

        let update = watcher.recv().await.unwrap();
        assert_eq!(update.match_id, "m1");
        assert_eq!(update.inning_number, 1);
        assert_eq!(update.innings.total_runs, 12);

        let loaded = store.load_innings("m1", 1).await.unwrap();
        assert_eq!(loaded.total_runs, 12);
    }
}
