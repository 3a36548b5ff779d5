// Service layer: the async entry point hosts call into. Serializes all
// mutations of one match behind a per-match lock so the load/mutate/save
// cycle never interleaves, and republishes every innings save to watchers.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::info;

use crate::scoring::innings::OpeningPlayers;
use crate::scoring::models::{ScoringError, TeamRoster, TossDecision};
use crate::scoring::orchestrator::{BallOutcome, MatchState};
use crate::scoring::repository::{InningsUpdate, MatchStore, StoreError};
use crate::scoring::resolver::BallEvent;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("match {0} already exists")]
    MatchExists(String),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ScoringService<S: MatchStore> {
    store: Arc<S>,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: MatchStore> ScoringService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Live feed of innings saves across all matches.
    pub fn watch_innings(&self) -> broadcast::Receiver<InningsUpdate> {
        self.store.watch_innings()
    }

    pub async fn create_match(
        &self,
        match_id: &str,
        team_a: TeamRoster,
        team_b: TeamRoster,
        overs_limit: u8,
        toss_winner: &str,
        toss_decision: TossDecision,
    ) -> Result<MatchState, ServiceError> {
        let lock = self.match_lock(match_id).await;
        let _guard = lock.lock().await;
        if self.store.load_match(match_id).await.is_ok() {
            return Err(ServiceError::MatchExists(match_id.to_string()));
        }
        let state = MatchState::new(team_a, team_b, overs_limit, toss_winner, toss_decision)?;
        self.store.save_match(match_id, &state).await?;
        info!(match_id, "match created");
        Ok(state)
    }

    pub async fn set_opening_players(
        &self,
        match_id: &str,
        opening: &OpeningPlayers,
    ) -> Result<MatchState, ServiceError> {
        let (_, state) = self
            .mutate(match_id, |state| state.set_opening_players(opening))
            .await?;
        Ok(state)
    }

    pub async fn apply_ball(
        &self,
        match_id: &str,
        ball: &BallEvent,
    ) -> Result<BallOutcome, ServiceError> {
        let (outcome, _) = self.mutate(match_id, |state| state.apply_ball(ball)).await?;
        if let Some(result) = &outcome.result {
            info!(match_id, result = %result, "match decided");
        }
        Ok(outcome)
    }

    pub async fn set_new_bowler(
        &self,
        match_id: &str,
        name: &str,
    ) -> Result<MatchState, ServiceError> {
        let (_, state) = self
            .mutate(match_id, |state| state.set_new_bowler(name))
            .await?;
        Ok(state)
    }

    pub async fn set_new_batsman(
        &self,
        match_id: &str,
        name: &str,
    ) -> Result<MatchState, ServiceError> {
        let (_, state) = self
            .mutate(match_id, |state| state.set_new_batsman(name))
            .await?;
        Ok(state)
    }

    pub async fn swap_strike(&self, match_id: &str) -> Result<MatchState, ServiceError> {
        let (_, state) = self.mutate(match_id, |state| state.swap_strike()).await?;
        Ok(state)
    }

    pub async fn undo(&self, match_id: &str) -> Result<MatchState, ServiceError> {
        let (_, state) = self.mutate(match_id, |state| state.undo()).await?;
        info!(match_id, "ball undone");
        Ok(state)
    }

    pub async fn match_snapshot(&self, match_id: &str) -> Result<MatchState, ServiceError> {
        Ok(self.store.load_match(match_id).await?)
    }

    /// Load-mutate-save under the per-match lock. The closure's error leaves
    /// the stored state untouched.
    async fn mutate<T, F>(&self, match_id: &str, f: F) -> Result<(T, MatchState), ServiceError>
    where
        F: FnOnce(&mut MatchState) -> Result<T, ScoringError>,
    {
        let lock = self.match_lock(match_id).await;
        let _guard = lock.lock().await;
        let mut state = self.store.load_match(match_id).await?;
        let out = f(&mut state)?;
        self.store.save_match(match_id, &state).await?;
        if let Some(innings) = state.current_innings() {
            self.store.save_innings(match_id, innings).await?;
        }
        Ok((out, state))
    }

    async fn match_lock(&self, match_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.write().await;
        locks
            .entry(match_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
