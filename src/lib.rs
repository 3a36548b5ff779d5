// Library crate for the cricket scoring engine
// This file exposes the public API for integration tests

pub mod scoring;

// Re-export commonly used types for easier access in tests
pub use scoring::{
    BallEvent, BallOutcome, DismissalKind, InMemoryMatchStore, MatchResult, MatchState,
    MatchStatus, NoBallRuns, OpeningPlayers, ScoringError, ScoringService, TeamRoster,
    TossDecision, WicketDetail,
};
