// Public API
pub use innings::OpeningPlayers;
pub use models::{
    BallRecord, BattingEntry, BowlingEntry, CreaseEnd, DismissalKind, Extras, FallOfWicket,
    HowOut, Innings, InningsPhase, MatchResult, MatchStatus, Partnership, ScoringError,
    TeamRoster, TossDecision, BALLS_PER_OVER, MAX_WICKETS,
};
pub use orchestrator::{BallOutcome, MatchState, MAX_HISTORY};
pub use repository::{InMemoryMatchStore, InningsUpdate, MatchStore, StoreError};
pub use resolver::{resolve, BallDelta, BallEvent, NoBallRuns, ResolveContext, WicketDelta, WicketDetail};
pub use service::{ScoringService, ServiceError};

// Internal modules
mod innings;
mod models;
mod orchestrator;
mod repository;
mod resolver;
mod service;
