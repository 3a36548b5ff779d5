// Scorecard model: the plain-data snapshot types the engine folds ball events
// into. Everything here is serializable so the host can persist snapshots as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::EnumIter;

pub const BALLS_PER_OVER: u16 = 6;
pub const MAX_WICKETS: u8 = 10;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid ball: {0}")]
    InvalidBall(String),
    #[error("innings is closed")]
    InningsClosed,
    #[error("bowler {0} bowled the previous over")]
    BowlerRepeat(String),
    #[error("not enough history to undo")]
    InsufficientHistory,
    #[error("roster error: {0}")]
    Roster(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TossDecision {
    Bat,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum DismissalKind {
    Bowled,
    Caught,
    Lbw,
    Stumped,
    RunOut,
    ObstructingField,
}

impl DismissalKind {
    /// Run-outs and obstruction are fielding dismissals; the bowler is not
    /// credited with the wicket.
    pub fn credits_bowler(&self) -> bool {
        !matches!(self, DismissalKind::RunOut | DismissalKind::ObstructingField)
    }

    /// Only fielding dismissals can coexist with a wide.
    pub fn possible_off_wide(&self) -> bool {
        !self.credits_bowler()
    }
}

impl fmt::Display for DismissalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DismissalKind::Bowled => "bowled",
                DismissalKind::Caught => "caught",
                DismissalKind::Lbw => "lbw",
                DismissalKind::Stumped => "stumped",
                DismissalKind::RunOut => "run out",
                DismissalKind::ObstructingField => "obstructing the field",
            }
        )
    }
}

/// Finalized dismissal record attached to a batting entry once out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HowOut {
    pub kind: DismissalKind,
    pub bowler: Option<String>,
    pub fielder: Option<String>,
}

/// Which crease a batsman occupies. Used to hand the incoming batsman the
/// end the dismissed one vacated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreaseEnd {
    Striker,
    NonStriker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingEntry {
    pub name: String,
    pub runs: u16,
    pub balls_faced: u16,
    pub fours: u8,
    pub sixes: u8,
    /// 0 while the batsman has not come in yet.
    pub batting_position: u8,
    pub is_striker: bool,
    pub is_non_striker: bool,
    pub is_out: bool,
    pub how_out: Option<HowOut>,
}

impl BattingEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            runs: 0,
            balls_faced: 0,
            fours: 0,
            sixes: 0,
            batting_position: 0,
            is_striker: false,
            is_non_striker: false,
            is_out: false,
            how_out: None,
        }
    }

    pub fn at_crease(&self) -> bool {
        self.is_striker || self.is_non_striker
    }

    pub fn strike_rate(&self) -> f64 {
        if self.balls_faced == 0 {
            0.0
        } else {
            self.runs as f64 * 100.0 / self.balls_faced as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlingEntry {
    pub name: String,
    pub balls_bowled: u16,
    pub runs_conceded: u16,
    pub wickets: u8,
    pub maidens: u8,
    /// Count of wides bowled (not the runs they cost).
    pub wides: u8,
    pub no_balls: u8,
    /// Names of the batsmen this bowler has dismissed.
    pub dismissals: Vec<String>,
    pub is_current_bowler: bool,
}

impl BowlingEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            balls_bowled: 0,
            runs_conceded: 0,
            wickets: 0,
            maidens: 0,
            wides: 0,
            no_balls: 0,
            dismissals: Vec::new(),
            is_current_bowler: false,
        }
    }

    pub fn overs_display(&self) -> String {
        overs_display(self.balls_bowled)
    }

    pub fn economy(&self) -> f64 {
        if self.balls_bowled == 0 {
            0.0
        } else {
            self.runs_conceded as f64 * BALLS_PER_OVER as f64 / self.balls_bowled as f64
        }
    }
}

/// Team-level runs not credited to any batsman.
///
/// `wides` holds every run scored off wides (penalty plus any run); `no_balls`
/// holds only the one-run penalties — bat runs off a no-ball stay with the
/// striker, and byes/leg-byes riding a no-ball land in their own buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extras {
    pub wides: u16,
    pub no_balls: u16,
    pub byes: u16,
    pub leg_byes: u16,
}

impl Extras {
    pub fn total(&self) -> u16 {
        self.wides + self.no_balls + self.byes + self.leg_byes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partnership {
    pub batsman1: String,
    pub batsman2: String,
    pub runs: u16,
    pub balls: u16,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Partnership {
    pub fn open(batsman1: &str, batsman2: &str) -> Self {
        Self {
            batsman1: batsman1.to_string(),
            batsman2: batsman2.to_string(),
            runs: 0,
            balls: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// Immutable record of the score when a wicket fell. Appended only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallOfWicket {
    pub batsman_out: String,
    pub runs_at_fall: u16,
    pub overs_at_fall: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InningsPhase {
    AwaitingOpeningPlayers,
    InProgress,
    AwaitingNewBowler,
    AwaitingNewBatsman,
    Completed,
}

/// One line of the ball-by-ball log kept for the commentary feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallRecord {
    pub over: u16,
    pub ball: u16,
    pub runs: u16,
    pub wicket: bool,
    pub commentary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Innings {
    pub inning_number: u8,
    pub batting_team: String,
    pub bowling_team: String,
    pub batting_order: Vec<BattingEntry>,
    pub bowling_order: Vec<BowlingEntry>,
    pub total_runs: u16,
    pub wickets: u8,
    /// Count of legal deliveries; the overs display derives from this.
    pub balls_legal: u16,
    pub extras: Extras,
    pub partnerships: Vec<Partnership>,
    pub fall_of_wickets: Vec<FallOfWicket>,
    pub ball_log: Vec<BallRecord>,
    pub overs_limit: u8,
    pub target: Option<u16>,
    pub phase: InningsPhase,
    /// One entry per completed over, in order. The consecutive-over rule is a
    /// pure function of the last entry.
    pub recent_bowlers: Vec<String>,
    /// Runs charged to the bowler so far in the current over, for maidens.
    pub current_over_conceded: u16,
    /// Set while a dismissal waits for its replacement batsman.
    pub vacant_end: Option<CreaseEnd>,
    /// An over boundary crossed on a wicket ball; collected once the new
    /// batsman is in.
    pub over_break_pending: bool,
    pub updated_at: DateTime<Utc>,
}

impl Innings {
    pub fn new(
        inning_number: u8,
        batting: &TeamRoster,
        bowling: &TeamRoster,
        overs_limit: u8,
        target: Option<u16>,
    ) -> Self {
        Self {
            inning_number,
            batting_team: batting.name.clone(),
            bowling_team: bowling.name.clone(),
            batting_order: batting.players.iter().map(|p| BattingEntry::new(p)).collect(),
            bowling_order: bowling.players.iter().map(|p| BowlingEntry::new(p)).collect(),
            total_runs: 0,
            wickets: 0,
            balls_legal: 0,
            extras: Extras::default(),
            partnerships: Vec::new(),
            fall_of_wickets: Vec::new(),
            ball_log: Vec::new(),
            overs_limit,
            target,
            phase: InningsPhase::AwaitingOpeningPlayers,
            recent_bowlers: Vec::new(),
            current_over_conceded: 0,
            vacant_end: None,
            over_break_pending: false,
            updated_at: Utc::now(),
        }
    }

    pub fn overs_display(&self) -> String {
        overs_display(self.balls_legal)
    }

    pub fn striker(&self) -> Option<&BattingEntry> {
        self.batting_order.iter().find(|p| p.is_striker)
    }

    pub fn non_striker(&self) -> Option<&BattingEntry> {
        self.batting_order.iter().find(|p| p.is_non_striker)
    }

    pub fn current_bowler(&self) -> Option<&BowlingEntry> {
        self.bowling_order.iter().find(|p| p.is_current_bowler)
    }

    pub fn batsman(&self, name: &str) -> Option<&BattingEntry> {
        self.batting_order.iter().find(|p| p.name == name)
    }

    pub fn bowler(&self, name: &str) -> Option<&BowlingEntry> {
        self.bowling_order.iter().find(|p| p.name == name)
    }

    /// Batsmen who are neither out nor currently at the crease.
    pub fn remaining_batsmen(&self) -> usize {
        self.batting_order
            .iter()
            .filter(|p| !p.is_out && !p.at_crease())
            .count()
    }

    pub fn is_completed(&self) -> bool {
        self.phase == InningsPhase::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRoster {
    pub name: String,
    pub players: Vec<String>,
}

impl TeamRoster {
    pub fn new(name: &str, players: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            players: players.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Scheduled,
    Live,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchResult {
    Win { team: String },
    Draw,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Win { team } => write!(f, "{team}"),
            MatchResult::Draw => write!(f, "Draw"),
        }
    }
}

pub fn overs_display(balls: u16) -> String {
    format!("{}.{}", balls / BALLS_PER_OVER, balls % BALLS_PER_OVER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn overs_display_derives_from_legal_balls() {
        assert_eq!(overs_display(0), "0.0");
        assert_eq!(overs_display(5), "0.5");
        assert_eq!(overs_display(6), "1.0");
        assert_eq!(overs_display(13), "2.1");
    }

    #[test]
    fn only_fielding_dismissals_skip_bowler_credit() {
        for kind in DismissalKind::iter() {
            let expected = !matches!(kind, DismissalKind::RunOut | DismissalKind::ObstructingField);
            assert_eq!(kind.credits_bowler(), expected, "{kind}");
        }
    }

    #[test]
    fn extras_total_sums_all_buckets() {
        let extras = Extras {
            wides: 3,
            no_balls: 2,
            byes: 4,
            leg_byes: 1,
        };
        assert_eq!(extras.total(), 10);
    }

    #[test]
    fn strike_rate_and_economy_handle_zero_balls() {
        let batsman = BattingEntry::new("A");
        assert_eq!(batsman.strike_rate(), 0.0);
        let bowler = BowlingEntry::new("B");
        assert_eq!(bowler.economy(), 0.0);
    }

    #[test]
    fn new_innings_copies_both_rosters() {
        let batting = TeamRoster::new("Tigers", &["A", "B", "C"]);
        let bowling = TeamRoster::new("Lions", &["X", "Y", "Z"]);
        let innings = Innings::new(1, &batting, &bowling, 20, None);
        assert_eq!(innings.batting_order.len(), 3);
        assert_eq!(innings.bowling_order.len(), 3);
        assert_eq!(innings.phase, InningsPhase::AwaitingOpeningPlayers);
        assert!(innings.striker().is_none());
        assert_eq!(innings.remaining_batsmen(), 3);
    }
}
