// Match orchestrator: owns the two-innings lifecycle around the innings
// state machine. Handles the toss, the innings break and target, result
// declaration, and the bounded undo history.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scoring::innings::OpeningPlayers;
use crate::scoring::models::{
    FallOfWicket, Innings, MatchResult, MatchStatus, ScoringError, TeamRoster, TossDecision,
    BALLS_PER_OVER,
};
use crate::scoring::resolver::BallEvent;

/// Snapshots retained for undo. Old entries fall off the front.
pub const MAX_HISTORY: usize = 256;

/// Everything the caller learns from one scored ball.
#[derive(Debug, Clone, PartialEq)]
pub struct BallOutcome {
    pub inning_number: u8,
    pub over_completed: bool,
    pub fall_of_wicket: Option<FallOfWicket>,
    pub commentary: String,
    pub result: Option<MatchResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub team_a: TeamRoster,
    pub team_b: TeamRoster,
    pub overs_limit: u8,
    pub toss_winner: String,
    pub toss_decision: TossDecision,
    pub status: MatchStatus,
    pub innings: Vec<Innings>,
    pub winner: Option<MatchResult>,
    /// Per-ball snapshots of the innings in play. Not persisted; undo only
    /// reaches back within the current scoring session.
    #[serde(skip)]
    history: Vec<Innings>,
}

impl MatchState {
    pub fn new(
        team_a: TeamRoster,
        team_b: TeamRoster,
        overs_limit: u8,
        toss_winner: &str,
        toss_decision: TossDecision,
    ) -> Result<Self, ScoringError> {
        if overs_limit == 0 {
            return Err(ScoringError::InvalidBall(
                "overs limit must be at least one over".into(),
            ));
        }
        if team_a.name == team_b.name {
            return Err(ScoringError::Roster(
                "both teams have the same name".into(),
            ));
        }
        for team in [&team_a, &team_b] {
            if team.players.len() < 2 {
                return Err(ScoringError::Roster(format!(
                    "{} needs at least two players",
                    team.name
                )));
            }
            for (i, player) in team.players.iter().enumerate() {
                if team.players[..i].contains(player) {
                    return Err(ScoringError::Roster(format!(
                        "{player} appears twice in {}",
                        team.name
                    )));
                }
            }
        }
        if toss_winner != team_a.name && toss_winner != team_b.name {
            return Err(ScoringError::Roster(format!(
                "{toss_winner} is not one of the teams"
            )));
        }

        let a_bats_first = match toss_decision {
            TossDecision::Bat => toss_winner == team_a.name,
            TossDecision::Field => toss_winner != team_a.name,
        };
        let (batting, bowling) = if a_bats_first {
            (&team_a, &team_b)
        } else {
            (&team_b, &team_a)
        };
        let first = Innings::new(1, batting, bowling, overs_limit, None);
        info!(
            batting = %first.batting_team,
            bowling = %first.bowling_team,
            overs = overs_limit,
            "match created"
        );
        Ok(Self {
            team_a,
            team_b,
            overs_limit,
            toss_winner: toss_winner.to_string(),
            toss_decision,
            status: MatchStatus::Scheduled,
            innings: vec![first],
            winner: None,
            history: Vec::new(),
        })
    }

    pub fn current_innings(&self) -> Option<&Innings> {
        self.innings.last()
    }

    fn current_innings_mut(&mut self) -> Result<&mut Innings, ScoringError> {
        self.innings
            .last_mut()
            .ok_or_else(|| ScoringError::Roster("match has no innings".into()))
    }

    pub fn set_opening_players(&mut self, opening: &OpeningPlayers) -> Result<(), ScoringError> {
        if self.status == MatchStatus::Completed {
            return Err(ScoringError::InningsClosed);
        }
        self.current_innings_mut()?.set_opening_players(opening)?;
        self.status = MatchStatus::Live;
        // Undo cannot reach back past the start of the innings.
        self.history.clear();
        self.push_snapshot();
        Ok(())
    }

    /// Score one ball. On innings one completing, the second innings is set
    /// up automatically with the chase target; on the chase deciding the
    /// match, the result is declared and the match closed.
    pub fn apply_ball(&mut self, ball: &BallEvent) -> Result<BallOutcome, ScoringError> {
        if self.status == MatchStatus::Completed {
            return Err(ScoringError::InningsClosed);
        }
        let (inning_number, over_completed, fall_of_wicket, commentary) = {
            let innings = self.current_innings_mut()?;
            let delta = innings.apply_ball(ball)?;
            let over_completed = delta.legal && innings.balls_legal % BALLS_PER_OVER == 0;
            let fall_of_wicket = if delta.wicket.is_some() {
                innings.fall_of_wickets.last().cloned()
            } else {
                None
            };
            let commentary = innings
                .ball_log
                .last()
                .map(|record| record.commentary.clone())
                .unwrap_or_default();
            (innings.inning_number, over_completed, fall_of_wicket, commentary)
        };
        self.push_snapshot();
        self.recompute_result();

        if self.winner.is_none() && self.innings.len() == 1 {
            if let Some(first) = self.innings.first().filter(|i| i.is_completed()) {
                let target = first.total_runs + 1;
                let batting = self.roster_by_name(&first.bowling_team)?.clone();
                let bowling = self.roster_by_name(&first.batting_team)?.clone();
                info!(
                    target,
                    batting = %batting.name,
                    "first innings complete, starting the chase"
                );
                self.innings
                    .push(Innings::new(2, &batting, &bowling, self.overs_limit, Some(target)));
                self.history.clear();
            }
        }

        Ok(BallOutcome {
            inning_number,
            over_completed,
            fall_of_wicket,
            commentary,
            result: self.winner.clone(),
        })
    }

    pub fn set_new_bowler(&mut self, name: &str) -> Result<(), ScoringError> {
        if self.status == MatchStatus::Completed {
            return Err(ScoringError::InningsClosed);
        }
        self.current_innings_mut()?.set_new_bowler(name)
    }

    pub fn set_new_batsman(&mut self, name: &str) -> Result<(), ScoringError> {
        if self.status == MatchStatus::Completed {
            return Err(ScoringError::InningsClosed);
        }
        self.current_innings_mut()?.set_new_batsman(name)
    }

    pub fn swap_strike(&mut self) -> Result<(), ScoringError> {
        if self.status == MatchStatus::Completed {
            return Err(ScoringError::InningsClosed);
        }
        self.current_innings_mut()?.swap_strike()
    }

    /// Roll the innings in play back one ball. Needs the opening snapshot
    /// plus at least two scored balls; a decided match is reopened if the
    /// deciding ball comes off.
    pub fn undo(&mut self) -> Result<(), ScoringError> {
        if self.history.len() < 3 {
            return Err(ScoringError::InsufficientHistory);
        }
        let restored = self.history[self.history.len() - 2].clone();
        let new_len = self.history.len() - 1;
        self.history.truncate(new_len);
        *self.current_innings_mut()? = restored;
        self.winner = None;
        self.status = MatchStatus::Live;
        self.recompute_result();
        Ok(())
    }

    fn push_snapshot(&mut self) {
        if let Some(innings) = self.innings.last() {
            self.history.push(innings.clone());
            if self.history.len() > MAX_HISTORY {
                self.history.remove(0);
            }
        }
    }

    /// Result is a pure function of the two innings: the chase wins the
    /// moment it reaches the target, otherwise a completed chase short of
    /// the target loses, and equal totals draw.
    fn recompute_result(&mut self) {
        self.winner = None;
        if self.innings.len() < 2 {
            return;
        }
        let first_total = self.innings[0].total_runs;
        let first_team = self.innings[0].batting_team.clone();
        let chase = &self.innings[1];
        if chase.total_runs > first_total {
            self.winner = Some(MatchResult::Win {
                team: chase.batting_team.clone(),
            });
        } else if chase.is_completed() {
            self.winner = Some(if chase.total_runs == first_total {
                MatchResult::Draw
            } else {
                MatchResult::Win { team: first_team }
            });
        }
        if let Some(result) = &self.winner {
            info!(result = %result, "match decided");
            self.status = MatchStatus::Completed;
            if let Some(chase) = self.innings.last_mut() {
                chase.phase = crate::scoring::models::InningsPhase::Completed;
                chase.vacant_end = None;
            }
        }
    }

    fn roster_by_name(&self, name: &str) -> Result<&TeamRoster, ScoringError> {
        if self.team_a.name == name {
            Ok(&self.team_a)
        } else if self.team_b.name == name {
            Ok(&self.team_b)
        } else {
            Err(ScoringError::Roster(format!("{name} is not one of the teams")))
        }
    }
}
