// Innings state machine: folds resolved ball deltas into the innings
// snapshot and walks the phase graph (opening players -> in progress ->
// bowler/batsman gates -> completed). Every rejection leaves the snapshot
// untouched; validation happens before the first mutation.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::scoring::models::{
    CreaseEnd, FallOfWicket, HowOut, Innings, InningsPhase, Partnership, ScoringError,
    BALLS_PER_OVER, MAX_WICKETS,
};
use crate::scoring::resolver::{resolve, BallDelta, BallEvent, ResolveContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningPlayers {
    pub striker: String,
    pub non_striker: String,
    pub bowler: String,
}

impl OpeningPlayers {
    pub fn new(striker: &str, non_striker: &str, bowler: &str) -> Self {
        Self {
            striker: striker.to_string(),
            non_striker: non_striker.to_string(),
            bowler: bowler.to_string(),
        }
    }
}

impl Innings {
    /// Nominate the two openers and the opening bowler. Required before the
    /// first ball.
    pub fn set_opening_players(&mut self, opening: &OpeningPlayers) -> Result<(), ScoringError> {
        match self.phase {
            InningsPhase::AwaitingOpeningPlayers => {}
            InningsPhase::Completed => return Err(ScoringError::InningsClosed),
            _ => {
                return Err(ScoringError::InvalidBall(
                    "opening players are already set".into(),
                ))
            }
        }
        if opening.striker == opening.non_striker {
            return Err(ScoringError::InvalidBall(
                "striker and non-striker must be different players".into(),
            ));
        }
        let striker_idx = self.batting_index(&opening.striker)?;
        let non_striker_idx = self.batting_index(&opening.non_striker)?;
        let bowler_idx = self.bowling_index(&opening.bowler)?;

        self.batting_order[striker_idx].is_striker = true;
        self.batting_order[striker_idx].batting_position = 1;
        self.batting_order[non_striker_idx].is_non_striker = true;
        self.batting_order[non_striker_idx].batting_position = 2;
        self.bowling_order[bowler_idx].is_current_bowler = true;
        self.partnerships
            .push(Partnership::open(&opening.striker, &opening.non_striker));
        self.phase = InningsPhase::InProgress;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Resolve one ball and fold its delta in. The fold is atomic: totals,
    /// batting/bowling entries, extras, partnership, fall of wicket, and the
    /// phase transition all land together or not at all.
    pub fn apply_ball(&mut self, ball: &BallEvent) -> Result<BallDelta, ScoringError> {
        match self.phase {
            InningsPhase::InProgress => {}
            InningsPhase::Completed => return Err(ScoringError::InningsClosed),
            InningsPhase::AwaitingOpeningPlayers => {
                return Err(ScoringError::InvalidBall(
                    "opening players must be set before scoring".into(),
                ))
            }
            InningsPhase::AwaitingNewBowler => {
                return Err(ScoringError::InvalidBall(
                    "a new bowler must be nominated before the next ball".into(),
                ))
            }
            InningsPhase::AwaitingNewBatsman => {
                return Err(ScoringError::InvalidBall(
                    "a new batsman must be nominated before the next ball".into(),
                ))
            }
        }

        let striker_idx = self
            .batting_order
            .iter()
            .position(|p| p.is_striker)
            .ok_or_else(|| ScoringError::Roster("no striker at the crease".into()))?;
        let non_striker_idx = self
            .batting_order
            .iter()
            .position(|p| p.is_non_striker)
            .ok_or_else(|| ScoringError::Roster("no non-striker at the crease".into()))?;
        let bowler_idx = self
            .bowling_order
            .iter()
            .position(|p| p.is_current_bowler)
            .ok_or_else(|| ScoringError::Roster("no current bowler".into()))?;

        let ctx = ResolveContext {
            striker: self.batting_order[striker_idx].name.clone(),
            non_striker: self.batting_order[non_striker_idx].name.clone(),
            bowler: self.bowling_order[bowler_idx].name.clone(),
            balls_legal: self.balls_legal,
        };
        let delta = resolve(ball, &ctx)?;

        // Totals and extras.
        self.total_runs += delta.team_runs;
        if delta.legal {
            self.balls_legal += 1;
        }
        self.extras.wides += delta.wides;
        self.extras.no_balls += delta.no_balls;
        self.extras.byes += delta.byes;
        self.extras.leg_byes += delta.leg_byes;

        // Striker.
        {
            let striker = &mut self.batting_order[striker_idx];
            striker.runs += delta.striker_runs as u16;
            if delta.striker_faced {
                striker.balls_faced += 1;
            }
            if delta.four {
                striker.fours += 1;
            }
            if delta.six {
                striker.sixes += 1;
            }
        }

        // Bowler.
        {
            let bowler = &mut self.bowling_order[bowler_idx];
            if delta.legal {
                bowler.balls_bowled += 1;
            }
            bowler.runs_conceded += delta.bowler_conceded;
            if delta.bowler_wide {
                bowler.wides += 1;
            }
            if delta.bowler_no_ball {
                bowler.no_balls += 1;
            }
        }
        self.current_over_conceded += delta.bowler_conceded;

        // The open partnership takes every run scored off its balls.
        if let Some(partnership) = self.open_partnership_mut() {
            partnership.runs += delta.team_runs;
            if delta.legal {
                partnership.balls += 1;
            }
        }

        let over_completed = delta.legal && self.balls_legal % BALLS_PER_OVER == 0;
        self.push_ball_record(ball, &delta);

        if let Some(wicket) = &delta.wicket {
            let now = Utc::now();
            let out_idx = if wicket.batsman_out == ctx.striker {
                striker_idx
            } else {
                non_striker_idx
            };
            let mut vacated = if out_idx == striker_idx {
                CreaseEnd::Striker
            } else {
                CreaseEnd::NonStriker
            };
            {
                let out = &mut self.batting_order[out_idx];
                out.is_out = true;
                out.is_striker = false;
                out.is_non_striker = false;
                out.how_out = Some(HowOut {
                    kind: wicket.kind,
                    bowler: wicket.credits_bowler.then(|| ctx.bowler.clone()),
                    fielder: wicket.fielder.clone(),
                });
            }
            if wicket.credits_bowler {
                let bowler = &mut self.bowling_order[bowler_idx];
                bowler.wickets += 1;
                bowler.dismissals.push(wicket.batsman_out.clone());
            }
            self.wickets += 1;
            if let Some(partnership) = self.open_partnership_mut() {
                partnership.ended_at = Some(now);
            }
            let fall = FallOfWicket {
                batsman_out: wicket.batsman_out.clone(),
                runs_at_fall: self.total_runs,
                overs_at_fall: self.overs_display(),
                at: now,
            };
            self.fall_of_wickets.push(fall);

            // A wicket on the last ball of the over still gets the
            // end-of-over strike change; the survivor crosses and the
            // vacancy moves with it.
            if over_completed && delta.ran_runs % 2 == 0 {
                let survivor_idx = if out_idx == striker_idx {
                    non_striker_idx
                } else {
                    striker_idx
                };
                let survivor = &mut self.batting_order[survivor_idx];
                if survivor.is_striker {
                    survivor.is_striker = false;
                    survivor.is_non_striker = true;
                } else {
                    survivor.is_non_striker = false;
                    survivor.is_striker = true;
                }
                vacated = match vacated {
                    CreaseEnd::Striker => CreaseEnd::NonStriker,
                    CreaseEnd::NonStriker => CreaseEnd::Striker,
                };
            }
            self.vacant_end = Some(vacated);
        } else if delta.swap_strike {
            self.rotate_strike(striker_idx, non_striker_idx);
        }

        if over_completed {
            if self.current_over_conceded == 0 {
                self.bowling_order[bowler_idx].maidens += 1;
            }
            self.current_over_conceded = 0;
            self.recent_bowlers.push(ctx.bowler.clone());
            self.bowling_order[bowler_idx].is_current_bowler = false;
        }

        if self.wickets >= MAX_WICKETS {
            self.phase = InningsPhase::Completed;
            self.vacant_end = None;
        } else if self.balls_legal >= self.overs_limit as u16 * BALLS_PER_OVER {
            self.phase = InningsPhase::Completed;
            self.vacant_end = None;
        } else if delta.wicket.is_some() {
            if self.remaining_batsmen() == 0 {
                // Short side: nobody left to come in.
                self.phase = InningsPhase::Completed;
                self.vacant_end = None;
            } else {
                self.phase = InningsPhase::AwaitingNewBatsman;
                self.over_break_pending = over_completed;
            }
        } else if over_completed {
            self.phase = InningsPhase::AwaitingNewBowler;
        }

        self.updated_at = Utc::now();
        Ok(delta)
    }

    /// Nominate the bowler for the next over. The bowler of the over just
    /// completed cannot bowl consecutive overs.
    pub fn set_new_bowler(&mut self, name: &str) -> Result<(), ScoringError> {
        match self.phase {
            InningsPhase::AwaitingNewBowler => {}
            InningsPhase::Completed => return Err(ScoringError::InningsClosed),
            _ => {
                return Err(ScoringError::InvalidBall(
                    "no bowler change is pending".into(),
                ))
            }
        }
        let idx = self.bowling_index(name)?;
        if self.recent_bowlers.last().map(String::as_str) == Some(name) {
            return Err(ScoringError::BowlerRepeat(name.to_string()));
        }
        for bowler in &mut self.bowling_order {
            bowler.is_current_bowler = false;
        }
        self.bowling_order[idx].is_current_bowler = true;
        self.phase = InningsPhase::InProgress;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Bring in the replacement for a dismissed batsman. The newcomer takes
    /// the vacated end and the next batting position, and a fresh
    /// partnership opens with the survivor.
    pub fn set_new_batsman(&mut self, name: &str) -> Result<(), ScoringError> {
        match self.phase {
            InningsPhase::AwaitingNewBatsman => {}
            InningsPhase::Completed => return Err(ScoringError::InningsClosed),
            _ => {
                return Err(ScoringError::InvalidBall(
                    "no batsman change is pending".into(),
                ))
            }
        }
        let idx = self.batting_index(name)?;
        if self.batting_order[idx].is_out {
            return Err(ScoringError::InvalidBall(format!("{name} is already out")));
        }
        if self.batting_order[idx].at_crease() {
            return Err(ScoringError::InvalidBall(format!(
                "{name} is already at the crease"
            )));
        }
        let end = self.vacant_end.take().ok_or_else(|| {
            ScoringError::InvalidBall("no end is vacant for a new batsman".into())
        })?;
        let position = self
            .batting_order
            .iter()
            .map(|p| p.batting_position)
            .max()
            .unwrap_or(0)
            + 1;
        {
            let entry = &mut self.batting_order[idx];
            match end {
                CreaseEnd::Striker => entry.is_striker = true,
                CreaseEnd::NonStriker => entry.is_non_striker = true,
            }
            entry.batting_position = position;
        }
        if let Some(survivor) = self
            .batting_order
            .iter()
            .find(|p| p.at_crease() && p.name != name)
        {
            let survivor_name = survivor.name.clone();
            self.partnerships
                .push(Partnership::open(&survivor_name, name));
        }
        self.phase = if self.over_break_pending {
            self.over_break_pending = false;
            InningsPhase::AwaitingNewBowler
        } else {
            InningsPhase::InProgress
        };
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Explicit user-invoked strike swap.
    pub fn swap_strike(&mut self) -> Result<(), ScoringError> {
        match self.phase {
            InningsPhase::InProgress => {}
            InningsPhase::Completed => return Err(ScoringError::InningsClosed),
            _ => {
                return Err(ScoringError::InvalidBall(
                    "strike can only be swapped between balls in play".into(),
                ))
            }
        }
        let striker_idx = self
            .batting_order
            .iter()
            .position(|p| p.is_striker)
            .ok_or_else(|| ScoringError::Roster("no striker at the crease".into()))?;
        let non_striker_idx = self
            .batting_order
            .iter()
            .position(|p| p.is_non_striker)
            .ok_or_else(|| ScoringError::Roster("no non-striker at the crease".into()))?;
        self.rotate_strike(striker_idx, non_striker_idx);
        self.updated_at = Utc::now();
        Ok(())
    }

    fn rotate_strike(&mut self, striker_idx: usize, non_striker_idx: usize) {
        self.batting_order[striker_idx].is_striker = false;
        self.batting_order[striker_idx].is_non_striker = true;
        self.batting_order[non_striker_idx].is_non_striker = false;
        self.batting_order[non_striker_idx].is_striker = true;
    }

    fn open_partnership_mut(&mut self) -> Option<&mut Partnership> {
        self.partnerships
            .last_mut()
            .filter(|p| p.ended_at.is_none())
    }

    fn push_ball_record(&mut self, ball: &BallEvent, delta: &BallDelta) {
        let (over, ball_no) = if delta.legal {
            (
                (self.balls_legal - 1) / BALLS_PER_OVER,
                (self.balls_legal - 1) % BALLS_PER_OVER + 1,
            )
        } else {
            (
                self.balls_legal / BALLS_PER_OVER,
                self.balls_legal % BALLS_PER_OVER + 1,
            )
        };
        self.ball_log.push(crate::scoring::models::BallRecord {
            over,
            ball: ball_no,
            runs: delta.team_runs,
            wicket: delta.wicket.is_some(),
            commentary: commentary_line(ball, delta),
        });
    }

    fn batting_index(&self, name: &str) -> Result<usize, ScoringError> {
        self.batting_order
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| {
                ScoringError::Roster(format!("{name} is not in the {} side", self.batting_team))
            })
    }

    fn bowling_index(&self, name: &str) -> Result<usize, ScoringError> {
        self.bowling_order
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| {
                ScoringError::Roster(format!("{name} is not in the {} side", self.bowling_team))
            })
    }
}

fn commentary_line(ball: &BallEvent, delta: &BallDelta) -> String {
    if let Some(wicket) = &delta.wicket {
        return format!("WICKET! {} {}", wicket.batsman_out, wicket.kind);
    }
    if ball.is_wide {
        return format!("Wide ball, {} extra run{}", delta.wides, plural(delta.wides));
    }
    if ball.is_no_ball {
        return format!("No ball, {} run{}", delta.team_runs, plural(delta.team_runs));
    }
    if ball.is_bye {
        return format!("{} bye{}", delta.byes, plural(delta.byes));
    }
    if ball.is_leg_bye {
        return format!("{} leg bye{}", delta.leg_byes, plural(delta.leg_byes));
    }
    format!(
        "{} run{} scored",
        delta.team_runs,
        plural(delta.team_runs)
    )
}

fn plural(n: u16) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
