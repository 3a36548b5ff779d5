// Ball resolver: turns one delivery's raw outcome into the set of deltas the
// innings folds in. Pure — nothing here touches innings state.

use serde::{Deserialize, Serialize};

use crate::scoring::models::{DismissalKind, ScoringError, BALLS_PER_OVER};

const MAX_RUNS_PER_BALL: u8 = 6;

/// The atomic scoring input: one delivery as the scorer saw it.
///
/// `extra_runs` carries the full run value of the extra channel. For a wide
/// that includes the automatic one-run penalty, so a plain wide is
/// `extra_runs == 1`; the constructors take care of this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BallEvent {
    pub runs_off_bat: u8,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub is_bye: bool,
    pub is_leg_bye: bool,
    pub extra_runs: u8,
    pub wicket: Option<WicketDetail>,
}

/// Run channel for runs taken off a no-ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoBallRuns {
    OffBat(u8),
    Byes(u8),
    LegByes(u8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WicketDetail {
    pub kind: DismissalKind,
    /// Must name the current striker or non-striker.
    pub batsman_out: String,
    pub fielder: Option<String>,
}

impl WicketDetail {
    pub fn new(kind: DismissalKind, batsman_out: &str) -> Self {
        Self {
            kind,
            batsman_out: batsman_out.to_string(),
            fielder: None,
        }
    }

    pub fn with_fielder(mut self, fielder: &str) -> Self {
        self.fielder = Some(fielder.to_string());
        self
    }
}

impl BallEvent {
    pub fn runs(runs_off_bat: u8) -> Self {
        Self {
            runs_off_bat,
            ..Self::default()
        }
    }

    pub fn dot() -> Self {
        Self::runs(0)
    }

    /// A wide; `additional` is whatever the batsmen ran on top of the
    /// one-run penalty.
    pub fn wide(additional: u8) -> Self {
        Self {
            is_wide: true,
            extra_runs: 1 + additional,
            ..Self::default()
        }
    }

    pub fn no_ball(runs: NoBallRuns) -> Self {
        let mut ball = Self {
            is_no_ball: true,
            ..Self::default()
        };
        match runs {
            NoBallRuns::OffBat(n) => ball.runs_off_bat = n,
            NoBallRuns::Byes(n) => {
                ball.is_bye = true;
                ball.extra_runs = n;
            }
            NoBallRuns::LegByes(n) => {
                ball.is_leg_bye = true;
                ball.extra_runs = n;
            }
        }
        ball
    }

    pub fn bye(runs: u8) -> Self {
        Self {
            is_bye: true,
            extra_runs: runs,
            ..Self::default()
        }
    }

    pub fn leg_bye(runs: u8) -> Self {
        Self {
            is_leg_bye: true,
            extra_runs: runs,
            ..Self::default()
        }
    }

    pub fn with_wicket(mut self, wicket: WicketDetail) -> Self {
        self.wicket = Some(wicket);
        self
    }

    /// Counts toward over progression unless wide or no-ball.
    pub fn is_legal(&self) -> bool {
        !self.is_wide && !self.is_no_ball
    }
}

/// What the resolver needs to know about the innings to price a ball.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub striker: String,
    pub non_striker: String,
    pub bowler: String,
    /// Legal deliveries bowled before this ball.
    pub balls_legal: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WicketDelta {
    pub kind: DismissalKind,
    pub batsman_out: String,
    pub fielder: Option<String>,
    pub credits_bowler: bool,
}

/// Incremental effect of one resolved ball.
#[derive(Debug, Clone, PartialEq)]
pub struct BallDelta {
    pub legal: bool,
    pub striker_runs: u8,
    pub striker_faced: bool,
    pub four: bool,
    pub six: bool,
    /// Total added to the team score.
    pub team_runs: u16,
    pub wides: u16,
    pub no_balls: u16,
    pub byes: u16,
    pub leg_byes: u16,
    pub bowler_conceded: u16,
    pub bowler_wide: bool,
    pub bowler_no_ball: bool,
    /// Runs the batsmen physically ran; drives strike-rotation parity.
    pub ran_runs: u8,
    pub swap_strike: bool,
    pub wicket: Option<WicketDelta>,
}

pub fn resolve(ball: &BallEvent, ctx: &ResolveContext) -> Result<BallDelta, ScoringError> {
    validate(ball, ctx)?;

    let legal = ball.is_legal();
    let wides = if ball.is_wide { ball.extra_runs as u16 } else { 0 };
    let no_balls = if ball.is_no_ball { 1 } else { 0 };
    let byes = if ball.is_bye { ball.extra_runs as u16 } else { 0 };
    let leg_byes = if ball.is_leg_bye { ball.extra_runs as u16 } else { 0 };

    let team_runs = ball.runs_off_bat as u16 + wides + no_balls + byes + leg_byes;
    // Byes and leg-byes are never charged to the bowler; wides and the
    // no-ball penalty are.
    let bowler_conceded = ball.runs_off_bat as u16 + wides + no_balls;

    let ran_runs = if ball.is_wide {
        0
    } else {
        ball.runs_off_bat + ball.extra_runs
    };

    let wicket = ball.wicket.as_ref().map(|w| WicketDelta {
        kind: w.kind,
        batsman_out: w.batsman_out.clone(),
        fielder: w.fielder.clone(),
        credits_bowler: w.kind.credits_bowler(),
    });

    // On a wicket the fold assigns ends itself; parity rotation applies only
    // to uninterrupted deliveries. The last legal ball of the over inverts
    // the parity because the end-of-over change swaps strike anyway.
    let swap_strike = if wicket.is_some() {
        false
    } else if legal && (ctx.balls_legal + 1) % BALLS_PER_OVER == 0 {
        ran_runs % 2 == 0
    } else {
        ran_runs % 2 == 1
    };

    Ok(BallDelta {
        legal,
        striker_runs: ball.runs_off_bat,
        striker_faced: !ball.is_wide,
        four: ball.runs_off_bat == 4,
        six: ball.runs_off_bat == 6,
        team_runs,
        wides,
        no_balls,
        byes,
        leg_byes,
        bowler_conceded,
        bowler_wide: ball.is_wide,
        bowler_no_ball: ball.is_no_ball,
        ran_runs,
        swap_strike,
        wicket,
    })
}

fn validate(ball: &BallEvent, ctx: &ResolveContext) -> Result<(), ScoringError> {
    if ball.is_wide && ball.is_no_ball {
        return Err(ScoringError::InvalidBall(
            "a delivery cannot be both a wide and a no-ball".into(),
        ));
    }
    if ball.is_bye && ball.is_leg_bye {
        return Err(ScoringError::InvalidBall(
            "a delivery cannot carry both byes and leg-byes".into(),
        ));
    }
    if ball.runs_off_bat > MAX_RUNS_PER_BALL {
        return Err(ScoringError::InvalidBall(format!(
            "runs off the bat out of range: {}",
            ball.runs_off_bat
        )));
    }
    let max_extras = if ball.is_wide {
        // Penalty run plus up to six ran.
        MAX_RUNS_PER_BALL + 1
    } else {
        MAX_RUNS_PER_BALL
    };
    if ball.extra_runs > max_extras {
        return Err(ScoringError::InvalidBall(format!(
            "extra runs out of range: {}",
            ball.extra_runs
        )));
    }
    if ball.is_wide {
        if ball.extra_runs == 0 {
            return Err(ScoringError::InvalidBall(
                "a wide always scores at least the penalty run".into(),
            ));
        }
        if ball.runs_off_bat > 0 || ball.is_bye || ball.is_leg_bye {
            return Err(ScoringError::InvalidBall(
                "a wide cannot carry bat runs or byes".into(),
            ));
        }
    }
    if (ball.is_bye || ball.is_leg_bye) && ball.extra_runs == 0 {
        return Err(ScoringError::InvalidBall("byes need at least one run".into()));
    }
    if (ball.is_bye || ball.is_leg_bye) && ball.runs_off_bat > 0 {
        return Err(ScoringError::InvalidBall(
            "byes and bat runs cannot both be scored on one ball".into(),
        ));
    }
    if !ball.is_wide && !ball.is_bye && !ball.is_leg_bye && ball.extra_runs > 0 {
        return Err(ScoringError::InvalidBall(
            "extra runs require an extra type".into(),
        ));
    }

    if let Some(wicket) = &ball.wicket {
        if wicket.batsman_out != ctx.striker && wicket.batsman_out != ctx.non_striker {
            return Err(ScoringError::InvalidBall(format!(
                "{} is not at the crease",
                wicket.batsman_out
            )));
        }
        if ball.is_wide && !wicket.kind.possible_off_wide() {
            return Err(ScoringError::InvalidBall(format!(
                "cannot be {} off a wide",
                wicket.kind
            )));
        }
        if matches!(wicket.kind, DismissalKind::Caught | DismissalKind::RunOut)
            && wicket.fielder.is_none()
        {
            return Err(ScoringError::InvalidBall(format!(
                "{} needs a fielder",
                wicket.kind
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ctx(balls_legal: u16) -> ResolveContext {
        ResolveContext {
            striker: "Asha".to_string(),
            non_striker: "Banu".to_string(),
            bowler: "Zoya".to_string(),
            balls_legal,
        }
    }

    #[test]
    fn single_run_swaps_strike_and_counts_the_ball() {
        let delta = resolve(&BallEvent::runs(1), &ctx(2)).unwrap();
        assert!(delta.legal);
        assert_eq!(delta.team_runs, 1);
        assert_eq!(delta.striker_runs, 1);
        assert!(delta.striker_faced);
        assert!(delta.swap_strike);
    }

    #[test]
    fn wide_adds_a_run_without_advancing_the_over() {
        let delta = resolve(&BallEvent::wide(0), &ctx(2)).unwrap();
        assert!(!delta.legal);
        assert_eq!(delta.team_runs, 1);
        assert_eq!(delta.wides, 1);
        assert_eq!(delta.striker_runs, 0);
        assert!(!delta.striker_faced);
        assert!(!delta.swap_strike);
        assert_eq!(delta.bowler_conceded, 1);
    }

    #[test]
    fn wide_with_runs_charges_everything_to_the_bowler() {
        let delta = resolve(&BallEvent::wide(2), &ctx(0)).unwrap();
        assert_eq!(delta.team_runs, 3);
        assert_eq!(delta.wides, 3);
        assert_eq!(delta.bowler_conceded, 3);
        // Runs off a wide never rotate strike.
        assert!(!delta.swap_strike);
    }

    #[test]
    fn no_ball_counts_as_a_ball_faced_but_not_a_legal_delivery() {
        let delta = resolve(&BallEvent::no_ball(NoBallRuns::OffBat(4)), &ctx(2)).unwrap();
        assert!(!delta.legal);
        assert!(delta.striker_faced);
        assert_eq!(delta.striker_runs, 4);
        assert!(delta.four);
        assert_eq!(delta.no_balls, 1);
        assert_eq!(delta.team_runs, 5);
        assert_eq!(delta.bowler_conceded, 5);
    }

    #[test]
    fn no_ball_byes_stay_out_of_the_bowler_figures() {
        let delta = resolve(&BallEvent::no_ball(NoBallRuns::Byes(2)), &ctx(2)).unwrap();
        assert_eq!(delta.byes, 2);
        assert_eq!(delta.no_balls, 1);
        assert_eq!(delta.team_runs, 3);
        assert_eq!(delta.bowler_conceded, 1);
        assert_eq!(delta.striker_runs, 0);
    }

    #[test]
    fn byes_credit_the_team_not_the_striker() {
        let delta = resolve(&BallEvent::bye(3), &ctx(1)).unwrap();
        assert!(delta.legal);
        assert_eq!(delta.byes, 3);
        assert_eq!(delta.striker_runs, 0);
        assert!(delta.striker_faced);
        assert_eq!(delta.bowler_conceded, 0);
        assert!(delta.swap_strike);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(2, false)]
    #[case(3, true)]
    #[case(4, false)]
    fn mid_over_rotation_follows_odd_runs(#[case] runs: u8, #[case] expected: bool) {
        let delta = resolve(&BallEvent::runs(runs), &ctx(2)).unwrap();
        assert_eq!(delta.swap_strike, expected);
    }

    #[rstest]
    #[case(0, true)]
    #[case(1, false)]
    #[case(2, true)]
    #[case(3, false)]
    fn last_ball_of_over_inverts_rotation_parity(#[case] runs: u8, #[case] expected: bool) {
        // Sixth legal ball of the over: the over change swaps strike, so the
        // odd-run swap cancels and even runs swap instead.
        let delta = resolve(&BallEvent::runs(runs), &ctx(5)).unwrap();
        assert_eq!(delta.swap_strike, expected);
    }

    #[test]
    fn last_ball_parity_uses_over_position_not_absolute_count() {
        let delta = resolve(&BallEvent::runs(2), &ctx(11)).unwrap();
        assert!(delta.swap_strike);
        let delta = resolve(&BallEvent::runs(2), &ctx(12)).unwrap();
        assert!(!delta.swap_strike);
    }

    #[test]
    fn boundaries_are_detected_off_the_bat_only() {
        let four = resolve(&BallEvent::runs(4), &ctx(0)).unwrap();
        assert!(four.four && !four.six);
        let six = resolve(&BallEvent::runs(6), &ctx(0)).unwrap();
        assert!(six.six && !six.four);
        let byes = resolve(&BallEvent::bye(4), &ctx(0)).unwrap();
        assert!(!byes.four);
    }

    #[test]
    fn run_out_does_not_credit_the_bowler() {
        let ball = BallEvent::runs(1).with_wicket(
            WicketDetail::new(DismissalKind::RunOut, "Banu").with_fielder("Kiran"),
        );
        let delta = resolve(&ball, &ctx(2)).unwrap();
        let wicket = delta.wicket.unwrap();
        assert!(!wicket.credits_bowler);
        assert_eq!(wicket.batsman_out, "Banu");
        assert!(!delta.swap_strike);
    }

    #[test]
    fn bowled_credits_the_bowler() {
        let ball = BallEvent::dot().with_wicket(WicketDetail::new(DismissalKind::Bowled, "Asha"));
        let delta = resolve(&ball, &ctx(2)).unwrap();
        assert!(delta.wicket.unwrap().credits_bowler);
    }

    #[rstest]
    #[case(BallEvent { is_wide: true, is_no_ball: true, extra_runs: 1, ..Default::default() })]
    #[case(BallEvent { is_bye: true, is_leg_bye: true, extra_runs: 1, ..Default::default() })]
    #[case(BallEvent::runs(7))]
    #[case(BallEvent { is_wide: true, extra_runs: 0, ..Default::default() })]
    #[case(BallEvent { is_wide: true, extra_runs: 1, runs_off_bat: 2, ..Default::default() })]
    #[case(BallEvent::bye(0))]
    #[case(BallEvent { runs_off_bat: 2, extra_runs: 2, is_bye: true, ..Default::default() })]
    #[case(BallEvent { runs_off_bat: 1, extra_runs: 1, ..Default::default() })]
    fn malformed_balls_are_rejected(#[case] ball: BallEvent) {
        let result = resolve(&ball, &ctx(0));
        assert!(matches!(result, Err(ScoringError::InvalidBall(_))));
    }

    #[test]
    fn out_batsman_must_be_at_the_crease() {
        let ball =
            BallEvent::dot().with_wicket(WicketDetail::new(DismissalKind::Bowled, "Nobody"));
        assert!(matches!(
            resolve(&ball, &ctx(0)),
            Err(ScoringError::InvalidBall(_))
        ));
    }

    #[test]
    fn bowled_off_a_wide_is_impossible() {
        let ball = BallEvent::wide(0).with_wicket(WicketDetail::new(DismissalKind::Bowled, "Asha"));
        assert!(matches!(
            resolve(&ball, &ctx(0)),
            Err(ScoringError::InvalidBall(_))
        ));
    }

    #[test]
    fn caught_needs_a_fielder() {
        let ball = BallEvent::dot().with_wicket(WicketDetail::new(DismissalKind::Caught, "Asha"));
        assert!(matches!(
            resolve(&ball, &ctx(0)),
            Err(ScoringError::InvalidBall(_))
        ));
    }

    #[test]
    fn run_out_off_a_wide_is_allowed() {
        let ball = BallEvent::wide(1).with_wicket(
            WicketDetail::new(DismissalKind::RunOut, "Banu").with_fielder("Kiran"),
        );
        let delta = resolve(&ball, &ctx(0)).unwrap();
        assert!(!delta.legal);
        assert_eq!(delta.wides, 2);
        assert!(delta.wicket.is_some());
    }
}
