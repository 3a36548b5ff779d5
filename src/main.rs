// Replay harness: scores a short scripted match through the service so the
// engine can be watched end to end with `RUST_LOG=stumps=debug cargo run`.

use std::sync::Arc;

use stumps::scoring::{
    BallEvent, DismissalKind, InMemoryMatchStore, NoBallRuns, OpeningPlayers, ScoringService,
    TeamRoster, TossDecision, WicketDetail,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stumps=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scripted match replay");

    let service = ScoringService::new(Arc::new(InMemoryMatchStore::new()));
    let match_id = "replay";

    service
        .create_match(
            match_id,
            TeamRoster::new("Tigers", &["Asha", "Banu", "Chitra", "Devi"]),
            TeamRoster::new("Lions", &["Zoya", "Yash", "Xavi", "Wren"]),
            1,
            "Tigers",
            TossDecision::Bat,
        )
        .await
        .unwrap();

    // First innings: one over of Zoya.
    service
        .set_opening_players(match_id, &OpeningPlayers::new("Asha", "Banu", "Zoya"))
        .await
        .unwrap();
    for ball in [
        BallEvent::runs(4),
        BallEvent::wide(0),
        BallEvent::runs(1),
        BallEvent::no_ball(NoBallRuns::OffBat(2)),
        BallEvent::dot().with_wicket(WicketDetail::new(DismissalKind::Bowled, "Banu")),
    ] {
        let outcome = service.apply_ball(match_id, &ball).await.unwrap();
        info!(commentary = %outcome.commentary, "ball scored");
    }
    service.set_new_batsman(match_id, "Chitra").await.unwrap();
    for ball in [BallEvent::runs(2), BallEvent::leg_bye(1), BallEvent::dot()] {
        let outcome = service.apply_ball(match_id, &ball).await.unwrap();
        info!(commentary = %outcome.commentary, "ball scored");
    }

    let snapshot = service.match_snapshot(match_id).await.unwrap();
    let first = &snapshot.innings[0];
    info!(
        total = first.total_runs,
        wickets = first.wickets,
        overs = %first.overs_display(),
        "first innings closed"
    );

    // The chase.
    service
        .set_opening_players(match_id, &OpeningPlayers::new("Zoya", "Yash", "Asha"))
        .await
        .unwrap();
    let mut result = None;
    for ball in [
        BallEvent::runs(4),
        BallEvent::runs(4),
        BallEvent::runs(4),
        BallEvent::runs(2),
    ] {
        let outcome = service.apply_ball(match_id, &ball).await.unwrap();
        info!(commentary = %outcome.commentary, "ball scored");
        if let Some(decided) = outcome.result {
            result = Some(decided);
            break;
        }
    }

    let snapshot = service.match_snapshot(match_id).await.unwrap();
    let chase = snapshot.current_innings().unwrap();
    match result {
        Some(result) => info!(
            winner = %result,
            total = chase.total_runs,
            overs = %chase.overs_display(),
            "match decided"
        ),
        None => info!(
            total = chase.total_runs,
            target = ?chase.target,
            "chase still going"
        ),
    }
}
