//! Hourly scheduled-to-live sweep. The store query only returns today's
//! still-scheduled matches and the status update is forward-only, so the
//! sweep is idempotent by construction.

use chrono::{DateTime, Utc};
use store::{Match, MatchStatus, MatchStore};
use tracing::{debug, info};

/// A scheduled match goes live once its start time has passed.
pub fn should_go_live(m: &Match, now: DateTime<Utc>) -> bool {
    m.status == MatchStatus::Scheduled && m.date <= now
}

pub async fn run(store: &MatchStore) -> anyhow::Result<()> {
    let now = Utc::now();
    let candidates = store.find_today_scheduled().await?;
    let mut flipped = 0;
    for m in candidates.iter().filter(|m| should_go_live(m, now)) {
        if let Some(id) = &m.id {
            store.set_status(id, MatchStatus::Live).await?;
            flipped += 1;
        }
    }
    if flipped > 0 {
        info!("⏰ {flipped} matches flipped to live");
    } else {
        debug!("Status sweep: nothing to flip");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use store::{Game, Team};

    fn scheduled_at(date: DateTime<Utc>, status: MatchStatus) -> Match {
        Match {
            id: None,
            match_id: "m1".into(),
            date,
            teams: vec![
                Team::skeleton("Karmine Corp", "KC", ""),
                Team::skeleton("Rival FC", "RFC", ""),
            ],
            league: "LEC".into(),
            league_logo_url: None,
            match_type: "Regular Season".into(),
            game: Game::LeagueOfLegends,
            status,
            rounds: Some(3),
            casters: None,
            ranking_data: None,
            kc_stats: None,
        }
    }

    #[test]
    fn past_scheduled_matches_go_live() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap();
        let started = scheduled_at(now - chrono::Duration::minutes(30), MatchStatus::Scheduled);
        let upcoming = scheduled_at(now + chrono::Duration::hours(2), MatchStatus::Scheduled);
        assert!(should_go_live(&started, now));
        assert!(!should_go_live(&upcoming, now));
    }

    #[test]
    fn non_scheduled_matches_are_never_touched() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap();
        let past = now - chrono::Duration::hours(1);
        assert!(!should_go_live(&scheduled_at(past, MatchStatus::Live), now));
        assert!(!should_go_live(&scheduled_at(past, MatchStatus::Completed), now));
    }
}
