//! Result polling for live matches. Riot-sourced matches are settled from
//! the completed-events feed; bracket matches from the wiki match history.
//! No live matches means the cycle is an idle no-op.

use chrono::{Datelike, Utc};
use page_fetcher::PageFetcher;
use riot_client::{EventState, RiotClient, RiotEvent};
use store::{Game, Match, MatchStore};
use tracing::{debug, info, warn};

use crate::discovery::event_match_id;

/// Finds the completed event settling one live match: by match id first,
/// then by the exact team-name pair as a fallback against re-numbering.
pub fn completed_event_for<'a>(m: &Match, events: &'a [RiotEvent]) -> Option<&'a RiotEvent> {
    if let Some(by_id) = events.iter().find(|e| event_match_id(e) == m.match_id) {
        return Some(by_id);
    }
    events.iter().find(|e| {
        let Some(info) = e.match_info.as_ref() else {
            return false;
        };
        info.match_teams.len() == m.teams.len()
            && m.teams
                .iter()
                .all(|team| info.match_teams.iter().any(|et| et.name == team.name))
    })
}

/// Final scores of a completed event, in the stored match's team order.
/// `None` when the event carries no result yet.
pub fn scores_in_team_order(m: &Match, event: &RiotEvent) -> Option<Vec<(String, i32)>> {
    let info = event.match_info.as_ref()?;
    m.teams
        .iter()
        .map(|team| {
            info.match_teams
                .iter()
                .find(|et| et.name == team.name)
                .and_then(|et| et.result.as_ref())
                .map(|r| (team.name.clone(), r.game_wins))
        })
        .collect()
}

/// One polling cycle over every live match.
pub async fn run(store: &MatchStore, riot: &RiotClient) -> anyhow::Result<()> {
    let live = store
        .find_live(&[Game::LeagueOfLegends, Game::Valorant])
        .await?;
    if live.is_empty() {
        debug!("No live matches, skipping result poll");
        return Ok(());
    }
    info!("🔴 {} live matches to settle", live.len());

    let (bracket, riot_sourced): (Vec<Match>, Vec<Match>) =
        live.into_iter().partition(|m| m.league == div2_scraper::LEAGUE_NAME);

    settle_riot_matches(store, riot, &riot_sourced).await?;
    if !bracket.is_empty() {
        settle_bracket_matches(store, &bracket).await?;
    }
    Ok(())
}

async fn settle_riot_matches(
    store: &MatchStore,
    riot: &RiotClient,
    live: &[Match],
) -> anyhow::Result<()> {
    for game in [Game::LeagueOfLegends, Game::Valorant] {
        let of_game: Vec<&Match> = live.iter().filter(|m| m.game == game).collect();
        if of_game.is_empty() {
            continue;
        }
        let completed = riot.fetch_events(game, EventState::Completed).await?;
        for m in of_game {
            let Some(event) = completed_event_for(m, &completed) else {
                debug!("Match {} still unsettled upstream", m.match_id);
                continue;
            };
            let Some(scores) = scores_in_team_order(m, event) else {
                warn!("Completed event for {} carries no result", m.match_id);
                continue;
            };
            store
                .set_final_score(
                    &m.match_id,
                    (scores[0].0.as_str(), scores[0].1),
                    (scores[1].0.as_str(), scores[1].1),
                )
                .await?;
            info!(
                "🏁 {} settled {}-{}",
                m.match_id, scores[0].1, scores[1].1
            );
        }
    }
    Ok(())
}

/// Bracket results need a browser session; one is launched only when a
/// bracket match is actually live.
async fn settle_bracket_matches(store: &MatchStore, live: &[Match]) -> anyhow::Result<()> {
    let fetcher = PageFetcher::launch().await?;
    let year = Utc::now().year();
    let results = div2_scraper::results::resolve_results(&fetcher, live, year).await?;
    if results.is_empty() {
        debug!("No finished bracket series on the wiki yet");
        return Ok(());
    }

    for m in live {
        let Some(scores) = div2_scraper::results::scores_in_team_order(m, &results) else {
            continue;
        };
        store
            .set_final_score(
                &m.match_id,
                (scores[0].0.as_str(), scores[0].1),
                (scores[1].0.as_str(), scores[1].1),
            )
            .await?;
        info!("🏁 bracket {} settled {}-{}", m.match_id, scores[0].1, scores[1].1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use store::{MatchStatus, Team};

    fn live_match(match_id: &str, teams: [&str; 2]) -> Match {
        Match {
            id: None,
            match_id: match_id.to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap(),
            teams: teams
                .iter()
                .map(|name| Team::skeleton(*name, "", ""))
                .collect(),
            league: "LEC".into(),
            league_logo_url: None,
            match_type: "Playoffs".into(),
            game: Game::LeagueOfLegends,
            status: MatchStatus::Live,
            rounds: Some(5),
            casters: None,
            ranking_data: None,
            kc_stats: None,
        }
    }

    fn completed_event(id: &str, teams: [(&str, i32); 2]) -> RiotEvent {
        let json = serde_json::json!({
            "id": id,
            "startTime": "2025-03-01T18:00:00Z",
            "state": "completed",
            "league": { "name": "LEC" },
            "match": {
                "id": id,
                "matchTeams": teams.iter().map(|(name, wins)| serde_json::json!({
                    "code": "X",
                    "name": name,
                    "result": { "gameWins": wins, "outcome": null }
                })).collect::<Vec<_>>(),
                "strategy": { "count": 3 }
            }
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn scores_follow_stored_team_order() {
        let m = live_match("m1", ["Karmine Corp", "Rival FC"]);
        // Upstream lists the teams in the opposite order.
        let event = completed_event("m1", [("Rival FC", 1), ("Karmine Corp", 2)]);

        let found = completed_event_for(&m, std::slice::from_ref(&event)).unwrap();
        let scores = scores_in_team_order(&m, found).unwrap();
        assert_eq!(scores[0], ("Karmine Corp".to_string(), 2));
        assert_eq!(scores[1], ("Rival FC".to_string(), 1));
    }

    #[test]
    fn renumbered_events_match_by_team_pair() {
        let m = live_match("old-id", ["Karmine Corp", "Rival FC"]);
        let events = vec![
            completed_event("other", [("G2 Esports", 2), ("Fnatic", 0)]),
            completed_event("new-id", [("Karmine Corp", 2), ("Rival FC", 0)]),
        ];
        let found = completed_event_for(&m, &events).unwrap();
        assert_eq!(found.id, "new-id");
    }

    #[test]
    fn unsettled_matches_find_no_event() {
        let m = live_match("m1", ["Karmine Corp", "Rival FC"]);
        let events = vec![completed_event("other", [("G2 Esports", 2), ("Fnatic", 0)])];
        assert!(completed_event_for(&m, &events).is_none());
    }

    #[test]
    fn events_without_results_yield_no_scores() {
        let m = live_match("m1", ["Karmine Corp", "Rival FC"]);
        let json = serde_json::json!({
            "id": "m1",
            "startTime": "2025-03-01T18:00:00Z",
            "league": { "name": "LEC" },
            "match": {
                "id": "m1",
                "matchTeams": [
                    { "code": "KC", "name": "Karmine Corp", "result": null },
                    { "code": "RF", "name": "Rival FC", "result": null }
                ],
                "strategy": { "count": 3 }
            }
        });
        let event: RiotEvent = serde_json::from_value(json).unwrap();
        assert!(scores_in_team_order(&m, &event).is_none());
    }
}
