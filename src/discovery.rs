//! Match discovery from the Riot esports calendar: fetch the upcoming
//! event window, keep the organization's fixtures, drop everything the
//! store already knows, and shape the survivors into draft documents.

use riot_client::{EventState, RiotClient, RiotEvent};
use store::{Caster, Game, Match, MatchKey, MatchStatus, MatchStore, Team};
use tracing::{debug, info};

use crate::run_cache::RunCache;
use crate::ORG_CODE;

/// The upstream id a stored match carries for an event: the inner match
/// id when present, the event id otherwise.
pub fn event_match_id(event: &RiotEvent) -> &str {
    event
        .match_info
        .as_ref()
        .map(|m| m.id.as_str())
        .unwrap_or(&event.id)
}

/// Discovery-time deduplication. An event is dropped when its match id is
/// already stored, or when a stored future match on the same calendar day
/// shares one of its teams. The second rule catches upstream re-numbering,
/// the same fixture reposted under a fresh id, without blocking later
/// fixtures of the same team.
pub fn filter_new_events<'a>(
    events: &'a [RiotEvent],
    existing: &[MatchKey],
) -> Vec<&'a RiotEvent> {
    events
        .iter()
        .filter(|event| event.involves_code(ORG_CODE))
        .filter(|event| {
            let id = event_match_id(event);
            if existing.iter().any(|key| key.match_id == id) {
                debug!("Event {id} already stored, skipping");
                return false;
            }
            let event_day = event.start_time.date_naive();
            let fixture_known = event
                .match_info
                .iter()
                .flat_map(|m| m.match_teams.iter())
                .any(|team| {
                    existing.iter().any(|key| {
                        key.date.date_naive() == event_day
                            && key.team_names.iter().any(|n| n == &team.name)
                    })
                });
            if fixture_known {
                debug!("Event {id} overlaps a stored match on the same day, skipping");
            }
            !fixture_known
        })
        .collect()
}

/// Shapes one event into a draft document: skeleton teams, status 0,
/// enrichment payloads unset.
pub fn draft_from_event(event: &RiotEvent, game: Game, casters: Vec<Caster>) -> Option<Match> {
    let info = event.match_info.as_ref()?;
    if info.match_teams.len() != 2 {
        return None;
    }

    let teams: Vec<Team> = info
        .match_teams
        .iter()
        .map(|t| {
            Team::skeleton(
                t.name.clone(),
                t.code.clone(),
                t.image.clone().unwrap_or_default(),
            )
        })
        .collect();

    Some(Match {
        id: None,
        match_id: info.id.clone(),
        date: event.start_time,
        teams,
        league: event.league.name.clone(),
        league_logo_url: event.league.image.clone(),
        match_type: event.block_name.clone().unwrap_or_default(),
        game,
        status: MatchStatus::Scheduled,
        rounds: info.strategy.as_ref().map(|s| s.count),
        casters: (!casters.is_empty()).then_some(casters),
        ranking_data: None,
        kc_stats: None,
    })
}

/// Full discovery pass for one game. Returns the draft matches; the
/// enrichment pipeline inserts them.
pub async fn run(store: &MatchStore, riot: &RiotClient, game: Game) -> anyhow::Result<Vec<Match>> {
    let events = riot.fetch_events(game, EventState::Unstarted).await?;
    let existing = store.upcoming_match_keys(game).await?;
    let fresh = filter_new_events(&events, &existing);
    info!(
        "📅 {game}: {} upcoming events, {} new",
        events.len(),
        fresh.len()
    );

    let caster_cache: RunCache<String, Vec<Caster>> = RunCache::new();
    let mut drafts = Vec::new();
    for event in fresh {
        let casters = caster_cache
            .get_or_try_insert(event.league.name.clone(), || async {
                store.casters_for_league(&event.league.name).await
            })
            .await?;
        if let Some(draft) = draft_from_event(event, game, casters) {
            drafts.push(draft);
        }
    }
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, names: [&str; 2], codes: [&str; 2]) -> RiotEvent {
        event_at(id, names, codes, "2025-03-01T18:00:00Z")
    }

    fn event_at(id: &str, names: [&str; 2], codes: [&str; 2], start: &str) -> RiotEvent {
        let json = serde_json::json!({
            "id": id,
            "blockName": "Regular Season",
            "startTime": start,
            "league": { "name": "LEC", "image": "https://img/lec.png" },
            "match": {
                "id": id,
                "matchTeams": [
                    { "code": codes[0], "name": names[0], "image": "https://img/a.png",
                      "result": null },
                    { "code": codes[1], "name": names[1], "image": "https://img/b.png",
                      "result": null }
                ],
                "strategy": { "count": 3 }
            }
        });
        serde_json::from_value(json).unwrap()
    }

    fn key(match_id: &str, date: &str, teams: &[&str]) -> MatchKey {
        MatchKey {
            match_id: match_id.to_string(),
            date: date.parse().unwrap(),
            team_names: teams.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn only_org_events_survive() {
        let events = vec![
            event("1", ["Karmine Corp", "Fnatic"], ["KC", "FNC"]),
            event("2", ["G2 Esports", "Fnatic"], ["G2", "FNC"]),
        ];
        let fresh = filter_new_events(&events, &[]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "1");
    }

    #[test]
    fn known_match_ids_are_dropped() {
        let events = vec![event("1", ["Karmine Corp", "Fnatic"], ["KC", "FNC"])];
        let existing = vec![key("1", "2025-03-01T18:00:00Z", &["Karmine Corp", "Fnatic"])];
        assert!(filter_new_events(&events, &existing).is_empty());
    }

    #[test]
    fn renumbered_fixtures_are_caught_by_same_day_team_overlap() {
        // Same fixture, fresh upstream id, same day.
        let events = vec![event("99", ["Karmine Corp", "Fnatic"], ["KC", "FNC"])];
        let existing = vec![key("1", "2025-03-01T17:00:00Z", &["Karmine Corp", "Fnatic"])];
        assert!(filter_new_events(&events, &existing).is_empty());
    }

    #[test]
    fn later_fixtures_of_the_same_team_are_kept() {
        // A stored fixture must not block the team's next match a week on.
        let events = vec![event_at(
            "7",
            ["Karmine Corp", "G2 Esports"],
            ["KC", "G2"],
            "2025-03-08T18:00:00Z",
        )];
        let existing = vec![key("1", "2025-03-01T18:00:00Z", &["Karmine Corp", "Fnatic"])];
        let fresh = filter_new_events(&events, &existing);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "7");
    }

    #[test]
    fn discovery_is_idempotent_over_its_own_output() {
        let events = vec![event("1", ["Karmine Corp", "Fnatic"], ["KC", "FNC"])];
        let first = filter_new_events(&events, &[]);
        assert_eq!(first.len(), 1);

        // Pretend the first pass was stored, then rerun on the same input.
        let stored: Vec<MatchKey> = first
            .iter()
            .map(|e| {
                let m = e.match_info.as_ref().unwrap();
                MatchKey {
                    match_id: m.id.clone(),
                    date: e.start_time,
                    team_names: m.match_teams.iter().map(|t| t.name.clone()).collect(),
                }
            })
            .collect();
        assert!(filter_new_events(&events, &stored).is_empty());
    }

    #[test]
    fn drafts_carry_event_identity() {
        let e = event("42", ["Karmine Corp", "Fnatic"], ["KC", "FNC"]);
        let draft = draft_from_event(&e, Game::LeagueOfLegends, Vec::new()).unwrap();
        assert_eq!(draft.match_id, "42");
        assert_eq!(draft.league, "LEC");
        assert_eq!(draft.league_logo_url.as_deref(), Some("https://img/lec.png"));
        assert_eq!(draft.match_type, "Regular Season");
        assert_eq!(draft.status, MatchStatus::Scheduled);
        assert_eq!(draft.rounds, Some(3));
        assert_eq!(draft.teams[0].acronym, "KC");
        assert!(draft.casters.is_none());
        assert!(draft.kc_stats.is_none());
    }
}
