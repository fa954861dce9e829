//! Bracket match discovery. Loading the public matches page triggers a
//! `/api/rounds` XHR whose URL carries the active tournament id; the
//! per-round match lists are then fetched from inside the same page so
//! the requests keep the site's cookies and origin.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use page_fetcher::PageFetcher;
use serde::Deserialize;
use store::{Game, Match, MatchStatus, Team};
use tracing::{info, warn};

use crate::{Div2Error, Result, LEAGUE_LOGO_URL, LEAGUE_NAME, MATCHES_PAGE, SITE_BASE};

const ROUNDS_FRAGMENT: &str = "/api/rounds";
const INTERCEPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Matches scheduled before this date belong to an earlier site layout
/// and are never imported.
const CUTOFF: NaiveDate = match NaiveDate::from_ymd_opt(2025, 1, 1) {
    Some(d) => d,
    None => panic!("static cutoff date"),
};

#[derive(Debug, Clone, Deserialize)]
pub struct Div2Round {
    pub id: String,
    pub name: String,
    pub group: Div2Group,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Div2Group {
    pub id: String,
    pub stage: Div2Stage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Div2Stage {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Div2Match {
    pub id: String,
    pub opponents: Vec<Div2Opponent>,
    pub round: Div2Round,
    pub scheduled_datetime: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Div2Opponent {
    pub participant: Div2Participant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Div2Participant {
    pub name: String,
    pub logo: Div2Logo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Div2Logo {
    pub id: String,
}

/// Fetches every bracket match involving the organization. The rounds
/// XHR never firing yields an empty list; discovery retries next cycle.
pub async fn discover_matches(fetcher: &PageFetcher) -> Result<Vec<Match>> {
    let intercepted = fetcher
        .intercept_json_responses(MATCHES_PAGE, ROUNDS_FRAGMENT, INTERCEPT_TIMEOUT)
        .await?;

    let Some(rounds_response) = intercepted.first() else {
        warn!("Bracket rounds XHR never fired, skipping div2 discovery");
        return Ok(Vec::new());
    };

    let Some(tournament_id) = tournament_id_from_url(&rounds_response.url) else {
        warn!("Rounds URL carries no tournament id: {}", rounds_response.url);
        return Ok(Vec::new());
    };
    let rounds: Vec<Div2Round> =
        serde_json::from_str(&rounds_response.body).map_err(|source| Div2Error::Payload {
            url: rounds_response.url.clone(),
            source,
        })?;
    info!("🏆 Bracket tournament {tournament_id}: {} rounds", rounds.len());

    let mut all = Vec::new();
    for round in &rounds {
        let url = matches_url(&tournament_id, round);
        let body = fetcher.fetch_json_in_page(MATCHES_PAGE, &url).await?;
        let matches: Vec<Div2Match> =
            serde_json::from_str(&body).map_err(|source| Div2Error::Payload { url, source })?;
        all.extend(matches);
    }

    Ok(org_matches(&all).iter().map(|m| draft_match(m)).collect())
}

fn tournament_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("tournament_ids=")?;
    let id = rest.split('&').next()?;
    (!id.is_empty()).then(|| id.to_string())
}

fn matches_url(tournament_id: &str, round: &Div2Round) -> String {
    format!(
        "{SITE_BASE}/api/matches?tournament_ids={tournament_id}\
         &stage_ids={}&group_ids={}&round_ids={}&sort=scheduled_asc",
        round.group.stage.id, round.group.id, round.id
    )
}

/// Keeps matches with the organization on either side, scheduled after
/// the import cutoff.
pub fn org_matches(matches: &[Div2Match]) -> Vec<&Div2Match> {
    matches
        .iter()
        .filter(|m| m.scheduled_datetime.date_naive() >= CUTOFF)
        .filter(|m| {
            m.opponents
                .iter()
                .any(|o| o.participant.name.contains("KCorp"))
        })
        .collect()
}

/// Acronym fallback: bracket participants carry no code, so one is built
/// from the initials of the display name.
pub fn acronym_of(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect()
}

fn logo_url(logo_id: &str) -> String {
    format!("{SITE_BASE}/media/file/{logo_id}/icon_medium")
}

/// A draft match as discovery stores it: skeleton teams, enrichment
/// payloads unset. Bracket series have no fixed best-of, so `rounds` is
/// zero until results arrive.
pub fn draft_match(m: &Div2Match) -> Match {
    let teams = m
        .opponents
        .iter()
        .map(|o| {
            Team::skeleton(
                o.participant.name.clone(),
                acronym_of(&o.participant.name),
                logo_url(&o.participant.logo.id),
            )
        })
        .collect();

    Match {
        id: None,
        match_id: m.id.clone(),
        date: m.scheduled_datetime,
        teams,
        league: LEAGUE_NAME.to_string(),
        league_logo_url: Some(LEAGUE_LOGO_URL.to_string()),
        match_type: m.round.name.clone(),
        game: Game::LeagueOfLegends,
        status: MatchStatus::Scheduled,
        rounds: Some(0),
        casters: None,
        ranking_data: None,
        kc_stats: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn div2_match(id: &str, names: &[&str], date: DateTime<Utc>) -> Div2Match {
        Div2Match {
            id: id.to_string(),
            opponents: names
                .iter()
                .map(|name| Div2Opponent {
                    participant: Div2Participant {
                        name: name.to_string(),
                        logo: Div2Logo { id: format!("logo-{name}") },
                    },
                })
                .collect(),
            round: Div2Round {
                id: "r1".into(),
                name: "Journée 3".into(),
                group: Div2Group {
                    id: "g1".into(),
                    stage: Div2Stage { id: "s1".into() },
                },
            },
            scheduled_datetime: date,
        }
    }

    #[test]
    fn tournament_id_is_read_from_the_rounds_url() {
        let url = "https://www.division2lol.fr/api/rounds?tournament_ids=abc123&sort=number_asc";
        assert_eq!(tournament_id_from_url(url).as_deref(), Some("abc123"));
        assert_eq!(tournament_id_from_url("https://x/api/rounds"), None);
    }

    #[test]
    fn only_org_matches_after_the_cutoff_survive() {
        let recent = Utc.with_ymd_and_hms(2025, 3, 5, 18, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2024, 11, 1, 18, 0, 0).unwrap();
        let matches = vec![
            div2_match("m1", &["KCorp Blue Stars", "Joblife"], recent),
            div2_match("m2", &["Joblife", "ViV Esport"], recent),
            div2_match("m3", &["KCorp Blue Stars", "Joblife"], old),
        ];
        let kept = org_matches(&matches);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "m1");
    }

    #[test]
    fn acronyms_are_word_initials() {
        assert_eq!(acronym_of("KCorp Blue Stars"), "KBS");
        assert_eq!(acronym_of("Joblife"), "J");
    }

    #[test]
    fn drafts_carry_bracket_identity_and_no_enrichment() {
        let date = Utc.with_ymd_and_hms(2025, 3, 5, 18, 0, 0).unwrap();
        let draft = draft_match(&div2_match("m1", &["KCorp Blue Stars", "Joblife"], date));
        assert_eq!(draft.match_id, "m1");
        assert_eq!(draft.league, "div2");
        assert_eq!(draft.match_type, "Journée 3");
        assert_eq!(draft.status, MatchStatus::Scheduled);
        assert_eq!(draft.rounds, Some(0));
        assert_eq!(draft.teams.len(), 2);
        assert_eq!(draft.teams[0].acronym, "KBS");
        assert_eq!(
            draft.teams[1].logo_url,
            "https://www.division2lol.fr/media/file/logo-Joblife/icon_medium"
        );
        assert!(draft.kc_stats.is_none() && draft.ranking_data.is_none());
    }

    #[test]
    fn rounds_payload_deserializes() {
        let body = r#"[{
            "id": "r1", "name": "Journée 1", "closed": false,
            "group": {"id": "g1", "stage": {"id": "s1"}}
        }]"#;
        let rounds: Vec<Div2Round> = serde_json::from_str(body).unwrap();
        assert_eq!(rounds[0].group.stage.id, "s1");
    }
}
