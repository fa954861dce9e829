//! Client for the Riot esports GraphQL gateway (lolesports.com /
//! valorantesports.com `homeEvents` persisted query).
//!
//! The same endpoint serves both discovery (`unstarted` events in a
//! two-month look-ahead window) and result polling (`completed` events of
//! the last day), filtered by a fixed per-game league-id whitelist.

use chrono::{Duration, Utc};
use serde::Deserialize;
use store::Game;
use tracing::{debug, warn};

const PERSISTED_QUERY_EXTENSION: &str = r#"{"persistedQuery":{"version":1,"sha256Hash":"089916a64423fe9796f6e81b30e9bda7e329366a5b06029748c610a8e486d23f"}}"#;

const LOL_LEAGUES: [&str; 6] = [
    "100695891328981122",
    "105266103462388553",
    "113464388705111224",
    "98767975604431411",
    "98767991302996019",
    "98767991325878492",
];

const VALORANT_LEAGUES: [&str; 6] = [
    "106109559530232966",
    "107019646737643925",
    "107566807613828723",
    "109222784797127274",
    "109940824119741550",
    "113991317635212236",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    Unstarted,
    Completed,
}

impl EventState {
    fn as_str(self) -> &'static str {
        match self {
            EventState::Unstarted => "unstarted",
            EventState::Completed => "completed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RiotError {
    #[error("riot esports request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("riot esports HTTP {0}")]
    Status(reqwest::StatusCode),
}

pub type Result<T> = std::result::Result<T, RiotError>;

// ====================================================================
// Response types (subset of the homeEvents payload we consume)
// ====================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotEvent {
    pub id: String,
    #[serde(default)]
    pub block_name: Option<String>,
    pub start_time: chrono::DateTime<Utc>,
    #[serde(default)]
    pub state: Option<String>,
    pub league: RiotLeague,
    #[serde(rename = "match")]
    pub match_info: Option<RiotMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotLeague {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotMatch {
    pub id: String,
    #[serde(default)]
    pub match_teams: Vec<RiotMatchTeam>,
    pub strategy: Option<RiotStrategy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotMatchTeam {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub result: Option<RiotTeamResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotTeamResult {
    pub game_wins: i32,
    #[serde(default)]
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotStrategy {
    pub count: i32,
}

#[derive(Debug, Deserialize)]
struct GqlEnvelope {
    data: Option<GqlData>,
}

#[derive(Debug, Deserialize)]
struct GqlData {
    esports: Option<GqlEsports>,
}

#[derive(Debug, Deserialize)]
struct GqlEsports {
    events: Option<Vec<RiotEvent>>,
}

// ====================================================================

pub struct RiotClient {
    client: reqwest::Client,
}

impl RiotClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
                )
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Fetches events for one game in the given state. Unstarted events use
    /// a two-month look-ahead window; completed events cover the last day.
    pub async fn fetch_events(&self, game: Game, state: EventState) -> Result<Vec<RiotEvent>> {
        let today = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        let window_end = match state {
            EventState::Unstarted => today + Duration::days(61) + Duration::hours(1),
            EventState::Completed => today + Duration::days(1) + Duration::hours(1),
        };

        let (domain, sport, leagues) = match game {
            Game::LeagueOfLegends => ("https://lolesports.com", "lol", &LOL_LEAGUES),
            Game::Valorant => ("https://valorantesports.com", "val", &VALORANT_LEAGUES),
        };

        let variables = serde_json::json!({
            "hl": "fr-FR",
            "sport": sport,
            "leagues": leagues,
            "eventDateStart": today.to_rfc3339(),
            "eventDateEnd": window_end.to_rfc3339(),
            "eventState": [state.as_str()],
            "eventType": "match",
            "pageSize": 40,
        });

        let response = self
            .client
            .get(format!("{domain}/api/gql"))
            .query(&[
                ("operationName", "homeEvents"),
                ("variables", &variables.to_string()),
                ("extensions", PERSISTED_QUERY_EXTENSION),
            ])
            .header("Content-Type", "application/json")
            .header("apollographql-client-name", "Esports Web")
            .header("apollographql-client-version", "bc60ebf")
            .header("x-apollo-operation-name", "homeEvents")
            .header("accept", "*/*")
            .header("cache-control", "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Riot esports API failed with {status} for {game}");
            return Err(RiotError::Status(status));
        }

        let envelope: GqlEnvelope = response.json().await?;
        let events = envelope
            .data
            .and_then(|d| d.esports)
            .and_then(|e| e.events)
            .unwrap_or_default();
        debug!("Riot API returned {} {} events for {game}", events.len(), state.as_str());
        Ok(events)
    }
}

impl Default for RiotClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RiotEvent {
    /// True when any participating team's code carries the organization tag.
    pub fn involves_code(&self, code_fragment: &str) -> bool {
        self.match_info
            .as_ref()
            .map(|m| m.match_teams.iter().any(|t| t.code.contains(code_fragment)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_JSON: &str = r#"{
        "id": "112233",
        "blockName": "Playoffs",
        "startTime": "2025-03-01T18:00:00Z",
        "state": "unstarted",
        "league": { "name": "LEC", "image": "https://img/lec.png", "slug": "lec" },
        "match": {
            "id": "112233",
            "matchTeams": [
                { "code": "KC", "name": "Karmine Corp", "image": "https://img/kc.png",
                  "result": { "gameWins": 0, "outcome": null } },
                { "code": "FNC", "name": "Fnatic", "image": "https://img/fnc.png",
                  "result": { "gameWins": 0, "outcome": null } }
            ],
            "strategy": { "count": 5 }
        }
    }"#;

    #[test]
    fn event_payload_deserializes() {
        let event: RiotEvent = serde_json::from_str(EVENT_JSON).unwrap();
        assert_eq!(event.id, "112233");
        assert_eq!(event.block_name.as_deref(), Some("Playoffs"));
        assert_eq!(event.league.name, "LEC");
        let m = event.match_info.as_ref().unwrap();
        assert_eq!(m.match_teams.len(), 2);
        assert_eq!(m.strategy.as_ref().unwrap().count, 5);
    }

    #[test]
    fn involvement_is_checked_on_team_codes() {
        let event: RiotEvent = serde_json::from_str(EVENT_JSON).unwrap();
        assert!(event.involves_code("KC"));
        assert!(!event.involves_code("G2"));
    }

    #[test]
    fn events_without_match_block_are_not_involved() {
        let json = r#"{
            "id": "9",
            "startTime": "2025-03-01T18:00:00Z",
            "league": { "name": "LEC" },
            "match": null
        }"#;
        let event: RiotEvent = serde_json::from_str(json).unwrap();
        assert!(!event.involves_code("KC"));
    }
}
