//! Document models for the `matches` and `casters` collections.
//!
//! Field names are camelCase on the wire so the documents stay readable by
//! the calendar frontend that consumes the same database.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported games. Stored as the full display name upstream uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Game {
    #[serde(rename = "League of Legends")]
    LeagueOfLegends,
    #[serde(rename = "Valorant")]
    Valorant,
}

impl Game {
    pub fn display_name(&self) -> &'static str {
        match self {
            Game::LeagueOfLegends => "League of Legends",
            Game::Valorant => "Valorant",
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Match lifecycle. Transitions are forward-only: 0 -> 1 -> 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum MatchStatus {
    Scheduled = 0,
    Live = 1,
    Completed = 2,
}

impl MatchStatus {
    /// The next state in the lifecycle, or `None` once completed.
    pub fn next(self) -> Option<MatchStatus> {
        match self {
            MatchStatus::Scheduled => Some(MatchStatus::Live),
            MatchStatus::Live => Some(MatchStatus::Completed),
            MatchStatus::Completed => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<MatchStatus> for i32 {
    fn from(status: MatchStatus) -> i32 {
        status as i32
    }
}

impl TryFrom<i32> for MatchStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MatchStatus::Scheduled),
            1 => Ok(MatchStatus::Live),
            2 => Ok(MatchStatus::Completed),
            other => Err(format!("invalid match status {other}")),
        }
    }
}

/// One row of the per-player performance table on a team statistics page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatsRow {
    pub name: String,
    pub kda: String,
    pub csm: String,
    pub gm: String,
    pub dmgm: String,
    pub kpar: String,
    pub most_played_champion: Vec<String>,
}

/// One row of the "By Champion" aggregate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionStatsRow {
    pub champion: String,
    pub games_played: String,
    pub win_rate: String,
    pub kda: String,
    pub csm: String,
    pub gm: String,
    pub dmgm: String,
    pub kpar: String,
}

/// Per-team aggregate stats, tagged by the game they belong to so the
/// payload stays self-describing in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "camelCase")]
pub enum GameStats {
    LolChampions(Vec<ChampionStatsRow>),
}

/// Resolver output for one team: both tables plus the distinct champion
/// count. Only the champion rows and the count land on the team document;
/// player rows are distributed onto the roster by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub player_table_data: Vec<PlayerStatsRow>,
    pub champion_table_data: Vec<ChampionStatsRow>,
    pub number_of_champions_played: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PlayerStatsRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    pub acronym: String,
    pub logo_url: String,
    pub players: Vec<Player>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<GameStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_champions_played: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
}

impl Team {
    /// A bare team as discovery produces it: identity only, no roster yet.
    pub fn skeleton(name: impl Into<String>, acronym: impl Into<String>, logo_url: impl Into<String>) -> Self {
        Team {
            name: name.into(),
            acronym: acronym.into(),
            logo_url: logo_url.into(),
            players: Vec::new(),
            stats: None,
            number_of_champions_played: None,
            score: None,
        }
    }
}

/// Win/loss record of one standings row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub win: String,
    pub lose: String,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub position: String,
    pub team_name: String,
    pub region_name: String,
    pub series: SeriesRecord,
}

/// Head-to-head snapshot for the organization in one match. The side
/// percentages are each side's share of total games played, so together
/// they cover every game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KcStats {
    pub win_by_red_side_percentage: f64,
    pub win_by_blue_side_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winrate_vs_other_team_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_three_champions: Option<Vec<(String, u32)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caster {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub twitch_link: String,
    pub leagues: Vec<String>,
}

/// The central aggregate: one scheduled/live/completed match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub match_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub teams: Vec<Team>,
    pub league: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league_logo_url: Option<String>,
    #[serde(rename = "type")]
    pub match_type: String,
    pub game: Game,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub casters: Option<Vec<Caster>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_data: Option<Vec<RankingRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kc_stats: Option<KcStats>,
}

impl Match {
    /// Name of the opposing team, from the organization's point of view.
    pub fn opponent_of(&self, org_fragment: &str) -> Option<&Team> {
        self.teams.iter().find(|t| !t.name.contains(org_fragment))
    }

    pub fn team_names(&self) -> Vec<String> {
        self.teams.iter().map(|t| t.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_forward_only() {
        assert_eq!(MatchStatus::Scheduled.next(), Some(MatchStatus::Live));
        assert_eq!(MatchStatus::Live.next(), Some(MatchStatus::Completed));
        assert_eq!(MatchStatus::Completed.next(), None);
        assert!(MatchStatus::Scheduled < MatchStatus::Live);
        assert!(MatchStatus::Live < MatchStatus::Completed);
    }

    #[test]
    fn status_serializes_as_integer() {
        let json = serde_json::to_string(&MatchStatus::Live).unwrap();
        assert_eq!(json, "1");
        let back: MatchStatus = serde_json::from_str("2").unwrap();
        assert_eq!(back, MatchStatus::Completed);
        assert!(serde_json::from_str::<MatchStatus>("3").is_err());
    }

    #[test]
    fn game_round_trips_display_name() {
        let json = serde_json::to_string(&Game::LeagueOfLegends).unwrap();
        assert_eq!(json, "\"League of Legends\"");
        let back: Game = serde_json::from_str("\"Valorant\"").unwrap();
        assert_eq!(back, Game::Valorant);
    }

    #[test]
    fn opponent_lookup_skips_the_organization() {
        let m = Match {
            id: None,
            match_id: "m1".into(),
            date: Utc::now(),
            teams: vec![
                Team::skeleton("Karmine Corp", "KC", ""),
                Team::skeleton("Rival FC", "RFC", ""),
            ],
            league: "LEC".into(),
            league_logo_url: None,
            match_type: "Regular Season".into(),
            game: Game::LeagueOfLegends,
            status: MatchStatus::Scheduled,
            rounds: Some(3),
            casters: None,
            ranking_data: None,
            kc_stats: None,
        };
        assert_eq!(m.opponent_of("Karmine").unwrap().name, "Rival FC");
    }
}
