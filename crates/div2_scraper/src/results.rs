//! Result backfill for bracket matches. The bracket API only reports
//! validated scores days later, so finished series are reconstructed
//! from the organization's wiki match history instead: game rows are
//! matched to live bracket matches by day and opponent, then rolled up
//! into a series score per opponent.

use chrono::{Datelike, NaiveDate};
use leaguepedia_scraper::head_to_head::{parse_history_rows, GameResult, HistoryRow};
use leaguepedia_scraper::{query_team_name, WIKI_BASE};
use page_fetcher::{FetchError, PageFetcher, WaitStrategy};
use store::names::correct_lol_name;
use store::Match;
use tracing::warn;

/// Team name as stored on bracket match documents.
pub const ORG_STORED_NAME: &str = "KCorp Blue Stars";

/// Canonical wiki name of the same roster.
const ORG_WIKI_NAME: &str = "Karmine Corp Blue Stars";

/// Series score against one opponent, from the organization's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResult {
    pub opponent: String,
    pub org_score: i32,
    pub opponent_score: i32,
}

fn history_url(year: i32) -> String {
    format!(
        "{WIKI_BASE}/wiki/Special:RunQuery/MatchHistoryGame\
         ?MHG%5Bpreload%5D=Team\
         &MHG%5Bspl%5D=yes\
         &MHG%5Bstartdate%5D={year}-01-01\
         &MHG%5Bteam%5D={}\
         &_run=true",
        query_team_name(ORG_WIKI_NAME)
    )
}

/// Fetches this year's game history and rolls it up against the given
/// live bracket matches. No results table means the wiki has nothing for
/// the squad yet; the matches stay live.
pub async fn resolve_results(
    fetcher: &PageFetcher,
    live_matches: &[Match],
    year: i32,
) -> crate::Result<Vec<FinalResult>> {
    let url = history_url(year);
    let html = match fetcher
        .fetch_html(&url, WaitStrategy::Selector("table.wikitable"))
        .await
    {
        Ok(html) => html,
        Err(FetchError::Timeout { .. }) => {
            warn!("No match history yet for {ORG_WIKI_NAME}");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let rows = parse_history_rows(&html)?;
    Ok(series_results(&rows, live_matches))
}

/// Keeps game rows played on the same day as a live match, against one of
/// the live opponents, and rolls them up into per-opponent series scores.
pub fn series_results(rows: &[HistoryRow], live_matches: &[Match]) -> Vec<FinalResult> {
    let match_days: Vec<(u32, u32)> = live_matches
        .iter()
        .map(|m| (m.date.month(), m.date.day()))
        .collect();
    let opponents: Vec<String> = live_matches
        .iter()
        .flat_map(|m| m.teams.iter())
        .filter(|t| t.name != ORG_STORED_NAME)
        .map(|t| correct_lol_name(&t.name).to_string())
        .collect();

    let mut results: Vec<FinalResult> = Vec::new();
    for row in rows {
        let Ok(played) = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") else {
            continue;
        };
        if !match_days.contains(&(played.month(), played.day())) {
            continue;
        }
        if !opponents.iter().any(|name| row.opponent.contains(name)) {
            continue;
        }

        let entry = match results.iter_mut().find(|r| r.opponent == row.opponent) {
            Some(entry) => entry,
            None => {
                results.push(FinalResult {
                    opponent: row.opponent.clone(),
                    org_score: 0,
                    opponent_score: 0,
                });
                results.last_mut().unwrap()
            }
        };
        match row.result {
            GameResult::Win => entry.org_score += 1,
            GameResult::Loss => entry.opponent_score += 1,
        }
    }
    results
}

/// Scores for one live match, in its stored team order. `None` when the
/// wiki has no finished series against that opponent yet.
pub fn scores_in_team_order(m: &Match, results: &[FinalResult]) -> Option<Vec<(String, i32)>> {
    let opponent = m.teams.iter().find(|t| t.name != ORG_STORED_NAME)?;
    let wanted = correct_lol_name(&opponent.name);
    let result = results.iter().find(|r| r.opponent == wanted)?;

    Some(
        m.teams
            .iter()
            .map(|t| {
                let score = if t.name == ORG_STORED_NAME {
                    result.org_score
                } else {
                    result.opponent_score
                };
                (t.name.clone(), score)
            })
            .collect(),
    )
}
