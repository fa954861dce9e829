//! Match history via the `MatchHistoryGame` RunQuery form: side
//! statistics for the whole season and the head-to-head record against
//! one opponent.

use page_fetcher::{FetchError, PageFetcher, WaitStrategy};
use scraper::{ElementRef, Html};
use store::KcStats;
use tracing::warn;

use crate::{element_text, query_team_name, sel, wiki_page_name, Result, ScrapeError, WIKI_BASE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Red,
    Blue,
}

/// One game row of the match history table.
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub date: String,
    pub result: GameResult,
    pub side: Side,
    pub opponent: String,
    /// Bans and picks of the tracked team, in table order.
    pub champions: Vec<String>,
}

fn history_url(team_name: &str, year: i32) -> String {
    format!(
        "{WIKI_BASE}/wiki/Special:RunQuery/MatchHistoryGame\
         ?MHG%5Bpreload%5D=Team\
         &MHG%5Bspl%5D=yes\
         &MHG%5Bstartdate%5D={year}-01-01\
         &MHG%5Bteam%5D={}\
         &_run=true",
        query_team_name(team_name)
    )
}

/// Fetches and parses the match history of `team_name` since January 1st
/// of `year`, then aggregates it against `opponent` when one is known.
/// The results table is structurally required; a page without it means
/// the query itself failed.
pub async fn resolve_head_to_head(
    fetcher: &PageFetcher,
    team_name: &str,
    opponent: Option<&str>,
    year: i32,
) -> Result<KcStats> {
    let url = history_url(team_name, year);
    let html = match fetcher
        .fetch_html(&url, WaitStrategy::Selector("table.wikitable"))
        .await
    {
        Ok(html) => html,
        Err(FetchError::Timeout { .. }) => {
            warn!("Match history query for {team_name} produced no results table");
            return Err(ScrapeError::Structure(
                "match history results table never appeared".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let rows = parse_history_rows(&html)?;
    Ok(compute_stats(&rows, opponent))
}

/// Parses the RunQuery results table. Column layout is fixed: date,
/// patch, tournament, result, side, opponent, bans, picks, ...
pub fn parse_history_rows(html: &str) -> Result<Vec<HistoryRow>> {
    let document = Html::parse_document(html);
    let Some(table) = document.select(&sel("table.wikitable")).next() else {
        return Err(ScrapeError::Structure(
            "match history table missing".to_string(),
        ));
    };

    let row_sel = sel("tbody tr");
    let cell_sel = sel("td");
    let link_sel = sel("a");
    let champion_sel = sel("span[title]");

    let mut rows = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 8 {
            continue;
        }

        let result = match element_text(cells[3]).as_str() {
            "Win" => GameResult::Win,
            "Loss" => GameResult::Loss,
            _ => continue,
        };
        let side = match element_text(cells[4]).as_str() {
            "Red" => Side::Red,
            "Blue" => Side::Blue,
            _ => continue,
        };

        let opponent = cells[5]
            .select(&link_sel)
            .next()
            .map(|a| {
                a.value()
                    .attr("title")
                    .map(str::to_string)
                    .unwrap_or_else(|| element_text(a))
            })
            .unwrap_or_else(|| element_text(cells[5]));

        let champions = cells[6..8]
            .iter()
            .flat_map(|cell| cell.select(&champion_sel))
            .filter_map(|s| s.value().attr("title"))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        rows.push(HistoryRow {
            date: element_text(cells[0]),
            result,
            side,
            opponent,
            champions,
        });
    }
    Ok(rows)
}

/// Side percentages are computed over the whole season; the head-to-head
/// figures only when an opponent is given and games against it exist.
pub fn compute_stats(rows: &[HistoryRow], opponent: Option<&str>) -> KcStats {
    let total = rows.len();
    let red = rows.iter().filter(|r| r.side == Side::Red).count();

    let (win_by_red_side_percentage, win_by_blue_side_percentage) = if total == 0 {
        (0.0, 0.0)
    } else {
        (
            red as f64 / total as f64,
            (total - red) as f64 / total as f64,
        )
    };

    let mut stats = KcStats {
        win_by_red_side_percentage,
        win_by_blue_side_percentage,
        winrate_vs_other_team_percentage: None,
        top_three_champions: None,
    };

    let Some(opponent) = opponent else {
        return stats;
    };
    let wanted = wiki_page_name(opponent);
    let versus: Vec<&HistoryRow> = rows
        .iter()
        .filter(|r| wiki_page_name(&r.opponent) == wanted)
        .collect();
    if versus.is_empty() {
        return stats;
    }

    stats.winrate_vs_other_team_percentage = Some(opponent_series_rate(&versus));
    stats.top_three_champions = Some(top_champions(&versus, 3));
    stats
}

/// Series outcome per calendar date: the opponent takes the series on a
/// strict majority of game wins, and also on a tie. The rate is the share
/// of series the opponent took.
fn opponent_series_rate(versus: &[&HistoryRow]) -> f64 {
    let mut series: Vec<(&str, u32, u32)> = Vec::new();
    for row in versus {
        match series.iter_mut().find(|(date, ..)| *date == row.date) {
            Some((_, wins, losses)) => match row.result {
                GameResult::Win => *wins += 1,
                GameResult::Loss => *losses += 1,
            },
            None => {
                let (wins, losses) = match row.result {
                    GameResult::Win => (1, 0),
                    GameResult::Loss => (0, 1),
                };
                series.push((&row.date, wins, losses));
            }
        }
    }

    let taken: u32 = series
        .iter()
        .map(|(_, wins, losses)| u32::from(wins <= losses))
        .sum();
    taken as f64 / series.len() as f64
}

/// Most frequent bans and picks across the given games, count descending,
/// ties broken alphabetically.
fn top_champions(versus: &[&HistoryRow], limit: usize) -> Vec<(String, u32)> {
    let mut counts: Vec<(String, u32)> = Vec::new();
    for row in versus {
        for champion in &row.champions {
            match counts.iter_mut().find(|(name, _)| name == champion) {
                Some((_, n)) => *n += 1,
                None => counts.push((champion.clone(), 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, result: GameResult, side: Side, opponent: &str) -> HistoryRow {
        HistoryRow {
            date: date.to_string(),
            result,
            side,
            opponent: opponent.to_string(),
            champions: Vec::new(),
        }
    }

    #[test]
    fn side_percentages_are_game_shares() {
        let rows = vec![
            row("2025-02-01", GameResult::Win, Side::Red, "Solary"),
            row("2025-02-08", GameResult::Loss, Side::Red, "Vitality Bee"),
            row("2025-02-15", GameResult::Win, Side::Blue, "Solary"),
        ];
        let stats = compute_stats(&rows, None);
        assert!((stats.win_by_red_side_percentage - 2.0 / 3.0).abs() < 1e-9);
        assert!((stats.win_by_blue_side_percentage - 1.0 / 3.0).abs() < 1e-9);
        assert!(stats.winrate_vs_other_team_percentage.is_none());
        assert!(stats.top_three_champions.is_none());
    }

    #[test]
    fn no_games_yields_zero_sides() {
        let stats = compute_stats(&[], Some("Solary"));
        assert_eq!(stats.win_by_red_side_percentage, 0.0);
        assert_eq!(stats.win_by_blue_side_percentage, 0.0);
        assert!(stats.winrate_vs_other_team_percentage.is_none());
    }

    #[test]
    fn series_go_to_the_opponent_on_majority_and_on_ties() {
        let rows = vec![
            // Series 1: 2-1 for us, opponent does not take it.
            row("2025-03-01", GameResult::Win, Side::Blue, "Solary"),
            row("2025-03-01", GameResult::Loss, Side::Red, "Solary"),
            row("2025-03-01", GameResult::Win, Side::Blue, "Solary"),
            // Series 2: 1-1 tie counts for the opponent.
            row("2025-03-15", GameResult::Win, Side::Red, "Solary"),
            row("2025-03-15", GameResult::Loss, Side::Blue, "Solary"),
            // Unrelated opponent, ignored.
            row("2025-03-20", GameResult::Loss, Side::Red, "Vitality Bee"),
        ];
        let stats = compute_stats(&rows, Some("Solary"));
        assert_eq!(stats.winrate_vs_other_team_percentage, Some(0.5));
    }

    #[test]
    fn opponent_matching_ignores_whitespace_form() {
        let rows = vec![row("2025-04-01", GameResult::Loss, Side::Red, "Team Liquid")];
        let stats = compute_stats(&rows, Some("Team  Liquid"));
        assert_eq!(stats.winrate_vs_other_team_percentage, Some(1.0));
    }

    #[test]
    fn top_champions_count_bans_and_picks_together() {
        let mut a = row("2025-05-01", GameResult::Win, Side::Blue, "Solary");
        a.champions = vec!["Azir".into(), "Orianna".into(), "Rumble".into()];
        let mut b = row("2025-05-08", GameResult::Win, Side::Blue, "Solary");
        b.champions = vec!["Azir".into(), "Rumble".into(), "Jax".into()];
        let stats = compute_stats(&[a, b], Some("Solary"));
        let top = stats.top_three_champions.unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0], ("Azir".to_string(), 2));
        assert_eq!(top[1], ("Rumble".to_string(), 2));
    }

    #[test]
    fn parses_fixed_history_columns() {
        let html = r#"<html><body><table class="wikitable"><tbody>
        <tr><th>Date</th></tr>
        <tr>
          <td>2025-02-01</td><td>25.03</td><td>LFL</td><td>Win</td><td>Red</td>
          <td><a title="Solary" href="/wiki/Solary">SLY</a></td>
          <td><span title="Azir"></span><span title="Rumble"></span></td>
          <td><span title="Orianna"></span></td>
          <td>40:12</td>
        </tr>
        </tbody></table></body></html>"#;
        let rows = parse_history_rows(html).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.date, "2025-02-01");
        assert_eq!(row.result, GameResult::Win);
        assert_eq!(row.side, Side::Red);
        assert_eq!(row.opponent, "Solary");
        assert_eq!(row.champions, vec!["Azir", "Rumble", "Orianna"]);
    }

    #[test]
    fn page_without_results_table_is_a_structure_error() {
        let err = parse_history_rows("<html><body><p>query form</p></body></html>");
        assert!(matches!(err, Err(ScrapeError::Structure(_))));
    }
}
