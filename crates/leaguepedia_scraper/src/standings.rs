//! League standings, one parsing strategy per league family.
//!
//! Each league's season page lays its tables out differently, so dispatch
//! is a closed enum rather than a lookup table: adding a league means
//! handling it in every match below.

use chrono::{DateTime, Datelike, Utc};
use page_fetcher::{FetchError, PageFetcher, WaitStrategy};
use scraper::{ElementRef, Html};
use store::{RankingRow, SeriesRecord};
use tracing::{debug, warn};

use crate::{element_text, sel, Result, WIKI_BASE};

/// Leagues with a registered standings strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum League {
    Lfl,
    Lec,
    FirstStand,
    Msi,
    WorldChampionship,
}

impl League {
    /// Unknown league names resolve to `None`; that is "no standings",
    /// never an error.
    pub fn from_name(name: &str) -> Option<League> {
        match name {
            "LFL" => Some(League::Lfl),
            "LEC" => Some(League::Lec),
            "First Stand" | "First_Stand" => Some(League::FirstStand),
            "MSI" => Some(League::Msi),
            "Mondial" | "World Championship" | "World_Championship" => {
                Some(League::WorldChampionship)
            }
            _ => None,
        }
    }

    fn strategy(self) -> Strategy {
        match self {
            League::Lfl => Strategy::Lfl,
            League::Lec => Strategy::Lec,
            League::FirstStand | League::Msi | League::WorldChampionship => {
                Strategy::InternationalEvent
            }
        }
    }

    fn season_url(self, year: i32) -> String {
        match self {
            League::Lfl => format!("{WIKI_BASE}/wiki/LFL/{year}_Season"),
            League::Lec => format!("{WIKI_BASE}/wiki/LEC/{year}_Season"),
            League::FirstStand => format!("{WIKI_BASE}/wiki/{year}_First_Stand"),
            League::Msi => format!("{WIKI_BASE}/wiki/{year}_Mid-Season_Invitational"),
            League::WorldChampionship => {
                format!("{WIKI_BASE}/wiki/{year}_Season_World_Championship")
            }
        }
    }

    /// Bracket play has no standings table; these match types short-circuit
    /// to an empty result without any fetch.
    pub fn is_bracket_phase(self, match_type: &str) -> bool {
        match self.strategy() {
            Strategy::Lfl | Strategy::Lec => {
                matches!(match_type, "Play-offs" | "Playoffs" | "Finale" | "Finals")
            }
            Strategy::InternationalEvent => matches!(
                match_type,
                "Quarts de finale" | "Demi-finales" | "Finale" | "Finals" | "Play-ins"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Lfl,
    Lec,
    InternationalEvent,
}

/// Resolver output: the rows (if the league is known) and the split name
/// used as the cache key for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct StandingsOutcome {
    pub ranking_data: Option<Vec<RankingRow>>,
    pub current_split: Option<String>,
}

/// Split boundaries run on 21st-of-month cutovers. Winter only exists for
/// some leagues (LFL brands it "Flash In"); international events have no
/// split concept at all.
pub fn split_for_date(league: League, date: DateTime<Utc>) -> Option<String> {
    let month = date.month();
    let day = date.day();

    let winter = month == 1 || month == 2 || (month == 3 && day < 21) || (month == 12 && day >= 21);
    let spring = (month == 3 && day >= 21) || month == 4 || month == 5 || (month == 6 && day < 21);
    let summer = (month == 6 && day >= 21) || (7..=9).contains(&month);

    if winter {
        return match league {
            League::Lec => Some("Winter".to_string()),
            League::Lfl => Some("Flash_In".to_string()),
            _ => None,
        };
    }
    if spring {
        return Some("Spring".to_string());
    }
    if summer {
        return Some("Summer".to_string());
    }
    None
}

/// Resolves the standings applicable to one match. Unknown league returns
/// an empty outcome; bracket phases return `Some(vec![])` without
/// fetching anything.
pub async fn resolve_standings(
    fetcher: &PageFetcher,
    league_name: &str,
    match_type: &str,
    match_date: DateTime<Utc>,
) -> Result<StandingsOutcome> {
    let Some(league) = League::from_name(league_name) else {
        debug!("No standings strategy registered for league {league_name}");
        return Ok(StandingsOutcome::default());
    };

    let current_split = split_for_date(league, match_date);
    if league.is_bracket_phase(match_type) {
        return Ok(StandingsOutcome {
            ranking_data: Some(Vec::new()),
            current_split,
        });
    }

    let year = match_date.year();
    let url = league.season_url(year);
    let html = match fetcher.fetch_html(&url, WaitStrategy::DomSettle).await {
        Ok(html) => html,
        Err(FetchError::Timeout { .. }) => {
            warn!("Navigation timeout for standings page {url}");
            return Ok(StandingsOutcome {
                ranking_data: None,
                current_split,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let ranking_data = match league.strategy() {
        Strategy::Lfl => parse_lfl_standings(&html, current_split.as_deref(), match_type),
        Strategy::Lec => parse_lec_standings(&html, current_split.as_deref()),
        Strategy::InternationalEvent => parse_international_standings(&html),
    };

    Ok(StandingsOutcome {
        ranking_data,
        current_split,
    })
}

fn highlighted_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    table
        .select(&sel("tbody tr"))
        .filter(|row| row.value().attr("data-teamhighlight").is_some())
        .collect()
}

/// Standings rows share a cell layout: position, team, W-L record,
/// percentage; the trailing cell is decoration and dropped.
fn ranking_row(row: ElementRef<'_>, region: &str) -> RankingRow {
    let cells: Vec<ElementRef> = row.select(&sel("td")).collect();
    let cells = &cells[..cells.len().saturating_sub(1)];
    let cell = |i: usize| cells.get(i).map(|c| element_text(*c)).unwrap_or_default();

    let record = cell(2);
    let (win, lose) = match record.split_once('-') {
        Some((w, l)) => (w.trim().to_string(), l.trim().to_string()),
        None => (String::new(), String::new()),
    };
    let percentage = cell(3).trim_end_matches('%').to_string();

    RankingRow {
        position: cell(0),
        team_name: cell(1),
        region_name: region.to_string(),
        series: SeriesRecord { win, lose, percentage },
    }
}

/// LFL: the split heading anchors the season section. Swiss-system weeks
/// use one big combined table (the largest `wikitable2` on the page);
/// group stages use the standings table containing the organization.
fn parse_lfl_standings(
    html: &str,
    current_split: Option<&str>,
    match_type: &str,
) -> Option<Vec<RankingRow>> {
    let document = Html::parse_document(html);
    let split = current_split?;
    document.select(&sel(&format!("span#{split}"))).next()?;

    let table = if match_type == "Système suisse" {
        document
            .select(&sel("table.wikitable2"))
            .max_by_key(|t| t.select(&sel("tbody tr")).count())?
    } else {
        document
            .select(&sel("table.wikitable2.standings"))
            .find(|t| {
                t.select(&sel(r#"tr[data-teamhighlight="Karmine Corp Blue"]"#))
                    .next()
                    .is_some()
            })?
    };

    Some(
        highlighted_rows(table)
            .into_iter()
            .map(|row| ranking_row(row, "LFL"))
            .collect(),
    )
}

/// LEC: the standings table sits in the first `div` sibling after the
/// split's `h2` heading.
fn parse_lec_standings(html: &str, current_split: Option<&str>) -> Option<Vec<RankingRow>> {
    let document = Html::parse_document(html);
    let split = current_split?;
    let anchor = document.select(&sel(&format!("span#{split}"))).next()?;
    let heading = anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "h2")?;

    let section = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "div")?;
    let table = section.select(&sel("table.wikitable2")).next()?;

    Some(
        highlighted_rows(table)
            .into_iter()
            .map(|row| ranking_row(row, "LEC"))
            .collect(),
    )
}

/// International events: group tables carry region sub-labels per team,
/// and the right group is the one containing the organization.
fn parse_international_standings(html: &str) -> Option<Vec<RankingRow>> {
    let document = Html::parse_document(html);
    let table = document.select(&sel("table.wikitable2")).find(|t| {
        t.select(&sel(r#"tr[data-teamhighlight="Karmine Corp"]"#))
            .next()
            .is_some()
    })?;

    let name_sel = sel("span");
    let region_sel = sel("div");
    let cell_sel = sel("td");

    Some(
        highlighted_rows(table)
            .into_iter()
            .map(|row| {
                let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
                let team_cell = cells.get(1);
                let team_name = team_cell
                    .and_then(|c| c.select(&name_sel).next())
                    .map(element_text)
                    .unwrap_or_default();
                let region_name = team_cell
                    .and_then(|c| c.select(&region_sel).next())
                    .map(element_text)
                    .unwrap_or_default();
                let mut base = ranking_row(row, &region_name);
                base.team_name = team_name;
                base
            })
            .collect(),
    )
}
