//! Per-team season statistics: the player performance table and the
//! "By Champion" aggregate table of `/wiki/{Team}/Statistics/{year}`.

use page_fetcher::{FetchError, PageFetcher, WaitStrategy};
use scraper::{ElementRef, Html};
use store::{ChampionStatsRow, PlayerStatsRow, TeamStats};
use tracing::{debug, warn};

use crate::{element_text, sel, wiki_page_name, Result, WIKI_BASE};

/// Resolves season statistics for an already-canonicalized team name.
/// Placeholder teams, missing pages and missing tables all resolve to
/// empty stats rather than errors.
pub async fn resolve_team_stats(
    fetcher: &PageFetcher,
    team_name: &str,
    year: i32,
) -> Result<TeamStats> {
    if team_name == "TBD" {
        return Ok(TeamStats::default());
    }

    let url = format!("{WIKI_BASE}/wiki/{}/Statistics/{year}", wiki_page_name(team_name));
    let html = match fetcher.fetch_html(&url, WaitStrategy::DomSettle).await {
        Ok(html) => html,
        Err(FetchError::Timeout { .. }) => {
            warn!("Navigation timeout for statistics page of {team_name}");
            return Ok(TeamStats::default());
        }
        Err(e) => return Err(e.into()),
    };

    let stats = parse_team_stats(&html);
    if stats.player_table_data.is_empty() {
        debug!("No statistics found for {team_name} ({year})");
    }
    Ok(stats)
}

pub fn parse_team_stats(html: &str) -> TeamStats {
    let document = Html::parse_document(html);

    // Wiki renders a dedicated marker element on nonexistent pages.
    if document.select(&sel("div.noarticletext")).next().is_some() {
        return TeamStats::default();
    }

    let player_table_data = parse_player_table(&document);
    let (champion_table_data, number_of_champions_played) = parse_champion_section(&document);

    TeamStats {
        player_table_data,
        champion_table_data,
        number_of_champions_played,
    }
}

/// First `table.wikitable` on the page. Column indices follow the wiki's
/// fixed layout; rows without a KDA cell are header/footer noise.
fn parse_player_table(document: &Html) -> Vec<PlayerStatsRow> {
    let Some(table) = document.select(&sel("table.wikitable")).next() else {
        return Vec::new();
    };

    let row_sel = sel("tbody tr");
    let cell_sel = sel("td");
    let champion_link_sel = sel("a");
    let champion_name_sel = sel("span");

    let mut rows = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        let cell = |i: usize| cells.get(i).map(|c| element_text(*c)).unwrap_or_default();

        let kda = cell(9);
        if kda.is_empty() {
            continue;
        }

        let most_played_champion = cells
            .get(20)
            .map(|c| {
                c.select(&champion_link_sel)
                    .filter_map(|a| {
                        a.select(&champion_name_sel)
                            .next()
                            .and_then(|s| s.value().attr("title"))
                            .map(|t| t.trim().to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();

        rows.push(PlayerStatsRow {
            name: cell(1),
            kda,
            csm: cell(11),
            gm: cell(13),
            dmgm: cell(15),
            kpar: cell(16),
            most_played_champion,
        });
    }
    rows
}

/// The "By Champion" table has no stable position in the DOM; it is found
/// structurally as the nearest ancestor `div` of the section heading that
/// also contains a data table. Returns the top five rows plus the total
/// body-row count as the distinct-champions figure.
fn parse_champion_section(document: &Html) -> (Vec<ChampionStatsRow>, i64) {
    let Some(anchor) = document.select(&sel("span#By_Champion")).next() else {
        return (Vec::new(), 0);
    };
    let Some(heading) = anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "h3")
    else {
        return (Vec::new(), 0);
    };

    let table_sel = sel("table.wikitable");
    let Some(container) = heading
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "div" && e.select(&table_sel).next().is_some())
    else {
        return (Vec::new(), 0);
    };
    let Some(table) = container.select(&table_sel).next() else {
        return (Vec::new(), 0);
    };

    let row_sel = sel("tbody tr");
    let cell_sel = sel("td");
    let name_sel = sel("span.markup-object-name");

    let all_rows: Vec<ElementRef> = table.select(&row_sel).collect();
    let total_rows = all_rows.len() as i64;

    let mut champions = Vec::new();
    for row in &all_rows {
        if champions.len() >= 5 {
            break;
        }
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        let cell = |i: usize| cells.get(i).map(|c| element_text(*c)).unwrap_or_default();

        let champion = cells
            .first()
            .and_then(|c| c.select(&name_sel).next())
            .map(|s| element_text(s))
            .unwrap_or_default();
        if champion.is_empty() {
            continue;
        }

        champions.push(ChampionStatsRow {
            champion,
            games_played: cell(1),
            win_rate: cell(5),
            kda: cell(9),
            csm: cell(11),
            gm: cell(13),
            dmgm: cell(15),
            kpar: cell(16),
        });
    }

    (champions, total_rows)
}
