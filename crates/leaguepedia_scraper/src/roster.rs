//! Current roster of a team, parsed from its wiki page infobox.

use page_fetcher::{FetchError, PageFetcher, WaitStrategy};
use scraper::Html;
use store::Player;
use tracing::{debug, warn};

use crate::{element_text, sel, wiki_page_name, Result, WIKI_BASE};

/// Infobox roster table; layout shifts between team pages, so there is a
/// generic fallback below.
const PRIMARY_TABLE: &str =
    "#mw-content-text > div > div.mw-parser-output > table:nth-child(2) > tbody > tr > td > table";

/// Resolves the active roster for an already-canonicalized team name.
/// An unreachable page or a page without a roster table is an empty
/// roster, not an error.
pub async fn resolve_roster(fetcher: &PageFetcher, team_name: &str) -> Result<Vec<Player>> {
    let url = format!("{WIKI_BASE}/wiki/{}", wiki_page_name(team_name));
    let html = match fetcher.fetch_html(&url, WaitStrategy::DomSettle).await {
        Ok(html) => html,
        Err(FetchError::Timeout { .. }) => {
            warn!("Navigation timeout for roster page of {team_name}");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let roster = parse_roster(&html);
    if roster.is_empty() {
        debug!("No roster table found for {team_name}");
    }
    Ok(roster)
}

/// Role/name pairs come as alternating `span[title]` (role icon) and `a`
/// (player link) elements in the third infobox row. Each role is kept
/// once, capped at five players.
pub fn parse_roster(html: &str) -> Vec<Player> {
    let document = Html::parse_document(html);
    let pair_selector = sel("tr:nth-child(3) span[title], tr:nth-child(3) a");

    let table_html = {
        let primary = sel(PRIMARY_TABLE);
        let fallback = sel("table");
        match document
            .select(&primary)
            .next()
            .or_else(|| document.select(&fallback).next())
        {
            Some(table) => table.html(),
            None => return Vec::new(),
        }
    };

    let table = Html::parse_fragment(&table_html);
    let elements: Vec<_> = table.select(&pair_selector).collect();

    let mut players = Vec::new();
    for pair in elements.chunks(2) {
        let &[position_el, name_el] = pair else { continue };
        let Some(position) = position_el.value().attr("title") else { continue };
        let name = element_text(name_el);
        if name.is_empty() {
            continue;
        }
        players.push(Player {
            name,
            position: Some(position.to_string()),
            stats: None,
        });
    }

    // One player per role; later duplicates are substitutes.
    let mut deduped: Vec<Player> = Vec::new();
    for player in players {
        if !deduped.iter().any(|p| p.position == player.position) {
            deduped.push(player);
        }
    }
    deduped.truncate(5);
    deduped
}
