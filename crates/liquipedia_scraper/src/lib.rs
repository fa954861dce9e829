//! Valorant roster resolver against liquipedia.net. Much smaller surface
//! than the League wiki: rosters only, no positions, no statistics.

use page_fetcher::{FetchError, PageFetcher, WaitStrategy};
use scraper::{ElementRef, Html, Selector};
use store::Player;
use tracing::{debug, warn};

pub const WIKI_BASE: &str = "https://liquipedia.net/valorant";

const ROSTER_TABLE: &str = "table.wikitable.wikitable-striped.roster-card";

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

fn wiki_page_name(team_name: &str) -> String {
    team_name.split_whitespace().collect::<Vec<_>>().join("_")
}

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector must parse")
}

/// Resolves the active Valorant roster. Unreachable pages and pages
/// without a roster card resolve to an empty roster.
pub async fn resolve_roster(fetcher: &PageFetcher, team_name: &str) -> Result<Vec<Player>> {
    let url = format!("{WIKI_BASE}/{}", wiki_page_name(team_name));
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
        debug!("No roster card found for {team_name}");
    }
    Ok(roster)
}

/// The first roster card on the page is the active squad. Player handles
/// sit in `td.ID` cells; Liquipedia does not expose roles there, so
/// `position` stays unset.
pub fn parse_roster(html: &str) -> Vec<Player> {
    let document = Html::parse_document(html);
    let Some(card) = document.select(&sel(ROSTER_TABLE)).next() else {
        return Vec::new();
    };

    card.select(&sel("td.ID"))
        .map(element_text)
        .filter(|name| !name.is_empty())
        .map(|name| Player {
            name,
            position: None,
            stats: None,
        })
        .collect()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_html(ids: &[&str]) -> String {
        let rows: String = ids
            .iter()
            .map(|id| format!(r#"<tr><td class="ID"><a href="/p">{id}</a></td><td>France</td></tr>"#))
            .collect();
        format!(
            r#"<html><body>
            <table class="wikitable wikitable-striped roster-card"><tbody>{rows}</tbody></table>
            </body></html>"#
        )
    }

    #[test]
    fn handles_come_from_id_cells() {
        let roster = parse_roster(&card_html(&["Shin", "Magnum", "Tomaszy"]));
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].name, "Shin");
        assert!(roster.iter().all(|p| p.position.is_none()));
    }

    #[test]
    fn only_the_first_card_counts() {
        let former = r#"<table class="wikitable wikitable-striped roster-card">
            <tbody><tr><td class="ID">OldPlayer</td></tr></tbody></table>"#;
        let html = card_html(&["Active"]).replace("</body>", &format!("{former}</body>"));
        let roster = parse_roster(&html);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, "Active");
    }

    #[test]
    fn page_without_roster_card_is_empty() {
        assert!(parse_roster("<html><body><p>no team page</p></body></html>").is_empty());
    }
}
