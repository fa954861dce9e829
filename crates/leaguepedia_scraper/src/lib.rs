//! Resolvers against lol.fandom.com (Leaguepedia): team rosters, per-team
//! statistics, league standings and head-to-head match history.
//!
//! Fetching goes through `page_fetcher`; everything after that is pure
//! `&str -> T` parsing with the `scraper` crate, so the table logic is
//! covered by fixture tests the same way the site can be probed by hand.

pub mod head_to_head;
pub mod roster;
pub mod standings;
pub mod stats;

use page_fetcher::FetchError;
use scraper::{ElementRef, Selector};

pub const WIKI_BASE: &str = "https://lol.fandom.com";

/// OneTrust reject button shown on first visit.
pub const CONSENT_BUTTON: &str = "#onetrust-reject-all-handler";

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// A structurally required element is absent. Most missing tables are
    /// "no data" and never reach this; this is for required containers.
    #[error("required structure missing: {0}")]
    Structure(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Wiki page names replace whitespace runs with underscores.
pub fn wiki_page_name(team_name: &str) -> String {
    team_name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// RunQuery parameters use `+` for spaces instead.
pub fn query_team_name(team_name: &str) -> String {
    team_name.split_whitespace().collect::<Vec<_>>().join("+")
}

/// Panics only on selectors that are compile-time constants.
pub(crate) fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector must parse")
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
