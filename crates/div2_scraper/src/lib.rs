//! division2lol.fr bracket integration. The site exposes no public API
//! documentation; its frontend loads rounds and matches over XHR, so
//! discovery rides the browser session and intercepts those calls.
//! Results come from the League wiki instead, because the bracket API
//! only reports scores after manual admin validation.

pub mod matches;
pub mod results;

use leaguepedia_scraper::ScrapeError as WikiError;
use page_fetcher::FetchError;

pub const SITE_BASE: &str = "https://www.division2lol.fr";

/// Frontend page whose load triggers the rounds XHR.
pub const MATCHES_PAGE: &str = "https://www.division2lol.fr/matchs";

pub const LEAGUE_NAME: &str = "div2";

pub const LEAGUE_LOGO_URL: &str =
    "https://www.division2lol.fr/media/7301732705288822784/original";

#[derive(Debug, thiserror::Error)]
pub enum Div2Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Wiki(#[from] WikiError),
    #[error("unexpected payload from {url}: {source}")]
    Payload {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Div2Error>;
