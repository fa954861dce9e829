//! Nightly re-enrichment of upcoming League matches. Matches discovered
//! weeks ahead often predate their wiki data (rosters after a transfer
//! window, statistics pages created mid-split), so the snapshot is
//! rebuilt until the match goes live.

use page_fetcher::PageFetcher;
use store::{Game, MatchStore};
use tracing::info;

use crate::enrichment::{self, EnrichmentCaches};

pub async fn run(store: &MatchStore) -> anyhow::Result<()> {
    let upcoming = store.find_upcoming_scheduled(Game::LeagueOfLegends).await?;
    if upcoming.is_empty() {
        info!("No upcoming matches to refresh");
        return Ok(());
    }
    info!("🌙 Refreshing enrichment for {} upcoming matches", upcoming.len());

    let fetcher = PageFetcher::launch().await?;
    if let Err(e) = fetcher
        .dismiss_consent(leaguepedia_scraper::WIKI_BASE, leaguepedia_scraper::CONSENT_BUTTON)
        .await
    {
        tracing::warn!("Consent dismissal failed, continuing anyway: {e}");
    }
    let caches = EnrichmentCaches::new();
    for mut m in upcoming {
        enrichment::enrich_match(&fetcher, &caches, &mut m).await;
        store.update_enrichment(&m).await?;
    }
    Ok(())
}
