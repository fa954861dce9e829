//! Plain-function trigger surface. Each task is a complete unit of work
//! over a connected store; the scheduler loops and the `run-task` binary
//! both dispatch through here.

use page_fetcher::PageFetcher;
use riot_client::RiotClient;
use store::{Game, MatchStore};
use tracing::{info, warn};

use crate::enrichment::{self, EnrichmentCaches};
use crate::{discovery, live_results, stats_refresh, status_sweep};

/// Discovery plus enrichment for one game. League of Legends also pulls
/// the second-division bracket, which rides the same browser session.
pub async fn run_discovery(store: &MatchStore, game: Game) -> anyhow::Result<usize> {
    let riot = RiotClient::new();
    let mut drafts = discovery::run(store, &riot, game).await?;

    if game == Game::LeagueOfLegends {
        let fetcher = PageFetcher::launch().await?;
        match div2_scraper::matches::discover_matches(&fetcher).await {
            Ok(bracket) => {
                let existing = store.upcoming_match_keys(game).await?;
                let fresh: Vec<_> = bracket
                    .into_iter()
                    .filter(|m| !existing.iter().any(|key| key.match_id == m.match_id))
                    .collect();
                info!("📅 div2: {} new bracket matches", fresh.len());
                drafts.extend(fresh);
            }
            Err(e) => warn!("Bracket discovery failed, continuing without it: {e}"),
        }
        return enrichment::run(store, &fetcher, drafts).await;
    }

    // No browser session when there is nothing to enrich.
    if drafts.is_empty() {
        info!("📅 {game}: nothing new to enrich");
        return Ok(0);
    }
    let fetcher = PageFetcher::launch().await?;
    enrichment::run(store, &fetcher, drafts).await
}

/// Re-enriches stored upcoming matches that are still missing their
/// enrichment payload, without rediscovering anything.
pub async fn run_enrichment(store: &MatchStore) -> anyhow::Result<()> {
    let upcoming = store.find_upcoming_scheduled(Game::LeagueOfLegends).await?;
    let missing: Vec<_> = upcoming
        .into_iter()
        .filter(|m| m.kc_stats.is_none() || m.ranking_data.is_none())
        .collect();
    if missing.is_empty() {
        info!("All upcoming matches already enriched");
        return Ok(());
    }

    let fetcher = PageFetcher::launch().await?;
    if let Err(e) = fetcher
        .dismiss_consent(leaguepedia_scraper::WIKI_BASE, leaguepedia_scraper::CONSENT_BUTTON)
        .await
    {
        warn!("Consent dismissal failed, continuing anyway: {e}");
    }
    let caches = EnrichmentCaches::new();
    for mut m in missing {
        enrichment::enrich_match(&fetcher, &caches, &mut m).await;
        store.update_enrichment(&m).await?;
    }
    Ok(())
}

pub async fn run_live_result_check(store: &MatchStore) -> anyhow::Result<()> {
    let riot = RiotClient::new();
    live_results::run(store, &riot).await
}

pub async fn run_status_sweep(store: &MatchStore) -> anyhow::Result<()> {
    status_sweep::run(store).await
}

pub async fn run_standings_refresh(store: &MatchStore) -> anyhow::Result<()> {
    stats_refresh::run(store).await
}
