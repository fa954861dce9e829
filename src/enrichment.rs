//! Draft enrichment: rosters, season statistics, standings and the
//! head-to-head snapshot. One browser session serves the whole pass and
//! every resolver result is memoized for the run, so a double round-robin
//! weekend does not re-scrape the same team page per match.
//!
//! A failed resolver degrades its field to null with a warning; the match
//! is still inserted and the other matches continue.

use chrono::Datelike;
use leaguepedia_scraper::{head_to_head, roster, standings, stats, CONSENT_BUTTON, WIKI_BASE};
use page_fetcher::PageFetcher;
use store::names::{correct_lol_name, correct_valorant_name};
use store::{Game, GameStats, Match, MatchStore, Player, RankingRow, Team, TeamStats};
use tracing::{info, warn};

use crate::is_org_team;
use crate::run_cache::RunCache;

pub struct EnrichmentCaches {
    rosters: RunCache<String, Vec<Player>>,
    team_stats: RunCache<String, TeamStats>,
    standings: RunCache<String, Option<Vec<RankingRow>>>,
}

impl EnrichmentCaches {
    pub fn new() -> Self {
        Self {
            rosters: RunCache::new(),
            team_stats: RunCache::new(),
            standings: RunCache::new(),
        }
    }
}

impl Default for EnrichmentCaches {
    fn default() -> Self {
        Self::new()
    }
}

/// Enriches every draft and inserts it. Returns the number of newly
/// stored matches; duplicates are skipped one by one.
pub async fn run(
    store: &MatchStore,
    fetcher: &PageFetcher,
    drafts: Vec<Match>,
) -> anyhow::Result<usize> {
    if drafts.is_empty() {
        return Ok(0);
    }

    if let Err(e) = fetcher.dismiss_consent(WIKI_BASE, CONSENT_BUTTON).await {
        warn!("Consent dismissal failed, continuing anyway: {e}");
    }

    let caches = EnrichmentCaches::new();
    let mut inserted = 0;
    for mut draft in drafts {
        enrich_match(fetcher, &caches, &mut draft).await;
        if store.insert_match(&draft).await? {
            inserted += 1;
        }
    }
    info!("✅ Enrichment pass stored {inserted} new matches");
    Ok(inserted)
}

pub async fn enrich_match(fetcher: &PageFetcher, caches: &EnrichmentCaches, m: &mut Match) {
    match m.game {
        Game::LeagueOfLegends => enrich_lol(fetcher, caches, m).await,
        Game::Valorant => enrich_valorant(fetcher, caches, m).await,
    }
}

async fn enrich_lol(fetcher: &PageFetcher, caches: &EnrichmentCaches, m: &mut Match) {
    if m.teams.len() != 2 {
        warn!("Match {} does not carry two teams, skipping enrichment", m.match_id);
        return;
    }
    let year = m.date.year();

    for team in &mut m.teams {
        let corrected = correct_lol_name(&team.name).to_string();
        if corrected == "TBD" {
            continue;
        }
        match caches
            .rosters
            .get_or_try_insert(corrected.clone(), || {
                roster::resolve_roster(fetcher, &corrected)
            })
            .await
        {
            Ok(players) => team.players = players,
            Err(e) => warn!("Roster resolution failed for {corrected}: {e}"),
        }
    }

    let names: Vec<String> = m
        .teams
        .iter()
        .map(|t| correct_lol_name(&t.name).to_string())
        .collect();
    let org_name = m
        .teams
        .iter()
        .find(|t| is_org_team(&t.name))
        .map(|t| correct_lol_name(&t.name).to_string());
    let opponent_name = m
        .teams
        .iter()
        .find(|t| !is_org_team(&t.name))
        .map(|t| correct_lol_name(&t.name).to_string());

    let league = standings::League::from_name(&m.league);
    let standings_key = league
        .and_then(|l| standings::split_for_date(l, m.date))
        .unwrap_or_else(|| m.league.clone());

    let (first_stats, second_stats, ranking, kc_stats) = tokio::join!(
        caches.team_stats.get_or_try_insert(names[0].clone(), || {
            stats::resolve_team_stats(fetcher, &names[0], year)
        }),
        caches.team_stats.get_or_try_insert(names[1].clone(), || {
            stats::resolve_team_stats(fetcher, &names[1], year)
        }),
        caches.standings.get_or_try_insert(standings_key, || async {
            standings::resolve_standings(fetcher, &m.league, &m.match_type, m.date)
                .await
                .map(|outcome| outcome.ranking_data)
        }),
        async {
            let org = org_name.as_deref()?;
            match head_to_head::resolve_head_to_head(fetcher, org, opponent_name.as_deref(), year)
                .await
            {
                Ok(stats) => Some(stats),
                Err(e) => {
                    warn!("Head-to-head resolution failed for {org}: {e}");
                    None
                }
            }
        },
    );

    match first_stats {
        Ok(stats) => apply_team_stats(&mut m.teams[0], &stats),
        Err(e) => warn!("Stats resolution failed for {}: {e}", names[0]),
    }
    match second_stats {
        Ok(stats) => apply_team_stats(&mut m.teams[1], &stats),
        Err(e) => warn!("Stats resolution failed for {}: {e}", names[1]),
    }
    match ranking {
        Ok(ranking) => m.ranking_data = ranking,
        Err(e) => warn!("Standings resolution failed for {}: {e}", m.league),
    }
    m.kc_stats = kc_stats;
}

/// Valorant carries rosters only; the statistics and standings sources
/// are League-specific.
async fn enrich_valorant(fetcher: &PageFetcher, caches: &EnrichmentCaches, m: &mut Match) {
    for team in &mut m.teams {
        let corrected = correct_valorant_name(&team.name).to_string();
        if corrected == "TBD" {
            continue;
        }
        match caches
            .rosters
            .get_or_try_insert(corrected.clone(), || {
                liquipedia_scraper::resolve_roster(fetcher, &corrected)
            })
            .await
        {
            Ok(players) => team.players = players,
            Err(e) => warn!("Roster resolution failed for {corrected}: {e}"),
        }
    }
}

/// Distributes one resolver result onto a team document: champion table
/// on the team, player rows matched onto the roster by name.
pub fn apply_team_stats(team: &mut Team, stats: &TeamStats) {
    if !stats.champion_table_data.is_empty() {
        team.stats = Some(GameStats::LolChampions(stats.champion_table_data.clone()));
    }
    team.number_of_champions_played = Some(stats.number_of_champions_played);
    for player in &mut team.players {
        player.stats = stats
            .player_table_data
            .iter()
            .find(|row| row.name == player.name)
            .cloned();
    }
}
