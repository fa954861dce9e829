/// schedule-observer: Karmine Corp match calendar daemon
///
/// Loops:
///   1. Daily 23:00 UTC: discovery (LoL + Valorant + div2 bracket) and
///      enrichment of the new drafts
///   2. Hourly: scheduled → live status sweep
///   3. Every 10 min: live result poll (skipped while a cycle runs)
///   4. Nightly 03:00 UTC: enrichment refresh of upcoming matches
///
/// Run:
///   cargo run --bin schedule-observer

use std::env;
use std::fs::File;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use dotenv::dotenv;
use kc_schedule::scheduler::{seconds_until_hour, SchedulerState};
use kc_schedule::tasks;
use store::{Game, MatchStore};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DISCOVERY_HOUR_UTC: u32 = 23;
const REFRESH_HOUR_UTC: u32 = 3;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== KC Schedule Observer ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("kc_schedule_observer.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of schedule-observer is already running! Exiting.");
            return Ok(());
        }
    };

    let live_poll_secs = env::var("LIVE_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(600);
    let sweep_secs = env::var("STATUS_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3600);

    info!("Live poll interval: {live_poll_secs}s, sweep interval: {sweep_secs}s");

    let db = store::connect().await?;
    let match_store = Arc::new(MatchStore::new(&db));
    match_store.ensure_indexes().await?;

    let state = Arc::new(SchedulerState::new());

    // Daily discovery + enrichment
    {
        let store = Arc::clone(&match_store);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(seconds_until_hour(
                    Utc::now(),
                    DISCOVERY_HOUR_UTC,
                )))
                .await;
                let Some(_guard) = state.begin_discovery() else {
                    warn!("Discovery cycle still running, skipping");
                    continue;
                };
                info!("--- Daily discovery cycle ---");
                for game in [Game::LeagueOfLegends, Game::Valorant] {
                    match tasks::run_discovery(&store, game).await {
                        Ok(count) => info!("{game}: {count} matches stored"),
                        Err(e) => error!("Discovery failed for {game}: {e:#}"),
                    }
                }
                if let Err(e) = tasks::run_enrichment(&store).await {
                    error!("Enrichment backfill failed: {e:#}");
                }
            }
        });
    }

    // Hourly status sweep
    {
        let store = Arc::clone(&match_store);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(sweep_secs)).await;
                let Some(_guard) = state.begin_sweep() else { continue };
                if let Err(e) = tasks::run_status_sweep(&store).await {
                    error!("Status sweep failed: {e:#}");
                }
            }
        });
    }

    // Nightly enrichment refresh
    {
        let store = Arc::clone(&match_store);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(seconds_until_hour(
                    Utc::now(),
                    REFRESH_HOUR_UTC,
                )))
                .await;
                let Some(_guard) = state.begin_refresh() else { continue };
                if let Err(e) = tasks::run_standings_refresh(&store).await {
                    error!("Nightly refresh failed: {e:#}");
                }
            }
        });
    }

    // Live result polling on the main task
    loop {
        sleep(Duration::from_secs(live_poll_secs)).await;
        let Some(_guard) = state.begin_live_check() else {
            warn!("Previous live check still running, skipping cycle");
            continue;
        };
        if let Err(e) = tasks::run_live_result_check(&match_store).await {
            error!("Live result check failed: {e:#}");
        }
    }
}
