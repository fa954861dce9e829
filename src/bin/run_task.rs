/// run-task: one-shot trigger for a single pipeline task.
///
/// Usage:
///   cargo run --bin run-task -- discovery lol
///   cargo run --bin run-task -- discovery valorant
///   cargo run --bin run-task -- enrichment
///   cargo run --bin run-task -- live-check
///   cargo run --bin run-task -- status-sweep
///   cargo run --bin run-task -- stats-refresh

use anyhow::{bail, Result};
use dotenv::dotenv;
use kc_schedule::tasks;
use store::{Game, MatchStore};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let db = store::connect().await?;
    let store = MatchStore::new(&db);
    store.ensure_indexes().await?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["discovery", game] => {
            let game = match *game {
                "lol" => Game::LeagueOfLegends,
                "valorant" => Game::Valorant,
                other => bail!("unknown game '{other}', expected lol|valorant"),
            };
            let count = tasks::run_discovery(&store, game).await?;
            info!("{count} matches stored");
        }
        ["enrichment"] => tasks::run_enrichment(&store).await?,
        ["live-check"] => tasks::run_live_result_check(&store).await?,
        ["status-sweep"] => tasks::run_status_sweep(&store).await?,
        ["stats-refresh"] => tasks::run_standings_refresh(&store).await?,
        _ => bail!(
            "usage: run-task <discovery lol|valorant | enrichment | live-check | status-sweep | stats-refresh>"
        ),
    }
    Ok(())
}
