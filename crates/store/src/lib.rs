//! MongoDB-backed store for matches and casters.
//!
//! The pipeline treats this as a plain document store: find-by-filter,
//! insert-one, update-with-array-filters. A unique index on `matchId` is
//! the last line of defense against duplicate discovery.

pub mod models;
pub mod names;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

pub use models::{
    Caster, ChampionStatsRow, Game, GameStats, KcStats, Match, MatchStatus, Player,
    PlayerStatsRow, RankingRow, SeriesRecord, Team, TeamStats,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique-key violation on insert. Discovery dedup should prevent this;
    /// when it happens anyway the single record is skipped.
    #[error("duplicate matchId")]
    DuplicateKey,
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11_000
    )
}

/// Identity fields used by discovery-time deduplication: the upstream id
/// plus the scheduled date and teams, so near-duplicates can be matched
/// by fixture rather than by id alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchKey {
    pub match_id: String,
    pub date: DateTime<Utc>,
    pub team_names: Vec<String>,
}

pub struct MatchStore {
    matches: Collection<Match>,
    casters: Collection<Caster>,
}

/// Connects using `MONGODB_URI` / `KC_DB_NAME` from the environment.
pub async fn connect() -> anyhow::Result<Database> {
    let uri = std::env::var("MONGODB_URI").context("MONGODB_URI must be set")?;
    let db_name = std::env::var("KC_DB_NAME").unwrap_or_else(|_| "kcschedule".to_string());

    let client = Client::with_uri_str(&uri)
        .await
        .context("failed to connect to MongoDB")?;
    let db = client.database(&db_name);
    info!("Connected to database {db_name}");
    Ok(db)
}

impl MatchStore {
    pub fn new(db: &Database) -> Self {
        Self {
            matches: db.collection("matches"),
            casters: db.collection("casters"),
        }
    }

    /// Creates the unique `matchId` index. Idempotent; called at startup.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "matchId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.matches.create_index(index).await?;
        Ok(())
    }

    /// Identity keys of all stored future matches for one game, the input
    /// to discovery-time deduplication.
    pub async fn upcoming_match_keys(&self, game: Game) -> Result<Vec<MatchKey>> {
        let filter = doc! {
            "date": { "$gte": bson::DateTime::from_chrono(Utc::now()) },
            "game": game.display_name(),
        };
        let existing: Vec<Match> = self.matches.find(filter).await?.try_collect().await?;
        Ok(existing
            .into_iter()
            .map(|m| MatchKey {
                match_id: m.match_id.clone(),
                date: m.date,
                team_names: m.team_names(),
            })
            .collect())
    }

    /// Inserts one match. Returns `Ok(false)` on a duplicate `matchId`
    /// instead of failing the whole batch.
    pub async fn insert_match(&self, m: &Match) -> Result<bool> {
        match self.matches.insert_one(m).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => {
                debug!("matchId {} already stored, skipping insert", m.match_id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_match_id(&self, match_id: &str) -> Result<Option<Match>> {
        Ok(self.matches.find_one(doc! { "matchId": match_id }).await?)
    }

    /// All matches currently marked live, for the given games.
    pub async fn find_live(&self, games: &[Game]) -> Result<Vec<Match>> {
        let names: Vec<&str> = games.iter().map(|g| g.display_name()).collect();
        let filter = doc! {
            "status": MatchStatus::Live.as_i32(),
            "game": { "$in": names },
        };
        Ok(self.matches.find(filter).await?.try_collect().await?)
    }

    /// Today's still-scheduled matches, candidates for the status sweep.
    pub async fn find_today_scheduled(&self) -> Result<Vec<Match>> {
        let now = Utc::now();
        let start_of_day = now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end_of_day = start_of_day + Duration::days(1);
        let filter = doc! {
            "status": MatchStatus::Scheduled.as_i32(),
            "date": {
                "$gte": bson::DateTime::from_chrono(start_of_day),
                "$lt": bson::DateTime::from_chrono(end_of_day),
            },
        };
        Ok(self.matches.find(filter).await?.try_collect().await?)
    }

    /// Upcoming scheduled matches for one game, oldest first. Used by the
    /// nightly stats refresh.
    pub async fn find_upcoming_scheduled(&self, game: Game) -> Result<Vec<Match>> {
        let filter = doc! {
            "status": MatchStatus::Scheduled.as_i32(),
            "game": game.display_name(),
            "date": { "$gte": bson::DateTime::from_chrono(Utc::now()) },
        };
        Ok(self
            .matches
            .find(filter)
            .sort(doc! { "date": 1 })
            .await?
            .try_collect()
            .await?)
    }

    /// Forward-only status update by document id.
    pub async fn set_status(&self, id: &ObjectId, status: MatchStatus) -> Result<()> {
        self.matches
            .update_one(
                doc! { "_id": id, "status": { "$lt": status.as_i32() } },
                doc! { "$set": { "status": status.as_i32() } },
            )
            .await?;
        Ok(())
    }

    /// Marks a match completed and writes both final scores, matching each
    /// team positionally by name so stored team order is preserved.
    pub async fn set_final_score(
        &self,
        match_id: &str,
        first: (&str, i32),
        second: (&str, i32),
    ) -> Result<()> {
        self.matches
            .update_one(
                doc! { "matchId": match_id },
                doc! { "$set": {
                    "status": MatchStatus::Completed.as_i32(),
                    "teams.$[team1].score": first.1,
                    "teams.$[team2].score": second.1,
                } },
            )
            .array_filters(vec![
                doc! { "team1.name": first.0 },
                doc! { "team2.name": second.0 },
            ])
            .await?;
        Ok(())
    }

    /// Replaces the enrichment payload of one match in a single update.
    pub async fn update_enrichment(&self, m: &Match) -> Result<()> {
        let teams = bson::to_bson(&m.teams).map_err(mongodb::error::Error::from)?;
        let mut set = doc! { "teams": teams };
        if let Some(ranking) = &m.ranking_data {
            set.insert(
                "rankingData",
                bson::to_bson(ranking).map_err(mongodb::error::Error::from)?,
            );
        }
        if let Some(kc) = &m.kc_stats {
            set.insert(
                "kcStats",
                bson::to_bson(kc).map_err(mongodb::error::Error::from)?,
            );
        }
        self.matches
            .update_one(doc! { "matchId": &m.match_id }, doc! { "$set": set })
            .await?;
        Ok(())
    }

    /// Casters covering one league. Read-only; seeded out-of-band.
    pub async fn casters_for_league(&self, league: &str) -> Result<Vec<Caster>> {
        let filter: Document = doc! { "leagues": { "$in": [league] } };
        Ok(self.casters.find(filter).await?.try_collect().await?)
    }
}
