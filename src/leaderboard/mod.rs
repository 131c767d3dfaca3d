use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use crate::constants::SNAPSHOT_LIMIT;
use crate::db::prelude::*;
use crate::util::retry::Backoff;

pub mod validate;

pub use validate::ValidationError;

pub type LeaderboardResult<T> = core::result::Result<T, LeaderboardError>;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Ranking service over an injected [`ScoreStore`].
#[derive(Clone)]
pub struct Leaderboard {
    store: Arc<dyn ScoreStore>,
    backoff: Backoff,
}

impl Leaderboard {
    pub fn new(store: Arc<dyn ScoreStore>, backoff: Backoff) -> Self {
        Self { store, backoff }
    }

    /// Validates and stores a score stamped at `at`. Nothing is written when validation fails.
    #[instrument(skip(self))]
    pub async fn save(
        &self,
        username: &str,
        score: i64,
        at: DateTime<Utc>,
    ) -> LeaderboardResult<ScoreRecord> {
        let submission = validate::submission(username, score)?;
        let record = ScoreRecord::new(submission.username, submission.score, at);

        self.backoff
            .run("insert", || self.store.insert(&record))
            .await?;

        tracing::info!(
            id = %record.id,
            username = %record.username,
            score = record.score,
            "score saved"
        );

        Ok(record)
    }

    /// Rank of `score` in the daily, monthly and yearly partitions containing `at`: the number of
    /// strictly higher stored scores plus one. Equal scores share a rank.
    #[instrument(skip(self))]
    pub async fn rank(&self, score: i64, at: DateTime<Utc>) -> LeaderboardResult<Positions> {
        let score = validate::score(score)?;

        let mut ranks = [0u64; 3];
        for (slot, frame) in ranks.iter_mut().zip(TimeFrame::DATED) {
            let partition = Partition::of(frame, &at);
            let ahead = self
                .backoff
                .run("count", || self.store.count_greater_than(&partition, score))
                .await?;

            *slot = ahead + 1;
        }

        let [daily, monthly, yearly] = ranks;
        Ok(Positions {
            daily,
            monthly,
            yearly,
        })
    }

    /// Best `limit` records of the `frame` partition containing `at`.
    #[instrument(skip(self))]
    pub async fn top(
        &self,
        frame: TimeFrame,
        at: DateTime<Utc>,
        limit: usize,
    ) -> LeaderboardResult<Vec<ScoreRecord>> {
        let partition = Partition::of(frame, &at);
        let records = self
            .backoff
            .run("top_n", || self.store.top_n(&partition, limit))
            .await?;

        tracing::debug!(partition = %partition, count = records.len(), "fetched top scores");
        Ok(records)
    }

    /// Top entries of every frame for the partitions containing `at`.
    #[instrument(skip(self))]
    pub async fn snapshot(&self, at: DateTime<Utc>) -> LeaderboardResult<Snapshot> {
        let mut snapshot = Snapshot::default();
        for frame in TimeFrame::ALL {
            let records = self.top(frame, at, SNAPSHOT_LIMIT).await?;
            *snapshot.slot_mut(frame) = records.into_iter().map(LeaderboardEntry::from).collect();
        }

        Ok(snapshot)
    }
}
