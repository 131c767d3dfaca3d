use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::instrument;

use crate::util::env::{Env, StoreBackend};
use crate::util::retry::Transient;

pub mod memory;
pub mod models;
pub mod redis;

pub mod prelude {
    pub use crate::db::models::{
        LeaderboardEntry, Partition, Positions, ScoreRecord, Snapshot, TimeFrame,
    };
    pub use crate::db::{CountPage, Cursor, ScoreStore, StoreError, StoreResult};
}

use models::{Partition, ScoreRecord};

pub type StoreResult<T> = core::result::Result<T, StoreError>;
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("score store unavailable: {0}")]
    Unavailable(#[source] BackendError),

    #[error("corrupt entry in partition '{partition}': {reason}")]
    Corrupt { partition: String, reason: String },
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Corrupt { .. } => false,
        }
    }
}

/// Opaque continuation token for paginated counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountPage {
    pub count: u64,
    pub next: Option<Cursor>,
}

/// Ordered score storage keyed by time partition.
///
/// Implementations index every record under each of its partitions
/// (see [`ScoreRecord::partitions`]) and keep each partition ordered by
/// [`ScoreRecord::rank_key`].
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Writes `record` under all of its partitions as one logical write. Writing a record whose
    /// id is already stored must leave the store unchanged.
    async fn insert(&self, record: &ScoreRecord) -> StoreResult<()>;

    /// Counts records in `partition` with a score strictly greater than `score`, one page at a
    /// time. `next` is set while more records remain to be examined.
    async fn count_page(
        &self,
        partition: &Partition,
        score: i64,
        cursor: Option<Cursor>,
    ) -> StoreResult<CountPage>;

    /// Up to `limit` records of `partition`, best first.
    async fn top_n(&self, partition: &Partition, limit: usize) -> StoreResult<Vec<ScoreRecord>>;

    /// Exact count across every page of `count_page`.
    #[instrument(skip(self), fields(partition = %partition))]
    async fn count_greater_than(&self, partition: &Partition, score: i64) -> StoreResult<u64> {
        let mut total = 0;
        let mut cursor = None;

        loop {
            let page = self.count_page(partition, score, cursor).await?;
            total += page.count;

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::trace!(total, "aggregated paginated count");
        Ok(total)
    }
}

/// Builds the store selected by the environment.
#[instrument(skip(env), fields(backend = ?env.store_backend))]
pub async fn connect(env: &Env) -> StoreResult<Arc<dyn ScoreStore>> {
    match env.store_backend {
        StoreBackend::Memory => {
            tracing::info!(page_size = env.memory_page_size, "using in-memory score store");
            Ok(Arc::new(memory::MemoryStore::with_page_size(
                env.memory_page_size,
            )))
        }
        StoreBackend::Redis => {
            let store = redis::RedisStore::connect(&env.redis_url).await?;
            Ok(Arc::new(store))
        }
    }
}
