use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::instrument;

use crate::constants::REDIS_KEY_PREFIX;
use crate::db::models::{Partition, ScoreRecord};
use crate::db::{CountPage, Cursor, ScoreStore, StoreError, StoreResult};

/// Sorted-set backed store: one `ZSET` per partition, scored by the record's score.
///
/// Redis orders equal scores by member, and `ZREVRANGE` walks them in reverse lexical order, so
/// each member starts with a fixed-width prefix that sorts the earliest submission (then the
/// lowest id) last lexically. The JSON record follows the `|` separator.
///
/// $: `redis-server --port 6379 --appendonly yes`
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

const MEMBER_SEPARATOR: char = '|';

impl RedisStore {
    #[instrument(skip(redis_url))]
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        tracing::info!("connecting to redis server");

        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        Ok(Self { manager })
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(Box::new(e))
    }
}

pub fn partition_key(partition: &Partition) -> String {
    format!(
        "{}:{}:{}",
        REDIS_KEY_PREFIX,
        partition.frame.as_str(),
        partition.value
    )
}

pub fn encode_member(record: &ScoreRecord) -> StoreResult<String> {
    let micros = record.recorded_at.timestamp_micros() as i128;
    let inverted_ts = (i64::MAX as i128 - micros) as u64;
    let inverted_id = !record.id.as_u128();

    let body = serde_json::to_string(record).map_err(|e| StoreError::Corrupt {
        partition: String::from("<encode>"),
        reason: e.to_string(),
    })?;

    Ok(format!(
        "{inverted_ts:020}{inverted_id:032x}{MEMBER_SEPARATOR}{body}"
    ))
}

pub fn decode_member(partition: &str, member: &str) -> StoreResult<ScoreRecord> {
    let corrupt = |reason: String| StoreError::Corrupt {
        partition: partition.to_owned(),
        reason,
    };

    let (_, body) = member
        .split_once(MEMBER_SEPARATOR)
        .ok_or_else(|| corrupt(format!("missing separator in member '{member}'")))?;

    serde_json::from_str(body).map_err(|e| corrupt(e.to_string()))
}

#[async_trait]
impl ScoreStore for RedisStore {
    #[instrument(skip(self, record), fields(id = %record.id, score = record.score))]
    async fn insert(&self, record: &ScoreRecord) -> StoreResult<()> {
        let mut conn = self.manager.clone();
        let member = encode_member(record)?;

        // every partition lands in one MULTI/EXEC; re-adding the same member is a no-op
        let mut pipe = redis::pipe();
        pipe.atomic();
        for partition in record.partitions() {
            pipe.zadd(partition_key(&partition), &member, record.score)
                .ignore();
        }

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// `ZCOUNT` is exact in one round trip, so there is never a second page.
    #[instrument(skip(self), fields(partition = %partition))]
    async fn count_page(
        &self,
        partition: &Partition,
        score: i64,
        _cursor: Option<Cursor>,
    ) -> StoreResult<CountPage> {
        let mut conn = self.manager.clone();
        let count: u64 = conn
            .zcount(partition_key(partition), format!("({score}"), "+inf")
            .await?;

        Ok(CountPage { count, next: None })
    }

    #[instrument(skip(self), fields(partition = %partition))]
    async fn top_n(&self, partition: &Partition, limit: usize) -> StoreResult<Vec<ScoreRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let key = partition_key(partition);
        let mut conn = self.manager.clone();
        let members: Vec<String> = conn.zrevrange(&key, 0, limit as isize - 1).await?;

        members
            .iter()
            .map(|member| decode_member(&key, member))
            .collect()
    }
}
