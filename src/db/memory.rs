use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::constants::DEFAULT_MEMORY_PAGE_SIZE;
use crate::db::models::{Partition, RankKey, ScoreRecord};
use crate::db::{CountPage, Cursor, ScoreStore, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    partitions: BTreeMap<Partition, BTreeMap<RankKey, ScoreRecord>>,
    ids: HashSet<Uuid>,
}

/// Process-local store. Counting is paginated the same way a remote index would be, so callers
/// exercise the aggregation path.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_MEMORY_PAGE_SIZE)
    }
}

impl MemoryStore {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            page_size: page_size.max(1),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.ids.len()
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    #[instrument(skip(self, record), fields(id = %record.id, score = record.score))]
    async fn insert(&self, record: &ScoreRecord) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.ids.insert(record.id) {
            tracing::debug!("record already stored");
            return Ok(());
        }

        for partition in record.partitions() {
            inner
                .partitions
                .entry(partition)
                .or_default()
                .insert(record.rank_key(), record.clone());
        }

        Ok(())
    }

    #[instrument(skip(self), fields(partition = %partition))]
    async fn count_page(
        &self,
        partition: &Partition,
        score: i64,
        cursor: Option<Cursor>,
    ) -> StoreResult<CountPage> {
        let inner = self.inner.read().await;
        let Some(slots) = inner.partitions.get(partition) else {
            return Ok(CountPage {
                count: 0,
                next: None,
            });
        };

        // slots are ordered best-first, so the matches form a prefix
        let start = cursor.map(|c| c.0).unwrap_or(0);
        let counted = slots
            .values()
            .skip(start)
            .take(self.page_size)
            .take_while(|record| record.score > score)
            .count();

        let end = start + counted;
        let next = (counted == self.page_size && end < slots.len()).then_some(Cursor(end));

        Ok(CountPage {
            count: counted as u64,
            next,
        })
    }

    #[instrument(skip(self), fields(partition = %partition))]
    async fn top_n(&self, partition: &Partition, limit: usize) -> StoreResult<Vec<ScoreRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .partitions
            .get(partition)
            .map(|slots| slots.values().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::db::models::{TimeFrame, parse_instant};

    fn at(raw: &str) -> DateTime<Utc> {
        parse_instant(raw).unwrap()
    }

    fn daily(raw: &str) -> Partition {
        Partition::of(TimeFrame::Daily, &at(raw))
    }

    async fn seeded(page_size: usize, scores: &[i64], when: &str) -> MemoryStore {
        let store = MemoryStore::with_page_size(page_size);
        for (i, score) in scores.iter().enumerate() {
            let record = ScoreRecord::new(format!("player{i}"), *score, at(when));
            store.insert(&record).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_count_aggregates_pages() {
        let store = seeded(2, &[9, 8, 7, 6, 5, 4, 3], "2024-03-15T10:00:00Z").await;
        let partition = daily("2024-03-15");

        let first = store.count_page(&partition, 4, None).await.unwrap();
        assert_eq!(first.count, 2);
        assert_eq!(first.next, Some(Cursor(2)));

        assert_eq!(store.count_greater_than(&partition, 4).await.unwrap(), 5);
        assert_eq!(store.count_greater_than(&partition, 0).await.unwrap(), 7);
        assert_eq!(store.count_greater_than(&partition, 9).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_exact_on_page_boundary() {
        let store = seeded(3, &[10, 10, 10, 1], "2024-03-15T10:00:00Z").await;
        let partition = daily("2024-03-15");

        assert_eq!(store.count_greater_than(&partition, 5).await.unwrap(), 3);
        assert_eq!(store.count_greater_than(&partition, 10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_partition() {
        let store = MemoryStore::default();
        let partition = daily("2024-03-15");

        assert_eq!(store.count_greater_than(&partition, 1).await.unwrap(), 0);
        assert!(store.top_n(&partition, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_indexes_every_partition() {
        let store = seeded(10, &[42], "2024-03-15T10:00:00Z").await;
        let ts = at("2024-03-15T10:00:00Z");

        for partition in Partition::all_for(&ts) {
            assert_eq!(store.top_n(&partition, 10).await.unwrap().len(), 1);
        }

        // neighbouring buckets stay untouched
        assert!(store.top_n(&daily("2024-03-16"), 10).await.unwrap().is_empty());
        let april = Partition::of(TimeFrame::Monthly, &at("2024-04-01"));
        assert!(store.top_n(&april, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let store = MemoryStore::default();
        let record = ScoreRecord::new("ab c".into(), 42, at("2024-03-15T10:00:00Z"));

        store.insert(&record).await.unwrap();
        store.insert(&record).await.unwrap();

        assert_eq!(store.len().await, 1);
        let partition = daily("2024-03-15");
        assert_eq!(store.count_greater_than(&partition, 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_scores_counted_separately() {
        let store = MemoryStore::default();
        let ts = at("2024-03-15T10:00:00Z");
        for _ in 0..3 {
            let record = ScoreRecord::new("same".into(), 7, ts);
            store.insert(&record).await.unwrap();
        }

        let partition = daily("2024-03-15");
        assert_eq!(store.count_greater_than(&partition, 6).await.unwrap(), 3);
        assert_eq!(store.top_n(&partition, 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_top_n_order_and_stability() {
        let store = MemoryStore::default();
        let partition = daily("2024-03-15");

        for (name, score, when) in [
            ("late", 5, "2024-03-15T12:00:00Z"),
            ("best", 9, "2024-03-15T13:00:00Z"),
            ("early", 5, "2024-03-15T08:00:00Z"),
            ("worst", 1, "2024-03-15T09:00:00Z"),
        ] {
            let record = ScoreRecord::new(name.into(), score, at(when));
            store.insert(&record).await.unwrap();
        }

        let first = store.top_n(&partition, 3).await.unwrap();
        let names: Vec<_> = first.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, ["best", "early", "late"]);

        let second = store.top_n(&partition, 3).await.unwrap();
        assert_eq!(first, second);

        assert!(store.top_n(&partition, 0).await.unwrap().is_empty());
    }
}
