//! Transcript retention
//!
//! Finished runs are kept so they can be rendered or fetched again later.
//! Once the store is full the oldest transcript is evicted.

use crate::models::PipelineReport;
use crate::Result;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_TRANSCRIPT_CAPACITY: usize = 1_000;

/// In-memory transcript storage keyed by run id
#[derive(Clone)]
pub struct TranscriptStore {
    records: Arc<RwLock<IndexMap<Uuid, PipelineReport>>>,
    capacity: usize,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TRANSCRIPT_CAPACITY)
    }

    /// Keeps at most `capacity` transcripts (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(IndexMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn record(&self, report: PipelineReport) -> Result<Uuid> {
        let run_id = report.run_id;
        let mut records = self.records.write().await;
        records.insert(run_id, report);

        while records.len() > self.capacity {
            if let Some((evicted, _)) = records.shift_remove_index(0) {
                debug!(run_id = %evicted, "Evicted oldest transcript");
            }
        }

        Ok(run_id)
    }

    pub async fn get(&self, run_id: Uuid) -> Result<Option<PipelineReport>> {
        let records = self.records.read().await;
        Ok(records.get(&run_id).cloned())
    }

    /// All transcripts of a session, oldest first. Ties keep recording order.
    pub async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<PipelineReport>> {
        let records = self.records.read().await;

        let mut items: Vec<PipelineReport> = records
            .values()
            .filter(|report| report.session_id == session_id)
            .cloned()
            .collect();

        items.sort_by_key(|report| report.created_at);

        Ok(items)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PipelineState, SessionContext};

    fn report(session: &SessionContext, question: &str) -> PipelineReport {
        PipelineReport::from_state(session, PipelineState::new(question), None, 1)
    }

    #[test]
    fn test_record_and_get() {
        let store = TranscriptStore::new();
        let session = SessionContext::new();

        let run_id = tokio_test::block_on(store.record(report(&session, "q1"))).unwrap();
        let fetched = tokio_test::block_on(store.get(run_id)).unwrap().unwrap();
        assert_eq!(fetched.question, "q1");

        let missing = tokio_test::block_on(store.get(Uuid::new_v4())).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_list_for_session_is_ordered_and_scoped() {
        let store = TranscriptStore::new();
        let session = SessionContext::new();
        let other = SessionContext::new();

        tokio_test::block_on(async {
            store.record(report(&session, "first")).await.unwrap();
            store.record(report(&other, "elsewhere")).await.unwrap();
            store.record(report(&session, "second")).await.unwrap();
        });

        let listed = tokio_test::block_on(store.list_for_session(session.session_id)).unwrap();
        let questions: Vec<&str> = listed.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["first", "second"]);
        assert_eq!(tokio_test::block_on(store.len()), 3);
    }

    #[test]
    fn test_full_store_evicts_oldest() {
        let store = TranscriptStore::with_capacity(2);
        let session = SessionContext::new();

        let first = tokio_test::block_on(async {
            let first = store.record(report(&session, "first")).await.unwrap();
            store.record(report(&session, "second")).await.unwrap();
            store.record(report(&session, "third")).await.unwrap();
            first
        });

        assert_eq!(tokio_test::block_on(store.len()), 2);
        assert!(tokio_test::block_on(store.get(first)).unwrap().is_none());

        let listed = tokio_test::block_on(store.list_for_session(session.session_id)).unwrap();
        let questions: Vec<&str> = listed.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["second", "third"]);
    }
}
