//! Replay log for processed events
//!
//! One record per successfully handled event, keyed by sequence,
//! append-only. The latest persisted sequence is the stream cursor the
//! subscriber resumes from; a handler failure must leave the cursor where it
//! was so the failed event is redelivered.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::event::BriaEvent;
use crate::Result;

/// Persistence of processed events, keyed by sequence
#[async_trait]
pub trait BriaEventRepository: Send + Sync {
    /// Persist a handled event. Re-persisting an already-stored sequence is
    /// benign — redelivery after a partial failure replays earlier events.
    async fn persist_event(&self, event: &BriaEvent) -> Result<()>;

    /// Highest durably processed sequence, `None` on a fresh log
    async fn latest_sequence(&self) -> Result<Option<u64>>;

    /// Fetch a stored event by sequence
    async fn find_by_sequence(&self, sequence: u64) -> Result<Option<BriaEvent>>;
}

/// In-memory [`BriaEventRepository`]
#[derive(Default)]
pub struct MemoryBriaEventRepository {
    events: RwLock<BTreeMap<u64, BriaEvent>>,
}

impl MemoryBriaEventRepository {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// True when nothing has been persisted yet
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl BriaEventRepository for MemoryBriaEventRepository {
    async fn persist_event(&self, event: &BriaEvent) -> Result<()> {
        self.events.write().insert(event.sequence, event.clone());
        Ok(())
    }

    async fn latest_sequence(&self) -> Result<Option<u64>> {
        Ok(self.events.read().keys().next_back().copied())
    }

    async fn find_by_sequence(&self, sequence: u64) -> Result<Option<BriaEvent>> {
        Ok(self.events.read().get(&sequence).cloned())
    }
}
