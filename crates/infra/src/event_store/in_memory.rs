use std::collections::HashMap;
use std::sync::RwLock;

use bugtrail_core::{AggregateId, CompanyId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    company_id: CompanyId,
    aggregate_id: AggregateId,
}

impl StreamKey {
    /// Derive the single stream a batch targets, rejecting batches that mix
    /// companies, aggregates, or aggregate types.
    fn for_batch(events: &[UncommittedEvent]) -> Result<Self, EventStoreError> {
        let head = &events[0];
        for (idx, event) in events.iter().enumerate() {
            if event.company_id != head.company_id {
                return Err(EventStoreError::CompanyIsolation(format!(
                    "batch contains multiple company_ids (index {idx})"
                )));
            }
            if event.aggregate_id != head.aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if event.aggregate_type != head.aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }
        Ok(Self {
            company_id: head.company_id,
            aggregate_id: head.aggregate_id,
        })
    }
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

fn poisoned() -> EventStoreError {
    EventStoreError::InvalidAppend("lock poisoned".to_string())
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let key = StreamKey::for_batch(&events)?;
        let aggregate_type = events[0].aggregate_type.clone();

        let mut streams = self.streams.write().map_err(|_| poisoned())?;
        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // A stream never changes aggregate type once its first event lands.
        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        // Validation is done; from here the whole batch lands as a unit.
        let committed: Vec<StoredEvent> = events
            .into_iter()
            .enumerate()
            .map(|(offset, e)| StoredEvent {
                event_id: e.event_id,
                company_id: e.company_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: current + 1 + offset as u64,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            })
            .collect();
        stream.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            company_id,
            aggregate_id,
        };

        let streams = self.streams.read().map_err(|_| poisoned())?;

        Ok(streams.get(&key).cloned().unwrap_or_default())
    }
}
