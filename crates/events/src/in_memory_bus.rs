//! In-memory event bus for tests/dev.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    #[error("event bus lock poisoned")]
    Poisoned,
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Best-effort fan-out
/// - At-least-once acceptable (subscribers must be idempotent)
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use bugtrail_core::{AggregateId, CompanyId};
    use uuid::Uuid;

    use crate::EventEnvelope;

    use super::*;

    fn envelope(company_id: CompanyId, sequence: u64) -> EventEnvelope<String> {
        EventEnvelope::new(
            Uuid::now_v7(),
            company_id,
            AggregateId::new(),
            "ticket",
            sequence,
            format!("payload-{sequence}"),
        )
    }

    #[test]
    fn every_subscriber_sees_every_envelope_in_publish_order() {
        let bus = InMemoryEventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();
        let company_id = CompanyId::new();

        bus.publish(envelope(company_id, 1)).unwrap();
        bus.publish(envelope(company_id, 2)).unwrap();

        for subscription in [&first, &second] {
            let one = subscription.try_recv().unwrap();
            let two = subscription.try_recv().unwrap();
            assert_eq!(one.sequence_number(), 1);
            assert_eq!(two.sequence_number(), 2);
            assert_eq!(one.company_id(), company_id);
            assert_eq!(one.aggregate_type(), "ticket");
            assert!(subscription.try_recv().is_err());
        }
    }

    #[test]
    fn publish_drops_subscribers_that_went_away() {
        let bus = InMemoryEventBus::new();
        let keeper = bus.subscribe();
        drop(bus.subscribe());

        let company_id = CompanyId::new();
        bus.publish(envelope(company_id, 1)).unwrap();
        bus.publish(envelope(company_id, 2)).unwrap();

        assert!(keeper.try_recv().is_ok());
        assert!(keeper.try_recv().is_ok());
    }
}
