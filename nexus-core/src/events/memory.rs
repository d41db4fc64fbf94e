//! In-memory EventBus implementation
//!
//! MemoryEventBus stores events in a Vec for replay and uses a broadcast
//! channel for live subscribers.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use super::PluginEvent;
use super::bus::{EventBus, EventSeq};

/// In-memory implementation of EventBus
///
/// Thread-safe via RwLock and atomics. Publishing with no live subscribers
/// is not an error.
pub struct MemoryEventBus {
    /// Stored events with sequence numbers
    events: RwLock<Vec<(EventSeq, PluginEvent)>>,
    /// Next sequence number to assign
    next_seq: AtomicU64,
    /// Broadcast channel for live subscribers
    tx: broadcast::Sender<(EventSeq, PluginEvent)>,
}

impl MemoryEventBus {
    /// Create a new MemoryEventBus with the given broadcast channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            events: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(0),
            tx,
        }
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: PluginEvent) -> EventSeq {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        // Store for replay
        self.events.write().await.push((seq, event.clone()));

        // Broadcast to live subscribers (ignore if no receivers)
        let _ = self.tx.send((seq, event));

        seq
    }

    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, PluginEvent)> {
        self.tx.subscribe()
    }

    async fn events_from(&self, seq: EventSeq) -> Vec<(EventSeq, PluginEvent)> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(s, _)| *s >= seq)
            .cloned()
            .collect()
    }

    fn current_seq(&self) -> EventSeq {
        self.next_seq.load(Ordering::SeqCst)
    }
}
