//! EventBus trait definition

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::PluginEvent;

/// Sequence number for events (monotonically increasing)
pub type EventSeq = u64;

/// Bus for publishing and subscribing to plugin lifecycle events
///
/// Implementations must support:
/// - Publishing events with sequence numbers
/// - Live subscriptions via broadcast channel
/// - Historical replay for late joiners
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event, returns its sequence number
    async fn publish(&self, event: PluginEvent) -> EventSeq;

    /// Subscribe to all events from now (live stream)
    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, PluginEvent)>;

    /// Get all events starting from a sequence number (for replay)
    async fn events_from(&self, seq: EventSeq) -> Vec<(EventSeq, PluginEvent)>;

    /// Current sequence number (high water mark)
    fn current_seq(&self) -> EventSeq;
}
