// ── Event subscriptions ──
//
// One broadcast channel per subscribed address plus a firehose channel for
// every event. Subscribing and dropping a subscription never touch the
// connection task; dispatch clones the sender out of the map before sending.

use std::sync::Arc;

use dashmap::DashMap;
use futures_core::Stream;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::address::NetworkAddress;
use crate::protocol::StatusEvent;

const ADDRESS_CHANNEL_CAPACITY: usize = 64;
const FIREHOSE_CHANNEL_CAPACITY: usize = 1024;

pub(crate) struct SubscriberRegistry {
    by_address: DashMap<NetworkAddress, broadcast::Sender<Arc<StatusEvent>>>,
    firehose: broadcast::Sender<Arc<StatusEvent>>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        let (firehose, _) = broadcast::channel(FIREHOSE_CHANNEL_CAPACITY);
        Self {
            by_address: DashMap::new(),
            firehose,
        }
    }

    pub(crate) fn subscribe(&self, address: &NetworkAddress) -> EventSubscription {
        // Dispatch only reclaims channels for addresses that emit.
        self.by_address.retain(|_, sender| sender.receiver_count() > 0);

        let rx = self
            .by_address
            .entry(address.clone())
            .or_insert_with(|| broadcast::channel(ADDRESS_CHANNEL_CAPACITY).0)
            .subscribe();
        EventSubscription {
            address: Some(address.clone()),
            rx,
        }
    }

    pub(crate) fn subscribe_all(&self) -> EventSubscription {
        EventSubscription {
            address: None,
            rx: self.firehose.subscribe(),
        }
    }

    /// Deliver an event. Returns the number of address subscribers reached;
    /// zero means the event was dropped, which is not an error.
    pub(crate) fn dispatch(&self, event: StatusEvent) -> usize {
        let event = Arc::new(event);
        // Ignore send errors -- just means no firehose subscribers right now
        let _ = self.firehose.send(Arc::clone(&event));

        let sender = self.by_address.get(&event.address).map(|s| s.value().clone());
        let Some(sender) = sender else {
            trace!(address = %event.address, "no subscribers for event");
            return 0;
        };

        let address = event.address.clone();
        if let Ok(reached) = sender.send(event) {
            reached
        } else {
            // Every subscriber went away; forget the channel unless someone
            // re-subscribed in the meantime.
            self.by_address
                .remove_if(&address, |_, s| s.receiver_count() == 0);
            trace!(%address, "subscribers gone, event dropped");
            0
        }
    }

    #[cfg(test)]
    pub(crate) fn address_count(&self) -> usize {
        self.by_address.len()
    }
}

/// A live subscription to status events.
///
/// Dropping it unsubscribes.
pub struct EventSubscription {
    address: Option<NetworkAddress>,
    rx: broadcast::Receiver<Arc<StatusEvent>>,
}

impl EventSubscription {
    /// The subscribed address, or `None` for an all-events subscription.
    pub fn address(&self) -> Option<&NetworkAddress> {
        self.address.as_ref()
    }

    /// Wait for the next event. Returns `None` once the client is gone.
    ///
    /// A subscriber that falls behind skips the missed events with a warning
    /// rather than failing.
    pub async fn recv(&mut self) -> Option<Arc<StatusEvent>> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, address = ?self.address, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive; `None` when nothing is pending.
    pub fn try_recv(&mut self) -> Option<Arc<StatusEvent>> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, address = ?self.address, "event subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(mut self) -> impl Stream<Item = Arc<StatusEvent>> + Send {
        async_stream::stream! {
            while let Some(event) = self.recv().await {
                yield event;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event(line: &str) -> StatusEvent {
        StatusEvent::parse(line).unwrap()
    }

    fn addr(text: &str) -> NetworkAddress {
        NetworkAddress::parse(text).unwrap()
    }

    #[test]
    fn event_without_subscribers_is_dropped() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.dispatch(event("lighting on //HOME/254/56/3")), 0);
    }

    #[test]
    fn delivers_to_every_subscriber_of_the_address() {
        let registry = SubscriberRegistry::new();
        let mut first = registry.subscribe(&addr("//HOME/254/56/3"));
        let mut second = registry.subscribe(&addr("//HOME/254/56/3"));
        let mut other = registry.subscribe(&addr("//HOME/254/56/4"));

        assert_eq!(registry.dispatch(event("lighting on //HOME/254/56/3")), 2);

        assert_eq!(first.try_recv().unwrap().action, "on");
        assert_eq!(second.try_recv().unwrap().action, "on");
        assert!(other.try_recv().is_none());
    }

    #[test]
    fn firehose_sees_everything() {
        let registry = SubscriberRegistry::new();
        let mut all = registry.subscribe_all();
        registry.dispatch(event("lighting on //HOME/254/56/3"));
        registry.dispatch(event("lighting off //HOME/254/56/9"));
        assert_eq!(all.try_recv().unwrap().action, "on");
        assert_eq!(all.try_recv().unwrap().action, "off");
        assert!(all.address().is_none());
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let registry = SubscriberRegistry::new();
        let sub = registry.subscribe(&addr("//HOME/254/56/3"));
        assert_eq!(registry.address_count(), 1);
        drop(sub);

        assert_eq!(registry.dispatch(event("lighting on //HOME/254/56/3")), 0);
        assert_eq!(registry.address_count(), 0);
    }

    #[test]
    fn subscribing_reclaims_quiet_abandoned_addresses() {
        let registry = SubscriberRegistry::new();
        for group in 0..100 {
            drop(registry.subscribe(&addr(&format!("//HOME/254/56/{group}"))));
        }
        let kept = registry.subscribe(&addr("//HOME/254/56/200"));
        assert_eq!(registry.address_count(), 1);

        let again = registry.subscribe(&addr("//HOME/254/56/200"));
        assert_eq!(registry.address_count(), 1);
        drop((kept, again));
    }

    #[tokio::test]
    async fn stream_yields_events_in_order() {
        use futures_util::StreamExt;

        let registry = SubscriberRegistry::new();
        let sub = registry.subscribe(&addr("//HOME/254/56/3"));
        registry.dispatch(event("lighting ramp //HOME/254/56/3 10 0"));
        registry.dispatch(event("lighting ramp //HOME/254/56/3 20 0"));

        let levels: Vec<Option<u8>> = sub.into_stream().take(2).map(|e| e.level()).collect().await;
        assert_eq!(levels, vec![Some(10), Some(20)]);
    }
}
