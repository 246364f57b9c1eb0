//! Event Broker
//!
//! Decouples producers of change events from the set of connected SSE
//! clients. A single owning task holds the subscriber registry; subscribe,
//! unsubscribe, and broadcast all arrive as messages on its channels, so a
//! broadcast always fans out to a well-defined snapshot of the registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

/// An event to be fanned out to all connected clients.
///
/// The payload is opaque to the broker; it is produced by the render
/// adapter and only interpreted by the SSE framing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event type tag (e.g. "machinesTable", "usersTable")
    pub event_type: String,
    /// Rendered payload, transmitted verbatim
    pub payload: String,
}

impl Event {
    pub fn new(event_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
        }
    }
}

/// Identifies a subscriber within a broker instance.
pub type SubscriberId = u64;

/// Configuration for the event broker
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Capacity of each subscriber's receive queue
    pub subscriber_queue_capacity: usize,
    /// Capacity of the broadcast intake queue
    pub broadcast_queue_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 5,
            broadcast_queue_capacity: 10,
        }
    }
}

enum ControlMsg {
    Subscribe {
        reply: oneshot::Sender<(SubscriberId, mpsc::Receiver<Event>)>,
    },
    Unsubscribe(SubscriberId),
    Close,
}

/// Handle for receiving broadcast events.
///
/// Owned by exactly one transport task. Dropping the handle unregisters it
/// from the broker, so a vanished client cannot leak a registry slot.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Event>,
    control_tx: mpsc::UnboundedSender<ControlMsg>,
}

impl Subscription {
    /// The identity of this subscriber within its broker.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Receive the next event. Returns `None` once the subscriber has been
    /// unregistered or the broker closed and the queue drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for callers that poll.
    pub fn try_recv(&mut self) -> Result<Event, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Idempotent at the actor; harmless after explicit unsubscribe.
        let _ = self.control_tx.send(ControlMsg::Unsubscribe(self.id));
    }
}

/// Manages SSE subscriber registration and event fan-out.
///
/// All operations are non-blocking for the caller: a full intake queue
/// drops the event, a full subscriber queue drops the event for that
/// subscriber only. After [`Broker::close`] every operation is a safe no-op.
pub struct Broker {
    control_tx: mpsc::UnboundedSender<ControlMsg>,
    intake_tx: mpsc::Sender<Event>,
    client_count: Arc<AtomicUsize>,
}

impl Broker {
    /// Create a broker and spawn its owning task.
    pub fn new(config: BrokerConfig) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (intake_tx, intake_rx) = mpsc::channel(config.broadcast_queue_capacity.max(1));
        let client_count = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_registry(
            control_rx,
            intake_rx,
            Arc::clone(&client_count),
            config.subscriber_queue_capacity.max(1),
        ));

        Self {
            control_tx,
            intake_tx,
            client_count,
        }
    }

    /// Register a new subscriber. Never fails: if the broker has been
    /// closed, the returned subscription's queue is already closed and
    /// receives nothing.
    pub async fn subscribe(&self) -> Subscription {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .control_tx
            .send(ControlMsg::Subscribe { reply: reply_tx })
            .is_ok()
        {
            if let Ok((id, rx)) = reply_rx.await {
                return Subscription {
                    id,
                    rx,
                    control_tx: self.control_tx.clone(),
                };
            }
        }

        // Broker closed: hand back a subscription whose sender side is
        // already gone, so recv() observes termination immediately.
        let (_, rx) = mpsc::channel(1);
        Subscription {
            id: 0,
            rx,
            control_tx: self.control_tx.clone(),
        }
    }

    /// Remove a subscriber and close its queue. Idempotent: unknown or
    /// already-removed ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let _ = self.control_tx.send(ControlMsg::Unsubscribe(id));
    }

    /// Offer an event to every currently registered subscriber.
    ///
    /// Never blocks: if the intake queue is full the event is dropped
    /// entirely, and the next broadcast carries full current state anyway.
    pub fn broadcast(&self, event: Event) {
        if let Err(e) = self.intake_tx.try_send(event) {
            match e {
                mpsc::error::TrySendError::Full(event) => {
                    tracing::warn!(event_type = %event.event_type, "Broadcast intake full, dropping event");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::debug!("Broadcast after broker close ignored");
                }
            }
        }
    }

    /// Number of currently registered subscribers.
    ///
    /// The owning task is the only writer, so this is a consistent snapshot
    /// of the registry size.
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Acquire)
    }

    /// Shut the broker down permanently: unregisters and closes every
    /// subscriber queue. Subsequent subscribe/broadcast calls are no-ops.
    pub fn close(&self) {
        let _ = self.control_tx.send(ControlMsg::Close);
    }
}

/// The broker's owning task: sole reader and writer of the registry.
async fn run_registry(
    mut control_rx: mpsc::UnboundedReceiver<ControlMsg>,
    mut intake_rx: mpsc::Receiver<Event>,
    client_count: Arc<AtomicUsize>,
    subscriber_queue_capacity: usize,
) {
    let mut clients: HashMap<SubscriberId, mpsc::Sender<Event>> = HashMap::new();
    let mut next_id: SubscriberId = 1;

    loop {
        tokio::select! {
            msg = control_rx.recv() => {
                let Some(msg) = msg else { break };
                match msg {
                    ControlMsg::Subscribe { reply } => {
                        let (tx, rx) = mpsc::channel(subscriber_queue_capacity);
                        let id = next_id;
                        next_id += 1;
                        // A dropped reply means the subscriber gave up;
                        // don't register a queue nobody will drain.
                        if reply.send((id, rx)).is_ok() {
                            clients.insert(id, tx);
                            client_count.store(clients.len(), Ordering::Release);
                            tracing::debug!(subscriber_id = id, total = clients.len(), "SSE client subscribed");
                        }
                    }
                    ControlMsg::Unsubscribe(id) => {
                        if clients.remove(&id).is_some() {
                            client_count.store(clients.len(), Ordering::Release);
                            tracing::debug!(subscriber_id = id, total = clients.len(), "SSE client unsubscribed");
                        }
                    }
                    ControlMsg::Close => break,
                }
            }
            event = intake_rx.recv() => {
                let Some(event) = event else { break };
                for (id, tx) in &clients {
                    // Slow subscriber: drop for this one only.
                    if tx.try_send(event.clone()).is_err() {
                        tracing::trace!(subscriber_id = id, event_type = %event.event_type, "Subscriber queue full, dropping event");
                    }
                }
            }
        }
    }

    // Dropping the senders closes every subscriber queue.
    clients.clear();
    client_count.store(0, Ordering::Release);
    tracing::debug!("Event broker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // Let the broker task drain its channels.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let broker = Broker::new(BrokerConfig::default());

        let mut sub1 = broker.subscribe().await;
        let mut sub2 = broker.subscribe().await;
        assert_eq!(broker.client_count(), 2);

        broker.broadcast(Event::new("x", "p"));
        settle().await;

        assert_eq!(sub1.try_recv().unwrap(), Event::new("x", "p"));
        assert_eq!(sub2.try_recv().unwrap(), Event::new("x", "p"));
    }

    #[tokio::test]
    async fn test_broadcast_with_no_subscribers_is_not_retroactive() {
        let broker = Broker::new(BrokerConfig::default());

        for i in 0..10 {
            broker.broadcast(Event::new("x", format!("p{}", i)));
        }
        settle().await;

        let mut late = broker.subscribe().await;
        broker.broadcast(Event::new("x", "fresh"));
        settle().await;

        // Only the event broadcast after subscribing arrives.
        assert_eq!(late.try_recv().unwrap(), Event::new("x", "fresh"));
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_subscriber_queue_drops_without_blocking_others() {
        let config = BrokerConfig {
            subscriber_queue_capacity: 5,
            broadcast_queue_capacity: 10,
        };
        let broker = Broker::new(config);

        let mut slow = broker.subscribe().await;
        let mut fast = broker.subscribe().await;

        // Fill the slow queue to capacity, then overflow by one. The fast
        // subscriber drains as we go, so only the slow queue ever fills.
        let mut fast_got = 0;
        for i in 0..6 {
            broker.broadcast(Event::new("x", format!("p{}", i)));
            settle().await;
            if fast.try_recv().is_ok() {
                fast_got += 1;
            }
        }

        // The slow one keeps exactly its queue capacity; the overflow event
        // was dropped for it alone.
        let mut slow_got = Vec::new();
        while let Ok(event) = slow.try_recv() {
            slow_got.push(event.payload);
        }

        assert_eq!(fast_got, 6, "full peer queue must not affect delivery");
        assert_eq!(slow_got, vec!["p0", "p1", "p2", "p3", "p4"]);
        assert_eq!(broker.client_count(), 2, "slow subscriber stays connected");
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_closes_queue() {
        let broker = Broker::new(BrokerConfig::default());

        let mut sub = broker.subscribe().await;
        let id = sub.id();

        broker.unsubscribe(id);
        broker.unsubscribe(id); // no-op
        settle().await;

        assert_eq!(broker.client_count(), 0);
        assert!(sub.recv().await.is_none(), "closed queue observes termination");
    }

    #[tokio::test]
    async fn test_drop_unregisters_subscriber() {
        let broker = Broker::new(BrokerConfig::default());

        let sub = broker.subscribe().await;
        assert_eq!(broker.client_count(), 1);

        drop(sub);
        settle().await;
        assert_eq!(broker.client_count(), 0);
    }

    #[tokio::test]
    async fn test_close_terminates_subscribers_and_later_calls_are_noops() {
        let broker = Broker::new(BrokerConfig::default());

        let mut sub = broker.subscribe().await;
        broker.close();
        settle().await;

        assert!(sub.recv().await.is_none());
        assert_eq!(broker.client_count(), 0);

        // Post-close: subscribe returns an inert handle, broadcast is a no-op.
        let mut dead = broker.subscribe().await;
        broker.broadcast(Event::new("x", "p"));
        settle().await;
        assert!(dead.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_snapshot_excludes_unsubscribed() {
        let broker = Broker::new(BrokerConfig::default());

        let mut kept = broker.subscribe().await;
        let gone = broker.subscribe().await;
        let gone_id = gone.id();
        broker.unsubscribe(gone_id);
        settle().await;

        broker.broadcast(Event::new("x", "p"));
        settle().await;

        assert!(kept.try_recv().is_ok());
        assert_eq!(broker.client_count(), 1);
    }
}
