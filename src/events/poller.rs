//! Polling loop
//!
//! Periodically fetches a fleet snapshot, compares it against the previous
//! one, and broadcasts freshly rendered table fragments through the broker
//! when anything observable changed. Fetching and rendering sit behind
//! traits so the loop can be driven by stubs in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::events::broker::{Broker, Event};
use crate::events::state::{
    detect_machine_changes, detect_user_changes, machine_states, user_states, MachineState,
    UserState,
};
use crate::models::{Machine, User};

/// One consistent view of the fleet at a point in time.
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    pub machines: Vec<Machine>,
    pub users: Vec<User>,
}

/// Source of fleet snapshots.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<FleetSnapshot>;
}

/// Renders a snapshot into the HTML fragments pushed over the event stream.
pub trait SnapshotRenderer: Send + Sync {
    fn render_machines(&self, snapshot: &FleetSnapshot) -> anyhow::Result<String>;
    fn render_users(&self, snapshot: &FleetSnapshot) -> anyhow::Result<String>;
}

/// Drives the fetch/diff/broadcast cycle on a fixed interval.
pub struct Poller {
    broker: Arc<Broker>,
    fetcher: Arc<dyn SnapshotFetcher>,
    renderer: Arc<dyn SnapshotRenderer>,
    interval: Duration,
}

impl Poller {
    pub fn new(
        broker: Arc<Broker>,
        fetcher: Arc<dyn SnapshotFetcher>,
        renderer: Arc<dyn SnapshotRenderer>,
        interval: Duration,
    ) -> Self {
        Self {
            broker,
            fetcher,
            renderer,
            interval,
        }
    }

    /// Runs until the shutdown channel flips to true or its sender drops.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut prev_machines: HashMap<u64, MachineState> = HashMap::new();
        let mut prev_users: HashMap<u64, UserState> = HashMap::new();

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(&mut prev_machines, &mut prev_users).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Poller stopped");
                        return;
                    }
                }
            }
        }
    }

    async fn tick(
        &self,
        prev_machines: &mut HashMap<u64, MachineState>,
        prev_users: &mut HashMap<u64, UserState>,
    ) {
        // Nobody listening, nothing to fetch for.
        if self.broker.client_count() == 0 {
            return;
        }

        let snapshot = match self.fetcher.fetch().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Fleet snapshot fetch failed, keeping previous state");
                return;
            }
        };

        let curr_machines = machine_states(&snapshot.machines);
        let curr_users = user_states(&snapshot.users, &snapshot.machines);

        if detect_machine_changes(&curr_machines, prev_machines) {
            match self.renderer.render_machines(&snapshot) {
                Ok(html) => self.broker.broadcast(Event::new("machinesTable", html)),
                Err(e) => tracing::error!(error = %e, "Failed to render machines table"),
            }
        }

        if detect_user_changes(&curr_users, prev_users) {
            match self.renderer.render_users(&snapshot) {
                Ok(html) => self.broker.broadcast(Event::new("usersTable", html)),
                Err(e) => tracing::error!(error = %e, "Failed to render users table"),
            }
        }

        *prev_machines = curr_machines;
        *prev_users = curr_users;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubFetcher {
        calls: AtomicUsize,
        snapshot: Mutex<FleetSnapshot>,
        fail: AtomicBool,
    }

    impl StubFetcher {
        fn new(snapshot: FleetSnapshot) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                snapshot: Mutex::new(snapshot),
                fail: AtomicBool::new(false),
            }
        }

        fn set_snapshot(&self, snapshot: FleetSnapshot) {
            *self.snapshot.lock().unwrap() = snapshot;
        }
    }

    #[async_trait]
    impl SnapshotFetcher for StubFetcher {
        async fn fetch(&self) -> anyhow::Result<FleetSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("control plane unreachable");
            }
            Ok(self.snapshot.lock().unwrap().clone())
        }
    }

    struct StubRenderer {
        fail: AtomicBool,
    }

    impl StubRenderer {
        fn new() -> Self {
            Self {
                fail: AtomicBool::new(false),
            }
        }
    }

    impl SnapshotRenderer for StubRenderer {
        fn render_machines(&self, snapshot: &FleetSnapshot) -> anyhow::Result<String> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("render failed");
            }
            Ok(format!("machines:{}", snapshot.machines.len()))
        }

        fn render_users(&self, snapshot: &FleetSnapshot) -> anyhow::Result<String> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("render failed");
            }
            Ok(format!("users:{}", snapshot.users.len()))
        }
    }

    fn machine(id: u64, online: bool) -> Machine {
        Machine::new(Node {
            id,
            name: format!("node-{id}"),
            given_name: String::new(),
            user: None,
            ip_addresses: vec![],
            online,
            approved_routes: vec![],
            available_routes: vec![],
            forced_tags: vec![],
            last_seen: None,
            created_at: None,
            expiry: None,
            node_key: String::new(),
        })
    }

    fn poller_parts(
        snapshot: FleetSnapshot,
    ) -> (Arc<Broker>, Arc<StubFetcher>, Arc<StubRenderer>, Poller) {
        let broker = Arc::new(Broker::new(Default::default()));
        let fetcher = Arc::new(StubFetcher::new(snapshot));
        let renderer = Arc::new(StubRenderer::new());
        let poller = Poller::new(
            broker.clone(),
            fetcher.clone(),
            renderer.clone(),
            Duration::from_millis(500),
        );
        (broker, fetcher, renderer, poller)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_tick_skips_fetch_without_clients() {
        let (_, fetcher, _, poller) = poller_parts(FleetSnapshot::default());
        let mut pm = HashMap::new();
        let mut pu = HashMap::new();

        poller.tick(&mut pm, &mut pu).await;
        poller.tick(&mut pm, &mut pu).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_tick_with_machines_broadcasts_both_tables() {
        let snapshot = FleetSnapshot {
            machines: vec![machine(1, true)],
            users: vec![User {
                id: 1,
                name: "alice".to_string(),
                display_name: None,
                created_at: None,
            }],
        };
        let (broker, _, _, poller) = poller_parts(snapshot);
        let mut sub = broker.subscribe().await;
        settle().await;

        let mut pm = HashMap::new();
        let mut pu = HashMap::new();
        poller.tick(&mut pm, &mut pu).await;
        settle().await;

        let first = sub.try_recv().expect("machines event");
        assert_eq!(first.event_type, "machinesTable");
        assert_eq!(first.payload, "machines:1");
        let second = sub.try_recv().expect("users event");
        assert_eq!(second.event_type, "usersTable");

        assert_eq!(pm.len(), 1);
        assert_eq!(pu.len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_broadcasts_nothing() {
        let snapshot = FleetSnapshot {
            machines: vec![machine(1, true)],
            users: vec![],
        };
        let (broker, _, _, poller) = poller_parts(snapshot);
        let mut sub = broker.subscribe().await;
        settle().await;

        let mut pm = HashMap::new();
        let mut pu = HashMap::new();
        poller.tick(&mut pm, &mut pu).await;
        settle().await;
        while sub.try_recv().is_ok() {}

        poller.tick(&mut pm, &mut pu).await;
        settle().await;
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_state_change_broadcasts_again() {
        let snapshot = FleetSnapshot {
            machines: vec![machine(1, false)],
            users: vec![],
        };
        let (broker, fetcher, _, poller) = poller_parts(snapshot);
        let mut sub = broker.subscribe().await;
        settle().await;

        let mut pm = HashMap::new();
        let mut pu = HashMap::new();
        poller.tick(&mut pm, &mut pu).await;
        settle().await;
        while sub.try_recv().is_ok() {}

        fetcher.set_snapshot(FleetSnapshot {
            machines: vec![machine(1, true)],
            users: vec![],
        });
        poller.tick(&mut pm, &mut pu).await;
        settle().await;

        let ev = sub.try_recv().expect("machines event after change");
        assert_eq!(ev.event_type, "machinesTable");
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_state() {
        let snapshot = FleetSnapshot {
            machines: vec![machine(1, true)],
            users: vec![],
        };
        let (broker, fetcher, _, poller) = poller_parts(snapshot);
        let mut sub = broker.subscribe().await;
        settle().await;

        let mut pm = HashMap::new();
        let mut pu = HashMap::new();
        poller.tick(&mut pm, &mut pu).await;
        settle().await;
        while sub.try_recv().is_ok() {}
        let saved = pm.clone();

        fetcher.fail.store(true, Ordering::SeqCst);
        poller.tick(&mut pm, &mut pu).await;
        settle().await;

        assert!(sub.try_recv().is_err());
        assert_eq!(pm, saved);

        // Recovery with the same data still compares against the old maps.
        fetcher.fail.store(false, Ordering::SeqCst);
        poller.tick(&mut pm, &mut pu).await;
        settle().await;
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_render_failure_skips_broadcast_but_advances_state() {
        let snapshot = FleetSnapshot {
            machines: vec![machine(1, true)],
            users: vec![],
        };
        let (broker, _, renderer, poller) = poller_parts(snapshot);
        let mut sub = broker.subscribe().await;
        settle().await;

        renderer.fail.store(true, Ordering::SeqCst);
        let mut pm = HashMap::new();
        let mut pu = HashMap::new();
        poller.tick(&mut pm, &mut pu).await;
        settle().await;

        assert!(sub.try_recv().is_err());
        assert_eq!(pm.len(), 1);

        // Next tick sees no diff, so the failed frame is not retried.
        renderer.fail.store(false, Ordering::SeqCst);
        poller.tick(&mut pm, &mut pu).await;
        settle().await;
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown_signal() {
        let (_, _, _, poller) = poller_parts(FleetSnapshot::default());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(poller.run(rx));
        tx.send(true).expect("receiver alive");

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller should stop")
            .expect("poller task should not panic");
    }
}
