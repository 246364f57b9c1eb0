//! Live update pipeline: broker fan-out, change detection, and the
//! polling loop that feeds them.

pub mod broker;
pub mod poller;
pub mod state;

pub use broker::{Broker, BrokerConfig, Event, Subscription};
pub use poller::{FleetSnapshot, Poller, SnapshotFetcher, SnapshotRenderer};
pub use state::{
    detect_machine_changes, detect_user_changes, machine_states, user_states, MachineState,
    UserState,
};
