//! Display-oriented projections of control-plane entities.

pub mod machine;
pub mod user;

pub use machine::{Machine, Node, PeerStatus, UserRef, EXIT_ROUTES};
pub use user::{machine_counts, User};
