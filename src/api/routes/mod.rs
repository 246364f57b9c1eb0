//! Route handlers
//!
//! Handlers organized by surface: pages, machine/user actions, the live
//! event stream, and health.

pub mod actions;
pub mod health;
pub mod machines;
pub mod sse;
pub mod users;
