//! HTML rendering
//!
//! Server-rendered pages and the table fragments pushed over the event
//! stream. Fragments are built as strings so the same renderer serves both
//! full page loads and live updates.

pub mod pages;
pub mod tables;

use crate::events::{FleetSnapshot, SnapshotRenderer};

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders fleet snapshots into the fragments the live stream carries.
pub struct HtmlRenderer;

impl SnapshotRenderer for HtmlRenderer {
    fn render_machines(&self, snapshot: &FleetSnapshot) -> anyhow::Result<String> {
        Ok(tables::machines_table(&snapshot.machines))
    }

    fn render_users(&self, snapshot: &FleetSnapshot) -> anyhow::Result<String> {
        Ok(tables::users_table(&snapshot.users, &snapshot.machines))
    }
}
