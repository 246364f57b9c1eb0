//! Table fragments
//!
//! The machines and users tables are the unit of live update: each is a
//! complete fragment wrapped in an id-bearing container so the client can
//! swap it in place when a new version arrives on the event stream.

use std::fmt::Write;

use crate::models::{machine_counts, Machine, User};
use crate::render::escape;

/// Machines table fragment, ready for initial render or live swap.
pub fn machines_table(machines: &[Machine]) -> String {
    let mut html = String::new();
    html.push_str(r#"<div id="machines-table">"#);
    html.push_str("<table class=\"fleet-table\"><thead><tr>");
    html.push_str("<th>Machine</th><th>User</th><th>Address</th><th>Status</th><th>Last seen</th><th>Tags</th><th>Routes</th>");
    html.push_str("</tr></thead><tbody>");

    if machines.is_empty() {
        html.push_str(r#"<tr><td colspan="7" class="empty">No machines registered</td></tr>"#);
    }

    for m in machines {
        let _ = write!(
            html,
            concat!(
                r#"<tr id="machine-row-{id}">"#,
                r#"<td><a href="/machines/{id}">{hostname}</a></td>"#,
                r#"<td>{user}</td>"#,
                r#"<td>{ip}</td>"#,
                r#"<td><span class="dot {dot}"></span>{status}</td>"#,
                r#"<td title="{seen_full}">{seen}</td>"#,
                r#"<td>{tags}</td>"#,
                r#"<td>{routes}</td>"#,
                "</tr>"
            ),
            id = m.id(),
            hostname = escape(m.hostname()),
            user = escape(m.user()),
            ip = escape(m.primary_ip()),
            dot = m.status_dot_class(),
            status = m.status_text(),
            seen_full = escape(&m.last_seen_full()),
            seen = escape(&m.last_seen_short()),
            tags = escape(&m.tags_string()),
            routes = route_badges(m),
        );
    }

    html.push_str("</tbody></table></div>");
    html
}

fn route_badges(m: &Machine) -> String {
    let mut badges = String::new();

    let approved = m.approved_subnets();
    if !approved.is_empty() {
        let _ = write!(
            badges,
            r#"<span class="badge badge-subnet" title="{}">Subnets</span>"#,
            escape(&approved.join(", "))
        );
    }
    if !m.advertised_subnets().is_empty() {
        badges.push_str(r#"<span class="badge badge-pending">Subnets pending</span>"#);
    }

    match m.exit_node_status() {
        "Allowed" => badges.push_str(r#"<span class="badge badge-exit">Exit node</span>"#),
        "Awaiting approval" => {
            badges.push_str(r#"<span class="badge badge-pending">Exit node pending</span>"#)
        }
        _ => {}
    }

    badges
}

/// Users table fragment with per-user machine counts.
pub fn users_table(users: &[User], machines: &[Machine]) -> String {
    let counts = machine_counts(machines);

    let mut html = String::new();
    html.push_str(r#"<div id="users-table">"#);
    html.push_str("<table class=\"fleet-table\"><thead><tr>");
    html.push_str("<th>User</th><th>Display name</th><th>Machines</th><th>Created</th><th></th>");
    html.push_str("</tr></thead><tbody>");

    if users.is_empty() {
        html.push_str(r#"<tr><td colspan="5" class="empty">No users</td></tr>"#);
    }

    for u in users {
        let _ = write!(
            html,
            concat!(
                r#"<tr id="user-row-{id}">"#,
                r#"<td>{name}</td>"#,
                r#"<td>{display}</td>"#,
                r#"<td>{count}</td>"#,
                r#"<td>{created}</td>"#,
                r#"<td class="actions">"#,
                r##"<button hx-post="/users/{id}/rename" hx-prompt="New name" hx-target="#alerts">Rename</button>"##,
                r##"<button hx-post="/users/{id}/preauth-keys" hx-target="#alerts">New key</button>"##,
                r##"<button hx-delete="/users/{id}" hx-confirm="Delete user {name}?" hx-target="#alerts">Delete</button>"##,
                "</td></tr>"
            ),
            id = u.id,
            name = escape(&u.name),
            display = escape(u.display()),
            count = counts.get(&u.name).copied().unwrap_or(0),
            created = u.created(),
        );
    }

    html.push_str("</tbody></table></div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, UserRef};

    fn machine(id: u64, name: &str, user: &str, online: bool) -> Machine {
        Machine::new(Node {
            id,
            name: name.to_string(),
            given_name: String::new(),
            user: Some(UserRef {
                id: 1,
                name: user.to_string(),
            }),
            ip_addresses: vec!["100.64.0.1".to_string()],
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

    #[test]
    fn test_machines_table_has_swap_target_and_rows() {
        let html = machines_table(&[machine(7, "web-1", "alice", true)]);
        assert!(html.starts_with(r#"<div id="machines-table">"#));
        assert!(html.contains(r#"id="machine-row-7""#));
        assert!(html.contains("web-1"));
        assert!(html.contains("dot-online"));
    }

    #[test]
    fn test_empty_machines_table_renders_placeholder() {
        let html = machines_table(&[]);
        assert!(html.contains("No machines registered"));
    }

    #[test]
    fn test_machine_names_are_escaped() {
        let html = machines_table(&[machine(1, "<b>evil</b>", "alice", false)]);
        assert!(!html.contains("<b>evil</b>"));
        assert!(html.contains("&lt;b&gt;evil&lt;/b&gt;"));
    }

    #[test]
    fn test_users_table_counts_machines() {
        let users = vec![User {
            id: 3,
            name: "alice".to_string(),
            display_name: None,
            created_at: None,
        }];
        let machines = vec![machine(1, "a", "alice", true), machine(2, "b", "alice", false)];
        let html = users_table(&users, &machines);
        assert!(html.contains(r#"id="user-row-3""#));
        assert!(html.contains("<td>2</td>"));
    }
}
