//! Full pages and alert fragments
//!
//! Pages embed the table fragments and wire up the client-side live update:
//! an SSE connection per page, with each named event swapped into its
//! table container. Action responses come back as alert fragments targeted
//! at the alert area so the tables themselves are only ever replaced by the
//! event stream.

use std::fmt::Write;

use crate::models::{Machine, User};
use crate::render::{escape, tables};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f6f7f9; color: #1c1e21; }
nav { background: #1c2733; padding: 0.75rem 1.5rem; }
nav a { color: #dfe6ee; margin-right: 1.5rem; text-decoration: none; font-weight: 500; }
main { max-width: 72rem; margin: 1.5rem auto; padding: 0 1.5rem; }
.fleet-table { width: 100%; border-collapse: collapse; background: #fff; }
.fleet-table th, .fleet-table td { padding: 0.5rem 0.75rem; text-align: left; border-bottom: 1px solid #e3e6ea; }
.dot { display: inline-block; width: 0.6rem; height: 0.6rem; border-radius: 50%; margin-right: 0.4rem; }
.dot-online { background: #2da44e; }
.dot-offline { background: #afb8c1; }
.badge { display: inline-block; padding: 0.1rem 0.5rem; border-radius: 0.75rem; font-size: 0.8rem; margin-right: 0.3rem; background: #ddf4ff; }
.badge-pending { background: #fff8c5; }
.badge-exit { background: #dafbe1; }
.alert { padding: 0.6rem 1rem; border-radius: 0.4rem; margin-bottom: 1rem; }
.alert-success { background: #dafbe1; }
.alert-error { background: #ffebe9; }
.empty { color: #6e7781; text-align: center; }
.actions button { margin-right: 0.3rem; }
dl.detail { display: grid; grid-template-columns: 12rem 1fr; row-gap: 0.4rem; background: #fff; padding: 1rem; }
dl.detail dt { color: #6e7781; }
"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html><html><head>",
            r#"<meta charset="utf-8"><title>{title} - Fleetdeck</title>"#,
            r#"<script src="https://unpkg.com/htmx.org@1.9.12"></script>"#,
            r#"<script src="https://unpkg.com/htmx-ext-sse@2.2.2/sse.js"></script>"#,
            "<style>{style}</style>",
            "</head><body>",
            r#"<nav><a href="/machines">Machines</a><a href="/users">Users</a></nav>"#,
            r#"<main><div id="alerts"></div>{body}</main>"#,
            "</body></html>"
        ),
        title = escape(title),
        style = STYLE,
        body = body,
    )
}

/// Machines overview with the live-updating table.
pub fn machines_page(machines: &[Machine], search: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<h1>Machines</h1>");
    let _ = write!(
        body,
        concat!(
            r#"<form method="get" action="/machines">"#,
            r#"<input type="search" name="search" placeholder="Filter by name, user, IP or tag" value="{}">"#,
            "</form>"
        ),
        escape(search.unwrap_or("")),
    );
    let _ = write!(
        body,
        concat!(
            r#"<div hx-ext="sse" sse-connect="/events" "#,
            r##"sse-swap="machinesTable" hx-target="#machines-table" hx-swap="outerHTML">"##,
            "{}",
            "</div>"
        ),
        tables::machines_table(machines),
    );
    layout("Machines", &body)
}

/// Detail view for one machine with its action controls.
pub fn machine_detail_page(machine: &Machine) -> String {
    let id = machine.id();
    let mut body = String::new();
    let _ = write!(body, "<h1>{}</h1>", escape(machine.hostname()));

    let _ = write!(
        body,
        concat!(
            r#"<dl class="detail">"#,
            "<dt>Status</dt><dd><span class=\"dot {dot}\"></span>{status}</dd>",
            "<dt>User</dt><dd>{user}</dd>",
            "<dt>Address</dt><dd>{ip}</dd>",
            "<dt>OS</dt><dd>{os}</dd>",
            "<dt>Client version</dt><dd>{version}</dd>",
            "<dt>Connection</dt><dd>{conn}</dd>",
            "<dt>Node key</dt><dd>{key}</dd>",
            "<dt>Created</dt><dd>{created}</dd>",
            "<dt>Key expiry</dt><dd>{expiry}</dd>",
            "<dt>Last seen</dt><dd>{seen}</dd>",
            "<dt>Tags</dt><dd>{tags}</dd>",
            "</dl>"
        ),
        dot = machine.status_dot_class(),
        status = machine.status_text(),
        user = escape(machine.user()),
        ip = escape(machine.primary_ip()),
        os = escape(machine.os()),
        version = escape(machine.client_version()),
        conn = machine.connection_type(),
        key = escape(&machine.node_key_short()),
        created = machine.created(),
        expiry = machine.key_expiry(),
        seen = escape(&machine.last_seen_short()),
        tags = escape(&machine.tags_string()),
    );

    body.push_str("<h2>Routes</h2><ul>");
    for route in machine.approved_subnets() {
        let _ = write!(
            body,
            concat!(
                "<li>{route} (approved) ",
                r##"<button hx-post="/machines/{id}/routes/reject" hx-vals='{{"route":"{route}"}}' hx-target="#alerts">Revoke</button>"##,
                "</li>"
            ),
            route = escape(route),
            id = id,
        );
    }
    for route in machine.advertised_subnets() {
        let _ = write!(
            body,
            concat!(
                "<li>{route} (awaiting approval) ",
                r##"<button hx-post="/machines/{id}/routes/approve" hx-vals='{{"route":"{route}"}}' hx-target="#alerts">Approve</button>"##,
                "</li>"
            ),
            route = escape(route),
            id = id,
        );
    }
    if machine.has_exit_node() {
        let _ = write!(body, "<li>Exit node: {}", machine.exit_node_status());
        if machine.exit_node_approved() {
            let _ = write!(
                body,
                r##" <button hx-post="/machines/{id}/exit-node/reject" hx-target="#alerts">Disallow</button>"##,
                id = id,
            );
        } else {
            let _ = write!(
                body,
                r##" <button hx-post="/machines/{id}/exit-node/approve" hx-target="#alerts">Allow</button>"##,
                id = id,
            );
        }
        body.push_str("</li>");
    }
    if !machine.has_subnet_routes() && !machine.has_exit_node() {
        body.push_str("<li>No advertised routes</li>");
    }
    body.push_str("</ul>");

    let _ = write!(
        body,
        concat!(
            r#"<h2>Actions</h2><div class="actions">"#,
            r##"<button hx-post="/machines/{id}/rename" hx-prompt="New name" hx-target="#alerts">Rename</button>"##,
            r##"<button hx-post="/machines/{id}/move" hx-prompt="New owner" hx-target="#alerts">Change owner</button>"##,
            r##"<button hx-post="/machines/{id}/tags" hx-prompt="Comma-separated tags" hx-target="#alerts">Edit tags</button>"##,
            r##"<button hx-post="/machines/{id}/expire" hx-confirm="Expire this machine&#39;s key?" hx-target="#alerts">Expire key</button>"##,
            r##"<button hx-delete="/machines/{id}" hx-confirm="Remove this machine?" hx-target="#alerts">Remove</button>"##,
            "</div>"
        ),
        id = id,
    );

    layout(machine.hostname(), &body)
}

/// Users overview with the live-updating table and a create form.
pub fn users_page(users: &[User], machines: &[Machine]) -> String {
    let mut body = String::new();
    body.push_str("<h1>Users</h1>");
    body.push_str(concat!(
        r##"<form hx-post="/users" hx-target="#alerts">"##,
        r#"<input type="text" name="name" placeholder="New user name" required>"#,
        r#"<button type="submit">Create user</button>"#,
        "</form>"
    ));
    let _ = write!(
        body,
        concat!(
            r#"<div hx-ext="sse" sse-connect="/events" "#,
            r##"sse-swap="usersTable" hx-target="#users-table" hx-swap="outerHTML">"##,
            "{}",
            "</div>"
        ),
        tables::users_table(users, machines),
    );
    layout("Users", &body)
}

/// Success alert fragment for action responses.
pub fn success_alert(message: &str) -> String {
    format!(
        r#"<div class="alert alert-success">{}</div>"#,
        escape(message)
    )
}

/// Error alert fragment for action responses.
pub fn error_alert(message: &str) -> String {
    format!(
        r#"<div class="alert alert-error">{}</div>"#,
        escape(message)
    )
}
