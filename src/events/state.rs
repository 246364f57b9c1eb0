//! Change detection
//!
//! Minimal per-entity projections of the fields whose changes are worth a
//! live update, plus pure comparison functions over maps of them. The
//! detectors know nothing about transport or rendering; they only answer
//! "does anything observable differ between these two snapshots".

use std::collections::{HashMap, HashSet};

use crate::models::{machine_counts, Machine, User};

/// Tracked state of one machine for change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    pub id: u64,
    pub online: bool,
    pub approved_routes: HashSet<String>,
    pub exit_node_enabled: bool,
    pub tags: HashSet<String>,
}

/// Tracked state of one user for change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
    pub id: u64,
    pub name: String,
    pub machine_count: usize,
}

/// Project a fleet snapshot into machine states keyed by node id.
pub fn machine_states(machines: &[Machine]) -> HashMap<u64, MachineState> {
    machines
        .iter()
        .map(|m| {
            (
                m.id(),
                MachineState {
                    id: m.id(),
                    online: m.online(),
                    approved_routes: m
                        .approved_subnets()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    exit_node_enabled: m.exit_node_status() == "Allowed",
                    tags: m.tags().iter().cloned().collect(),
                },
            )
        })
        .collect()
}

/// Project a fleet snapshot into user states keyed by user id.
pub fn user_states(users: &[User], machines: &[Machine]) -> HashMap<u64, UserState> {
    let counts = machine_counts(machines);
    users
        .iter()
        .map(|u| {
            (
                u.id,
                UserState {
                    id: u.id,
                    name: u.name.clone(),
                    machine_count: counts.get(&u.name).copied().unwrap_or(0),
                },
            )
        })
        .collect()
}

/// True if any machine was added, removed, or changed a tracked field.
pub fn detect_machine_changes(
    current: &HashMap<u64, MachineState>,
    previous: &HashMap<u64, MachineState>,
) -> bool {
    for id in current.keys() {
        if !previous.contains_key(id) {
            tracing::debug!(machine_id = id, "Change detected: new machine");
            return true;
        }
    }

    for id in previous.keys() {
        if !current.contains_key(id) {
            tracing::debug!(machine_id = id, "Change detected: machine removed");
            return true;
        }
    }

    for (id, curr) in current {
        let prev = &previous[id]; // additions already returned above

        if curr.online != prev.online {
            tracing::debug!(machine_id = id, online = curr.online, "Change detected: online flag");
            return true;
        }
        if curr.approved_routes != prev.approved_routes || curr.exit_node_enabled != prev.exit_node_enabled {
            tracing::debug!(machine_id = id, "Change detected: routes");
            return true;
        }
        if curr.tags != prev.tags {
            tracing::debug!(machine_id = id, "Change detected: tags");
            return true;
        }
    }

    false
}

/// True if any user was added, removed, renamed, or changed machine count.
pub fn detect_user_changes(
    current: &HashMap<u64, UserState>,
    previous: &HashMap<u64, UserState>,
) -> bool {
    for id in current.keys() {
        if !previous.contains_key(id) {
            tracing::debug!(user_id = id, "Change detected: new user");
            return true;
        }
    }

    for id in previous.keys() {
        if !current.contains_key(id) {
            tracing::debug!(user_id = id, "Change detected: user removed");
            return true;
        }
    }

    for (id, curr) in current {
        let prev = &previous[id];
        if curr.name != prev.name || curr.machine_count != prev.machine_count {
            tracing::debug!(user_id = id, "Change detected: user fields");
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_state(id: u64, online: bool, routes: &[&str], exit: bool, tags: &[&str]) -> MachineState {
        MachineState {
            id,
            online,
            approved_routes: routes.iter().map(|s| s.to_string()).collect(),
            exit_node_enabled: exit,
            tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn user_state(id: u64, name: &str, count: usize) -> UserState {
        UserState {
            id,
            name: name.to_string(),
            machine_count: count,
        }
    }

    #[test]
    fn test_identical_maps_are_unchanged() {
        let a: HashMap<u64, MachineState> =
            [(1, machine_state(1, true, &["10.0.0.0/24"], false, &["tag:a"]))].into();
        assert!(!detect_machine_changes(&a, &a.clone()));
    }

    #[test]
    fn test_empty_maps_are_unchanged() {
        assert!(!detect_machine_changes(&HashMap::new(), &HashMap::new()));
        assert!(!detect_user_changes(&HashMap::new(), &HashMap::new()));
    }

    #[test]
    fn test_rebuilt_maps_with_reordered_sets_are_unchanged() {
        // Same values, freshly built, set fields inserted in opposite order.
        let a: HashMap<u64, MachineState> =
            [(1, machine_state(1, true, &["10.0.0.0/24", "192.168.0.0/16"], false, &["tag:a", "tag:b"]))].into();
        let b: HashMap<u64, MachineState> =
            [(1, machine_state(1, true, &["192.168.0.0/16", "10.0.0.0/24"], false, &["tag:b", "tag:a"]))].into();
        assert!(!detect_machine_changes(&a, &b));
    }

    #[test]
    fn test_first_tick_with_entities_is_a_change() {
        let current: HashMap<u64, MachineState> = [(1, machine_state(1, false, &[], false, &[]))].into();
        assert!(detect_machine_changes(&current, &HashMap::new()));
    }

    #[test]
    fn test_removal_is_a_change() {
        let previous: HashMap<u64, MachineState> = [(1, machine_state(1, false, &[], false, &[]))].into();
        assert!(detect_machine_changes(&HashMap::new(), &previous));
    }

    #[test]
    fn test_online_flag_flip_is_a_change() {
        let previous: HashMap<u64, MachineState> =
            [(1, machine_state(1, false, &["10.0.0.0/24"], false, &[]))].into();
        let current: HashMap<u64, MachineState> =
            [(1, machine_state(1, true, &["10.0.0.0/24"], false, &[]))].into();
        assert!(detect_machine_changes(&current, &previous));
    }

    #[test]
    fn test_single_route_change_is_a_change() {
        let previous: HashMap<u64, MachineState> =
            [(1, machine_state(1, true, &["10.0.0.0/24"], false, &[]))].into();
        let added: HashMap<u64, MachineState> =
            [(1, machine_state(1, true, &["10.0.0.0/24", "192.168.1.0/24"], false, &[]))].into();
        let removed: HashMap<u64, MachineState> = [(1, machine_state(1, true, &[], false, &[]))].into();
        assert!(detect_machine_changes(&added, &previous));
        assert!(detect_machine_changes(&removed, &previous));
    }

    #[test]
    fn test_exit_node_flag_is_a_change() {
        let previous: HashMap<u64, MachineState> = [(1, machine_state(1, true, &[], false, &[]))].into();
        let current: HashMap<u64, MachineState> = [(1, machine_state(1, true, &[], true, &[]))].into();
        assert!(detect_machine_changes(&current, &previous));
    }

    #[test]
    fn test_tag_change_is_a_change() {
        let previous: HashMap<u64, MachineState> =
            [(1, machine_state(1, true, &[], false, &["tag:a"]))].into();
        let current: HashMap<u64, MachineState> =
            [(1, machine_state(1, true, &[], false, &["tag:a", "tag:b"]))].into();
        assert!(detect_machine_changes(&current, &previous));
    }

    #[test]
    fn test_user_identical_is_unchanged() {
        let a: HashMap<u64, UserState> = [(1, user_state(1, "a", 2))].into();
        assert!(!detect_user_changes(&a, &a.clone()));
    }

    #[test]
    fn test_user_rename_and_count_are_changes() {
        let previous: HashMap<u64, UserState> = [(1, user_state(1, "a", 2))].into();
        let renamed: HashMap<u64, UserState> = [(1, user_state(1, "b", 2))].into();
        let recounted: HashMap<u64, UserState> = [(1, user_state(1, "a", 3))].into();
        assert!(detect_user_changes(&renamed, &previous));
        assert!(detect_user_changes(&recounted, &previous));
    }

    #[test]
    fn test_user_replacement_with_same_size_is_a_change() {
        let previous: HashMap<u64, UserState> = [(1, user_state(1, "a", 0))].into();
        let current: HashMap<u64, UserState> = [(2, user_state(2, "b", 0))].into();
        assert!(detect_user_changes(&current, &previous));
    }
}
