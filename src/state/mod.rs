//! state
//!
//! Serializable snapshots of navigation state.
//!
//! # Format
//!
//! A [`SavedNavigation`] mirrors the live tree: the root context's
//! containers, each a list of open instructions, each carrying the saved
//! state of its own nested containers. The presentation layer is saved
//! alongside the root.
//!
//! ```json
//! {
//!   "root": {
//!     "containers": [
//!       { "key": "main", "entries": [ { "direction": "push", "key": {...}, "instruction_id": "...", "child_state": null } ] }
//!     ],
//!     "active": "main"
//!   },
//!   "presented": { "key": "presented", "entries": [] }
//! }
//! ```
//!
//! Pending results, result channels and flows are runtime-only and are
//! never saved.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::instruction::OpenInstruction;
use crate::core::types::{ContainerKey, InstructionId};

/// Errors from encoding or decoding saved state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to encode navigation state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode navigation state: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One saved backstack entry and its nested state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEntry {
    #[serde(flatten)]
    pub instruction: OpenInstruction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_state: Option<SavedManager>,
}

/// A saved container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedContainer {
    pub key: ContainerKey,
    #[serde(default)]
    pub entries: Vec<SavedEntry>,
}

impl SavedContainer {
    /// An empty saved container.
    pub fn empty(key: ContainerKey) -> Self {
        Self {
            key,
            entries: Vec::new(),
        }
    }
}

/// A saved container manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedManager {
    #[serde(default)]
    pub containers: Vec<SavedContainer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<ContainerKey>,
}

/// The whole navigation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedNavigation {
    pub root: SavedManager,
    #[serde(default = "presented_default")]
    pub presented: SavedContainer,
}

fn presented_default() -> SavedContainer {
    SavedContainer::empty(ContainerKey::presentation())
}

impl Default for SavedNavigation {
    fn default() -> Self {
        Self {
            root: SavedManager::default(),
            presented: presented_default(),
        }
    }
}

impl SavedNavigation {
    /// Every instruction id in the tree, depth first.
    pub fn instruction_ids(&self) -> Vec<InstructionId> {
        let mut ids = Vec::new();
        collect_manager_ids(&self.root, &mut ids);
        collect_container_ids(&self.presented, &mut ids);
        ids
    }

    /// Total number of saved destinations.
    pub fn len(&self) -> usize {
        self.instruction_ids().len()
    }

    /// Whether nothing is saved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn collect_manager_ids(manager: &SavedManager, ids: &mut Vec<InstructionId>) {
    for container in &manager.containers {
        collect_container_ids(container, ids);
    }
}

fn collect_container_ids(container: &SavedContainer, ids: &mut Vec<InstructionId>) {
    for entry in &container.entries {
        ids.push(entry.instruction.id());
        if let Some(child) = &entry.child_state {
            collect_manager_ids(child, ids);
        }
    }
}

/// Encode saved state as pretty JSON.
///
/// # Errors
///
/// Returns `StateError::Encode` if a key's parameters fail to serialize.
pub fn to_json(saved: &SavedNavigation) -> Result<String, StateError> {
    serde_json::to_string_pretty(saved).map_err(StateError::Encode)
}

/// Decode saved state from JSON.
///
/// # Errors
///
/// Returns `StateError::Decode` on malformed input.
pub fn from_json(json: &str) -> Result<SavedNavigation, StateError> {
    serde_json::from_str(json).map_err(StateError::Decode)
}

/// Render saved state as an indented tree, one destination per line.
///
/// ```text
/// root
///   [main] *
///     - demo.Home #1a2b3c4d
///     - demo.Tabs #5e6f7a8b
///       [tab-a] *
///         - demo.Feed #9c0d1e2f
/// presented
///   - demo.Dialog #3a4b5c6d
/// ```
pub fn render_tree(saved: &SavedNavigation) -> String {
    let mut out = String::from("root\n");
    render_manager(&saved.root, 1, &mut out);
    out.push_str("presented\n");
    if saved.presented.entries.is_empty() {
        out.push_str("  (empty)\n");
    }
    render_entries(&saved.presented.entries, 1, &mut out);
    out
}

fn render_manager(manager: &SavedManager, depth: usize, out: &mut String) {
    for container in &manager.containers {
        let marker = if manager.active.as_ref() == Some(&container.key) {
            " *"
        } else {
            ""
        };
        let _ = writeln!(out, "{}[{}]{}", indent(depth), container.key, marker);
        render_entries(&container.entries, depth + 1, out);
    }
}

fn render_entries(entries: &[SavedEntry], depth: usize, out: &mut String) {
    for entry in entries {
        let _ = writeln!(
            out,
            "{}- {} #{}",
            indent(depth),
            entry.instruction.key(),
            entry.instruction.id().short()
        );
        if let Some(child) = &entry.child_state {
            render_manager(child, depth + 1, out);
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capabilities::Capability;
    use crate::core::instruction::Direction;
    use crate::core::types::NavigationKey;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Page {
        n: u32,
    }

    impl NavigationKey for Page {
        const KEY_TYPE: &'static str = "test.Page";
        const CAPABILITIES: &'static [Capability] = &[Capability::Push, Capability::Present];
    }

    fn entry(n: u32, child_state: Option<SavedManager>) -> SavedEntry {
        SavedEntry {
            instruction: OpenInstruction::new(Direction::Push, &Page { n }).unwrap(),
            child_state,
        }
    }

    fn sample() -> SavedNavigation {
        let nested = SavedManager {
            containers: vec![SavedContainer {
                key: ContainerKey::new("tab").unwrap(),
                entries: vec![entry(3, None)],
            }],
            active: Some(ContainerKey::new("tab").unwrap()),
        };
        SavedNavigation {
            root: SavedManager {
                containers: vec![SavedContainer {
                    key: ContainerKey::new("main").unwrap(),
                    entries: vec![entry(1, None), entry(2, Some(nested))],
                }],
                active: Some(ContainerKey::new("main").unwrap()),
            },
            presented: presented_default(),
        }
    }

    mod json {
        use super::*;

        #[test]
        fn survives_encoding() {
            let saved = sample();
            let decoded = from_json(&to_json(&saved).unwrap()).unwrap();
            assert_eq!(decoded, saved);
        }

        #[test]
        fn entry_fields_are_flattened() {
            let json: serde_json::Value =
                serde_json::from_str(&to_json(&sample()).unwrap()).unwrap();
            let first = &json["root"]["containers"][0]["entries"][0];
            assert_eq!(first["direction"], "push");
            assert!(first.get("instruction").is_none());
            assert!(first.get("child_state").is_none());
        }

        #[test]
        fn presented_defaults_when_absent() {
            let saved = from_json(r#"{"root": {"containers": []}}"#).unwrap();
            assert!(saved.presented.key.is_presentation());
            assert!(saved.is_empty());
        }

        #[test]
        fn malformed_input_is_decode_error() {
            assert!(matches!(from_json("{"), Err(StateError::Decode(_))));
        }
    }

    mod tree {
        use super::*;

        #[test]
        fn ids_are_depth_first() {
            let saved = sample();
            let ids = saved.instruction_ids();
            assert_eq!(ids.len(), 3);
            let main = &saved.root.containers[0];
            assert_eq!(ids[0], main.entries[0].instruction.id());
            assert_eq!(ids[1], main.entries[1].instruction.id());
        }

        #[test]
        fn render_marks_active_and_nests() {
            let rendered = render_tree(&sample());
            let lines: Vec<&str> = rendered.lines().collect();
            assert_eq!(lines[0], "root");
            assert_eq!(lines[1], "  [main] *");
            assert!(lines[2].starts_with("    - test.Page"));
            assert_eq!(lines[4], "      [tab] *");
            assert!(lines[5].starts_with("        - test.Page"));
            assert_eq!(lines[6], "presented");
            assert_eq!(lines[7], "  (empty)");
        }
    }
}
