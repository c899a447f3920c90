//! core::backstack
//!
//! The ordered history of open instructions within one container.
//!
//! # Invariants
//!
//! - Entries are ordered oldest first; the last entry is the active one
//! - Instruction ids are unique (enforced on every construction path,
//!   including deserialization)
//! - An empty backstack is valid
//! - Backstacks are values: every operation returns a new backstack
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use wayfinder::core::backstack::Backstack;
//! use wayfinder::core::capabilities::Capability;
//! use wayfinder::core::instruction::{Direction, OpenInstruction};
//! use wayfinder::core::types::NavigationKey;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Page(u32);
//!
//! impl NavigationKey for Page {
//!     const KEY_TYPE: &'static str = "demo.Page";
//!     const CAPABILITIES: &'static [Capability] = &[Capability::Push];
//! }
//!
//! let first = OpenInstruction::new(Direction::Push, &Page(1)).unwrap();
//! let second = OpenInstruction::new(Direction::Push, &Page(2)).unwrap();
//!
//! let backstack = Backstack::new().push(first.clone()).unwrap();
//! let backstack = backstack.push(second.clone()).unwrap();
//! assert_eq!(backstack.active().map(|i| i.id()), Some(second.id()));
//!
//! let backstack = backstack.close(second.id());
//! assert_eq!(backstack.active().map(|i| i.id()), Some(first.id()));
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::errors::NavigationError;
use super::instruction::OpenInstruction;
use super::types::InstructionId;

/// An immutable, ordered sequence of open instructions.
///
/// Two backstacks are equal when they hold the same ordered
/// `(instruction id, key)` pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<OpenInstruction>", into = "Vec<OpenInstruction>")]
pub struct Backstack {
    entries: Vec<OpenInstruction>,
}

impl Backstack {
    /// Create an empty backstack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backstack from instructions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateInstructionId` if two instructions share an id.
    pub fn from_instructions(
        instructions: impl IntoIterator<Item = OpenInstruction>,
    ) -> Result<Self, NavigationError> {
        let entries: Vec<OpenInstruction> = instructions.into_iter().collect();
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id()) {
                return Err(NavigationError::DuplicateInstructionId(entry.id()));
            }
        }
        Ok(Self { entries })
    }

    /// A backstack holding a single instruction.
    pub fn single(instruction: OpenInstruction) -> Self {
        Self {
            entries: vec![instruction],
        }
    }

    /// Append an instruction on top.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateInstructionId` if the id is already present.
    pub fn push(&self, instruction: OpenInstruction) -> Result<Self, NavigationError> {
        if self.contains(instruction.id()) {
            return Err(NavigationError::DuplicateInstructionId(instruction.id()));
        }
        let mut entries = self.entries.clone();
        entries.push(instruction);
        Ok(Self { entries })
    }

    /// Remove the instruction with the given id, wherever it is.
    ///
    /// Removing an entry below the top leaves the active entry unchanged.
    /// Closing an id that is not present returns an identical backstack.
    pub fn close(&self, id: InstructionId) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.id() != id)
                .cloned()
                .collect(),
        }
    }

    /// The active (top) instruction.
    pub fn active(&self) -> Option<&OpenInstruction> {
        self.entries.last()
    }

    /// Whether the given id is the active instruction.
    pub fn is_active(&self, id: InstructionId) -> bool {
        self.active().is_some_and(|entry| entry.id() == id)
    }

    /// Look up an instruction by id.
    pub fn get(&self, id: InstructionId) -> Option<&OpenInstruction> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    /// Whether the id is present.
    pub fn contains(&self, id: InstructionId) -> bool {
        self.get(id).is_some()
    }

    /// Position of the id, counted from the oldest entry.
    pub fn position(&self, id: InstructionId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the backstack is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, OpenInstruction> {
        self.entries.iter()
    }

    /// Instruction ids, oldest first.
    pub fn ids(&self) -> Vec<InstructionId> {
        self.entries.iter().map(|entry| entry.id()).collect()
    }

    /// Entries present here but absent from `other`.
    pub fn difference<'a>(&'a self, other: &Backstack) -> Vec<&'a OpenInstruction> {
        self.entries
            .iter()
            .filter(|entry| !other.contains(entry.id()))
            .collect()
    }
}

impl PartialEq for Backstack {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a.id() == b.id() && a.key() == b.key())
    }
}

impl TryFrom<Vec<OpenInstruction>> for Backstack {
    type Error = NavigationError;

    fn try_from(entries: Vec<OpenInstruction>) -> Result<Self, Self::Error> {
        Self::from_instructions(entries)
    }
}

impl From<Backstack> for Vec<OpenInstruction> {
    fn from(backstack: Backstack) -> Self {
        backstack.entries
    }
}

impl<'a> IntoIterator for &'a Backstack {
    type Item = &'a OpenInstruction;
    type IntoIter = std::slice::Iter<'a, OpenInstruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
