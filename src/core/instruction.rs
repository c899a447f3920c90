//! core::instruction
//!
//! The instruction model: what a caller asks the engine to do.
//!
//! # Instructions
//!
//! - [`Instruction::Open`] opens a destination, carrying an [`OpenInstruction`]
//! - [`Instruction::Close`] closes the dispatching destination unconditionally
//! - [`Instruction::CloseWithResult`] closes it and delivers a result
//! - [`Instruction::RequestClose`] asks the destination to close; it may veto
//!
//! # Directions
//!
//! | Direction | Required capability | Effect |
//! |---|---|---|
//! | `Push` | `Push` | append to the resolved container |
//! | `Present` | `Present` | append to the presentation layer |
//! | `ReplaceRoot` | `Present` | replace the resolved container's backstack |
//! | `Forward` (legacy) | `Push` or `Present` | push if a container accepts, else present |
//! | `Replace` (legacy) | `Push` or `Present` | forward, then close the caller |
//!
//! # Invariants
//!
//! - An instruction id is generated once and never changes
//! - Capabilities are checked at construction; an invalid instruction cannot
//!   be built

use std::fmt;

use serde::{Deserialize, Serialize};

use super::capabilities::{Capability, CapabilitySet, KeyDescriptor};
use super::errors::NavigationError;
use super::types::{AnyKey, AnyResult, ContainerKey, InstructionId, NavigationKey, ResultValue};

/// How an open instruction is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Append to a container that accepts the key.
    Push,
    /// Show above the current content.
    Present,
    /// Replace the target container's whole backstack.
    ReplaceRoot,
    /// Legacy: push when a container accepts the key, otherwise present.
    Forward,
    /// Legacy: forward, then close the caller.
    Replace,
}

impl Direction {
    /// Whether this is one of the legacy direction modes.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Direction::Forward | Direction::Replace)
    }

    /// Whether a key with the given capabilities may be opened this way.
    pub fn is_permitted_by(&self, capabilities: &CapabilitySet) -> bool {
        match self {
            Direction::Push => capabilities.has(&Capability::Push),
            Direction::Present | Direction::ReplaceRoot => capabilities.has(&Capability::Present),
            Direction::Forward | Direction::Replace => {
                capabilities.has(&Capability::Push) || capabilities.has(&Capability::Present)
            }
        }
    }

    /// The preferred direction for a key with the given capabilities:
    /// push when supported, present otherwise.
    pub fn preferred_for(capabilities: &CapabilitySet) -> Self {
        if capabilities.has(&Capability::Push) {
            Direction::Push
        } else {
            Direction::Present
        }
    }

    /// Stable name of the direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Push => "push",
            Direction::Present => "present",
            Direction::ReplaceRoot => "replace_root",
            Direction::Forward => "forward",
            Direction::Replace => "replace",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which container an open instruction is addressed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum ContainerTarget {
    /// The nearest container accepting the key, preferring active ones.
    #[default]
    Default,
    /// Whichever container is active in the nearest container manager.
    ActiveContainer,
    /// The container hosting the dispatching destination.
    ParentContainer,
    /// The nearest container with this key.
    Container(ContainerKey),
}

impl ContainerTarget {
    /// Whether this is the default target.
    pub fn is_default(&self) -> bool {
        matches!(self, ContainerTarget::Default)
    }
}

/// An instruction to open a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenInstruction {
    direction: Direction,
    key: AnyKey,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<AnyKey>,
    instruction_id: InstructionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_instruction_id: Option<InstructionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previously_active_container_id: Option<ContainerKey>,
    #[serde(default, skip_serializing_if = "ContainerTarget::is_default")]
    target: ContainerTarget,
}

impl OpenInstruction {
    /// Build an open instruction for a typed key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectionForKey` if `K` does not declare a capability
    /// permitting `direction`.
    pub fn new<K: NavigationKey>(direction: Direction, key: &K) -> Result<Self, NavigationError> {
        let descriptor = KeyDescriptor::of::<K>()?;
        Self::from_descriptor(direction, AnyKey::of(key)?, &descriptor)
    }

    /// Build an open instruction for an erased key using its type descriptor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectionForKey` if the descriptor's capabilities do
    /// not permit `direction`, or `UnreachableState` if the descriptor
    /// describes a different key type.
    pub fn from_descriptor(
        direction: Direction,
        key: AnyKey,
        descriptor: &KeyDescriptor,
    ) -> Result<Self, NavigationError> {
        if key.key_type() != descriptor.key_type() {
            return Err(NavigationError::UnreachableState(format!(
                "descriptor for '{}' used to open '{}'",
                descriptor.key_type(),
                key.key_type()
            )));
        }
        if !direction.is_permitted_by(descriptor.capabilities()) {
            return Err(NavigationError::InvalidDirectionForKey {
                key_type: key.key_type().clone(),
                direction,
            });
        }
        Ok(Self {
            direction,
            key,
            children: Vec::new(),
            instruction_id: InstructionId::new(),
            parent_instruction_id: None,
            previously_active_container_id: None,
            target: ContainerTarget::Default,
        })
    }

    /// Attach deeplink children, opened in order after this instruction.
    pub fn with_children(mut self, children: impl IntoIterator<Item = AnyKey>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    /// Address a specific container.
    pub fn with_target(mut self, target: ContainerTarget) -> Self {
        self.target = target;
        self
    }

    /// Link this instruction to the instruction that caused it.
    pub fn with_parent_instruction(mut self, parent: InstructionId) -> Self {
        self.parent_instruction_id = Some(parent);
        self
    }

    /// Record the active container to restore when this instruction closes.
    pub fn with_previously_active_container(mut self, container: ContainerKey) -> Self {
        self.previously_active_container_id = Some(container);
        self
    }

    /// The same instruction (same id) realized with another direction.
    pub(crate) fn retargeted(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub(crate) fn take_children(&mut self) -> Vec<AnyKey> {
        std::mem::take(&mut self.children)
    }

    /// The direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The key being opened.
    pub fn key(&self) -> &AnyKey {
        &self.key
    }

    /// Deeplink children still to be opened.
    pub fn children(&self) -> &[AnyKey] {
        &self.children
    }

    /// The instruction id.
    pub fn id(&self) -> InstructionId {
        self.instruction_id
    }

    /// The id of the instruction that caused this one, for deeplink chains.
    pub fn parent_instruction_id(&self) -> Option<InstructionId> {
        self.parent_instruction_id
    }

    /// The active container at the time this instruction was dispatched.
    pub fn previously_active_container(&self) -> Option<&ContainerKey> {
        self.previously_active_container_id.as_ref()
    }

    /// The container this instruction is addressed to.
    pub fn target(&self) -> &ContainerTarget {
        &self.target
    }
}

/// A navigation instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    /// Open a destination.
    Open(OpenInstruction),
    /// Close the dispatching destination, bypassing any veto.
    Close,
    /// Close the dispatching destination and deliver a result.
    CloseWithResult { result: AnyResult },
    /// Ask the dispatching destination to close. It may veto.
    RequestClose,
}

/// The kind of an instruction, for logging and interceptor routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    Open,
    Close,
    CloseWithResult,
    RequestClose,
}

impl InstructionKind {
    /// Stable name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstructionKind::Open => "open",
            InstructionKind::Close => "close",
            InstructionKind::CloseWithResult => "close_with_result",
            InstructionKind::RequestClose => "request_close",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Instruction {
    /// Push a typed key.
    pub fn push<K: NavigationKey>(key: &K) -> Result<Self, NavigationError> {
        Ok(Instruction::Open(OpenInstruction::new(Direction::Push, key)?))
    }

    /// Present a typed key.
    pub fn present<K: NavigationKey>(key: &K) -> Result<Self, NavigationError> {
        Ok(Instruction::Open(OpenInstruction::new(Direction::Present, key)?))
    }

    /// Replace the root with a typed key.
    pub fn replace_root<K: NavigationKey>(key: &K) -> Result<Self, NavigationError> {
        Ok(Instruction::Open(OpenInstruction::new(
            Direction::ReplaceRoot,
            key,
        )?))
    }

    /// Close with a typed result.
    pub fn close_with_result<R: ResultValue>(result: &R) -> Result<Self, NavigationError> {
        Ok(Instruction::CloseWithResult {
            result: AnyResult::of(result)?,
        })
    }

    /// The instruction kind.
    pub fn kind(&self) -> InstructionKind {
        match self {
            Instruction::Open(_) => InstructionKind::Open,
            Instruction::Close => InstructionKind::Close,
            Instruction::CloseWithResult { .. } => InstructionKind::CloseWithResult,
            Instruction::RequestClose => InstructionKind::RequestClose,
        }
    }

    /// Whether this instruction closes the dispatching destination.
    pub fn is_close(&self) -> bool {
        matches!(
            self,
            Instruction::Close | Instruction::CloseWithResult { .. }
        )
    }
}

impl From<OpenInstruction> for Instruction {
    fn from(open: OpenInstruction) -> Self {
        Instruction::Open(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Detail {
        id: u32,
    }

    impl NavigationKey for Detail {
        const KEY_TYPE: &'static str = "test.Detail";
        const CAPABILITIES: &'static [Capability] = &[Capability::Push];
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Dialog;

    impl NavigationKey for Dialog {
        const KEY_TYPE: &'static str = "test.Dialog";
        const CAPABILITIES: &'static [Capability] = &[Capability::Present];
    }

    mod construction {
        use super::*;

        #[test]
        fn push_for_push_key() {
            let open = OpenInstruction::new(Direction::Push, &Detail { id: 1 }).unwrap();
            assert_eq!(open.direction(), Direction::Push);
            assert!(open.key().is::<Detail>());
            assert!(open.children().is_empty());
            assert!(open.target().is_default());
        }

        #[test]
        fn present_for_push_only_key_fails() {
            let err = OpenInstruction::new(Direction::Present, &Detail { id: 1 }).unwrap_err();
            assert!(matches!(
                err,
                NavigationError::InvalidDirectionForKey {
                    direction: Direction::Present,
                    ..
                }
            ));
        }

        #[test]
        fn replace_root_requires_present() {
            assert!(OpenInstruction::new(Direction::ReplaceRoot, &Dialog).is_ok());
            assert!(OpenInstruction::new(Direction::ReplaceRoot, &Detail { id: 1 }).is_err());
        }

        #[test]
        fn legacy_directions_accept_either() {
            assert!(OpenInstruction::new(Direction::Forward, &Dialog).is_ok());
            assert!(OpenInstruction::new(Direction::Replace, &Detail { id: 2 }).is_ok());
        }

        #[test]
        fn ids_are_fresh() {
            let a = OpenInstruction::new(Direction::Push, &Detail { id: 1 }).unwrap();
            let b = OpenInstruction::new(Direction::Push, &Detail { id: 1 }).unwrap();
            assert_ne!(a.id(), b.id());
        }

        #[test]
        fn descriptor_mismatch_is_unreachable() {
            let descriptor = KeyDescriptor::of::<Dialog>().unwrap();
            let key = AnyKey::of(&Detail { id: 1 }).unwrap();
            let err = OpenInstruction::from_descriptor(Direction::Present, key, &descriptor)
                .unwrap_err();
            assert!(matches!(err, NavigationError::UnreachableState(_)));
        }

        #[test]
        fn retarget_keeps_id() {
            let open = OpenInstruction::new(Direction::Forward, &Dialog).unwrap();
            let id = open.id();
            let retargeted = open.retargeted(Direction::Present);
            assert_eq!(retargeted.id(), id);
            assert_eq!(retargeted.direction(), Direction::Present);
        }
    }

    mod direction {
        use super::*;

        #[test]
        fn preferred_direction() {
            let push = CapabilitySet::with([Capability::Push, Capability::Present]);
            assert_eq!(Direction::preferred_for(&push), Direction::Push);
            let present = CapabilitySet::with([Capability::Present]);
            assert_eq!(Direction::preferred_for(&present), Direction::Present);
        }

        #[test]
        fn legacy_flags() {
            assert!(Direction::Forward.is_legacy());
            assert!(Direction::Replace.is_legacy());
            assert!(!Direction::Push.is_legacy());
        }
    }

    mod serialization {
        use super::*;

        #[test]
        fn open_instruction_json_shape() {
            let open = OpenInstruction::new(Direction::Push, &Detail { id: 4 }).unwrap();
            let json = serde_json::to_value(&open).unwrap();
            assert_eq!(json["direction"], "push");
            assert_eq!(json["key"]["type"], "test.Detail");
            assert_eq!(json["key"]["params"]["id"], 4);
            assert_eq!(json["instruction_id"], open.id().to_string());
            assert!(json.get("children").is_none());
            assert!(json.get("target").is_none());
        }

        #[test]
        fn instruction_is_tagged() {
            let json = serde_json::to_value(Instruction::RequestClose).unwrap();
            assert_eq!(json["type"], "request_close");

            let close = Instruction::close_with_result(&"ok".to_string()).unwrap();
            let json = serde_json::to_value(&close).unwrap();
            assert_eq!(json["type"], "close_with_result");
            assert_eq!(json["result"]["type"], "string");
        }

        #[test]
        fn explicit_target_serialized() {
            let open = OpenInstruction::new(Direction::Push, &Detail { id: 4 })
                .unwrap()
                .with_target(ContainerTarget::Container(ContainerKey::new("tabs").unwrap()));
            let json = serde_json::to_value(&open).unwrap();
            assert_eq!(json["target"]["kind"], "container");
            assert_eq!(json["target"]["key"], "tabs");
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(Instruction::Close.kind(), InstructionKind::Close);
        assert!(Instruction::Close.is_close());
        assert!(!Instruction::RequestClose.is_close());
        let open = Instruction::push(&Detail { id: 1 }).unwrap();
        assert_eq!(open.kind().as_str(), "open");
    }
}
