//! core::types
//!
//! Strong types for core navigation concepts.
//!
//! # Types
//!
//! - [`KeyType`] - Stable identifier for a navigation key's type
//! - [`ResultType`] - Stable identifier for a result value's type
//! - [`ContainerKey`] - Stable identifier for a container within its manager
//! - [`InstructionId`] - Globally unique id of an open instruction
//! - [`ContextId`] - Identifies a navigation context (the root or a destination)
//! - [`AnyKey`] - Type-erased navigation key (type + serialized params)
//! - [`AnyResult`] - Type-erased result value (type + serialized value)
//!
//! # Typed keys
//!
//! Application keys implement [`NavigationKey`]. Keys that produce a value
//! when closed also implement [`WithResult`], naming a [`ResultValue`] type.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use wayfinder::core::capabilities::Capability;
//! use wayfinder::core::types::{AnyKey, NavigationKey, WithResult};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct PickColor {
//!     initial: String,
//! }
//!
//! impl NavigationKey for PickColor {
//!     const KEY_TYPE: &'static str = "demo.PickColor";
//!     const CAPABILITIES: &'static [Capability] = &[Capability::Present, Capability::Result];
//! }
//!
//! impl WithResult for PickColor {
//!     type Result = String;
//! }
//!
//! let key = PickColor { initial: "red".into() };
//! let erased = AnyKey::of(&key).unwrap();
//! assert!(erased.is::<PickColor>());
//! assert_eq!(erased.decode::<PickColor>(), Some(key));
//! ```

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::capabilities::Capability;

/// Errors from type validation and value encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid key type: {0}")]
    InvalidKeyType(String),

    #[error("invalid result type: {0}")]
    InvalidResultType(String),

    #[error("invalid container key: {0}")]
    InvalidContainerKey(String),

    #[error("invalid instruction id: {0}")]
    InvalidInstructionId(String),

    #[error("failed to encode value: {0}")]
    Encode(String),
}

/// Shared validation for the identifier-like newtypes below.
///
/// Identifiers must be non-empty, and may not contain whitespace or
/// control characters.
fn validate_identifier(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("identifier cannot be empty");
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("identifier cannot contain whitespace or control characters");
    }
    Ok(())
}

macro_rules! identifier_type {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new validated identifier.
            ///
            /// # Errors
            ///
            /// Returns an error if the value is empty or contains whitespace.
            pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                validate_identifier(&value)
                    .map_err(|reason| TypeError::$variant(format!("'{value}': {reason}")))?;
                Ok(Self(value))
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TypeError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

identifier_type!(
    /// Stable identifier of a navigation key type.
    ///
    /// This is the registry key used to resolve bindings, so it must not
    /// change between releases if persisted state is to be restored.
    KeyType,
    InvalidKeyType
);

identifier_type!(
    /// Stable identifier of a result value type.
    ResultType,
    InvalidResultType
);

identifier_type!(
    /// Stable identifier of a container within its container manager.
    ContainerKey,
    InvalidContainerKey
);

impl ContainerKey {
    /// Key of the presentation layer that hosts presented destinations.
    pub const PRESENTATION: &'static str = "presented";

    /// The presentation layer's key.
    pub fn presentation() -> Self {
        Self(Self::PRESENTATION.to_string())
    }

    /// Whether this is the presentation layer's key.
    pub fn is_presentation(&self) -> bool {
        self.0 == Self::PRESENTATION
    }
}

/// Unique identifier of an open instruction.
///
/// Generated once when the instruction is built and carried through
/// save/restore unchanged, so it identifies the opened destination for its
/// whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructionId(Uuid);

impl InstructionId {
    /// Generate a fresh instruction id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an instruction id from its string form.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidInstructionId` if the string is not a UUID.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidInstructionId(format!("'{s}': {e}")))
    }

    /// Abbreviated form for display.
    pub fn short(&self) -> String {
        let full = self.0.simple().to_string();
        full[..8].to_string()
    }
}

impl Default for InstructionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a navigation context.
///
/// The root context is the host of the top-level containers. Every opened
/// destination is a context of its own, identified by the id of the
/// instruction that opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ContextId {
    /// The root context.
    Root,
    /// The destination opened by the given instruction.
    Destination(InstructionId),
}

impl ContextId {
    /// The instruction id, if this is a destination context.
    pub fn instruction_id(&self) -> Option<InstructionId> {
        match self {
            ContextId::Root => None,
            ContextId::Destination(id) => Some(*id),
        }
    }

    /// Whether this is the root context.
    pub fn is_root(&self) -> bool {
        matches!(self, ContextId::Root)
    }
}

impl From<InstructionId> for ContextId {
    fn from(id: InstructionId) -> Self {
        ContextId::Destination(id)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextId::Root => write!(f, "root"),
            ContextId::Destination(id) => write!(f, "destination {id}"),
        }
    }
}

/// A typed navigation key.
///
/// Keys are pure data: the parameters of a destination plus a capability set
/// declared on the type. Capabilities are checked when instructions are built.
pub trait NavigationKey:
    Serialize + DeserializeOwned + Clone + fmt::Debug + PartialEq + Send + Sync + 'static
{
    /// Stable type identifier, used as the binding registry key.
    const KEY_TYPE: &'static str;

    /// Directions and features this key supports.
    const CAPABILITIES: &'static [Capability];
}

/// A key whose destination produces a typed result when closed.
pub trait WithResult: NavigationKey {
    /// The result delivered to the caller.
    type Result: ResultValue;
}

/// A value that can be delivered through a result channel.
pub trait ResultValue: Serialize + DeserializeOwned + fmt::Debug + Send + 'static {
    /// Stable type identifier used for runtime type checks.
    const RESULT_TYPE: &'static str;
}

impl ResultValue for String {
    const RESULT_TYPE: &'static str = "string";
}

impl ResultValue for bool {
    const RESULT_TYPE: &'static str = "bool";
}

impl ResultValue for i64 {
    const RESULT_TYPE: &'static str = "i64";
}

impl ResultValue for u64 {
    const RESULT_TYPE: &'static str = "u64";
}

impl ResultValue for f64 {
    const RESULT_TYPE: &'static str = "f64";
}

impl ResultValue for () {
    const RESULT_TYPE: &'static str = "unit";
}

/// A type-erased navigation key.
///
/// Equality is structural: two keys are equal when their types match and
/// their serialized parameters are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyKey {
    #[serde(rename = "type")]
    key_type: KeyType,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    params: Value,
}

impl AnyKey {
    /// Create an erased key from its parts.
    pub fn new(key_type: KeyType, params: Value) -> Self {
        Self { key_type, params }
    }

    /// Erase a typed key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key type identifier is invalid or the key
    /// cannot be serialized.
    pub fn of<K: NavigationKey>(key: &K) -> Result<Self, TypeError> {
        let key_type = KeyType::new(K::KEY_TYPE)?;
        let params = serde_json::to_value(key).map_err(|e| TypeError::Encode(e.to_string()))?;
        Ok(Self { key_type, params })
    }

    /// The key type.
    pub fn key_type(&self) -> &KeyType {
        &self.key_type
    }

    /// The serialized parameters.
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Whether this key was produced from `K`.
    pub fn is<K: NavigationKey>(&self) -> bool {
        self.key_type.as_str() == K::KEY_TYPE
    }

    /// Decode the typed key.
    ///
    /// Returns `None` if the key type does not match or the parameters do
    /// not decode as `K`.
    pub fn decode<K: NavigationKey>(&self) -> Option<K> {
        if !self.is::<K>() {
            return None;
        }
        serde_json::from_value(self.params.clone()).ok()
    }
}

impl fmt::Display for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_null() || self.params == Value::Object(Default::default()) {
            write!(f, "{}", self.key_type)
        } else {
            write!(f, "{}{}", self.key_type, self.params)
        }
    }
}

/// A type-erased result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyResult {
    #[serde(rename = "type")]
    result_type: ResultType,
    value: Value,
}

impl AnyResult {
    /// Create an erased result from its parts.
    pub fn new(result_type: ResultType, value: Value) -> Self {
        Self { result_type, value }
    }

    /// Erase a typed result.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn of<R: ResultValue>(value: &R) -> Result<Self, TypeError> {
        let result_type = ResultType::new(R::RESULT_TYPE)?;
        let value = serde_json::to_value(value).map_err(|e| TypeError::Encode(e.to_string()))?;
        Ok(Self { result_type, value })
    }

    /// The result type.
    pub fn result_type(&self) -> &ResultType {
        &self.result_type
    }

    /// The serialized value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Decode the typed value, if the type token matches.
    pub fn decode<R: ResultValue>(&self) -> Option<R> {
        if self.result_type.as_str() != R::RESULT_TYPE {
            return None;
        }
        serde_json::from_value(self.value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        user_id: u32,
    }

    impl NavigationKey for Profile {
        const KEY_TYPE: &'static str = "test.Profile";
        const CAPABILITIES: &'static [Capability] = &[Capability::Push];
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Settings;

    impl NavigationKey for Settings {
        const KEY_TYPE: &'static str = "test.Settings";
        const CAPABILITIES: &'static [Capability] = &[Capability::Push];
    }

    mod identifiers {
        use super::*;

        #[test]
        fn valid_identifiers() {
            assert!(KeyType::new("app.Home").is_ok());
            assert!(ContainerKey::new("tabs").is_ok());
            assert!(ResultType::new("string").is_ok());
        }

        #[test]
        fn empty_rejected() {
            assert!(matches!(
                KeyType::new(""),
                Err(TypeError::InvalidKeyType(_))
            ));
            assert!(matches!(
                ContainerKey::new(""),
                Err(TypeError::InvalidContainerKey(_))
            ));
        }

        #[test]
        fn whitespace_rejected() {
            assert!(KeyType::new("has space").is_err());
            assert!(ResultType::new("tab\there").is_err());
        }

        #[test]
        fn serde_validates() {
            let parsed: Result<ContainerKey, _> = serde_json::from_str("\"\"");
            assert!(parsed.is_err());

            let parsed: ContainerKey = serde_json::from_str("\"main\"").unwrap();
            assert_eq!(parsed.as_str(), "main");
        }
    }

    mod instruction_id {
        use super::*;

        #[test]
        fn ids_are_unique() {
            assert_ne!(InstructionId::new(), InstructionId::new());
        }

        #[test]
        fn parse_display_agree() {
            let id = InstructionId::new();
            let parsed = InstructionId::parse(&id.to_string()).unwrap();
            assert_eq!(id, parsed);
        }

        #[test]
        fn parse_rejects_garbage() {
            assert!(InstructionId::parse("not-a-uuid").is_err());
        }

        #[test]
        fn short_is_eight_chars() {
            assert_eq!(InstructionId::new().short().len(), 8);
        }
    }

    mod context_id {
        use super::*;

        #[test]
        fn root_has_no_instruction() {
            assert!(ContextId::Root.is_root());
            assert_eq!(ContextId::Root.instruction_id(), None);
        }

        #[test]
        fn destination_carries_instruction() {
            let id = InstructionId::new();
            let ctx = ContextId::from(id);
            assert!(!ctx.is_root());
            assert_eq!(ctx.instruction_id(), Some(id));
        }
    }

    mod any_key {
        use super::*;

        #[test]
        fn erase_and_decode() {
            let key = Profile { user_id: 7 };
            let erased = AnyKey::of(&key).unwrap();
            assert_eq!(erased.key_type().as_str(), "test.Profile");
            assert_eq!(erased.decode::<Profile>(), Some(key));
        }

        #[test]
        fn decode_wrong_type_is_none() {
            let erased = AnyKey::of(&Profile { user_id: 1 }).unwrap();
            assert!(!erased.is::<Settings>());
            assert_eq!(erased.decode::<Settings>(), None);
        }

        #[test]
        fn structural_equality() {
            let a = AnyKey::of(&Profile { user_id: 1 }).unwrap();
            let b = AnyKey::of(&Profile { user_id: 1 }).unwrap();
            let c = AnyKey::of(&Profile { user_id: 2 }).unwrap();
            assert_eq!(a, b);
            assert_ne!(a, c);
        }

        #[test]
        fn display_includes_params() {
            let erased = AnyKey::of(&Profile { user_id: 3 }).unwrap();
            assert_eq!(erased.to_string(), "test.Profile{\"user_id\":3}");
        }
    }

    mod any_result {
        use super::*;

        #[test]
        fn decode_matching_type() {
            let result = AnyResult::of(&"blue".to_string()).unwrap();
            assert_eq!(result.result_type().as_str(), "string");
            assert_eq!(result.decode::<String>(), Some("blue".to_string()));
        }

        #[test]
        fn decode_mismatched_type_is_none() {
            let result = AnyResult::of(&true).unwrap();
            assert_eq!(result.decode::<String>(), None);
        }
    }
}
