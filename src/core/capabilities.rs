//! core::capabilities
//!
//! Capability markers declared by navigation key types.
//!
//! # Architecture
//!
//! A key type declares what it may be used for: pushed into a container,
//! presented above the current content, or closed with a typed result. The
//! declaration lives on the key's type descriptor ([`KeyDescriptor`]), not on
//! the key value, and is checked when an open instruction is built.
//!
//! # Example
//!
//! ```
//! use wayfinder::core::capabilities::{Capability, CapabilitySet};
//!
//! let caps = CapabilitySet::with([Capability::Push]);
//! assert!(caps.has(&Capability::Push));
//! assert_eq!(
//!     caps.missing(&[Capability::Push, Capability::Present]),
//!     vec![Capability::Present]
//! );
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::types::{KeyType, NavigationKey, ResultType, ResultValue, TypeError, WithResult};

/// A capability a key type may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// The key may be pushed into a container's backstack.
    Push,

    /// The key may be presented above the current content (and may replace
    /// the root).
    Present,

    /// The key's destination produces a typed result when it closes.
    Result,
}

impl Capability {
    /// Get a human-readable description of the capability.
    pub fn description(&self) -> &'static str {
        match self {
            Capability::Push => "supports push",
            Capability::Present => "supports present",
            Capability::Result => "produces a result",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A set of capabilities declared by a key type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    capabilities: HashSet<Capability>,
}

impl CapabilitySet {
    /// Create an empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a capability set with the given capabilities.
    pub fn with<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }

    /// Insert a capability into the set.
    pub fn insert(&mut self, cap: Capability) {
        self.capabilities.insert(cap);
    }

    /// Check if a capability is present.
    pub fn has(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Check if all given capabilities are present.
    pub fn has_all(&self, caps: &[Capability]) -> bool {
        caps.iter().all(|c| self.capabilities.contains(c))
    }

    /// Get the capabilities that are missing from the required set, in the
    /// order they were requested.
    pub fn missing(&self, required: &[Capability]) -> Vec<Capability> {
        required
            .iter()
            .filter(|c| !self.capabilities.contains(c))
            .copied()
            .collect()
    }

    /// Get the number of capabilities in the set.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Iterate over all capabilities in the set.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self::with(iter)
    }
}

/// Type descriptor of a navigation key.
///
/// Carries the stable key type, its declared capabilities and, for keys that
/// produce a result, the expected result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    key_type: KeyType,
    capabilities: CapabilitySet,
    result_type: Option<ResultType>,
}

impl KeyDescriptor {
    /// Create a descriptor from its parts.
    pub fn new(key_type: KeyType, capabilities: CapabilitySet) -> Self {
        Self {
            key_type,
            capabilities,
            result_type: None,
        }
    }

    /// Declare the result type produced by this key.
    ///
    /// Also adds [`Capability::Result`].
    pub fn with_result(mut self, result_type: ResultType) -> Self {
        self.capabilities.insert(Capability::Result);
        self.result_type = Some(result_type);
        self
    }

    /// Descriptor of a typed key.
    ///
    /// # Errors
    ///
    /// Returns an error if `K::KEY_TYPE` is not a valid identifier.
    pub fn of<K: NavigationKey>() -> Result<Self, TypeError> {
        Ok(Self::new(
            KeyType::new(K::KEY_TYPE)?,
            K::CAPABILITIES.iter().copied().collect(),
        ))
    }

    /// Descriptor of a typed key that produces a result.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or result type identifier is invalid.
    pub fn of_result<K: WithResult>() -> Result<Self, TypeError> {
        Ok(Self::of::<K>()?.with_result(ResultType::new(
            <K::Result as ResultValue>::RESULT_TYPE,
        )?))
    }

    /// The key type.
    pub fn key_type(&self) -> &KeyType {
        &self.key_type
    }

    /// The declared capabilities.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The result type, for keys that produce one.
    pub fn result_type(&self) -> Option<&ResultType> {
        self.result_type.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Confirm;

    impl NavigationKey for Confirm {
        const KEY_TYPE: &'static str = "test.Confirm";
        const CAPABILITIES: &'static [Capability] = &[Capability::Present];
    }

    impl WithResult for Confirm {
        type Result = bool;
    }

    #[test]
    fn display_uses_description() {
        assert_eq!(Capability::Push.to_string(), "supports push");
    }

    #[test]
    fn serde_names_are_snake_case() {
        let json = serde_json::to_string(&Capability::Present).unwrap();
        assert_eq!(json, "\"present\"");
        let parsed: Capability = serde_json::from_str("\"result\"").unwrap();
        assert_eq!(parsed, Capability::Result);
    }

    #[test]
    fn set_equality_ignores_order() {
        let a = CapabilitySet::with([Capability::Push, Capability::Present]);
        let b = CapabilitySet::with([Capability::Present, Capability::Push]);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_preserves_order() {
        let caps = CapabilitySet::new();
        assert_eq!(
            caps.missing(&[Capability::Present, Capability::Push]),
            vec![Capability::Present, Capability::Push]
        );
    }

    #[test]
    fn descriptor_of_plain_key() {
        let descriptor = KeyDescriptor::of::<Confirm>().unwrap();
        assert_eq!(descriptor.key_type().as_str(), "test.Confirm");
        assert!(descriptor.capabilities().has(&Capability::Present));
        assert!(descriptor.result_type().is_none());
    }

    #[test]
    fn descriptor_of_result_key() {
        let descriptor = KeyDescriptor::of_result::<Confirm>().unwrap();
        assert!(descriptor.capabilities().has(&Capability::Result));
        assert_eq!(descriptor.result_type().map(|r| r.as_str()), Some("bool"));
    }
}
