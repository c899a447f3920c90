//! engine::container
//!
//! A container owns one backstack plus the policies that govern it.
//!
//! # Policies
//!
//! - **Accept**: which keys the container may host ([`AcceptPolicy`])
//! - **Empty behavior**: what happens when a mutation would leave a
//!   non-empty backstack empty ([`EmptyBehavior`])
//! - **Root**: an optional key opened once when the container starts empty
//!
//! Containers are described by a [`ContainerSpec`] (registered on bindings
//! or added to the root context) and instantiated by the navigator.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::backstack::Backstack;
use crate::core::errors::NavigationError;
use crate::core::types::{AnyKey, ContainerKey, ContextId, KeyType, NavigationKey};

use super::manager::ContainerManager;

/// Empty-behavior action. Returning `true` suppresses the empty mutation.
pub type EmptyAction = Arc<dyn Fn(&mut ContainerManager) -> bool + Send + Sync>;

/// Accept predicate over erased keys.
pub type AcceptPredicate = Arc<dyn Fn(&AnyKey) -> bool + Send + Sync>;

/// What happens when a mutation would leave the backstack empty.
#[derive(Clone, Default)]
pub enum EmptyBehavior {
    /// Commit the empty backstack.
    #[default]
    AllowEmpty,
    /// Keep the entry and ask the parent destination to close (it may veto).
    CloseParent,
    /// Keep the entry and close the parent destination unconditionally.
    ForceCloseParent,
    /// Run the action against the owning manager. `true` suppresses the
    /// mutation, `false` commits it.
    Action(EmptyAction),
}

impl EmptyBehavior {
    /// Build an action behavior.
    pub fn action<F>(f: F) -> Self
    where
        F: Fn(&mut ContainerManager) -> bool + Send + Sync + 'static,
    {
        EmptyBehavior::Action(Arc::new(f))
    }

    /// Stable name of the behavior.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyBehavior::AllowEmpty => "allow_empty",
            EmptyBehavior::CloseParent => "close_parent",
            EmptyBehavior::ForceCloseParent => "force_close_parent",
            EmptyBehavior::Action(_) => "action",
        }
    }
}

impl fmt::Debug for EmptyBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmptyBehavior::{}", self.as_str())
    }
}

/// Which keys a container may host.
#[derive(Clone, Default)]
pub enum AcceptPolicy {
    /// Any key.
    #[default]
    All,
    /// Only the listed key types.
    KeyTypes(BTreeSet<KeyType>),
    /// Keys for which the predicate holds.
    Predicate(AcceptPredicate),
}

impl AcceptPolicy {
    /// Whether the key is accepted.
    pub fn accepts(&self, key: &AnyKey) -> bool {
        match self {
            AcceptPolicy::All => true,
            AcceptPolicy::KeyTypes(types) => types.contains(key.key_type()),
            AcceptPolicy::Predicate(predicate) => predicate(key),
        }
    }
}

impl fmt::Debug for AcceptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptPolicy::All => write!(f, "AcceptPolicy::All"),
            AcceptPolicy::KeyTypes(types) => f.debug_tuple("AcceptPolicy::KeyTypes").field(types).finish(),
            AcceptPolicy::Predicate(_) => write!(f, "AcceptPolicy::Predicate(..)"),
        }
    }
}

/// Description of a container, instantiated by the navigator.
///
/// # Example
///
/// ```
/// use wayfinder::core::types::{ContainerKey, KeyType};
/// use wayfinder::engine::container::{ContainerSpec, EmptyBehavior};
///
/// let spec = ContainerSpec::new(ContainerKey::new("tabs").unwrap())
///     .accept_key_type(KeyType::new("app.TabA").unwrap())
///     .accept_key_type(KeyType::new("app.TabB").unwrap())
///     .empty_behavior(EmptyBehavior::CloseParent);
/// assert_eq!(spec.key().as_str(), "tabs");
/// ```
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    key: ContainerKey,
    accept: AcceptPolicy,
    empty_behavior: EmptyBehavior,
    root: Option<AnyKey>,
}

impl ContainerSpec {
    /// A spec that accepts every key and allows empty.
    pub fn new(key: ContainerKey) -> Self {
        Self {
            key,
            accept: AcceptPolicy::All,
            empty_behavior: EmptyBehavior::AllowEmpty,
            root: None,
        }
    }

    /// Replace the accept policy.
    pub fn accept(mut self, accept: AcceptPolicy) -> Self {
        self.accept = accept;
        self
    }

    /// Restrict to (or extend with) one key type.
    pub fn accept_key_type(mut self, key_type: KeyType) -> Self {
        match &mut self.accept {
            AcceptPolicy::KeyTypes(types) => {
                types.insert(key_type);
            }
            _ => self.accept = AcceptPolicy::KeyTypes(BTreeSet::from([key_type])),
        }
        self
    }

    /// Restrict to (or extend with) the key type of `K`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `K::KEY_TYPE` is not a valid identifier.
    pub fn accept_key<K: NavigationKey>(self) -> Result<Self, NavigationError> {
        Ok(self.accept_key_type(KeyType::new(K::KEY_TYPE)?))
    }

    /// Accept keys matching a predicate.
    pub fn accept_if<F>(self, predicate: F) -> Self
    where
        F: Fn(&AnyKey) -> bool + Send + Sync + 'static,
    {
        self.accept(AcceptPolicy::Predicate(Arc::new(predicate)))
    }

    /// Set the empty behavior.
    pub fn empty_behavior(mut self, behavior: EmptyBehavior) -> Self {
        self.empty_behavior = behavior;
        self
    }

    /// Set the root key opened when the container starts empty.
    pub fn root(mut self, key: AnyKey) -> Self {
        self.root = Some(key);
        self
    }

    /// Set a typed root key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if the key cannot be encoded.
    pub fn root_key<K: NavigationKey>(self, key: &K) -> Result<Self, NavigationError> {
        Ok(self.root(AnyKey::of(key)?))
    }

    /// The container key.
    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    /// The root key, if any.
    pub fn root_key_ref(&self) -> Option<&AnyKey> {
        self.root.as_ref()
    }
}

/// A live container: one backstack and its policies.
#[derive(Debug, Clone)]
pub struct Container {
    key: ContainerKey,
    accept: AcceptPolicy,
    empty_behavior: EmptyBehavior,
    root: Option<AnyKey>,
    root_opened: bool,
    backstack: Backstack,
}

impl Container {
    /// Instantiate an empty container from its spec.
    pub fn from_spec(spec: ContainerSpec) -> Self {
        Self {
            key: spec.key,
            accept: spec.accept,
            empty_behavior: spec.empty_behavior,
            root: spec.root,
            root_opened: false,
            backstack: Backstack::new(),
        }
    }

    /// The presentation layer: accepts everything and allows empty.
    pub(crate) fn presentation() -> Self {
        Self::from_spec(ContainerSpec::new(ContainerKey::presentation()))
    }

    /// The container key.
    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    /// Whether the container may host the key.
    pub fn accepts(&self, key: &AnyKey) -> bool {
        self.accept.accepts(key)
    }

    /// The empty behavior.
    pub fn empty_behavior(&self) -> &EmptyBehavior {
        &self.empty_behavior
    }

    /// The declared root key.
    pub fn root(&self) -> Option<&AnyKey> {
        self.root.as_ref()
    }

    /// The current backstack.
    pub fn backstack(&self) -> &Backstack {
        &self.backstack
    }

    /// Whether the root has been opened (or restored over).
    pub fn is_root_opened(&self) -> bool {
        self.root_opened
    }

    /// Claim the root key for opening. Returns it at most once, and only
    /// while the backstack is empty.
    pub(crate) fn take_root(&mut self) -> Option<AnyKey> {
        if self.root_opened || !self.backstack.is_empty() {
            return None;
        }
        let root = self.root.clone()?;
        self.root_opened = true;
        Some(root)
    }

    pub(crate) fn mark_root_opened(&mut self) {
        self.root_opened = true;
    }

    /// Replace the backstack without evaluating policies.
    pub(crate) fn replace_backstack(&mut self, backstack: Backstack) -> Backstack {
        std::mem::replace(&mut self.backstack, backstack)
    }
}

/// Where a destination lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// A container owned by a context's container manager.
    Container {
        context: ContextId,
        container: ContainerKey,
    },
    /// The presentation layer above all containers.
    Presentation,
}

impl Placement {
    /// The context owning the container, if not the presentation layer.
    pub fn context(&self) -> Option<ContextId> {
        match self {
            Placement::Container { context, .. } => Some(*context),
            Placement::Presentation => None,
        }
    }

    /// The container key (the presentation layer has its own key).
    pub fn container_key(&self) -> ContainerKey {
        match self {
            Placement::Container { container, .. } => container.clone(),
            Placement::Presentation => ContainerKey::presentation(),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Container { context, container } => write!(f, "{context}/{container}"),
            Placement::Presentation => write!(f, "{}", ContainerKey::PRESENTATION),
        }
    }
}
