//! engine::manager
//!
//! Arbitrates between the sibling containers of one context.
//!
//! # Invariants
//!
//! - Container keys are unique within a manager
//! - `active`, if set, names a container this manager owns
//! - The first container added becomes active unless one is set explicitly
//! - [`ContainerManager::set_active`] is the only mutator of `active`
//!
//! # Observability
//!
//! Every mutation publishes a [`ManagerSnapshot`] on a `tokio::sync::watch`
//! channel. Subscribers (a tab bar, a test) see the latest
//! `(containers, active)` pair.

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;

use crate::core::backstack::Backstack;
use crate::core::errors::NavigationError;
use crate::core::types::{AnyKey, ContainerKey};

use super::container::{Container, EmptyBehavior};

/// A point-in-time view of one container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerSnapshot {
    pub key: ContainerKey,
    pub backstack: Backstack,
}

/// A point-in-time view of a manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManagerSnapshot {
    pub containers: Vec<ContainerSnapshot>,
    pub active: Option<ContainerKey>,
}

/// How a would-be empty mutation is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyResolution {
    /// Apply the mutation.
    Commit,
    /// An action handled it; discard the mutation.
    Suppress,
    /// Discard the mutation and close the parent destination.
    CloseParent { force: bool },
}

/// Outcome of [`ContainerManager::set_backstack`].
#[derive(Debug, Clone, PartialEq)]
pub enum SetBackstackOutcome {
    /// The new backstack was committed; holds the previous one.
    Committed(Backstack),
    /// An empty-behavior action suppressed the mutation.
    Suppressed,
    /// The mutation was discarded; the parent should close.
    CloseParentRequested { force: bool },
}

/// The sibling containers of one context.
pub struct ContainerManager {
    containers: Vec<Container>,
    active: Option<ContainerKey>,
    snapshots: watch::Sender<ManagerSnapshot>,
}

impl ContainerManager {
    /// An empty manager.
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(ManagerSnapshot::default());
        Self {
            containers: Vec::new(),
            active: None,
            snapshots,
        }
    }

    /// A manager holding the given containers, the first one active.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNavigationContainer` if two containers share a key.
    pub fn with_containers(
        containers: impl IntoIterator<Item = Container>,
    ) -> Result<Self, NavigationError> {
        let mut manager = Self::new();
        for container in containers {
            manager.add(container)?;
        }
        Ok(manager)
    }

    /// Add a container. The first container added becomes active.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNavigationContainer` if the key is taken or is the
    /// presentation layer's reserved key.
    pub fn add(&mut self, container: Container) -> Result<(), NavigationError> {
        if container.key().is_presentation() || self.contains(container.key()) {
            return Err(NavigationError::DuplicateNavigationContainer(
                container.key().clone(),
            ));
        }
        if self.active.is_none() {
            self.active = Some(container.key().clone());
        }
        self.containers.push(container);
        self.publish();
        Ok(())
    }

    /// Remove a container. If it was active, the first remaining container
    /// becomes active.
    pub fn remove(&mut self, key: &ContainerKey) -> Option<Container> {
        let index = self.containers.iter().position(|c| c.key() == key)?;
        let removed = self.containers.remove(index);
        if self.active.as_ref() == Some(key) {
            self.active = self.containers.first().map(|c| c.key().clone());
        }
        self.publish();
        Some(removed)
    }

    /// Make the container active. Idempotent.
    ///
    /// Returns whether the active container changed.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContainer` if the key is not owned by this manager.
    pub fn set_active(&mut self, key: &ContainerKey) -> Result<bool, NavigationError> {
        if !self.contains(key) {
            return Err(NavigationError::UnknownContainer(key.clone()));
        }
        if self.active.as_ref() == Some(key) {
            return Ok(false);
        }
        self.active = Some(key.clone());
        self.publish();
        Ok(true)
    }

    /// The active container's key.
    pub fn active_key(&self) -> Option<&ContainerKey> {
        self.active.as_ref()
    }

    /// The active container.
    pub fn active(&self) -> Option<&Container> {
        self.active.as_ref().and_then(|key| self.get(key))
    }

    /// Look up a container.
    pub fn get(&self, key: &ContainerKey) -> Option<&Container> {
        self.containers.iter().find(|c| c.key() == key)
    }

    pub(crate) fn get_mut(&mut self, key: &ContainerKey) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| c.key() == key)
    }

    /// Whether the key is owned by this manager.
    pub fn contains(&self, key: &ContainerKey) -> bool {
        self.get(key).is_some()
    }

    /// All containers, in insertion order.
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub(crate) fn containers_mut(&mut self) -> impl Iterator<Item = &mut Container> {
        self.containers.iter_mut()
    }

    /// Container keys, in insertion order.
    pub fn keys(&self) -> Vec<ContainerKey> {
        self.containers.iter().map(|c| c.key().clone()).collect()
    }

    /// Whether the manager owns no containers.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// The container that should receive a key with no explicit target:
    /// the active container if it accepts the key, otherwise the first
    /// accepting container.
    pub fn find_accepting(&self, key: &AnyKey) -> Option<&ContainerKey> {
        if let Some(active) = self.active().filter(|c| c.accepts(key)) {
            return Some(active.key());
        }
        self.containers
            .iter()
            .find(|c| c.accepts(key))
            .map(|c| c.key())
    }

    /// Decide what a mutation of `key` to `proposed` should do.
    ///
    /// Only mutations that empty a non-empty backstack consult the empty
    /// behavior. An `Action` behavior runs here, with access to this
    /// manager.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContainer` if the key is not owned by this manager.
    pub fn resolve_empty(
        &mut self,
        key: &ContainerKey,
        proposed: &Backstack,
    ) -> Result<EmptyResolution, NavigationError> {
        let container = self
            .get(key)
            .ok_or_else(|| NavigationError::UnknownContainer(key.clone()))?;
        if !proposed.is_empty() || container.backstack().is_empty() {
            return Ok(EmptyResolution::Commit);
        }
        match container.empty_behavior().clone() {
            EmptyBehavior::AllowEmpty => Ok(EmptyResolution::Commit),
            EmptyBehavior::CloseParent => Ok(EmptyResolution::CloseParent { force: false }),
            EmptyBehavior::ForceCloseParent => Ok(EmptyResolution::CloseParent { force: true }),
            EmptyBehavior::Action(action) => {
                if action(self) {
                    Ok(EmptyResolution::Suppress)
                } else {
                    Ok(EmptyResolution::Commit)
                }
            }
        }
    }

    /// Replace the container's backstack without evaluating policies.
    /// Returns the previous backstack.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContainer` if the key is not owned by this manager.
    pub fn commit(
        &mut self,
        key: &ContainerKey,
        backstack: Backstack,
    ) -> Result<Backstack, NavigationError> {
        let container = self
            .get_mut(key)
            .ok_or_else(|| NavigationError::UnknownContainer(key.clone()))?;
        let previous = container.replace_backstack(backstack);
        self.publish();
        Ok(previous)
    }

    /// Atomically transform a container's backstack, honoring its empty
    /// behavior.
    ///
    /// This only updates state held by the manager. Destinations removed
    /// from the backstack are not torn down; use the navigator for that.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContainer` for an unknown key, or any error produced
    /// by `transform`.
    pub fn set_backstack<F>(
        &mut self,
        key: &ContainerKey,
        transform: F,
    ) -> Result<SetBackstackOutcome, NavigationError>
    where
        F: FnOnce(&Backstack) -> Result<Backstack, NavigationError>,
    {
        let current = self
            .get(key)
            .ok_or_else(|| NavigationError::UnknownContainer(key.clone()))?
            .backstack();
        let proposed = transform(current)?;
        match self.resolve_empty(key, &proposed)? {
            EmptyResolution::Commit => Ok(SetBackstackOutcome::Committed(
                self.commit(key, proposed)?,
            )),
            EmptyResolution::Suppress => Ok(SetBackstackOutcome::Suppressed),
            EmptyResolution::CloseParent { force } => {
                Ok(SetBackstackOutcome::CloseParentRequested { force })
            }
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            containers: self
                .containers
                .iter()
                .map(|c| ContainerSnapshot {
                    key: c.key().clone(),
                    backstack: c.backstack().clone(),
                })
                .collect(),
            active: self.active.clone(),
        }
    }

    /// Subscribe to snapshots. The receiver starts with the current one.
    pub fn subscribe(&self) -> watch::Receiver<ManagerSnapshot> {
        self.snapshots.subscribe()
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

impl Default for ContainerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerManager")
            .field("containers", &self.containers)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capabilities::Capability;
    use crate::core::instruction::{Direction, OpenInstruction};
    use crate::core::types::NavigationKey;
    use crate::engine::container::ContainerSpec;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Page(u32);

    impl NavigationKey for Page {
        const KEY_TYPE: &'static str = "test.Page";
        const CAPABILITIES: &'static [Capability] = &[Capability::Push];
    }

    fn key(name: &str) -> ContainerKey {
        ContainerKey::new(name).unwrap()
    }

    fn container(name: &str) -> Container {
        Container::from_spec(ContainerSpec::new(key(name)))
    }

    fn open(n: u32) -> OpenInstruction {
        OpenInstruction::new(Direction::Push, &Page(n)).unwrap()
    }

    #[test]
    fn presentation_key_is_reserved() {
        let mut manager = ContainerManager::new();
        let err = manager
            .add(container(ContainerKey::PRESENTATION))
            .unwrap_err();
        assert_eq!(
            err,
            NavigationError::DuplicateNavigationContainer(ContainerKey::presentation())
        );
        assert!(manager.is_empty());
    }

    mod active {
        use super::*;

        #[test]
        fn first_container_is_active() {
            let manager =
                ContainerManager::with_containers([container("a"), container("b")]).unwrap();
            assert_eq!(manager.active_key(), Some(&key("a")));
        }

        #[test]
        fn set_active_is_idempotent() {
            let mut manager =
                ContainerManager::with_containers([container("a"), container("b")]).unwrap();
            assert!(manager.set_active(&key("b")).unwrap());
            assert!(!manager.set_active(&key("b")).unwrap());
            assert_eq!(manager.active_key(), Some(&key("b")));
        }

        #[test]
        fn set_active_unknown_fails() {
            let mut manager = ContainerManager::with_containers([container("a")]).unwrap();
            assert_eq!(
                manager.set_active(&key("zzz")).unwrap_err(),
                NavigationError::UnknownContainer(key("zzz"))
            );
        }

        #[test]
        fn removing_active_rehomes() {
            let mut manager =
                ContainerManager::with_containers([container("a"), container("b")]).unwrap();
            manager.remove(&key("a")).unwrap();
            assert_eq!(manager.active_key(), Some(&key("b")));
            manager.remove(&key("b")).unwrap();
            assert_eq!(manager.active_key(), None);
        }
    }

    #[test]
    fn duplicate_container_rejected() {
        let err = ContainerManager::with_containers([container("a"), container("a")]).unwrap_err();
        assert_eq!(err, NavigationError::DuplicateNavigationContainer(key("a")));
    }

    #[test]
    fn find_accepting_prefers_active() {
        let mut manager =
            ContainerManager::with_containers([container("a"), container("b")]).unwrap();
        manager.set_active(&key("b")).unwrap();
        let page = crate::core::types::AnyKey::of(&Page(1)).unwrap();
        assert_eq!(manager.find_accepting(&page), Some(&key("b")));
    }

    mod empty_behavior {
        use super::*;

        fn populated(behavior: EmptyBehavior) -> (ContainerManager, OpenInstruction) {
            let entry = open(1);
            let spec = ContainerSpec::new(key("tabs")).empty_behavior(behavior);
            let mut manager = ContainerManager::with_containers([
                Container::from_spec(spec),
                container("other"),
            ])
            .unwrap();
            manager
                .commit(&key("tabs"), Backstack::single(entry.clone()))
                .unwrap();
            (manager, entry)
        }

        #[test]
        fn allow_empty_commits() {
            let (mut manager, entry) = populated(EmptyBehavior::AllowEmpty);
            let outcome = manager
                .set_backstack(&key("tabs"), |b| Ok(b.close(entry.id())))
                .unwrap();
            assert!(matches!(outcome, SetBackstackOutcome::Committed(_)));
            assert!(manager.get(&key("tabs")).unwrap().backstack().is_empty());
        }

        #[test]
        fn close_parent_keeps_entry() {
            let (mut manager, entry) = populated(EmptyBehavior::CloseParent);
            let outcome = manager
                .set_backstack(&key("tabs"), |b| Ok(b.close(entry.id())))
                .unwrap();
            assert_eq!(
                outcome,
                SetBackstackOutcome::CloseParentRequested { force: false }
            );
            assert_eq!(manager.get(&key("tabs")).unwrap().backstack().len(), 1);
        }

        #[test]
        fn action_true_suppresses() {
            let (mut manager, entry) = populated(EmptyBehavior::action(|manager| {
                manager.set_active(&ContainerKey::new("other").unwrap()).is_ok()
            }));
            let outcome = manager
                .set_backstack(&key("tabs"), |b| Ok(b.close(entry.id())))
                .unwrap();
            assert_eq!(outcome, SetBackstackOutcome::Suppressed);
            assert_eq!(manager.active_key(), Some(&key("other")));
            assert_eq!(manager.get(&key("tabs")).unwrap().backstack().len(), 1);
        }

        #[test]
        fn action_false_commits() {
            let (mut manager, entry) = populated(EmptyBehavior::action(|_| false));
            let outcome = manager
                .set_backstack(&key("tabs"), |b| Ok(b.close(entry.id())))
                .unwrap();
            assert!(matches!(outcome, SetBackstackOutcome::Committed(_)));
        }

        #[test]
        fn already_empty_does_not_trigger() {
            let spec = ContainerSpec::new(key("tabs")).empty_behavior(EmptyBehavior::CloseParent);
            let mut manager =
                ContainerManager::with_containers([Container::from_spec(spec)]).unwrap();
            let outcome = manager
                .set_backstack(&key("tabs"), |b| Ok(b.clone()))
                .unwrap();
            assert!(matches!(outcome, SetBackstackOutcome::Committed(_)));
        }
    }

    mod snapshots {
        use super::*;

        #[test]
        fn subscribers_see_mutations() {
            let mut manager =
                ContainerManager::with_containers([container("a"), container("b")]).unwrap();
            let receiver = manager.subscribe();
            manager.set_active(&key("b")).unwrap();
            assert_eq!(receiver.borrow().active, Some(key("b")));

            manager
                .commit(&key("a"), Backstack::single(open(1)))
                .unwrap();
            let snapshot = receiver.borrow().clone();
            assert_eq!(snapshot.containers[0].backstack.len(), 1);
        }

        #[test]
        fn idempotent_set_active_does_not_publish() {
            let mut manager = ContainerManager::with_containers([container("a")]).unwrap();
            let mut receiver = manager.subscribe();
            receiver.borrow_and_update();
            manager.set_active(&key("a")).unwrap();
            assert!(!receiver.has_changed().unwrap());
        }
    }
}
