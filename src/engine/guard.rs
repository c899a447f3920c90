//! engine::guard
//!
//! Owner-thread enforcement for navigation state.
//!
//! Navigation state is mutated from a single logical thread. The guard
//! records the thread that created the navigator; every mutation checks
//! against it. Strict mode fails with `NavigationContainerWrongThread`,
//! lenient mode logs at error level and proceeds.

use std::thread::{self, ThreadId};

use crate::core::errors::NavigationError;

/// Records and checks the owner thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadGuard {
    owner: ThreadId,
}

impl ThreadGuard {
    /// A guard owned by the current thread.
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// Whether the current thread is the owner.
    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Check the current thread.
    ///
    /// # Errors
    ///
    /// Returns `NavigationContainerWrongThread` off the owner thread when
    /// `strict` is set.
    pub fn check(&self, strict: bool, operation: &str) -> Result<(), NavigationError> {
        if self.is_owner() {
            return Ok(());
        }
        if strict {
            return Err(NavigationError::NavigationContainerWrongThread);
        }
        tracing::error!(
            operation,
            owner = ?self.owner,
            current = ?thread::current().id(),
            "navigation state mutated off its owner thread"
        );
        Ok(())
    }

    /// Make the current thread the owner.
    pub fn adopt(&mut self) {
        self.owner = thread::current().id();
    }
}

impl Default for ThreadGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_thread_passes() {
        let guard = ThreadGuard::new();
        assert!(guard.is_owner());
        assert!(guard.check(true, "test").is_ok());
    }

    #[test]
    fn other_thread_strict_fails() {
        let guard = ThreadGuard::new();
        let result = thread::spawn(move || guard.check(true, "test"))
            .join()
            .unwrap();
        assert_eq!(result, Err(NavigationError::NavigationContainerWrongThread));
    }

    #[test]
    fn other_thread_lenient_proceeds() {
        let guard = ThreadGuard::new();
        let result = thread::spawn(move || guard.check(false, "test"))
            .join()
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn adopt_moves_ownership() {
        let guard = ThreadGuard::new();
        let adopted = thread::spawn(move || {
            let mut guard = guard;
            guard.adopt();
            guard
        })
        .join()
        .unwrap();
        assert!(!adopted.is_owner());
    }
}
