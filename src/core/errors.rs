//! core::errors
//!
//! The navigation error taxonomy.
//!
//! # Classes
//!
//! Every [`NavigationError`] belongs to one [`ErrorClass`]:
//!
//! - **Configuration**: missing bindings, invalid directions, duplicate
//!   containers or bindings. Programmer errors, always fatal.
//! - **Routing**: no container for a push, mutation off the owner thread.
//!   The only class with a lenient fallback; strict mode makes them fatal.
//! - **Result channel**: uninitialised channels, mistyped results. Fatal.
//! - **State**: internal invariant violations. Fatal, reported for diagnosis.
//!
//! Nothing is retried: dispatch is deterministic given the current state.

use thiserror::Error;

use super::instruction::Direction;
use super::types::{ContainerKey, ContextId, InstructionId, KeyType, ResultType, TypeError};

/// Errors raised by the navigation engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NavigationError {
    /// No binding is registered for the key type.
    #[error("no navigation binding registered for key type '{0}'")]
    MissingNavigationBinding(KeyType),

    /// The key type's capabilities do not permit the requested direction.
    #[error("key type '{key_type}' cannot be opened with direction '{direction}'")]
    InvalidDirectionForKey {
        key_type: KeyType,
        direction: Direction,
    },

    /// A container with the same key already exists in the manager.
    #[error("container '{0}' is already registered in this context")]
    DuplicateNavigationContainer(ContainerKey),

    /// A binding for the key type is already registered.
    #[error("a navigation binding for key type '{0}' is already registered")]
    DuplicateNavigationBinding(KeyType),

    /// No container accepts the key.
    #[error("no container accepts key type '{key_type}' for direction '{direction}'")]
    MissingContainerForPushInstruction {
        key_type: KeyType,
        direction: Direction,
    },

    /// Navigation state was mutated from a thread other than its owner.
    #[error("navigation state mutated off its owner thread")]
    NavigationContainerWrongThread,

    /// A result channel was used before registration or after its owner was
    /// destroyed.
    #[error("result channel {0} is not initialised")]
    ResultChannelIsNotInitialised(String),

    /// A delivered result did not match the type the caller expected.
    #[error("expected a result of type '{expected}', received '{received}'")]
    ReceivedIncorrectlyTypedResult {
        expected: ResultType,
        received: ResultType,
    },

    /// A context was accessed as the wrong key type.
    #[error("{context} is not a destination of key type '{expected}'")]
    IncorrectlyTypedNavigationHandle {
        context: ContextId,
        expected: KeyType,
    },

    /// An internal invariant was violated.
    #[error("unreachable navigation state: {0}")]
    UnreachableState(String),

    /// An instruction id is already present in the backstack.
    #[error("instruction {0} is already present in the backstack")]
    DuplicateInstructionId(InstructionId),

    /// The container key does not exist in the manager.
    #[error("container '{0}' is not registered in this context")]
    UnknownContainer(ContainerKey),

    /// The context does not exist (never opened, or already torn down).
    #[error("{0} does not exist")]
    UnknownContext(ContextId),

    /// A key or result could not be encoded.
    #[error("invalid navigation value: {0}")]
    InvalidValue(#[from] TypeError),
}

/// The class an error belongs to, determining its handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Routing,
    ResultChannel,
    State,
}

impl NavigationError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            NavigationError::MissingNavigationBinding(_)
            | NavigationError::InvalidDirectionForKey { .. }
            | NavigationError::DuplicateNavigationContainer(_)
            | NavigationError::DuplicateNavigationBinding(_)
            | NavigationError::InvalidValue(_) => ErrorClass::Configuration,
            NavigationError::MissingContainerForPushInstruction { .. }
            | NavigationError::NavigationContainerWrongThread => ErrorClass::Routing,
            NavigationError::ResultChannelIsNotInitialised(_)
            | NavigationError::ReceivedIncorrectlyTypedResult { .. } => ErrorClass::ResultChannel,
            NavigationError::IncorrectlyTypedNavigationHandle { .. }
            | NavigationError::UnreachableState(_)
            | NavigationError::DuplicateInstructionId(_)
            | NavigationError::UnknownContainer(_)
            | NavigationError::UnknownContext(_) => ErrorClass::State,
        }
    }

    /// Whether lenient mode may recover from this error.
    pub fn is_recoverable(&self) -> bool {
        self.class() == ErrorClass::Routing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_type() -> KeyType {
        KeyType::new("test.Key").unwrap()
    }

    #[test]
    fn routing_errors_are_recoverable() {
        let err = NavigationError::MissingContainerForPushInstruction {
            key_type: key_type(),
            direction: Direction::Push,
        };
        assert_eq!(err.class(), ErrorClass::Routing);
        assert!(err.is_recoverable());
        assert!(NavigationError::NavigationContainerWrongThread.is_recoverable());
    }

    #[test]
    fn configuration_errors_are_fatal() {
        let err = NavigationError::MissingNavigationBinding(key_type());
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn result_errors_classified() {
        let err = NavigationError::ReceivedIncorrectlyTypedResult {
            expected: ResultType::new("string").unwrap(),
            received: ResultType::new("bool").unwrap(),
        };
        assert_eq!(err.class(), ErrorClass::ResultChannel);
        assert!(err.to_string().contains("'string'"));
    }

    #[test]
    fn display_formatting() {
        let err = NavigationError::InvalidDirectionForKey {
            key_type: key_type(),
            direction: Direction::Present,
        };
        assert_eq!(
            err.to_string(),
            "key type 'test.Key' cannot be opened with direction 'present'"
        );

        let err = NavigationError::UnknownContext(ContextId::Root);
        assert_eq!(err.to_string(), "root does not exist");
    }
}
