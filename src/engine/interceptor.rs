//! engine::interceptor
//!
//! Observers that may allow, cancel or rewrite an in-flight instruction
//! before it reaches a container.
//!
//! # Ordering
//!
//! For each instruction, interceptors registered for the instruction's key
//! type run first, then open-ended interceptors. Within each group they run
//! in registration order. For a close carrying a result, `on_result` hooks
//! run before `on_closed` hooks. The first decision other than
//! [`InterceptorDecision::Continue`] short-circuits the chain.
//!
//! A typed hook only sees keys that decode as its type. A key whose type
//! matches the registration but whose params do not decode fails the
//! evaluation with `IncorrectlyTypedNavigationHandle`, so a typed `Cancel`
//! cannot be bypassed by a malformed key.
//!
//! `RequestClose` never reaches interceptors; it resolves into a `Close`
//! (which does) or a veto.
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use wayfinder::core::capabilities::Capability;
//! use wayfinder::core::types::NavigationKey;
//! use wayfinder::engine::interceptor::{InterceptorChain, InterceptorDecision};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Admin;
//!
//! impl NavigationKey for Admin {
//!     const KEY_TYPE: &'static str = "demo.Admin";
//!     const CAPABILITIES: &'static [Capability] = &[Capability::Push];
//! }
//!
//! let mut chain = InterceptorChain::new();
//! let id = chain.on_open::<Admin, _>(|_key, _event| InterceptorDecision::Cancel);
//! assert_eq!(chain.len(), 1);
//! assert!(chain.remove(id));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::core::errors::NavigationError;
use crate::core::instruction::{Instruction, OpenInstruction};
use crate::core::types::{AnyResult, ContextId, KeyType, NavigationKey, WithResult};

/// What an interceptor decided.
#[derive(Debug, Clone, PartialEq)]
pub enum InterceptorDecision {
    /// Let the instruction through to the next interceptor.
    Continue,
    /// Drop the instruction: no mutation, no executor call.
    Cancel,
    /// Substitute another instruction, dispatched from the same context.
    ReplaceWith(Instruction),
}

/// An open instruction about to be applied.
#[derive(Debug, Clone, Copy)]
pub struct OpenEvent<'a> {
    /// The dispatching context.
    pub from: ContextId,
    /// The instruction.
    pub instruction: &'a OpenInstruction,
}

/// A destination about to be closed.
#[derive(Debug, Clone, Copy)]
pub struct CloseEvent<'a> {
    /// The context being closed.
    pub context: ContextId,
    /// The instruction that opened it.
    pub opened_by: &'a OpenInstruction,
    /// The result being delivered, if any.
    pub result: Option<&'a AnyResult>,
}

type Evaluation = Result<InterceptorDecision, NavigationError>;
type OpenHook = Arc<dyn Fn(&OpenEvent<'_>) -> Evaluation + Send + Sync>;
type CloseHook = Arc<dyn Fn(&CloseEvent<'_>) -> Evaluation + Send + Sync>;

fn decode_key<K: NavigationKey>(
    context: ContextId,
    instruction: &OpenInstruction,
) -> Result<K, NavigationError> {
    instruction
        .key()
        .decode::<K>()
        .ok_or_else(|| NavigationError::IncorrectlyTypedNavigationHandle {
            context,
            expected: instruction.key().key_type().clone(),
        })
}

#[derive(Clone)]
enum Hook {
    Open(OpenHook),
    Closed(CloseHook),
    Result(CloseHook),
}

/// Handle to a registered interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(u64);

impl fmt::Display for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interceptor #{}", self.0)
    }
}

#[derive(Clone)]
struct Registration {
    id: InterceptorId,
    key_type: Option<KeyType>,
    hook: Hook,
}

/// The ordered set of registered interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    registrations: Vec<Registration>,
    next_id: u64,
}

impl InterceptorChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, key_type: Option<KeyType>, hook: Hook) -> InterceptorId {
        self.next_id += 1;
        let id = InterceptorId(self.next_id);
        self.registrations.push(Registration { id, key_type, hook });
        id
    }

    fn key_type_of<K: NavigationKey>() -> Option<KeyType> {
        // An invalid KEY_TYPE can never be opened, so such a hook never fires.
        KeyType::new(K::KEY_TYPE).ok()
    }

    /// Intercept opens of `K`.
    pub fn on_open<K, F>(&mut self, f: F) -> InterceptorId
    where
        K: NavigationKey,
        F: Fn(K, &OpenEvent<'_>) -> InterceptorDecision + Send + Sync + 'static,
    {
        let hook: OpenHook = Arc::new(move |event: &OpenEvent<'_>| {
            let context = ContextId::from(event.instruction.id());
            Ok(f(decode_key::<K>(context, event.instruction)?, event))
        });
        self.register(Self::key_type_of::<K>(), Hook::Open(hook))
    }

    /// Intercept closes (with or without result) of destinations of `K`.
    pub fn on_closed<K, F>(&mut self, f: F) -> InterceptorId
    where
        K: NavigationKey,
        F: Fn(K, &CloseEvent<'_>) -> InterceptorDecision + Send + Sync + 'static,
    {
        let hook: CloseHook = Arc::new(move |event: &CloseEvent<'_>| {
            Ok(f(decode_key::<K>(event.context, event.opened_by)?, event))
        });
        self.register(Self::key_type_of::<K>(), Hook::Closed(hook))
    }

    /// Intercept results delivered by destinations of `K`.
    ///
    /// Results that do not decode as `K::Result` are passed through; the
    /// result channel reports the mismatch. Keys that do not decode as `K`
    /// fail the evaluation.
    pub fn on_result<K, F>(&mut self, f: F) -> InterceptorId
    where
        K: WithResult,
        F: Fn(K, K::Result, &CloseEvent<'_>) -> InterceptorDecision + Send + Sync + 'static,
    {
        let hook: CloseHook = Arc::new(move |event: &CloseEvent<'_>| {
            let key = decode_key::<K>(event.context, event.opened_by)?;
            match event.result.and_then(|r| r.decode::<K::Result>()) {
                Some(result) => Ok(f(key, result, event)),
                None => Ok(InterceptorDecision::Continue),
            }
        });
        self.register(Self::key_type_of::<K>(), Hook::Result(hook))
    }

    /// Intercept every open.
    pub fn on_any_open<F>(&mut self, f: F) -> InterceptorId
    where
        F: Fn(&OpenEvent<'_>) -> InterceptorDecision + Send + Sync + 'static,
    {
        let hook: OpenHook = Arc::new(move |event: &OpenEvent<'_>| Ok(f(event)));
        self.register(None, Hook::Open(hook))
    }

    /// Intercept every close.
    pub fn on_any_close<F>(&mut self, f: F) -> InterceptorId
    where
        F: Fn(&CloseEvent<'_>) -> InterceptorDecision + Send + Sync + 'static,
    {
        let hook: CloseHook = Arc::new(move |event: &CloseEvent<'_>| Ok(f(event)));
        self.register(None, Hook::Closed(hook))
    }

    /// Unregister an interceptor. Returns whether it was registered.
    pub fn remove(&mut self, id: InterceptorId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Number of registered interceptors.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no interceptors are registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registrations for `key_type`, keyed ones first.
    fn ordered<'a>(&'a self, key_type: &'a KeyType) -> impl Iterator<Item = &'a Registration> {
        let keyed = self
            .registrations
            .iter()
            .filter(move |r| r.key_type.as_ref() == Some(key_type));
        let open_ended = self.registrations.iter().filter(|r| r.key_type.is_none());
        keyed.chain(open_ended)
    }

    /// Run open interceptors.
    ///
    /// # Errors
    ///
    /// Returns `IncorrectlyTypedNavigationHandle` if a typed hook matches
    /// the key type but the key does not decode.
    pub fn evaluate_open(&self, event: &OpenEvent<'_>) -> Evaluation {
        let key_type = event.instruction.key().key_type();
        for registration in self.ordered(key_type) {
            if let Hook::Open(hook) = &registration.hook {
                let decision = hook(event)?;
                if decision != InterceptorDecision::Continue {
                    return Ok(decision);
                }
            }
        }
        Ok(InterceptorDecision::Continue)
    }

    /// Run close interceptors: result hooks (only when a result is carried),
    /// then closed hooks.
    ///
    /// # Errors
    ///
    /// As [`InterceptorChain::evaluate_open`].
    pub fn evaluate_close(&self, event: &CloseEvent<'_>) -> Evaluation {
        let key_type = event.opened_by.key().key_type();
        if event.result.is_some() {
            for registration in self.ordered(key_type) {
                if let Hook::Result(hook) = &registration.hook {
                    let decision = hook(event)?;
                    if decision != InterceptorDecision::Continue {
                        return Ok(decision);
                    }
                }
            }
        }
        for registration in self.ordered(key_type) {
            if let Hook::Closed(hook) = &registration.hook {
                let decision = hook(event)?;
                if decision != InterceptorDecision::Continue {
                    return Ok(decision);
                }
            }
        }
        Ok(InterceptorDecision::Continue)
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::core::capabilities::{Capability, KeyDescriptor};
    use crate::core::instruction::Direction;
    use crate::core::types::AnyKey;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Gate {
        level: u32,
    }

    impl NavigationKey for Gate {
        const KEY_TYPE: &'static str = "test.Gate";
        const CAPABILITIES: &'static [Capability] = &[Capability::Push, Capability::Result];
    }

    impl WithResult for Gate {
        type Result = String;
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Plain;

    impl NavigationKey for Plain {
        const KEY_TYPE: &'static str = "test.Plain";
        const CAPABILITIES: &'static [Capability] = &[Capability::Push];
    }

    fn open_gate(level: u32) -> OpenInstruction {
        OpenInstruction::new(Direction::Push, &Gate { level }).unwrap()
    }

    fn open_event(instruction: &OpenInstruction) -> OpenEvent<'_> {
        OpenEvent {
            from: ContextId::Root,
            instruction,
        }
    }

    mod ordering {
        use super::*;

        #[test]
        fn keyed_before_open_ended() {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let mut chain = InterceptorChain::new();

            let log = seen.clone();
            chain.on_any_open(move |_| {
                log.lock().unwrap().push("any");
                InterceptorDecision::Continue
            });
            let log = seen.clone();
            chain.on_open::<Gate, _>(move |_, _| {
                log.lock().unwrap().push("keyed");
                InterceptorDecision::Continue
            });

            let instruction = open_gate(1);
            assert_eq!(
                chain.evaluate_open(&open_event(&instruction)).unwrap(),
                InterceptorDecision::Continue
            );
            assert_eq!(*seen.lock().unwrap(), vec!["keyed", "any"]);
        }

        #[test]
        fn first_non_continue_wins() {
            let mut chain = InterceptorChain::new();
            chain.on_open::<Gate, _>(|_, _| InterceptorDecision::Cancel);
            chain.on_open::<Gate, _>(|_, _| {
                InterceptorDecision::ReplaceWith(Instruction::Close)
            });
            let instruction = open_gate(1);
            assert_eq!(
                chain.evaluate_open(&open_event(&instruction)).unwrap(),
                InterceptorDecision::Cancel
            );
        }

        #[test]
        fn other_key_types_ignored() {
            let mut chain = InterceptorChain::new();
            chain.on_open::<Plain, _>(|_, _| InterceptorDecision::Cancel);
            let instruction = open_gate(1);
            assert_eq!(
                chain.evaluate_open(&open_event(&instruction)).unwrap(),
                InterceptorDecision::Continue
            );
        }
    }

    #[test]
    fn typed_open_hook_sees_decoded_key() {
        let mut chain = InterceptorChain::new();
        chain.on_open::<Gate, _>(|key, _| {
            if key.level > 5 {
                InterceptorDecision::Cancel
            } else {
                InterceptorDecision::Continue
            }
        });
        let low = open_gate(1);
        let high = open_gate(9);
        assert_eq!(
            chain.evaluate_open(&open_event(&low)).unwrap(),
            InterceptorDecision::Continue
        );
        assert_eq!(
            chain.evaluate_open(&open_event(&high)).unwrap(),
            InterceptorDecision::Cancel
        );
    }

    #[test]
    fn undecodable_key_fails_typed_hook() {
        let mut chain = InterceptorChain::new();
        chain.on_open::<Gate, _>(|_, _| InterceptorDecision::Cancel);
        let malformed = AnyKey::new(
            KeyType::new(Gate::KEY_TYPE).unwrap(),
            serde_json::json!({ "level": "high" }),
        );
        let instruction = OpenInstruction::from_descriptor(
            Direction::Push,
            malformed,
            &KeyDescriptor::of::<Gate>().unwrap(),
        )
        .unwrap();
        let err = chain.evaluate_open(&open_event(&instruction)).unwrap_err();
        assert!(matches!(
            err,
            NavigationError::IncorrectlyTypedNavigationHandle { .. }
        ));
    }

    mod close {
        use super::*;

        #[test]
        fn result_hooks_only_with_result() {
            let mut chain = InterceptorChain::new();
            chain.on_result::<Gate, _>(|_, result, _| {
                if result == "deny" {
                    InterceptorDecision::Cancel
                } else {
                    InterceptorDecision::Continue
                }
            });
            let opened_by = open_gate(1);
            let plain_close = CloseEvent {
                context: ContextId::from(opened_by.id()),
                opened_by: &opened_by,
                result: None,
            };
            assert_eq!(
                chain.evaluate_close(&plain_close).unwrap(),
                InterceptorDecision::Continue
            );

            let deny = AnyResult::of(&"deny".to_string()).unwrap();
            let with_result = CloseEvent {
                result: Some(&deny),
                ..plain_close
            };
            assert_eq!(
                chain.evaluate_close(&with_result).unwrap(),
                InterceptorDecision::Cancel
            );
        }

        #[test]
        fn closed_hooks_fire_for_both() {
            let count = Arc::new(Mutex::new(0));
            let mut chain = InterceptorChain::new();
            let counter = count.clone();
            chain.on_closed::<Gate, _>(move |_, _| {
                *counter.lock().unwrap() += 1;
                InterceptorDecision::Continue
            });

            let opened_by = open_gate(1);
            let ok = AnyResult::of(&"ok".to_string()).unwrap();
            let event = CloseEvent {
                context: ContextId::from(opened_by.id()),
                opened_by: &opened_by,
                result: None,
            };
            chain.evaluate_close(&event).unwrap();
            chain
                .evaluate_close(&CloseEvent {
                    result: Some(&ok),
                    ..event
                })
                .unwrap();
            assert_eq!(*count.lock().unwrap(), 2);
        }
    }

    #[test]
    fn remove_unregisters() {
        let mut chain = InterceptorChain::new();
        let id = chain.on_any_open(|_| InterceptorDecision::Cancel);
        assert!(chain.remove(id));
        assert!(!chain.remove(id));
        assert!(chain.is_empty());
        let instruction = open_gate(1);
        assert_eq!(
            chain.evaluate_open(&open_event(&instruction)).unwrap(),
            InterceptorDecision::Continue
        );
    }
}
