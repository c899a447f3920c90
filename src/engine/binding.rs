//! engine::binding
//!
//! Executor resolution: maps a key type to the binding that realizes it.
//!
//! # Executor Contract
//!
//! The navigator invokes a binding's [`Executor`] around every mutation:
//! 1. `pre_opened` before the destination is added to its container
//! 2. `open` once the destination context exists
//! 3. `post_opened` after the container's manager has been updated
//! 4. `pre_closed` before the destination is removed from its container
//! 5. `close` after the destination and its nested state are torn down
//!
//! Executors run side effects (rendering, animation) only. They cannot
//! observe or mutate navigation state; the navigator owns it.
//!
//! # Invariants
//!
//! - At most one binding per key type
//! - A missing binding is fatal (`MissingNavigationBinding`), never retried

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::capabilities::KeyDescriptor;
use crate::core::errors::NavigationError;
use crate::core::instruction::OpenInstruction;
use crate::core::types::{ContextId, KeyType, NavigationKey, WithResult};

use super::container::{ContainerSpec, Placement};

/// What an executor sees of a transition.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorContext<'a> {
    /// The instruction that opened (or is opening) the destination.
    pub instruction: &'a OpenInstruction,
    /// The context that dispatched the open, if known. Restored
    /// destinations have none.
    pub from: Option<ContextId>,
    /// Where the destination lives.
    pub placement: &'a Placement,
}

impl ExecutorContext<'_> {
    /// The destination's own context.
    pub fn context(&self) -> ContextId {
        ContextId::from(self.instruction.id())
    }
}

/// Platform side of a binding. All hooks default to no-ops.
pub trait Executor: Send + Sync {
    /// Before the destination is added to its container.
    fn pre_opened(&self, _ctx: &ExecutorContext<'_>) {}

    /// Realize the destination.
    fn open(&self, _ctx: &ExecutorContext<'_>) {}

    /// After the destination is visible in its container.
    fn post_opened(&self, _ctx: &ExecutorContext<'_>) {}

    /// Before the destination is removed from its container.
    fn pre_closed(&self, _ctx: &ExecutorContext<'_>) {}

    /// Dismiss the destination.
    fn close(&self, _ctx: &ExecutorContext<'_>) {}
}

/// An executor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

impl Executor for NoopExecutor {}

/// An executor that logs every hook at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingExecutor;

impl Executor for TracingExecutor {
    fn pre_opened(&self, ctx: &ExecutorContext<'_>) {
        tracing::debug!(id = %ctx.instruction.id(), key = %ctx.instruction.key(), placement = %ctx.placement, "pre_opened");
    }

    fn open(&self, ctx: &ExecutorContext<'_>) {
        tracing::debug!(id = %ctx.instruction.id(), key = %ctx.instruction.key(), placement = %ctx.placement, "open");
    }

    fn post_opened(&self, ctx: &ExecutorContext<'_>) {
        tracing::debug!(id = %ctx.instruction.id(), "post_opened");
    }

    fn pre_closed(&self, ctx: &ExecutorContext<'_>) {
        tracing::debug!(id = %ctx.instruction.id(), "pre_closed");
    }

    fn close(&self, ctx: &ExecutorContext<'_>) {
        tracing::debug!(id = %ctx.instruction.id(), key = %ctx.instruction.key(), placement = %ctx.placement, "close");
    }
}

/// Decides whether a destination may close on request.
pub type CloseDecider = Arc<dyn Fn(&OpenInstruction) -> bool + Send + Sync>;

/// How a destination answers `RequestClose`.
#[derive(Clone, Default)]
pub enum CloseRequestPolicy {
    /// Resolve into a `Close`.
    #[default]
    Close,
    /// Refuse; nothing changes.
    Veto,
    /// Ask the function; `true` closes.
    Decide(CloseDecider),
}

impl CloseRequestPolicy {
    /// Build a deciding policy.
    pub fn decide<F>(f: F) -> Self
    where
        F: Fn(&OpenInstruction) -> bool + Send + Sync + 'static,
    {
        CloseRequestPolicy::Decide(Arc::new(f))
    }

    /// Whether the destination agrees to close.
    pub fn allows(&self, instruction: &OpenInstruction) -> bool {
        match self {
            CloseRequestPolicy::Close => true,
            CloseRequestPolicy::Veto => false,
            CloseRequestPolicy::Decide(decide) => decide(instruction),
        }
    }
}

impl fmt::Debug for CloseRequestPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseRequestPolicy::Close => write!(f, "CloseRequestPolicy::Close"),
            CloseRequestPolicy::Veto => write!(f, "CloseRequestPolicy::Veto"),
            CloseRequestPolicy::Decide(_) => write!(f, "CloseRequestPolicy::Decide(..)"),
        }
    }
}

/// Everything the navigator needs to realize a key type.
#[derive(Clone)]
pub struct Binding {
    descriptor: KeyDescriptor,
    executor: Arc<dyn Executor>,
    containers: Vec<ContainerSpec>,
    close_request: CloseRequestPolicy,
}

impl Binding {
    /// A binding with a no-op executor and no nested containers.
    pub fn new(descriptor: KeyDescriptor) -> Self {
        Self {
            descriptor,
            executor: Arc::new(NoopExecutor),
            containers: Vec::new(),
            close_request: CloseRequestPolicy::Close,
        }
    }

    /// A binding for `K`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `K::KEY_TYPE` is not a valid identifier.
    pub fn of<K: NavigationKey>() -> Result<Self, NavigationError> {
        Ok(Self::new(KeyDescriptor::of::<K>()?))
    }

    /// A binding for a key that produces a result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if the key or result type is not a valid
    /// identifier.
    pub fn with_result<K: WithResult>() -> Result<Self, NavigationError> {
        Ok(Self::new(KeyDescriptor::of_result::<K>()?))
    }

    /// Use the given executor.
    pub fn executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    /// Add a nested container created with each destination.
    pub fn container(mut self, spec: ContainerSpec) -> Self {
        self.containers.push(spec);
        self
    }

    /// Set the close-request policy.
    pub fn close_request(mut self, policy: CloseRequestPolicy) -> Self {
        self.close_request = policy;
        self
    }

    /// The key type's descriptor.
    pub fn descriptor(&self) -> &KeyDescriptor {
        &self.descriptor
    }

    /// The key type.
    pub fn key_type(&self) -> &KeyType {
        self.descriptor.key_type()
    }

    pub(crate) fn executor_handle(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.executor)
    }

    /// Nested container specs.
    pub fn containers(&self) -> &[ContainerSpec] {
        &self.containers
    }

    /// The close-request policy.
    pub fn close_request_policy(&self) -> &CloseRequestPolicy {
        &self.close_request
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("descriptor", &self.descriptor)
            .field("containers", &self.containers)
            .field("close_request", &self.close_request)
            .finish_non_exhaustive()
    }
}

/// Key type to binding lookup.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: HashMap<KeyType, Binding>,
}

impl BindingRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNavigationBinding` if the key type is taken.
    pub fn register(&mut self, binding: Binding) -> Result<(), NavigationError> {
        let key_type = binding.key_type().clone();
        if self.bindings.contains_key(&key_type) {
            return Err(NavigationError::DuplicateNavigationBinding(key_type));
        }
        self.bindings.insert(key_type, binding);
        Ok(())
    }

    /// Register a plain binding for `K`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNavigationBinding` if `K` is already bound.
    pub fn bind<K: NavigationKey>(&mut self) -> Result<(), NavigationError> {
        self.register(Binding::of::<K>()?)
    }

    /// Register a plain binding for a result-producing `K`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNavigationBinding` if `K` is already bound.
    pub fn bind_with_result<K: WithResult>(&mut self) -> Result<(), NavigationError> {
        self.register(Binding::with_result::<K>()?)
    }

    /// Resolve a key type.
    ///
    /// # Errors
    ///
    /// Returns `MissingNavigationBinding` if nothing is registered.
    pub fn get(&self, key_type: &KeyType) -> Result<&Binding, NavigationError> {
        self.bindings
            .get(key_type)
            .ok_or_else(|| NavigationError::MissingNavigationBinding(key_type.clone()))
    }

    /// Whether the key type is bound.
    pub fn contains(&self, key_type: &KeyType) -> bool {
        self.bindings.contains_key(key_type)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no bindings are registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bound key types, sorted.
    pub fn key_types(&self) -> Vec<&KeyType> {
        let mut types: Vec<&KeyType> = self.bindings.keys().collect();
        types.sort();
        types
    }
}
