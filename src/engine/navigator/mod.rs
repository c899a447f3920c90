//! engine::navigator
//!
//! The navigation tree and the single entry point for mutating it.
//!
//! # Model
//!
//! The navigator owns a tree of contexts. The root context hosts the
//! top-level containers; every opened destination is a context of its own,
//! owning a [`ContainerManager`] for its nested containers, the pending
//! results it awaits, its result channels, and its flows. The presentation
//! layer is a separate container above everything.
//!
//! # Dispatch
//!
//! Public operations enqueue work and drain the queue before returning.
//! Work produced while draining (root opens, deeplink children, cascaded
//! closes, flow steps) is appended and handled in order. If any item
//! fails, the remaining work is dropped and the error is returned; changes
//! already applied stay applied.
//!
//! # Invariants
//!
//! - Every destination in a backstack has exactly one context, and vice versa
//! - A context's nested state is torn down before its own executor `close`
//! - Pending results live in the opener's context and die with it
//! - Mutations check the owner thread; queries do not

mod dispatch;
mod persist;

use std::collections::{HashMap, VecDeque};

use tokio::sync::watch;
use tracing::debug;

use crate::core::errors::NavigationError;
use crate::core::instruction::{Direction, Instruction, OpenInstruction};
use crate::core::types::{
    AnyKey, ContainerKey, ContextId, InstructionId, KeyType, NavigationKey, ResultType,
    ResultValue, WithResult,
};

use super::binding::BindingRegistry;
use super::container::{Container, ContainerSpec, Placement};
use super::flow::{FlowDriver, FlowId, NavigationFlow};
use super::guard::ThreadGuard;
use super::interceptor::InterceptorChain;
use super::manager::{ContainerManager, ManagerSnapshot};
use super::report::{DispatchReport, NavigationEvent};
use super::result::{
    PendingAction, PendingResult, PendingResults, ResultChannel, ResultChannelId, ResultEvent,
    ResultReceiver,
};
use super::NavigatorOptions;

/// One context in the navigation tree.
struct ContextNode {
    /// The instruction that opened it; `None` for the root.
    instruction: Option<OpenInstruction>,
    /// Where it lives; `None` for the root.
    placement: Option<Placement>,
    /// The context that dispatched its open. Restored destinations have none.
    opened_from: Option<ContextId>,
    manager: ContainerManager,
    pending: PendingResults,
    channels: HashMap<ResultChannelId, ResultChannel>,
    flows: HashMap<FlowId, Box<dyn FlowDriver>>,
}

impl ContextNode {
    fn root() -> Self {
        Self::with_manager(None, None, None, ContainerManager::new())
    }

    fn with_manager(
        instruction: Option<OpenInstruction>,
        placement: Option<Placement>,
        opened_from: Option<ContextId>,
        manager: ContainerManager,
    ) -> Self {
        Self {
            instruction,
            placement,
            opened_from,
            manager,
            pending: PendingResults::new(),
            channels: HashMap::new(),
            flows: HashMap::new(),
        }
    }
}

/// Queued unit of work.
enum Work {
    Dispatch {
        from: ContextId,
        instruction: Instruction,
        pending: Option<PendingResult>,
    },
    OpenRoot {
        context: ContextId,
        container: ContainerKey,
    },
    ResumeFlow {
        owner: ContextId,
        flow: FlowId,
    },
}

/// Owns navigation state and applies instructions to it.
pub struct Navigator {
    options: NavigatorOptions,
    bindings: BindingRegistry,
    interceptors: InterceptorChain,
    nodes: HashMap<ContextId, ContextNode>,
    presented: Container,
    guard: ThreadGuard,
    queue: VecDeque<Work>,
    channel_owners: HashMap<ResultChannelId, ContextId>,
    next_channel: u64,
    next_flow: u64,
    root_close_requested: bool,
}

impl Navigator {
    /// A navigator with an empty root context, owned by the current thread.
    pub fn new(bindings: BindingRegistry, options: NavigatorOptions) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ContextId::Root, ContextNode::root());
        Self {
            options,
            bindings,
            interceptors: InterceptorChain::new(),
            nodes,
            presented: Container::presentation(),
            guard: ThreadGuard::new(),
            queue: VecDeque::new(),
            channel_owners: HashMap::new(),
            next_channel: 0,
            next_flow: 0,
            root_close_requested: false,
        }
    }

    /// Runtime options.
    pub fn options(&self) -> &NavigatorOptions {
        &self.options
    }

    /// Registered bindings.
    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    /// Registered interceptors.
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    /// Register or remove interceptors.
    pub fn interceptors_mut(&mut self) -> &mut InterceptorChain {
        &mut self.interceptors
    }

    /// Make the current thread the owner of navigation state.
    pub fn adopt_current_thread(&mut self) {
        self.guard.adopt();
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    /// Add a top-level container. The first one added becomes active. If
    /// the container declares a root, it is opened immediately.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNavigationContainer` if the key is taken, or any
    /// error raised while opening the root.
    pub fn add_root_container(
        &mut self,
        spec: ContainerSpec,
    ) -> Result<DispatchReport, NavigationError> {
        self.add_container(ContextId::Root, spec)
    }

    /// Add a container to a context's manager.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContext`, `DuplicateNavigationContainer`, or any
    /// error raised while opening the root.
    pub fn add_container(
        &mut self,
        context: ContextId,
        spec: ContainerSpec,
    ) -> Result<DispatchReport, NavigationError> {
        self.check_thread("add_container")?;
        let key = spec.key().clone();
        let has_root = spec.root_key_ref().is_some();
        self.node_mut(context)?
            .manager
            .add(Container::from_spec(spec))?;
        debug!(%context, container = %key, "container added");
        if has_root {
            self.queue.push_back(Work::OpenRoot {
                context,
                container: key,
            });
        }
        self.run()
    }

    /// Remove a container, tearing down every destination in it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContext` or `UnknownContainer`.
    pub fn remove_container(
        &mut self,
        context: ContextId,
        key: &ContainerKey,
    ) -> Result<DispatchReport, NavigationError> {
        self.check_thread("remove_container")?;
        let removed = self
            .node_mut(context)?
            .manager
            .remove(key)
            .ok_or_else(|| NavigationError::UnknownContainer(key.clone()))?;
        let mut report = DispatchReport::new();
        let placement = Placement::Container {
            context,
            container: key.clone(),
        };
        for entry in removed.backstack().iter().rev() {
            self.discard_destination(entry, &placement, &mut report);
        }
        debug!(%context, container = %key, "container removed");
        Ok(report)
    }

    /// Make a container active in its manager.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContext` or `UnknownContainer`.
    pub fn set_active(
        &mut self,
        context: ContextId,
        key: &ContainerKey,
    ) -> Result<DispatchReport, NavigationError> {
        self.check_thread("set_active")?;
        let mut report = DispatchReport::new();
        if self.node_mut(context)?.manager.set_active(key)? {
            report.push(NavigationEvent::ActiveChanged {
                context,
                container: key.clone(),
            });
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Instructions
    // ------------------------------------------------------------------

    /// Dispatch an instruction from a context.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while applying the instruction or
    /// any work it produced.
    pub fn dispatch(
        &mut self,
        from: ContextId,
        instruction: Instruction,
    ) -> Result<DispatchReport, NavigationError> {
        self.check_thread("dispatch")?;
        debug!(%from, kind = %instruction.kind(), "dispatch");
        self.queue.push_back(Work::Dispatch {
            from,
            instruction,
            pending: None,
        });
        self.run()
    }

    /// Push a typed key.
    ///
    /// # Errors
    ///
    /// See [`Navigator::dispatch`].
    pub fn push<K: NavigationKey>(
        &mut self,
        from: ContextId,
        key: &K,
    ) -> Result<DispatchReport, NavigationError> {
        self.dispatch(from, Instruction::push(key)?)
    }

    /// Present a typed key.
    ///
    /// # Errors
    ///
    /// See [`Navigator::dispatch`].
    pub fn present<K: NavigationKey>(
        &mut self,
        from: ContextId,
        key: &K,
    ) -> Result<DispatchReport, NavigationError> {
        self.dispatch(from, Instruction::present(key)?)
    }

    /// Replace the target container's backstack with a typed key.
    ///
    /// # Errors
    ///
    /// See [`Navigator::dispatch`].
    pub fn replace_root<K: NavigationKey>(
        &mut self,
        from: ContextId,
        key: &K,
    ) -> Result<DispatchReport, NavigationError> {
        self.dispatch(from, Instruction::replace_root(key)?)
    }

    /// Open an erased key, using its binding's descriptor for capability
    /// checks.
    ///
    /// # Errors
    ///
    /// Returns `MissingNavigationBinding` or `InvalidDirectionForKey`, or
    /// see [`Navigator::dispatch`].
    pub fn open_key(
        &mut self,
        from: ContextId,
        direction: Direction,
        key: AnyKey,
    ) -> Result<DispatchReport, NavigationError> {
        let open = self.instruction_for(direction, key)?;
        self.dispatch(from, Instruction::Open(open))
    }

    /// Build an open instruction for an erased key from its binding.
    ///
    /// # Errors
    ///
    /// Returns `MissingNavigationBinding` or `InvalidDirectionForKey`.
    pub fn instruction_for(
        &self,
        direction: Direction,
        key: AnyKey,
    ) -> Result<OpenInstruction, NavigationError> {
        let binding = self.bindings.get(key.key_type())?;
        OpenInstruction::from_descriptor(direction, key, binding.descriptor())
    }

    /// Close a destination.
    ///
    /// # Errors
    ///
    /// See [`Navigator::dispatch`].
    pub fn close(&mut self, context: ContextId) -> Result<DispatchReport, NavigationError> {
        self.dispatch(context, Instruction::Close)
    }

    /// Close a destination with a typed result.
    ///
    /// # Errors
    ///
    /// See [`Navigator::dispatch`].
    pub fn close_with_result<R: ResultValue>(
        &mut self,
        context: ContextId,
        result: &R,
    ) -> Result<DispatchReport, NavigationError> {
        self.dispatch(context, Instruction::close_with_result(result)?)
    }

    /// Ask a destination to close; its binding may veto.
    ///
    /// # Errors
    ///
    /// See [`Navigator::dispatch`].
    pub fn request_close(&mut self, context: ContextId) -> Result<DispatchReport, NavigationError> {
        self.dispatch(context, Instruction::RequestClose)
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Open a key and call `on_result` once when its destination closes.
    ///
    /// Returns the id of the opened instruction. The callback is dropped
    /// without being called if `from` is torn down first.
    ///
    /// # Errors
    ///
    /// See [`Navigator::dispatch`].
    pub fn open_for_result<K, F>(
        &mut self,
        from: ContextId,
        direction: Direction,
        key: &K,
        on_result: F,
    ) -> Result<(InstructionId, DispatchReport), NavigationError>
    where
        K: WithResult,
        F: FnOnce(ResultEvent<K::Result>) + Send + 'static,
    {
        let open = OpenInstruction::new(direction, key)?;
        let id = open.id();
        let pending = PendingResult::callback::<K::Result, _>(id, on_result)?;
        Ok((id, self.dispatch_with_pending(from, open, pending)?))
    }

    /// Open a key and return a future resolving when its destination
    /// closes, or to [`ResultEvent::Cancelled`] if the wait is abandoned.
    ///
    /// # Errors
    ///
    /// See [`Navigator::dispatch`].
    pub fn open_for_result_future<K: WithResult>(
        &mut self,
        from: ContextId,
        direction: Direction,
        key: &K,
    ) -> Result<(ResultReceiver<K::Result>, DispatchReport), NavigationError> {
        let open = OpenInstruction::new(direction, key)?;
        let (pending, receiver) = PendingResult::future::<K::Result>(open.id())?;
        Ok((receiver, self.dispatch_with_pending(from, open, pending)?))
    }

    /// Register a reusable result channel owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContext` if the owner does not exist.
    pub fn register_result_channel<K, F, C>(
        &mut self,
        owner: ContextId,
        on_result: F,
        on_closed: C,
    ) -> Result<ResultChannelId, NavigationError>
    where
        K: WithResult,
        F: Fn(K::Result) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        self.check_thread("register_result_channel")?;
        self.node(owner)?;
        self.next_channel += 1;
        let id = ResultChannelId(self.next_channel);
        let channel = ResultChannel::typed::<K::Result, _>(
            id,
            owner,
            on_result,
            Some(std::sync::Arc::new(on_closed)),
        )?;
        self.node_mut(owner)?.channels.insert(id, channel);
        self.channel_owners.insert(id, owner);
        debug!(channel = %id, %owner, "result channel registered");
        Ok(id)
    }

    /// Open a key whose result is routed to a channel.
    ///
    /// # Errors
    ///
    /// Returns `ResultChannelIsNotInitialised` if the channel was never
    /// registered or its owner is gone, `ReceivedIncorrectlyTypedResult` if
    /// the key's result type differs from the channel's, or see
    /// [`Navigator::dispatch`].
    pub fn open_with_channel<K: WithResult>(
        &mut self,
        channel: ResultChannelId,
        direction: Direction,
        key: &K,
    ) -> Result<(InstructionId, DispatchReport), NavigationError> {
        let owner = self.channel_owner(channel)?;
        let expected = self
            .nodes
            .get(&owner)
            .and_then(|node| node.channels.get(&channel))
            .map(|c| c.expected().clone())
            .ok_or_else(|| NavigationError::ResultChannelIsNotInitialised(channel.to_string()))?;
        let received = ResultType::new(<K::Result as ResultValue>::RESULT_TYPE)?;
        if received != expected {
            return Err(NavigationError::ReceivedIncorrectlyTypedResult { expected, received });
        }
        let open = OpenInstruction::new(direction, key)?;
        let id = open.id();
        let pending = PendingResult::new(id, expected, PendingAction::Channel(channel));
        Ok((id, self.dispatch_with_pending(owner, open, pending)?))
    }

    /// Start a flow owned by `owner` and open its first step.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContext` if the owner does not exist, or any error
    /// raised opening the first step.
    pub fn start_flow<T: Send + 'static>(
        &mut self,
        owner: ContextId,
        flow: NavigationFlow<T>,
    ) -> Result<(FlowId, DispatchReport), NavigationError> {
        self.check_thread("start_flow")?;
        self.next_flow += 1;
        let id = FlowId(self.next_flow);
        self.node_mut(owner)?.flows.insert(id, Box::new(flow));
        debug!(flow = %id, %owner, "flow started");
        self.queue.push_back(Work::ResumeFlow { owner, flow: id });
        Ok((id, self.run()?))
    }

    /// Whether a flow is still running.
    pub fn is_flow_active(&self, owner: ContextId, flow: FlowId) -> bool {
        self.nodes
            .get(&owner)
            .is_some_and(|node| node.flows.contains_key(&flow))
    }

    fn dispatch_with_pending(
        &mut self,
        from: ContextId,
        open: OpenInstruction,
        pending: PendingResult,
    ) -> Result<DispatchReport, NavigationError> {
        self.check_thread("dispatch")?;
        debug!(%from, id = %open.id(), "dispatch awaiting result");
        self.queue.push_back(Work::Dispatch {
            from,
            instruction: Instruction::Open(open),
            pending: Some(pending),
        });
        self.run()
    }

    fn channel_owner(&self, channel: ResultChannelId) -> Result<ContextId, NavigationError> {
        self.channel_owners
            .get(&channel)
            .copied()
            .ok_or_else(|| NavigationError::ResultChannelIsNotInitialised(channel.to_string()))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether the context exists.
    pub fn contains(&self, context: ContextId) -> bool {
        self.nodes.contains_key(&context)
    }

    /// Number of live destinations.
    pub fn destination_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// A context's container manager.
    pub fn manager(&self, context: ContextId) -> Option<&ContainerManager> {
        self.nodes.get(&context).map(|node| &node.manager)
    }

    /// A container in a context's manager.
    pub fn container(&self, context: ContextId, key: &ContainerKey) -> Option<&Container> {
        self.manager(context).and_then(|m| m.get(key))
    }

    /// The presentation layer.
    pub fn presented(&self) -> &Container {
        &self.presented
    }

    /// The instruction that opened a destination.
    pub fn instruction(&self, context: ContextId) -> Option<&OpenInstruction> {
        self.nodes
            .get(&context)
            .and_then(|node| node.instruction.as_ref())
    }

    /// Where a destination lives.
    pub fn placement(&self, context: ContextId) -> Option<&Placement> {
        self.nodes
            .get(&context)
            .and_then(|node| node.placement.as_ref())
    }

    /// Decode a destination's key as `K`.
    ///
    /// # Errors
    ///
    /// Returns `IncorrectlyTypedNavigationHandle` if the context is the
    /// root, does not exist, or was not opened with a `K`. Returns
    /// `InvalidValue` if `K::KEY_TYPE` is not a valid identifier.
    pub fn key<K: NavigationKey>(&self, context: ContextId) -> Result<K, NavigationError> {
        let expected = KeyType::new(K::KEY_TYPE)?;
        self.instruction(context)
            .and_then(|i| i.key().decode::<K>())
            .ok_or(NavigationError::IncorrectlyTypedNavigationHandle { context, expected })
    }

    /// The active destination in a context's active container.
    pub fn active_child(&self, context: ContextId) -> Option<ContextId> {
        self.manager(context)
            .and_then(|m| m.active())
            .and_then(|c| c.backstack().active())
            .map(|i| ContextId::from(i.id()))
    }

    /// The deepest active destination: the top of the presentation layer
    /// if anything is presented, otherwise the active chain from the root.
    pub fn deepest_active(&self) -> ContextId {
        let mut current = match self.presented.backstack().active() {
            Some(top) => ContextId::from(top.id()),
            None => ContextId::Root,
        };
        while let Some(next) = self.active_child(current) {
            current = next;
        }
        current
    }

    /// Instruction ids a context is awaiting results for.
    pub fn pending_results(&self, context: ContextId) -> Vec<InstructionId> {
        self.nodes
            .get(&context)
            .map(|node| node.pending.ids())
            .unwrap_or_default()
    }

    /// Subscribe to a context's manager snapshots.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContext` if the context does not exist.
    pub fn subscribe(
        &self,
        context: ContextId,
    ) -> Result<watch::Receiver<ManagerSnapshot>, NavigationError> {
        Ok(self.node(context)?.manager.subscribe())
    }

    /// Whether a close has cascaded to the root since the last
    /// acknowledgement.
    pub fn is_root_close_requested(&self) -> bool {
        self.root_close_requested
    }

    /// Clear the root close flag.
    pub fn acknowledge_root_close(&mut self) {
        self.root_close_requested = false;
    }

    // ------------------------------------------------------------------
    // Internals shared with dispatch and persistence
    // ------------------------------------------------------------------

    fn check_thread(&self, operation: &str) -> Result<(), NavigationError> {
        self.guard.check(self.options.strict, operation)
    }

    fn node(&self, context: ContextId) -> Result<&ContextNode, NavigationError> {
        self.nodes
            .get(&context)
            .ok_or(NavigationError::UnknownContext(context))
    }

    fn node_mut(&mut self, context: ContextId) -> Result<&mut ContextNode, NavigationError> {
        self.nodes
            .get_mut(&context)
            .ok_or(NavigationError::UnknownContext(context))
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("options", &self.options)
            .field("destinations", &self.destination_count())
            .field("presented", &self.presented.backstack().len())
            .field("root_close_requested", &self.root_close_requested)
            .finish_non_exhaustive()
    }
}
