//! engine::navigator::dispatch
//!
//! Draining the work queue: interception, routing, container mutation,
//! executor hooks, result delivery and teardown.

use tracing::{debug, info, warn};

use crate::core::backstack::Backstack;
use crate::core::capabilities::CapabilitySet;
use crate::core::errors::NavigationError;
use crate::core::instruction::{ContainerTarget, Direction, Instruction, OpenInstruction};
use crate::core::types::{AnyKey, AnyResult, ContainerKey, ContextId, InstructionId};

use crate::engine::binding::ExecutorContext;
use crate::engine::container::{Container, Placement};
use crate::engine::flow::{FlowId, FlowProgress};
use crate::engine::interceptor::{CloseEvent, InterceptorDecision, OpenEvent};
use crate::engine::manager::{ContainerManager, EmptyResolution};
use crate::engine::report::{DispatchReport, NavigationEvent};
use crate::engine::result::{Delivery, PendingAction, PendingResult};
use super::{ContextNode, Navigator, Work};

impl Navigator {
    /// Drain the queue.
    pub(super) fn run(&mut self) -> Result<DispatchReport, NavigationError> {
        let mut report = DispatchReport::new();
        while let Some(work) = self.queue.pop_front() {
            let outcome = match work {
                Work::Dispatch {
                    from,
                    instruction,
                    pending,
                } => self.process_dispatch(from, instruction, pending, &mut report),
                Work::OpenRoot { context, container } => {
                    self.process_open_root(context, &container, &mut report)
                }
                Work::ResumeFlow { owner, flow } => {
                    self.process_resume_flow(owner, flow, &mut report)
                }
            };
            if let Err(error) = outcome {
                let dropped = self.queue.len();
                self.queue.clear();
                debug!(%error, dropped, "dispatch failed");
                return Err(error);
            }
        }
        Ok(report)
    }

    fn process_dispatch(
        &mut self,
        from: ContextId,
        instruction: Instruction,
        pending: Option<PendingResult>,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        self.node(from)?;

        let mut current = instruction;
        let mut pending = pending;
        let mut substitutions = 0u32;
        loop {
            match self.intercept(from, &current)? {
                InterceptorDecision::Continue => break,
                InterceptorDecision::Cancel => {
                    debug!(%from, kind = %current.kind(), "instruction cancelled by interceptor");
                    report.push(NavigationEvent::Cancelled {
                        from,
                        kind: current.kind(),
                    });
                    if let Some(pending) = pending {
                        self.abandon_pending(from, pending, report);
                    }
                    return Ok(());
                }
                InterceptorDecision::ReplaceWith(next) => {
                    substitutions += 1;
                    if substitutions > self.options.max_substitutions {
                        return Err(NavigationError::UnreachableState(format!(
                            "interceptors substituted an instruction from {from} more than {} times",
                            self.options.max_substitutions
                        )));
                    }
                    debug!(%from, replaced = %current.kind(), with = %next.kind(), "instruction substituted");
                    report.push(NavigationEvent::Substituted {
                        from,
                        kind: current.kind(),
                    });
                    pending = match (&next, pending) {
                        (Instruction::Open(open), Some(p)) => Some(p.rekeyed(open.id())),
                        (_, Some(p)) => {
                            self.abandon_pending(from, p, report);
                            None
                        }
                        (_, None) => None,
                    };
                    current = next;
                }
            }
        }

        match current {
            Instruction::Open(open) => self.apply_open(from, open, pending, report),
            Instruction::Close => self.apply_close(from, None, report),
            Instruction::CloseWithResult { result } => self.apply_close(from, Some(result), report),
            Instruction::RequestClose => self.apply_request_close(from, report),
        }
    }

    fn intercept(
        &self,
        from: ContextId,
        instruction: &Instruction,
    ) -> Result<InterceptorDecision, NavigationError> {
        if self.interceptors.is_empty() {
            return Ok(InterceptorDecision::Continue);
        }
        let decision = match instruction {
            Instruction::Open(open) => self.interceptors.evaluate_open(&OpenEvent {
                from,
                instruction: open,
            })?,
            Instruction::Close | Instruction::CloseWithResult { .. } => {
                let Some(opened_by) = self.node(from)?.instruction.as_ref() else {
                    return Ok(InterceptorDecision::Continue);
                };
                let result = match instruction {
                    Instruction::CloseWithResult { result } => Some(result),
                    _ => None,
                };
                self.interceptors.evaluate_close(&CloseEvent {
                    context: from,
                    opened_by,
                    result,
                })?
            }
            Instruction::RequestClose => InterceptorDecision::Continue,
        };
        Ok(decision)
    }

    // ------------------------------------------------------------------
    // Close
    // ------------------------------------------------------------------

    fn apply_request_close(
        &mut self,
        from: ContextId,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let Some(id) = from.instruction_id() else {
            self.request_root_close(None, report);
            return Ok(());
        };
        let instruction = self.opened_by(from)?;
        let allowed = self
            .bindings
            .get(instruction.key().key_type())?
            .close_request_policy()
            .allows(&instruction);
        if allowed {
            self.queue.push_back(Work::Dispatch {
                from,
                instruction: Instruction::Close,
                pending: None,
            });
        } else {
            debug!(%id, "close request vetoed");
            report.push(NavigationEvent::Vetoed { id });
        }
        Ok(())
    }

    fn apply_close(
        &mut self,
        from: ContextId,
        result: Option<AnyResult>,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let Some(id) = from.instruction_id() else {
            self.request_root_close(None, report);
            return Ok(());
        };
        let instruction = self.opened_by(from)?;
        let node = self.node(from)?;
        let placement = node
            .placement
            .clone()
            .ok_or_else(|| NavigationError::UnreachableState(format!("{from} has no placement")))?;
        let opener = node.opened_from;

        let delivery = match result {
            Some(result) => Delivery::Result(result),
            None => Delivery::Closed,
        };
        if let Some(opener) = opener {
            self.deliver(opener, id, delivery, report)?;
        }

        let current = self.backstack_at(&placement)?;
        if !current.contains(id) {
            return Err(NavigationError::UnreachableState(format!(
                "{from} is not in {placement}"
            )));
        }
        let proposed = current.close(id);

        match self.resolve_empty(&placement, &proposed)? {
            EmptyResolution::Commit => {
                self.commit_close(from, &instruction, &placement, proposed, report)
            }
            EmptyResolution::Suppress => {
                debug!(%placement, "empty behavior kept the last destination");
                report.push(NavigationEvent::EmptySuppressed { placement });
                Ok(())
            }
            EmptyResolution::CloseParent { force } => {
                match placement.context() {
                    Some(ContextId::Destination(parent)) => {
                        debug!(%placement, %parent, force, "container asked its parent to close");
                        report.push(NavigationEvent::ParentCloseRequested {
                            placement,
                            parent,
                            force,
                        });
                        self.queue.push_back(Work::Dispatch {
                            from: ContextId::Destination(parent),
                            instruction: if force {
                                Instruction::Close
                            } else {
                                Instruction::RequestClose
                            },
                            pending: None,
                        });
                    }
                    Some(ContextId::Root) | None => {
                        self.request_root_close(Some(placement.container_key()), report);
                    }
                }
                Ok(())
            }
        }
    }

    fn commit_close(
        &mut self,
        context: ContextId,
        instruction: &OpenInstruction,
        placement: &Placement,
        proposed: Backstack,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let executor = self
            .bindings
            .get(instruction.key().key_type())?
            .executor_handle();
        let opener = self.nodes.get(&context).and_then(|n| n.opened_from);
        let ctx = ExecutorContext {
            instruction,
            from: opener,
            placement,
        };

        executor.pre_closed(&ctx);
        self.commit_backstack(placement, proposed)?;
        self.teardown(context, report);
        executor.close(&ctx);

        debug!(id = %instruction.id(), key = %instruction.key(), %placement, "closed");
        report.push(NavigationEvent::Closed {
            id: instruction.id(),
            key: instruction.key().clone(),
            placement: placement.clone(),
        });

        if let (Placement::Container { context: host, .. }, Some(previous)) =
            (placement, instruction.previously_active_container())
        {
            self.restore_active(*host, previous, report)?;
        }
        Ok(())
    }

    fn restore_active(
        &mut self,
        host: ContextId,
        previous: &ContainerKey,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let Some(node) = self.nodes.get_mut(&host) else {
            return Ok(());
        };
        if node.manager.contains(previous) && node.manager.set_active(previous)? {
            report.push(NavigationEvent::ActiveChanged {
                context: host,
                container: previous.clone(),
            });
        }
        Ok(())
    }

    fn request_root_close(&mut self, container: Option<ContainerKey>, report: &mut DispatchReport) {
        info!(container = ?container.as_ref().map(ContainerKey::as_str), "close requested on the root context");
        self.root_close_requested = true;
        report.push(NavigationEvent::RootCloseRequested { container });
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    fn deliver(
        &mut self,
        opener: ContextId,
        id: InstructionId,
        delivery: Delivery,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let Some(node) = self.nodes.get_mut(&opener) else {
            return Ok(());
        };
        let Some(pending) = node.pending.take(id) else {
            return Ok(());
        };
        pending.check(&delivery)?;
        let result_type = match &delivery {
            Delivery::Result(result) => Some(result.result_type().clone()),
            Delivery::Closed => None,
        };

        match pending.into_action() {
            PendingAction::Callback(callback) => callback(delivery)?,
            PendingAction::Channel(channel) => node
                .channels
                .get(&channel)
                .ok_or_else(|| NavigationError::ResultChannelIsNotInitialised(channel.to_string()))?
                .deliver(delivery)?,
            PendingAction::Flow { flow, step } => match delivery {
                Delivery::Result(result) => {
                    if let Some(driver) = node.flows.get_mut(&flow) {
                        driver.record(step, result);
                        self.queue.push_back(Work::ResumeFlow {
                            owner: opener,
                            flow,
                        });
                    }
                }
                Delivery::Closed => {
                    if let Some(mut driver) = node.flows.remove(&flow) {
                        driver.cancel();
                        debug!(%flow, step, "flow step closed without a result");
                        report.push(NavigationEvent::FlowCancelled { flow });
                    }
                }
            },
        }

        debug!(%id, %opener, "result delivered");
        report.push(NavigationEvent::ResultDelivered { id, result_type });
        Ok(())
    }

    /// Drop a pending result without running it. Flow steps cancel their
    /// flow; callbacks and futures are simply dropped.
    fn abandon_pending(
        &mut self,
        owner: ContextId,
        pending: PendingResult,
        report: &mut DispatchReport,
    ) {
        if let PendingAction::Flow { flow, .. } = pending.into_action() {
            self.cancel_flow(owner, flow, report);
        }
    }

    fn cancel_flow(&mut self, owner: ContextId, flow: FlowId, report: &mut DispatchReport) {
        let Some(node) = self.nodes.get_mut(&owner) else {
            return;
        };
        if let Some(mut driver) = node.flows.remove(&flow) {
            driver.cancel();
            debug!(%flow, %owner, "flow cancelled");
            report.push(NavigationEvent::FlowCancelled { flow });
        }
    }

    // ------------------------------------------------------------------
    // Open
    // ------------------------------------------------------------------

    fn apply_open(
        &mut self,
        from: ContextId,
        open: OpenInstruction,
        pending: Option<PendingResult>,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let binding = self.bindings.get(open.key().key_type())?.clone();
        let requested = open.direction();
        if !requested.is_permitted_by(binding.descriptor().capabilities()) {
            return Err(NavigationError::InvalidDirectionForKey {
                key_type: open.key().key_type().clone(),
                direction: requested,
            });
        }
        let context = ContextId::from(open.id());
        if self.nodes.contains_key(&context) {
            return Err(NavigationError::DuplicateInstructionId(open.id()));
        }

        let mut open = open;
        let children = open.take_children();
        let (open, placement) = self.place(from, open, binding.descriptor().capabilities(), report)?;
        let open = self.stamp_previously_active(open, &placement);

        let manager = ContainerManager::with_containers(
            binding
                .containers()
                .iter()
                .cloned()
                .map(Container::from_spec),
        )?;

        if let Some(pending) = pending {
            self.node_mut(from)?.pending.insert(pending);
        }

        let executor = binding.executor_handle();
        let ctx = ExecutorContext {
            instruction: &open,
            from: Some(from),
            placement: &placement,
        };
        executor.pre_opened(&ctx);

        if open.direction() == Direction::ReplaceRoot && placement != Placement::Presentation {
            let previous = self.commit_backstack(&placement, Backstack::single(open.clone()))?;
            for entry in previous.iter().rev() {
                self.discard_destination(entry, &placement, report);
            }
        } else {
            let proposed = self.backstack_at(&placement)?.push(open.clone())?;
            self.commit_backstack(&placement, proposed)?;
        }

        let nested = manager.keys();
        self.nodes.insert(
            context,
            ContextNode::with_manager(
                Some(open.clone()),
                Some(placement.clone()),
                Some(from),
                manager,
            ),
        );
        executor.open(&ctx);

        if let Placement::Container {
            context: host,
            container,
        } = &placement
        {
            if self.node_mut(*host)?.manager.set_active(container)? {
                report.push(NavigationEvent::ActiveChanged {
                    context: *host,
                    container: container.clone(),
                });
            }
        }
        executor.post_opened(&ctx);

        debug!(id = %open.id(), key = %open.key(), direction = %open.direction(), %placement, "opened");
        report.push(NavigationEvent::Opened {
            id: open.id(),
            key: open.key().clone(),
            direction: open.direction(),
            placement,
        });

        for container in nested {
            self.queue.push_back(Work::OpenRoot { context, container });
        }
        if let Some(child) = self.chain_children(open.id(), children)? {
            self.queue.push_back(Work::Dispatch {
                from: context,
                instruction: Instruction::Open(child),
                pending: None,
            });
        }
        if requested == Direction::Replace && !from.is_root() {
            self.queue.push_back(Work::Dispatch {
                from,
                instruction: Instruction::Close,
                pending: None,
            });
        }
        Ok(())
    }

    /// Decide where an open lands, resolving legacy directions.
    fn place(
        &self,
        from: ContextId,
        open: OpenInstruction,
        capabilities: &CapabilitySet,
        report: &mut DispatchReport,
    ) -> Result<(OpenInstruction, Placement), NavigationError> {
        match open.direction() {
            Direction::Present => Ok((open, Placement::Presentation)),
            Direction::Push | Direction::ReplaceRoot => match self.route(from, &open)? {
                Some(placement) => Ok((open, placement)),
                None if self.options.strict => {
                    Err(NavigationError::MissingContainerForPushInstruction {
                        key_type: open.key().key_type().clone(),
                        direction: open.direction(),
                    })
                }
                None => {
                    warn!(
                        key = %open.key(),
                        direction = %open.direction(),
                        %from,
                        "no container accepts this key; presenting instead"
                    );
                    report.push(NavigationEvent::Fallback {
                        id: open.id(),
                        requested: open.direction(),
                    });
                    Ok((open.retargeted(Direction::Present), Placement::Presentation))
                }
            },
            Direction::Forward | Direction::Replace => {
                let routed = if Direction::Push.is_permitted_by(capabilities) {
                    self.route(from, &open)?
                } else {
                    None
                };
                Ok(match routed {
                    Some(placement) => (open.retargeted(Direction::Push), placement),
                    None => (open.retargeted(Direction::Present), Placement::Presentation),
                })
            }
        }
    }

    /// Find the container for a push, walking outward from `from`.
    fn route(
        &self,
        from: ContextId,
        open: &OpenInstruction,
    ) -> Result<Option<Placement>, NavigationError> {
        let key = open.key();
        if let ContainerTarget::ParentContainer = open.target() {
            return Ok(match &self.node(from)?.placement {
                Some(placement @ Placement::Container { context, container })
                    if self.accepts(*context, container, key) =>
                {
                    Some(placement.clone())
                }
                _ => None,
            });
        }

        for context in self.ancestry(from)? {
            let Some(node) = self.nodes.get(&context) else {
                continue;
            };
            let manager = &node.manager;
            let container = match open.target() {
                ContainerTarget::Default => manager.find_accepting(key).cloned(),
                ContainerTarget::ActiveContainer => match manager.active() {
                    Some(active) => {
                        return Ok(active.accepts(key).then(|| Placement::Container {
                            context,
                            container: active.key().clone(),
                        }))
                    }
                    None => None,
                },
                ContainerTarget::Container(wanted) => match manager.get(wanted) {
                    Some(found) => {
                        return Ok(found.accepts(key).then(|| Placement::Container {
                            context,
                            container: wanted.clone(),
                        }))
                    }
                    None => None,
                },
                ContainerTarget::ParentContainer => None,
            };
            if let Some(container) = container {
                return Ok(Some(Placement::Container { context, container }));
            }
        }
        Ok(None)
    }

    /// `from` and every context enclosing it, innermost first. A presented
    /// destination is enclosed by the root.
    fn ancestry(&self, from: ContextId) -> Result<Vec<ContextId>, NavigationError> {
        let mut chain = Vec::new();
        let mut current = Some(from);
        while let Some(context) = current {
            if chain.contains(&context) {
                return Err(NavigationError::UnreachableState(format!(
                    "context cycle through {context}"
                )));
            }
            chain.push(context);
            current = match &self.node(context)?.placement {
                Some(Placement::Container { context, .. }) => Some(*context),
                Some(Placement::Presentation) => Some(ContextId::Root),
                None => None,
            };
        }
        Ok(chain)
    }

    fn accepts(&self, context: ContextId, container: &ContainerKey, key: &AnyKey) -> bool {
        self.nodes
            .get(&context)
            .and_then(|n| n.manager.get(container))
            .is_some_and(|c| c.accepts(key))
    }

    fn stamp_previously_active(
        &self,
        open: OpenInstruction,
        placement: &Placement,
    ) -> OpenInstruction {
        if open.previously_active_container().is_some() {
            return open;
        }
        let Placement::Container { context, .. } = placement else {
            return open;
        };
        match self
            .nodes
            .get(context)
            .and_then(|n| n.manager.active_key())
        {
            Some(active) => open.with_previously_active_container(active.clone()),
            None => open,
        }
    }

    /// Build the first deeplink child, carrying the rest as its own
    /// children.
    fn chain_children(
        &self,
        parent: InstructionId,
        children: Vec<AnyKey>,
    ) -> Result<Option<OpenInstruction>, NavigationError> {
        let mut remaining = children.into_iter();
        let Some(first) = remaining.next() else {
            return Ok(None);
        };
        let descriptor = self.bindings.get(first.key_type())?.descriptor();
        let direction = Direction::preferred_for(descriptor.capabilities());
        let child = OpenInstruction::from_descriptor(direction, first, descriptor)?
            .with_parent_instruction(parent)
            .with_children(remaining);
        Ok(Some(child))
    }

    fn process_open_root(
        &mut self,
        context: ContextId,
        container: &ContainerKey,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let Some(root) = self
            .nodes
            .get_mut(&context)
            .and_then(|n| n.manager.get_mut(container))
            .and_then(|c| c.take_root())
        else {
            return Ok(());
        };
        let descriptor = self.bindings.get(root.key_type())?.descriptor();
        let open = OpenInstruction::from_descriptor(Direction::Push, root, descriptor)?
            .with_target(ContainerTarget::Container(container.clone()));
        debug!(%context, %container, key = %open.key(), "opening container root");

        // Opening a root does not take focus from the active container.
        let active = self.node(context)?.manager.active_key().cloned();
        let mut opened = DispatchReport::new();
        self.process_dispatch(context, Instruction::Open(open), None, &mut opened)?;
        if let Some(active) = active {
            if let Some(node) = self.nodes.get_mut(&context) {
                if node.manager.contains(&active) {
                    node.manager.set_active(&active)?;
                }
            }
            opened.events.retain(|event| {
                !matches!(event, NavigationEvent::ActiveChanged { context: host, .. } if *host == context)
            });
        }
        report.extend(opened);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Flows
    // ------------------------------------------------------------------

    fn process_resume_flow(
        &mut self,
        owner: ContextId,
        flow: FlowId,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let Some(node) = self.nodes.get_mut(&owner) else {
            return Ok(());
        };
        let Some(driver) = node.flows.get_mut(&flow) else {
            return Ok(());
        };
        match driver.resume() {
            FlowProgress::Waiting => Ok(()),
            FlowProgress::Completed => {
                node.flows.remove(&flow);
                debug!(%flow, %owner, "flow completed");
                report.push(NavigationEvent::FlowCompleted { flow });
                Ok(())
            }
            FlowProgress::Failed(error) => {
                node.flows.remove(&flow);
                Err(error)
            }
            FlowProgress::Open(request) => {
                let expected = request
                    .descriptor
                    .result_type()
                    .cloned()
                    .ok_or_else(|| {
                        NavigationError::UnreachableState(format!(
                            "flow step '{}' has no result type",
                            request.key.key_type()
                        ))
                    })?;
                let open =
                    OpenInstruction::from_descriptor(request.direction, request.key, &request.descriptor)?;
                debug!(%flow, step = request.index, key = %open.key(), "opening flow step");
                let pending = PendingResult::new(
                    open.id(),
                    expected,
                    PendingAction::Flow {
                        flow,
                        step: request.index,
                    },
                );
                self.process_dispatch(owner, Instruction::Open(open), Some(pending), report)
            }
        }
    }

    // ------------------------------------------------------------------
    // Teardown and container access
    // ------------------------------------------------------------------

    /// Remove a context and everything nested in it. Pending results the
    /// context awaited die with it; the opener's entry for it is dropped.
    pub(super) fn teardown(&mut self, context: ContextId, report: &mut DispatchReport) {
        let Some(node) = self.nodes.remove(&context) else {
            return;
        };
        for container in node.manager.containers() {
            let placement = Placement::Container {
                context,
                container: container.key().clone(),
            };
            for entry in container.backstack().iter().rev() {
                self.discard_destination(entry, &placement, report);
            }
        }
        for channel in node.channels.keys() {
            self.channel_owners.remove(channel);
        }
        if let (Some(opener), Some(id)) = (node.opened_from, context.instruction_id()) {
            let abandoned = self
                .nodes
                .get_mut(&opener)
                .and_then(|n| n.pending.discard(id));
            if let Some(pending) = abandoned {
                self.abandon_pending(opener, pending, report);
            }
        }
    }

    /// Tear down a destination that leaves without its own close.
    pub(super) fn discard_destination(
        &mut self,
        entry: &OpenInstruction,
        placement: &Placement,
        report: &mut DispatchReport,
    ) {
        let context = ContextId::from(entry.id());
        let executor = self
            .bindings
            .get(entry.key().key_type())
            .ok()
            .map(|b| b.executor_handle());
        let opener = self.nodes.get(&context).and_then(|n| n.opened_from);
        let ctx = ExecutorContext {
            instruction: entry,
            from: opener,
            placement,
        };
        if let Some(executor) = &executor {
            executor.pre_closed(&ctx);
        }
        self.teardown(context, report);
        if let Some(executor) = &executor {
            executor.close(&ctx);
        }
        debug!(id = %entry.id(), key = %entry.key(), "discarded");
        report.push(NavigationEvent::Discarded {
            id: entry.id(),
            key: entry.key().clone(),
        });
    }

    fn opened_by(&self, context: ContextId) -> Result<OpenInstruction, NavigationError> {
        self.node(context)?
            .instruction
            .clone()
            .ok_or_else(|| NavigationError::UnreachableState(format!("{context} has no instruction")))
    }

    pub(super) fn backstack_at(&self, placement: &Placement) -> Result<&Backstack, NavigationError> {
        match placement {
            Placement::Presentation => Ok(self.presented.backstack()),
            Placement::Container { context, container } => self
                .node(*context)?
                .manager
                .get(container)
                .map(|c| c.backstack())
                .ok_or_else(|| NavigationError::UnknownContainer(container.clone())),
        }
    }

    /// Replace a backstack without policies. Returns the previous one.
    pub(super) fn commit_backstack(
        &mut self,
        placement: &Placement,
        backstack: Backstack,
    ) -> Result<Backstack, NavigationError> {
        match placement {
            Placement::Presentation => Ok(self.presented.replace_backstack(backstack)),
            Placement::Container { context, container } => {
                self.node_mut(*context)?.manager.commit(container, backstack)
            }
        }
    }

    fn resolve_empty(
        &mut self,
        placement: &Placement,
        proposed: &Backstack,
    ) -> Result<EmptyResolution, NavigationError> {
        match placement {
            Placement::Presentation => Ok(EmptyResolution::Commit),
            Placement::Container { context, container } => self
                .node_mut(*context)?
                .manager
                .resolve_empty(container, proposed),
        }
    }
}
