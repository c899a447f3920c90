//! engine::navigator::persist
//!
//! Saving and restoring the navigation tree.
//!
//! Restore replaces the backstacks of the containers named in the saved
//! state, recreating a context for every saved entry and running its
//! executor's open hooks. Interceptors are not consulted. Containers that
//! no longer exist are skipped; containers the state does not name keep
//! their current entries.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::core::backstack::Backstack;
use crate::core::errors::NavigationError;
use crate::core::types::{ContainerKey, ContextId, InstructionId};
use crate::engine::binding::ExecutorContext;
use crate::engine::container::{Container, Placement};
use crate::engine::manager::ContainerManager;
use crate::engine::report::{DispatchReport, NavigationEvent};
use crate::state::{SavedContainer, SavedEntry, SavedManager, SavedNavigation};

use super::{ContextNode, Navigator, Work};

impl Navigator {
    /// Snapshot the whole tree.
    pub fn save(&self) -> SavedNavigation {
        SavedNavigation {
            root: self.save_manager(ContextId::Root),
            presented: self.save_container_state(&self.presented),
        }
    }

    /// Snapshot one container and everything nested in it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContext` or `UnknownContainer`.
    pub fn save_container(
        &self,
        context: ContextId,
        key: &ContainerKey,
    ) -> Result<SavedContainer, NavigationError> {
        let container = self
            .node(context)?
            .manager
            .get(key)
            .ok_or_else(|| NavigationError::UnknownContainer(key.clone()))?;
        Ok(self.save_container_state(container))
    }

    fn save_manager(&self, context: ContextId) -> SavedManager {
        let Some(node) = self.nodes.get(&context) else {
            return SavedManager::default();
        };
        SavedManager {
            containers: node
                .manager
                .containers()
                .iter()
                .map(|c| self.save_container_state(c))
                .collect(),
            active: node.manager.active_key().cloned(),
        }
    }

    fn save_container_state(&self, container: &Container) -> SavedContainer {
        SavedContainer {
            key: container.key().clone(),
            entries: container
                .backstack()
                .iter()
                .map(|instruction| {
                    let context = ContextId::from(instruction.id());
                    let child_state = self
                        .nodes
                        .get(&context)
                        .filter(|node| !node.manager.is_empty())
                        .map(|_| self.save_manager(context));
                    SavedEntry {
                        instruction: instruction.clone(),
                        child_state,
                    }
                })
                .collect(),
        }
    }

    /// Replace the tree with saved state.
    ///
    /// # Errors
    ///
    /// Returns `MissingNavigationBinding` if a saved key type is unbound,
    /// or `DuplicateInstructionId` if an id appears twice or belongs to a
    /// live destination that the restore does not replace. Both are
    /// checked before anything changes.
    pub fn restore(&mut self, saved: SavedNavigation) -> Result<DispatchReport, NavigationError> {
        self.check_thread("restore")?;
        let mut entries = Vec::new();
        collect_entries(&saved, &mut entries);
        let mut replaced: Vec<Placement> = saved
            .root
            .containers
            .iter()
            .filter(|c| self.node(ContextId::Root).is_ok_and(|n| n.manager.contains(&c.key)))
            .map(|c| Placement::Container {
                context: ContextId::Root,
                container: c.key.clone(),
            })
            .collect();
        replaced.push(Placement::Presentation);
        self.validate(&entries, &replaced)?;
        debug!(destinations = saved.len(), "restoring navigation state");

        let mut report = DispatchReport::new();
        // Clear every replaced container first so ids may move between them.
        for placement in &replaced {
            self.clear_placement(placement, &mut report)?;
        }
        self.restore_manager(ContextId::Root, saved.root, &mut report)?;
        self.restore_entries(&Placement::Presentation, saved.presented.entries, &mut report)?;
        report.extend(self.run()?);
        Ok(report)
    }

    /// Replace one container's backstack with saved state. The container
    /// is identified by the saved key.
    ///
    /// # Errors
    ///
    /// Returns `UnknownContext` or `UnknownContainer`, or see
    /// [`Navigator::restore`].
    pub fn restore_container(
        &mut self,
        context: ContextId,
        saved: SavedContainer,
    ) -> Result<DispatchReport, NavigationError> {
        self.check_thread("restore_container")?;
        if !self.node(context)?.manager.contains(&saved.key) {
            return Err(NavigationError::UnknownContainer(saved.key));
        }
        let mut entries = Vec::new();
        collect_container_entries(&saved, &mut entries);
        let placement = Placement::Container {
            context,
            container: saved.key.clone(),
        };
        self.validate(&entries, std::slice::from_ref(&placement))?;

        let mut report = DispatchReport::new();
        self.restore_entries(&placement, saved.entries, &mut report)?;
        report.extend(self.run()?);
        Ok(report)
    }

    /// Saved ids must be unique, and may only reuse a live id when that
    /// destination sits under one of the `replaced` containers.
    fn validate(
        &self,
        entries: &[&SavedEntry],
        replaced: &[Placement],
    ) -> Result<(), NavigationError> {
        let mut replaced_ids = HashSet::new();
        for placement in replaced {
            self.collect_live_ids(placement, &mut replaced_ids);
        }
        let mut seen = HashSet::new();
        for entry in entries {
            let id = entry.instruction.id();
            if !seen.insert(id) {
                return Err(NavigationError::DuplicateInstructionId(id));
            }
            if self.nodes.contains_key(&ContextId::from(id)) && !replaced_ids.contains(&id) {
                return Err(NavigationError::DuplicateInstructionId(id));
            }
            self.bindings.get(entry.instruction.key().key_type())?;
        }
        Ok(())
    }

    fn collect_live_ids(&self, placement: &Placement, ids: &mut HashSet<InstructionId>) {
        let Ok(backstack) = self.backstack_at(placement) else {
            return;
        };
        for instruction in backstack.iter() {
            ids.insert(instruction.id());
            let context = ContextId::from(instruction.id());
            if let Some(node) = self.nodes.get(&context) {
                for container in node.manager.containers() {
                    let nested = Placement::Container {
                        context,
                        container: container.key().clone(),
                    };
                    self.collect_live_ids(&nested, ids);
                }
            }
        }
    }

    fn clear_placement(
        &mut self,
        placement: &Placement,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let previous = self.commit_backstack(placement, Backstack::new())?;
        for entry in previous.iter().rev() {
            self.discard_destination(entry, placement, report);
        }
        Ok(())
    }

    fn restore_manager(
        &mut self,
        context: ContextId,
        saved: SavedManager,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        for container in saved.containers {
            if !self.node(context)?.manager.contains(&container.key) {
                warn!(%context, container = %container.key, "saved container no longer exists; skipping");
                continue;
            }
            let placement = Placement::Container {
                context,
                container: container.key,
            };
            self.restore_entries(&placement, container.entries, report)?;
        }
        if let Some(active) = saved.active {
            let manager = &mut self.node_mut(context)?.manager;
            if manager.contains(&active) && manager.set_active(&active)? {
                report.push(NavigationEvent::ActiveChanged {
                    context,
                    container: active,
                });
            }
        }
        Ok(())
    }

    fn restore_entries(
        &mut self,
        placement: &Placement,
        entries: Vec<SavedEntry>,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        self.clear_placement(placement, report)?;

        let backstack =
            Backstack::from_instructions(entries.iter().map(|e| e.instruction.clone()))?;
        self.commit_backstack(placement, backstack)?;
        if let Placement::Container { context, container } = placement {
            if let Some(container) = self.node_mut(*context)?.manager.get_mut(container) {
                container.mark_root_opened();
            }
        }

        for entry in entries {
            self.restore_entry(placement, entry, report)?;
        }
        Ok(())
    }

    fn restore_entry(
        &mut self,
        placement: &Placement,
        entry: SavedEntry,
        report: &mut DispatchReport,
    ) -> Result<(), NavigationError> {
        let SavedEntry {
            instruction,
            child_state,
        } = entry;
        let context = ContextId::from(instruction.id());
        if self.nodes.contains_key(&context) {
            return Err(NavigationError::DuplicateInstructionId(instruction.id()));
        }
        let binding = self.bindings.get(instruction.key().key_type())?.clone();
        let manager = ContainerManager::with_containers(
            binding.containers().iter().cloned().map(Container::from_spec),
        )?;
        let nested = manager.keys();

        let executor = binding.executor_handle();
        let ctx = ExecutorContext {
            instruction: &instruction,
            from: None,
            placement,
        };
        executor.pre_opened(&ctx);
        self.nodes.insert(
            context,
            ContextNode::with_manager(
                Some(instruction.clone()),
                Some(placement.clone()),
                None,
                manager,
            ),
        );
        executor.open(&ctx);
        executor.post_opened(&ctx);
        report.push(NavigationEvent::Opened {
            id: instruction.id(),
            key: instruction.key().clone(),
            direction: instruction.direction(),
            placement: placement.clone(),
        });

        if let Some(child_state) = child_state {
            self.restore_manager(context, child_state, report)?;
        }
        for container in nested {
            self.queue.push_back(Work::OpenRoot { context, container });
        }
        Ok(())
    }
}

fn collect_entries<'a>(saved: &'a SavedNavigation, entries: &mut Vec<&'a SavedEntry>) {
    collect_manager_entries(&saved.root, entries);
    collect_container_entries(&saved.presented, entries);
}

fn collect_manager_entries<'a>(manager: &'a SavedManager, entries: &mut Vec<&'a SavedEntry>) {
    for container in &manager.containers {
        collect_container_entries(container, entries);
    }
}

fn collect_container_entries<'a>(container: &'a SavedContainer, entries: &mut Vec<&'a SavedEntry>) {
    for entry in &container.entries {
        entries.push(entry);
        if let Some(child) = &entry.child_state {
            collect_manager_entries(child, entries);
        }
    }
}
