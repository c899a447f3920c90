//! engine::report
//!
//! What a dispatch did, in the order it happened.

use serde::Serialize;

use crate::core::instruction::{Direction, InstructionKind};
use crate::core::types::{AnyKey, ContainerKey, ContextId, InstructionId, ResultType};

use super::container::Placement;
use super::flow::FlowId;

/// One observable step of a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NavigationEvent {
    /// A destination was opened.
    Opened {
        id: InstructionId,
        key: AnyKey,
        direction: Direction,
        placement: Placement,
    },
    /// A destination was closed by an instruction.
    Closed {
        id: InstructionId,
        key: AnyKey,
        placement: Placement,
    },
    /// A destination was removed without its own close (replace-root,
    /// parent teardown, restore).
    Discarded { id: InstructionId, key: AnyKey },
    /// An interceptor cancelled an instruction.
    Cancelled {
        from: ContextId,
        kind: InstructionKind,
    },
    /// An interceptor substituted an instruction.
    Substituted {
        from: ContextId,
        kind: InstructionKind,
    },
    /// A destination refused a close request.
    Vetoed { id: InstructionId },
    /// A pending result was resumed.
    ResultDelivered {
        id: InstructionId,
        result_type: Option<ResultType>,
    },
    /// An empty-behavior action kept a container's last entry.
    EmptySuppressed { placement: Placement },
    /// A container asked its parent destination to close.
    ParentCloseRequested {
        placement: Placement,
        parent: InstructionId,
        force: bool,
    },
    /// A close cascaded to the root context. The host application decides
    /// what that means (typically: finish).
    RootCloseRequested { container: Option<ContainerKey> },
    /// A misrouted instruction fell back to the presentation layer.
    Fallback {
        id: InstructionId,
        requested: Direction,
    },
    /// The active container of a manager changed.
    ActiveChanged {
        context: ContextId,
        container: ContainerKey,
    },
    /// A flow produced its value.
    FlowCompleted { flow: FlowId },
    /// A flow was cancelled.
    FlowCancelled { flow: FlowId },
}

/// Events produced by one call into the navigator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    pub events: Vec<NavigationEvent>,
}

impl DispatchReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: NavigationEvent) {
        self.events.push(event);
    }

    /// Ids of destinations opened, in order.
    pub fn opened(&self) -> Vec<InstructionId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                NavigationEvent::Opened { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Ids of destinations closed, in order.
    pub fn closed(&self) -> Vec<InstructionId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                NavigationEvent::Closed { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Whether any instruction was cancelled by an interceptor.
    pub fn was_cancelled(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, NavigationEvent::Cancelled { .. }))
    }

    /// Whether a close cascaded to the root.
    pub fn root_close_requested(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, NavigationEvent::RootCloseRequested { .. }))
    }

    /// Whether nothing happened.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn extend(&mut self, other: DispatchReport) {
        self.events.extend(other.events);
    }
}
