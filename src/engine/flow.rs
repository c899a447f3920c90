//! engine::flow
//!
//! Sequential result composition: open A, await its result, use it to build
//! B, open B, await, and so on.
//!
//! # Replay
//!
//! A flow's body is a plain function over a [`FlowScope`]. Each call to
//! [`FlowScope::push`] names a step. On the first run the step has no
//! record, so the flow suspends and the navigator opens the step's
//! destination. When that destination closes with a result, the result is
//! recorded and the body runs again from the top. Recorded steps return
//! their result immediately, so execution reaches the next unrecorded step.
//!
//! If a step's key differs from its record (because an earlier result
//! changed), that record and every later one are discarded.
//!
//! # Invariants
//!
//! - At most one step is open at a time
//! - A step closed without a result cancels the flow
//! - A flow whose owner is torn down is dropped silently
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use wayfinder::core::capabilities::Capability;
//! use wayfinder::core::types::{NavigationKey, WithResult};
//! use wayfinder::engine::flow::NavigationFlow;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct AskName;
//!
//! impl NavigationKey for AskName {
//!     const KEY_TYPE: &'static str = "demo.AskName";
//!     const CAPABILITIES: &'static [Capability] = &[Capability::Push, Capability::Result];
//! }
//!
//! impl WithResult for AskName {
//!     type Result = String;
//! }
//!
//! let flow = NavigationFlow::new(|scope| {
//!     let name = scope.push("name", || AskName)?;
//!     Ok(format!("hello {name}"))
//! })
//! .on_complete(|greeting| println!("{greeting}"));
//! # let _ = flow;
//! ```

use std::fmt;

use crate::core::capabilities::KeyDescriptor;
use crate::core::errors::NavigationError;
use crate::core::instruction::Direction;
use crate::core::types::{AnyKey, AnyResult, WithResult};

use super::result::decode_result;

/// Handle to a running flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct FlowId(pub(crate) u64);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow #{}", self.0)
    }
}

/// A step destination the navigator should open.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowStepRequest {
    /// Index of the step in the flow's records.
    pub index: usize,
    /// How to open it.
    pub direction: Direction,
    /// The step's key.
    pub key: AnyKey,
    /// The key's type descriptor.
    pub descriptor: KeyDescriptor,
}

#[derive(Debug)]
enum Interrupt {
    Suspend(Option<FlowStepRequest>),
    Failed(NavigationError),
}

/// Why a flow body stopped before producing its value.
///
/// Produced by [`FlowScope`] and propagated with `?`. Bodies can also fail
/// with their own [`NavigationError`].
#[derive(Debug)]
pub struct FlowInterrupt(Interrupt);

impl FlowInterrupt {
    /// Fail the flow.
    pub fn failed(error: NavigationError) -> Self {
        Self(Interrupt::Failed(error))
    }

    /// Whether this interrupt is a suspension (awaiting a step).
    pub fn is_suspended(&self) -> bool {
        matches!(self.0, Interrupt::Suspend(_))
    }
}

impl From<NavigationError> for FlowInterrupt {
    fn from(error: NavigationError) -> Self {
        Self::failed(error)
    }
}

/// The record of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step_id: String,
    pub key: AnyKey,
    pub result: Option<AnyResult>,
}

/// The view of a flow's recorded steps during one run of its body.
#[derive(Debug)]
pub struct FlowScope<'a> {
    records: &'a mut Vec<StepRecord>,
    cursor: usize,
}

impl<'a> FlowScope<'a> {
    fn new(records: &'a mut Vec<StepRecord>) -> Self {
        Self { records, cursor: 0 }
    }

    /// Push a step and return its result, suspending until it arrives.
    pub fn push<K, F>(&mut self, step_id: &str, key: F) -> Result<K::Result, FlowInterrupt>
    where
        K: WithResult,
        F: FnOnce() -> K,
    {
        self.step(Direction::Push, step_id, key)
    }

    /// Present a step and return its result, suspending until it arrives.
    pub fn present<K, F>(&mut self, step_id: &str, key: F) -> Result<K::Result, FlowInterrupt>
    where
        K: WithResult,
        F: FnOnce() -> K,
    {
        self.step(Direction::Present, step_id, key)
    }

    fn step<K, F>(
        &mut self,
        direction: Direction,
        step_id: &str,
        key: F,
    ) -> Result<K::Result, FlowInterrupt>
    where
        K: WithResult,
        F: FnOnce() -> K,
    {
        let key = AnyKey::of(&key()).map_err(NavigationError::from)?;
        let index = self.cursor;
        self.cursor += 1;

        if let Some(record) = self.records.get(index) {
            if record.step_id == step_id && record.key == key {
                return match &record.result {
                    Some(result) => Ok(decode_result::<K::Result>(result)?),
                    None => Err(FlowInterrupt(Interrupt::Suspend(None))),
                };
            }
            self.records.truncate(index);
        }

        let descriptor = KeyDescriptor::of_result::<K>().map_err(NavigationError::from)?;
        self.records.push(StepRecord {
            step_id: step_id.to_string(),
            key: key.clone(),
            result: None,
        });
        Err(FlowInterrupt(Interrupt::Suspend(Some(FlowStepRequest {
            index,
            direction,
            key,
            descriptor,
        }))))
    }
}

/// Progress after running a flow body.
#[derive(Debug)]
pub enum FlowProgress {
    /// Open this step.
    Open(FlowStepRequest),
    /// A step is already open; wait for it.
    Waiting,
    /// The body produced its value.
    Completed,
    /// The body failed.
    Failed(NavigationError),
}

type FlowBody<T> = Box<dyn Fn(&mut FlowScope<'_>) -> Result<T, FlowInterrupt> + Send + Sync>;

/// A replayed, sequential flow producing `T`.
pub struct NavigationFlow<T> {
    body: FlowBody<T>,
    on_complete: Option<Box<dyn FnOnce(T) + Send>>,
    on_cancelled: Option<Box<dyn FnOnce() + Send>>,
    records: Vec<StepRecord>,
}

impl<T: Send + 'static> NavigationFlow<T> {
    /// A flow running `body`.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut FlowScope<'_>) -> Result<T, FlowInterrupt> + Send + Sync + 'static,
    {
        Self {
            body: Box::new(body),
            on_complete: None,
            on_cancelled: None,
            records: Vec::new(),
        }
    }

    /// Called with the value when the body completes.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called when a step closes without a result.
    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_cancelled = Some(Box::new(f));
        self
    }

    /// Recorded steps.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }
}

impl<T> fmt::Debug for NavigationFlow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationFlow")
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

/// Type-erased flow, driven by the navigator.
pub(crate) trait FlowDriver: Send {
    fn resume(&mut self) -> FlowProgress;
    fn record(&mut self, step: usize, result: AnyResult);
    fn cancel(&mut self);
}

impl<T: Send + 'static> FlowDriver for NavigationFlow<T> {
    fn resume(&mut self) -> FlowProgress {
        let outcome = {
            let mut scope = FlowScope::new(&mut self.records);
            (self.body)(&mut scope)
        };
        match outcome {
            Ok(value) => {
                if let Some(on_complete) = self.on_complete.take() {
                    on_complete(value);
                }
                FlowProgress::Completed
            }
            Err(FlowInterrupt(Interrupt::Suspend(Some(request)))) => FlowProgress::Open(request),
            Err(FlowInterrupt(Interrupt::Suspend(None))) => FlowProgress::Waiting,
            Err(FlowInterrupt(Interrupt::Failed(error))) => FlowProgress::Failed(error),
        }
    }

    fn record(&mut self, step: usize, result: AnyResult) {
        if let Some(record) = self.records.get_mut(step) {
            record.result = Some(result);
        }
    }

    fn cancel(&mut self) {
        if let Some(on_cancelled) = self.on_cancelled.take() {
            on_cancelled();
        }
    }
}
