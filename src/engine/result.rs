//! engine::result
//!
//! Correlates a destination's closure with the caller awaiting its result.
//!
//! # Model
//!
//! A [`PendingResult`] is registered in the *caller's* context, keyed by the
//! id of the instruction it opened. When that destination closes, the entry
//! is removed and its action runs exactly once:
//!
//! - a one-shot callback ([`PendingResult::callback`])
//! - a reusable [`ResultChannel`] owned by the caller
//! - a step of a [`crate::engine::flow::NavigationFlow`]
//!
//! Dropping an entry (caller torn down, destination discarded) never
//! invokes the callback. Futures obtained through [`ResultReceiver`] resolve
//! to [`ResultEvent::Cancelled`] instead.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::core::errors::NavigationError;
use crate::core::types::{AnyResult, ContextId, InstructionId, ResultType, ResultValue};

use super::flow::FlowId;

/// What a waiting caller receives.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEvent<R> {
    /// The destination closed with a result.
    Result(R),
    /// The destination closed without a result.
    Closed,
    /// The pending result was dropped before the destination closed.
    Cancelled,
}

impl<R> ResultEvent<R> {
    /// The result, if one was delivered.
    pub fn into_result(self) -> Option<R> {
        match self {
            ResultEvent::Result(value) => Some(value),
            _ => None,
        }
    }
}

/// What closing a destination delivers to its opener.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// `CloseWithResult`
    Result(AnyResult),
    /// `Close`
    Closed,
}

/// Decode an erased result as `R`.
///
/// # Errors
///
/// Returns `ReceivedIncorrectlyTypedResult` if the type token differs or
/// the value does not decode.
pub fn decode_result<R: ResultValue>(result: &AnyResult) -> Result<R, NavigationError> {
    let expected = ResultType::new(R::RESULT_TYPE)?;
    if result.result_type() != &expected {
        return Err(NavigationError::ReceivedIncorrectlyTypedResult {
            expected,
            received: result.result_type().clone(),
        });
    }
    serde_json::from_value(result.value().clone()).map_err(|_| {
        NavigationError::ReceivedIncorrectlyTypedResult {
            expected: expected.clone(),
            received: result.result_type().clone(),
        }
    })
}

type Callback = Box<dyn FnOnce(Delivery) -> Result<(), NavigationError> + Send>;

/// What runs when a pending result resolves.
pub enum PendingAction {
    /// A one-shot callback.
    Callback(Callback),
    /// A reusable channel owned by the caller.
    Channel(ResultChannelId),
    /// A flow step awaiting its result.
    Flow { flow: FlowId, step: usize },
}

impl fmt::Debug for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingAction::Callback(_) => write!(f, "Callback(..)"),
            PendingAction::Channel(id) => write!(f, "Channel({id})"),
            PendingAction::Flow { flow, step } => write!(f, "Flow({flow}, step {step})"),
        }
    }
}

/// A caller waiting for a destination to close.
#[derive(Debug)]
pub struct PendingResult {
    instruction_id: InstructionId,
    expected: ResultType,
    action: PendingAction,
}

impl PendingResult {
    /// A pending result with an arbitrary action.
    pub fn new(instruction_id: InstructionId, expected: ResultType, action: PendingAction) -> Self {
        Self {
            instruction_id,
            expected,
            action,
        }
    }

    /// A typed one-shot callback.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `R::RESULT_TYPE` is not a valid identifier.
    pub fn callback<R, F>(instruction_id: InstructionId, f: F) -> Result<Self, NavigationError>
    where
        R: ResultValue,
        F: FnOnce(ResultEvent<R>) + Send + 'static,
    {
        let callback: Callback = Box::new(move |delivery| {
            let event = match delivery {
                Delivery::Result(result) => ResultEvent::Result(decode_result::<R>(&result)?),
                Delivery::Closed => ResultEvent::Closed,
            };
            f(event);
            Ok(())
        });
        Ok(Self::new(
            instruction_id,
            ResultType::new(R::RESULT_TYPE)?,
            PendingAction::Callback(callback),
        ))
    }

    /// A typed callback bridged to a future.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `R::RESULT_TYPE` is not a valid identifier.
    pub fn future<R: ResultValue>(
        instruction_id: InstructionId,
    ) -> Result<(Self, ResultReceiver<R>), NavigationError> {
        let (sender, receiver) = oneshot::channel();
        let pending = Self::callback::<R, _>(instruction_id, move |event| {
            // The receiver may have been dropped; nobody is waiting then.
            let _ = sender.send(event);
        })?;
        Ok((pending, ResultReceiver { inner: receiver }))
    }

    /// The id of the instruction whose closure this awaits.
    pub fn instruction_id(&self) -> InstructionId {
        self.instruction_id
    }

    /// The expected result type.
    pub fn expected(&self) -> &ResultType {
        &self.expected
    }

    /// The action.
    pub fn action(&self) -> &PendingAction {
        &self.action
    }

    pub(crate) fn into_action(self) -> PendingAction {
        self.action
    }

    /// Move this entry to another instruction (interceptor substitution).
    pub(crate) fn rekeyed(mut self, instruction_id: InstructionId) -> Self {
        self.instruction_id = instruction_id;
        self
    }

    /// Check a delivery against the expected type.
    ///
    /// # Errors
    ///
    /// Returns `ReceivedIncorrectlyTypedResult` on a type token mismatch.
    pub fn check(&self, delivery: &Delivery) -> Result<(), NavigationError> {
        match delivery {
            Delivery::Result(result) if result.result_type() != &self.expected => {
                Err(NavigationError::ReceivedIncorrectlyTypedResult {
                    expected: self.expected.clone(),
                    received: result.result_type().clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// The pending results registered in one context, in registration order.
#[derive(Debug, Default)]
pub struct PendingResults {
    entries: Vec<PendingResult>,
}

impl PendingResults {
    /// No pending results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry, replacing any previous entry for the same id.
    pub fn insert(&mut self, pending: PendingResult) {
        self.discard(pending.instruction_id);
        self.entries.push(pending);
    }

    /// Remove and return the entry for the id.
    pub fn take(&mut self, instruction_id: InstructionId) -> Option<PendingResult> {
        let index = self
            .entries
            .iter()
            .position(|p| p.instruction_id == instruction_id)?;
        Some(self.entries.remove(index))
    }

    /// Drop the entry for the id without running it.
    pub fn discard(&mut self, instruction_id: InstructionId) -> Option<PendingResult> {
        self.take(instruction_id)
    }

    /// Whether an entry exists for the id.
    pub fn contains(&self, instruction_id: InstructionId) -> bool {
        self.entries
            .iter()
            .any(|p| p.instruction_id == instruction_id)
    }

    /// Ids awaited, in registration order.
    pub fn ids(&self) -> Vec<InstructionId> {
        self.entries.iter().map(|p| p.instruction_id).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no results are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handle to a result channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultChannelId(pub(crate) u64);

impl fmt::Display for ResultChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Erased channel result handler.
pub type ChannelResultHandler =
    Arc<dyn Fn(AnyResult) -> Result<(), NavigationError> + Send + Sync>;

/// Channel handler for closes without a result.
pub type ChannelClosedHandler = Arc<dyn Fn() + Send + Sync>;

/// A reusable result handler owned by a context.
///
/// Any number of destinations may be opened through one channel; each
/// registers its own pending result routed here.
#[derive(Clone)]
pub struct ResultChannel {
    id: ResultChannelId,
    owner: ContextId,
    expected: ResultType,
    on_result: ChannelResultHandler,
    on_closed: Option<ChannelClosedHandler>,
}

impl ResultChannel {
    /// A typed channel.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `R::RESULT_TYPE` is not a valid identifier.
    pub fn typed<R, F>(
        id: ResultChannelId,
        owner: ContextId,
        on_result: F,
        on_closed: Option<ChannelClosedHandler>,
    ) -> Result<Self, NavigationError>
    where
        R: ResultValue,
        F: Fn(R) + Send + Sync + 'static,
    {
        let on_result: ChannelResultHandler = Arc::new(move |result: AnyResult| {
            on_result(decode_result::<R>(&result)?);
            Ok(())
        });
        Ok(Self {
            id,
            owner,
            expected: ResultType::new(R::RESULT_TYPE)?,
            on_result,
            on_closed,
        })
    }

    /// The channel id.
    pub fn id(&self) -> ResultChannelId {
        self.id
    }

    /// The owning context.
    pub fn owner(&self) -> ContextId {
        self.owner
    }

    /// The expected result type.
    pub fn expected(&self) -> &ResultType {
        &self.expected
    }

    /// Run the handler for a delivery.
    ///
    /// # Errors
    ///
    /// Returns `ReceivedIncorrectlyTypedResult` if the result does not
    /// decode.
    pub fn deliver(&self, delivery: Delivery) -> Result<(), NavigationError> {
        match delivery {
            Delivery::Result(result) => (self.on_result)(result),
            Delivery::Closed => {
                if let Some(on_closed) = &self.on_closed {
                    on_closed();
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ResultChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultChannel")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

/// A future resolving when the awaited destination closes.
///
/// Resolves to [`ResultEvent::Cancelled`] if the pending result is dropped,
/// for example because the caller was torn down.
#[derive(Debug)]
pub struct ResultReceiver<R> {
    inner: oneshot::Receiver<ResultEvent<R>>,
}

impl<R> ResultReceiver<R> {
    /// The event, if it has already arrived.
    pub fn try_recv(&mut self) -> Option<ResultEvent<R>> {
        match self.inner.try_recv() {
            Ok(event) => Some(event),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(ResultEvent::Cancelled),
        }
    }
}

impl<R> Future for ResultReceiver<R> {
    type Output = ResultEvent<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner)
            .poll(cx)
            .map(|received| received.unwrap_or(ResultEvent::Cancelled))
    }
}
