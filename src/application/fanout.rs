//! Completion fan-out.
//!
//! When a pending fetch resolves, every caller that enqueued on its signature
//! receives the result exactly once, in enqueue order.

use crate::application::ports::EventTracker;
use crate::domain::error::{FetchError, ResolutionError};
use crate::domain::presentation::EventData;
use crate::domain::response::PaywallResponse;
use crate::domain::tracking::{LoadState, TrackedEvent};
use crate::domain::trigger::ResponseIdentifiers;
use std::fmt;
use tracing::warn;

/// Result delivered to a waiting caller.
pub type ResolutionResult = Result<PaywallResponse, ResolutionError>;

/// Callback receiving the result of a paywall lookup.
pub type CompletionHandler = Box<dyn FnOnce(ResolutionResult) + Send + Sync + 'static>;

/// A caller waiting on a pending fetch.
pub struct Waiter {
    identifiers: Option<ResponseIdentifiers>,
    handler: CompletionHandler,
}

impl Waiter {
    pub(crate) fn new(
        identifiers: Option<ResponseIdentifiers>,
        handler: CompletionHandler,
    ) -> Self {
        Self {
            identifiers,
            handler,
        }
    }

    /// Deliver a result to this waiter.
    ///
    /// Successful responses are attributed to this waiter's experiment.
    pub(crate) fn deliver(self, result: &ResolutionResult) {
        let result = match result {
            Ok(response) => Ok(response.attributed_to(self.identifiers.as_ref())),
            Err(err) => Err(err.clone()),
        };
        (self.handler)(result);
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("identifiers", &self.identifiers)
            .field("handler", &"<fn>")
            .finish()
    }
}

/// The waiters of a completed fetch together with its result.
#[derive(Debug)]
pub struct FanOut {
    waiters: Vec<Waiter>,
    result: ResolutionResult,
}

impl FanOut {
    pub(crate) fn new(waiters: Vec<Waiter>, result: ResolutionResult) -> Self {
        Self { waiters, result }
    }

    /// Number of waiters that will receive the result.
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Invoke every waiter's handler in enqueue order, each exactly once.
    pub fn deliver(self) {
        let FanOut { waiters, result } = self;
        for waiter in waiters {
            waiter.deliver(&result);
        }
    }
}

/// Classify a fetch failure, track it, and build the error handed to waiters.
///
/// A not-found condition is tracked as `NotFound` and becomes
/// `ResponseNotFound`; anything else is tracked as `Fail` and becomes
/// `FetchFailed`.
pub fn classify_failure(
    error: FetchError,
    event: Option<&EventData>,
    tracker: &dyn EventTracker,
) -> ResolutionError {
    let state = if error.is_not_found() {
        LoadState::NotFound
    } else {
        LoadState::Fail
    };
    warn!(error = %error, state = %state, "paywall response load failed");
    tracker.track(TrackedEvent::PaywallResponseLoad {
        state,
        event: event.cloned(),
    });

    match error {
        FetchError::NotFound => ResolutionError::ResponseNotFound,
        other => ResolutionError::FetchFailed(other),
    }
}
