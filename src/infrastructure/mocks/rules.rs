//! Test doubles for trigger evaluation and tracking.

use crate::application::ports::{AssignmentConfirmer, EventTracker, RuleEvaluator};
use crate::domain::presentation::EventData;
use crate::domain::tracking::{TrackedEvent, TrackingResult};
use crate::domain::trigger::{ConfirmableAssignment, RuleEvaluation, TriggerOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Rule evaluator returning a scripted evaluation for every event.
#[derive(Debug)]
pub struct MockRuleEvaluator {
    evaluation: Mutex<RuleEvaluation>,
    calls: AtomicUsize,
}

impl MockRuleEvaluator {
    pub fn new(outcome: TriggerOutcome) -> Self {
        Self::with_evaluation(RuleEvaluation::from(outcome))
    }

    pub fn with_evaluation(evaluation: RuleEvaluation) -> Self {
        Self {
            evaluation: Mutex::new(evaluation),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the outcome returned by later evaluations.
    pub fn set_outcome(&self, outcome: TriggerOutcome) {
        *self.evaluation.lock().unwrap_or_else(PoisonError::into_inner) =
            RuleEvaluation::from(outcome);
    }

    /// Number of evaluations performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RuleEvaluator for MockRuleEvaluator {
    fn evaluate(&self, _event: &EventData) -> RuleEvaluation {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.evaluation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Tracking sink that records every event.
#[derive(Debug, Default)]
pub struct RecordingTracker {
    events: Mutex<Vec<TrackedEvent>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl EventTracker for RecordingTracker {
    fn track(&self, event: TrackedEvent) -> TrackingResult {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        TrackingResult::Tracked
    }
}

/// Assignment confirmer that records confirmations.
#[derive(Debug, Default)]
pub struct MockConfirmer {
    confirmed: Mutex<Vec<ConfirmableAssignment>>,
}

impl MockConfirmer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmed(&self) -> Vec<ConfirmableAssignment> {
        self.confirmed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AssignmentConfirmer for MockConfirmer {
    fn confirm(&self, assignment: ConfirmableAssignment) {
        self.confirmed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(assignment);
    }
}
