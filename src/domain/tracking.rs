//! Events emitted to the tracking sink during resolution.

use crate::domain::presentation::EventData;
use crate::domain::trigger::Experiment;
use std::fmt;

/// What a trigger evaluation resolved to, as reported to tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerResult {
    Paywall {
        experiment: Experiment,
        paywall_id: String,
    },
    Holdout {
        experiment: Experiment,
    },
    NoRuleMatch,
}

/// Lifecycle state of a paywall response load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Start,
    NotFound,
    Fail,
    Complete,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Start => "start",
            LoadState::NotFound => "not_found",
            LoadState::Fail => "fail",
            LoadState::Complete => "complete",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event handed to the tracking sink.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackedEvent {
    /// A trigger fired for an event.
    TriggerFire {
        trigger_name: String,
        result: TriggerResult,
    },
    /// A paywall response load changed state.
    PaywallResponseLoad {
        state: LoadState,
        event: Option<EventData>,
    },
}

impl TrackedEvent {
    /// Stable event name used by tracking sinks.
    pub fn name(&self) -> &'static str {
        match self {
            TrackedEvent::TriggerFire { .. } => "trigger_fire",
            TrackedEvent::PaywallResponseLoad { state, .. } => match state {
                LoadState::Start => "paywall_response_load_start",
                LoadState::NotFound => "paywall_response_load_not_found",
                LoadState::Fail => "paywall_response_load_fail",
                LoadState::Complete => "paywall_response_load_complete",
            },
        }
    }
}

/// Outcome reported by a tracking sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingResult {
    /// The sink accepted the event
    Tracked,
    /// The sink discarded the event, e.g. because it was filtered out
    Dropped,
}
