//! Tracking sink that forwards events to `tracing`.

use crate::application::ports::EventTracker;
use crate::domain::tracking::{TrackedEvent, TrackingResult, TriggerResult};
use tracing::{info, Level};

/// Default tracking sink.
///
/// Emits every tracked event at INFO level under the
/// `paywall_resolver::tracking` target, so hosts can route analytics with an
/// ordinary subscriber filter. Events the active subscriber filters out are
/// reported as [`TrackingResult::Dropped`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventTracker;

impl TracingEventTracker {
    pub fn new() -> Self {
        Self
    }
}

impl EventTracker for TracingEventTracker {
    fn track(&self, event: TrackedEvent) -> TrackingResult {
        if !tracing::enabled!(target: "paywall_resolver::tracking", Level::INFO) {
            return TrackingResult::Dropped;
        }

        match &event {
            TrackedEvent::TriggerFire {
                trigger_name,
                result,
            } => {
                let (outcome, experiment_id, paywall_id) = match result {
                    TriggerResult::Paywall {
                        experiment,
                        paywall_id,
                    } => ("paywall", Some(experiment.id.as_str()), Some(paywall_id.as_str())),
                    TriggerResult::Holdout { experiment } => {
                        ("holdout", Some(experiment.id.as_str()), None)
                    }
                    TriggerResult::NoRuleMatch => ("no_rule_match", None, None),
                };
                info!(
                    target: "paywall_resolver::tracking",
                    event = event.name(),
                    trigger = %trigger_name,
                    outcome,
                    experiment_id = experiment_id.unwrap_or_default(),
                    paywall_id = paywall_id.unwrap_or_default(),
                    "tracked"
                );
            }
            TrackedEvent::PaywallResponseLoad { state, event: data } => {
                info!(
                    target: "paywall_resolver::tracking",
                    event = event.name(),
                    state = %state,
                    trigger = data.as_ref().map(|d| d.name()).unwrap_or_default(),
                    "tracked"
                );
            }
        }
        TrackingResult::Tracked
    }
}
