//! Trigger resolution.
//!
//! Turns a presentation request into the identifiers of the paywall to fetch,
//! consulting the rule evaluator for trigger requests. Tracking always happens
//! before the corresponding error is returned.

use crate::application::ports::{AssignmentConfirmer, EventTracker, RuleEvaluator};
use crate::domain::error::ResolutionError;
use crate::domain::presentation::PresentationRequest;
use crate::domain::tracking::{TrackedEvent, TriggerResult};
use crate::domain::trigger::{Experiment, ResponseIdentifiers, TriggerOutcome};
use std::sync::Arc;
use tracing::debug;

/// Resolves presentation requests against the trigger rules.
#[derive(Debug, Clone)]
pub struct TriggerResolver {
    evaluator: Arc<dyn RuleEvaluator>,
    tracker: Arc<dyn EventTracker>,
    confirmer: Option<Arc<dyn AssignmentConfirmer>>,
}

impl TriggerResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    /// * `evaluator` - Rule evaluator owning the trigger configuration
    /// * `tracker` - Sink for trigger-fire events
    /// * `confirmer` - Receives assignments the evaluator asks to confirm
    pub fn new(
        evaluator: Arc<dyn RuleEvaluator>,
        tracker: Arc<dyn EventTracker>,
        confirmer: Option<Arc<dyn AssignmentConfirmer>>,
    ) -> Self {
        Self {
            evaluator,
            tracker,
            confirmer,
        }
    }

    /// Resolve a presentation request to response identifiers.
    ///
    /// Before configuration is fetched, the rule evaluator is never consulted:
    /// identifiers are built from the direct identifier alone (if any) for
    /// every kind of request.
    ///
    /// # Returns
    /// * `Ok(Some(ids))` - fetch the paywall these identifiers describe
    /// * `Ok(None)` - no identifiers; the caller falls back to the default paywall
    ///
    /// # Errors
    /// * `HoldoutAssigned` - the user is in an experiment holdout
    /// * `NoRuleMatch` - no rule matched the event
    /// * `TriggerDisabled` - no trigger is configured for the event
    pub fn resolve(
        &self,
        request: &PresentationRequest,
        config_ready: bool,
    ) -> Result<Option<ResponseIdentifiers>, ResolutionError> {
        if !config_ready {
            debug!(?request, "config not ready, skipping trigger evaluation");
            return Ok(Some(ResponseIdentifiers::from_paywall_id(
                request.identifier(),
            )));
        }

        let event = match request {
            PresentationRequest::ImplicitTrigger(event)
            | PresentationRequest::ExplicitTrigger(event) => event,
            PresentationRequest::FromIdentifier(paywall_id) => {
                return Ok(Some(ResponseIdentifiers::from_paywall_id(Some(paywall_id))));
            }
            PresentationRequest::DefaultPaywall => return Ok(None),
        };

        let evaluation = self.evaluator.evaluate(event);
        if let (Some(assignment), Some(confirmer)) =
            (evaluation.confirmable_assignment, &self.confirmer)
        {
            confirmer.confirm(assignment);
        }

        let trigger_name = event.name().to_string();

        match evaluation.outcome {
            TriggerOutcome::ShowPaywall {
                paywall_id,
                experiment_id,
                variant_id,
            } => {
                debug!(
                    trigger = %trigger_name,
                    paywall_id = %paywall_id,
                    experiment_id = %experiment_id,
                    "trigger fired"
                );
                self.tracker.track(TrackedEvent::TriggerFire {
                    trigger_name,
                    result: TriggerResult::Paywall {
                        experiment: Experiment::new(experiment_id.clone(), variant_id.clone()),
                        paywall_id: paywall_id.clone(),
                    },
                });
                Ok(Some(ResponseIdentifiers {
                    paywall_id: Some(paywall_id),
                    experiment_id: Some(experiment_id),
                    variant_id: Some(variant_id),
                }))
            }
            TriggerOutcome::Holdout {
                experiment_id,
                variant_id,
            } => {
                debug!(trigger = %trigger_name, experiment_id = %experiment_id, "trigger holdout");
                self.tracker.track(TrackedEvent::TriggerFire {
                    trigger_name,
                    result: TriggerResult::Holdout {
                        experiment: Experiment::new(experiment_id.clone(), variant_id.clone()),
                    },
                });
                Err(ResolutionError::HoldoutAssigned {
                    experiment_id,
                    variant_id,
                })
            }
            TriggerOutcome::NoRuleMatch => {
                debug!(trigger = %trigger_name, "no rule match");
                self.tracker.track(TrackedEvent::TriggerFire {
                    trigger_name,
                    result: TriggerResult::NoRuleMatch,
                });
                Err(ResolutionError::NoRuleMatch)
            }
            TriggerOutcome::UnknownEvent => {
                debug!(trigger = %trigger_name, "trigger disabled");
                Err(ResolutionError::TriggerDisabled)
            }
        }
    }
}
