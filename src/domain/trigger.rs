//! Trigger rule outcomes and the identifiers they resolve to.

use serde::{Deserialize, Serialize};

/// Identifies which paywall to fetch and which experiment assigned it.
///
/// The experiment and variant travel with the fetched response so that
/// attribution survives cache hits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseIdentifiers {
    pub paywall_id: Option<String>,
    pub experiment_id: Option<String>,
    pub variant_id: Option<String>,
}

impl ResponseIdentifiers {
    /// Identifiers carrying only a paywall id (or nothing).
    pub fn from_paywall_id(paywall_id: Option<&str>) -> Self {
        Self {
            paywall_id: paywall_id.map(str::to_owned),
            experiment_id: None,
            variant_id: None,
        }
    }

    /// Identifiers for a paywall assigned through an experiment.
    pub fn assigned(
        paywall_id: impl Into<String>,
        experiment_id: impl Into<String>,
        variant_id: impl Into<String>,
    ) -> Self {
        Self {
            paywall_id: Some(paywall_id.into()),
            experiment_id: Some(experiment_id.into()),
            variant_id: Some(variant_id.into()),
        }
    }
}

/// An experiment assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub variant_id: String,
}

impl Experiment {
    pub fn new(id: impl Into<String>, variant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            variant_id: variant_id.into(),
        }
    }
}

/// Result of evaluating trigger rules against an event.
///
/// Produced once per evaluation and never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A rule matched and the user was assigned a paywall.
    ShowPaywall {
        paywall_id: String,
        experiment_id: String,
        variant_id: String,
    },
    /// A rule matched but the user was assigned to the holdout group.
    Holdout {
        experiment_id: String,
        variant_id: String,
    },
    /// The event is known but no rule matched.
    NoRuleMatch,
    /// No trigger is configured for the event.
    UnknownEvent,
}

/// An assignment the evaluator made that must be confirmed with the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmableAssignment {
    pub experiment_id: String,
    pub variant_id: String,
}

/// Everything a rule evaluation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEvaluation {
    pub outcome: TriggerOutcome,
    pub confirmable_assignment: Option<ConfirmableAssignment>,
}

impl From<TriggerOutcome> for RuleEvaluation {
    fn from(outcome: TriggerOutcome) -> Self {
        Self {
            outcome,
            confirmable_assignment: None,
        }
    }
}
