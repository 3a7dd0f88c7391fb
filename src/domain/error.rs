//! Typed failures surfaced by paywall resolution.

use thiserror::Error;

/// Error reported by the fetch and catalog collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server has no paywall for the request.
    #[error("paywall not found")]
    NotFound,
    /// The request did not complete.
    #[error("network error: {0}")]
    Network(String),
    /// The response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether this is the not-found network condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound)
    }
}

/// Error returned to callers of paywall resolution.
///
/// Errors are cloneable because a cached failure is delivered to every
/// later caller with the same request signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The user was assigned to a holdout group in a trigger experiment.
    #[error("user was assigned to a holdout (experiment {experiment_id}, variant {variant_id})")]
    HoldoutAssigned {
        experiment_id: String,
        variant_id: String,
    },
    /// The user did not match any rules configured for the trigger.
    #[error("the user did not match any rules configured for this trigger")]
    NoRuleMatch,
    /// No paywall is configured to show for the event.
    #[error("there isn't a paywall configured to show in this context")]
    TriggerDisabled,
    /// The server reported that the paywall does not exist.
    #[error("paywall not found")]
    ResponseNotFound,
    /// The fetch failed for any other reason.
    #[error("failed to fetch paywall response: {0}")]
    FetchFailed(#[source] FetchError),
    /// The pending request was discarded before it completed, either by a
    /// cache reset or because its fetch task ended without a result.
    #[error("the paywall request was discarded before it completed")]
    Invalidated,
}

impl ResolutionError {
    /// Whether the error came from trigger evaluation rather than fetching.
    pub fn is_trigger_error(&self) -> bool {
        matches!(
            self,
            ResolutionError::HoldoutAssigned { .. }
                | ResolutionError::NoRuleMatch
                | ResolutionError::TriggerDisabled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_holdout_message_carries_assignment() {
        let err = ResolutionError::HoldoutAssigned {
            experiment_id: "exp_1".into(),
            variant_id: "var_2".into(),
        };
        let message = err.to_string();
        assert!(message.contains("exp_1"));
        assert!(message.contains("var_2"));
    }

    #[test]
    fn test_fetch_failed_exposes_source() {
        let err = ResolutionError::FetchFailed(FetchError::Network("timeout".into()));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("network error: timeout"));
    }

    #[test]
    fn test_trigger_error_classification() {
        assert!(ResolutionError::NoRuleMatch.is_trigger_error());
        assert!(ResolutionError::TriggerDisabled.is_trigger_error());
        assert!(!ResolutionError::ResponseNotFound.is_trigger_error());
        assert!(!ResolutionError::Invalidated.is_trigger_error());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(FetchError::NotFound.is_not_found());
        assert!(!FetchError::Decode("bad json".into()).is_not_found());
    }
}
