//! Request signature computation for paywall response deduplication.
//!
//! A request signature identifies a class of paywall lookups based on:
//! - The paywall identifier, when one is known
//! - Otherwise the name of the triggering event
//! - The locale the paywall is rendered for
//!
//! Lookups with the same signature share one fetch and one cached result.

use crate::domain::presentation::EventData;
use std::fmt;

/// Identifier used when neither a paywall identifier nor an event is available.
///
/// This is the case when a paywall is requested manually without a trigger.
pub const CALLED_MANUALLY: &str = "$called_manually";

/// A stable key identifying a paywall response request.
///
/// Two requests with the same effective identifier and locale produce the same
/// signature.
///
/// The key is the plain `{identifier}_{locale}` request hash with no
/// escaping. Components that themselves contain `_` can therefore collide:
/// `("a_en", "US")` and `("a", "en_US")` intentionally share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestSignature(String);

impl RequestSignature {
    /// Compute a signature from request components.
    ///
    /// # Arguments
    /// * `identifier` - Explicit paywall identifier; wins over the event name
    /// * `event` - The triggering event, used when no identifier is given
    /// * `locale` - Locale identifier (e.g. `en_US`)
    pub fn new(identifier: Option<&str>, event: Option<&EventData>, locale: &str) -> Self {
        let id = identifier
            .or_else(|| event.map(EventData::name))
            .unwrap_or(CALLED_MANUALLY);
        RequestSignature(format!("{id}_{locale}"))
    }

    /// Signature for a manual request with no identifier and no event.
    pub fn manual(locale: &str) -> Self {
        Self::new(None, None, locale)
    }

    /// Get the signature as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestSignature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_requests_produce_same_signature() {
        let event = EventData::new("campaign_trigger");

        let sig1 = RequestSignature::new(None, Some(&event), "en_US");
        let sig2 = RequestSignature::new(None, Some(&event), "en_US");

        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_identifier_wins_over_event_name() {
        let event = EventData::new("campaign_trigger");

        let sig = RequestSignature::new(Some("paywall_a"), Some(&event), "en_US");

        assert_eq!(sig.as_str(), "paywall_a_en_US");
    }

    #[test]
    fn test_event_name_used_without_identifier() {
        let event = EventData::new("campaign_trigger");

        let sig = RequestSignature::new(None, Some(&event), "fr_FR");

        assert_eq!(sig.as_str(), "campaign_trigger_fr_FR");
    }

    #[test]
    fn test_manual_sentinel() {
        let sig = RequestSignature::manual("en_US");
        assert_eq!(sig.as_str(), "$called_manually_en_US");
        assert_eq!(sig, RequestSignature::new(None, None, "en_US"));
    }

    #[test]
    fn test_different_locales_produce_different_signatures() {
        let sig1 = RequestSignature::new(Some("paywall_a"), None, "en_US");
        let sig2 = RequestSignature::new(Some("paywall_a"), None, "de_DE");

        assert_ne!(sig1, sig2);
    }

    #[test]
    fn test_different_identifiers_produce_different_signatures() {
        let sig1 = RequestSignature::new(Some("paywall_a"), None, "en_US");
        let sig2 = RequestSignature::new(Some("paywall_b"), None, "en_US");

        assert_ne!(sig1, sig2);
    }

    #[test]
    fn test_event_parameters_do_not_affect_signature() {
        let plain = EventData::new("session_start");
        let with_params = EventData::new("session_start").with_parameter("source", "push");

        assert_eq!(
            RequestSignature::new(None, Some(&plain), "en_US"),
            RequestSignature::new(None, Some(&with_params), "en_US")
        );
    }

    #[test]
    fn test_unicode_identifiers() {
        let sig1 = RequestSignature::new(Some("ペイウォール"), None, "ja_JP");
        let sig2 = RequestSignature::new(Some("ペイウォール"), None, "ja_JP");
        let sig3 = RequestSignature::new(Some("paywall"), None, "ja_JP");

        assert_eq!(sig1, sig2);
        assert_ne!(sig1, sig3);
    }

    #[test]
    fn test_underscore_components_share_key() {
        let split_locale = RequestSignature::new(Some("a_en"), None, "US");
        let split_id = RequestSignature::new(Some("a"), None, "en_US");

        assert_eq!(split_locale, split_id);
        assert_eq!(split_id.as_str(), "a_en_US");
    }

    #[test]
    fn test_display_matches_as_str() {
        let sig = RequestSignature::new(Some("paywall_a"), None, "en_US");
        assert_eq!(format!("{}", sig), sig.as_str());
    }
}
