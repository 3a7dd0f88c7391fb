//! Presentation requests and the events that trigger them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An application event that may trigger a paywall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    name: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

impl EventData {
    /// Create an event with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Map::new(),
        }
    }

    /// Attach a parameter to the event.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// The event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The event parameters.
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }
}

/// What the caller asked to present.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationRequest {
    /// An event tracked by the SDK itself triggered the request.
    ImplicitTrigger(EventData),
    /// The application explicitly triggered an event.
    ExplicitTrigger(EventData),
    /// A specific paywall was requested by identifier, bypassing rules.
    FromIdentifier(String),
    /// No trigger; the default paywall should be shown.
    DefaultPaywall,
}

impl PresentationRequest {
    /// The paywall identifier, for direct identifier requests only.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            PresentationRequest::FromIdentifier(id) => Some(id),
            PresentationRequest::ImplicitTrigger(_)
            | PresentationRequest::ExplicitTrigger(_)
            | PresentationRequest::DefaultPaywall => None,
        }
    }

    /// The triggering event, for trigger requests only.
    pub fn event(&self) -> Option<&EventData> {
        match self {
            PresentationRequest::ImplicitTrigger(event)
            | PresentationRequest::ExplicitTrigger(event) => Some(event),
            PresentationRequest::FromIdentifier(_) | PresentationRequest::DefaultPaywall => None,
        }
    }
}
