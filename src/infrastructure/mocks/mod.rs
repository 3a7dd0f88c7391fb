//! Mock implementations for testing.
//!
//! This module provides test doubles for the resolver's collaborators,
//! enabling controlled testing of application logic.

pub mod layer;
pub mod network;
pub mod rules;

pub use layer::{CapturedEvent, MockCaptureLayer};
pub use network::{MockCatalog, MockFetcher};
pub use rules::{MockConfirmer, MockRuleEvaluator, RecordingTracker};
