//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Storage implementations (sharded maps)
//! - Locale detection
//! - Tracking through `tracing`
//! - In-memory entitlements

pub mod entitlements;
pub mod locale;
pub mod storage;
pub mod tracker;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for the
/// resolver's collaborators.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// paywall-resolver = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
