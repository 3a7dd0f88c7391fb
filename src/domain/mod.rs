//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of paywall resolution:
//! - Request signature computation
//! - Presentation requests and trigger outcomes
//! - The paywall response and store product model
//! - Product and variable projection
//! - Typed resolution errors
//!
//! All types in this layer are pure and easily testable.

pub mod error;
pub mod presentation;
pub mod product;
pub mod projection;
pub mod response;
pub mod signature;
pub mod tracking;
pub mod trigger;
