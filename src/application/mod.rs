//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Trigger resolution (rule outcomes to identifiers)
//! - Response registry (cached results and pending waiters)
//! - Completion fan-out
//! - Resolver facade (the public entry point)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters and host applications must implement. This keeps the
//! application layer independent from transport details.

pub mod fanout;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod resolver;
pub mod trigger;
