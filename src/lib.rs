//! # paywall-resolver
//!
//! Resolves application events to paywall responses, fetching each distinct
//! request at most once no matter how many callers ask for it concurrently.
//!
//! Given a presentation request, the resolver:
//! 1. evaluates the trigger rules to decide which paywall (if any) to show,
//! 2. derives a request signature from the paywall identifier and locale,
//! 3. answers from the cache, joins an in-flight fetch, or starts one,
//! 4. projects the fetched products onto store metadata,
//! 5. hands the result to every waiting caller, attributed to that caller's
//!    experiment assignment.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paywall_resolver::{
//!     EventData, FetchError, PaywallFetcher, PaywallRequest, PaywallResolver,
//!     PaywallResponse, PresentationRequest, RuleEvaluation, RuleEvaluator, TriggerOutcome,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Api;
//!
//! #[async_trait::async_trait]
//! impl PaywallFetcher for Api {
//!     async fn fetch(&self, _request: &PaywallRequest) -> Result<PaywallResponse, FetchError> {
//!         // Call the paywall endpoint here.
//!         Err(FetchError::NotFound)
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct Rules;
//!
//! impl RuleEvaluator for Rules {
//!     fn evaluate(&self, _event: &EventData) -> RuleEvaluation {
//!         TriggerOutcome::ShowPaywall {
//!             paywall_id: "annual_offer".into(),
//!             experiment_id: "exp_1".into(),
//!             variant_id: "var_a".into(),
//!         }
//!         .into()
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = PaywallResolver::builder()
//!     .with_fetcher(Arc::new(Api))
//!     .with_rule_evaluator(Arc::new(Rules))
//!     .with_config_ready(true)
//!     .build()?;
//!
//! let response = resolver
//!     .resolve_and_fetch(PresentationRequest::ExplicitTrigger(EventData::new("app_open")))
//!     .await?;
//! println!("showing {}", response.identifier);
//!
//! // On logout or identity change:
//! resolver.invalidate_all();
//! # Ok(())
//! # }
//! ```
//!
//! ## Caching
//!
//! Results are cached per request signature until [`PaywallResolver::invalidate_all`]
//! is called. Fetch failures are cached too; trigger errors (holdout, no rule
//! match, disabled trigger) are not, since no fetch happens. Debugger mode
//! ([`PaywallResolver::set_bypass_cache`]) ignores cached results.
//!
//! ## Logging
//!
//! Diagnostics go through `tracing`. The default tracking sink,
//! [`TracingEventTracker`], logs tracked events at INFO under the
//! `paywall_resolver::tracking` target.
//!
//! ## Architecture
//!
//! - `domain`: pure types and rules (signatures, outcomes, projection)
//! - `application`: ports and orchestration (trigger resolution, registry, resolver)
//! - `infrastructure`: adapters (sharded storage, locale, tracking, test doubles)

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

pub use domain::{
    error::{FetchError, ResolutionError},
    presentation::{EventData, PresentationRequest},
    product::{Period, PeriodUnit, ProductTrial, StoreProduct},
    projection::{project, ProductProcessingOutcome},
    response::{PaywallRequest, PaywallResponse, Product, ProductType, ProductVariable, Variable},
    signature::{RequestSignature, CALLED_MANUALLY},
    tracking::{LoadState, TrackedEvent, TrackingResult, TriggerResult},
    trigger::{
        ConfirmableAssignment, Experiment, ResponseIdentifiers, RuleEvaluation, TriggerOutcome,
    },
};

pub use application::{
    fanout::{CompletionHandler, FanOut, ResolutionResult},
    metrics::{Metrics, MetricsSnapshot},
    ports::{
        AssignmentConfirmer, Entitlements, EventTracker, LocaleProvider, PaywallFetcher,
        ProductCatalog, RuleEvaluator, Storage,
    },
    registry::{CacheEntry, CacheLookup, ClaimGuard, FetchTicket, ResponseRegistry},
    resolver::{BuildError, PaywallResolver, PaywallResolverBuilder, ResolverConfig},
    trigger::TriggerResolver,
};

pub use infrastructure::{
    entitlements::InMemoryEntitlements,
    locale::{EnvLocale, FixedLocale},
    storage::ShardedStorage,
    tracker::TracingEventTracker,
};
