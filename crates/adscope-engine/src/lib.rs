//! Negative keyword conflict engine.
//!
//! [`ConflictEngine::analyze`] pages through an account's active keywords,
//! resolves every negative keyword that can reach them (campaign, ad group
//! and shared lists), and reports which negatives block which keywords,
//! ranked by lost conversion value. All upstream access goes through the
//! [`AdsDataSource`] trait.

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod guard;
pub mod loader;
pub mod matcher;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod source;

pub use engine::{AnalysisOptions, ConflictEngine};
pub use error::{EngineError, SourceError, ValidationError};
pub use guard::RateLimitGuard;
pub use matcher::is_conflict;
pub use report::{Conflict, ConflictReport, ImplementationStep, KeywordRef, NegativeRef};
pub use resolver::{NegativeSurface, Provenance, SharedListCache, SkippedSource};
pub use retry::{RetryFailure, RetryHook, RetryPolicy};
pub use source::AdsDataSource;
