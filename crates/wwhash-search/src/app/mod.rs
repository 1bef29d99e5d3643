//! Application layer - Use case implementations
//!
//! This module coordinates domain and infrastructure layers to implement use cases.

pub mod config;
pub mod coordinator;
pub mod jobs;
pub mod searcher;

pub use config::{BruteForceOptions, SearchConfig, SearchMode};
pub use coordinator::{
    CoordinatorOptions, RunSummary, SearchCoordinator, SearchJob, ShardOutcome, WorkerContext,
};
pub use searcher::{SearchInputs, SearchOutcome, run_search};
