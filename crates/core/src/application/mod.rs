// Application Layer - Job lifecycle use cases

pub mod cache;
pub mod lifecycle;
pub mod poll_policy;

// Re-exports
pub use cache::{CachedJob, JobCache};
pub use lifecycle::{JobLifecycleManager, PollConfig, PollOutcome, PollSubscription};
pub use poll_policy::{PollDecision, PollFailurePolicy};
