//! Integration points for callers outside the training loop

pub mod advisor;

pub use advisor::{explain_changes, optimize_allocation, AllocationAdvice, AllocationRequest};
