//! Branch synchronization: classify a branch against its upstream, pick
//! a remediation, and carry it out.
//!
//! Deciding ([`classify`], [`recommend_action`]) is pure. Effects live
//! behind [`SyncOps`] and user confirmation behind
//! [`Prompt`](crate::input::Prompt), both driven by [`SyncExecutor`].

mod action;
mod classify;
mod executor;
mod state;

pub use action::{recommend_action, Action, DivergenceChoice};
pub use classify::{classify, SyncRelation};
pub use executor::{ExecutorOptions, Outcome, SyncExecutor, SyncOps};
pub use state::{gather, BranchState, CommitId, VersionControl};
