//! # Declarative
//!
//! A framework for declarative management of remote resources.
//!
//! This crate provides the core abstractions for declaring desired state,
//! remembering what was applied, and converging remote resources to match.
//!
//! ## Core Concepts
//!
//! - **Resource**: A resource kind with create, read, update and delete operations
//! - **Identity**: The remote id plus the parent it lives under, the only durable link
//! - **Pass**: One convergence of one resource: its operation, new identity and outcome
//! - **ExecutionPlan**: Ordered phases of passes
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{converge, Declared, Identity};
//!
//! let reconciler = PlanReconciler::new(&client, true);
//! let pass = converge(
//!     &reconciler,
//!     state.identity.as_ref(),
//!     state.applied.as_ref(),
//!     Some(Declared::new("api-1", &desired)),
//! );
//!
//! state.identity = pass.identity.clone();
//! let observed = pass.outcome?;
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{
    Diff, DiffSummary, FieldChange, ResourceDiff, group_by_type, push_change,
    push_optional_change,
};
pub use executor::{Declared, Pass, converge, plan_operation};
pub use planner::{ExecutionPlan, Phase, Targetable};
pub use resource::{Created, Resource};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, Identity, Operation};
