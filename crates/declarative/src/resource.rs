//! Resource trait for declarative state management
//!
//! A Resource is a kind of remote object (not one instance) that knows how to
//! move an instance from a previous declared record to a new one.

use crate::types::{Identity, Operation};
use std::fmt;

/// Outcome of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created<O> {
    /// Remote-assigned identifier.
    pub id: String,
    /// State read back after all create steps ran.
    pub observed: O,
}

/// Core trait for declarative resources
///
/// Implementors provide the primitive operations of one resource kind; the
/// [`converge`](crate::converge) function decides which of them a pass needs.
/// Each method may issue several remote calls (a primitive plus transitions)
/// and must stop at the first failure.
///
/// # Example
///
/// ```ignore
/// impl Resource for PlanReconciler {
///     type Desired = PlanSpec;
///     type Observed = ObservedPlan;
///     type Step = Step;
///     type Error = StepError;
///
///     fn resource_type(&self) -> &'static str { "plan" }
///
///     fn create(&self, parent: &str, desired: &PlanSpec) -> Result<Created<ObservedPlan>, StepError> {
///         // create, then publish when enabled
///     }
///     // ...
/// }
/// ```
pub trait Resource {
    /// Caller-declared record.
    type Desired: Clone + PartialEq + fmt::Debug;
    /// Record derived from the remote representation.
    type Observed: fmt::Debug;
    /// One remote call of a pass, for previews and error annotation.
    type Step: Copy + fmt::Display;
    /// Failure of a pass.
    type Error: std::error::Error;

    /// Resource type category
    ///
    /// Used for grouping and filtering, e.g. "plan", "subscription".
    fn resource_type(&self) -> &'static str;

    /// Create the resource under `parent`.
    fn create(
        &self,
        parent: &str,
        desired: &Self::Desired,
    ) -> Result<Created<Self::Observed>, Self::Error>;

    /// Read the resource. `Ok(None)` means the remote confirmed it is absent.
    fn read(&self, identity: &Identity) -> Result<Option<Self::Observed>, Self::Error>;

    /// Move the resource from `previous` to `desired`.
    ///
    /// `previous` is `None` when an earlier pass failed part-way and what was
    /// applied is unknown; the implementation must then run every step the
    /// desired record calls for.
    fn update(
        &self,
        identity: &Identity,
        previous: Option<&Self::Desired>,
        desired: &Self::Desired,
    ) -> Result<Self::Observed, Self::Error>;

    /// Continue a pass an earlier run left incomplete.
    ///
    /// `observed` is what [`read`](Self::read) returned at the start of this
    /// pass, so implementations need not fetch the resource again.
    fn resume(
        &self,
        identity: &Identity,
        _observed: Self::Observed,
        desired: &Self::Desired,
    ) -> Result<Self::Observed, Self::Error> {
        self.update(identity, None, desired)
    }

    /// Remove the resource. Must succeed when it is already gone.
    fn delete(&self, identity: &Identity) -> Result<(), Self::Error>;

    /// Whether going from `previous` to `desired` cannot be done in place.
    fn requires_replacement(&self, _previous: &Self::Desired, _desired: &Self::Desired) -> bool {
        false
    }

    /// Id of a resource a failed pass managed to create, if any.
    ///
    /// Lets the caller keep the identity so the next pass updates instead of
    /// creating a duplicate.
    fn created_id(&self, _error: &Self::Error) -> Option<String> {
        None
    }

    /// Steps a pass performing `operation` would issue, without issuing them.
    fn planned_steps(
        &self,
        operation: Operation,
        previous: Option<&Self::Desired>,
        desired: Option<&Self::Desired>,
    ) -> Vec<Self::Step>;
}
