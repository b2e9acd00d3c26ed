//! Lifecycle reconcilers for plans and subscriptions.
//!
//! Each reconciler implements [`declarative::Resource`] on top of a borrowed
//! [`gravitee::Client`]: one primitive call per pass plus the transition
//! calls the change requires, stopping at the first failure.

pub mod plan;
pub mod subscription;

pub use plan::PlanReconciler;
pub use subscription::SubscriptionReconciler;

use std::fmt;
use thiserror::Error;

/// Reason sent when accepting a freshly created subscription.
pub const CREATE_ACCEPT_REASON: &str = "Auto-approved by Terraform";

/// Reason sent when accepting a subscription after a transfer.
pub const TRANSFER_ACCEPT_REASON: &str = "Auto-approved transfer by Terraform";

/// One remote call of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Create,
    Read,
    Update,
    Delete,
    Publish,
    Accept,
    Transfer,
    Close,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Create => "create",
            Step::Read => "read",
            Step::Update => "update",
            Step::Delete => "delete",
            Step::Publish => "publish",
            Step::Accept => "accept",
            Step::Transfer => "transfer",
            Step::Close => "close",
        }
    }

    /// Whether this step is a lifecycle transition rather than a primitive.
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Step::Publish | Step::Accept | Step::Transfer | Step::Close
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First failure of a pass, annotated with the step that produced it.
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct StepError {
    pub step: Step,
    #[source]
    pub source: gravitee::Error,
    /// Id of a resource created earlier in the same pass.
    pub created_id: Option<String>,
}

impl StepError {
    pub fn new(step: Step, source: gravitee::Error) -> Self {
        Self {
            step,
            source,
            created_id: None,
        }
    }

    /// Attach the id of a resource the pass already created.
    pub fn with_created_id(mut self, id: impl Into<String>) -> Self {
        self.created_id = Some(id.into());
        self
    }
}

/// Annotate a client result with the step it belongs to.
pub(crate) trait StepContext<T> {
    fn step(self, step: Step) -> Result<T, StepError>;
}

impl<T> StepContext<T> for gravitee::Result<T> {
    fn step(self, step: Step) -> Result<T, StepError> {
        self.map_err(|e| StepError::new(step, e))
    }
}
