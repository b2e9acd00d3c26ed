//! Subscription lifecycle: `absent -> pending -> accepted`, plus the plan a
//! subscription belongs to, which only changes through a transfer.
//!
//! Update and transfer are independent: one pass may issue both.

use super::{CREATE_ACCEPT_REASON, Step, StepContext, StepError, TRANSFER_ACCEPT_REASON};
use crate::mapper;
use crate::model::{ObservedSubscription, SubscriptionSpec};
use declarative::{Created, Identity, Operation, Resource};
use gravitee::{Client, Subscription, SubscriptionStatus};

/// Reconciles subscriptions through a borrowed client.
pub struct SubscriptionReconciler<'a> {
    client: &'a Client,
    auto_validate: bool,
}

impl<'a> SubscriptionReconciler<'a> {
    pub fn new(client: &'a Client, auto_validate: bool) -> Self {
        Self {
            client,
            auto_validate,
        }
    }

    fn accept(&self, api_id: &str, id: &str, reason: &str) -> Result<(), StepError> {
        log::info!("Accepting subscription {}", id);
        self.client
            .accept_subscription(api_id, id, reason)
            .step(Step::Accept)
    }

    fn fetch(&self, api_id: &str, id: &str) -> Result<Subscription, StepError> {
        self.client
            .get_subscription(api_id, id)
            .step(Step::Read)?
            .ok_or_else(|| {
                StepError::new(Step::Read, gravitee::Error::not_found("subscription", id))
            })
    }

    fn read_back(&self, api_id: &str, id: &str) -> Result<ObservedSubscription, StepError> {
        self.fetch(api_id, id).map(|s| observe(id, &s))
    }

    /// Update, transfer and accept as needed to go from `previous` to
    /// `desired`, then read back. `status` is the remote status when known.
    fn apply_changes(
        &self,
        identity: &Identity,
        previous: &SubscriptionSpec,
        status: Option<SubscriptionStatus>,
        desired: &SubscriptionSpec,
    ) -> Result<ObservedSubscription, StepError> {
        let api_id = identity.parent.as_str();
        let id = identity.id.as_str();

        if previous.needs_update(desired) {
            self.client
                .update_subscription(api_id, id, &mapper::subscription::to_update(desired))
                .step(Step::Update)?;
            log::debug!("Updated subscription {}", id);
        }

        if previous.needs_transfer(desired) {
            log::info!(
                "Transferring subscription {} from plan {} to {}",
                id,
                previous.plan_id,
                desired.plan_id
            );
            self.client
                .transfer_subscription(api_id, id, &desired.plan_id)
                .step(Step::Transfer)?;
            if self.auto_validate {
                self.accept(api_id, id, TRANSFER_ACCEPT_REASON)?;
            }
        } else if self.auto_validate && status == Some(SubscriptionStatus::Pending) {
            self.accept(api_id, id, CREATE_ACCEPT_REASON)?;
        }

        self.read_back(api_id, id)
    }
}

fn observe(id: &str, subscription: &Subscription) -> ObservedSubscription {
    ObservedSubscription {
        id: subscription.id.clone().unwrap_or_else(|| id.to_string()),
        status: subscription.status,
        record: mapper::subscription::from_wire(subscription),
    }
}

impl Resource for SubscriptionReconciler<'_> {
    type Desired = SubscriptionSpec;
    type Observed = ObservedSubscription;
    type Step = Step;
    type Error = StepError;

    fn resource_type(&self) -> &'static str {
        "subscription"
    }

    fn create(
        &self,
        api_id: &str,
        desired: &SubscriptionSpec,
    ) -> Result<Created<ObservedSubscription>, StepError> {
        let created = self
            .client
            .create_subscription(api_id, &mapper::subscription::to_create(desired))
            .step(Step::Create)?;
        let Some(id) = created.id else {
            return Err(StepError::new(
                Step::Create,
                gravitee::Error::Decode("created subscription has no id".to_string()),
            ));
        };
        log::info!(
            "Created subscription {} for application {}",
            id,
            desired.application_id
        );

        if self.auto_validate && created.status != Some(SubscriptionStatus::Accepted) {
            self.accept(api_id, &id, CREATE_ACCEPT_REASON)
                .map_err(|e| e.with_created_id(&id))?;
        }
        let observed = self
            .read_back(api_id, &id)
            .map_err(|e| e.with_created_id(&id))?;
        Ok(Created { id, observed })
    }

    fn read(&self, identity: &Identity) -> Result<Option<ObservedSubscription>, StepError> {
        let subscription = self
            .client
            .get_subscription(&identity.parent, &identity.id)
            .step(Step::Read)?;
        Ok(subscription.map(|s| observe(&identity.id, &s)))
    }

    fn update(
        &self,
        identity: &Identity,
        previous: Option<&SubscriptionSpec>,
        desired: &SubscriptionSpec,
    ) -> Result<ObservedSubscription, StepError> {
        match previous {
            Some(previous) => self.apply_changes(identity, previous, None, desired),
            None => {
                // Compare against what the remote holds.
                let current = self.fetch(&identity.parent, &identity.id)?;
                let previous = mapper::subscription::from_wire(&current);
                self.apply_changes(identity, &previous, current.status, desired)
            }
        }
    }

    fn resume(
        &self,
        identity: &Identity,
        observed: ObservedSubscription,
        desired: &SubscriptionSpec,
    ) -> Result<ObservedSubscription, StepError> {
        self.apply_changes(identity, &observed.record, observed.status, desired)
    }

    fn delete(&self, identity: &Identity) -> Result<(), StepError> {
        let current = self
            .client
            .get_subscription(&identity.parent, &identity.id)
            .step(Step::Read)?;
        match current {
            None => {
                log::debug!("Subscription {} already gone", identity.id);
                Ok(())
            }
            Some(s) if s.status == Some(SubscriptionStatus::Closed) => {
                log::debug!("Subscription {} already closed", identity.id);
                Ok(())
            }
            Some(_) => {
                log::info!("Closing subscription {}", identity.id);
                self.client
                    .close_subscription(&identity.parent, &identity.id)
                    .step(Step::Close)
            }
        }
    }

    fn requires_replacement(&self, previous: &SubscriptionSpec, desired: &SubscriptionSpec) -> bool {
        previous.application_id != desired.application_id
    }

    fn created_id(&self, error: &StepError) -> Option<String> {
        error.created_id.clone()
    }

    fn planned_steps(
        &self,
        operation: Operation,
        previous: Option<&SubscriptionSpec>,
        desired: Option<&SubscriptionSpec>,
    ) -> Vec<Step> {
        let create = || {
            let mut steps = vec![Step::Create];
            if self.auto_validate {
                steps.push(Step::Accept);
            }
            steps.push(Step::Read);
            steps
        };

        match (operation, previous, desired) {
            (Operation::Create, _, Some(_)) => create(),
            (Operation::Replace, _, Some(_)) => {
                let mut steps = vec![Step::Read, Step::Close];
                steps.extend(create());
                steps
            }
            (Operation::Update, Some(previous), Some(desired)) => {
                let mut steps = Vec::new();
                if previous.needs_update(desired) {
                    steps.push(Step::Update);
                }
                if previous.needs_transfer(desired) {
                    steps.push(Step::Transfer);
                    if self.auto_validate {
                        steps.push(Step::Accept);
                    }
                }
                steps.push(Step::Read);
                steps
            }
            // Resuming: any step may still be due, depending on the remote.
            (Operation::Update, None, Some(_)) => {
                let mut steps = vec![Step::Read, Step::Update, Step::Transfer];
                if self.auto_validate {
                    steps.push(Step::Accept);
                }
                steps.push(Step::Read);
                steps
            }
            (Operation::Delete, _, _) => vec![Step::Read, Step::Close],
            (Operation::Refresh, _, _) => vec![Step::Read],
            _ => Vec::new(),
        }
    }
}
