//! Plan lifecycle: `absent -> created -> published`.
//!
//! A plan is published right after creation when `auto_publish` is on, and
//! again after an update that touches its consumer-visible contract. There is
//! no unpublish transition.

use super::{Step, StepContext, StepError};
use crate::mapper;
use crate::model::{ObservedPlan, PlanSpec};
use declarative::{Created, Identity, Operation, Resource};
use gravitee::{Client, Plan};

/// Reconciles plans through a borrowed client.
pub struct PlanReconciler<'a> {
    client: &'a Client,
    auto_publish: bool,
}

impl<'a> PlanReconciler<'a> {
    pub fn new(client: &'a Client, auto_publish: bool) -> Self {
        Self {
            client,
            auto_publish,
        }
    }

    fn publishes_on_update(&self, previous: Option<&PlanSpec>, desired: &PlanSpec) -> bool {
        self.auto_publish && previous.is_none_or(|p| p.needs_republish(desired))
    }

    fn publish(&self, api_id: &str, id: &str) -> Result<(), StepError> {
        log::info!("Publishing plan {}", id);
        self.client.publish_plan(api_id, id).step(Step::Publish)
    }

    fn read_back(&self, api_id: &str, id: &str) -> Result<ObservedPlan, StepError> {
        match self.client.get_plan(api_id, id).step(Step::Read)? {
            Some(plan) => Ok(observe(id, &plan)),
            None => Err(StepError::new(
                Step::Read,
                gravitee::Error::not_found("plan", id),
            )),
        }
    }
}

fn observe(id: &str, plan: &Plan) -> ObservedPlan {
    ObservedPlan {
        id: plan.id.clone().unwrap_or_else(|| id.to_string()),
        status: plan.status,
        record: mapper::plan::from_wire(plan),
    }
}

impl Resource for PlanReconciler<'_> {
    type Desired = PlanSpec;
    type Observed = ObservedPlan;
    type Step = Step;
    type Error = StepError;

    fn resource_type(&self) -> &'static str {
        "plan"
    }

    fn create(&self, api_id: &str, desired: &PlanSpec) -> Result<Created<ObservedPlan>, StepError> {
        let created = self
            .client
            .create_plan(api_id, &mapper::plan::to_create(desired))
            .step(Step::Create)?;
        let Some(id) = created.id else {
            return Err(StepError::new(
                Step::Create,
                gravitee::Error::Decode("created plan has no id".to_string()),
            ));
        };
        log::info!("Created plan {} on API {}", id, api_id);

        if self.auto_publish {
            self.publish(api_id, &id)
                .map_err(|e| e.with_created_id(&id))?;
        }
        let observed = self
            .read_back(api_id, &id)
            .map_err(|e| e.with_created_id(&id))?;
        Ok(Created { id, observed })
    }

    fn read(&self, identity: &Identity) -> Result<Option<ObservedPlan>, StepError> {
        let plan = self
            .client
            .get_plan(&identity.parent, &identity.id)
            .step(Step::Read)?;
        Ok(plan.map(|p| observe(&identity.id, &p)))
    }

    fn update(
        &self,
        identity: &Identity,
        previous: Option<&PlanSpec>,
        desired: &PlanSpec,
    ) -> Result<ObservedPlan, StepError> {
        let api_id = identity.parent.as_str();
        self.client
            .update_plan(api_id, &mapper::plan::to_update(&identity.id, desired))
            .step(Step::Update)?;
        log::debug!("Updated plan {}", identity.id);

        if self.publishes_on_update(previous, desired) {
            self.publish(api_id, &identity.id)?;
        }
        self.read_back(api_id, &identity.id)
    }

    fn delete(&self, identity: &Identity) -> Result<(), StepError> {
        log::info!("Deleting plan {}", identity.id);
        self.client
            .delete_plan(&identity.parent, &identity.id)
            .step(Step::Delete)
    }

    fn created_id(&self, error: &StepError) -> Option<String> {
        error.created_id.clone()
    }

    fn planned_steps(
        &self,
        operation: Operation,
        previous: Option<&PlanSpec>,
        desired: Option<&PlanSpec>,
    ) -> Vec<Step> {
        let create = || {
            let mut steps = vec![Step::Create];
            if self.auto_publish {
                steps.push(Step::Publish);
            }
            steps.push(Step::Read);
            steps
        };

        match (operation, desired) {
            (Operation::Create, Some(_)) => create(),
            (Operation::Replace, Some(_)) => {
                let mut steps = vec![Step::Delete];
                steps.extend(create());
                steps
            }
            (Operation::Update, Some(desired)) => {
                let mut steps = Vec::new();
                if previous.is_none() {
                    steps.push(Step::Read);
                }
                steps.push(Step::Update);
                if self.publishes_on_update(previous, desired) {
                    steps.push(Step::Publish);
                }
                steps.push(Step::Read);
                steps
            }
            (Operation::Delete, _) => vec![Step::Delete],
            (Operation::Refresh, _) => vec![Step::Read],
            _ => Vec::new(),
        }
    }
}
