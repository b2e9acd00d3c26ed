//! # gravitee
//!
//! Blocking client for the Gravitee APIM Management API v2.
//!
//! This crate provides:
//! - Typed wire representations of plans, subscriptions and APIs
//! - One method per remote operation, including the lifecycle transitions
//!   (publish, accept, transfer, close)
//! - Classified failures ([`Error`], [`ErrorCategory`])
//! - A [`Backend`] seam with an HTTP implementation and an in-memory mock
//!
//! ## Example
//!
//! ```no_run
//! use gravitee::{Client, Credentials, Plan, PlanSecurity};
//!
//! let client = Client::new(
//!     "https://apim.example.com",
//!     &Credentials::Basic { username: "admin".into(), password: "admin".into() },
//! );
//!
//! let plan = Plan {
//!     name: "Gold".to_string(),
//!     definition_version: "V4".to_string(),
//!     mode: "STANDARD".to_string(),
//!     security: Some(PlanSecurity { security_type: "KEY_LESS".to_string() }),
//!     ..Default::default()
//! };
//!
//! let created = client.create_plan("api-1", &plan).unwrap();
//! client.publish_plan("api-1", created.id.as_deref().unwrap()).unwrap();
//! ```
//!
//! Every method performs exactly one round trip. Nothing is retried.

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::http::{Credentials, DEFAULT_TIMEOUT, HttpBackend};
pub use backend::{Backend, Method, MockBackend, RecordedRequest, Request, Response};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    AcceptSubscription, Api, ConsumerConfiguration, EntrypointConfiguration, Header, Plan,
    PlanSecurity, PlanStatus, Subscription, SubscriptionStatus, SubscriptionUpdate,
    TransferSubscription,
};

use serde::de::DeserializeOwned;

/// Environment used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "DEFAULT";

const CREATED: &[u16] = &[200, 201];
const OK: &[u16] = &[200];
const REMOVED: &[u16] = &[200, 204, 404];

/// High-level client for Management API operations.
///
/// All paths are scoped to one environment, `DEFAULT` unless changed with
/// [`Client::environment`].
pub struct Client {
    backend: Box<dyn Backend>,
    environment: String,
}

impl Client {
    /// Create a client talking HTTP to `management_url`.
    #[must_use]
    pub fn new(management_url: &str, credentials: &Credentials) -> Self {
        Self::with_backend(Box::new(HttpBackend::new(management_url, credentials)))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }

    /// Scope the client to another environment.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Environment the client is scoped to.
    #[must_use]
    pub fn environment_id(&self) -> &str {
        &self.environment
    }

    // =========================================================================
    // Plans
    // =========================================================================

    /// Create a plan under `api_id`. The returned plan carries its new id.
    pub fn create_plan(&self, api_id: &str, plan: &Plan) -> Result<Plan> {
        let request = Request::json(Method::Post, self.plans_path(api_id), plan)?;
        let created: Plan = self.expect_json(&request, CREATED, "api", api_id)?;
        if created.id.is_none() {
            return Err(Error::Decode("created plan has no id".to_string()));
        }
        Ok(created)
    }

    /// Read a plan. `Ok(None)` when the remote reports it absent.
    pub fn get_plan(&self, api_id: &str, plan_id: &str) -> Result<Option<Plan>> {
        let request = Request::new(Method::Get, self.plan_path(api_id, plan_id));
        self.read(&request, "plan", plan_id)
    }

    /// Replace a plan. The plan must carry its id.
    pub fn update_plan(&self, api_id: &str, plan: &Plan) -> Result<Plan> {
        let Some(plan_id) = plan.id.as_deref() else {
            return Err(Error::not_found("plan", "<unassigned>"));
        };
        let request = Request::json(Method::Put, self.plan_path(api_id, plan_id), plan)?;
        self.expect_json(&request, OK, "plan", plan_id)
    }

    /// Delete a plan. Deleting an absent plan succeeds.
    pub fn delete_plan(&self, api_id: &str, plan_id: &str) -> Result<()> {
        let request = Request::new(Method::Delete, self.plan_path(api_id, plan_id));
        self.expect(&request, REMOVED, "plan", plan_id).map(drop)
    }

    /// Publish a plan, making it available to consumers.
    pub fn publish_plan(&self, api_id: &str, plan_id: &str) -> Result<()> {
        let path = format!("{}/_publish", self.plan_path(api_id, plan_id));
        let request = Request::new(Method::Post, path);
        self.expect(&request, OK, "plan", plan_id).map(drop)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Create a subscription under `api_id`.
    pub fn create_subscription(
        &self,
        api_id: &str,
        subscription: &Subscription,
    ) -> Result<Subscription> {
        let request = Request::json(Method::Post, self.subscriptions_path(api_id), subscription)?;
        let created: Subscription = self.expect_json(&request, CREATED, "api", api_id)?;
        if created.id.is_none() {
            return Err(Error::Decode("created subscription has no id".to_string()));
        }
        Ok(created)
    }

    /// Read a subscription. `Ok(None)` when the remote reports it absent.
    pub fn get_subscription(
        &self,
        api_id: &str,
        subscription_id: &str,
    ) -> Result<Option<Subscription>> {
        let request = Request::new(Method::Get, self.subscription_path(api_id, subscription_id));
        self.read(&request, "subscription", subscription_id)
    }

    /// Update the consumer configuration and metadata of a subscription.
    pub fn update_subscription(
        &self,
        api_id: &str,
        subscription_id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<Subscription> {
        let request = Request::json(
            Method::Put,
            self.subscription_path(api_id, subscription_id),
            update,
        )?;
        self.expect_json(&request, OK, "subscription", subscription_id)
    }

    /// Close a subscription. Closing an absent subscription succeeds.
    pub fn close_subscription(&self, api_id: &str, subscription_id: &str) -> Result<()> {
        let request = Request::new(Method::Delete, self.subscription_path(api_id, subscription_id));
        self.expect(&request, REMOVED, "subscription", subscription_id)
            .map(drop)
    }

    /// Accept a pending subscription.
    pub fn accept_subscription(
        &self,
        api_id: &str,
        subscription_id: &str,
        reason: &str,
    ) -> Result<()> {
        let path = format!("{}/_accept", self.subscription_path(api_id, subscription_id));
        let body = AcceptSubscription {
            reason: reason.to_string(),
        };
        let request = Request::json(Method::Post, path, &body)?;
        self.expect(&request, OK, "subscription", subscription_id)
            .map(drop)
    }

    /// Move a subscription to another plan of the same API.
    pub fn transfer_subscription(
        &self,
        api_id: &str,
        subscription_id: &str,
        plan_id: &str,
    ) -> Result<()> {
        let path = format!("{}/_transfer", self.subscription_path(api_id, subscription_id));
        let body = TransferSubscription {
            plan_id: plan_id.to_string(),
        };
        let request = Request::json(Method::Post, path, &body)?;
        self.expect(&request, OK, "subscription", subscription_id)
            .map(drop)
    }

    // =========================================================================
    // APIs and connectivity
    // =========================================================================

    /// Read an API definition. `Ok(None)` when it does not exist.
    pub fn get_api(&self, api_id: &str) -> Result<Option<Api>> {
        let request = Request::new(Method::Get, format!("{}/apis/{}", self.env_path(), api_id));
        self.read(&request, "api", api_id)
    }

    /// Check the management URL is reachable and the credentials accepted.
    pub fn check_connection(&self) -> Result<()> {
        let request = Request::new(Method::Get, self.env_path());
        let environment = self.environment.clone();
        self.expect(&request, OK, "environment", &environment)
            .map(drop)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn env_path(&self) -> String {
        format!("/management/v2/environments/{}", self.environment)
    }

    fn plans_path(&self, api_id: &str) -> String {
        format!("{}/apis/{}/plans", self.env_path(), api_id)
    }

    fn plan_path(&self, api_id: &str, plan_id: &str) -> String {
        format!("{}/{}", self.plans_path(api_id), plan_id)
    }

    fn subscriptions_path(&self, api_id: &str) -> String {
        format!("{}/apis/{}/subscriptions", self.env_path(), api_id)
    }

    fn subscription_path(&self, api_id: &str, subscription_id: &str) -> String {
        format!("{}/{}", self.subscriptions_path(api_id), subscription_id)
    }

    /// Send a request and classify its status.
    ///
    /// Statuses in `success` pass through; 404 becomes [`Error::NotFound`]
    /// for `resource`/`id`; anything else is [`Error::RemoteRejected`].
    fn expect(
        &self,
        request: &Request,
        success: &[u16],
        resource: &'static str,
        id: &str,
    ) -> Result<Response> {
        let response = self.backend.send(request)?;
        if success.contains(&response.status) {
            return Ok(response);
        }
        log::debug!(
            "{} {} failed with status {}",
            request.method,
            request.path,
            response.status
        );
        if response.status == 404 {
            return Err(Error::not_found(resource, id));
        }
        Err(Error::rejected(response.status, response.body))
    }

    fn expect_json<T: DeserializeOwned>(
        &self,
        request: &Request,
        success: &[u16],
        resource: &'static str,
        id: &str,
    ) -> Result<T> {
        self.expect(request, success, resource, id)?.json()
    }

    fn read<T: DeserializeOwned>(
        &self,
        request: &Request,
        resource: &'static str,
        id: &str,
    ) -> Result<Option<T>> {
        match self.expect_json(request, OK, resource, id) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => {
                log::debug!("{} {} is absent", resource, id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
