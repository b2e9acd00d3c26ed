//! Transport backends for the Management API.
//!
//! A [`Backend`] performs one HTTP exchange and hands back the raw status
//! and body; classifying the result is the [`Client`](crate::Client)'s job.
//! The primary implementation is [`http::HttpBackend`].
//!
//! # Testing
//!
//! Use [`MockBackend`] to run the client against an in-memory management
//! service. It keeps plans and subscriptions, applies lifecycle transitions
//! the way the remote does, and records every request it receives:
//!
//! ```
//! use gravitee::{Client, MockBackend};
//!
//! let mock = MockBackend::new();
//! let client = Client::with_backend(Box::new(mock.clone()));
//!
//! assert!(client.get_plan("api-1", "missing").unwrap().is_none());
//! assert_eq!(mock.calls(), vec!["GET apis/api-1/plans/missing"]);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    AcceptSubscription, Api, Plan, PlanStatus, Subscription, SubscriptionStatus,
    SubscriptionUpdate, TransferSubscription,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// HTTP methods used by the Management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// A request relative to the management base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Absolute path, starting with `/management/v2`.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<String>,
}

impl Request {
    /// Request without a body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Request with a JSON-encoded body.
    pub fn json<T: serde::Serialize>(method: Method, path: impl Into<String>, body: &T) -> Result<Self> {
        Ok(Self {
            method,
            path: path.into(),
            body: Some(serde_json::to_string(body)?),
        })
    }
}

/// Raw response: status code plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(Error::from)
    }
}

/// Transport trait for the Management API.
///
/// Implementations perform exactly one exchange per call, without retries.
/// Only connection-level problems are errors; every HTTP status, including
/// 4xx and 5xx, comes back as a [`Response`].
pub trait Backend: Send + Sync {
    /// Send a request and return the raw response.
    fn send(&self, request: &Request) -> Result<Response>;
}

// =============================================================================
// Mock backend
// =============================================================================

/// A request as seen by the [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path relative to the environment, e.g. `apis/api-1/plans`.
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    method: Method,
    path_suffix: String,
    /// `None` simulates a connection failure.
    status: Option<u16>,
}

#[derive(Debug, Default)]
struct MockState {
    apis: BTreeMap<String, Api>,
    /// Plan id -> (api id, plan).
    plans: BTreeMap<String, (String, Plan)>,
    /// Subscription id -> (api id, subscription).
    subscriptions: BTreeMap<String, (String, Subscription)>,
    initial_subscription_status: Option<SubscriptionStatus>,
    failures: Vec<InjectedFailure>,
    requests: Vec<RecordedRequest>,
    next_id: u64,
}

/// In-memory management service for tests.
///
/// Plans start in `STAGING` and move to `PUBLISHED` on `_publish`.
/// Subscriptions start in `PENDING` (configurable), move to `ACCEPTED` on
/// `_accept`, back to `PENDING` on `_transfer`, and to `CLOSED` on delete.
/// Closing or accepting a closed subscription is rejected with 400, like the
/// real service.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create an empty mock service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Status newly created subscriptions report (default `PENDING`).
    #[must_use]
    pub fn with_initial_subscription_status(self, status: SubscriptionStatus) -> Self {
        self.lock().initial_subscription_status = Some(status);
        self
    }

    /// Register an API definition.
    pub fn add_api(&self, api: Api) {
        self.lock().apis.insert(api.id.clone(), api);
    }

    /// Store a plan directly, bypassing the request log. Returns its id.
    pub fn insert_plan(&self, api_id: &str, mut plan: Plan) -> String {
        let mut state = self.lock();
        let id = plan.id.clone().unwrap_or_else(|| next_id(&mut state, "plan"));
        plan.id = Some(id.clone());
        plan.status.get_or_insert(PlanStatus::Staging);
        state.plans.insert(id.clone(), (api_id.to_string(), plan));
        id
    }

    /// Store a subscription directly, bypassing the request log. Returns its id.
    pub fn insert_subscription(&self, api_id: &str, mut subscription: Subscription) -> String {
        let mut state = self.lock();
        let id = subscription
            .id
            .clone()
            .unwrap_or_else(|| next_id(&mut state, "sub"));
        subscription.id = Some(id.clone());
        subscription.status.get_or_insert(SubscriptionStatus::Pending);
        state
            .subscriptions
            .insert(id.clone(), (api_id.to_string(), subscription));
        id
    }

    /// Remove a plan behind the client's back.
    pub fn remove_plan(&self, id: &str) {
        self.lock().plans.remove(id);
    }

    /// Current remote copy of a plan.
    #[must_use]
    pub fn plan(&self, id: &str) -> Option<Plan> {
        self.lock().plans.get(id).map(|(_, plan)| plan.clone())
    }

    /// Current remote copy of a subscription.
    #[must_use]
    pub fn subscription(&self, id: &str) -> Option<Subscription> {
        self.lock()
            .subscriptions
            .get(id)
            .map(|(_, subscription)| subscription.clone())
    }

    /// Make the next matching request answer with `status`.
    pub fn fail_once(&self, method: Method, path_suffix: &str, status: u16) {
        self.lock().failures.push(InjectedFailure {
            method,
            path_suffix: path_suffix.to_string(),
            status: Some(status),
        });
    }

    /// Make the next matching request fail at the connection level.
    pub fn disconnect_once(&self, method: Method, path_suffix: &str) {
        self.lock().failures.push(InjectedFailure {
            method,
            path_suffix: path_suffix.to_string(),
            status: None,
        });
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests received so far, formatted as `METHOD path`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    /// Forget the recorded requests.
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }
}

fn next_id(state: &mut MockState, prefix: &str) -> String {
    state.next_id += 1;
    format!("{}-{}", prefix, state.next_id)
}

fn decode<T: DeserializeOwned>(body: Option<&String>) -> std::result::Result<T, Response> {
    let raw = body.map(String::as_str).unwrap_or("null");
    serde_json::from_str(raw).map_err(|e| error_response(400, &e.to_string()))
}

fn error_response(status: u16, message: &str) -> Response {
    Response::new(
        status,
        json!({ "httpStatus": status, "message": message }).to_string(),
    )
}

fn json_response<T: serde::Serialize>(status: u16, value: &T) -> Response {
    match serde_json::to_string(value) {
        Ok(body) => Response::new(status, body),
        Err(e) => error_response(500, &e.to_string()),
    }
}

fn not_found(kind: &str, id: &str) -> Response {
    error_response(404, &format!("{} [{}] cannot be found.", kind, id))
}

impl MockState {
    fn route(&mut self, method: Method, segments: &[&str], body: Option<&String>) -> Response {
        match (method, segments) {
            (Method::Get, []) => json_response(200, &json!({ "id": "DEFAULT" })),
            (Method::Get, ["apis", api]) => match self.apis.get(*api) {
                Some(found) => json_response(200, found),
                None => not_found("Api", api),
            },
            (Method::Post, ["apis", api, "plans"]) => {
                let mut plan: Plan = match decode(body) {
                    Ok(plan) => plan,
                    Err(response) => return response,
                };
                let id = next_id(self, "plan");
                plan.id = Some(id.clone());
                plan.status = Some(PlanStatus::Staging);
                self.plans.insert(id, (api.to_string(), plan.clone()));
                json_response(201, &plan)
            }
            (_, ["apis", api, "plans", id, rest @ ..]) => self.route_plan(method, api, id, rest, body),
            (Method::Post, ["apis", api, "subscriptions"]) => {
                let mut subscription: Subscription = match decode(body) {
                    Ok(subscription) => subscription,
                    Err(response) => return response,
                };
                let id = next_id(self, "sub");
                subscription.id = Some(id.clone());
                subscription.status = Some(
                    self.initial_subscription_status
                        .unwrap_or(SubscriptionStatus::Pending),
                );
                self.subscriptions
                    .insert(id, (api.to_string(), subscription.clone()));
                json_response(201, &subscription)
            }
            (_, ["apis", api, "subscriptions", id, rest @ ..]) => {
                self.route_subscription(method, api, id, rest, body)
            }
            _ => error_response(404, "No route"),
        }
    }

    fn route_plan(
        &mut self,
        method: Method,
        api: &str,
        id: &str,
        rest: &[&str],
        body: Option<&String>,
    ) -> Response {
        let Some((owner, plan)) = self.plans.get_mut(id) else {
            return not_found("Plan", id);
        };
        if owner.as_str() != api {
            return not_found("Plan", id);
        }

        match (method, rest) {
            (Method::Get, []) => json_response(200, plan),
            (Method::Put, []) => {
                let update: Plan = match decode(body) {
                    Ok(update) => update,
                    Err(response) => return response,
                };
                *plan = Plan {
                    id: plan.id.take(),
                    status: plan.status,
                    ..update
                };
                json_response(200, plan)
            }
            (Method::Post, ["_publish"]) => {
                plan.status = Some(PlanStatus::Published);
                json_response(200, plan)
            }
            (Method::Delete, []) => {
                self.plans.remove(id);
                Response::new(204, "")
            }
            _ => error_response(405, "Method not allowed"),
        }
    }

    fn route_subscription(
        &mut self,
        method: Method,
        api: &str,
        id: &str,
        rest: &[&str],
        body: Option<&String>,
    ) -> Response {
        let Some((owner, subscription)) = self.subscriptions.get_mut(id) else {
            return not_found("Subscription", id);
        };
        if owner.as_str() != api {
            return not_found("Subscription", id);
        }
        let closed = subscription.status == Some(SubscriptionStatus::Closed);

        match (method, rest) {
            (Method::Get, []) => json_response(200, subscription),
            (Method::Put, []) => {
                let update: SubscriptionUpdate = match decode(body) {
                    Ok(update) => update,
                    Err(response) => return response,
                };
                subscription.consumer_configuration = update.consumer_configuration;
                subscription.metadata = update.metadata;
                json_response(200, subscription)
            }
            (Method::Delete, []) if closed => {
                error_response(400, &format!("Subscription [{}] is already closed", id))
            }
            (Method::Delete, []) => {
                subscription.status = Some(SubscriptionStatus::Closed);
                Response::new(204, "")
            }
            (Method::Post, ["_accept"]) if closed => {
                error_response(400, &format!("Subscription [{}] is closed", id))
            }
            (Method::Post, ["_accept"]) => {
                if let Err(response) = decode::<AcceptSubscription>(body) {
                    return response;
                }
                subscription.status = Some(SubscriptionStatus::Accepted);
                json_response(200, subscription)
            }
            (Method::Post, ["_transfer"]) => {
                let transfer: TransferSubscription = match decode(body) {
                    Ok(transfer) => transfer,
                    Err(response) => return response,
                };
                subscription.plan_id = transfer.plan_id;
                subscription.status = Some(SubscriptionStatus::Pending);
                json_response(200, subscription)
            }
            _ => error_response(405, "Method not allowed"),
        }
    }
}

impl Backend for MockBackend {
    fn send(&self, request: &Request) -> Result<Response> {
        let mut state = self.lock();

        // Strip "/management/v2/environments/{env}" to keep recorded paths short.
        let relative: Vec<&str> = request
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .skip(4)
            .collect();
        let path = relative.join("/");

        state.requests.push(RecordedRequest {
            method: request.method,
            path: path.clone(),
            body: request
                .body
                .as_deref()
                .and_then(|b| serde_json::from_str(b).ok()),
        });

        if let Some(pos) = state
            .failures
            .iter()
            .position(|f| f.method == request.method && path.ends_with(&f.path_suffix))
        {
            let failure = state.failures.remove(pos);
            return match failure.status {
                Some(status) => Ok(error_response(status, "injected failure")),
                None => Err(Error::Transport("connection reset by peer".to_string())),
            };
        }

        Ok(state.route(request.method, &relative, request.body.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(mock: &MockBackend, method: Method, path: &str, body: Option<Value>) -> Response {
        let request = Request {
            method,
            path: format!("/management/v2/environments/DEFAULT/{}", path),
            body: body.map(|b| b.to_string()),
        };
        mock.send(&request).unwrap()
    }

    #[test]
    fn test_mock_create_and_publish_plan() {
        let mock = MockBackend::new();
        let created = send(
            &mock,
            Method::Post,
            "apis/api-1/plans",
            Some(json!({ "name": "Gold", "mode": "STANDARD" })),
        );
        assert_eq!(created.status, 201);
        let plan: Plan = created.json().unwrap();
        let id = plan.id.unwrap();
        assert_eq!(plan.status, Some(PlanStatus::Staging));

        let published = send(&mock, Method::Post, &format!("apis/api-1/plans/{}/_publish", id), None);
        assert_eq!(published.status, 200);
        assert_eq!(mock.plan(&id).unwrap().status, Some(PlanStatus::Published));
    }

    #[test]
    fn test_mock_plan_scoped_to_api() {
        let mock = MockBackend::new();
        let id = mock.insert_plan("api-1", Plan::default());

        let other = send(&mock, Method::Get, &format!("apis/api-2/plans/{}", id), None);
        assert_eq!(other.status, 404);
    }

    #[test]
    fn test_mock_close_twice_is_rejected() {
        let mock = MockBackend::new();
        let id = mock.insert_subscription("api-1", Subscription::default());
        let path = format!("apis/api-1/subscriptions/{}", id);

        assert_eq!(send(&mock, Method::Delete, &path, None).status, 204);
        assert_eq!(send(&mock, Method::Delete, &path, None).status, 400);
        assert_eq!(
            mock.subscription(&id).unwrap().status,
            Some(SubscriptionStatus::Closed)
        );
    }

    #[test]
    fn test_mock_transfer_resets_to_pending() {
        let mock = MockBackend::new();
        let id = mock.insert_subscription(
            "api-1",
            Subscription {
                plan_id: "plan-a".to_string(),
                status: Some(SubscriptionStatus::Accepted),
                ..Default::default()
            },
        );

        let response = send(
            &mock,
            Method::Post,
            &format!("apis/api-1/subscriptions/{}/_transfer", id),
            Some(json!({ "plan": "plan-b" })),
        );
        assert_eq!(response.status, 200);

        let subscription = mock.subscription(&id).unwrap();
        assert_eq!(subscription.plan_id, "plan-b");
        assert_eq!(subscription.status, Some(SubscriptionStatus::Pending));
    }

    #[test]
    fn test_mock_injected_failures() {
        let mock = MockBackend::new();
        mock.fail_once(Method::Post, "plans", 500);

        let failed = send(&mock, Method::Post, "apis/api-1/plans", Some(json!({})));
        assert_eq!(failed.status, 500);

        let retried = send(&mock, Method::Post, "apis/api-1/plans", Some(json!({})));
        assert_eq!(retried.status, 201);

        mock.disconnect_once(Method::Get, "apis/api-1");
        let request = Request::new(Method::Get, "/management/v2/environments/DEFAULT/apis/api-1");
        assert!(matches!(mock.send(&request), Err(Error::Transport(_))));
    }

    #[test]
    fn test_mock_records_requests() {
        let mock = MockBackend::new();
        send(&mock, Method::Get, "apis/api-1/plans/p", None);
        send(&mock, Method::Post, "apis/api-1/subscriptions", Some(json!({ "planId": "p" })));

        assert_eq!(
            mock.calls(),
            vec!["GET apis/api-1/plans/p", "POST apis/api-1/subscriptions"]
        );
        let requests = mock.requests();
        assert_eq!(requests[1].body, Some(json!({ "planId": "p" })));

        mock.clear_requests();
        assert!(mock.calls().is_empty());
    }
}
