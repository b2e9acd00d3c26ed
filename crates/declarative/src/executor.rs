//! Convergence - routes one resource through create, update, replace,
//! delete or refresh.
//!
//! Routing follows the `(identity, previous, desired)` triple:
//!
//! | identity | previous | desired | operation |
//! |---|---|---|---|
//! | none | - | none | noop |
//! | some | - | none | delete |
//! | none | - | some | create |
//! | some | - | some, other parent | replace |
//! | some | none | some | resume: update (create if gone) |
//! | some | differs in replacement attributes | some | replace |
//! | some | equal to desired | some | refresh (create if gone) |
//! | some | differs | some | update |

use crate::resource::Resource;
use crate::types::{ApplyResult, Identity, Operation};
use std::fmt;

/// A desired record together with the parent it belongs to.
#[derive(Debug)]
pub struct Declared<'a, D> {
    pub parent: &'a str,
    pub record: &'a D,
}

// Holds references only, so no `D: Copy` bound.
impl<D> Clone for Declared<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Declared<'_, D> {}

impl<'a, D> Declared<'a, D> {
    /// Pair a record with its parent.
    pub fn new(parent: &'a str, record: &'a D) -> Self {
        Self { parent, record }
    }
}

/// Outcome of one reconciliation pass.
///
/// `identity` is what the caller must persist, whether or not the pass
/// succeeded: a failed create that left a remote resource behind still
/// reports its id.
#[derive(Debug)]
pub struct Pass<O, E> {
    /// What the pass did (or tried to do).
    pub operation: Operation,
    /// Identity after the pass. `None` when nothing exists remotely.
    pub identity: Option<Identity>,
    /// Observed state, `None` after a delete or a noop.
    pub outcome: Result<Option<O>, E>,
}

impl<O, E: fmt::Display> Pass<O, E> {
    /// Whether the pass succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Summary-friendly result of the pass.
    pub fn apply_result(&self) -> ApplyResult {
        match &self.outcome {
            Ok(_) => ApplyResult::from_operation(self.operation),
            Err(e) => ApplyResult::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Decide what a pass would do, without touching the remote.
///
/// A refresh may still turn into a create when the read finds the resource
/// gone; that can only be known by running the pass.
pub fn plan_operation<R: Resource>(
    resource: &R,
    identity: Option<&Identity>,
    previous: Option<&R::Desired>,
    desired: Option<Declared<'_, R::Desired>>,
) -> Operation {
    let Some(desired) = desired else {
        return match identity {
            Some(_) => Operation::Delete,
            None => Operation::Noop,
        };
    };
    let Some(identity) = identity else {
        return Operation::Create;
    };
    if identity.parent != desired.parent {
        return Operation::Replace;
    }
    match previous {
        None => Operation::Update,
        Some(previous) if resource.requires_replacement(previous, desired.record) => {
            Operation::Replace
        }
        Some(previous) if previous == desired.record => Operation::Refresh,
        Some(_) => Operation::Update,
    }
}

/// Run one reconciliation pass.
pub fn converge<R: Resource>(
    resource: &R,
    identity: Option<&Identity>,
    previous: Option<&R::Desired>,
    desired: Option<Declared<'_, R::Desired>>,
) -> Pass<R::Observed, R::Error> {
    let operation = plan_operation(resource, identity, previous, desired);
    let kind = resource.resource_type();
    log::debug!(
        "{} pass: {} ({})",
        kind,
        operation,
        identity.map_or_else(|| "new".to_string(), ToString::to_string)
    );

    match (operation, identity, previous, desired) {
        (Operation::Delete, Some(identity), _, _) => delete_pass(resource, identity),
        (Operation::Replace, Some(identity), _, Some(desired)) => {
            if let Err(e) = resource.delete(identity) {
                return Pass {
                    operation,
                    identity: Some(identity.clone()),
                    outcome: Err(e),
                };
            }
            create_pass(resource, operation, desired)
        }
        (Operation::Update, Some(identity), previous, Some(desired)) => {
            let outcome = match previous {
                Some(previous) => resource.update(identity, Some(previous), desired.record),
                None => {
                    log::info!("{} {} was left incomplete, resuming", kind, identity);
                    match resource.read(identity) {
                        Ok(Some(observed)) => resource.resume(identity, observed, desired.record),
                        Ok(None) => return create_pass(resource, Operation::Create, desired),
                        Err(e) => Err(e),
                    }
                }
            }
            .map(Some);
            Pass {
                operation,
                identity: Some(identity.clone()),
                outcome,
            }
        }
        (Operation::Refresh, Some(identity), _, Some(desired)) => match resource.read(identity) {
            Ok(Some(observed)) => Pass {
                operation,
                identity: Some(identity.clone()),
                outcome: Ok(Some(observed)),
            },
            Ok(None) => {
                log::info!("{} {} no longer exists, creating it again", kind, identity);
                create_pass(resource, Operation::Create, desired)
            }
            Err(e) => Pass {
                operation,
                identity: Some(identity.clone()),
                outcome: Err(e),
            },
        },
        (Operation::Create, _, _, Some(desired)) => create_pass(resource, operation, desired),
        _ => Pass {
            operation: Operation::Noop,
            identity: None,
            outcome: Ok(None),
        },
    }
}

fn create_pass<R: Resource>(
    resource: &R,
    operation: Operation,
    desired: Declared<'_, R::Desired>,
) -> Pass<R::Observed, R::Error> {
    match resource.create(desired.parent, desired.record) {
        Ok(created) => Pass {
            operation,
            identity: Some(Identity::new(desired.parent, created.id)),
            outcome: Ok(Some(created.observed)),
        },
        Err(e) => Pass {
            operation,
            identity: resource
                .created_id(&e)
                .map(|id| Identity::new(desired.parent, id)),
            outcome: Err(e),
        },
    }
}

fn delete_pass<R: Resource>(resource: &R, identity: &Identity) -> Pass<R::Observed, R::Error> {
    match resource.delete(identity) {
        Ok(()) => Pass {
            operation: Operation::Delete,
            identity: None,
            outcome: Ok(None),
        },
        Err(e) => Pass {
            operation: Operation::Delete,
            identity: Some(identity.clone()),
            outcome: Err(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Created;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    #[derive(Debug)]
    struct FakeError {
        message: String,
        created: Option<String>,
    }

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for FakeError {}

    /// Desired record: (name, owner). Changing the owner forces replacement.
    type Record = (String, String);

    #[derive(Default)]
    struct FakeResource {
        store: RefCell<BTreeMap<String, Record>>,
        calls: RefCell<Vec<String>>,
        next: RefCell<u32>,
        fail_after_create: bool,
    }

    impl FakeResource {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Resource for FakeResource {
        type Desired = Record;
        type Observed = Record;
        type Step = &'static str;
        type Error = FakeError;

        fn resource_type(&self) -> &'static str {
            "fake"
        }

        fn create(&self, parent: &str, desired: &Record) -> Result<Created<Record>, FakeError> {
            *self.next.borrow_mut() += 1;
            let id = format!("id-{}", self.next.borrow());
            self.calls.borrow_mut().push(format!("create {}", parent));
            self.store.borrow_mut().insert(id.clone(), desired.clone());
            if self.fail_after_create {
                return Err(FakeError {
                    message: "transition failed".into(),
                    created: Some(id),
                });
            }
            Ok(Created {
                id,
                observed: desired.clone(),
            })
        }

        fn read(&self, identity: &Identity) -> Result<Option<Record>, FakeError> {
            self.calls.borrow_mut().push(format!("read {}", identity.id));
            Ok(self.store.borrow().get(&identity.id).cloned())
        }

        fn update(
            &self,
            identity: &Identity,
            _previous: Option<&Record>,
            desired: &Record,
        ) -> Result<Record, FakeError> {
            self.calls
                .borrow_mut()
                .push(format!("update {}", identity.id));
            self.store
                .borrow_mut()
                .insert(identity.id.clone(), desired.clone());
            Ok(desired.clone())
        }

        fn resume(
            &self,
            identity: &Identity,
            observed: Record,
            desired: &Record,
        ) -> Result<Record, FakeError> {
            self.calls
                .borrow_mut()
                .push(format!("resume {} from {}", identity.id, observed.0));
            self.store
                .borrow_mut()
                .insert(identity.id.clone(), desired.clone());
            Ok(desired.clone())
        }

        fn delete(&self, identity: &Identity) -> Result<(), FakeError> {
            self.calls
                .borrow_mut()
                .push(format!("delete {}", identity.id));
            self.store.borrow_mut().remove(&identity.id);
            Ok(())
        }

        fn requires_replacement(&self, previous: &Record, desired: &Record) -> bool {
            previous.1 != desired.1
        }

        fn created_id(&self, error: &FakeError) -> Option<String> {
            error.created.clone()
        }

        fn planned_steps(
            &self,
            operation: Operation,
            _previous: Option<&Record>,
            _desired: Option<&Record>,
        ) -> Vec<&'static str> {
            match operation {
                Operation::Create => vec!["create"],
                Operation::Update => vec!["update"],
                Operation::Replace => vec!["delete", "create"],
                Operation::Delete => vec!["delete"],
                Operation::Refresh => vec!["read"],
                Operation::Noop => vec![],
            }
        }
    }

    fn record(name: &str, owner: &str) -> Record {
        (name.to_string(), owner.to_string())
    }

    #[test]
    fn test_create_when_no_identity() {
        let fake = FakeResource::default();
        let desired = record("a", "x");

        let pass = converge(&fake, None, None, Some(Declared::new("p1", &desired)));

        assert_eq!(pass.operation, Operation::Create);
        assert_eq!(pass.identity, Some(Identity::new("p1", "id-1")));
        assert_eq!(pass.outcome.unwrap(), Some(desired));
        assert_eq!(fake.calls(), vec!["create p1"]);
    }

    #[test]
    fn test_failed_create_keeps_created_id() {
        let fake = FakeResource {
            fail_after_create: true,
            ..Default::default()
        };
        let desired = record("a", "x");

        let pass = converge(&fake, None, None, Some(Declared::new("p1", &desired)));

        assert!(!pass.is_success());
        assert_eq!(pass.identity, Some(Identity::new("p1", "id-1")));
        assert!(matches!(pass.apply_result(), ApplyResult::Failed { .. }));
    }

    #[test]
    fn test_update_when_record_changed() {
        let fake = FakeResource::default();
        let identity = Identity::new("p1", "id-9");
        let previous = record("a", "x");
        let desired = record("b", "x");

        let pass = converge(
            &fake,
            Some(&identity),
            Some(&previous),
            Some(Declared::new("p1", &desired)),
        );

        assert_eq!(pass.operation, Operation::Update);
        assert_eq!(pass.identity, Some(identity));
        assert_eq!(fake.calls(), vec!["update id-9"]);
    }

    #[test]
    fn test_replace_on_parent_change() {
        let fake = FakeResource::default();
        let identity = Identity::new("p1", "id-9");
        let previous = record("a", "x");

        let pass = converge(
            &fake,
            Some(&identity),
            Some(&previous),
            Some(Declared::new("p2", &previous)),
        );

        assert_eq!(pass.operation, Operation::Replace);
        assert_eq!(pass.identity, Some(Identity::new("p2", "id-1")));
        assert_eq!(fake.calls(), vec!["delete id-9", "create p2"]);
        assert_eq!(pass.apply_result(), ApplyResult::Replaced);
    }

    #[test]
    fn test_replace_on_replacement_attribute() {
        let fake = FakeResource::default();
        let identity = Identity::new("p1", "id-9");
        let previous = record("a", "x");
        let desired = record("a", "y");

        let operation = plan_operation(
            &fake,
            Some(&identity),
            Some(&previous),
            Some(Declared::new("p1", &desired)),
        );
        assert_eq!(operation, Operation::Replace);
    }

    #[test]
    fn test_refresh_reads_only() {
        let fake = FakeResource::default();
        let desired = record("a", "x");
        fake.store
            .borrow_mut()
            .insert("id-9".to_string(), desired.clone());
        let identity = Identity::new("p1", "id-9");

        let pass = converge(
            &fake,
            Some(&identity),
            Some(&desired),
            Some(Declared::new("p1", &desired)),
        );

        assert_eq!(pass.operation, Operation::Refresh);
        assert_eq!(fake.calls(), vec!["read id-9"]);
        assert_eq!(pass.apply_result(), ApplyResult::NoChange);
    }

    #[test]
    fn test_refresh_recreates_lost_resource() {
        let fake = FakeResource::default();
        let desired = record("a", "x");
        let identity = Identity::new("p1", "gone");

        let pass = converge(
            &fake,
            Some(&identity),
            Some(&desired),
            Some(Declared::new("p1", &desired)),
        );

        assert_eq!(pass.operation, Operation::Create);
        assert_eq!(pass.identity, Some(Identity::new("p1", "id-1")));
        assert_eq!(fake.calls(), vec!["read gone", "create p1"]);
    }

    #[test]
    fn test_delete_clears_identity() {
        let fake = FakeResource::default();
        let identity = Identity::new("p1", "id-9");
        let previous = record("a", "x");

        let pass = converge(&fake, Some(&identity), Some(&previous), None);

        assert_eq!(pass.operation, Operation::Delete);
        assert_eq!(pass.identity, None);
        assert_eq!(pass.apply_result(), ApplyResult::Removed);
    }

    #[test]
    fn test_noop_without_identity_or_desired() {
        let fake = FakeResource::default();
        let pass = converge(&fake, None, None, None);

        assert_eq!(pass.operation, Operation::Noop);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_identity_without_previous_resumes_as_update() {
        let fake = FakeResource::default();
        fake.store
            .borrow_mut()
            .insert("id-9".to_string(), record("a", "x"));
        let identity = Identity::new("p1", "id-9");
        let desired = record("b", "x");

        let pass = converge(
            &fake,
            Some(&identity),
            None,
            Some(Declared::new("p1", &desired)),
        );

        assert_eq!(pass.operation, Operation::Update);
        assert_eq!(pass.identity, Some(identity));
        assert_eq!(fake.calls(), vec!["read id-9", "resume id-9 from a"]);
        assert_eq!(pass.outcome.unwrap(), Some(desired));
    }

    #[test]
    fn test_resume_recreates_lost_resource() {
        let fake = FakeResource::default();
        let identity = Identity::new("p1", "gone");
        let desired = record("a", "x");

        let pass = converge(
            &fake,
            Some(&identity),
            None,
            Some(Declared::new("p1", &desired)),
        );

        assert_eq!(pass.operation, Operation::Create);
        assert_eq!(fake.calls(), vec!["read gone", "create p1"]);
    }
}
