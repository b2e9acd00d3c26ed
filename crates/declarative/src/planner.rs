//! Execution planner - orders resource passes into phases

/// Something an execution plan can hold and filter.
pub trait Targetable {
    /// Unique identifier within its type (e.g. a manifest key)
    fn id(&self) -> &str;

    /// Resource type category, e.g. "plan"
    fn resource_type(&self) -> &'static str;
}

/// A named group of entries run in order.
#[derive(Debug, Clone)]
pub struct Phase<T> {
    pub name: &'static str,
    pub entries: Vec<T>,
}

/// An execution plan: phases that run one after another, each running its
/// entries sequentially.
#[derive(Debug, Clone)]
pub struct ExecutionPlan<T> {
    pub phases: Vec<Phase<T>>,
}

impl<T> ExecutionPlan<T> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self { phases: Vec::new() }
    }

    /// Append a phase. Empty phases are kept so callers can report them.
    pub fn push_phase(&mut self, name: &'static str, entries: Vec<T>) {
        self.phases.push(Phase { name, entries });
    }

    /// Every entry, in execution order
    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.phases.iter().flat_map(|p| p.entries.iter())
    }

    /// Total number of entries in the plan
    pub fn total_entries(&self) -> usize {
        self.phases.iter().map(|p| p.entries.len()).sum()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.total_entries() == 0
    }

    /// Filter plan to only include entries matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool,
    {
        Self {
            phases: self
                .phases
                .into_iter()
                .map(|phase| Phase {
                    name: phase.name,
                    entries: phase.entries.into_iter().filter(|e| predicate(e)).collect(),
                })
                .collect(),
        }
    }
}

impl<T: Targetable> ExecutionPlan<T> {
    /// Filter plan to only include entries matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|e| matches_filter(e, resource_type.as_deref(), name.as_deref()))
            }
        }
    }
}

impl<T> Default for ExecutionPlan<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
pub fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((resource_type, name)) => (Some(resource_type.to_string()), Some(name.to_string())),
    }
}

/// Check if an entry matches the filter criteria
///
/// Plural type names are accepted (`plans` matches `plan`); names match
/// exactly.
pub fn matches_filter<T: Targetable + ?Sized>(
    entry: &T,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        let singular = rt.strip_suffix('s').unwrap_or(rt);
        if entry.resource_type() != rt && entry.resource_type() != singular {
            return false;
        }
    }

    if let Some(n) = name
        && entry.id() != n
    {
        return false;
    }

    true
}
