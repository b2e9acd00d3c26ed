//! Diff computation for declared records

use crate::types::Operation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One field that differs between two records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field name as the user declares it.
    pub field: String,
    /// Rendered old value, `None` when the field was not declared.
    pub from: Option<String>,
    /// Rendered new value, `None` when the field is no longer declared.
    pub to: Option<String>,
}

/// Field-level comparison of declared records.
pub trait Diff {
    /// Fields that differ between `self` (old) and `other` (new).
    fn diff(&self, other: &Self) -> Vec<FieldChange>;

    /// Names of the fields that differ.
    fn changed_fields(&self, other: &Self) -> Vec<String> {
        self.diff(other).into_iter().map(|c| c.field).collect()
    }
}

/// Record a change of `field` when `from != to`.
pub fn push_change<T: PartialEq + fmt::Debug>(
    changes: &mut Vec<FieldChange>,
    field: &str,
    from: &T,
    to: &T,
) {
    if from != to {
        changes.push(FieldChange {
            field: field.to_string(),
            from: Some(format!("{:?}", from)),
            to: Some(format!("{:?}", to)),
        });
    }
}

/// Record a change of an optional `field`, rendering absence as `None`.
pub fn push_optional_change<T: PartialEq + fmt::Debug>(
    changes: &mut Vec<FieldChange>,
    field: &str,
    from: Option<&T>,
    to: Option<&T>,
) {
    if from != to {
        changes.push(FieldChange {
            field: field.to_string(),
            from: from.map(|v| format!("{:?}", v)),
            to: to.map(|v| format!("{:?}", v)),
        });
    }
}

/// A pending change to one declared resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource (its manifest key)
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// What the pass will do
    pub operation: Operation,
    /// Changed fields, for updates and replacements
    pub changes: Vec<FieldChange>,
    /// Remote calls the pass will issue
    pub steps: Vec<String>,
}

impl ResourceDiff {
    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.operation == Operation::Create
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.operation == Operation::Delete
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        matches!(self.operation, Operation::Update | Operation::Replace)
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify in place
    pub modifications: usize,
    /// Number of resources to replace
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.operation {
                Operation::Create => summary.additions += 1,
                Operation::Delete => summary.removals += 1,
                Operation::Update => summary.modifications += 1,
                Operation::Replace => summary.replacements += 1,
                Operation::Refresh | Operation::Noop => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type, in a stable order
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(resource_type: &str, operation: Operation) -> ResourceDiff {
        ResourceDiff {
            resource_id: "k".to_string(),
            resource_type: resource_type.to_string(),
            description: String::new(),
            operation,
            changes: Vec::new(),
            steps: Vec::new(),
        }
    }

    #[test]
    fn test_push_change_only_on_difference() {
        let mut changes = Vec::new();
        push_change(&mut changes, "name", &"a", &"a");
        assert!(changes.is_empty());

        push_change(&mut changes, "name", &"a", &"b");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].from.as_deref(), Some("\"a\""));
    }

    #[test]
    fn test_push_optional_change_renders_absence() {
        let mut changes = Vec::new();
        push_optional_change(&mut changes, "validation", None, Some(&"AUTO"));
        assert_eq!(changes[0].from, None);
        assert_eq!(changes[0].to.as_deref(), Some("\"AUTO\""));
    }

    #[test]
    fn test_summary_from_diffs() {
        let diffs = vec![
            diff("plan", Operation::Create),
            diff("plan", Operation::Replace),
            diff("subscription", Operation::Update),
            diff("subscription", Operation::Delete),
            diff("subscription", Operation::Refresh),
        ];
        let summary = DiffSummary::from_diffs(&diffs);

        assert_eq!(summary.additions, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.modifications, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.total(), 4);
        assert!(diffs[1].is_modification());
    }

    #[test]
    fn test_group_by_type() {
        let diffs = vec![
            diff("subscription", Operation::Create),
            diff("plan", Operation::Create),
            diff("plan", Operation::Delete),
        ];
        let groups = group_by_type(&diffs);

        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(keys, vec!["plan", "subscription"]);
        assert_eq!(groups["plan"].len(), 2);
    }
}
