use crate::model::PlanSpec;
use gravitee::{Plan, PlanSecurity};

/// Payload for creating a plan. Carries no id and no status.
pub fn to_create(spec: &PlanSpec) -> Plan {
    Plan {
        id: None,
        name: spec.name.clone(),
        description: Some(spec.description.clone()),
        definition_version: spec.definition_version.clone(),
        mode: spec.mode.clone(),
        security: Some(PlanSecurity {
            security_type: spec.security_type.clone(),
        }),
        characteristics: spec.characteristics.clone(),
        validation: spec.validation.clone().filter(|v| !v.is_empty()),
        status: None,
    }
}

/// Payload for updating plan `id`.
pub fn to_update(id: &str, spec: &PlanSpec) -> Plan {
    Plan {
        id: Some(id.to_string()),
        ..to_create(spec)
    }
}

/// Declared-shape record of a remote plan.
pub fn from_wire(plan: &Plan) -> PlanSpec {
    PlanSpec {
        name: plan.name.clone(),
        description: plan.description.clone().unwrap_or_default(),
        definition_version: plan.definition_version.clone(),
        mode: plan.mode.clone(),
        security_type: plan
            .security
            .as_ref()
            .map(|s| s.security_type.clone())
            .unwrap_or_default(),
        characteristics: plan.characteristics.clone().filter(|c| !c.is_empty()),
        validation: plan.validation.clone().filter(|v| !v.is_empty()),
    }
}
