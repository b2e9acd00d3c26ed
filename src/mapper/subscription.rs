use crate::model::{
    ConsumerConfigurationSpec, EntrypointConfigurationSpec, HeaderSpec, SubscriptionSpec,
};
use gravitee::{
    ConsumerConfiguration, EntrypointConfiguration, Header, Subscription, SubscriptionUpdate,
};

/// Payload for creating a subscription.
pub fn to_create(spec: &SubscriptionSpec) -> Subscription {
    Subscription {
        id: None,
        plan_id: spec.plan_id.clone(),
        application_id: spec.application_id.clone(),
        status: None,
        consumer_configuration: spec.consumer_configuration.as_ref().map(consumer_to_wire),
        metadata: spec.metadata.clone(),
    }
}

/// Payload for updating a subscription: consumer configuration and metadata
/// only. Plan and application never travel in an update.
pub fn to_update(spec: &SubscriptionSpec) -> SubscriptionUpdate {
    SubscriptionUpdate {
        consumer_configuration: spec.consumer_configuration.as_ref().map(consumer_to_wire),
        metadata: spec.metadata.clone(),
    }
}

/// Declared-shape record of a remote subscription.
pub fn from_wire(subscription: &Subscription) -> SubscriptionSpec {
    SubscriptionSpec {
        plan_id: subscription.plan_id.clone(),
        application_id: subscription.application_id.clone(),
        consumer_configuration: subscription
            .consumer_configuration
            .as_ref()
            .map(consumer_from_wire),
        metadata: subscription.metadata.clone().filter(|m| !m.is_empty()),
    }
}

fn consumer_to_wire(spec: &ConsumerConfigurationSpec) -> ConsumerConfiguration {
    ConsumerConfiguration {
        entrypoint_id: spec.entrypoint_id.clone(),
        channel: spec.channel.clone(),
        entrypoint_configuration: spec.entrypoint_configuration.as_ref().map(|ec| {
            EntrypointConfiguration {
                callback_url: ec.callback_url.clone(),
                headers: (!ec.headers.is_empty()).then(|| {
                    ec.headers
                        .iter()
                        .map(|h| Header {
                            name: h.name.clone(),
                            value: h.value.clone(),
                        })
                        .collect()
                }),
            }
        }),
    }
}

fn consumer_from_wire(wire: &ConsumerConfiguration) -> ConsumerConfigurationSpec {
    ConsumerConfigurationSpec {
        entrypoint_id: wire.entrypoint_id.clone(),
        channel: wire.channel.clone().filter(|c| !c.is_empty()),
        entrypoint_configuration: wire.entrypoint_configuration.as_ref().map(|ec| {
            EntrypointConfigurationSpec {
                callback_url: ec.callback_url.clone(),
                headers: ec
                    .headers
                    .iter()
                    .flatten()
                    .map(|h| HeaderSpec {
                        name: h.name.clone(),
                        value: h.value.clone(),
                    })
                    .collect(),
            }
        }),
    }
}
