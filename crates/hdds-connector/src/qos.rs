// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS values and caller override policies.
//!
//! The domain hands out defaults; the caller supplies a policy that rewrites
//! the fields it knows about. [`merge`] copies the default and applies the
//! policy to the copy, so untouched fields keep their domain defaults.

use crate::partition::Partition;
use serde::{Deserialize, Serialize};

/// ENTITY_FACTORY policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityFactory {
    /// Enable child entities as soon as they are created.
    pub autoenable_created_entities: bool,
}

impl Default for EntityFactory {
    fn default() -> Self {
        Self {
            autoenable_created_entities: true,
        }
    }
}

/// PRESENTATION access scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    #[default]
    Instance,
    Topic,
    Group,
}

/// PRESENTATION policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Presentation {
    pub access_scope: AccessScope,
    pub coherent_access: bool,
    pub ordered_access: bool,
}

/// Effective QoS of a domain participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParticipantQos {
    pub user_data: Vec<u8>,
    pub entity_factory: EntityFactory,
}

/// Effective QoS of a subscriber endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SubscriberQos {
    pub presentation: Presentation,
    pub partition: Partition,
    pub group_data: Vec<u8>,
    pub entity_factory: EntityFactory,
}

/// Effective QoS of a publisher endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PublisherQos {
    pub presentation: Presentation,
    pub partition: Partition,
    pub group_data: Vec<u8>,
    pub entity_factory: EntityFactory,
}

/// Caller-supplied overrides for a QoS value.
pub trait QosPolicy {
    /// QoS value this policy rewrites.
    type Qos: Clone;

    /// Overwrite every field this policy sets.
    fn apply(&self, qos: &mut Self::Qos);
}

/// Copy `default` and apply `policy` to the copy.
pub fn merge<P: QosPolicy>(default: &P::Qos, policy: &P) -> P::Qos {
    let mut qos = default.clone();
    policy.apply(&mut qos);
    qos
}

/// Effective participant QoS from domain defaults and caller overrides.
pub fn merge_participant_qos(
    default: &ParticipantQos,
    policy: &ParticipantQosPolicy,
) -> ParticipantQos {
    merge(default, policy)
}

/// Effective subscriber QoS from domain defaults and caller overrides.
pub fn merge_subscriber_qos(default: &SubscriberQos, policy: &SubscriberQosPolicy) -> SubscriberQos {
    merge(default, policy)
}

/// Effective publisher QoS from domain defaults and caller overrides.
pub fn merge_publisher_qos(default: &PublisherQos, policy: &PublisherQosPolicy) -> PublisherQos {
    merge(default, policy)
}

/// Participant overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticipantQosPolicy {
    pub user_data: Option<Vec<u8>>,
    pub autoenable_created_entities: Option<bool>,
}

impl QosPolicy for ParticipantQosPolicy {
    type Qos = ParticipantQos;

    fn apply(&self, qos: &mut ParticipantQos) {
        if let Some(ref user_data) = self.user_data {
            qos.user_data = user_data.clone();
        }
        if let Some(autoenable) = self.autoenable_created_entities {
            qos.entity_factory.autoenable_created_entities = autoenable;
        }
    }
}

/// Subscriber overrides.
///
/// PARTITION is not overridable: it always carries the no-local filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubscriberQosPolicy {
    pub presentation: Option<Presentation>,
    pub group_data: Option<Vec<u8>>,
    pub autoenable_created_entities: Option<bool>,
}

impl QosPolicy for SubscriberQosPolicy {
    type Qos = SubscriberQos;

    fn apply(&self, qos: &mut SubscriberQos) {
        if let Some(presentation) = self.presentation {
            qos.presentation = presentation;
        }
        if let Some(ref group_data) = self.group_data {
            qos.group_data = group_data.clone();
        }
        if let Some(autoenable) = self.autoenable_created_entities {
            qos.entity_factory.autoenable_created_entities = autoenable;
        }
    }
}

/// Publisher overrides.
///
/// PARTITION is not overridable: it always names the publishing connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherQosPolicy {
    pub presentation: Option<Presentation>,
    pub group_data: Option<Vec<u8>>,
    pub autoenable_created_entities: Option<bool>,
}

impl QosPolicy for PublisherQosPolicy {
    type Qos = PublisherQos;

    fn apply(&self, qos: &mut PublisherQos) {
        if let Some(presentation) = self.presentation {
            qos.presentation = presentation;
        }
        if let Some(ref group_data) = self.group_data {
            qos.group_data = group_data.clone();
        }
        if let Some(autoenable) = self.autoenable_created_entities {
            qos.entity_factory.autoenable_created_entities = autoenable;
        }
    }
}
