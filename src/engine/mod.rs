// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Policy-engine capability
//!
//! The platform keeps one policy store per tenant account in an external
//! Cedar policy engine.  Policy *templates* carry Cedar source text with
//! the `?principal` placeholder; *attachments* (template-linked policies)
//! bind a template to a concrete principal or group entity.
//!
//! Two backends implement the capability: [`remote::RemoteEngine`] talks to
//! a hosted engine that natively understands templates and attachments;
//! [`local::LocalEngine`] keeps template/attachment registries in memory
//! and feeds a flat resolved policy set to an in-process evaluator.

pub mod evaluator;
pub mod local;
pub mod remote;

use crate::api_error::Error;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Entity type of calling principals
pub const PRINCIPAL_ENTITY_TYPE: &str = "Principal";
/// Entity type of authorization groups
pub const GROUP_ENTITY_TYPE: &str = "Group";
/// Entity type of protected resources
pub const RESOURCE_ENTITY_TYPE: &str = "Resource";
/// Entity type of actions
pub const ACTION_ENTITY_TYPE: &str = "Action";

/// Reference to an engine entity, e.g. `Principal::"arn:..."`
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: &str, entity_id: &str) -> EntityRef {
        EntityRef {
            entity_type: entity_type.to_owned(),
            entity_id: entity_id.to_owned(),
        }
    }

    pub fn principal(arn: &str) -> EntityRef {
        EntityRef::new(PRINCIPAL_ENTITY_TYPE, arn)
    }

    pub fn group(group_id: &str) -> EntityRef {
        EntityRef::new(GROUP_ENTITY_TYPE, group_id)
    }

    pub fn resource(resource_arn: &str) -> EntityRef {
        EntityRef::new(RESOURCE_ENTITY_TYPE, resource_arn)
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::\"{}\"", self.entity_type, self.entity_id)
    }
}

/// A typed attribute value in the engine's vocabulary
///
/// This is the uniform coercion target for resource tags, request tags,
/// and caller-supplied context.  The policy language has no native
/// floating-point support, so numerics are longs.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValue {
    String(String),
    Long(i64),
    #[serde(rename = "boolean")]
    Bool(bool),
    Record(BTreeMap<String, AttributeValue>),
    Set(Vec<AttributeValue>),
}

/// One entity in the request-time entity hierarchy
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct QueryEntity {
    pub uid: EntityRef,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub parents: Vec<EntityRef>,
}

/// An authorization query against one policy store
///
/// The decision is a pure function of these inputs plus the engine's
/// current policy set for the store.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AuthorizationQuery {
    pub principal: EntityRef,
    /// Action name, unprefixed (e.g. `DescribeCluster`)
    pub action: String,
    pub resource: EntityRef,
    #[serde(default)]
    pub context: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub entities: Vec<QueryEntity>,
}

/// The engine's verdict on a query
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngineDecision {
    Allow,
    Deny,
}

/// A policy template as stored in the engine
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub template_id: String,
    /// Cedar source text using the `?principal` placeholder
    pub statement: String,
    /// Engine-side description blob (see [`PolicyMeta`])
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A template-linked policy (attachment) as stored in the engine
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedPolicyRecord {
    pub policy_id: String,
    pub template_id: String,
    /// The bound principal entity (`Principal::…` or `Group::…`)
    pub principal: EntityRef,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing template-linked policies
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyFilter {
    pub template_id: Option<String>,
    pub principal: Option<EntityRef>,
}

impl PolicyFilter {
    pub fn by_template(template_id: &str) -> PolicyFilter {
        PolicyFilter {
            template_id: Some(template_id.to_owned()),
            principal: None,
        }
    }

    fn matches(&self, record: &LinkedPolicyRecord) -> bool {
        if let Some(template_id) = &self.template_id {
            if &record.template_id != template_id {
                return false;
            }
        }
        if let Some(principal) = &self.principal {
            if &record.principal != principal {
                return false;
            }
        }
        true
    }
}

/// Capability interface over the external policy engine
///
/// Both backends implement exactly this.  Engine failures surface as
/// [`Error::UpstreamFailure`]; lookups of absent templates or policies
/// surface as `NotFound`.
#[async_trait]
pub trait PolicyEngine: Send + Sync + 'static {
    /// Create a policy store; returns its opaque id
    async fn policy_store_create(
        &self,
        description: &str,
    ) -> Result<String, Error>;

    async fn policy_store_delete(&self, store_id: &str) -> Result<(), Error>;

    /// Install the Cedar schema into a store
    async fn schema_put(
        &self,
        store_id: &str,
        schema_json: &str,
    ) -> Result<(), Error>;

    async fn template_create(
        &self,
        store_id: &str,
        statement: &str,
        description: &str,
    ) -> Result<TemplateRecord, Error>;

    async fn template_fetch(
        &self,
        store_id: &str,
        template_id: &str,
    ) -> Result<TemplateRecord, Error>;

    /// Update a template in place.  Changes propagate to all linked
    /// attachments.
    async fn template_update(
        &self,
        store_id: &str,
        template_id: &str,
        statement: &str,
        description: &str,
    ) -> Result<TemplateRecord, Error>;

    async fn template_delete(
        &self,
        store_id: &str,
        template_id: &str,
    ) -> Result<(), Error>;

    async fn templates_list(
        &self,
        store_id: &str,
    ) -> Result<Vec<TemplateRecord>, Error>;

    /// Bind a template to a principal entity, creating a template-linked
    /// policy.  At evaluation time the template's `?principal` placeholder
    /// resolves to `principal in <entity>`, so a group binding matches
    /// every member of the group.
    async fn attachment_create(
        &self,
        store_id: &str,
        template_id: &str,
        principal: EntityRef,
    ) -> Result<LinkedPolicyRecord, Error>;

    async fn attachment_delete(
        &self,
        store_id: &str,
        policy_id: &str,
    ) -> Result<(), Error>;

    async fn attachments_list(
        &self,
        store_id: &str,
        filter: &PolicyFilter,
    ) -> Result<Vec<LinkedPolicyRecord>, Error>;

    /// Evaluate one authorization query against the store's policy set
    async fn is_authorized(
        &self,
        store_id: &str,
        query: &AuthorizationQuery,
    ) -> Result<EngineDecision, Error>;
}

/// Human-visible template metadata, encoded into the engine's description
/// blob
///
/// The engine does not store a name field for templates, so the name and
/// description ride along in the description blob as tagged JSON.  Decoding
/// is tolerant: externally-authored templates whose description is not the
/// tagged encoding remain visible, with the raw blob as their name.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PolicyMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl PolicyMeta {
    pub fn new(name: &str, description: &str) -> PolicyMeta {
        PolicyMeta {
            name: name.to_owned(),
            description: description.to_owned(),
        }
    }

    /// Encode into the engine's description blob
    pub fn encode(&self) -> String {
        // Serializing a struct of two strings cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| self.name.clone())
    }

    /// Decode from an engine description blob.  An un-decodable blob
    /// yields `name = blob`, `description = ""`.
    pub fn decode(encoded: &str) -> PolicyMeta {
        serde_json::from_str(encoded).unwrap_or_else(|_| PolicyMeta {
            name: encoded.to_owned(),
            description: String::new(),
        })
    }
}
