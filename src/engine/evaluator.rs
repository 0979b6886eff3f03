// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process Cedar evaluator
//!
//! This is the evaluation half of the local backend: it accepts only flat
//! lists of fully-resolved single-statement Cedar policies, pushed per
//! policy store via an idempotent bulk replace, and answers authorization
//! queries against the replaced set.  Template and attachment bookkeeping
//! happens in [`super::local`]; nothing here knows about `?principal`.

use crate::api_error::Error;
use crate::engine::AttributeValue;
use crate::engine::AuthorizationQuery;
use crate::engine::EngineDecision;
use crate::engine::EntityRef;
use crate::engine::ACTION_ENTITY_TYPE;
use cedar_policy::Authorizer;
use cedar_policy::Context;
use cedar_policy::Decision;
use cedar_policy::Entities;
use cedar_policy::Entity;
use cedar_policy::EntityId;
use cedar_policy::EntityTypeName;
use cedar_policy::EntityUid;
use cedar_policy::Policy;
use cedar_policy::PolicyId;
use cedar_policy::PolicySet;
use cedar_policy::Request;
use cedar_policy::RestrictedExpression;
use std::collections::HashMap;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// One fully-resolved Cedar policy: a single `permit` or `forbid`
/// statement with a stable id
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyEntry {
    pub id: String,
    pub content: String,
}

/// Evaluates flat policy sets, one per policy store
pub struct LocalEvaluator {
    authorizer: Authorizer,
    stores: RwLock<HashMap<String, PolicySet>>,
}

impl LocalEvaluator {
    pub fn new() -> LocalEvaluator {
        LocalEvaluator {
            authorizer: Authorizer::new(),
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the full policy set for a store
    ///
    /// Idempotent: replaying the same entries yields the same set.  Each
    /// entry must hold exactly one statement.
    pub async fn replace_policies(
        &self,
        store_id: &str,
        entries: Vec<PolicyEntry>,
    ) -> Result<(), Error> {
        let mut policy_set = PolicySet::new();
        for entry in &entries {
            let policy =
                Policy::parse(Some(PolicyId::new(&entry.id)), &entry.content)
                    .map_err(|error| {
                        Error::internal_error(&format!(
                            "resolved policy {:?} failed to parse: {}",
                            entry.id, error
                        ))
                    })?;
            policy_set.add(policy).map_err(|error| {
                Error::internal_error(&format!(
                    "adding resolved policy {:?}: {}",
                    entry.id, error
                ))
            })?;
        }

        let mut stores = self.stores.write().await;
        stores.insert(store_id.to_owned(), policy_set);
        Ok(())
    }

    /// Drop a store's policy set entirely
    pub async fn remove_store(&self, store_id: &str) {
        let mut stores = self.stores.write().await;
        stores.remove(store_id);
    }

    /// Evaluate one query against a store's current policy set
    ///
    /// A store that has never been synced has no policies, which under
    /// Cedar's default-deny semantics means Deny.
    pub async fn is_authorized(
        &self,
        store_id: &str,
        query: &AuthorizationQuery,
    ) -> Result<EngineDecision, Error> {
        let principal = entity_uid(&query.principal)?;
        let action = entity_uid(&EntityRef::new(
            ACTION_ENTITY_TYPE,
            &query.action,
        ))?;
        let resource = entity_uid(&query.resource)?;

        let mut entity_vec = Vec::with_capacity(query.entities.len());
        for query_entity in &query.entities {
            let uid = entity_uid(&query_entity.uid)?;
            let mut attrs = HashMap::new();
            for (name, value) in &query_entity.attrs {
                attrs.insert(name.clone(), restricted_expression(value)?);
            }
            let parents = query_entity
                .parents
                .iter()
                .map(entity_uid)
                .collect::<Result<HashSet<_>, _>>()?;
            let entity =
                Entity::new(uid, attrs, parents).map_err(|error| {
                    Error::internal_error(&format!(
                        "building entity {}: {}",
                        query_entity.uid, error
                    ))
                })?;
            entity_vec.push(entity);
        }
        let entities =
            Entities::from_entities(entity_vec, None).map_err(|error| {
                Error::internal_error(&format!(
                    "building entity hierarchy: {}",
                    error
                ))
            })?;

        let mut context_pairs = Vec::with_capacity(query.context.len());
        for (name, value) in &query.context {
            context_pairs.push((name.clone(), restricted_expression(value)?));
        }
        let context = Context::from_pairs(context_pairs).map_err(|error| {
            Error::internal_error(&format!("building query context: {}", error))
        })?;

        let request = Request::new(principal, action, resource, context, None)
            .map_err(|error| {
                Error::internal_error(&format!(
                    "building authorization request: {}",
                    error
                ))
            })?;

        let stores = self.stores.read().await;
        let empty = PolicySet::new();
        let policy_set = stores.get(store_id).unwrap_or(&empty);
        let response =
            self.authorizer.is_authorized(&request, policy_set, &entities);
        Ok(match response.decision() {
            Decision::Allow => EngineDecision::Allow,
            Decision::Deny => EngineDecision::Deny,
        })
    }
}

impl Default for LocalEvaluator {
    fn default() -> Self {
        LocalEvaluator::new()
    }
}

fn entity_uid(entity: &EntityRef) -> Result<EntityUid, Error> {
    let type_name: EntityTypeName =
        entity.entity_type.parse().map_err(
            |error: cedar_policy::ParseErrors| {
                Error::internal_error(&format!(
                    "invalid entity type {:?}: {}",
                    entity.entity_type, error
                ))
            },
        )?;
    Ok(EntityUid::from_type_name_and_id(
        type_name,
        EntityId::new(&entity.entity_id),
    ))
}

fn restricted_expression(
    value: &AttributeValue,
) -> Result<RestrictedExpression, Error> {
    match value {
        AttributeValue::String(s) => {
            Ok(RestrictedExpression::new_string(s.clone()))
        }
        AttributeValue::Long(n) => Ok(RestrictedExpression::new_long(*n)),
        AttributeValue::Bool(b) => Ok(RestrictedExpression::new_bool(*b)),
        AttributeValue::Set(items) => {
            let items = items
                .iter()
                .map(restricted_expression)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RestrictedExpression::new_set(items))
        }
        AttributeValue::Record(fields) => {
            let fields = fields
                .iter()
                .map(|(name, value)| {
                    restricted_expression(value)
                        .map(|expr| (name.clone(), expr))
                })
                .collect::<Result<Vec<_>, _>>()?;
            RestrictedExpression::new_record(fields).map_err(|error| {
                Error::internal_error(&format!(
                    "building record attribute: {}",
                    error
                ))
            })
        }
    }
}
