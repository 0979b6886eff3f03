// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translation from an authorization request to an engine query
//!
//! The query names the principal, action, and resource entities; carries a
//! context map merging the caller identity, request tags, and caller
//! context; and declares the entity hierarchy that makes group-bound
//! attachments match the principal under `principal in <Group>` resolution.

use super::AuthzRequest;
use crate::engine::AttributeValue;
use crate::engine::AuthorizationQuery;
use crate::engine::EntityRef;
use crate::engine::QueryEntity;
use std::collections::BTreeMap;

/// Action-name prefix accepted from callers and stripped before querying;
/// the policy language expresses actions unprefixed.
const ACTION_PREFIX: &str = "rosa:";

/// Build the engine query for a request and the caller's group memberships
pub fn build_query(
    request: &AuthzRequest,
    groups: &[String],
) -> AuthorizationQuery {
    let principal = EntityRef::principal(&request.caller_arn);
    let resource = EntityRef::resource(&request.resource);
    let action = request
        .action
        .strip_prefix(ACTION_PREFIX)
        .unwrap_or(&request.action)
        .to_owned();

    let mut context = BTreeMap::new();
    context.insert(
        String::from("principalArn"),
        AttributeValue::String(request.caller_arn.clone()),
    );
    context.insert(
        String::from("principalAccount"),
        AttributeValue::String(request.account_id.clone()),
    );
    if !request.request_tags.is_empty() {
        context.insert(
            String::from("requestTags"),
            AttributeValue::Record(string_record(&request.request_tags)),
        );
        context.insert(
            String::from("tagKeys"),
            AttributeValue::Set(
                request
                    .request_tags
                    .keys()
                    .map(|key| AttributeValue::String(key.clone()))
                    .collect(),
            ),
        );
    }
    for (key, value) in &request.context {
        if let Some(coerced) = coerce_value(value) {
            context.insert(key.clone(), coerced);
        }
    }

    // Entity hierarchy: one entity per group, the principal with those
    // groups as parents, and the resource with its tags and arn.
    let mut entities = Vec::with_capacity(groups.len() + 2);
    for group_id in groups {
        entities.push(QueryEntity {
            uid: EntityRef::group(group_id),
            attrs: BTreeMap::new(),
            parents: Vec::new(),
        });
    }
    entities.push(QueryEntity {
        uid: principal.clone(),
        attrs: BTreeMap::new(),
        parents: groups.iter().map(|g| EntityRef::group(g)).collect(),
    });

    let mut resource_attrs = BTreeMap::new();
    resource_attrs.insert(
        String::from("arn"),
        AttributeValue::String(request.resource.clone()),
    );
    if !request.resource_tags.is_empty() {
        resource_attrs.insert(
            String::from("tags"),
            AttributeValue::Record(string_record(&request.resource_tags)),
        );
    }
    entities.push(QueryEntity {
        uid: resource.clone(),
        attrs: resource_attrs,
        parents: Vec::new(),
    });

    AuthorizationQuery { principal, action, resource, context, entities }
}

fn string_record(
    tags: &BTreeMap<String, String>,
) -> BTreeMap<String, AttributeValue> {
    tags.iter()
        .map(|(key, value)| {
            (key.clone(), AttributeValue::String(value.clone()))
        })
        .collect()
}

/// Coerce a caller-supplied JSON value into an engine attribute
///
/// Strings, booleans, and whole-valued numerics map to their engine
/// types (the policy language has no floating point, so whole floats
/// become longs); objects and arrays recurse; anything else is dropped
/// silently.
fn coerce_value(value: &serde_json::Value) -> Option<AttributeValue> {
    match value {
        serde_json::Value::String(s) => {
            Some(AttributeValue::String(s.clone()))
        }
        serde_json::Value::Bool(b) => Some(AttributeValue::Bool(*b)),
        serde_json::Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                Some(AttributeValue::Long(n))
            } else {
                number.as_f64().and_then(|f| {
                    if f.fract() == 0.0 && f.is_finite() {
                        Some(AttributeValue::Long(f as i64))
                    } else {
                        None
                    }
                })
            }
        }
        serde_json::Value::Object(fields) => Some(AttributeValue::Record(
            fields
                .iter()
                .filter_map(|(key, value)| {
                    coerce_value(value).map(|av| (key.clone(), av))
                })
                .collect(),
        )),
        serde_json::Value::Array(items) => Some(AttributeValue::Set(
            items.iter().filter_map(coerce_value).collect(),
        )),
        serde_json::Value::Null => None,
    }
}
