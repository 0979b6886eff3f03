// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Params define the request bodies of the external API

use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Enable an account
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreate {
    pub account_id: String,
    /// Privileged accounts bypass all authorization and have no policy
    /// store.  Used for bootstrap.
    #[serde(default)]
    pub privileged: bool,
}

/// Create or update a policy template
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyWrite {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Native Cedar policy text using the `?principal` placeholder
    pub policy: String,
}

/// Create a group
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Replace-list membership update: adds are applied before removes
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembersUpdate {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// Attach a policy template to a user or group
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentCreate {
    pub policy_id: String,
    /// `user` or `group`
    pub target_type: String,
    /// Principal ARN for `user`, group id for `group`
    pub target_id: String,
}

/// Filter options when listing attachments
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentListSelector {
    pub policy_id: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
}

/// Add an administrator
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminAdd {
    pub principal_arn: String,
}

/// Evaluate an authorization request
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCheck {
    /// Principal ARN making the request
    pub principal: String,
    /// Action being performed (e.g. `rosa:CreateCluster`)
    pub action: String,
    /// Resource string (e.g. `arn:aws:rosa:us-east-1:…:cluster/c1`)
    pub resource: String,
    /// Additional evaluation context
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
    /// Tags on the resource
    #[serde(default)]
    pub resource_tags: BTreeMap<String, String>,
}
