// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stored representations of the entities scoped by tenant account
//!
//! Field names here are the stored attribute names; the key-value driver
//! sees these structs as JSON documents.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// An enabled tenant account
///
/// An account is either privileged (no policy store, bypasses all checks)
/// or regular (must have a policy store).  `policy_store_id` is the sole
/// authority for which policy store holds the account's policies; the
/// empty string means "none", which must coincide with `privileged`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    #[serde(default)]
    pub policy_store_id: String,
    pub privileged: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// An administrator of a tenant account, keyed by (account, principal ARN)
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub account_id: String,
    pub principal_arn: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// An authorization group
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub account_id: String,
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A group membership row
///
/// The sort key is the composite `groupId#memberArn` so that one partition
/// query with a `groupId#` prefix lists a group's members.  The
/// `accountId#memberArn` attribute is covered by a secondary index so that
/// the reverse lookup (groups for a member) is a single index query.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GroupMember {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "groupId#memberArn")]
    pub group_member_sort: String,
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "memberArn")]
    pub member_arn: String,
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
    #[serde(rename = "accountId#memberArn")]
    pub account_member_index: String,
}

impl GroupMember {
    pub fn new(account_id: &str, group_id: &str, member_arn: &str) -> Self {
        GroupMember {
            account_id: account_id.to_owned(),
            group_member_sort: format!("{}#{}", group_id, member_arn),
            group_id: group_id.to_owned(),
            member_arn: member_arn.to_owned(),
            added_at: Utc::now(),
            account_member_index: format!("{}#{}", account_id, member_arn),
        }
    }
}

/// Name of the secondary-index attribute on the members table
pub const MEMBER_GROUPS_INDEX: &str = "accountId#memberArn";
