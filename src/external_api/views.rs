// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Views define the response bodies of the external API
//!
//! Every body carries a `kind` discriminator; list bodies are enveloped
//! as `{kind, items, total}`.

use crate::app;
use crate::db::model;
use chrono::DateTime;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Serialize;

/// An enabled account
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub kind: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub policy_store_id: String,
    pub privileged: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl From<model::Account> for Account {
    fn from(account: model::Account) -> Account {
        Account {
            kind: String::from("Account"),
            account_id: account.account_id,
            policy_store_id: account.policy_store_id,
            privileged: account.privileged,
            created_at: account.created_at,
            created_by: account.created_by,
        }
    }
}

#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountList {
    pub kind: String,
    pub items: Vec<Account>,
    pub total: usize,
}

impl From<Vec<model::Account>> for AccountList {
    fn from(accounts: Vec<model::Account>) -> AccountList {
        let items =
            accounts.into_iter().map(Account::from).collect::<Vec<_>>();
        AccountList {
            kind: String::from("AccountList"),
            total: items.len(),
            items,
        }
    }
}

/// A policy template with its decoded metadata
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub kind: String,
    pub policy_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Cedar source text, returned byte-for-byte as stored
    pub policy: String,
    pub created_at: DateTime<Utc>,
}

impl From<app::Policy> for Policy {
    fn from(policy: app::Policy) -> Policy {
        Policy {
            kind: String::from("Policy"),
            policy_id: policy.policy_id,
            name: policy.name,
            description: policy.description,
            policy: policy.cedar_policy,
            created_at: policy.created_at,
        }
    }
}

#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyList {
    pub kind: String,
    pub items: Vec<Policy>,
    pub total: usize,
}

impl From<Vec<app::Policy>> for PolicyList {
    fn from(policies: Vec<app::Policy>) -> PolicyList {
        let items =
            policies.into_iter().map(Policy::from).collect::<Vec<_>>();
        PolicyList {
            kind: String::from("PolicyList"),
            total: items.len(),
            items,
        }
    }
}

/// An authorization group
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub kind: String,
    pub group_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<model::Group> for Group {
    fn from(group: model::Group) -> Group {
        Group {
            kind: String::from("Group"),
            group_id: group.group_id,
            name: group.name,
            description: group.description,
            created_at: group.created_at,
        }
    }
}

#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupList {
    pub kind: String,
    pub items: Vec<Group>,
    pub total: usize,
}

impl From<Vec<model::Group>> for GroupList {
    fn from(groups: Vec<model::Group>) -> GroupList {
        let items = groups.into_iter().map(Group::from).collect::<Vec<_>>();
        GroupList {
            kind: String::from("GroupList"),
            total: items.len(),
            items,
        }
    }
}

/// Member ARNs of a group
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberList {
    pub kind: String,
    pub items: Vec<String>,
    pub total: usize,
}

impl From<Vec<String>> for MemberList {
    fn from(items: Vec<String>) -> MemberList {
        MemberList {
            kind: String::from("MemberList"),
            total: items.len(),
            items,
        }
    }
}

/// A policy attachment
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub kind: String,
    pub attachment_id: String,
    pub policy_id: String,
    pub target_type: String,
    pub target_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<app::Attachment> for Attachment {
    fn from(attachment: app::Attachment) -> Attachment {
        Attachment {
            kind: String::from("Attachment"),
            attachment_id: attachment.attachment_id,
            policy_id: attachment.policy_id,
            target_type: attachment.target_type.to_string(),
            target_id: attachment.target_id,
            created_at: attachment.created_at,
        }
    }
}

#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentList {
    pub kind: String,
    pub items: Vec<Attachment>,
    pub total: usize,
}

impl From<Vec<app::Attachment>> for AttachmentList {
    fn from(attachments: Vec<app::Attachment>) -> AttachmentList {
        let items =
            attachments.into_iter().map(Attachment::from).collect::<Vec<_>>();
        AttachmentList {
            kind: String::from("AttachmentList"),
            total: items.len(),
            items,
        }
    }
}

/// An account administrator
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub kind: String,
    pub principal_arn: String,
}

impl From<model::Admin> for Admin {
    fn from(admin: model::Admin) -> Admin {
        Admin {
            kind: String::from("Admin"),
            principal_arn: admin.principal_arn,
        }
    }
}

#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminList {
    pub kind: String,
    pub items: Vec<String>,
    pub total: usize,
}

impl From<Vec<String>> for AdminList {
    fn from(items: Vec<String>) -> AdminList {
        AdminList {
            kind: String::from("AdminList"),
            total: items.len(),
            items,
        }
    }
}

/// Verdict of the check endpoint
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub kind: String,
    /// `ALLOW` or `DENY`
    pub decision: String,
}

impl From<crate::authz::Decision> for AuthorizationDecision {
    fn from(decision: crate::authz::Decision) -> AuthorizationDecision {
        AuthorizationDecision {
            kind: String::from("AuthorizationDecision"),
            decision: String::from(match decision {
                crate::authz::Decision::Allow => "ALLOW",
                crate::authz::Decision::Deny => "DENY",
            }),
        }
    }
}

/// Probe response body
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct HealthStatus {
    pub status: String,
}
