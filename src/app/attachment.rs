// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Policy attachment management
//!
//! An attachment binds one policy template to one principal entity (a
//! concrete principal ARN or a group id) as a template-linked policy in
//! the engine.  The attachment is pure engine state; the records here are
//! reconstructed from the engine's template-linked definitions.

use super::Platform;
use crate::api_error::Error;
use crate::engine::EntityRef;
use crate::engine::LinkedPolicyRecord;
use crate::engine::PolicyFilter;
use crate::engine::GROUP_ENTITY_TYPE;
use chrono::DateTime;
use chrono::Utc;
use serde_with::DeserializeFromStr;
use serde_with::SerializeDisplay;
use slog::info;

/// What an attachment is bound to
#[derive(
    Clone, Copy, Debug, DeserializeFromStr, Eq, PartialEq, SerializeDisplay,
)]
pub enum TargetType {
    /// A concrete principal ARN
    User,
    /// A group id; matches every member of the group
    Group,
}

impl std::str::FromStr for TargetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TargetType::User),
            "group" => Ok(TargetType::Group),
            _ => Err(Error::invalid_argument(
                "targetType must be 'user' or 'group'",
            )),
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TargetType::User => "user",
            TargetType::Group => "group",
        })
    }
}

/// A policy attachment
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attachment {
    pub attachment_id: String,
    pub policy_id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<LinkedPolicyRecord> for Attachment {
    fn from(record: LinkedPolicyRecord) -> Attachment {
        let target_type = if record.principal.entity_type == GROUP_ENTITY_TYPE
        {
            TargetType::Group
        } else {
            TargetType::User
        };
        Attachment {
            attachment_id: record.policy_id,
            policy_id: record.template_id,
            target_type,
            target_id: record.principal.entity_id,
            created_at: record.created_at,
        }
    }
}

/// Filter options for listing attachments
#[derive(Clone, Debug, Default)]
pub struct AttachmentListFilter {
    pub policy_id: Option<String>,
    pub target_type: Option<TargetType>,
    pub target_id: Option<String>,
}

fn principal_entity(target_type: TargetType, target_id: &str) -> EntityRef {
    match target_type {
        TargetType::User => EntityRef::principal(target_id),
        TargetType::Group => EntityRef::group(target_id),
    }
}

impl Platform {
    pub async fn attachment_create(
        &self,
        account_id: &str,
        policy_id: &str,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Attachment, Error> {
        if policy_id.is_empty() || target_id.is_empty() {
            return Err(Error::invalid_argument(
                "policyId and targetId are required",
            ));
        }
        let store_id = self.policy_store_for_account(account_id).await?;
        let record = self
            .engine
            .attachment_create(
                &store_id,
                policy_id,
                principal_entity(target_type, target_id),
            )
            .await?;

        info!(self.log, "policy attached";
            "account_id" => account_id,
            "policy_id" => policy_id,
            "target_type" => %target_type,
            "target_id" => target_id,
            "attachment_id" => &record.policy_id,
        );
        Ok(Attachment::from(record))
    }

    pub async fn attachment_delete(
        &self,
        account_id: &str,
        attachment_id: &str,
    ) -> Result<(), Error> {
        let store_id = self.policy_store_for_account(account_id).await?;
        self.engine.attachment_delete(&store_id, attachment_id).await?;

        info!(self.log, "policy detached";
            "account_id" => account_id,
            "attachment_id" => attachment_id,
        );
        Ok(())
    }

    pub async fn attachments_list(
        &self,
        account_id: &str,
        filter: &AttachmentListFilter,
    ) -> Result<Vec<Attachment>, Error> {
        let store_id = self.policy_store_for_account(account_id).await?;
        // A principal restriction needs both halves; a bare target type or
        // id does not identify an entity.
        let principal = match (filter.target_type, &filter.target_id) {
            (Some(target_type), Some(target_id)) if !target_id.is_empty() => {
                Some(principal_entity(target_type, target_id))
            }
            _ => None,
        };
        let records = self
            .engine
            .attachments_list(
                &store_id,
                &PolicyFilter {
                    template_id: filter.policy_id.clone(),
                    principal,
                },
            )
            .await?;
        Ok(records.into_iter().map(Attachment::from).collect())
    }
}
