// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Policy management
//!
//! Policies are Cedar templates stored in the account's policy store, not
//! locally.  The human-visible name and description ride along in the
//! template's description blob (see [`crate::engine::PolicyMeta`]).

use super::Platform;
use crate::api_error::Error;
use crate::engine::PolicyFilter;
use crate::engine::PolicyMeta;
use crate::engine::TemplateRecord;
use chrono::DateTime;
use chrono::Utc;
use slog::info;

/// A policy template with its decoded metadata
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Policy {
    pub account_id: String,
    /// The engine-side template id
    pub policy_id: String,
    pub name: String,
    pub description: String,
    /// Cedar source text using the `?principal` placeholder
    pub cedar_policy: String,
    pub created_at: DateTime<Utc>,
}

impl Policy {
    fn from_template(account_id: &str, template: TemplateRecord) -> Policy {
        let meta = PolicyMeta::decode(&template.description);
        Policy {
            account_id: account_id.to_owned(),
            policy_id: template.template_id,
            name: meta.name,
            description: meta.description,
            cedar_policy: template.statement,
            created_at: template.created_at,
        }
    }
}

impl Platform {
    pub async fn policy_create(
        &self,
        account_id: &str,
        name: &str,
        description: &str,
        cedar_policy: &str,
    ) -> Result<Policy, Error> {
        validate_policy_input(name, cedar_policy)?;
        let store_id = self.policy_store_for_account(account_id).await?;
        let template = self
            .engine
            .template_create(
                &store_id,
                cedar_policy,
                &PolicyMeta::new(name, description).encode(),
            )
            .await?;

        info!(self.log, "policy template created";
            "account_id" => account_id,
            "policy_id" => &template.template_id,
            "name" => name,
        );
        Ok(Policy::from_template(account_id, template))
    }

    pub async fn policy_fetch(
        &self,
        account_id: &str,
        policy_id: &str,
    ) -> Result<Policy, Error> {
        let store_id = self.policy_store_for_account(account_id).await?;
        let template =
            self.engine.template_fetch(&store_id, policy_id).await?;
        Ok(Policy::from_template(account_id, template))
    }

    /// Update a template in place; the engine propagates the change to
    /// all attachments linked to it.
    pub async fn policy_update(
        &self,
        account_id: &str,
        policy_id: &str,
        name: &str,
        description: &str,
        cedar_policy: &str,
    ) -> Result<Policy, Error> {
        validate_policy_input(name, cedar_policy)?;
        let store_id = self.policy_store_for_account(account_id).await?;
        let template = self
            .engine
            .template_update(
                &store_id,
                policy_id,
                cedar_policy,
                &PolicyMeta::new(name, description).encode(),
            )
            .await?;

        info!(self.log, "policy template updated";
            "account_id" => account_id,
            "policy_id" => policy_id,
        );
        Ok(Policy::from_template(account_id, template))
    }

    /// Delete a template, refusing while any attachment references it
    pub async fn policy_delete(
        &self,
        account_id: &str,
        policy_id: &str,
    ) -> Result<(), Error> {
        let store_id = self.policy_store_for_account(account_id).await?;
        let attachments = self
            .engine
            .attachments_list(&store_id, &PolicyFilter::by_template(policy_id))
            .await?;
        if !attachments.is_empty() {
            return Err(Error::PolicyInUse);
        }
        self.engine.template_delete(&store_id, policy_id).await?;

        info!(self.log, "policy template deleted";
            "account_id" => account_id,
            "policy_id" => policy_id,
        );
        Ok(())
    }

    pub async fn policies_list(
        &self,
        account_id: &str,
    ) -> Result<Vec<Policy>, Error> {
        let store_id = self.policy_store_for_account(account_id).await?;
        let templates = self.engine.templates_list(&store_id).await?;
        Ok(templates
            .into_iter()
            .map(|template| Policy::from_template(account_id, template))
            .collect())
    }
}

fn validate_policy_input(name: &str, cedar_policy: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::invalid_argument("name is required"));
    }
    if cedar_policy.trim().is_empty() {
        return Err(Error::invalid_argument(
            "cedar policy text is required",
        ));
    }
    Ok(())
}
