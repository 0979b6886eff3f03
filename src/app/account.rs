// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Account lifecycle

use super::Platform;
use crate::api_error::Error;
use crate::api_error::ResourceType;
use crate::authz::schema::CEDAR_SCHEMA_JSON;
use crate::db::model::Account;
use chrono::Utc;
use slog::info;
use slog::warn;

impl Platform {
    /// Enable an account, provisioning a policy store for regular accounts
    ///
    /// A privileged account is just a record: it has no policy store and
    /// bypasses all checks.  For a regular account we create a policy
    /// store, install the schema, and only then persist the record, so
    /// that a stored account always points at a usable store.  If a later
    /// step fails, the engine-side state is rolled back best-effort; the
    /// original error wins.
    pub async fn account_enable(
        &self,
        account_id: &str,
        created_by: &str,
        privileged: bool,
    ) -> Result<Account, Error> {
        if account_id.len() != 12
            || !account_id.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::invalid_argument(
                "accountId must be a canonical 12-digit account id",
            ));
        }

        let mut account = Account {
            account_id: account_id.to_owned(),
            policy_store_id: String::new(),
            privileged,
            created_at: Utc::now(),
            created_by: created_by.to_owned(),
        };

        if !privileged {
            let store_id = self
                .engine
                .policy_store_create(&format!(
                    "authorization policy store for account {}",
                    account_id
                ))
                .await?;

            if let Err(error) =
                self.engine.schema_put(&store_id, CEDAR_SCHEMA_JSON).await
            {
                self.rollback_policy_store(&store_id).await;
                return Err(error);
            }
            account.policy_store_id = store_id;
        }

        if let Err(error) = self.datastore.account_create(&account).await {
            if !account.policy_store_id.is_empty() {
                self.rollback_policy_store(&account.policy_store_id).await;
            }
            return Err(error);
        }

        info!(self.log, "account enabled";
            "account_id" => account_id,
            "privileged" => privileged,
        );
        Ok(account)
    }

    /// Disable an account, deleting its policy store best-effort
    ///
    /// Engine failures are logged but do not block removal of the record;
    /// the account must become unusable even if the engine is down.
    pub async fn account_disable(&self, account_id: &str) -> Result<(), Error> {
        let account = self
            .datastore
            .account_fetch(account_id)
            .await?
            .ok_or_else(|| {
                Error::not_found_by_id(ResourceType::Account, account_id)
            })?;

        if !account.policy_store_id.is_empty() {
            if let Err(error) = self
                .engine
                .policy_store_delete(&account.policy_store_id)
                .await
            {
                warn!(self.log, "failed to delete policy store";
                    "policy_store_id" => &account.policy_store_id,
                    "error" => %error,
                );
            }
        }

        self.datastore.account_delete(account_id).await?;
        info!(self.log, "account disabled"; "account_id" => account_id);
        Ok(())
    }

    pub async fn account_fetch(
        &self,
        account_id: &str,
    ) -> Result<Account, Error> {
        self.datastore.account_fetch(account_id).await?.ok_or_else(|| {
            Error::not_found_by_id(ResourceType::Account, account_id)
        })
    }

    pub async fn accounts_list(&self) -> Result<Vec<Account>, Error> {
        self.datastore.accounts_list().await
    }

    async fn rollback_policy_store(&self, store_id: &str) {
        if let Err(error) = self.engine.policy_store_delete(store_id).await {
            warn!(self.log, "failed to roll back policy store";
                "policy_store_id" => store_id,
                "error" => %error,
            );
        }
    }
}
