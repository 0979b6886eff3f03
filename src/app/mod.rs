// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform, the management core of the service
//!
//! The administrative API surface (accounts, admins, policies, groups,
//! memberships, attachments) is implemented as methods on [`Platform`],
//! split across the files in this directory by domain.  Gating happens in
//! the HTTP layer; by the time a method here runs, the caller has already
//! been admitted.

mod account;
mod admin;
mod attachment;
mod group;
mod policy;

pub use attachment::Attachment;
pub use attachment::AttachmentListFilter;
pub use attachment::TargetType;
pub use policy::Policy;

use crate::api_error::Error;
use crate::api_error::ResourceType;
use crate::authz::Authorizer;
use crate::db::DataStore;
use crate::db::Kv;
use crate::engine::PolicyEngine;
use slog::o;
use slog::Logger;
use std::sync::Arc;

/// The management core: entity store, policy engine, and decision pipeline
pub struct Platform {
    log: Logger,
    datastore: Arc<DataStore>,
    engine: Arc<dyn PolicyEngine>,
    authz: Authorizer,
}

impl Platform {
    pub fn new(
        log: Logger,
        kv: Arc<dyn Kv>,
        engine: Arc<dyn PolicyEngine>,
    ) -> Platform {
        let datastore = Arc::new(DataStore::new(
            log.new(o!("component" => "datastore")),
            kv,
        ));
        let authz = Authorizer::new(
            log.new(o!("component" => "authz")),
            Arc::clone(&datastore),
            Arc::clone(&engine),
        );
        Platform { log, datastore, engine, authz }
    }

    pub fn datastore(&self) -> &DataStore {
        &self.datastore
    }

    pub fn authz(&self) -> &Authorizer {
        &self.authz
    }

    /// Resolve the policy store holding an account's policies
    ///
    /// Every policy and attachment operation starts here.  A missing
    /// account is `NotFound`; a privileged account has no policy store
    /// and cannot hold policies.
    pub(crate) async fn policy_store_for_account(
        &self,
        account_id: &str,
    ) -> Result<String, Error> {
        let account = self
            .datastore
            .account_fetch(account_id)
            .await?
            .ok_or_else(|| {
                Error::not_found_by_id(ResourceType::Account, account_id)
            })?;
        if account.policy_store_id.is_empty() {
            return Err(Error::invalid_argument(
                "privileged accounts have no policy store",
            ));
        }
        Ok(account.policy_store_id)
    }
}
