// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Authorization facilities
//!
//! [`Authorizer::authorize`] is the single entry point for the layered
//! decision pipeline.  The steps run strictly in order and short-circuit:
//!
//! 1. privileged bypass: a privileged account allows everything;
//! 2. account provisioning: an account with no record is an error, not
//!    a deny, so operators can tell "blocked" apart from "not enabled";
//! 3. admin bypass: account admins allow everything within the account;
//! 4. policy evaluation: everything else is the engine's decision over
//!    the caller's group memberships and the derived query.
//!
//! The admin bypass exists because the engine schema does not yet express
//! administrative operations as first-class actions.  It is deliberately a
//! single predicate here so it can later be replaced by a pair of
//! auto-attached policies.

pub mod derive;
pub mod query;
pub mod schema;

use crate::api_error::Error;
use crate::db::DataStore;
use crate::engine::EngineDecision;
use crate::engine::PolicyEngine;
use slog::debug;
use slog::info;
use slog::warn;
use slog::Logger;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One request to be authorized
#[derive(Clone, Debug, Default)]
pub struct AuthzRequest {
    pub account_id: String,
    pub caller_arn: String,
    /// Action name; a `rosa:` prefix is accepted and stripped
    pub action: String,
    /// Canonical resource string, or `*`
    pub resource: String,
    pub resource_tags: BTreeMap<String, String>,
    pub request_tags: BTreeMap<String, String>,
    /// Caller-supplied context fields (from the check endpoint)
    pub context: serde_json::Map<String, serde_json::Value>,
}

/// The pipeline's verdict
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Implements the layered decision pipeline
pub struct Authorizer {
    log: Logger,
    datastore: Arc<DataStore>,
    engine: Arc<dyn PolicyEngine>,
}

impl Authorizer {
    pub fn new(
        log: Logger,
        datastore: Arc<DataStore>,
        engine: Arc<dyn PolicyEngine>,
    ) -> Authorizer {
        Authorizer { log, datastore, engine }
    }

    /// Evaluate the pipeline for one request
    ///
    /// Errors are never fail-open: any pipeline error other than the
    /// bypasses resolving to Allow means the request is refused.
    pub async fn authorize(
        &self,
        request: &AuthzRequest,
    ) -> Result<Decision, Error> {
        // Step 1: privileged bypass.
        if self
            .datastore
            .account_is_privileged(&request.account_id)
            .await
            .map_err(|error| self.warn_store_error("privileged check", error))?
        {
            debug!(self.log, "privileged account bypass";
                "account_id" => &request.account_id);
            return Ok(Decision::Allow);
        }

        // Step 2: account provisioning.
        let account = self
            .datastore
            .account_fetch(&request.account_id)
            .await
            .map_err(|error| self.warn_store_error("account fetch", error))?
            .ok_or_else(|| {
                warn!(self.log, "account not provisioned";
                    "account_id" => &request.account_id);
                Error::AccountNotProvisioned {
                    account_id: request.account_id.clone(),
                }
            })?;

        // Step 3: admin bypass.
        if self
            .datastore
            .admin_is(&request.account_id, &request.caller_arn)
            .await
            .map_err(|error| self.warn_store_error("admin check", error))?
        {
            debug!(self.log, "admin bypass";
                "account_id" => &request.account_id,
                "caller_arn" => &request.caller_arn,
            );
            return Ok(Decision::Allow);
        }

        // Step 4: policy evaluation.
        let groups = self
            .datastore
            .user_groups_list(&request.account_id, &request.caller_arn)
            .await
            .map_err(|error| self.warn_store_error("group lookup", error))?;
        let query = query::build_query(request, &groups);
        let engine_decision = self
            .engine
            .is_authorized(&account.policy_store_id, &query)
            .await?;

        let decision = match engine_decision {
            EngineDecision::Allow => Decision::Allow,
            EngineDecision::Deny => Decision::Deny,
        };
        info!(self.log, "authorization decision";
            "account_id" => &request.account_id,
            "caller_arn" => &request.caller_arn,
            "action" => &request.action,
            "resource" => &request.resource,
            "decision" => ?decision,
        );
        Ok(decision)
    }

    fn warn_store_error(&self, which: &str, error: Error) -> Error {
        warn!(self.log, "authorization pipeline store failure";
            "step" => which.to_owned(),
            "error" => %error,
        );
        error
    }
}
