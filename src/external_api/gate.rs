// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gates applied by handlers before touching tenant state
//!
//! Each protected route runs a chain of these, in order, at the top of
//! its handler: identity is already on the `OpContext`; the gates add
//! the privileged short-circuit, the account-provisioned check, the
//! admin check, and full policy authorization.  A gate failure maps to
//! the HTTP error taxonomy through `api_error::Error`.

use crate::api_error::Error;
use crate::authz::derive;
use crate::authz::AuthzRequest;
use crate::authz::Decision;
use crate::context::OpContext;
use crate::context::ServerContext;
use dropshot::RequestContext;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Admit only callers operating under a privileged account
pub async fn require_privileged(
    apictx: &ServerContext,
    opctx: &OpContext,
) -> Result<(), Error> {
    let account_id = opctx.authn.account_id_required()?;
    if !apictx.platform.datastore().account_is_privileged(account_id).await? {
        return Err(Error::NotPrivileged);
    }
    Ok(())
}

/// Admit callers whose account has been enabled
///
/// Privileged accounts are always considered provisioned.
pub async fn require_provisioned(
    apictx: &ServerContext,
    opctx: &OpContext,
) -> Result<(), Error> {
    let account_id = opctx.authn.account_id_required()?;
    let datastore = apictx.platform.datastore();
    if datastore.account_is_privileged(account_id).await? {
        return Ok(());
    }
    match datastore.account_fetch(account_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::AccountNotProvisioned {
            account_id: account_id.to_owned(),
        }),
    }
}

/// Admit administrators of the account (or privileged accounts)
pub async fn require_admin(
    apictx: &ServerContext,
    opctx: &OpContext,
) -> Result<(), Error> {
    let account_id = opctx.authn.account_id_required()?;
    let datastore = apictx.platform.datastore();
    if datastore.account_is_privileged(account_id).await? {
        return Ok(());
    }
    let caller_arn = opctx.authn.caller_arn_required()?;
    if datastore.admin_is(account_id, caller_arn).await? {
        Ok(())
    } else {
        Err(Error::NotAdmin { account_id: account_id.to_owned() })
    }
}

/// Run the full decision pipeline for a protected tenant-data request
///
/// The action and resource are derived from the request's verb and path;
/// `request_tags` come from the request body when the handler has them.
pub async fn authorize_request(
    rqctx: &RequestContext<Arc<ServerContext>>,
    opctx: &OpContext,
    request_tags: BTreeMap<String, String>,
) -> Result<(), Error> {
    let apictx = rqctx.context();
    let account_id = opctx.authn.account_id_required()?;
    let caller_arn = opctx.authn.caller_arn_required()?;

    if apictx.platform.datastore().account_is_privileged(account_id).await? {
        return Ok(());
    }

    let method = rqctx.request.method();
    let path = rqctx.request.uri().path();
    let request = AuthzRequest {
        account_id: account_id.to_owned(),
        caller_arn: caller_arn.to_owned(),
        action: derive::derive_action(method, path),
        resource: derive::derive_resource(path, &apictx.region, account_id),
        resource_tags: BTreeMap::new(),
        request_tags,
        context: serde_json::Map::new(),
    };

    match apictx.platform.authz().authorize(&request).await {
        Ok(Decision::Allow) => Ok(()),
        Ok(Decision::Deny) => Err(Error::AccessDenied),
        Err(error) => Err(authorize_error(error)),
    }
}

/// Map pipeline failures onto the caller-visible taxonomy
///
/// Provisioning and upstream failures keep their identity; anything
/// unexpected is an internal authorization error.  The decision on any
/// error is always refusal, never fail-open.
pub fn authorize_error(error: Error) -> Error {
    match error {
        error @ Error::AccountNotProvisioned { .. } => error,
        error @ Error::UpstreamFailure { .. } => error,
        other => Error::AuthorizationError {
            internal_message: other.to_string(),
        },
    }
}
