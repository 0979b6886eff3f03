// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handler functions (entrypoints) for the external HTTP API
//!
//! Every protected handler starts by building an [`OpContext`] and
//! running its gate chain; only then does it touch the app layer.  The
//! account-management routes admit privileged callers only; the authz
//! management routes require a provisioned account and an admin caller;
//! the workload routes run the full decision pipeline.

use super::gate;
use super::params;
use super::views;
use crate::authz::AuthzRequest;
use crate::context::OpContext;
use crate::context::ServerContext;
use crate::workload;
use dropshot::endpoint;
use dropshot::ApiDescription;
use dropshot::HttpError;
use dropshot::HttpResponseCreated;
use dropshot::HttpResponseDeleted;
use dropshot::HttpResponseOk;
use dropshot::Path;
use dropshot::Query;
use dropshot::RequestContext;
use dropshot::TypedBody;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

type ApiContext = Arc<ServerContext>;
type PlatformApiDescription = ApiDescription<ApiContext>;

/// Returns a description of the external API
pub fn external_api() -> PlatformApiDescription {
    fn register_endpoints(
        api: &mut PlatformApiDescription,
    ) -> Result<(), String> {
        api.register(accounts_post)?;
        api.register(accounts_get)?;
        api.register(accounts_get_account)?;
        api.register(accounts_delete_account)?;

        api.register(authz_policies_post)?;
        api.register(authz_policies_get)?;
        api.register(authz_policies_get_policy)?;
        api.register(authz_policies_put_policy)?;
        api.register(authz_policies_delete_policy)?;

        api.register(authz_groups_post)?;
        api.register(authz_groups_get)?;
        api.register(authz_groups_get_group)?;
        api.register(authz_groups_delete_group)?;
        api.register(authz_group_members_put)?;
        api.register(authz_group_members_get)?;

        api.register(authz_attachments_post)?;
        api.register(authz_attachments_get)?;
        api.register(authz_attachments_delete_attachment)?;

        api.register(authz_admins_post)?;
        api.register(authz_admins_get)?;
        api.register(authz_admins_delete_admin)?;

        api.register(authz_check_post)?;

        api.register(clusters_post)?;
        api.register(clusters_get)?;
        api.register(clusters_get_cluster)?;
        api.register(clusters_delete_cluster)?;
        api.register(cluster_nodepools_post)?;
        api.register(cluster_nodepools_get)?;
        api.register(cluster_nodepools_get_nodepool)?;
        api.register(cluster_nodepools_delete_nodepool)?;

        api.register(probe_ready)?;
        api.register(probe_live)?;

        Ok(())
    }

    let mut api = PlatformApiDescription::new();
    if let Err(err) = register_endpoints(&mut api) {
        panic!("failed to register entrypoints: {}", err);
    }
    api
}

/*
 * Account management (privileged callers only)
 */

/// Path parameters for account requests
#[derive(Deserialize, JsonSchema)]
struct AccountPathParam {
    /// The account's id.
    id: String,
}

/// Enable an account.
#[endpoint {
    method = POST,
    path = "/api/v0/accounts",
}]
async fn accounts_post(
    rqctx: RequestContext<ApiContext>,
    new_account: TypedBody<params::AccountCreate>,
) -> Result<HttpResponseCreated<views::Account>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::require_privileged(apictx, &opctx).await?;

    let params = new_account.into_inner();
    let created_by = opctx.authn.caller_arn().unwrap_or("").to_owned();
    let account = apictx
        .platform
        .account_enable(&params.account_id, &created_by, params.privileged)
        .await?;
    Ok(HttpResponseCreated(account.into()))
}

/// List all enabled accounts.
#[endpoint {
    method = GET,
    path = "/api/v0/accounts",
}]
async fn accounts_get(
    rqctx: RequestContext<ApiContext>,
) -> Result<HttpResponseOk<views::AccountList>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::require_privileged(apictx, &opctx).await?;

    let accounts = apictx.platform.accounts_list().await?;
    Ok(HttpResponseOk(accounts.into()))
}

/// Fetch a specific account.
#[endpoint {
    method = GET,
    path = "/api/v0/accounts/{id}",
}]
async fn accounts_get_account(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<AccountPathParam>,
) -> Result<HttpResponseOk<views::Account>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::require_privileged(apictx, &opctx).await?;

    let path = path_params.into_inner();
    let account = apictx.platform.account_fetch(&path.id).await?;
    Ok(HttpResponseOk(account.into()))
}

/// Disable an account.
#[endpoint {
    method = DELETE,
    path = "/api/v0/accounts/{id}",
}]
async fn accounts_delete_account(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<AccountPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::require_privileged(apictx, &opctx).await?;

    let path = path_params.into_inner();
    apictx.platform.account_disable(&path.id).await?;
    Ok(HttpResponseDeleted())
}

/*
 * Policy management (provisioned account, admin caller)
 */

async fn admin_gates(
    rqctx: &RequestContext<ApiContext>,
    opctx: &OpContext,
) -> Result<(), HttpError> {
    let apictx = rqctx.context();
    gate::require_provisioned(apictx, opctx).await?;
    gate::require_admin(apictx, opctx).await?;
    Ok(())
}

/// Path parameters for policy requests
#[derive(Deserialize, JsonSchema)]
struct PolicyPathParam {
    /// The policy's id.
    id: String,
}

/// Create a policy template.
#[endpoint {
    method = POST,
    path = "/api/v0/authz/policies",
}]
async fn authz_policies_post(
    rqctx: RequestContext<ApiContext>,
    new_policy: TypedBody<params::PolicyWrite>,
) -> Result<HttpResponseCreated<views::Policy>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let params = new_policy.into_inner();
    let policy = apictx
        .platform
        .policy_create(
            &account_id,
            &params.name,
            &params.description,
            &params.policy,
        )
        .await?;
    Ok(HttpResponseCreated(policy.into()))
}

/// List the account's policy templates.
#[endpoint {
    method = GET,
    path = "/api/v0/authz/policies",
}]
async fn authz_policies_get(
    rqctx: RequestContext<ApiContext>,
) -> Result<HttpResponseOk<views::PolicyList>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let policies = apictx.platform.policies_list(&account_id).await?;
    Ok(HttpResponseOk(policies.into()))
}

/// Fetch a specific policy template.
#[endpoint {
    method = GET,
    path = "/api/v0/authz/policies/{id}",
}]
async fn authz_policies_get_policy(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<PolicyPathParam>,
) -> Result<HttpResponseOk<views::Policy>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    let policy = apictx.platform.policy_fetch(&account_id, &path.id).await?;
    Ok(HttpResponseOk(policy.into()))
}

/// Update a policy template in place; the change propagates to all of
/// its attachments.
#[endpoint {
    method = PUT,
    path = "/api/v0/authz/policies/{id}",
}]
async fn authz_policies_put_policy(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<PolicyPathParam>,
    updated_policy: TypedBody<params::PolicyWrite>,
) -> Result<HttpResponseOk<views::Policy>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    let params = updated_policy.into_inner();
    let policy = apictx
        .platform
        .policy_update(
            &account_id,
            &path.id,
            &params.name,
            &params.description,
            &params.policy,
        )
        .await?;
    Ok(HttpResponseOk(policy.into()))
}

/// Delete a policy template.  Fails while attachments reference it.
#[endpoint {
    method = DELETE,
    path = "/api/v0/authz/policies/{id}",
}]
async fn authz_policies_delete_policy(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<PolicyPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    apictx.platform.policy_delete(&account_id, &path.id).await?;
    Ok(HttpResponseDeleted())
}

/*
 * Group management (provisioned account, admin caller)
 */

/// Path parameters for group requests
#[derive(Deserialize, JsonSchema)]
struct GroupPathParam {
    /// The group's id.
    id: String,
}

/// Create a group.
#[endpoint {
    method = POST,
    path = "/api/v0/authz/groups",
}]
async fn authz_groups_post(
    rqctx: RequestContext<ApiContext>,
    new_group: TypedBody<params::GroupCreate>,
) -> Result<HttpResponseCreated<views::Group>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let params = new_group.into_inner();
    let group = apictx
        .platform
        .group_create(&account_id, &params.name, &params.description)
        .await?;
    Ok(HttpResponseCreated(group.into()))
}

/// List the account's groups.
#[endpoint {
    method = GET,
    path = "/api/v0/authz/groups",
}]
async fn authz_groups_get(
    rqctx: RequestContext<ApiContext>,
) -> Result<HttpResponseOk<views::GroupList>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let groups = apictx.platform.groups_list(&account_id).await?;
    Ok(HttpResponseOk(groups.into()))
}

/// Fetch a specific group.
#[endpoint {
    method = GET,
    path = "/api/v0/authz/groups/{id}",
}]
async fn authz_groups_get_group(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<GroupPathParam>,
) -> Result<HttpResponseOk<views::Group>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    let group = apictx.platform.group_fetch(&account_id, &path.id).await?;
    Ok(HttpResponseOk(group.into()))
}

/// Delete a group, removing its members first.
#[endpoint {
    method = DELETE,
    path = "/api/v0/authz/groups/{id}",
}]
async fn authz_groups_delete_group(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<GroupPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    apictx.platform.group_delete(&account_id, &path.id).await?;
    Ok(HttpResponseDeleted())
}

/// Apply add/remove lists to a group's membership and return the
/// resulting member list.  Adds are applied before removes.
#[endpoint {
    method = PUT,
    path = "/api/v0/authz/groups/{id}/members",
}]
async fn authz_group_members_put(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<GroupPathParam>,
    update: TypedBody<params::MembersUpdate>,
) -> Result<HttpResponseOk<views::MemberList>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    let params = update.into_inner();

    for member_arn in &params.add {
        apictx
            .platform
            .group_member_add(&account_id, &path.id, member_arn)
            .await?;
    }
    for member_arn in &params.remove {
        apictx
            .platform
            .group_member_remove(&account_id, &path.id, member_arn)
            .await?;
    }

    let members =
        apictx.platform.group_members_list(&account_id, &path.id).await?;
    Ok(HttpResponseOk(members.into()))
}

/// List a group's members.
#[endpoint {
    method = GET,
    path = "/api/v0/authz/groups/{id}/members",
}]
async fn authz_group_members_get(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<GroupPathParam>,
) -> Result<HttpResponseOk<views::MemberList>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    let members =
        apictx.platform.group_members_list(&account_id, &path.id).await?;
    Ok(HttpResponseOk(members.into()))
}

/*
 * Attachment management (provisioned account, admin caller)
 */

/// Path parameters for attachment requests
#[derive(Deserialize, JsonSchema)]
struct AttachmentPathParam {
    /// The attachment's id.
    id: String,
}

/// Attach a policy template to a user or group.
#[endpoint {
    method = POST,
    path = "/api/v0/authz/attachments",
}]
async fn authz_attachments_post(
    rqctx: RequestContext<ApiContext>,
    new_attachment: TypedBody<params::AttachmentCreate>,
) -> Result<HttpResponseCreated<views::Attachment>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let params = new_attachment.into_inner();
    let target_type = params.target_type.parse()?;
    let attachment = apictx
        .platform
        .attachment_create(
            &account_id,
            &params.policy_id,
            target_type,
            &params.target_id,
        )
        .await?;
    Ok(HttpResponseCreated(attachment.into()))
}

/// List the account's attachments, optionally filtered by policy or
/// target.
#[endpoint {
    method = GET,
    path = "/api/v0/authz/attachments",
}]
async fn authz_attachments_get(
    rqctx: RequestContext<ApiContext>,
    query_params: Query<params::AttachmentListSelector>,
) -> Result<HttpResponseOk<views::AttachmentList>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let query = query_params.into_inner();
    let target_type = match &query.target_type {
        Some(value) => Some(value.parse()?),
        None => None,
    };
    let filter = crate::app::AttachmentListFilter {
        policy_id: query.policy_id,
        target_type,
        target_id: query.target_id,
    };
    let attachments =
        apictx.platform.attachments_list(&account_id, &filter).await?;
    Ok(HttpResponseOk(attachments.into()))
}

/// Detach a policy.
#[endpoint {
    method = DELETE,
    path = "/api/v0/authz/attachments/{id}",
}]
async fn authz_attachments_delete_attachment(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<AttachmentPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    apictx.platform.attachment_delete(&account_id, &path.id).await?;
    Ok(HttpResponseDeleted())
}

/*
 * Administrator management (provisioned account, admin caller)
 */

/// Path parameters for admin requests
#[derive(Deserialize, JsonSchema)]
struct AdminPathParam {
    /// The admin's principal ARN (URL-encoded).
    arn: String,
}

/// Add an administrator to the account.
#[endpoint {
    method = POST,
    path = "/api/v0/authz/admins",
}]
async fn authz_admins_post(
    rqctx: RequestContext<ApiContext>,
    new_admin: TypedBody<params::AdminAdd>,
) -> Result<HttpResponseCreated<views::Admin>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let created_by = opctx.authn.caller_arn().unwrap_or("").to_owned();
    let params = new_admin.into_inner();
    let admin = apictx
        .platform
        .admin_add(&account_id, &params.principal_arn, &created_by)
        .await?;
    Ok(HttpResponseCreated(admin.into()))
}

/// List the account's administrators.
#[endpoint {
    method = GET,
    path = "/api/v0/authz/admins",
}]
async fn authz_admins_get(
    rqctx: RequestContext<ApiContext>,
) -> Result<HttpResponseOk<views::AdminList>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let admins = apictx.platform.admins_list(&account_id).await?;
    Ok(HttpResponseOk(admins.into()))
}

/// Remove an administrator from the account.
#[endpoint {
    method = DELETE,
    path = "/api/v0/authz/admins/{arn}",
}]
async fn authz_admins_delete_admin(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<AdminPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    admin_gates(&rqctx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let path = path_params.into_inner();
    apictx.platform.admin_remove(&account_id, &path.arn).await?;
    Ok(HttpResponseDeleted())
}

/*
 * Authorization check (provisioned account)
 */

/// Evaluate an authorization request against the account's policies.
#[endpoint {
    method = POST,
    path = "/api/v0/authz/check",
}]
async fn authz_check_post(
    rqctx: RequestContext<ApiContext>,
    check: TypedBody<params::AuthorizationCheck>,
) -> Result<HttpResponseOk<views::AuthorizationDecision>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::require_provisioned(apictx, &opctx).await?;

    let account_id = opctx.authn.account_id_required()?.to_owned();
    let params = check.into_inner();
    for (value, label) in [
        (&params.principal, "principal"),
        (&params.action, "action"),
        (&params.resource, "resource"),
    ] {
        if value.is_empty() {
            return Err(crate::api_error::Error::invalid_argument(&format!(
                "{} is required",
                label
            ))
            .into());
        }
    }

    let request = AuthzRequest {
        account_id,
        caller_arn: params.principal,
        action: params.action,
        resource: params.resource,
        resource_tags: params.resource_tags,
        request_tags: BTreeMap::new(),
        context: params.context,
    };
    let decision = apictx
        .platform
        .authz()
        .authorize(&request)
        .await
        .map_err(gate::authorize_error)?;
    Ok(HttpResponseOk(decision.into()))
}

/*
 * Workload passthroughs (full decision pipeline)
 */

/// Path parameters for cluster requests
#[derive(Deserialize, JsonSchema)]
struct ClusterPathParam {
    /// The cluster's id.
    id: String,
}

/// Path parameters for node pool requests
#[derive(Deserialize, JsonSchema)]
struct NodePoolPathParam {
    /// The cluster's id.
    id: String,
    /// The node pool's id.
    nodepool_id: String,
}

/// Create a cluster.
#[endpoint {
    method = POST,
    path = "/api/v0/clusters",
}]
async fn clusters_post(
    rqctx: RequestContext<ApiContext>,
    body: TypedBody<serde_json::Value>,
) -> Result<HttpResponseCreated<serde_json::Value>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    let body = body.into_inner();
    gate::authorize_request(&rqctx, &opctx, workload::request_tags(&body))
        .await?;

    let cluster = apictx.workload.cluster_create(&body).await?;
    Ok(HttpResponseCreated(cluster))
}

/// List clusters.
#[endpoint {
    method = GET,
    path = "/api/v0/clusters",
}]
async fn clusters_get(
    rqctx: RequestContext<ApiContext>,
) -> Result<HttpResponseOk<serde_json::Value>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::authorize_request(&rqctx, &opctx, BTreeMap::new()).await?;

    let clusters = apictx.workload.clusters_list().await?;
    Ok(HttpResponseOk(clusters))
}

/// Fetch a specific cluster.
#[endpoint {
    method = GET,
    path = "/api/v0/clusters/{id}",
}]
async fn clusters_get_cluster(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<ClusterPathParam>,
) -> Result<HttpResponseOk<serde_json::Value>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::authorize_request(&rqctx, &opctx, BTreeMap::new()).await?;

    let path = path_params.into_inner();
    let cluster = apictx.workload.cluster_fetch(&path.id).await?;
    Ok(HttpResponseOk(cluster))
}

/// Delete a cluster.
#[endpoint {
    method = DELETE,
    path = "/api/v0/clusters/{id}",
}]
async fn clusters_delete_cluster(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<ClusterPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::authorize_request(&rqctx, &opctx, BTreeMap::new()).await?;

    let path = path_params.into_inner();
    apictx.workload.cluster_delete(&path.id).await?;
    Ok(HttpResponseDeleted())
}

/// Create a node pool in a cluster.
#[endpoint {
    method = POST,
    path = "/api/v0/clusters/{id}/nodepools",
}]
async fn cluster_nodepools_post(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<ClusterPathParam>,
    body: TypedBody<serde_json::Value>,
) -> Result<HttpResponseCreated<serde_json::Value>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    let body = body.into_inner();
    gate::authorize_request(&rqctx, &opctx, workload::request_tags(&body))
        .await?;

    let path = path_params.into_inner();
    let nodepool = apictx.workload.nodepool_create(&path.id, &body).await?;
    Ok(HttpResponseCreated(nodepool))
}

/// List a cluster's node pools.
#[endpoint {
    method = GET,
    path = "/api/v0/clusters/{id}/nodepools",
}]
async fn cluster_nodepools_get(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<ClusterPathParam>,
) -> Result<HttpResponseOk<serde_json::Value>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::authorize_request(&rqctx, &opctx, BTreeMap::new()).await?;

    let path = path_params.into_inner();
    let nodepools = apictx.workload.nodepools_list(&path.id).await?;
    Ok(HttpResponseOk(nodepools))
}

/// Fetch a specific node pool.
#[endpoint {
    method = GET,
    path = "/api/v0/clusters/{id}/nodepools/{nodepool_id}",
}]
async fn cluster_nodepools_get_nodepool(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<NodePoolPathParam>,
) -> Result<HttpResponseOk<serde_json::Value>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::authorize_request(&rqctx, &opctx, BTreeMap::new()).await?;

    let path = path_params.into_inner();
    let nodepool =
        apictx.workload.nodepool_fetch(&path.id, &path.nodepool_id).await?;
    Ok(HttpResponseOk(nodepool))
}

/// Delete a node pool.
#[endpoint {
    method = DELETE,
    path = "/api/v0/clusters/{id}/nodepools/{nodepool_id}",
}]
async fn cluster_nodepools_delete_nodepool(
    rqctx: RequestContext<ApiContext>,
    path_params: Path<NodePoolPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(&rqctx);
    gate::authorize_request(&rqctx, &opctx, BTreeMap::new()).await?;

    let path = path_params.into_inner();
    apictx.workload.nodepool_delete(&path.id, &path.nodepool_id).await?;
    Ok(HttpResponseDeleted())
}

/*
 * Probes
 */

/// Readiness probe.
#[endpoint {
    method = GET,
    path = "/api/v0/ready",
}]
async fn probe_ready(
    rqctx: RequestContext<ApiContext>,
) -> Result<HttpResponseOk<views::HealthStatus>, HttpError> {
    let apictx = rqctx.context();
    if !apictx.is_ready() {
        return Err(HttpError::for_unavail(
            None,
            String::from("server is shutting down"),
        ));
    }
    Ok(HttpResponseOk(views::HealthStatus { status: String::from("ok") }))
}

/// Liveness probe.
#[endpoint {
    method = GET,
    path = "/api/v0/live",
}]
async fn probe_live(
    _rqctx: RequestContext<ApiContext>,
) -> Result<HttpResponseOk<views::HealthStatus>, HttpError> {
    Ok(HttpResponseOk(views::HealthStatus { status: String::from("ok") }))
}
