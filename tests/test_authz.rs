// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests of the authorization control plane
//!
//! These drive the management core and the decision pipeline against the
//! in-memory entity store and the local policy-engine backend, so policy
//! evaluation here is real Cedar evaluation.

use dropshot::test_util::LogContext;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingLevel;
use rosa_platform_api::api_error::Error;
use rosa_platform_api::app::Platform;
use rosa_platform_api::app::TargetType;
use rosa_platform_api::authz::AuthzRequest;
use rosa_platform_api::authz::Decision;
use rosa_platform_api::db::MemKv;
use rosa_platform_api::engine::local::LocalEngine;
use std::collections::BTreeMap;
use std::sync::Arc;

const BOOTSTRAP_ACCOUNT: &str = "000000000000";
const BOOTSTRAP_CALLER: &str = "arn:aws:iam::000000000000:user/bootstrap";
const TENANT: &str = "111111111111";

fn test_setup(name: &str) -> (LogContext, Platform) {
    let logctx = LogContext::new(
        name,
        &ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Debug },
    );
    let log = logctx.log.clone();
    let platform = Platform::new(
        log.clone(),
        Arc::new(MemKv::new()),
        Arc::new(LocalEngine::new(log)),
    );
    (logctx, platform)
}

fn authz_request(
    account_id: &str,
    caller_arn: &str,
    action: &str,
    resource: &str,
) -> AuthzRequest {
    AuthzRequest {
        account_id: account_id.to_owned(),
        caller_arn: caller_arn.to_owned(),
        action: action.to_owned(),
        resource: resource.to_owned(),
        resource_tags: BTreeMap::new(),
        request_tags: BTreeMap::new(),
        context: serde_json::Map::new(),
    }
}

async fn enable_tenant(platform: &Platform) {
    platform
        .account_enable(BOOTSTRAP_ACCOUNT, BOOTSTRAP_CALLER, true)
        .await
        .unwrap();
    platform.account_enable(TENANT, BOOTSTRAP_CALLER, false).await.unwrap();
}

#[tokio::test]
async fn test_privileged_bootstrap_bypass() {
    let (logctx, platform) = test_setup("test_privileged_bootstrap_bypass");

    let bootstrap = platform
        .account_enable(BOOTSTRAP_ACCOUNT, BOOTSTRAP_CALLER, true)
        .await
        .unwrap();
    assert!(bootstrap.privileged);
    assert_eq!("", bootstrap.policy_store_id);

    // The privileged account allows any request without any policies.
    let decision = platform
        .authz()
        .authorize(&authz_request(
            BOOTSTRAP_ACCOUNT,
            BOOTSTRAP_CALLER,
            "CreateCluster",
            "*",
        ))
        .await
        .unwrap();
    assert_eq!(Decision::Allow, decision);

    // Enabling a regular account provisions a policy store for it.
    let tenant = platform
        .account_enable(TENANT, BOOTSTRAP_CALLER, false)
        .await
        .unwrap();
    assert!(!tenant.privileged);
    assert!(!tenant.policy_store_id.is_empty());

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_unprovisioned_account_is_an_error() {
    let (logctx, platform) =
        test_setup("test_unprovisioned_account_is_an_error");

    let error = platform
        .authz()
        .authorize(&authz_request(
            "222222222222",
            "arn:aws:iam::222222222222:user/x",
            "ListGroups",
            "*",
        ))
        .await
        .unwrap_err();
    assert_eq!(
        Error::AccountNotProvisioned {
            account_id: String::from("222222222222")
        },
        error
    );

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_admin_bypass() {
    let (logctx, platform) = test_setup("test_admin_bypass");
    enable_tenant(&platform).await;

    let admin_arn = "arn:aws:iam::111111111111:user/admin";
    platform.admin_add(TENANT, admin_arn, BOOTSTRAP_CALLER).await.unwrap();

    // Admins allow without any policy evaluation.
    let decision = platform
        .authz()
        .authorize(&authz_request(TENANT, admin_arn, "DeleteCluster", "*"))
        .await
        .unwrap();
    assert_eq!(Decision::Allow, decision);

    // A non-admin caller with no policies falls through to default deny.
    let decision = platform
        .authz()
        .authorize(&authz_request(
            TENANT,
            "arn:aws:iam::111111111111:user/peon",
            "DeleteCluster",
            "*",
        ))
        .await
        .unwrap();
    assert_eq!(Decision::Deny, decision);

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_group_attachment_traversal() {
    let (logctx, platform) = test_setup("test_group_attachment_traversal");
    enable_tenant(&platform).await;

    let member_arn = "arn:aws:iam::111111111111:user/u";
    let group = platform.group_create(TENANT, "viewers", "").await.unwrap();
    platform
        .group_member_add(TENANT, &group.group_id, member_arn)
        .await
        .unwrap();

    let policy = platform
        .policy_create(
            TENANT,
            "describe-clusters",
            "",
            r#"permit(?principal, action == Action::"DescribeCluster", resource);"#,
        )
        .await
        .unwrap();
    platform
        .attachment_create(
            TENANT,
            &policy.policy_id,
            TargetType::Group,
            &group.group_id,
        )
        .await
        .unwrap();

    let resource = format!("arn:aws:rosa:us-east-1:{}:cluster/c1", TENANT);

    // The group member matches through the entity hierarchy.
    let decision = platform
        .authz()
        .authorize(&authz_request(
            TENANT,
            member_arn,
            "DescribeCluster",
            &resource,
        ))
        .await
        .unwrap();
    assert_eq!(Decision::Allow, decision);

    // A principal outside the group does not.
    let decision = platform
        .authz()
        .authorize(&authz_request(
            TENANT,
            "arn:aws:iam::111111111111:user/other",
            "DescribeCluster",
            &resource,
        ))
        .await
        .unwrap();
    assert_eq!(Decision::Deny, decision);

    // Nor does the member for an action the policy doesn't name.
    let decision = platform
        .authz()
        .authorize(&authz_request(
            TENANT,
            member_arn,
            "DeleteCluster",
            &resource,
        ))
        .await
        .unwrap();
    assert_eq!(Decision::Deny, decision);

    // Membership removal revokes the match.
    platform
        .group_member_remove(TENANT, &group.group_id, member_arn)
        .await
        .unwrap();
    let decision = platform
        .authz()
        .authorize(&authz_request(
            TENANT,
            member_arn,
            "DescribeCluster",
            &resource,
        ))
        .await
        .unwrap();
    assert_eq!(Decision::Deny, decision);

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_action_prefix_is_stripped() {
    let (logctx, platform) = test_setup("test_action_prefix_is_stripped");
    enable_tenant(&platform).await;

    let caller = "arn:aws:iam::111111111111:user/u";
    let policy = platform
        .policy_create(
            TENANT,
            "describe-clusters",
            "",
            r#"permit(?principal, action == Action::"DescribeCluster", resource);"#,
        )
        .await
        .unwrap();
    platform
        .attachment_create(TENANT, &policy.policy_id, TargetType::User, caller)
        .await
        .unwrap();

    let decision = platform
        .authz()
        .authorize(&authz_request(
            TENANT,
            caller,
            "rosa:DescribeCluster",
            "*",
        ))
        .await
        .unwrap();
    assert_eq!(Decision::Allow, decision);

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_tag_conditioned_policy() {
    let (logctx, platform) = test_setup("test_tag_conditioned_policy");
    enable_tenant(&platform).await;

    let caller = "arn:aws:iam::111111111111:user/u";
    let policy = platform
        .policy_create(
            TENANT,
            "dev-only",
            "",
            r#"permit(?principal, action, resource)
               when { resource.tags["Environment"] == "development" };"#,
        )
        .await
        .unwrap();
    platform
        .attachment_create(TENANT, &policy.policy_id, TargetType::User, caller)
        .await
        .unwrap();

    let mut request = authz_request(
        TENANT,
        caller,
        "DescribeCluster",
        "arn:aws:rosa:us-east-1:111111111111:cluster/c1",
    );
    request.resource_tags.insert(
        String::from("Environment"),
        String::from("development"),
    );
    assert_eq!(
        Decision::Allow,
        platform.authz().authorize(&request).await.unwrap()
    );

    request.resource_tags.insert(
        String::from("Environment"),
        String::from("production"),
    );
    assert_eq!(
        Decision::Deny,
        platform.authz().authorize(&request).await.unwrap()
    );

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_policy_round_trip() {
    let (logctx, platform) = test_setup("test_policy_round_trip");
    enable_tenant(&platform).await;

    let cedar = "permit(?principal, action, resource);";
    let created = platform
        .policy_create(TENANT, "p1", "grants everything", cedar)
        .await
        .unwrap();
    assert!(!created.policy_id.is_empty());

    let fetched =
        platform.policy_fetch(TENANT, &created.policy_id).await.unwrap();
    assert_eq!("p1", fetched.name);
    assert_eq!("grants everything", fetched.description);
    // The Cedar text survives byte-for-byte.
    assert_eq!(cedar, fetched.cedar_policy);

    let listed = platform.policies_list(TENANT).await.unwrap();
    assert_eq!(1, listed.len());
    assert_eq!(fetched, listed[0]);

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_policy_delete_refused_while_attached() {
    let (logctx, platform) =
        test_setup("test_policy_delete_refused_while_attached");
    enable_tenant(&platform).await;

    let policy = platform
        .policy_create(TENANT, "p1", "", "permit(?principal, action, resource);")
        .await
        .unwrap();
    let attachment = platform
        .attachment_create(
            TENANT,
            &policy.policy_id,
            TargetType::User,
            "arn:aws:iam::111111111111:user/u",
        )
        .await
        .unwrap();

    let error =
        platform.policy_delete(TENANT, &policy.policy_id).await.unwrap_err();
    assert_eq!(Error::PolicyInUse, error);

    platform
        .attachment_delete(TENANT, &attachment.attachment_id)
        .await
        .unwrap();
    platform.policy_delete(TENANT, &policy.policy_id).await.unwrap();

    let error =
        platform.policy_fetch(TENANT, &policy.policy_id).await.unwrap_err();
    assert!(matches!(error, Error::ObjectNotFound { .. }));

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_policy_update_propagates_to_attachments() {
    let (logctx, platform) =
        test_setup("test_policy_update_propagates_to_attachments");
    enable_tenant(&platform).await;

    let caller = "arn:aws:iam::111111111111:user/u";
    let policy = platform
        .policy_create(
            TENANT,
            "p1",
            "",
            r#"permit(?principal, action == Action::"DescribeCluster", resource);"#,
        )
        .await
        .unwrap();
    platform
        .attachment_create(TENANT, &policy.policy_id, TargetType::User, caller)
        .await
        .unwrap();

    assert_eq!(
        Decision::Allow,
        platform
            .authz()
            .authorize(&authz_request(TENANT, caller, "DescribeCluster", "*"))
            .await
            .unwrap()
    );

    platform
        .policy_update(
            TENANT,
            &policy.policy_id,
            "p1",
            "",
            r#"permit(?principal, action == Action::"DeleteCluster", resource);"#,
        )
        .await
        .unwrap();

    // The existing attachment now grants the new action, not the old one.
    assert_eq!(
        Decision::Deny,
        platform
            .authz()
            .authorize(&authz_request(TENANT, caller, "DescribeCluster", "*"))
            .await
            .unwrap()
    );
    assert_eq!(
        Decision::Allow,
        platform
            .authz()
            .authorize(&authz_request(TENANT, caller, "DeleteCluster", "*"))
            .await
            .unwrap()
    );

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_group_lifecycle_leaves_no_trace() {
    let (logctx, platform) =
        test_setup("test_group_lifecycle_leaves_no_trace");
    enable_tenant(&platform).await;

    let member_arn = "arn:aws:iam::111111111111:user/u";
    let group = platform.group_create(TENANT, "ops", "on-call").await.unwrap();
    platform
        .group_member_add(TENANT, &group.group_id, member_arn)
        .await
        .unwrap();

    assert_eq!(
        vec![member_arn.to_owned()],
        platform.group_members_list(TENANT, &group.group_id).await.unwrap()
    );
    assert_eq!(
        vec![group.group_id.clone()],
        platform.user_groups_list(TENANT, member_arn).await.unwrap()
    );

    platform.group_delete(TENANT, &group.group_id).await.unwrap();

    assert!(platform.groups_list(TENANT).await.unwrap().is_empty());
    assert!(platform
        .user_groups_list(TENANT, member_arn)
        .await
        .unwrap()
        .is_empty());
    let error = platform
        .group_members_list(TENANT, &group.group_id)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::ObjectNotFound { .. }));

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_cross_tenant_isolation() {
    let (logctx, platform) = test_setup("test_cross_tenant_isolation");
    enable_tenant(&platform).await;
    platform
        .account_enable("333333333333", BOOTSTRAP_CALLER, false)
        .await
        .unwrap();

    // An admin of one account has no standing in another.
    let admin_arn = "arn:aws:iam::111111111111:user/admin";
    platform.admin_add(TENANT, admin_arn, BOOTSTRAP_CALLER).await.unwrap();
    assert!(platform
        .datastore()
        .admin_is(TENANT, admin_arn)
        .await
        .unwrap());
    assert!(!platform
        .datastore()
        .admin_is("333333333333", admin_arn)
        .await
        .unwrap());

    // Nor do their policies: a policy granted in one tenant's store does
    // not leak into another tenant's decisions.
    let policy = platform
        .policy_create(
            TENANT,
            "allow-all",
            "",
            "permit(?principal, action, resource);",
        )
        .await
        .unwrap();
    let user = "arn:aws:iam::111111111111:user/u";
    platform
        .attachment_create(TENANT, &policy.policy_id, TargetType::User, user)
        .await
        .unwrap();

    assert_eq!(
        Decision::Allow,
        platform
            .authz()
            .authorize(&authz_request(TENANT, user, "DescribeCluster", "*"))
            .await
            .unwrap()
    );
    assert_eq!(
        Decision::Deny,
        platform
            .authz()
            .authorize(&authz_request(
                "333333333333",
                user,
                "DescribeCluster",
                "*"
            ))
            .await
            .unwrap()
    );

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_account_lifecycle() {
    let (logctx, platform) = test_setup("test_account_lifecycle");
    enable_tenant(&platform).await;

    // Enabling twice conflicts.
    let error = platform
        .account_enable(TENANT, BOOTSTRAP_CALLER, false)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::ObjectAlreadyExists { .. }));

    // Account ids are canonical 12-digit strings.
    let error = platform
        .account_enable("not-an-account", BOOTSTRAP_CALLER, false)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidArgument { .. }));

    // Privileged accounts have no policy store and cannot hold policies.
    let error = platform
        .policy_create(
            BOOTSTRAP_ACCOUNT,
            "p1",
            "",
            "permit(?principal, action, resource);",
        )
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidArgument { .. }));

    // Empty Cedar text is rejected up front.
    let error =
        platform.policy_create(TENANT, "p1", "", "   ").await.unwrap_err();
    assert!(matches!(error, Error::InvalidArgument { .. }));

    // Disable removes the record; a second disable is NotFound.
    platform.account_disable(TENANT).await.unwrap();
    let error = platform.account_fetch(TENANT).await.unwrap_err();
    assert!(matches!(error, Error::ObjectNotFound { .. }));
    let error = platform.account_disable(TENANT).await.unwrap_err();
    assert!(matches!(error, Error::ObjectNotFound { .. }));

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_attachment_listing_filters() {
    let (logctx, platform) = test_setup("test_attachment_listing_filters");
    enable_tenant(&platform).await;

    let p1 = platform
        .policy_create(TENANT, "p1", "", "permit(?principal, action, resource);")
        .await
        .unwrap();
    let p2 = platform
        .policy_create(TENANT, "p2", "", "forbid(?principal, action, resource);")
        .await
        .unwrap();
    let group = platform.group_create(TENANT, "ops", "").await.unwrap();
    platform
        .attachment_create(
            TENANT,
            &p1.policy_id,
            TargetType::Group,
            &group.group_id,
        )
        .await
        .unwrap();
    platform
        .attachment_create(
            TENANT,
            &p2.policy_id,
            TargetType::User,
            "arn:aws:iam::111111111111:user/u",
        )
        .await
        .unwrap();

    use rosa_platform_api::app::AttachmentListFilter;
    let all = platform
        .attachments_list(TENANT, &AttachmentListFilter::default())
        .await
        .unwrap();
    assert_eq!(2, all.len());

    let by_policy = platform
        .attachments_list(
            TENANT,
            &AttachmentListFilter {
                policy_id: Some(p1.policy_id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(1, by_policy.len());
    assert_eq!(TargetType::Group, by_policy[0].target_type);
    assert_eq!(group.group_id, by_policy[0].target_id);

    let by_target = platform
        .attachments_list(
            TENANT,
            &AttachmentListFilter {
                policy_id: None,
                target_type: Some(TargetType::User),
                target_id: Some(String::from(
                    "arn:aws:iam::111111111111:user/u",
                )),
            },
        )
        .await
        .unwrap();
    assert_eq!(1, by_target.len());
    assert_eq!(p2.policy_id, by_target[0].policy_id);

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_member_add_is_idempotent() {
    let (logctx, platform) = test_setup("test_member_add_is_idempotent");
    enable_tenant(&platform).await;

    let group = platform.group_create(TENANT, "ops", "").await.unwrap();
    let member_arn = "arn:aws:iam::111111111111:user/u";
    platform
        .group_member_add(TENANT, &group.group_id, member_arn)
        .await
        .unwrap();
    platform
        .group_member_add(TENANT, &group.group_id, member_arn)
        .await
        .unwrap();
    assert_eq!(
        1,
        platform
            .group_members_list(TENANT, &group.group_id)
            .await
            .unwrap()
            .len()
    );

    // Removing an absent member is a no-op, not an error.
    platform
        .group_member_remove(TENANT, &group.group_id, "arn:absent")
        .await
        .unwrap();

    logctx.cleanup_successful();
}
