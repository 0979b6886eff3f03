// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests of the external HTTP API
//!
//! These start a real server on an ephemeral port, backed by the
//! in-memory entity store and the local policy-engine backend, and drive
//! it with an HTTP client carrying the edge-stamped identity headers.

use dropshot::test_util::LogContext;
use dropshot::ConfigDropshot;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingLevel;
use rosa_platform_api::config::AuthzConfig;
use rosa_platform_api::config::Config;
use rosa_platform_api::config::EngineConfig;
use rosa_platform_api::config::WorkloadConfig;
use rosa_platform_api::db::MemKv;
use rosa_platform_api::Server;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;

const BOOTSTRAP_ACCOUNT: &str = "000000000000";
const BOOTSTRAP_CALLER: &str = "arn:aws:iam::000000000000:user/bootstrap";
const TENANT: &str = "111111111111";
const ADMIN_ARN: &str = "arn:aws:iam::111111111111:user/admin";

struct TestServer {
    logctx: LogContext,
    server: Server,
    client: reqwest::Client,
    base_url: String,
}

impl TestServer {
    async fn start(name: &str) -> TestServer {
        let logctx = LogContext::new(
            name,
            &ConfigLogging::StderrTerminal {
                level: ConfigLoggingLevel::Debug,
            },
        );
        let config = Config {
            dropshot: ConfigDropshot {
                bind_address: "127.0.0.1:0".parse().unwrap(),
                ..Default::default()
            },
            log: ConfigLogging::StderrTerminal {
                level: ConfigLoggingLevel::Error,
            },
            authz: AuthzConfig {
                region: String::from("us-east-1"),
                engine: EngineConfig::Local,
                request_timeout_secs: 30,
            },
            workload: WorkloadConfig {
                base_url: String::from("http://127.0.0.1:1"),
                request_timeout_secs: 5,
            },
        };
        let server =
            Server::start(&config, &logctx.log, Arc::new(MemKv::new()))
                .await
                .unwrap();
        let base_url = format!("http://{}", server.http_server.local_addr());

        // Seed the privileged bootstrap account.  (The first privileged
        // account cannot be created through the API it gates.)
        server
            .apictx
            .platform
            .account_enable(BOOTSTRAP_ACCOUNT, BOOTSTRAP_CALLER, true)
            .await
            .unwrap();

        TestServer {
            logctx,
            server,
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        account_id: &str,
        caller_arn: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-amz-account-id", account_id)
            .header("x-amz-caller-arn", caller_arn)
    }

    /// Enable a regular tenant account and seed its first admin.  The
    /// first admin is seeded through the app layer because the admin
    /// routes themselves require an existing admin.
    async fn provision_tenant(&self) {
        let response = self
            .request(
                reqwest::Method::POST,
                "/api/v0/accounts",
                BOOTSTRAP_ACCOUNT,
                BOOTSTRAP_CALLER,
            )
            .json(&json!({"accountId": TENANT, "privileged": false}))
            .send()
            .await
            .unwrap();
        assert_eq!(201, response.status().as_u16());

        self.server
            .apictx
            .platform
            .admin_add(TENANT, ADMIN_ARN, BOOTSTRAP_CALLER)
            .await
            .unwrap();
    }

    async fn teardown(self) {
        self.server.http_server.close().await.unwrap();
        self.logctx.cleanup_successful();
    }
}

async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["error_code"].as_str().unwrap_or_default().to_owned()
}

#[tokio::test]
async fn test_http_privileged_bootstrap() {
    let ts = TestServer::start("test_http_privileged_bootstrap").await;

    // A privileged caller enables a regular account.
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/accounts",
            BOOTSTRAP_ACCOUNT,
            BOOTSTRAP_CALLER,
        )
        .json(&json!({"accountId": TENANT, "privileged": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!("Account", body["kind"]);
    assert_eq!(TENANT, body["accountId"]);
    assert_eq!(false, body["privileged"]);
    assert!(!body["policyStoreId"].as_str().unwrap().is_empty());

    // The account is visible to privileged reads.
    let response = ts
        .request(
            reqwest::Method::GET,
            &format!("/api/v0/accounts/{}", TENANT),
            BOOTSTRAP_ACCOUNT,
            BOOTSTRAP_CALLER,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    // Enabling it again conflicts.
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/accounts",
            BOOTSTRAP_ACCOUNT,
            BOOTSTRAP_CALLER,
        )
        .json(&json!({"accountId": TENANT, "privileged": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(409, response.status().as_u16());
    assert_eq!("AlreadyExists", error_code(response).await);

    // A non-privileged account cannot reach the account routes at all.
    let response = ts
        .request(
            reqwest::Method::GET,
            "/api/v0/accounts",
            TENANT,
            ADMIN_ARN,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    assert_eq!("NotPrivileged", error_code(response).await);

    // And a request with no identity at all is refused up front.
    let response = ts
        .client
        .get(format!("{}/api/v0/accounts", ts.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    assert_eq!("MissingAccountId", error_code(response).await);

    ts.teardown().await;
}

#[tokio::test]
async fn test_http_unprovisioned_blocked() {
    let ts = TestServer::start("test_http_unprovisioned_blocked").await;

    let response = ts
        .request(
            reqwest::Method::GET,
            "/api/v0/authz/groups",
            "222222222222",
            "arn:aws:iam::222222222222:user/x",
        )
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    assert_eq!("AccountNotProvisioned", error_code(response).await);

    ts.teardown().await;
}

#[tokio::test]
async fn test_http_admin_can_manage_policies() {
    let ts = TestServer::start("test_http_admin_can_manage_policies").await;
    ts.provision_tenant().await;

    // The admin creates a policy template.
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/policies",
            TENANT,
            ADMIN_ARN,
        )
        .json(&json!({
            "name": "p1",
            "description": "",
            "policy": "permit(?principal, action, resource);"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let policy_id = body["policyId"].as_str().unwrap().to_owned();
    assert!(!policy_id.is_empty());

    // Round trip: the Cedar text and metadata come back as stored.
    let response = ts
        .request(
            reqwest::Method::GET,
            &format!("/api/v0/authz/policies/{}", policy_id),
            TENANT,
            ADMIN_ARN,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!("p1", body["name"]);
    assert_eq!("permit(?principal, action, resource);", body["policy"]);

    // A non-admin caller is refused.
    let response = ts
        .request(
            reqwest::Method::GET,
            "/api/v0/authz/policies",
            TENANT,
            "arn:aws:iam::111111111111:user/peon",
        )
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    assert_eq!("NotAdmin", error_code(response).await);

    // The admin check is per-tenant: the same admin ARN has no standing
    // under another provisioned account.
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/accounts",
            BOOTSTRAP_ACCOUNT,
            BOOTSTRAP_CALLER,
        )
        .json(&json!({"accountId": "333333333333", "privileged": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let response = ts
        .request(
            reqwest::Method::GET,
            "/api/v0/authz/groups",
            "333333333333",
            ADMIN_ARN,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    assert_eq!("NotAdmin", error_code(response).await);

    ts.teardown().await;
}

#[tokio::test]
async fn test_http_group_attachment_check() {
    let ts = TestServer::start("test_http_group_attachment_check").await;
    ts.provision_tenant().await;

    let member_arn = "arn:aws:iam::111111111111:user/u";

    // Create a group.
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/groups",
            TENANT,
            ADMIN_ARN,
        )
        .json(&json!({"name": "viewers", "description": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let group_id = body["groupId"].as_str().unwrap().to_owned();

    // Add the member via the replace-list endpoint.
    let response = ts
        .request(
            reqwest::Method::PUT,
            &format!("/api/v0/authz/groups/{}/members", group_id),
            TENANT,
            ADMIN_ARN,
        )
        .json(&json!({"add": [member_arn], "remove": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(json!([member_arn]), body["items"]);

    // Create a policy and attach it to the group.
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/policies",
            TENANT,
            ADMIN_ARN,
        )
        .json(&json!({
            "name": "describe-clusters",
            "description": "",
            "policy":
                "permit(?principal, action == Action::\"DescribeCluster\", resource);"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let policy_id = body["policyId"].as_str().unwrap().to_owned();

    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/attachments",
            TENANT,
            ADMIN_ARN,
        )
        .json(&json!({
            "policyId": policy_id,
            "targetType": "group",
            "targetId": group_id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());

    // The member is allowed through group traversal...
    let check = |principal: &str| {
        json!({
            "principal": principal,
            "action": "DescribeCluster",
            "resource":
                format!("arn:aws:rosa:us-east-1:{}:cluster/c1", TENANT),
        })
    };
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/check",
            TENANT,
            member_arn,
        )
        .json(&check(member_arn))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!("ALLOW", body["decision"]);

    // ...and an unrelated principal is denied.
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/check",
            TENANT,
            member_arn,
        )
        .json(&check("arn:aws:iam::111111111111:user/other"))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!("DENY", body["decision"]);

    ts.teardown().await;
}

#[tokio::test]
async fn test_http_tag_conditioned_check() {
    let ts = TestServer::start("test_http_tag_conditioned_check").await;
    ts.provision_tenant().await;

    let member_arn = "arn:aws:iam::111111111111:user/u";
    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/policies",
            TENANT,
            ADMIN_ARN,
        )
        .json(&json!({
            "name": "dev-only",
            "description": "",
            "policy": "permit(?principal, action, resource) \
                       when { resource.tags[\"Environment\"] == \"development\" };"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let policy_id = body["policyId"].as_str().unwrap().to_owned();

    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/attachments",
            TENANT,
            ADMIN_ARN,
        )
        .json(&json!({
            "policyId": policy_id,
            "targetType": "user",
            "targetId": member_arn
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());

    let check = |environment: &str| {
        json!({
            "principal": member_arn,
            "action": "DescribeCluster",
            "resource":
                format!("arn:aws:rosa:us-east-1:{}:cluster/c1", TENANT),
            "resourceTags": {"Environment": environment},
        })
    };
    for (environment, expected) in
        [("development", "ALLOW"), ("production", "DENY")]
    {
        let response = ts
            .request(
                reqwest::Method::POST,
                "/api/v0/authz/check",
                TENANT,
                member_arn,
            )
            .json(&check(environment))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(expected, body["decision"], "environment {}", environment);
    }

    ts.teardown().await;
}

#[tokio::test]
async fn test_http_check_validation() {
    let ts = TestServer::start("test_http_check_validation").await;
    ts.provision_tenant().await;

    let response = ts
        .request(
            reqwest::Method::POST,
            "/api/v0/authz/check",
            TENANT,
            ADMIN_ARN,
        )
        .json(&json!({"principal": "", "action": "X", "resource": "*"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
    assert_eq!("InvalidArgument", error_code(response).await);

    ts.teardown().await;
}

#[tokio::test]
async fn test_http_cluster_routes_are_gated() {
    let ts = TestServer::start("test_http_cluster_routes_are_gated").await;
    ts.provision_tenant().await;

    // An unprovisioned account is refused before anything is forwarded
    // upstream.
    let response = ts
        .request(
            reqwest::Method::GET,
            "/api/v0/clusters",
            "222222222222",
            "arn:aws:iam::222222222222:user/x",
        )
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    assert_eq!("AccountNotProvisioned", error_code(response).await);

    // A provisioned caller with no matching policy is denied by the
    // engine (default deny), again without reaching upstream.
    let response = ts
        .request(
            reqwest::Method::GET,
            "/api/v0/clusters",
            TENANT,
            "arn:aws:iam::111111111111:user/peon",
        )
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());
    assert_eq!("AccessDenied", error_code(response).await);

    ts.teardown().await;
}

#[tokio::test]
async fn test_http_probes() {
    let ts = TestServer::start("test_http_probes").await;

    for path in ["/api/v0/live", "/api/v0/ready"] {
        let response = ts
            .client
            .get(format!("{}{}", ts.base_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16(), "probe {}", path);
        let body: Value = response.json().await.unwrap();
        assert_eq!("ok", body["status"]);
    }

    ts.teardown().await;
}
