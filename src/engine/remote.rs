// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hosted policy-engine backend
//!
//! Speaks JSON over HTTP to a hosted engine that natively understands
//! policy stores, templates, and template-linked policies.  This client
//! is deliberately thin: it translates the capability calls onto the
//! wire and maps failures into the API error taxonomy.  Engine-side
//! failures are transient from our point of view and surface as
//! `UpstreamFailure`.

use super::AuthorizationQuery;
use super::EngineDecision;
use super::EntityRef;
use super::LinkedPolicyRecord;
use super::PolicyEngine;
use super::PolicyFilter;
use super::TemplateRecord;
use crate::api_error::Error;
use crate::api_error::ResourceType;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use slog::debug;
use slog::Logger;
use std::time::Duration;

/// Client for the hosted policy engine
pub struct RemoteEngine {
    log: Logger,
    client: reqwest::Client,
    base_url: String,
}

impl RemoteEngine {
    pub fn new(
        log: Logger,
        endpoint: &str,
        request_timeout: Duration,
    ) -> Result<RemoteEngine, Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| {
                Error::internal_error(&format!(
                    "initializing policy engine client: {}",
                    error
                ))
            })?;
        Ok(RemoteEngine {
            log,
            client,
            base_url: endpoint.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a request and check the response status
    ///
    /// `not_found` names the object a 404 refers to; other non-success
    /// statuses become `UpstreamFailure`.
    async fn execute_raw(
        &self,
        request: reqwest::RequestBuilder,
        not_found: Option<(ResourceType, &str)>,
    ) -> Result<reqwest::Response, Error> {
        let response = request.send().await.map_err(|error| {
            Error::upstream(&format!("policy engine request: {}", error))
        })?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some((type_name, id)) = not_found {
                return Err(Error::not_found_by_id(type_name, id));
            }
        }
        if status == reqwest::StatusCode::BAD_REQUEST {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::invalid_argument(&message));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::upstream(&format!(
                "policy engine returned {}: {}",
                status, message
            )));
        }
        Ok(response)
    }

    /// Issue a request and decode the JSON response
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        not_found: Option<(ResourceType, &str)>,
    ) -> Result<T, Error> {
        let response = self.execute_raw(request, not_found).await?;
        response.json().await.map_err(|error| {
            Error::upstream(&format!(
                "decoding policy engine response: {}",
                error
            ))
        })
    }

    /// Issue a request whose response body, if any, is discarded
    async fn execute_unit(
        &self,
        request: reqwest::RequestBuilder,
        not_found: Option<(ResourceType, &str)>,
    ) -> Result<(), Error> {
        self.execute_raw(request, not_found).await.map(|_| ())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreCreateRequest<'a> {
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreCreateResponse {
    policy_store_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SchemaPutRequest<'a> {
    cedar_json: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateWriteRequest<'a> {
    statement: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateResponse {
    template_id: String,
    statement: String,
    #[serde(default)]
    description: String,
    created_at: DateTime<Utc>,
}

impl From<TemplateResponse> for TemplateRecord {
    fn from(response: TemplateResponse) -> TemplateRecord {
        TemplateRecord {
            template_id: response.template_id,
            statement: response.statement,
            description: response.description,
            created_at: response.created_at,
        }
    }
}

#[derive(Deserialize)]
struct ListResponse<T> {
    items: Vec<T>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentCreateRequest<'a> {
    template_id: &'a str,
    principal: &'a EntityRef,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkedPolicyResponse {
    policy_id: String,
    template_id: String,
    principal: EntityRef,
    created_at: DateTime<Utc>,
}

impl From<LinkedPolicyResponse> for LinkedPolicyRecord {
    fn from(response: LinkedPolicyResponse) -> LinkedPolicyRecord {
        LinkedPolicyRecord {
            policy_id: response.policy_id,
            template_id: response.template_id,
            principal: response.principal,
            created_at: response.created_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionResponse {
    decision: EngineDecision,
}

#[async_trait]
impl PolicyEngine for RemoteEngine {
    async fn policy_store_create(
        &self,
        description: &str,
    ) -> Result<String, Error> {
        let response: StoreCreateResponse = self
            .execute(
                self.client
                    .post(self.url("/v1/policy-stores"))
                    .json(&StoreCreateRequest { description }),
                None,
            )
            .await?;
        debug!(self.log, "created policy store";
            "policy_store_id" => &response.policy_store_id);
        Ok(response.policy_store_id)
    }

    async fn policy_store_delete(&self, store_id: &str) -> Result<(), Error> {
        self
            .execute_unit(
                self.client
                    .delete(self.url(&format!("/v1/policy-stores/{}", store_id))),
                Some((ResourceType::PolicyStore, store_id)),
            )
            .await?;
        Ok(())
    }

    async fn schema_put(
        &self,
        store_id: &str,
        schema_json: &str,
    ) -> Result<(), Error> {
        self
            .execute_unit(
                self.client
                    .put(self.url(&format!(
                        "/v1/policy-stores/{}/schema",
                        store_id
                    )))
                    .json(&SchemaPutRequest { cedar_json: schema_json }),
                Some((ResourceType::PolicyStore, store_id)),
            )
            .await?;
        Ok(())
    }

    async fn template_create(
        &self,
        store_id: &str,
        statement: &str,
        description: &str,
    ) -> Result<TemplateRecord, Error> {
        let response: TemplateResponse = self
            .execute(
                self.client
                    .post(self.url(&format!(
                        "/v1/policy-stores/{}/templates",
                        store_id
                    )))
                    .json(&TemplateWriteRequest { statement, description }),
                Some((ResourceType::PolicyStore, store_id)),
            )
            .await?;
        Ok(response.into())
    }

    async fn template_fetch(
        &self,
        store_id: &str,
        template_id: &str,
    ) -> Result<TemplateRecord, Error> {
        let response: TemplateResponse = self
            .execute(
                self.client.get(self.url(&format!(
                    "/v1/policy-stores/{}/templates/{}",
                    store_id, template_id
                ))),
                Some((ResourceType::Policy, template_id)),
            )
            .await?;
        Ok(response.into())
    }

    async fn template_update(
        &self,
        store_id: &str,
        template_id: &str,
        statement: &str,
        description: &str,
    ) -> Result<TemplateRecord, Error> {
        let response: TemplateResponse = self
            .execute(
                self.client
                    .put(self.url(&format!(
                        "/v1/policy-stores/{}/templates/{}",
                        store_id, template_id
                    )))
                    .json(&TemplateWriteRequest { statement, description }),
                Some((ResourceType::Policy, template_id)),
            )
            .await?;
        Ok(response.into())
    }

    async fn template_delete(
        &self,
        store_id: &str,
        template_id: &str,
    ) -> Result<(), Error> {
        self
            .execute_unit(
                self.client.delete(self.url(&format!(
                    "/v1/policy-stores/{}/templates/{}",
                    store_id, template_id
                ))),
                Some((ResourceType::Policy, template_id)),
            )
            .await?;
        Ok(())
    }

    async fn templates_list(
        &self,
        store_id: &str,
    ) -> Result<Vec<TemplateRecord>, Error> {
        let response: ListResponse<TemplateResponse> = self
            .execute(
                self.client.get(self.url(&format!(
                    "/v1/policy-stores/{}/templates",
                    store_id
                ))),
                Some((ResourceType::PolicyStore, store_id)),
            )
            .await?;
        Ok(response.items.into_iter().map(TemplateRecord::from).collect())
    }

    async fn attachment_create(
        &self,
        store_id: &str,
        template_id: &str,
        principal: EntityRef,
    ) -> Result<LinkedPolicyRecord, Error> {
        let response: LinkedPolicyResponse = self
            .execute(
                self.client
                    .post(self.url(&format!(
                        "/v1/policy-stores/{}/policies",
                        store_id
                    )))
                    .json(&AttachmentCreateRequest {
                        template_id,
                        principal: &principal,
                    }),
                Some((ResourceType::Policy, template_id)),
            )
            .await?;
        Ok(response.into())
    }

    async fn attachment_delete(
        &self,
        store_id: &str,
        policy_id: &str,
    ) -> Result<(), Error> {
        self
            .execute_unit(
                self.client.delete(self.url(&format!(
                    "/v1/policy-stores/{}/policies/{}",
                    store_id, policy_id
                ))),
                Some((ResourceType::Attachment, policy_id)),
            )
            .await?;
        Ok(())
    }

    async fn attachments_list(
        &self,
        store_id: &str,
        filter: &PolicyFilter,
    ) -> Result<Vec<LinkedPolicyRecord>, Error> {
        let mut request = self.client.get(
            self.url(&format!("/v1/policy-stores/{}/policies", store_id)),
        );
        if let Some(template_id) = &filter.template_id {
            request = request.query(&[("templateId", template_id.as_str())]);
        }
        if let Some(principal) = &filter.principal {
            request = request.query(&[
                ("principalType", principal.entity_type.as_str()),
                ("principalId", principal.entity_id.as_str()),
            ]);
        }
        let response: ListResponse<LinkedPolicyResponse> = self
            .execute(request, Some((ResourceType::PolicyStore, store_id)))
            .await?;
        Ok(response.items.into_iter().map(LinkedPolicyRecord::from).collect())
    }

    async fn is_authorized(
        &self,
        store_id: &str,
        query: &AuthorizationQuery,
    ) -> Result<EngineDecision, Error> {
        let response: DecisionResponse = self
            .execute(
                self.client
                    .post(self.url(&format!(
                        "/v1/policy-stores/{}/is-authorized",
                        store_id
                    )))
                    .json(query),
                Some((ResourceType::PolicyStore, store_id)),
            )
            .await?;
        Ok(response.decision)
    }
}

#[cfg(test)]
mod test {
    use crate::engine::EngineDecision;

    #[test]
    fn test_decision_wire_format() {
        assert_eq!(
            EngineDecision::Allow,
            serde_json::from_str::<EngineDecision>("\"ALLOW\"").unwrap()
        );
        assert_eq!(
            EngineDecision::Deny,
            serde_json::from_str::<EngineDecision>("\"DENY\"").unwrap()
        );
    }
}
