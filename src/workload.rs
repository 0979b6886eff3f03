// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client for the upstream workload-management service
//!
//! The cluster and node-pool handlers are thin wrappers over this
//! service; the platform API only contributes the authorization gates in
//! front of them.  Bodies pass through as opaque JSON in both directions.

use crate::api_error::Error;
use crate::api_error::ResourceType;
use slog::debug;
use slog::Logger;
use std::time::Duration;

pub struct WorkloadClient {
    log: Logger,
    client: reqwest::Client,
    base_url: String,
}

impl WorkloadClient {
    pub fn new(
        log: Logger,
        base_url: &str,
        request_timeout: Duration,
    ) -> Result<WorkloadClient, Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| {
                Error::internal_error(&format!(
                    "initializing workload client: {}",
                    error
                ))
            })?;
        Ok(WorkloadClient {
            log,
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub async fn cluster_create(
        &self,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        self.forward(
            self.client.post(self.url("/clusters")).json(body),
            ResourceType::Cluster,
            None,
        )
        .await
    }

    pub async fn clusters_list(&self) -> Result<serde_json::Value, Error> {
        self.forward(
            self.client.get(self.url("/clusters")),
            ResourceType::Cluster,
            None,
        )
        .await
    }

    pub async fn cluster_fetch(
        &self,
        cluster_id: &str,
    ) -> Result<serde_json::Value, Error> {
        self.forward(
            self.client.get(self.url(&format!("/clusters/{}", cluster_id))),
            ResourceType::Cluster,
            Some(cluster_id),
        )
        .await
    }

    pub async fn cluster_delete(&self, cluster_id: &str) -> Result<(), Error> {
        self.forward_unit(
            self.client
                .delete(self.url(&format!("/clusters/{}", cluster_id))),
            ResourceType::Cluster,
            Some(cluster_id),
        )
        .await
    }

    pub async fn nodepool_create(
        &self,
        cluster_id: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        self.forward(
            self.client
                .post(
                    self.url(&format!("/clusters/{}/nodepools", cluster_id)),
                )
                .json(body),
            ResourceType::NodePool,
            None,
        )
        .await
    }

    pub async fn nodepools_list(
        &self,
        cluster_id: &str,
    ) -> Result<serde_json::Value, Error> {
        self.forward(
            self.client
                .get(self.url(&format!("/clusters/{}/nodepools", cluster_id))),
            ResourceType::NodePool,
            None,
        )
        .await
    }

    pub async fn nodepool_fetch(
        &self,
        cluster_id: &str,
        nodepool_id: &str,
    ) -> Result<serde_json::Value, Error> {
        self.forward(
            self.client.get(self.url(&format!(
                "/clusters/{}/nodepools/{}",
                cluster_id, nodepool_id
            ))),
            ResourceType::NodePool,
            Some(nodepool_id),
        )
        .await
    }

    pub async fn nodepool_delete(
        &self,
        cluster_id: &str,
        nodepool_id: &str,
    ) -> Result<(), Error> {
        self.forward_unit(
            self.client.delete(self.url(&format!(
                "/clusters/{}/nodepools/{}",
                cluster_id, nodepool_id
            ))),
            ResourceType::NodePool,
            Some(nodepool_id),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn forward_raw(
        &self,
        request: reqwest::RequestBuilder,
        type_name: ResourceType,
        id: Option<&str>,
    ) -> Result<reqwest::Response, Error> {
        let response = request.send().await.map_err(|error| {
            Error::upstream(&format!("workload service request: {}", error))
        })?;
        let status = response.status();
        debug!(self.log, "workload service response"; "status" => %status);
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
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
                "workload service returned {}: {}",
                status, message
            )));
        }
        Ok(response)
    }

    async fn forward(
        &self,
        request: reqwest::RequestBuilder,
        type_name: ResourceType,
        id: Option<&str>,
    ) -> Result<serde_json::Value, Error> {
        let response = self.forward_raw(request, type_name, id).await?;
        response.json().await.map_err(|error| {
            Error::upstream(&format!(
                "decoding workload service response: {}",
                error
            ))
        })
    }

    async fn forward_unit(
        &self,
        request: reqwest::RequestBuilder,
        type_name: ResourceType,
        id: Option<&str>,
    ) -> Result<(), Error> {
        self.forward_raw(request, type_name, id).await.map(|_| ())
    }
}

/// Extract the `tags` map from a create-request body, if present
///
/// Tags become `requestTags` in the authorization query.  Non-string
/// values are ignored; the tags map is advisory input to policy
/// evaluation, not part of the forwarded payload contract.
pub fn request_tags(
    body: &serde_json::Value,
) -> std::collections::BTreeMap<String, String> {
    body.get("tags")
        .and_then(serde_json::Value::as_object)
        .map(|tags| {
            tags.iter()
                .filter_map(|(key, value)| {
                    value
                        .as_str()
                        .map(|value| (key.clone(), value.to_owned()))
                })
                .collect()
        })
        .unwrap_or_default()
}
