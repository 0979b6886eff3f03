// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local policy-engine backend
//!
//! The hosted engine understands templates and attachments natively; the
//! in-process evaluator accepts only flat lists of resolved single-statement
//! Cedar policies.  This adapter bridges the gap: it keeps per-store
//! registries of templates and attachments, recomputes the resolved Cedar
//! text whenever the set changes, and pushes the full resolved set to the
//! evaluator via an idempotent bulk replace.  Every authorization query
//! syncs first, so stale pushes are harmless.
//!
//! Two quirks of the evaluator are handled here and must not leak into the
//! Cedar text stored for templates: multi-statement sources are split into
//! one entry per statement, and `resource like` comparisons are rewritten
//! to `resource.arn like` because the evaluator surfaces entity identifiers
//! as structured values, not strings.

use super::evaluator::LocalEvaluator;
use super::evaluator::PolicyEntry;
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
use cedar_policy::Policy;
use chrono::DateTime;
use chrono::Utc;
use slog::debug;
use slog::warn;
use slog::Logger;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

struct TemplateState {
    statement: String,
    description: String,
    created_at: DateTime<Utc>,
}

struct PolicyState {
    /// Resolved Cedar text (placeholder already substituted)
    resolved: String,
    template_id: String,
    principal: EntityRef,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    templates: HashMap<String, TemplateState>,
    policies: HashMap<String, PolicyState>,
}

/// Policy-engine backend over the in-process evaluator
///
/// Registry reads take a shared per-store lock and writes an exclusive
/// one; the push to the evaluator happens outside the critical section
/// with a snapshot of the resolved set, so a slow evaluator does not
/// block writers.
pub struct LocalEngine {
    log: Logger,
    evaluator: Arc<LocalEvaluator>,
    stores: Mutex<HashMap<String, Arc<RwLock<StoreState>>>>,
}

impl LocalEngine {
    pub fn new(log: Logger) -> LocalEngine {
        LocalEngine {
            log,
            evaluator: Arc::new(LocalEvaluator::new()),
            stores: Mutex::new(HashMap::new()),
        }
    }

    async fn store_handle(
        &self,
        store_id: &str,
    ) -> Result<Arc<RwLock<StoreState>>, Error> {
        let stores = self.stores.lock().await;
        stores.get(store_id).cloned().ok_or_else(|| {
            Error::not_found_by_id(ResourceType::PolicyStore, store_id)
        })
    }

    /// Push the store's current resolved set to the evaluator
    ///
    /// The snapshot is taken under the read lock and pushed after it is
    /// released.  A failed push leaves the evaluator on the previous set;
    /// that staleness is tolerated because every query syncs again first.
    async fn sync(&self, store_id: &str) {
        let handle = match self.store_handle(store_id).await {
            Ok(handle) => handle,
            Err(_) => {
                // The store was deleted concurrently; nothing to push.
                return;
            }
        };
        let entries = {
            let state = handle.read().await;
            resolved_entries(&state)
        };
        if let Err(error) =
            self.evaluator.replace_policies(store_id, entries).await
        {
            warn!(self.log, "failed to sync resolved policies to evaluator";
                "policy_store_id" => store_id,
                "error" => %error,
            );
        }
    }
}

#[async_trait]
impl PolicyEngine for LocalEngine {
    async fn policy_store_create(
        &self,
        _description: &str,
    ) -> Result<String, Error> {
        let store_id = Uuid::new_v4().to_string();
        let mut stores = self.stores.lock().await;
        stores.insert(
            store_id.clone(),
            Arc::new(RwLock::new(StoreState::default())),
        );
        debug!(self.log, "created policy store"; "policy_store_id" => &store_id);
        Ok(store_id)
    }

    async fn policy_store_delete(&self, store_id: &str) -> Result<(), Error> {
        {
            let mut stores = self.stores.lock().await;
            stores.remove(store_id);
        }
        self.evaluator.remove_store(store_id).await;
        debug!(self.log, "deleted policy store"; "policy_store_id" => store_id);
        Ok(())
    }

    async fn schema_put(
        &self,
        store_id: &str,
        _schema_json: &str,
    ) -> Result<(), Error> {
        // The in-process evaluator does not enforce schema validation;
        // accept the schema so account provisioning behaves the same
        // against both backends.
        self.store_handle(store_id).await?;
        debug!(self.log, "accepted schema for local store";
            "policy_store_id" => store_id);
        Ok(())
    }

    async fn template_create(
        &self,
        store_id: &str,
        statement: &str,
        description: &str,
    ) -> Result<TemplateRecord, Error> {
        validate_template(statement)?;
        let handle = self.store_handle(store_id).await?;
        let template_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        {
            let mut state = handle.write().await;
            state.templates.insert(
                template_id.clone(),
                TemplateState {
                    statement: statement.to_owned(),
                    description: description.to_owned(),
                    created_at,
                },
            );
        }
        debug!(self.log, "created policy template";
            "policy_store_id" => store_id,
            "template_id" => &template_id,
        );
        Ok(TemplateRecord {
            template_id,
            statement: statement.to_owned(),
            description: description.to_owned(),
            created_at,
        })
    }

    async fn template_fetch(
        &self,
        store_id: &str,
        template_id: &str,
    ) -> Result<TemplateRecord, Error> {
        let handle = self.store_handle(store_id).await?;
        let state = handle.read().await;
        let template = state.templates.get(template_id).ok_or_else(|| {
            Error::not_found_by_id(ResourceType::Policy, template_id)
        })?;
        Ok(TemplateRecord {
            template_id: template_id.to_owned(),
            statement: template.statement.clone(),
            description: template.description.clone(),
            created_at: template.created_at,
        })
    }

    async fn template_update(
        &self,
        store_id: &str,
        template_id: &str,
        statement: &str,
        description: &str,
    ) -> Result<TemplateRecord, Error> {
        validate_template(statement)?;
        let handle = self.store_handle(store_id).await?;
        let created_at = {
            let mut state = handle.write().await;
            let template =
                state.templates.get_mut(template_id).ok_or_else(|| {
                    Error::not_found_by_id(ResourceType::Policy, template_id)
                })?;
            template.statement = statement.to_owned();
            template.description = description.to_owned();
            let created_at = template.created_at;

            // Changes propagate to every attachment linked to this
            // template: re-resolve their Cedar text now.
            for policy in state.policies.values_mut() {
                if policy.template_id == template_id {
                    policy.resolved =
                        resolve_principal(statement, &policy.principal);
                }
            }
            created_at
        };
        self.sync(store_id).await;
        Ok(TemplateRecord {
            template_id: template_id.to_owned(),
            statement: statement.to_owned(),
            description: description.to_owned(),
            created_at,
        })
    }

    async fn template_delete(
        &self,
        store_id: &str,
        template_id: &str,
    ) -> Result<(), Error> {
        let handle = self.store_handle(store_id).await?;
        let mut state = handle.write().await;
        state.templates.remove(template_id).ok_or_else(|| {
            Error::not_found_by_id(ResourceType::Policy, template_id)
        })?;
        Ok(())
    }

    async fn templates_list(
        &self,
        store_id: &str,
    ) -> Result<Vec<TemplateRecord>, Error> {
        let handle = self.store_handle(store_id).await?;
        let state = handle.read().await;
        let mut records = state
            .templates
            .iter()
            .map(|(template_id, template)| TemplateRecord {
                template_id: template_id.clone(),
                statement: template.statement.clone(),
                description: template.description.clone(),
                created_at: template.created_at,
            })
            .collect::<Vec<_>>();
        records.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        Ok(records)
    }

    async fn attachment_create(
        &self,
        store_id: &str,
        template_id: &str,
        principal: EntityRef,
    ) -> Result<LinkedPolicyRecord, Error> {
        let handle = self.store_handle(store_id).await?;
        let policy_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        {
            let mut state = handle.write().await;
            let template =
                state.templates.get(template_id).ok_or_else(|| {
                    Error::not_found_by_id(ResourceType::Policy, template_id)
                })?;
            let resolved = resolve_principal(&template.statement, &principal);
            state.policies.insert(
                policy_id.clone(),
                PolicyState {
                    resolved,
                    template_id: template_id.to_owned(),
                    principal: principal.clone(),
                    created_at,
                },
            );
        }
        self.sync(store_id).await;
        debug!(self.log, "created template-linked policy";
            "policy_store_id" => store_id,
            "template_id" => template_id,
            "policy_id" => &policy_id,
        );
        Ok(LinkedPolicyRecord {
            policy_id,
            template_id: template_id.to_owned(),
            principal,
            created_at,
        })
    }

    async fn attachment_delete(
        &self,
        store_id: &str,
        policy_id: &str,
    ) -> Result<(), Error> {
        let handle = self.store_handle(store_id).await?;
        {
            let mut state = handle.write().await;
            state.policies.remove(policy_id);
        }
        self.sync(store_id).await;
        Ok(())
    }

    async fn attachments_list(
        &self,
        store_id: &str,
        filter: &PolicyFilter,
    ) -> Result<Vec<LinkedPolicyRecord>, Error> {
        let handle = self.store_handle(store_id).await?;
        let state = handle.read().await;
        let mut records = state
            .policies
            .iter()
            .map(|(policy_id, policy)| LinkedPolicyRecord {
                policy_id: policy_id.clone(),
                template_id: policy.template_id.clone(),
                principal: policy.principal.clone(),
                created_at: policy.created_at,
            })
            .filter(|record| filter.matches(record))
            .collect::<Vec<_>>();
        records.sort_by(|a, b| a.policy_id.cmp(&b.policy_id));
        Ok(records)
    }

    async fn is_authorized(
        &self,
        store_id: &str,
        query: &AuthorizationQuery,
    ) -> Result<EngineDecision, Error> {
        // Sync before every query so the evaluator never answers from a
        // set older than the last completed registry write.
        self.sync(store_id).await;
        self.evaluator.is_authorized(store_id, query).await
    }
}

/// Substitute the `?principal` placeholder with the bound entity
///
/// The substitution is `principal in <entity>`, not `==`: "in" traverses
/// the request-time entity hierarchy, so a policy attached to a group
/// matches any principal that hierarchy declares to be a member of the
/// group.  Direct user attachments still match because every entity is
/// "in" itself.
fn resolve_principal(statement: &str, principal: &EntityRef) -> String {
    statement.replace("?principal", &format!("principal in {}", principal))
}

/// Rewrite Cedar text for the in-process evaluator
fn adapt_statement(statement: &str) -> String {
    statement.replace("resource like ", "resource.arn like ")
}

/// Split multi-statement Cedar source into single-statement entries
///
/// The evaluator requires one `permit`/`forbid` statement per entry.
fn split_statements(statement: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    for line in statement.lines() {
        let trimmed = line.trim_start();
        if (trimmed.starts_with("permit") || trimmed.starts_with("forbid"))
            && !current.trim().is_empty()
        {
            statements.push(current.trim().to_owned());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        statements.push(current.trim().to_owned());
    }
    statements
}

/// Compute the flat resolved set for a store
fn resolved_entries(state: &StoreState) -> Vec<PolicyEntry> {
    let mut policy_ids = state.policies.keys().collect::<Vec<_>>();
    policy_ids.sort();

    let mut entries = Vec::new();
    for policy_id in policy_ids {
        let policy = &state.policies[policy_id];
        for (i, statement) in
            split_statements(&adapt_statement(&policy.resolved))
                .into_iter()
                .enumerate()
        {
            entries.push(PolicyEntry {
                id: format!("{}-{}", policy_id, i),
                content: statement,
            });
        }
    }
    entries
}

/// Check that a template statement is valid Cedar once resolved
///
/// The hosted engine validates templates server-side; this keeps the local
/// backend equally strict so invalid text is rejected at create time, not
/// discovered at evaluation time.
fn validate_template(statement: &str) -> Result<(), Error> {
    let probe = resolve_principal(statement, &EntityRef::principal("probe"));
    for single in split_statements(&adapt_statement(&probe)) {
        Policy::parse(None, &single).map_err(|error| {
            Error::invalid_argument(&format!("invalid policy: {}", error))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::adapt_statement;
    use super::resolve_principal;
    use super::split_statements;
    use super::validate_template;
    use super::LocalEngine;
    use crate::api_error::Error;
    use crate::engine::EntityRef;
    use crate::engine::PolicyEngine;
    use crate::engine::PolicyFilter;
    use slog::o;
    use slog::Discard;
    use slog::Logger;

    fn engine() -> LocalEngine {
        LocalEngine::new(Logger::root(Discard, o!()))
    }

    #[test]
    fn test_resolve_principal_uses_in() {
        let resolved = resolve_principal(
            "permit(?principal, action, resource);",
            &EntityRef::group("g1"),
        );
        assert_eq!(
            r#"permit(principal in Group::"g1", action, resource);"#,
            resolved
        );
    }

    #[test]
    fn test_adapt_resource_like() {
        let adapted = adapt_statement(
            r#"permit(principal, action, resource)
               when { resource like "arn:aws:rosa:*" };"#,
        );
        assert!(adapted.contains(r#"resource.arn like "arn:aws:rosa:*""#));
        // Only the bare entity comparison is rewritten.
        assert_eq!(
            "resource.arn like \"x\"",
            adapt_statement("resource.arn like \"x\"")
        );
    }

    #[test]
    fn test_split_statements() {
        let source = "permit(principal, action, resource)\n  when { true };\nforbid(principal, action, resource)\n  when { false };";
        let statements = split_statements(source);
        assert_eq!(2, statements.len());
        assert!(statements[0].starts_with("permit"));
        assert!(statements[1].starts_with("forbid"));

        assert_eq!(
            vec![String::from("permit(principal, action, resource);")],
            split_statements("permit(principal, action, resource);")
        );
        assert!(split_statements("").is_empty());
    }

    #[test]
    fn test_validate_template() {
        validate_template("permit(?principal, action, resource);").unwrap();
        let error =
            validate_template("permit(?principal, actio, resource;").unwrap_err();
        assert!(matches!(error, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_template_update_reresolves_attachments() {
        let engine = engine();
        let store_id = engine.policy_store_create("test").await.unwrap();
        let template = engine
            .template_create(
                &store_id,
                r#"permit(?principal, action == Action::"DescribeCluster", resource);"#,
                "{}",
            )
            .await
            .unwrap();
        engine
            .attachment_create(
                &store_id,
                &template.template_id,
                EntityRef::group("g1"),
            )
            .await
            .unwrap();

        engine
            .template_update(
                &store_id,
                &template.template_id,
                r#"permit(?principal, action == Action::"DeleteCluster", resource);"#,
                "{}",
            )
            .await
            .unwrap();

        let attachments = engine
            .attachments_list(&store_id, &PolicyFilter::default())
            .await
            .unwrap();
        assert_eq!(1, attachments.len());
        assert_eq!(template.template_id, attachments[0].template_id);
    }

    #[tokio::test]
    async fn test_attachment_requires_template() {
        let engine = engine();
        let store_id = engine.policy_store_create("test").await.unwrap();
        let error = engine
            .attachment_create(&store_id, "no-such", EntityRef::group("g1"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_store() {
        let engine = engine();
        let error = engine.templates_list("no-such").await.unwrap_err();
        assert!(matches!(error, Error::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_attachment_filters() {
        let engine = engine();
        let store_id = engine.policy_store_create("test").await.unwrap();
        let t1 = engine
            .template_create(
                &store_id,
                "permit(?principal, action, resource);",
                "{}",
            )
            .await
            .unwrap();
        let t2 = engine
            .template_create(
                &store_id,
                "forbid(?principal, action, resource);",
                "{}",
            )
            .await
            .unwrap();
        engine
            .attachment_create(&store_id, &t1.template_id, EntityRef::group("g1"))
            .await
            .unwrap();
        engine
            .attachment_create(
                &store_id,
                &t2.template_id,
                EntityRef::principal("arn:u"),
            )
            .await
            .unwrap();

        let all = engine
            .attachments_list(&store_id, &PolicyFilter::default())
            .await
            .unwrap();
        assert_eq!(2, all.len());

        let by_template = engine
            .attachments_list(&store_id, &PolicyFilter::by_template(&t1.template_id))
            .await
            .unwrap();
        assert_eq!(1, by_template.len());
        assert_eq!(EntityRef::group("g1"), by_template[0].principal);

        let by_principal = engine
            .attachments_list(
                &store_id,
                &PolicyFilter {
                    template_id: None,
                    principal: Some(EntityRef::principal("arn:u")),
                },
            )
            .await
            .unwrap();
        assert_eq!(1, by_principal.len());
        assert_eq!(t2.template_id, by_principal[0].template_id);
    }
}
