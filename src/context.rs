// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared state used by API request handlers

use crate::app::Platform;
use crate::authn;
use crate::config::Config;
use crate::config::EngineConfig;
use crate::db::Kv;
use crate::engine::local::LocalEngine;
use crate::engine::remote::RemoteEngine;
use crate::engine::PolicyEngine;
use crate::workload::WorkloadClient;
use slog::o;
use slog::Logger;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;

/// Shared state available to all API request handlers
pub struct ServerContext {
    /// the management core
    pub platform: Arc<Platform>,
    /// client for the upstream workload-management service
    pub workload: WorkloadClient,
    /// debug log
    pub log: Logger,
    /// region used when assembling canonical resource strings
    pub region: String,
    /// readiness flag surfaced by the ready probe
    ready: AtomicBool,
}

impl ServerContext {
    /// Create a new context from the configuration and the injected
    /// key-value driver.  The policy-engine backend is chosen by the
    /// configured engine mode.
    pub fn new(
        log: Logger,
        config: &Config,
        kv: Arc<dyn Kv>,
    ) -> Result<Arc<ServerContext>, String> {
        let engine: Arc<dyn PolicyEngine> = match &config.authz.engine {
            EngineConfig::Remote { endpoint } => Arc::new(
                RemoteEngine::new(
                    log.new(o!("component" => "policy_engine")),
                    endpoint,
                    Duration::from_secs(config.authz.request_timeout_secs),
                )
                .map_err(|error| {
                    format!("initializing policy engine client: {}", error)
                })?,
            ),
            EngineConfig::Local => Arc::new(LocalEngine::new(
                log.new(o!("component" => "policy_engine")),
            )),
        };

        let platform = Arc::new(Platform::new(
            log.new(o!("component" => "platform")),
            kv,
            engine,
        ));
        let workload = WorkloadClient::new(
            log.new(o!("component" => "workload_client")),
            &config.workload.base_url,
            Duration::from_secs(config.workload.request_timeout_secs),
        )
        .map_err(|error| format!("initializing workload client: {}", error))?;

        let ready = AtomicBool::new(true);
        Ok(Arc::new(ServerContext {
            platform,
            workload,
            log,
            region: config.authz.region.clone(),
            ready,
        }))
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Provides general facilities scoped to whatever operation the server is
/// currently doing
///
/// OpContexts are constructed when the server begins doing something.
/// This is usually when it starts handling an API request, but it could
/// be a background operation or a test.
// Not all of these fields are used yet, but they may still prove useful
// for debugging.
#[allow(dead_code)]
pub struct OpContext {
    pub log: slog::Logger,
    pub authn: authn::Context,

    created_instant: Instant,
    created_walltime: SystemTime,
    metadata: BTreeMap<String, String>,
    kind: OpKind,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpKind {
    /// Handling an external API request
    ExternalApiRequest,
    /// Background operations
    Background,
    /// Automated testing
    Test,
}

impl OpContext {
    /// Build the operation context for an external API request
    ///
    /// This lifts caller identity out of the request metadata.  It never
    /// rejects: requests with missing identity fields are annotated as
    /// such and the gates decide what they require.
    pub fn for_external_api(
        rqctx: &dropshot::RequestContext<Arc<ServerContext>>,
    ) -> OpContext {
        let created_instant = Instant::now();
        let created_walltime = SystemTime::now();
        let apictx = rqctx.context();
        let authn =
            authn::external::identity_from_headers(rqctx.request.headers());

        let request_id = authn
            .request_id()
            .map(String::from)
            .unwrap_or_else(|| rqctx.request_id.clone());
        let mut metadata = BTreeMap::new();
        metadata.insert(String::from("request_id"), request_id.clone());
        metadata.insert(
            String::from("http_method"),
            rqctx.request.method().to_string(),
        );
        metadata
            .insert(String::from("http_uri"), rqctx.request.uri().to_string());

        let mut log = apictx.log.new(o!("request_id" => request_id));
        if let Some(account_id) = authn.account_id() {
            log = log.new(o!("account_id" => account_id.to_owned()));
        }

        OpContext {
            log,
            authn,
            created_instant,
            created_walltime,
            metadata,
            kind: OpKind::ExternalApiRequest,
        }
    }

    /// Returns a context suitable for background operations
    pub fn for_background(log: slog::Logger) -> OpContext {
        OpContext {
            log,
            authn: authn::Context::unauthenticated(),
            created_instant: Instant::now(),
            created_walltime: SystemTime::now(),
            metadata: BTreeMap::new(),
            kind: OpKind::Background,
        }
    }

    /// Returns a context for automated tests with the given identity
    pub fn for_tests(log: slog::Logger, authn: authn::Context) -> OpContext {
        OpContext {
            log,
            authn,
            created_instant: Instant::now(),
            created_walltime: SystemTime::now(),
            metadata: BTreeMap::new(),
            kind: OpKind::Test,
        }
    }
}
