// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Library interface to the regional platform API
//!
//! The heart of the service is the multi-tenant authorization control
//! plane: the [`authz`] decision pipeline, the [`db`] entity store, the
//! [`engine`] policy-engine adapters, and the [`app`] management core,
//! exposed over HTTP by [`external_api`].

pub mod api_error;
pub mod app;
pub mod authn;
pub mod authz;
pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod external_api;
pub mod workload;

pub use config::Config;
pub use context::OpContext;
pub use context::ServerContext;

use crate::db::Kv;
use crate::external_api::http_entrypoints::external_api;
use slog::info;
use slog::o;
use slog::Logger;
use std::sync::Arc;

/// Packages up the running HTTP server wired to the platform core
pub struct Server {
    /// shared state used by API request handlers
    pub apictx: Arc<ServerContext>,
    /// dropshot server for the external API
    pub http_server: dropshot::HttpServer<Arc<ServerContext>>,
}

impl Server {
    /// Start the server with the given key-value driver
    ///
    /// The durable driver is the deployment's choice; tests and local
    /// development pass [`db::MemKv`].
    pub async fn start(
        config: &Config,
        log: &Logger,
        kv: Arc<dyn Kv>,
    ) -> Result<Server, String> {
        info!(log, "setting up platform API server");

        let ctxlog = log.new(o!("component" => "ServerContext"));
        let apictx = ServerContext::new(ctxlog, config, kv)?;

        let http_server_starter = dropshot::HttpServerStarter::new(
            &config.dropshot,
            external_api(),
            Arc::clone(&apictx),
            &log.new(o!("component" => "dropshot_external")),
        )
        .map_err(|error| format!("initializing external server: {}", error))?;
        let http_server = http_server_starter.start();

        Ok(Server { apictx, http_server })
    }

    /// Wait for the server to shut down
    ///
    /// Note that this doesn't initiate a graceful shutdown, so if you call
    /// this immediately after calling `start()`, the program will block
    /// indefinitely or until something else initiates a graceful shutdown.
    pub async fn wait_for_finish(self) -> Result<(), String> {
        let result = self.http_server.await;
        // Flip the readiness probe so load balancers drain us if the
        // process lingers past server teardown.
        self.apictx.set_ready(false);
        result.map_err(|error| format!("waiting for server: {}", error))
    }
}

/// Run an instance of the [`Server`]
pub async fn run_server(config: &Config) -> Result<(), String> {
    let log = config
        .log
        .to_logger("rosa-platform-api")
        .map_err(|message| format!("initializing logger: {}", message))?;
    let server =
        Server::start(config, &log, Arc::new(db::MemKv::new())).await?;
    server.wait_for_finish().await
}
