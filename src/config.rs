// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for parsing configuration files and working with a server
//! configuration

use dropshot::ConfigDropshot;
use dropshot::ConfigLogging;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Which policy-engine backend to use
///
/// `remote` talks to the hosted engine at `endpoint`; `local` runs the
/// in-process evaluator (local development and tests).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum EngineConfig {
    Remote { endpoint: String },
    Local,
}

/// Authorization-related configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthzConfig {
    /// region stamped into canonical resource strings
    pub region: String,
    /// policy-engine backend selection
    pub engine: EngineConfig,
    /// per-request deadline for engine calls, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Upstream workload-management service configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WorkloadConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Configuration for the server
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Dropshot server parameters
    pub dropshot: ConfigDropshot,
    /// Server-wide logging configuration
    pub log: ConfigLogging,
    /// Authorization-related configuration
    pub authz: AuthzConfig,
    /// Upstream workload-management service
    pub workload: WorkloadConfig,
}

/// Failure to load a `Config` from a file
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("read \"{}\"", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("parse \"{}\"", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        err: toml::de::Error,
    },
}

impl Config {
    /// Load a `Config` from the given TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, LoadError> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.to_path_buf(), err })?;
        let config_parsed: Config = toml::from_str(&file_contents)
            .map_err(|err| LoadError::Parse { path: path.to_path_buf(), err })?;
        Ok(config_parsed)
    }
}

#[cfg(test)]
mod test {
    use super::Config;
    use super::EngineConfig;
    use super::LoadError;

    const EXAMPLE_CONFIG: &str = r##"
        [dropshot]
        bind_address = "127.0.0.1:8000"

        [log]
        mode = "stderr-terminal"
        level = "info"

        [authz]
        region = "us-east-1"

        [authz.engine]
        mode = "local"

        [workload]
        base_url = "http://workload:8000"
        "##;

    #[test]
    fn test_parse_example_config() {
        let config: Config = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!("us-east-1", config.authz.region);
        assert!(matches!(config.authz.engine, EngineConfig::Local));
        assert_eq!("http://workload:8000", config.workload.base_url);
        // Defaulted when unspecified.
        assert_eq!(30, config.authz.request_timeout_secs);
        assert_eq!(30, config.workload.request_timeout_secs);
    }

    #[test]
    fn test_parse_remote_engine() {
        let config: Config = toml::from_str(
            &EXAMPLE_CONFIG.replace(
                "mode = \"local\"",
                "mode = \"remote\"\nendpoint = \"http://engine:9000\"",
            ),
        )
        .unwrap();
        match config.authz.engine {
            EngineConfig::Remote { endpoint } => {
                assert_eq!("http://engine:9000", endpoint)
            }
            other => panic!("unexpected engine config: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let error = Config::from_file("/nonexistent/config.toml").unwrap_err();
        assert!(matches!(error, LoadError::Io { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let error = toml::from_str::<Config>("this is not toml").unwrap_err();
        // Make sure the parse error mentions the problem rather than
        // panicking somewhere inside serde.
        assert!(!error.to_string().is_empty());
    }
}
