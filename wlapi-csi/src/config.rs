//! Process configuration for the plugin.
//!
//! Command-line flags:
//! - `--node-id`: node identity reported by `NodeGetInfo`.  When unset, the
//!   identity is read from the environment variable named by `--node-id-env`
//!   (default `MY_NODE_ID`).
//! - `--csi-socket-path`: where the CSI socket is created (default
//!   `/csi/csi.sock`).
//! - `--wlapi-socket-dir`: the agent's Workload API socket directory, bound
//!   into every published volume.
//! - `--log-format`: `text` (default) or `json`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// CSI node plugin exposing the Workload API socket to ephemeral volumes.
#[derive(Debug, Parser)]
#[command(name = "wlapi-csi", version, about)]
pub struct Args {
    /// Kubernetes node ID. If unset, the node ID is obtained from the
    /// environment (see --node-id-env)
    #[arg(long)]
    pub node_id: Option<String>,

    /// Environment variable from which to obtain the node ID. Overridden by
    /// --node-id
    #[arg(long, default_value = "MY_NODE_ID")]
    pub node_id_env: String,

    /// Path to the CSI socket
    #[arg(long, default_value = "/csi/csi.sock")]
    pub csi_socket_path: PathBuf,

    /// Path to the Workload API socket directory
    #[arg(long)]
    pub wlapi_socket_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Resolve flags into a [`Config`], reading the node ID from the
    /// environment through `lookup_env` when `--node-id` is not given.
    pub fn into_config(self, lookup_env: impl Fn(&str) -> Option<String>) -> Config {
        let node_id = self
            .node_id
            .filter(|id| !id.is_empty())
            .or_else(|| lookup_env(&self.node_id_env))
            .unwrap_or_default();
        Config {
            node_id,
            workload_api_dir: self.wlapi_socket_dir.unwrap_or_default(),
            csi_socket_path: self.csi_socket_path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("node ID is required")]
    MissingNodeId,
    #[error("workload API directory is required")]
    MissingWorkloadApiDir,
    #[error("CSI socket path is required")]
    MissingCsiSocketPath,
}

/// Immutable plugin configuration, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub node_id: String,
    pub workload_api_dir: PathBuf,
    pub csi_socket_path: PathBuf,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::MissingNodeId);
        }
        if self.workload_api_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingWorkloadApiDir);
        }
        if self.csi_socket_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingCsiSocketPath);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("wlapi-csi").chain(args.iter().copied()))
            .expect("parse")
    }

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |var| {
            pairs
                .iter()
                .find(|(k, _)| *k == var)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.node_id_env, "MY_NODE_ID");
        assert_eq!(args.csi_socket_path, PathBuf::from("/csi/csi.sock"));
        assert_eq!(args.log_format, LogFormat::Text);

        let config = args.into_config(env(&[]));
        assert_eq!(config.validate(), Err(ConfigError::MissingNodeId));
    }

    #[test]
    fn node_id_from_default_env_var() {
        let config = parse(&["--wlapi-socket-dir", "/run/agent"])
            .into_config(env(&[("MY_NODE_ID", "node-a")]));
        assert_eq!(config.node_id, "node-a");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn node_id_from_custom_env_var() {
        let config = parse(&["--node-id-env", "K8S_NODE"])
            .into_config(env(&[("MY_NODE_ID", "wrong"), ("K8S_NODE", "node-b")]));
        assert_eq!(config.node_id, "node-b");
    }

    #[test]
    fn node_id_flag_overrides_env() {
        let config =
            parse(&["--node-id", "node-c"]).into_config(env(&[("MY_NODE_ID", "node-a")]));
        assert_eq!(config.node_id, "node-c");
    }

    #[test]
    fn each_field_is_required() {
        let valid = Config {
            node_id: "node-a".into(),
            workload_api_dir: "/run/agent".into(),
            csi_socket_path: "/csi/csi.sock".into(),
        };
        assert_eq!(valid.validate(), Ok(()));

        let missing_dir = Config {
            workload_api_dir: PathBuf::new(),
            ..valid.clone()
        };
        assert_eq!(
            missing_dir.validate().unwrap_err().to_string(),
            "workload API directory is required"
        );

        let missing_socket = Config {
            csi_socket_path: PathBuf::new(),
            ..valid
        };
        assert_eq!(
            missing_socket.validate(),
            Err(ConfigError::MissingCsiSocketPath)
        );
    }

    #[test]
    fn json_log_format() {
        assert_eq!(parse(&["--log-format", "json"]).log_format, LogFormat::Json);
    }
}
