//! Server configuration.
//!
//! Values start from built-in defaults, are optionally merged from a YAML
//! file named by the `CONFIG` environment variable, and finally overridden
//! by individual environment variables.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

/// Which interfaces the listening socket accepts connections on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Loopback only (127.0.0.1)
    Local,
    /// All interfaces (0.0.0.0)
    Global,
}

impl AccessMode {
    /// Parses `local`/`l` or `global`/`g`, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "l" => Some(AccessMode::Local),
            "global" | "g" => Some(AccessMode::Global),
            _ => None,
        }
    }

    pub fn ip(&self) -> Ipv4Addr {
        match self {
            AccessMode::Local => Ipv4Addr::LOCALHOST,
            AccessMode::Global => Ipv4Addr::UNSPECIFIED,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub mode: AccessMode,
    pub backlog: u32,
    /// Maximum number of simultaneously registered client connections.
    pub max_clients: usize,
    /// Size of each connection's fixed receive buffer.
    pub buffer_capacity: usize,
    /// Byte that terminates a line on the wire.
    pub end_of_line: u8,
    /// Directory that request paths are resolved against.
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 15445,
            mode: AccessMode::Global,
            backlog: 10,
            max_clients: 100,
            buffer_capacity: 8192,
            end_of_line: b'\n',
            root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Builds the effective configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {}", path))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("failed to parse config file {}", path))?
            }
            Err(_) => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(port) = env_parsed("PORT") {
            self.port = port;
        }
        if let Ok(mode) = std::env::var("MODE") {
            match AccessMode::parse(&mode) {
                Some(m) => self.mode = m,
                None => tracing::warn!(value = %mode, "Ignoring invalid MODE"),
            }
        }
        if let Some(backlog) = env_parsed("BACKLOG") {
            self.backlog = backlog;
        }
        if let Some(max) = env_parsed("MAX_CLIENTS") {
            self.max_clients = max;
        }
        if let Ok(root) = std::env::var("ROOT") {
            self.root = PathBuf::from(root);
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.mode.ip(), self.port))
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid environment override");
            None
        }
    }
}
