use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use crate::http::parser::DEFAULT_READ_BUFFER;

/// Server configuration.
///
/// Loaded from the YAML file named by `CONFIG` (if set), then `LISTEN`
/// overrides the listen address. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// Initial size of the per-connection read buffer, in bytes
    pub read_buffer_size: usize,
    /// Base URL for the `/httpbin` pass-through route (plain http only)
    pub upstream_url: String,
    pub upstream_timeout_secs: u64,
    /// File served by the `/video` route
    pub video_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:42069".to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER,
            upstream_url: "http://httpbin.org".to_string(),
            upstream_timeout_secs: 10,
            video_path: PathBuf::from("./assets/vim.mp4"),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                Self::from_yaml_str(&raw).with_context(|| format!("invalid config file {path}"))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw)?;
        if cfg.read_buffer_size == 0 {
            anyhow::bail!("read_buffer_size must be at least 1");
        }
        Ok(cfg)
    }
}
