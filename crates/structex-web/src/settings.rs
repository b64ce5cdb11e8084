use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use structex_core::config_file::ConfigFile;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_UPLOAD_MB: u32 = 50;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Process-level settings for the HTTP server and its logging.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub max_upload_bytes: usize,
    /// `0` reads every page.
    pub max_pages: usize,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl ServerSettings {
    /// Resolve settings from the config file; `bind_override` (from
    /// `STRUCTEX_BIND`) wins over `[server].bind`.
    pub fn from_file(file: &ConfigFile, bind_override: Option<String>) -> anyhow::Result<Self> {
        let server = file.server.clone().unwrap_or_default();
        let logging = file.logging.clone().unwrap_or_default();

        let bind_str = bind_override
            .filter(|b| !b.is_empty())
            .or(server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .with_context(|| format!("invalid bind address '{bind_str}'"))?;

        let max_upload_mb = server.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        Ok(Self {
            bind,
            max_upload_bytes: max_upload_mb as usize * 1024 * 1024,
            max_pages: file.pdf.as_ref().and_then(|p| p.max_pages).unwrap_or(0),
            log_level: logging
                .level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_dir: logging.log_dir.filter(|d| !d.is_empty()).map(PathBuf::from),
        })
    }
}
