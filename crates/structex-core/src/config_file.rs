use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::StructuredOutputMethod;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub llm: Option<LlmConfig>,
    pub pdf: Option<PdfConfig>,
    pub server: Option<ServerConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub structured_output: Option<StructuredOutputMethod>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfConfig {
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub max_upload_mb: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub log_dir: Option<String>,
}

/// Platform config directory path: `<config_dir>/structex/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("structex").join("config.toml"))
}

/// Load config by cascading CWD `.structex.toml` over platform config.
/// CWD values override platform values. Missing files are skipped.
pub fn load_config() -> Result<ConfigFile, ConfigError> {
    let platform = match config_path() {
        Some(p) => load_from_path(&p)?,
        None => None,
    };
    let cwd = load_from_path(Path::new(".structex.toml"))?;

    Ok(match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    })
}

/// Load a config from a specific path. Returns `Ok(None)` if the file
/// doesn't exist.
pub fn load_from_path(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn pick<S, T>(overlay: Option<&S>, base: Option<&S>, get: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay.and_then(&get).or_else(|| base.and_then(&get))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bl, ol) = (base.llm.as_ref(), overlay.llm.as_ref());
    let (bp, op) = (base.pdf.as_ref(), overlay.pdf.as_ref());
    let (bs, os) = (base.server.as_ref(), overlay.server.as_ref());
    let (bg, og) = (base.logging.as_ref(), overlay.logging.as_ref());

    ConfigFile {
        llm: Some(LlmConfig {
            api_base: pick(ol, bl, |l| l.api_base.clone()),
            api_key: pick(ol, bl, |l| l.api_key.clone()),
            model: pick(ol, bl, |l| l.model.clone()),
            temperature: pick(ol, bl, |l| l.temperature),
            timeout_secs: pick(ol, bl, |l| l.timeout_secs),
            structured_output: pick(ol, bl, |l| l.structured_output),
        }),
        pdf: Some(PdfConfig {
            max_pages: pick(op, bp, |p| p.max_pages),
        }),
        server: Some(ServerConfig {
            bind: pick(os, bs, |s| s.bind.clone()),
            max_upload_mb: pick(os, bs, |s| s.max_upload_mb),
        }),
        logging: Some(LoggingConfig {
            level: pick(og, bg, |g| g.level.clone()),
            log_dir: pick(og, bg, |g| g.log_dir.clone()),
        }),
    }
}
