//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    BatchOverrides, CliArgs, Command, InputArgs, LoggingOverrides, NetworkOverrides, RowsArgs,
    RunArgs, ServeArgs, ServeOverrides,
};

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::batch::naming::{DEFAULT_MAX_LEN, NamingScheme};
use crate::batch::BatchOptions;
use crate::fill::RuleSet;
use crate::net::{CorsProxy, ImageProxy, ImageRewrite};
use crate::record::MissingPolicy;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "placard";
const ENV_PREFIX: &str = "PLACARD";
const DEFAULT_LISTEN: &str = "127.0.0.1:8088";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_ASSET_TIMEOUT_MS: u64 = 5000;
const DEFAULT_ASSET_CACHE_ENTRIES: usize = 64;
const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_OUTPUT_DIR: &str = "out";
const DEFAULT_NAME_FIELD: &str = "name";
const DEFAULT_SECONDARY_FIELD: &str = "price";
const MAX_CONCURRENCY: usize = 64;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub network: NetworkSettings,
    pub batch: BatchSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub timeout: Duration,
    pub cors_proxy: Option<CorsProxy>,
    pub image_proxy: Option<ImageProxy>,
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub concurrency: usize,
    pub asset_timeout: Duration,
    /// Decoded images kept per loader.
    pub asset_cache_entries: usize,
    pub missing: MissingPolicy,
    pub page: usize,
    pub pixel_ratio: f32,
    pub output_dir: PathBuf,
    pub name_field: String,
    pub secondary_field: Option<String>,
    pub max_name_len: usize,
    /// Placeholder rules; the built-in set unless configured.
    pub rules: RuleSet,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
}

impl NetworkSettings {
    /// How row image URLs are rewritten: resize proxy first, then relay.
    pub fn image_rewrite(&self) -> ImageRewrite {
        match (&self.image_proxy, &self.cors_proxy) {
            (Some(proxy), _) => ImageRewrite::Resize(proxy.clone()),
            (None, Some(relay)) => ImageRewrite::Cors(relay.clone()),
            (None, None) => ImageRewrite::None,
        }
    }
}

impl BatchSettings {
    pub fn naming(&self) -> NamingScheme {
        NamingScheme {
            primary: self.name_field.clone(),
            secondary: self.secondary_field.clone(),
            max_len: self.max_name_len,
        }
    }

    pub fn options(&self) -> BatchOptions {
        BatchOptions {
            page_index: self.page,
            concurrency: self.concurrency,
            naming: self.naming(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Run(args) => raw.apply_batch_overrides(&args.overrides),
        Command::Rows(args) => raw.apply_network_overrides(&args.network),
        Command::Serve(args) => raw.apply_serve_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

// ============================================================================
// RAW LAYER
// ============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    network: RawNetworkSettings,
    batch: RawBatchSettings,
    server: RawServerSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNetworkSettings {
    timeout_secs: Option<u64>,
    cors_proxy: Option<String>,
    image_proxy: Option<String>,
    image_proxy_trim: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBatchSettings {
    concurrency: Option<usize>,
    asset_timeout_ms: Option<u64>,
    asset_cache_entries: Option<usize>,
    missing: Option<String>,
    page: Option<usize>,
    pixel_ratio: Option<f32>,
    output_dir: Option<PathBuf>,
    name_field: Option<String>,
    secondary_field: Option<String>,
    max_name_len: Option<usize>,
    rules: Option<RuleSet>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    listen: Option<String>,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_network_overrides(&mut self, overrides: &NetworkOverrides) {
        if let Some(secs) = overrides.timeout_secs {
            self.network.timeout_secs = Some(secs);
        }
        if let Some(proxy) = overrides.cors_proxy.as_ref() {
            self.network.cors_proxy = Some(proxy.clone());
        }
        if let Some(proxy) = overrides.image_proxy.as_ref() {
            self.network.image_proxy = Some(proxy.clone());
        }
    }

    fn apply_batch_overrides(&mut self, overrides: &BatchOverrides) {
        self.apply_logging_overrides(&overrides.logging);
        self.apply_network_overrides(&overrides.network);

        if let Some(dir) = overrides.output_dir.as_ref() {
            self.batch.output_dir = Some(dir.clone());
        }
        if let Some(page) = overrides.page {
            self.batch.page = Some(page);
        }
        if let Some(concurrency) = overrides.concurrency {
            self.batch.concurrency = Some(concurrency);
        }
        if let Some(missing) = overrides.missing.as_ref() {
            self.batch.missing = Some(missing.clone());
        }
        if let Some(ratio) = overrides.pixel_ratio {
            self.batch.pixel_ratio = Some(ratio);
        }
        if let Some(ms) = overrides.asset_timeout_ms {
            self.batch.asset_timeout_ms = Some(ms);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_logging_overrides(&overrides.logging);
        self.apply_network_overrides(&overrides.network);

        if let Some(listen) = overrides.listen.as_ref() {
            self.server.listen = Some(listen.clone());
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            network,
            batch,
            server,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            network: build_network_settings(network)?,
            batch: build_batch_settings(batch)?,
            server: build_server_settings(server)?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            network: NetworkSettings {
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                cors_proxy: None,
                image_proxy: None,
            },
            batch: BatchSettings {
                concurrency: DEFAULT_CONCURRENCY,
                asset_timeout: Duration::from_millis(DEFAULT_ASSET_TIMEOUT_MS),
                asset_cache_entries: DEFAULT_ASSET_CACHE_ENTRIES,
                missing: MissingPolicy::default(),
                page: 0,
                pixel_ratio: 1.0,
                output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
                name_field: DEFAULT_NAME_FIELD.into(),
                secondary_field: Some(DEFAULT_SECONDARY_FIELD.into()),
                max_name_len: DEFAULT_MAX_LEN,
                rules: RuleSet::default(),
            },
            server: ServerSettings {
                listen: SocketAddr::from(([127, 0, 0, 1], 8088)),
            },
        }
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn build_network_settings(network: RawNetworkSettings) -> Result<NetworkSettings, LoadError> {
    let timeout_secs = network.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid("network.timeout_secs", "must be greater than zero"));
    }

    let check_url = |key: &'static str, value: &str| {
        url::Url::parse(value)
            .map(|_| ())
            .map_err(|err| LoadError::invalid(key, format!("invalid URL `{value}`: {err}")))
    };

    let cors_proxy = match non_empty(network.cors_proxy) {
        Some(base) => {
            check_url("network.cors_proxy", &base)?;
            Some(CorsProxy::new(base))
        }
        None => None,
    };

    let image_proxy = match non_empty(network.image_proxy) {
        Some(base) => {
            check_url("network.image_proxy", &base)?;
            let proxy = ImageProxy::new(base);
            Some(match network.image_proxy_trim {
                Some(trim) => proxy.with_trim(trim),
                None => proxy,
            })
        }
        None => None,
    };

    Ok(NetworkSettings {
        timeout: Duration::from_secs(timeout_secs),
        cors_proxy,
        image_proxy,
    })
}

fn build_batch_settings(batch: RawBatchSettings) -> Result<BatchSettings, LoadError> {
    let concurrency = batch.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(LoadError::invalid(
            "batch.concurrency",
            format!("must be between 1 and {MAX_CONCURRENCY}"),
        ));
    }

    let asset_timeout_ms = batch.asset_timeout_ms.unwrap_or(DEFAULT_ASSET_TIMEOUT_MS);
    if asset_timeout_ms == 0 {
        return Err(LoadError::invalid("batch.asset_timeout_ms", "must be greater than zero"));
    }

    let asset_cache_entries = batch.asset_cache_entries.unwrap_or(DEFAULT_ASSET_CACHE_ENTRIES);
    if asset_cache_entries == 0 {
        return Err(LoadError::invalid("batch.asset_cache_entries", "must be greater than zero"));
    }

    let missing = match batch.missing {
        Some(value) => MissingPolicy::parse(&value).ok_or_else(|| {
            LoadError::invalid("batch.missing", format!("unknown policy `{value}` (use empty or na)"))
        })?,
        None => MissingPolicy::default(),
    };

    let pixel_ratio = batch.pixel_ratio.unwrap_or(1.0);
    if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 || pixel_ratio > 8.0 {
        return Err(LoadError::invalid("batch.pixel_ratio", "must be in (0, 8]"));
    }

    let max_name_len = batch.max_name_len.unwrap_or(DEFAULT_MAX_LEN);
    if max_name_len == 0 {
        return Err(LoadError::invalid("batch.max_name_len", "must be greater than zero"));
    }

    let rules = batch.rules.unwrap_or_default();
    if rules.rules().is_empty() {
        return Err(LoadError::invalid("batch.rules", "must contain at least one rule"));
    }

    Ok(BatchSettings {
        concurrency,
        asset_timeout: Duration::from_millis(asset_timeout_ms),
        asset_cache_entries,
        missing,
        page: batch.page.unwrap_or(0),
        pixel_ratio,
        output_dir: batch
            .output_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        name_field: non_empty(batch.name_field).unwrap_or_else(|| DEFAULT_NAME_FIELD.into()),
        secondary_field: match batch.secondary_field {
            // An explicit empty value turns the secondary part off.
            Some(value) => non_empty(Some(value)),
            None => Some(DEFAULT_SECONDARY_FIELD.into()),
        },
        max_name_len,
        rules,
    })
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let listen = non_empty(server.listen).unwrap_or_else(|| DEFAULT_LISTEN.into());
    let listen = listen
        .parse::<SocketAddr>()
        .map_err(|err| LoadError::invalid("server.listen", format!("`{listen}`: {err}")))?;
    Ok(ServerSettings { listen })
}

#[cfg(test)]
mod tests;
