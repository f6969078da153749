//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::DEFAULT_TTL;

mod cli;

pub use cli::{CliArgs, Command, FeedArgs, ServeArgs, ServeOverrides, UpstreamOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "buzzit";
const ENV_PREFIX: &str = "BUZZIT";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STATIC_DIR: &str = "dist";
const DEFAULT_BRAND: &str = "Buzzit";
const DEFAULT_PUBLIC_URL: &str = "https://buzzit.kr";
const DEFAULT_DESCRIPTION: &str =
    "여러 커뮤니티의 인기 게시글을 한곳에서 모아 보는 실시간 인기글 모음 서비스";
const DEFAULT_IMAGE: &str = "/og-image.png";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub upstream: UpstreamSettings,
    pub edge: EdgeSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub posts_url: Url,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Remote(Url),
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct EdgeSettings {
    pub source: AssetSource,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub brand: String,
    /// Absolute site root without a trailing slash.
    pub public_url: String,
    pub description: String,
    /// Absolute URL of the fallback preview image.
    pub default_image: String,
}

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

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Feed(args)) => raw.apply_upstream_overrides(&args.upstream),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    upstream: RawUpstreamSettings,
    edge: RawEdgeSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.edge_origin_url.as_ref() {
            self.edge.origin_url = Some(url.clone());
        }
        if let Some(dir) = overrides.edge_static_dir.as_ref() {
            self.edge.static_dir = Some(dir.clone());
        }
        if let Some(url) = overrides.site_public_url.as_ref() {
            self.site.public_url = Some(url.clone());
        }

        self.apply_upstream_overrides(&overrides.upstream);
    }

    fn apply_upstream_overrides(&mut self, overrides: &UpstreamOverrides) {
        if let Some(url) = overrides.posts_url.as_ref() {
            self.upstream.posts_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.upstream.timeout_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.cache_ttl_seconds {
            self.upstream.cache_ttl_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            upstream,
            edge,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            upstream: build_upstream_settings(upstream)?,
            edge: build_edge_settings(edge)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
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

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let posts_url = upstream
        .posts_url
        .and_then(non_blank)
        .ok_or_else(|| LoadError::invalid("upstream.posts_url", "must be set"))?;
    let posts_url = parse_http_url(&posts_url, "upstream.posts_url")?;

    let timeout_secs = upstream
        .timeout_seconds
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "upstream.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let cache_ttl = upstream
        .cache_ttl_seconds
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TTL);

    Ok(UpstreamSettings {
        posts_url,
        timeout: Duration::from_secs(timeout_secs),
        cache_ttl,
    })
}

fn build_edge_settings(edge: RawEdgeSettings) -> Result<EdgeSettings, LoadError> {
    if let Some(origin) = edge.origin_url.and_then(non_blank) {
        let url = parse_http_url(&origin, "edge.origin_url")?;
        return Ok(EdgeSettings {
            source: AssetSource::Remote(url),
        });
    }

    let directory = edge
        .static_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "edge.static_dir",
            "path must not be empty",
        ));
    }

    Ok(EdgeSettings {
        source: AssetSource::Directory(directory),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let brand = site
        .brand
        .and_then(non_blank)
        .unwrap_or_else(|| DEFAULT_BRAND.to_string());

    let public_url = site
        .public_url
        .and_then(non_blank)
        .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
    let parsed = parse_http_url(&public_url, "site.public_url")?;
    let public_url = parsed.as_str().trim_end_matches('/').to_string();

    let description = site
        .description
        .and_then(non_blank)
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let image = site
        .default_image
        .and_then(non_blank)
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
    let default_image = parsed
        .join(&image)
        .map_err(|err| LoadError::invalid("site.default_image", err.to_string()))?
        .to_string();

    Ok(SiteSettings {
        brand,
        public_url,
        description,
        default_image,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    posts_url: Option<String>,
    timeout_seconds: Option<u64>,
    cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEdgeSettings {
    origin_url: Option<String>,
    static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    brand: Option<String>,
    public_url: Option<String>,
    description: Option<String>,
    default_image: Option<String>,
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_http_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value).map_err(|err| LoadError::invalid(key, err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`; expected http or https"),
        )),
    }
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
