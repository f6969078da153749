use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Buzzit binary.
#[derive(Debug, Parser)]
#[command(
    name = "buzzit",
    version,
    about = "Cross-community popular post feed and edge server"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "BUZZIT_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the feed API and edge server.
    Serve(Box<ServeArgs>),
    /// Print one composed feed page as JSON.
    Feed(FeedArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct UpstreamOverrides {
    /// Override the URL of the scraped post document.
    #[arg(long = "posts-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub posts_url: Option<String>,

    /// Override the upstream request timeout.
    #[arg(long = "upstream-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override how long a fetched post document stays fresh.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Serve the SPA bundle from this HTTP origin instead of a directory.
    #[arg(long = "edge-origin-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub edge_origin_url: Option<String>,

    /// Serve the SPA bundle from this directory.
    #[arg(long = "edge-static-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub edge_static_dir: Option<PathBuf>,

    /// Override the public site URL used for canonical links.
    #[arg(long = "site-public-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub site_public_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct FeedArgs {
    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    /// Site code to show, or `all`.
    #[arg(long, default_value = "all")]
    pub site: String,

    /// Ordering: latest, popular, likes or comments.
    #[arg(long, default_value = "latest")]
    pub sort: String,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    pub page: usize,
}
