use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Command-line arguments for the placard binary.
#[derive(Debug, Parser)]
#[command(name = "placard", version, about = "Fill poster templates from rows and export PNGs")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PLACARD_CONFIG_FILE", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Fill a template once per row and write one PNG per row.
    Run(Box<RunArgs>),
    /// Parse rows and print the resulting records as JSON.
    Rows(RowsArgs),
    /// Run the local HTTP API.
    Serve(ServeArgs),
}

/// Where rows come from. Exactly one of these is used.
#[derive(Debug, Args, Default, Clone)]
pub struct InputArgs {
    /// Delimited file (quote-aware, comma separated).
    #[arg(long = "csv", value_name = "PATH", value_hint = ValueHint::FilePath, conflicts_with_all = ["text", "queries"])]
    pub csv: Option<PathBuf>,

    /// Pasted rows: one row per line, comma separated.
    #[arg(long = "text", value_name = "ROWS", conflicts_with = "queries")]
    pub text: Option<String>,

    /// File with one feed query per line (product name, device or page URL).
    #[arg(long = "queries", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub queries: Option<PathBuf>,

    /// Column bindings, e.g. `name=1,price=2,url=3`.
    #[arg(long = "columns", value_name = "SPEC", conflicts_with = "preset")]
    pub columns: Option<String>,

    /// Named column preset (products, quotes, topics).
    #[arg(long = "preset", value_name = "NAME")]
    pub preset: Option<String>,

    /// Treat the first row as a header naming the fields.
    #[arg(long = "header", action = clap::ArgAction::SetTrue)]
    pub header: bool,

    /// Built-in feed schema used with --queries.
    #[arg(long = "feed", value_name = "SCHEMA", default_value = "product-feed")]
    pub feed: String,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Template JSON exported from the design editor.
    #[arg(value_name = "TEMPLATE", value_hint = ValueHint::FilePath)]
    pub template: PathBuf,

    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub overrides: BatchOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RowsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub network: NetworkOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSON logs.
    #[arg(long = "log-json")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct NetworkOverrides {
    /// Override the per-request network timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// CORS relay prefix the target URL is appended to.
    #[arg(long = "cors-proxy", value_name = "URL")]
    pub cors_proxy: Option<String>,

    /// Image-resize service prefix for record images.
    #[arg(long = "image-proxy", value_name = "URL")]
    pub image_proxy: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BatchOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub network: NetworkOverrides,

    /// Directory PNGs are written to.
    #[arg(long = "out", short = 'o', value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Template page index to render.
    #[arg(long = "page", value_name = "INDEX")]
    pub page: Option<usize>,

    /// Rows rendered at once.
    #[arg(long = "concurrency", value_name = "N")]
    pub concurrency: Option<usize>,

    /// Value for missing fields: `empty` or `na`.
    #[arg(long = "missing", value_name = "POLICY")]
    pub missing: Option<String>,

    /// Output scale factor.
    #[arg(long = "pixel-ratio", value_name = "RATIO")]
    pub pixel_ratio: Option<f32>,

    /// Per-image load timeout.
    #[arg(long = "asset-timeout-ms", value_name = "MILLIS")]
    pub asset_timeout_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub network: NetworkOverrides,

    /// Override the listen address.
    #[arg(long = "listen", value_name = "ADDR")]
    pub listen: Option<String>,
}
