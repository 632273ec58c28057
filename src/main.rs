//! # Placard CLI
//!
//! Fill a poster template once per data row and export PNGs.
//!
//! ## Usage
//!
//! ```bash
//! # Pasted rows bound by column
//! placard run poster.json --text "Widget,10,https://img/w.png" --columns name=1,price=2,url=3
//!
//! # A delimited file with a header row, four rows at a time
//! placard run poster.json --csv products.csv --header --concurrency 4 -o out/
//!
//! # Look up each query in a product feed
//! placard run poster.json --queries phones.txt --feed product-feed
//!
//! # Check how rows will be parsed
//! placard rows --text "Widget,10" --columns name=1,price=2
//!
//! # Local HTTP API for the editor
//! placard serve --listen 127.0.0.1:8088
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use placard::{
    PlacardError,
    batch::{BatchContext, BatchSummary, DirectorySink, RowSource},
    config::{self, Command, InputArgs, RowsArgs, RunArgs, Settings},
    fill::Filler,
    net::{Fetcher, HttpFetcher},
    record::{FeedClient, RecordProvider, RowInput, feed},
    render::{AssetLoader, CanvasRasterizer},
    server::{self, AppState},
    telemetry,
    template::Template,
};

#[tokio::main]
async fn main() {
    let (args, settings) = match config::load_with_cli() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = telemetry::init(&settings.logging) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let result = match args.command {
        Command::Run(run_args) => run_batch(*run_args, settings).await,
        Command::Rows(rows_args) => print_rows(rows_args, settings).await,
        Command::Serve(_) => serve(settings).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Token cancelled on the first ctrl-c.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    token
}

async fn row_source(
    input: &InputArgs,
    settings: &Settings,
    fetcher: Arc<dyn Fetcher>,
) -> Result<RowSource, PlacardError> {
    if let Some(path) = &input.queries {
        let text = tokio::fs::read_to_string(path).await?;
        let schemas = feed::builtin_schemas();
        let schema = feed::find_schema(&schemas, &input.feed)
            .cloned()
            .ok_or_else(|| {
                PlacardError::Input(format!("unknown feed schema '{}'", input.feed))
            })?;
        let queries = schema.query.split(&text);
        let client = FeedClient::new(schema, fetcher)
            .with_relay(settings.network.cors_proxy.clone())
            .with_image_proxy(settings.network.image_proxy.clone());
        return Ok(RowSource::Queries {
            provider: Arc::new(client),
            queries,
        });
    }

    let csv = match &input.csv {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };
    let rows = RowInput {
        text: input.text.clone(),
        csv,
        columns: input.columns.clone(),
        preset: input.preset.clone(),
        header: input.header,
    };
    Ok(RowSource::Records(
        rows.records(settings.network.image_rewrite())?,
    ))
}

async fn run_batch(args: RunArgs, settings: Settings) -> Result<(), PlacardError> {
    let template = Template::load(&args.template).await?;
    // Sample artwork may sit next to the template file.
    let template_dir = match args.template.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let fetcher: Arc<dyn Fetcher> = Arc::new(
        HttpFetcher::new(settings.network.timeout)?.with_local_root(template_dir),
    );
    let source = row_source(&args.input, &settings, fetcher.clone()).await?;

    let batch = &settings.batch;
    tracing::info!(
        template = %args.template.display(),
        rows = source.len(),
        out = %batch.output_dir.display(),
        "starting batch"
    );

    let context = BatchContext::new(
        Arc::new(template),
        Arc::new(AssetLoader::with_cache_capacity(
            fetcher,
            batch.asset_timeout,
            batch.asset_cache_entries,
        )),
        Arc::new(CanvasRasterizer::new(batch.pixel_ratio)),
        Arc::new(DirectorySink::new(batch.output_dir.clone())),
    )
    .with_filler(Arc::new(Filler::new(batch.rules.clone(), batch.missing)))
    .with_options(batch.options())
    .with_cancel(ctrl_c_token());

    let summary = context.run(source).await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!(
        "{} of {} rows exported ({} failed, {} cancelled)",
        summary.succeeded, summary.total, summary.failed, summary.cancelled
    );
    for failure in &summary.errors {
        println!("  row {}: {}", failure.row, failure.error);
    }
}

async fn print_rows(args: RowsArgs, settings: Settings) -> Result<(), PlacardError> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(settings.network.timeout)?);
    let records = match row_source(&args.input, &settings, fetcher).await? {
        RowSource::Records(records) => records,
        RowSource::Queries { provider, queries } => {
            let mut records = Vec::with_capacity(queries.len());
            for query in &queries {
                records.push(provider.fetch_record(query).await?);
            }
            records
        }
    };

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn serve(settings: Settings) -> Result<(), PlacardError> {
    let state = AppState::new(settings)?;
    server::serve(state, ctrl_c_token()).await
}
