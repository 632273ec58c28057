//! End-to-end batch runs against stub network and rasterizer.
//!
//! The stub rasterizer writes a plain-text listing of the filled page instead
//! of pixels, so assertions can read exactly what each row received.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use placard::{
    PlacardError,
    batch::{
        Artifact, ArtifactSink, BatchContext, BatchEvent, BatchOptions, BatchState, DirectorySink,
        MemorySink, RowOutcome, RowSource,
    },
    net::{Fetcher, ImageRewrite},
    record::{Record, RecordProvider, RowInput},
    render::{AssetLoader, PageAssets, Rasterizer},
    template::{Element, Page, Template},
};

// ============================================================================
// STUBS
// ============================================================================

struct Offline;

#[async_trait]
impl Fetcher for Offline {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PlacardError> {
        Err(PlacardError::Fetch(format!("offline: {}", url)))
    }
}

/// Lists visible elements, one per line: `text:<content>` or `image:<src>`.
struct ListingRasterizer {
    calls: AtomicUsize,
}

impl ListingRasterizer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Rasterizer for ListingRasterizer {
    async fn rasterize(&self, page: &Page, _assets: &PageAssets) -> Result<Vec<u8>, PlacardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lines: Vec<String> = page
            .children
            .iter()
            .filter(|el| el.visible)
            .map(|el| match (el.as_text(), el.as_image()) {
                (Some(text), _) => format!("text:{}", text.text),
                (_, Some(image)) => format!("image:{}", image.src),
                _ => String::new(),
            })
            .collect();
        Ok(lines.join("\n").into_bytes())
    }
}

/// Rows take longer the earlier they are, so a concurrent run finishes them
/// out of order.
struct StaggeredRasterizer;

#[async_trait]
impl Rasterizer for StaggeredRasterizer {
    async fn rasterize(&self, page: &Page, _assets: &PageAssets) -> Result<Vec<u8>, PlacardError> {
        let text = page.text_content().join("");
        let delay = match text.as_str() {
            "A" => 60,
            "B" => 30,
            _ => 0,
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(text.into_bytes())
    }
}

/// Feed stub: the query becomes the product name; `broken` fails.
struct StubFeed;

#[async_trait]
impl RecordProvider for StubFeed {
    async fn fetch_record(&self, query: &str) -> Result<Record, PlacardError> {
        if query == "broken" {
            return Err(PlacardError::Fetch("HTTP 404 for broken".into()));
        }
        Ok(Record::new().with("name", query).with("price", "1"))
    }
}

/// Cancels the run once the first artifact arrives.
struct CancelAfterFirst {
    inner: MemorySink,
    cancel: CancellationToken,
}

#[async_trait]
impl ArtifactSink for CancelAfterFirst {
    async fn emit(&self, artifact: Artifact) -> Result<(), PlacardError> {
        self.inner.emit(artifact).await?;
        self.cancel.cancel();
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn product_template() -> Template {
    let mut page = Page::new(400.0, 400.0);
    page.push(Element::text("{product_name}").at(10.0, 10.0).sized(300.0, 40.0));
    page.push(Element::text("Only {{price}} today").at(10.0, 60.0).sized(300.0, 40.0));
    page.push(
        Element::image("placeholder.png")
            .named("product_image_placeholder")
            .at(10.0, 120.0)
            .sized(200.0, 200.0),
    );
    page.push(Element::image("logo.png").named("logo").sized(40.0, 40.0));

    let mut template = Template::new("product", 400.0, 400.0);
    template.push_page(page);
    template
}

fn text_template() -> Template {
    let mut page = Page::new(100.0, 100.0);
    page.push(Element::text("{{name}}"));
    let mut template = Template::new("names", 100.0, 100.0);
    template.push_page(page);
    template
}

fn assets() -> Arc<AssetLoader> {
    Arc::new(AssetLoader::new(Arc::new(Offline), Duration::from_millis(200)))
}

fn pasted(text: &str, columns: &str) -> RowSource {
    let records = RowInput::pasted(text)
        .with_columns(columns)
        .records(ImageRewrite::None)
        .unwrap();
    RowSource::Records(records)
}

fn context(template: Template, sink: Arc<dyn ArtifactSink>) -> BatchContext {
    BatchContext::new(
        Arc::new(template),
        assets(),
        Arc::new(ListingRasterizer::new()),
        sink,
    )
}

async fn listing(sink: &MemorySink) -> Vec<String> {
    sink.artifacts()
        .await
        .into_iter()
        .map(|a| String::from_utf8(a.bytes).unwrap())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_single_product_row() {
    let sink = Arc::new(MemorySink::new());
    let summary = context(product_template(), sink.clone())
        .run(pasted(
            "Widget,10,https://img.example/w.png",
            "name=1,price=2,url=3",
        ))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.artifacts, vec!["Widget-10-1.png"]);
    assert_eq!(
        listing(&sink).await,
        vec![
            "text:Widget\ntext:Only 10 today\nimage:https://img.example/w.png\nimage:logo.png"
        ]
    );
}

#[tokio::test]
async fn test_row_without_image_hides_slot() {
    let sink = Arc::new(MemorySink::new());
    let summary = context(product_template(), sink.clone())
        .run(pasted(
            "Widget,10,https://img.example/w.png\nGadget,5\nDoohickey,7,https://img.example/d.png",
            "name=1,price=2,url=3",
        ))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(
        summary.artifacts,
        vec!["Widget-10-1.png", "Gadget-5-2.png", "Doohickey-7-3.png"]
    );

    let pages = listing(&sink).await;
    assert_eq!(pages[1], "text:Gadget\ntext:Only 5 today\nimage:logo.png");
}

#[tokio::test]
async fn test_template_is_not_mutated() {
    let template = product_template();
    let ctx = context(template.clone(), Arc::new(MemorySink::new()));
    ctx.run(pasted("Widget,10,https://img.example/w.png", "name=1,price=2,url=3"))
        .await
        .unwrap();

    assert_eq!(ctx.template(), &template);
}

#[tokio::test]
async fn test_missing_field_uses_policy() {
    let sink = Arc::new(MemorySink::new());
    let filler = placard::fill::Filler::new(
        placard::fill::RuleSet::default(),
        placard::record::MissingPolicy::NotAvailable,
    );
    context(product_template(), sink.clone())
        .with_filler(Arc::new(filler))
        .run(pasted("Widget", "name=1"))
        .await
        .unwrap();

    let pages = listing(&sink).await;
    assert!(pages[0].contains("text:Only N/A today"), "{}", pages[0]);
}

#[tokio::test]
async fn test_concurrent_run_keeps_input_order() {
    let sink = Arc::new(MemorySink::new());
    let summary = BatchContext::new(
        Arc::new(text_template()),
        assets(),
        Arc::new(StaggeredRasterizer),
        sink.clone(),
    )
    .with_options(BatchOptions {
        concurrency: 3,
        ..Default::default()
    })
    .run(pasted("A\nB\nC", "name=1"))
    .await
    .unwrap();

    assert_eq!(summary.artifacts, vec!["A-1.png", "B-2.png", "C-3.png"]);
    assert_eq!(listing(&sink).await, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_identical_rows_get_distinct_files() {
    let tmp = tempfile::tempdir().unwrap();
    let sink = Arc::new(DirectorySink::new(tmp.path().join("out")));
    let summary = context(text_template(), sink)
        .run(pasted("Same\nSame", "name=1"))
        .await
        .unwrap();

    assert_eq!(summary.artifacts, vec!["Same-1.png", "Same-2.png"]);
    assert!(tmp.path().join("out/Same-1.png").exists());
    assert!(tmp.path().join("out/Same-2.png").exists());
}

#[tokio::test]
async fn test_cancel_before_start() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = Arc::new(MemorySink::new());
    let summary = context(text_template(), sink.clone())
        .with_cancel(cancel)
        .run(pasted("A\nB", "name=1"))
        .await
        .unwrap();

    assert_eq!(summary.cancelled, 2);
    assert_eq!(summary.succeeded, 0);
    assert!(sink.artifacts().await.is_empty());
}

#[tokio::test]
async fn test_cancel_mid_run() {
    let cancel = CancellationToken::new();
    let sink = Arc::new(CancelAfterFirst {
        inner: MemorySink::new(),
        cancel: cancel.clone(),
    });
    let summary = context(text_template(), sink.clone())
        .with_cancel(cancel)
        .run(pasted("A\nB\nC", "name=1"))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.cancelled, 2);
    assert_eq!(sink.inner.file_names().await, vec!["A-1.png"]);
}

#[tokio::test]
async fn test_empty_source_is_rejected() {
    let result = context(text_template(), Arc::new(MemorySink::new()))
        .run(RowSource::Records(Vec::new()))
        .await;
    assert!(matches!(result, Err(PlacardError::Input(_))));
}

#[tokio::test]
async fn test_bad_page_index_is_rejected() {
    let rasterizer = Arc::new(ListingRasterizer::new());
    let result = BatchContext::new(
        Arc::new(text_template()),
        assets(),
        rasterizer.clone(),
        Arc::new(MemorySink::new()),
    )
    .with_options(BatchOptions {
        page_index: 4,
        ..Default::default()
    })
    .run(pasted("A", "name=1"))
    .await;

    assert!(matches!(result, Err(PlacardError::Template(_))));
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_feed_row_does_not_stop_batch() {
    let sink = Arc::new(MemorySink::new());
    let source = RowSource::Queries {
        provider: Arc::new(StubFeed),
        queries: vec!["Phone".into(), "broken".into(), "Tablet".into()],
    };
    let summary = context(text_template(), sink.clone())
        .run(source)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors[0].row, 2);
    assert!(summary.errors[0].error.contains("404"));
    assert_eq!(sink.file_names().await, vec!["Phone-1-1.png", "Tablet-1-3.png"]);
}

#[tokio::test]
async fn test_event_sequence() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let summary = context(text_template(), Arc::new(MemorySink::new()))
        .with_events(tx)
        .run(pasted("Solo", "name=1"))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![
            BatchEvent::StateChanged(BatchState::Validating),
            BatchEvent::StateChanged(BatchState::Running { row: 0, total: 1 }),
            BatchEvent::RowStarted { row: 1, total: 1 },
            BatchEvent::RowFinished(RowOutcome::Succeeded {
                row: 1,
                file_name: "Solo-1.png".into(),
            }),
            BatchEvent::StateChanged(BatchState::Running { row: 1, total: 1 }),
            BatchEvent::StateChanged(BatchState::Finalizing),
            BatchEvent::StateChanged(BatchState::Done(summary)),
        ]
    );
}

#[tokio::test]
async fn test_rejected_batch_ends_with_failed_state() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = context(text_template(), Arc::new(MemorySink::new()))
        .with_events(tx)
        .run(RowSource::Records(Vec::new()))
        .await;
    assert!(matches!(result, Err(PlacardError::Input(_))));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![
            BatchEvent::StateChanged(BatchState::Validating),
            BatchEvent::StateChanged(BatchState::Failed {
                error: "Input error: no rows to process".into(),
            }),
        ]
    );
    let BatchEvent::StateChanged(last) = events.last().unwrap() else {
        panic!("last event is not a state change");
    };
    assert!(last.is_terminal());
}
