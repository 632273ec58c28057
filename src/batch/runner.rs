//! The batch runner.
//!
//! Everything a run needs travels in a [`BatchContext`]; progress goes out
//! over an optional event channel. Rows are rendered through an
//! order-preserving buffered stream, so with `concurrency > 1` several rows
//! are in flight while artifacts, events and the summary stay in input order.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::naming::NamingScheme;
use super::sink::{Artifact, ArtifactSink};
use super::state::{BatchEvent, BatchState, BatchSummary, RowOutcome};
use crate::PlacardError;
use crate::fill::Filler;
use crate::record::{Record, RecordProvider};
use crate::render::{AssetLoader, Rasterizer};
use crate::template::Template;

/// Where rows come from.
pub enum RowSource {
    /// Records already parsed from pasted text or a file.
    Records(Vec<Record>),
    /// One feed query per row, fetched when the row runs.
    Queries {
        provider: Arc<dyn RecordProvider>,
        queries: Vec<String>,
    },
}

impl RowSource {
    pub fn len(&self) -> usize {
        match self {
            RowSource::Records(records) => records.len(),
            RowSource::Queries { queries, .. } => queries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn record(&self, index: usize) -> Result<Record, PlacardError> {
        match self {
            RowSource::Records(records) => records
                .get(index)
                .cloned()
                .ok_or_else(|| PlacardError::Input(format!("row {} out of range", index + 1))),
            RowSource::Queries { provider, queries } => {
                let query = queries
                    .get(index)
                    .ok_or_else(|| PlacardError::Input(format!("row {} out of range", index + 1)))?;
                provider.fetch_record(query).await
            }
        }
    }
}

/// Per-job knobs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Template page every row is rendered from.
    pub page_index: usize,
    /// Rows in flight at once; 1 is strictly sequential.
    pub concurrency: usize,
    pub naming: NamingScheme,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            page_index: 0,
            concurrency: 1,
            naming: NamingScheme::default(),
        }
    }
}

/// Everything one batch run needs. The template is only ever read.
pub struct BatchContext {
    template: Arc<Template>,
    filler: Arc<Filler>,
    assets: Arc<AssetLoader>,
    rasterizer: Arc<dyn Rasterizer>,
    sink: Arc<dyn ArtifactSink>,
    options: BatchOptions,
    cancel: CancellationToken,
    events: Option<UnboundedSender<BatchEvent>>,
}

impl BatchContext {
    pub fn new(
        template: Arc<Template>,
        assets: Arc<AssetLoader>,
        rasterizer: Arc<dyn Rasterizer>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            template,
            filler: Arc::new(Filler::default()),
            assets,
            rasterizer,
            sink,
            options: BatchOptions::default(),
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    pub fn with_filler(mut self, filler: Arc<Filler>) -> Self {
        self.filler = filler;
        self
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Token that stops the run when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is listening.
            let _ = tx.send(event);
        }
    }

    fn set_state(&self, state: BatchState) {
        self.emit(BatchEvent::StateChanged(state));
    }

    /// Run every row of `source`.
    ///
    /// Fails only when validation fails, after emitting
    /// [`BatchState::Failed`]; per-row errors are counted in the summary and
    /// the run carries on.
    pub async fn run(&self, source: RowSource) -> Result<BatchSummary, PlacardError> {
        self.set_state(BatchState::Validating);
        if let Err(e) = self.validate(&source) {
            tracing::warn!(template = %self.template.name, error = %e, "batch rejected");
            self.set_state(BatchState::Failed {
                error: e.to_string(),
            });
            return Err(e);
        }

        let total = source.len();
        tracing::info!(
            template = %self.template.name,
            rows = total,
            concurrency = self.options.concurrency,
            "batch started"
        );
        self.set_state(BatchState::Running { row: 0, total });

        let mut summary = BatchSummary::new(total);
        let mut rows = stream::iter(0..total)
            .map(|index| self.run_row(&source, index, total))
            .buffered(self.options.concurrency.max(1));

        while let Some((row, result)) = rows.next().await {
            let outcome = match result {
                Ok(artifact) => self.deliver(artifact).await,
                Err(PlacardError::Cancelled) => RowOutcome::Cancelled { row },
                Err(e) => RowOutcome::Failed {
                    row,
                    error: e.to_string(),
                },
            };

            match &outcome {
                RowOutcome::Succeeded { file_name, .. } => {
                    tracing::info!(row, total, file = %file_name, "row exported")
                }
                RowOutcome::Failed { error, .. } => {
                    tracing::warn!(row, total, error = %error, "row failed")
                }
                RowOutcome::Cancelled { .. } => tracing::debug!(row, "row cancelled"),
            }

            summary.record(&outcome);
            self.emit(BatchEvent::RowFinished(outcome));
            self.set_state(BatchState::Running { row, total });
        }

        self.set_state(BatchState::Finalizing);
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            total,
            "batch finished"
        );
        self.set_state(BatchState::Done(summary.clone()));
        Ok(summary)
    }

    fn validate(&self, source: &RowSource) -> Result<(), PlacardError> {
        if source.is_empty() {
            return Err(PlacardError::Input("no rows to process".into()));
        }
        self.template.validate_page(self.options.page_index).map(|_| ())
    }

    /// Row work raced against cancellation. Returns the 1-based row.
    async fn run_row(
        &self,
        source: &RowSource,
        index: usize,
        total: usize,
    ) -> (usize, Result<Artifact, PlacardError>) {
        let row = index + 1;
        if self.cancel.is_cancelled() {
            return (row, Err(PlacardError::Cancelled));
        }
        self.emit(BatchEvent::RowStarted { row, total });

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(PlacardError::Cancelled),
            result = self.render_row(source, index) => result,
        };
        (row, result)
    }

    async fn render_row(&self, source: &RowSource, index: usize) -> Result<Artifact, PlacardError> {
        let row = index + 1;
        let record = source.record(index).await?;

        let mut instance = self.template.instantiate_page(self.options.page_index)?;
        let report = self.filler.fill_page(&mut instance, &record);
        tracing::debug!(row, updated = report.updated, hidden = report.hidden, "placeholders applied");

        let assets = self.assets.prepare(&instance.page).await;
        if assets.failures() > 0 {
            tracing::warn!(row, failures = assets.failures(), "rendering with missing assets");
        }

        let bytes = self.rasterizer.rasterize(&instance.page, &assets).await?;
        Ok(Artifact {
            row,
            file_name: self.options.naming.file_name(&record, row),
            bytes,
        })
    }

    async fn deliver(&self, artifact: Artifact) -> RowOutcome {
        let row = artifact.row;
        let file_name = artifact.file_name.clone();
        match self.sink.emit(artifact).await {
            Ok(()) => RowOutcome::Succeeded { row, file_name },
            Err(e) => RowOutcome::Failed {
                row,
                error: e.to_string(),
            },
        }
    }
}
