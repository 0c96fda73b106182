//! The enrichment run: discover, fetch and extract each record in order,
//! then flush everything once.

mod lease;
mod pacing;

pub use lease::BackendLease;
pub use pacing::Pacer;

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::dataset::{DatasetError, RecordSink};
use crate::discovery::{Discovery, QueryBuilder, ResultDiscovery};
use crate::models::{ExtractionResult, InputRecord, OutputRecord, SiteType};
use crate::scrapers::{BackendLauncher, HtmlSource, PageFetcher};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to start render backend: {0}")]
    Backend(String),

    #[error("Record {index} panicked: {message}")]
    Panicked { index: usize, message: String },

    #[error("Failed to write results: {0}")]
    Sink(#[from] DatasetError),

    /// The run stopped early. Records processed before the stop were
    /// still flushed (unless the flush itself is the cause).
    #[error("Run aborted after {processed} record(s): {cause}")]
    Aborted {
        processed: usize,
        #[source]
        cause: Box<PipelineError>,
    },
}

/// Per-outcome record counts for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub enriched: usize,
    pub not_found: usize,
    pub fetch_failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.enriched + self.not_found + self.fetch_failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} record(s): {} enriched, {} not found, {} fetch failed",
            self.total(),
            self.enriched,
            self.not_found,
            self.fetch_failed
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub site: SiteType,
    /// Spacing between records.
    pub delay: Duration,
    /// Prefix queries with `site:` for the site type's domain.
    pub restrict_search_to_site: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            site: SiteType::default(),
            delay: Duration::from_millis(3000),
            restrict_search_to_site: false,
        }
    }
}

/// Transient state of one run.
#[derive(Debug, Default)]
struct RunState {
    output: Vec<OutputRecord>,
    summary: RunSummary,
}

impl RunState {
    fn with_capacity(n: usize) -> Self {
        Self {
            output: Vec::with_capacity(n),
            summary: RunSummary::default(),
        }
    }
}

pub struct EnrichmentPipeline {
    discovery: Arc<dyn ResultDiscovery>,
    http: Arc<dyn HtmlSource>,
    launcher: Arc<dyn BackendLauncher>,
    options: PipelineOptions,
}

impl EnrichmentPipeline {
    pub fn new(
        discovery: Arc<dyn ResultDiscovery>,
        http: Arc<dyn HtmlSource>,
        launcher: Arc<dyn BackendLauncher>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            discovery,
            http,
            launcher,
            options,
        }
    }

    /// Process every record and flush the results to `sink`.
    ///
    /// The sink is flushed exactly once and the render backend released
    /// exactly once, whether the run completes or aborts.
    pub async fn run(
        &self,
        records: &[InputRecord],
        sink: &mut dyn RecordSink,
        progress: &ProgressBar,
    ) -> Result<RunSummary, PipelineError> {
        progress.set_length(records.len() as u64);
        let mut state = RunState::with_capacity(records.len());

        info!(
            "Enriching {} record(s) from {} (delay {}ms)",
            records.len(),
            self.options.site,
            self.options.delay.as_millis()
        );

        let needs_backend = self.options.site.needs_browser();
        let mut lease = match BackendLease::acquire(self.launcher.as_ref(), needs_backend).await {
            Ok(lease) => lease,
            Err(e) => {
                let cause = PipelineError::Backend(format!("{:#}", e));
                return self
                    .finalize(&mut BackendLease::empty(), state, sink, Some(cause))
                    .await;
            }
        };

        let outcome = AssertUnwindSafe(self.iterate(records, &lease, &mut state, progress))
            .catch_unwind()
            .await;

        let cause = outcome.err().map(|panic| PipelineError::Panicked {
            index: state.output.len(),
            message: panic_message(panic.as_ref()),
        });

        self.finalize(&mut lease, state, sink, cause).await
    }

    async fn iterate(
        &self,
        records: &[InputRecord],
        lease: &BackendLease,
        state: &mut RunState,
        progress: &ProgressBar,
    ) {
        let fetcher = PageFetcher::new(self.http.as_ref(), lease.backend());
        let mut pacer = Pacer::new(self.options.delay);

        for record in records {
            pacer.ready().await;
            progress.set_message(record.name.clone());

            let output = self.process(record, &fetcher, &mut state.summary).await;
            state.output.push(output);
            progress.inc(1);
        }
    }

    async fn process(
        &self,
        record: &InputRecord,
        fetcher: &PageFetcher<'_>,
        summary: &mut RunSummary,
    ) -> OutputRecord {
        let query = self.query_for(record);

        let extracted = match self.discovery.discover(&query).await {
            Discovery::NotFound => {
                info!("No {} result for '{}'", self.discovery.name(), query);
                summary.not_found += 1;
                ExtractionResult::default()
            }
            Discovery::Found(url) => match fetcher.fetch(&url, self.options.site).await {
                Ok(extracted) => {
                    debug!("Extracted {} from {}", record.name, url);
                    summary.enriched += 1;
                    extracted
                }
                Err(_) => {
                    summary.fetch_failed += 1;
                    ExtractionResult::default()
                }
            },
        };

        OutputRecord::from_parts(record, extracted)
    }

    /// `"{location} {name}"`, optionally restricted to the site's domain.
    pub fn query_for(&self, record: &InputRecord) -> String {
        let mut builder = QueryBuilder::new();
        if self.options.restrict_search_to_site {
            builder = builder.site(self.options.site.domain());
        }
        let builder = builder.term(&record.location).term(&record.name);
        if builder.is_empty() {
            return String::new();
        }
        builder.build()
    }

    async fn finalize(
        &self,
        lease: &mut BackendLease,
        state: RunState,
        sink: &mut dyn RecordSink,
        cause: Option<PipelineError>,
    ) -> Result<RunSummary, PipelineError> {
        lease.release().await;

        let processed = state.output.len();
        let flushed = sink.flush(&state.output);
        match &flushed {
            Ok(()) => info!("Saved {} record(s) to {}", processed, sink.destination()),
            Err(e) => error!("Failed to save results to {}: {}", sink.destination(), e),
        }

        match cause.or_else(|| flushed.err().map(PipelineError::Sink)) {
            None => {
                info!("Run complete: {}", state.summary);
                Ok(state.summary)
            }
            Some(cause) => {
                error!("Run aborted after {} record(s): {}", processed, cause);
                Err(PipelineError::Aborted {
                    processed,
                    cause: Box::new(cause),
                })
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
