use crate::dispatch::context::{CancellationToken, DispatchContext};
use crate::dispatch::reader::{FileReader, MessageSink};
use crate::error::{AdapterError, Result};
use crate::scan::{Candidate, MatchPipeline, MatchRequest};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Outcome of one dispatch cycle.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Candidates pulled from the pipeline
    pub pulled: usize,
    /// Messages accepted by the sink
    pub delivered: usize,
    /// Candidates never attempted because the cycle was stopped or suspended
    pub skipped: usize,
    pub failures: Vec<(PathBuf, AdapterError)>,
}

impl DispatchReport {
    fn new(pulled: usize) -> Self {
        Self {
            pulled,
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.failures.extend(other.failures);
    }

    fn finish(mut self) -> Self {
        self.skipped = self
            .pulled
            .saturating_sub(self.delivered + self.failures.len());
        self
    }

    /// Collapse per-file failures into a single error.
    pub fn into_result(self) -> Result<usize> {
        let failed = self.failures.len();
        match self.failures.into_iter().next() {
            None => Ok(self.delivered),
            Some((_, first)) => Err(AdapterError::Batch {
                failed,
                total: self.pulled,
                first: Box::new(first),
            }),
        }
    }
}

/// Pulls batches from a match pipeline and hands each file to a sink.
///
/// With `max_threads == 1` the batch is delivered in order on one blocking
/// task; otherwise up to `max_threads` blocking workers drain a shared queue.
pub struct DispatchEngine {
    pipeline: MatchPipeline,
    reader: Arc<FileReader>,
    context: Arc<DispatchContext>,
    max_threads: usize,
}

impl DispatchEngine {
    pub fn new(request: MatchRequest, reader: FileReader, max_threads: usize) -> Self {
        Self {
            pipeline: MatchPipeline::new(request),
            reader: Arc::new(reader),
            context: Arc::new(DispatchContext::new()),
            max_threads: max_threads.max(1),
        }
    }

    /// Share run/suspend/cancel signals with the owner.
    pub fn with_context(mut self, context: Arc<DispatchContext>) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &Arc<DispatchContext> {
        &self.context
    }

    pub fn pipeline(&self) -> &MatchPipeline {
        &self.pipeline
    }

    pub async fn run_cycle(&self, sink: Arc<dyn MessageSink>) -> Result<DispatchReport> {
        if !self.context.can_pull() {
            return Ok(DispatchReport::default());
        }

        // Pipeline construction and the scan are blocking
        let pipeline = self.pipeline.clone();
        let batch = tokio::task::spawn_blocking(move || {
            pipeline.matches().map(|m| m.collect::<Vec<Candidate>>())
        })
        .await??;

        if batch.is_empty() {
            return Ok(DispatchReport::default());
        }

        tracing::debug!("Pulled {} file(s)", batch.len());
        let report = if self.max_threads == 1 {
            self.run_sequential(batch, sink).await?
        } else {
            self.run_concurrent(batch, sink).await?
        };

        let report = report.finish();
        if !report.is_clean() {
            tracing::warn!(
                "{} of {} file(s) failed this cycle",
                report.failures.len(),
                report.pulled
            );
        }
        Ok(report)
    }

    async fn run_sequential(
        &self,
        batch: Vec<Candidate>,
        sink: Arc<dyn MessageSink>,
    ) -> Result<DispatchReport> {
        let context = self.context.clone();
        let reader = self.reader.clone();

        let report = tokio::task::spawn_blocking(move || {
            let mut report = DispatchReport::new(batch.len());
            for candidate in batch {
                if !context.can_continue() {
                    tracing::debug!("Dispatch interrupted, leaving rest of batch");
                    break;
                }
                deliver(&reader, sink.as_ref(), candidate, &mut report);
            }
            report
        })
        .await?;

        Ok(report)
    }

    async fn run_concurrent(
        &self,
        batch: Vec<Candidate>,
        sink: Arc<dyn MessageSink>,
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::new(batch.len());
        let workers = self.max_threads.min(batch.len());

        let (tx, rx) = crossbeam_channel::unbounded();
        for candidate in batch {
            if tx.send(candidate).is_err() {
                break;
            }
        }
        drop(tx);

        let token = self.context.token();
        let mut set = JoinSet::new();
        for _ in 0..workers {
            let rx = rx.clone();
            let reader = self.reader.clone();
            let sink = sink.clone();
            let token = token.clone();
            set.spawn_blocking(move || worker(rx, &reader, sink.as_ref(), &token));
        }

        // A lost worker must not drop what the others already delivered
        while let Some(part) = set.join_next().await {
            match part {
                Ok(part) => report.merge(part),
                Err(e) => {
                    tracing::error!("Dispatch worker failed: {}", e);
                    report.failures.push((PathBuf::new(), AdapterError::Task(e)));
                }
            }
        }
        Ok(report)
    }
}

fn worker(
    rx: crossbeam_channel::Receiver<Candidate>,
    reader: &FileReader,
    sink: &dyn MessageSink,
    token: &CancellationToken,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    while !token.is_cancelled() {
        let Ok(candidate) = rx.recv() else {
            break;
        };
        deliver(reader, sink, candidate, &mut report);
    }
    report
}

/// Read and hand over one file. A panicking sink counts as a failure of
/// that file only.
fn deliver(
    reader: &FileReader,
    sink: &dyn MessageSink,
    candidate: Candidate,
    report: &mut DispatchReport,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        reader
            .read(&candidate)
            .and_then(|(message, ack)| sink.message_received(message, ack))
    }))
    .unwrap_or_else(|payload| Err(AdapterError::HandlerPanic(panic_message(&*payload))));

    match outcome {
        Ok(()) => report.delivered += 1,
        Err(e) => {
            tracing::warn!("Failed to dispatch {}: {}", candidate.path.display(), e);
            report.failures.push((candidate.path, e));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
