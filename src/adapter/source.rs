use crate::config::SourceConfig;
use crate::dispatch::{
    AckToken, DispatchContext, DispatchEngine, DispatchReport, FileReader, MessageSink,
};
use crate::error::Result;
use crate::message::Message;
use crate::write::{target_path, WriteEngine, WriteOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Longest uninterrupted sleep of the polling loop.
const IDLE_SLICE: Duration = Duration::from_millis(100);

/// Polls a folder and delivers matching files as messages.
pub struct FileSource {
    config: SourceConfig,
    engine: DispatchEngine,
    reply: Option<WriteEngine>,
}

impl FileSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        config.validate()?;

        let reader = FileReader::new(config.operation)
            .missing_response(config.missing_response())
            .empty_response(config.empty_response());
        let engine = DispatchEngine::new(config.match_request()?, reader, config.max_threads);
        let reply = config
            .is_two_way
            .then(|| WriteEngine::new(WriteOptions::default()));

        Ok(Self {
            config,
            engine,
            reply,
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<DispatchContext> {
        self.engine.context()
    }

    pub fn start(&self) {
        self.context().start();
    }

    pub fn stop(&self) {
        self.context().stop();
    }

    pub fn suspend(&self) {
        self.context().suspend();
    }

    pub fn resume(&self) {
        self.context().resume();
    }

    /// Run one cycle: pull a batch and hand every file to `sink`.
    pub async fn receive_messages(&self, sink: Arc<dyn MessageSink>) -> Result<DispatchReport> {
        self.engine.run_cycle(sink).await
    }

    /// The consumer is done with a message; delete its file if configured to.
    pub fn consume_received_message(&self, ack: &AckToken) -> Result<bool> {
        ack.acknowledge()
    }

    /// Write a response to `ReplyPath/ReplyFilename`. No-op unless two-way.
    pub fn return_response(&self, message: &Message) -> Result<Option<PathBuf>> {
        let Some(writer) = &self.reply else {
            return Ok(None);
        };

        let path = target_path(
            &self.config.reply_path,
            &self.config.reply_filename,
            &message.params,
        );
        writer.write(&path, message)?;
        tracing::info!("Response written to {}", path.display());
        Ok(Some(path))
    }

    /// Poll until [`FileSource::stop`] is called.
    ///
    /// Cycle failures (such as a missing folder) are logged and retried on
    /// the next tick.
    pub async fn run(&self, sink: Arc<dyn MessageSink>) -> Result<()> {
        self.start();
        let interval = Duration::from_millis(self.config.poll_interval);
        tracing::info!(
            "Polling {} every {:?} for '{}'",
            self.config.path,
            interval,
            self.config.filter
        );

        while self.context().is_running() {
            if !self.context().is_suspended() {
                match self.receive_messages(sink.clone()).await {
                    Ok(report) if report.pulled > 0 => tracing::info!(
                        "Cycle done: {} delivered, {} failed, {} skipped",
                        report.delivered,
                        report.failures.len(),
                        report.skipped
                    ),
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Polling {} failed: {}", self.config.path, e),
                }
            }
            self.idle(interval).await;
        }

        tracing::info!("Stopped polling {}", self.config.path);
        Ok(())
    }

    async fn idle(&self, interval: Duration) {
        let deadline = tokio::time::Instant::now() + interval;
        while self.context().is_running() {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep((deadline - now).min(IDLE_SLICE)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileOperation;
    use crate::error::AdapterError;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn config(root: &Path) -> SourceConfig {
        SourceConfig {
            path: root.to_string_lossy().into_owned(),
            filter: "*.txt".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_receive_and_consume() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("in.txt"), "payload")?;

        let source = FileSource::new(config(tmp.path()))?;
        source.start();

        let acks = Arc::new(Mutex::new(Vec::new()));
        let collected = acks.clone();
        let sink: Arc<dyn MessageSink> =
            Arc::new(move |message: Message, ack: AckToken| -> Result<()> {
                assert_eq!(message.text_lossy(), "payload");
                collected.lock().unwrap().push(ack);
                Ok(())
            });

        let report = source.receive_messages(sink.clone()).await?;
        assert_eq!(report.delivered, 1);
        // Not consumed yet, so it is picked up again
        assert_eq!(source.receive_messages(sink.clone()).await?.delivered, 1);

        let ack = acks.lock().unwrap()[0].clone();
        assert!(source.consume_received_message(&ack)?);
        assert_eq!(source.receive_messages(sink).await?.pulled, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_operation_never_deletes() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("keep.txt");
        fs::write(&path, "x")?;

        let source = FileSource::new(SourceConfig {
            operation: FileOperation::Read,
            ..config(tmp.path())
        })?;
        source.start();

        let sink: Arc<dyn MessageSink> =
            Arc::new(|_: Message, ack: AckToken| ack.acknowledge().map(|_| ()));
        source.receive_messages(sink).await?;
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_return_response() {
        let tmp = TempDir::new().unwrap();
        let replies = tmp.path().join("replies");

        let one_way = FileSource::new(config(tmp.path())).unwrap();
        assert!(one_way.return_response(&Message::text("r")).unwrap().is_none());

        let two_way = FileSource::new(SourceConfig {
            is_two_way: true,
            reply_path: replies.to_string_lossy().into_owned(),
            reply_filename: "%FileNameWithoutExtension%.reply".to_string(),
            ..config(tmp.path())
        })
        .unwrap();

        let params = [("FileNameWithoutExtension", "order")].into_iter().collect();
        let written = two_way
            .return_response(&Message::text("ok").with_params(params))
            .unwrap()
            .unwrap();
        assert_eq!(written, replies.join("order.reply"));
        assert_eq!(fs::read_to_string(written).unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_run_until_stopped() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("a.txt"), "x")?;

        let source = Arc::new(FileSource::new(SourceConfig {
            poll_interval: 10,
            ..config(tmp.path())
        })?);

        let stopper = source.clone();
        let sink: Arc<dyn MessageSink> =
            Arc::new(move |_: Message, ack: AckToken| -> Result<()> {
                ack.acknowledge()?;
                stopper.stop();
                Ok(())
            });

        tokio::time::timeout(Duration::from_secs(10), source.run(sink)).await??;
        assert!(!tmp.path().join("a.txt").exists());
        assert!(!source.context().is_running());
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let err = FileSource::new(SourceConfig::default()).err().unwrap();
        assert!(matches!(err, AdapterError::Validation(_)));
    }
}
