use crate::config::{DestinationConfig, FileOperation};
use crate::dispatch::FileReader;
use crate::error::Result;
use crate::message::Message;
use crate::scan::{Candidate, MatchPipeline, MatchRequest};
use crate::template;
use crate::write::{target_path, WriteEngine, WriteOptions};

/// Writes messages to files, or answers a message with the content of files.
pub struct FileDestination {
    config: DestinationConfig,
    writer: WriteEngine,
    reader: FileReader,
}

impl FileDestination {
    pub fn new(config: DestinationConfig) -> Result<Self> {
        config.validate()?;

        let writer = WriteEngine::new(WriteOptions {
            append: config.append_to_existing,
            preserve_creation_time: config.preserve_creation_time,
        });
        let reader = FileReader::new(config.operation)
            .missing_response(config.missing_response())
            .empty_response(config.empty_response());

        Ok(Self {
            config,
            writer,
            reader,
        })
    }

    pub fn config(&self) -> &DestinationConfig {
        &self.config
    }

    /// Handle one outgoing message; returns the response messages of a read.
    pub fn process_message(&self, message: &Message) -> Result<Vec<Message>> {
        match self.config.operation {
            FileOperation::Write => {
                let path = target_path(&self.config.path, &self.config.filename, &message.params);
                self.writer.write(&path, message)?;
                tracing::info!("Message written to {}", path.display());
                Ok(Vec::new())
            }
            FileOperation::Read | FileOperation::ReadAndDelete => self.read_files(message),
            FileOperation::None => {
                tracing::info!("File operation set to None, nothing to do");
                Ok(Vec::new())
            }
        }
    }

    /// Read every file in `Path` matching `Filename`. With `ReadAndDelete`
    /// the files are deleted once all of them have been read.
    fn read_files(&self, message: &Message) -> Result<Vec<Message>> {
        let root = template::expand_path(&self.config.path, &message.params);
        let filter = template::expand(&self.config.filename, &message.params);
        let pipeline = MatchPipeline::new(MatchRequest::new(root, &filter)?);

        let mut responses = self.read_batch(pipeline.matches()?)?;

        if responses.is_empty() {
            if let Some(text) = self.config.missing_response() {
                tracing::info!("No file matches '{}', using substitute response", filter);
                responses.push(Message::text(text));
            }
        }

        Ok(responses)
    }

    /// A failed read aborts the batch before anything is deleted.
    fn read_batch(&self, candidates: impl IntoIterator<Item = Candidate>) -> Result<Vec<Message>> {
        let read = candidates
            .into_iter()
            .map(|candidate| self.reader.read(&candidate))
            .collect::<Result<Vec<_>>>()?;

        let mut responses = Vec::with_capacity(read.len());
        for (response, ack) in read {
            if let Err(e) = ack.acknowledge() {
                tracing::warn!("Failed to delete {}: {}", ack.path.display(), e);
            }
            responses.push(response);
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{keys, ParamBag};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(root: &Path, operation: FileOperation, filename: &str) -> DestinationConfig {
        DestinationConfig {
            operation,
            path: root.to_string_lossy().into_owned(),
            filename: filename.to_string(),
            ..Default::default()
        }
    }

    fn destination(root: &Path, operation: FileOperation, filename: &str) -> FileDestination {
        FileDestination::new(config(root, operation, filename)).unwrap()
    }

    #[test]
    fn test_write_with_template() {
        let tmp = TempDir::new().unwrap();
        let dest = FileDestination::new(DestinationConfig {
            path: tmp.path().join("%Region%").to_string_lossy().into_owned(),
            ..config(tmp.path(), FileOperation::Write, "%Name%.out")
        })
        .unwrap();

        let params: ParamBag = [("Region", "eu"), ("Name", "batch1")].into_iter().collect();
        let responses = dest
            .process_message(&Message::text("data").with_params(params))
            .unwrap();

        assert!(responses.is_empty());
        assert_eq!(
            fs::read_to_string(tmp.path().join("eu/batch1.out")).unwrap(),
            "data"
        );
    }

    #[test]
    fn test_default_filename_is_unique() {
        let tmp = TempDir::new().unwrap();
        let dest = FileDestination::new(DestinationConfig {
            path: tmp.path().to_string_lossy().into_owned(),
            ..Default::default()
        })
        .unwrap();

        dest.process_message(&Message::text("a")).unwrap();
        dest.process_message(&Message::text("b")).unwrap();
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_read_and_delete() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.dat"), "A").unwrap();
        fs::write(tmp.path().join("b.dat"), "B").unwrap();
        fs::write(tmp.path().join("c.txt"), "C").unwrap();

        let dest = destination(tmp.path(), FileOperation::ReadAndDelete, "*.dat");
        let mut responses: Vec<_> = dest
            .process_message(&Message::text("request"))
            .unwrap()
            .into_iter()
            .map(|m| {
                let name = m.params.get(keys::FILE_NAME).unwrap_or_default().to_string();
                (name, m.text_lossy())
            })
            .collect();
        responses.sort();

        assert_eq!(
            responses,
            vec![
                ("a.dat".to_string(), "A".to_string()),
                ("b.dat".to_string(), "B".to_string())
            ]
        );
        assert!(!tmp.path().join("a.dat").exists());
        assert!(tmp.path().join("c.txt").exists());
    }

    #[test]
    fn test_read_keeps_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.dat"), "A").unwrap();

        let dest = destination(tmp.path(), FileOperation::Read, "a.dat");
        assert_eq!(dest.process_message(&Message::text("q")).unwrap().len(), 1);
        assert_eq!(dest.process_message(&Message::text("q")).unwrap().len(), 1);
        assert!(tmp.path().join("a.dat").exists());
    }

    #[test]
    fn test_read_filename_from_message() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("42.json"), "{}").unwrap();

        let dest = destination(tmp.path(), FileOperation::Read, "%OrderId%.json");
        let params: ParamBag = [("OrderId", "42")].into_iter().collect();
        let responses = dest
            .process_message(&Message::text("").with_params(params))
            .unwrap();
        assert_eq!(responses[0].text_lossy(), "{}");
    }

    #[test]
    fn test_missing_substitute() {
        let tmp = TempDir::new().unwrap();

        let dest = destination(tmp.path(), FileOperation::Read, "none.txt");
        assert!(dest.process_message(&Message::text("q")).unwrap().is_empty());

        let dest = FileDestination::new(DestinationConfig {
            file_missing_response: "NOT FOUND".to_string(),
            ..config(tmp.path(), FileOperation::Read, "none.txt")
        })
        .unwrap();
        let responses = dest.process_message(&Message::text("q")).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].text_lossy(), "NOT FOUND");
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let dest = destination(&tmp.path().join("nope"), FileOperation::Read, "*");
        assert!(dest.process_message(&Message::text("q")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_failed_read_deletes_nothing() {
        let tmp = TempDir::new().unwrap();
        let kept = tmp.path().join("a.dat");
        let vanished = tmp.path().join("b.dat");
        fs::write(&kept, "A").unwrap();
        fs::write(&vanished, "B").unwrap();

        // b.dat disappears between the scan and its read
        let batch = vec![
            Candidate::from_path(&kept).unwrap(),
            Candidate::from_path(&vanished).unwrap(),
        ];
        fs::remove_file(&vanished).unwrap();

        let dest = destination(tmp.path(), FileOperation::ReadAndDelete, "*.dat");
        assert!(dest.read_batch(batch).unwrap_err().is_not_found());
        assert_eq!(fs::read_to_string(&kept).unwrap(), "A");

        let batch = vec![Candidate::from_path(&kept).unwrap()];
        assert_eq!(dest.read_batch(batch).unwrap().len(), 1);
        assert!(!kept.exists());
    }

    #[test]
    fn test_none_does_nothing() {
        let tmp = TempDir::new().unwrap();
        let dest = destination(tmp.path(), FileOperation::None, "x.txt");
        assert!(dest.process_message(&Message::text("q")).unwrap().is_empty());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
