//! Export sinks: where finished records go.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::ExportError;
use crate::record::Record;

/// Accepts finished records.
#[async_trait]
pub trait ExportSink: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver `record`. `destination` is the operator chat, when one is
    /// configured; sinks that do not address anyone ignore it.
    async fn export(&self, record: &Record, destination: Option<&str>) -> Result<(), ExportError>;
}

/// Writes each record as a text file into a directory.
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the record is written to.
    pub fn path_for(&self, record: &Record) -> PathBuf {
        self.dir.join(record.file_name())
    }
}

#[async_trait]
impl ExportSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn export(&self, record: &Record, _destination: Option<&str>) -> Result<(), ExportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(record);
        tokio::fs::write(&path, record.to_text()).await?;
        info!(record_id = %record.id, path = %path.display(), "Record written");
        Ok(())
    }
}
