//! JSONL result sink.
//!
//! Appends one self-contained line per completed record and flushes
//! before returning, so a crash after N appends leaves exactly N
//! complete, readable records. Safe for concurrent workers: the write
//! and flush happen under one lock, lines never interleave.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tokio::sync::Mutex;

use crate::models::ImageRecord;

pub struct JsonlSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Create (or truncate) the output file.
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Serialize one record as a single line and flush it.
    pub async fn append(&self, record: &ImageRecord) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
