//! Persistence sinks for accepted readings.
//!
//! Each accepted reading is appended as one row: the capture time followed by the
//! twelve effective unit values. Sinks run on their own task (see
//! [`spawn_sink_worker`]) so ingestion never waits on disk I/O, and a failing
//! sink only logs: the in-memory store stays the source of truth.
//!
//! The CSV sink needs the `storage_csv` feature. Without it, [`CsvSink::open`]
//! reports [`CalorError::PersistenceUnavailable`] and callers fall back to
//! [`NullSink`].

use crate::config::StorageConfig;
use crate::data::buffer::Entry;
use crate::error::{AppResult, CalorError};
use crate::reading::Probe;
use crate::units::Unit;
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Row layout written by every sink.
pub fn row_headers() -> Vec<String> {
    let mut headers = vec!["Waktu".to_string()];
    for probe in Probe::ALL {
        for unit in Unit::ALL {
            headers.push(format!("{}_{}", probe.column_prefix(), unit.wire_key()));
        }
    }
    headers
}

/// One persisted row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedRow {
    /// Capture instant
    pub timestamp: DateTime<Utc>,
    /// Cold, hot and mixture values in [`Unit::ALL`] order
    pub values: [[f64; 4]; 3],
}

impl PersistedRow {
    /// Row for a stored entry.
    pub fn from_entry(entry: &Entry) -> Self {
        let r = &entry.reading;
        Self {
            timestamp: r.timestamp,
            values: [r.cold.to_array(), r.hot.to_array(), r.mixture.to_array()],
        }
    }

    /// Row formatted as text fields.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(13);
        fields.push(
            self.timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        );
        fields.extend(self.values.iter().flatten().map(|v| v.to_string()));
        fields
    }
}

/// A durable destination for accepted rows.
#[async_trait]
pub trait PersistenceSink: Send {
    /// Append one row.
    async fn append_row(&mut self, row: &PersistedRow) -> AppResult<()>;

    /// Flush and release resources.
    async fn shutdown(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// A sink that drops every row.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl PersistenceSink for NullSink {
    async fn append_row(&mut self, _row: &PersistedRow) -> AppResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// A writer for CSV files.
#[cfg(feature = "storage_csv")]
pub struct CsvSink {
    path: PathBuf,
    writer: Option<csv::Writer<std::fs::File>>,
}

/// Placeholder for the CSV writer when `storage_csv` is not compiled in.
#[cfg(not(feature = "storage_csv"))]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(feature = "storage_csv")]
impl CsvSink {
    /// Open `path` for appending, writing the header if the file is new.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let is_new = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;

        let mut writer = csv::Writer::from_writer(file);
        if is_new {
            writer.write_record(row_headers()).map_err(csv_error)?;
            writer.flush()?;
            tracing::info!(path = %path.display(), "Created new data file");
        }
        Ok(Self {
            path,
            writer: Some(writer),
        })
    }
}

#[cfg(not(feature = "storage_csv"))]
impl CsvSink {
    /// Always unavailable without the `storage_csv` feature.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        Err(CalorError::PersistenceUnavailable(format!(
            "cannot write {}: CSV support not enabled. Rebuild with --features storage_csv",
            path.display()
        )))
    }
}

#[cfg(feature = "storage_csv")]
fn csv_error(e: csv::Error) -> CalorError {
    CalorError::PersistenceUnavailable(e.to_string())
}

#[cfg(feature = "storage_csv")]
#[async_trait]
impl PersistenceSink for CsvSink {
    async fn append_row(&mut self, row: &PersistedRow) -> AppResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CalorError::PersistenceUnavailable("sink already shut down".into()))?;
        writer.write_record(row.fields()).map_err(csv_error)?;
        // Rows arrive every few seconds; flush so a crash loses at most one.
        writer.flush()?;
        Ok(())
    }

    async fn shutdown(&mut self) -> AppResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        tracing::info!(path = %self.path.display(), "CSV sink shut down");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(not(feature = "storage_csv"))]
#[async_trait]
impl PersistenceSink for CsvSink {
    async fn append_row(&mut self, _row: &PersistedRow) -> AppResult<()> {
        Err(CalorError::PersistenceUnavailable(
            "CSV support not enabled".into(),
        ))
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

/// Pick the sink for a storage configuration, degrading to [`NullSink`].
pub fn sink_from_config(config: &StorageConfig) -> Box<dyn PersistenceSink> {
    if !config.enabled {
        tracing::info!("Persistence disabled by configuration");
        return Box::new(NullSink);
    }
    match CsvSink::open(&config.path) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            tracing::warn!(error = %e, "Persistence unavailable, continuing without it");
            Box::new(NullSink)
        }
    }
}

/// Handle to a running sink worker.
pub struct SinkWorker {
    tx: mpsc::UnboundedSender<PersistedRow>,
    task: JoinHandle<()>,
}

impl SinkWorker {
    /// Queue a row. Never blocks; a stopped worker only logs.
    pub fn submit(&self, row: PersistedRow) {
        if self.tx.send(row).is_err() {
            tracing::warn!(
                error = %CalorError::PersistenceUnavailable("sink worker stopped".into()),
                "Row not persisted"
            );
        }
    }

    /// Drain queued rows, shut the sink down and wait for the task.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Sink worker ended abnormally");
        }
    }
}

/// Run `sink` on its own task.
pub fn spawn_sink_worker(mut sink: Box<dyn PersistenceSink>) -> SinkWorker {
    let (tx, mut rx) = mpsc::unbounded_channel::<PersistedRow>();
    let task = tokio::spawn(async move {
        let name = sink.name();
        while let Some(row) = rx.recv().await {
            if let Err(e) = sink.append_row(&row).await {
                tracing::warn!(sink = name, error = %e, "Failed to persist row");
            }
        }
        if let Err(e) = sink.shutdown().await {
            tracing::warn!(sink = name, error = %e, "Sink shutdown failed");
        }
    });
    SinkWorker { tx, task }
}
