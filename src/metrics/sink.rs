//! Destinations for step-indexed scalar metrics

use super::event::MetricEvent;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the scalar log inside a run's metrics directory
pub const SCALARS_FILE: &str = "scalars.jsonl";

/// Receives `(name, value, step)` scalars
pub trait MetricsSink {
    fn scalar(&mut self, name: &str, value: f64, step: u64) -> Result<()>;

    /// Push buffered scalars to their destination
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: MetricsSink + ?Sized> MetricsSink for Box<S> {
    fn scalar(&mut self, name: &str, value: f64, step: u64) -> Result<()> {
        (**self).scalar(name, value, step)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Appends one JSON object per scalar to a file
///
/// Each line has the shape `{"name":"average_q","value":0.5,"step":100}`.
pub struct JsonlScalarWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlScalarWriter {
    /// Create (or truncate) the file, creating parent directories as needed
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create scalar log {:?}", path))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Writer for `<run_dir>/scalars.jsonl`
    pub fn in_dir(run_dir: impl AsRef<Path>) -> Result<Self> {
        Self::create(run_dir.as_ref().join(SCALARS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonlScalarWriter {
    fn scalar(&mut self, name: &str, value: f64, step: u64) -> Result<()> {
        let line = serde_json::to_string(&MetricEvent::new(name, value, step))
            .context("Failed to serialize scalar")?;
        writeln!(self.writer, "{}", line)
            .with_context(|| format!("Failed to write to {:?}", self.path))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", self.path))
    }
}

impl Drop for JsonlScalarWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Emits every scalar as a `debug` tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn scalar(&mut self, name: &str, value: f64, step: u64) -> Result<()> {
        debug!(name, value, step, "scalar");
        Ok(())
    }
}

/// Keeps every scalar in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Vec<MetricEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[MetricEvent] {
        &self.events
    }

    /// `(step, value)` pairs recorded under `name`, in arrival order
    pub fn series(&self, name: &str) -> Vec<(u64, f64)> {
        self.events
            .iter()
            .filter(|e| e.name == name)
            .map(|e| (e.step, e.value))
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name == name).count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl MetricsSink for MemorySink {
    fn scalar(&mut self, name: &str, value: f64, step: u64) -> Result<()> {
        self.events.push(MetricEvent::new(name, value, step));
        Ok(())
    }
}

/// Forwards every scalar to each inner sink
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MetricsSink for FanoutSink {
    fn scalar(&mut self, name: &str, value: f64, step: u64) -> Result<()> {
        for sink in &mut self.sinks {
            sink.scalar(name, value, step)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Read back a file written by [`JsonlScalarWriter`]
pub fn read_scalars(path: impl AsRef<Path>) -> Result<Vec<MetricEvent>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scalar log {:?}", path))?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid scalar on line {} of {:?}", i + 1, path))
        })
        .collect()
}
