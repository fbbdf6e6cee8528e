use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::trace::event::NavigationEvent;

struct TraceSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl TraceSink {
    fn append(&mut self, event: &NavigationEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        // One flushed line per step, so the file can be tailed while a
        // navigation runs
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}

/// JSONL sink for navigation steps. Tracing never fails a command: the first
/// I/O error is reported once and the sink shuts itself off.
#[derive(Default)]
pub struct TraceLogger {
    sink: Mutex<Option<TraceSink>>,
}

impl TraceLogger {
    /// Append to `path`, creating it if needed. An unopenable file gives a
    /// disabled logger.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let sink = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(TraceSink {
                path: path.to_path_buf(),
                writer: BufWriter::new(file),
                written: 0,
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "navigation trace disabled");
                None
            }
        };
        TraceLogger {
            sink: Mutex::new(sink),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_path(path: Option<&str>) -> Self {
        path.map(TraceLogger::new).unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<TraceSink>> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().is_some()
    }

    /// Lines written since the logger was opened.
    pub fn events_written(&self) -> u64 {
        self.lock().as_ref().map(|s| s.written).unwrap_or(0)
    }

    pub fn log(&self, event: &NavigationEvent) {
        let mut guard = self.lock();
        let Some(sink) = guard.as_mut() else {
            return;
        };
        match sink.append(event) {
            Ok(()) => debug!(step = event.step, "navigation step traced"),
            Err(e) => {
                warn!(path = %sink.path.display(), error = %e, "navigation trace write failed, disabling");
                *guard = None;
            }
        }
    }
}
