//! Diagnostics and dispatch-outcome persistence.
//!
//! Diagnostics go through `tracing` to stderr. Dispatch outcomes are written
//! to daily files under XDG_DATA_HOME/mention-relay/logs/YYYY-MM-DD.log by a
//! background thread, so logging never blocks a dispatch.

use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::dispatch::DispatchOutcome;
use crate::error::{Error, Result};

/// Install the stderr `tracing` subscriber. `RUST_LOG` overrides
/// `default_level`. Calling it twice is harmless.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// One dispatch outcome as written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub recipient: String,
    pub status: String,
    pub body: String,
}

impl LogEntry {
    pub fn from_outcome(outcome: &DispatchOutcome, body: &str) -> Self {
        let status = match &outcome.result {
            Ok(()) => "sent".to_string(),
            Err(e) => format!("failed: {}", e),
        };
        Self {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            recipient: outcome.recipient_id.clone(),
            status,
            body: body.to_string(),
        }
    }

    /// `[HH:MM:SS] -> <recipient> (status) body`
    fn format_line(&self) -> String {
        format!(
            "[{}] -> <{}> ({}) {}",
            self.timestamp,
            self.recipient,
            self.status,
            self.body.replace('\n', " ")
        )
    }
}

enum LogCommand {
    Write(LogEntry),
    /// Drain everything queued before this, then stop
    Shutdown,
}

/// Queues outcome entries for the writer thread.
///
/// Clones share one writer. [`OutcomeLogger::shutdown`] flushes the queue and
/// joins the writer; entries logged afterwards are dropped.
#[derive(Clone)]
pub struct OutcomeLogger {
    tx: Sender<LogCommand>,
    writer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OutcomeLogger {
    /// Logger writing to the platform data directory.
    pub fn new() -> Result<Self> {
        Self::with_directory(get_log_directory()?)
    }

    /// Logger writing to `log_dir`, created if missing.
    pub fn with_directory(log_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&log_dir)?;

        let (tx, rx) = unbounded::<LogCommand>();
        let writer = thread::spawn(move || {
            run_logger_thread(rx, log_dir);
        });

        Ok(Self {
            tx,
            writer: Arc::new(Mutex::new(Some(writer))),
        })
    }

    /// Queue an entry (non-blocking)
    pub fn log(&self, entry: LogEntry) {
        // If send fails, the writer thread has stopped - nothing to do
        let _ = self.tx.send(LogCommand::Write(entry));
    }

    /// Write out every queued entry and wait for the writer to exit.
    pub fn shutdown(&self) {
        let handle = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = self.tx.send(LogCommand::Shutdown);
            if handle.join().is_err() {
                warn!("outcome log writer panicked");
            }
        }
    }
}

fn run_logger_thread(rx: Receiver<LogCommand>, log_dir: PathBuf) {
    // Only today's file is ever open; switch when the date rolls over.
    let mut current: Option<(String, BufWriter<File>)> = None;

    while let Ok(command) = rx.recv() {
        let entry = match command {
            LogCommand::Write(entry) => entry,
            LogCommand::Shutdown => break,
        };
        if let Err(e) = write_log_entry(&mut current, &log_dir, &entry) {
            warn!("outcome log write failed: {}", e);
        }
    }

    if let Some((_, mut writer)) = current {
        let _ = writer.flush();
    }
}

fn write_log_entry(
    current: &mut Option<(String, BufWriter<File>)>,
    log_dir: &Path,
    entry: &LogEntry,
) -> Result<()> {
    let date = Local::now().format("%Y-%m-%d").to_string();

    let stale = current.as_ref().map_or(true, |(d, _)| *d != date);
    if stale {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(format!("{}.log", date)))?;
        *current = Some((date, BufWriter::new(file)));
    }

    if let Some((_, writer)) = current.as_mut() {
        writeln!(writer, "{}", entry.format_line())?;
        writer.flush()?;
    }
    Ok(())
}

/// Platform-specific log directory using XDG conventions
fn get_log_directory() -> Result<PathBuf> {
    let base = directories::BaseDirs::new()
        .ok_or_else(|| Error::InvalidSetting("cannot determine home directory".into()))?;
    Ok(base.data_dir().join("mention-relay").join("logs"))
}
