//! JSONL log file sink.
//!
//! Every relay process appends to one file; each event is written as a
//! single line and flushed before the lock is released, so concurrent
//! writers never interleave within a line.

use crate::LogConfig;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `~/.auth-relay/logs/dev.jsonl`, or under the temp dir without a home.
pub(crate) fn default_log_path() -> PathBuf {
    let base = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
    base.join(".auth-relay").join("logs").join("dev.jsonl")
}

/// Shared append handle on the log file.
#[derive(Clone)]
pub struct LogFile {
    path: Arc<PathBuf>,
    sink: Arc<Mutex<LineWriter<std::fs::File>>>,
}

impl LogFile {
    /// Open `path` for appending, creating missing parent directories.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            sink: Arc::new(Mutex::new(LineWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sink = self.sink.lock();
        sink.write_all(buf)?;
        sink.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn level_filter(default_level: &str) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_level),
    }
}

/// Install the global subscriber and return the log file path.
///
/// When a subscriber is already installed (tests, embedding hosts) it is
/// kept and only the file is opened.
pub fn install(config: &LogConfig) -> io::Result<PathBuf> {
    let log_file = LogFile::open(&config.log_path.clone().unwrap_or_else(default_log_path))?;
    let path = log_file.path().to_path_buf();

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(log_file)
        .with_filter(level_filter(&config.default_level));

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr)
            .with_filter(level_filter(&config.default_level))
    });

    let fresh = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if fresh {
        tracing::info!(
            service = %config.service_name,
            pid = std::process::id(),
            log_path = %path.display(),
            "Logging started"
        );
    }

    Ok(path)
}
