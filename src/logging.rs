use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Append-only text log. Each formatted event is appended to `path`; when the
/// file cannot be opened or written the line goes to stderr instead and the
/// failure is not reported to the caller.
#[derive(Debug, Clone)]
pub struct AppendLog {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl AppendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, buf: &[u8]) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(buf)
    }
}

impl Write for AppendLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Err(e) = self.append(buf) {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "Error writing to log file {}: {}", self.path.display(), e);
            let _ = stderr.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for AppendLog {
    type Writer = AppendLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the global subscriber: console output (JSON or plain) plus the
/// append-only file. Level comes from `RUST_LOG`, default `info`.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (json, plain) = if config.log_json {
        let layer = fmt::layer()
            .json()
            .with_current_span(false)
            .with_target(false)
            .with_ansi(false);
        (Some(layer), None)
    } else {
        (None, Some(fmt::layer().with_target(false)))
    };

    let file = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(AppendLog::new(&config.log_file));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .with(file)
        .try_init();
}
