//! Logging bootstrap for swcheck binaries.
//!
//! Every binary writes to a size-rotated file under `<swcheck home>/logs` and
//! mirrors output to stderr. The filter comes from `RUST_LOG` when set.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "swcheck=info,swcheck_logging=info";
const KEPT_GENERATIONS: usize = 5;
const GENERATION_LIMIT_BYTES: u64 = 10 * 1024 * 1024;

/// Logging options for a binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of `warn` only.
    pub verbose: bool,
    /// Overrides `<swcheck home>/logs`.
    pub log_dir: Option<PathBuf>,
}

/// Install the global subscriber. Returns the active log file path.
pub fn init_logging(config: LogConfig<'_>) -> Result<PathBuf> {
    let dir = match config.log_dir {
        Some(dir) => dir,
        None => logs_dir()?,
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let writer = LogFileWriter::open(&dir, config.app_name)?;
    let log_path = writer.current_path()?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))?;

    Ok(log_path)
}

/// `$SWCHECK_HOME`, or `~/.swcheck`.
pub fn swcheck_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SWCHECK_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".swcheck"))
        .ok_or_else(|| anyhow!("Could not determine home directory; set SWCHECK_HOME"))
}

/// `<swcheck home>/logs`
pub fn logs_dir() -> Result<PathBuf> {
    Ok(swcheck_home()?.join("logs"))
}

/// Append-only log file that rolls into numbered generations once it
/// reaches `limit` bytes: `app.log`, `app.log.1`, ... `app.log.<keep-1>`.
struct RotatingLog {
    dir: PathBuf,
    stem: String,
    keep: usize,
    limit: u64,
    file: Option<File>,
    written: u64,
}

impl RotatingLog {
    fn open(dir: &Path, app_name: &str, keep: usize, limit: u64) -> io::Result<Self> {
        let mut log = Self {
            dir: dir.to_path_buf(),
            stem: file_stem_for(app_name),
            keep: keep.max(1),
            limit,
            file: None,
            written: 0,
        };
        log.reopen()?;
        if log.written > log.limit {
            log.roll()?;
        }
        Ok(log)
    }

    fn generation_path(&self, generation: usize) -> PathBuf {
        if generation == 0 {
            self.dir.join(format!("{}.log", self.stem))
        } else {
            self.dir.join(format!("{}.log.{}", self.stem, generation))
        }
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.generation_path(0))?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        let oldest = self.keep - 1;
        if oldest == 0 {
            // Single generation: truncate in place.
            fs::remove_file(self.generation_path(0)).or_else(ignore_missing)?;
            return self.reopen();
        }

        fs::remove_file(self.generation_path(oldest)).or_else(ignore_missing)?;
        for generation in (0..oldest).rev() {
            let from = self.generation_path(generation);
            if from.exists() {
                fs::rename(&from, self.generation_path(generation + 1))?;
            }
        }
        self.reopen()
    }
}

impl Write for RotatingLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.limit {
            self.roll()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file closed"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn ignore_missing(err: io::Error) -> io::Result<()> {
    if err.kind() == io::ErrorKind::NotFound {
        Ok(())
    } else {
        Err(err)
    }
}

/// Cloneable handle shared between the subscriber's formatting calls.
#[derive(Clone)]
struct LogFileWriter {
    shared: Arc<Mutex<RotatingLog>>,
}

impl LogFileWriter {
    fn open(dir: &Path, app_name: &str) -> Result<Self> {
        let log = RotatingLog::open(dir, app_name, KEPT_GENERATIONS, GENERATION_LIMIT_BYTES)
            .with_context(|| format!("Failed to open log file for {app_name}"))?;
        Ok(Self {
            shared: Arc::new(Mutex::new(log)),
        })
    }

    fn current_path(&self) -> Result<PathBuf> {
        let log = self
            .shared
            .lock()
            .map_err(|_| anyhow!("log writer lock poisoned"))?;
        Ok(log.generation_path(0))
    }
}

struct LogFileHandle<'a> {
    shared: &'a Mutex<RotatingLog>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileHandle<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileHandle {
            shared: &*self.shared,
        }
    }
}

impl Write for LogFileHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.shared
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.shared
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .flush()
    }
}

fn file_stem_for(app_name: &str) -> String {
    let stem: String = app_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "swcheck".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem_replaces_unsafe_characters() {
        assert_eq!(file_stem_for("swcheck watch"), "swcheck_watch");
        assert_eq!(file_stem_for("a/b\\c"), "a_b_c");
        assert_eq!(file_stem_for(""), "swcheck");
    }

    #[test]
    fn test_rotating_log_rolls_into_generations() {
        let temp = TempDir::new().unwrap();
        let mut log = RotatingLog::open(temp.path(), "app", 3, 16).unwrap();

        log.write_all(b"0123456789").unwrap();
        log.write_all(b"abcdefghij").unwrap();
        log.write_all(b"ABCDEFGHIJ").unwrap();
        log.flush().unwrap();

        let current = fs::read_to_string(temp.path().join("app.log")).unwrap();
        let first = fs::read_to_string(temp.path().join("app.log.1")).unwrap();
        let second = fs::read_to_string(temp.path().join("app.log.2")).unwrap();
        assert_eq!(current, "ABCDEFGHIJ");
        assert_eq!(first, "abcdefghij");
        assert_eq!(second, "0123456789");
    }

    #[test]
    fn test_rotating_log_drops_oldest_generation() {
        let temp = TempDir::new().unwrap();
        let mut log = RotatingLog::open(temp.path(), "app", 2, 4).unwrap();

        for chunk in [b"1111", b"2222", b"3333"] {
            log.write_all(chunk).unwrap();
        }
        log.flush().unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("app.log")).unwrap(), "3333");
        assert_eq!(fs::read_to_string(temp.path().join("app.log.1")).unwrap(), "2222");
        assert!(!temp.path().join("app.log.2").exists());
    }

    #[test]
    fn test_reopen_appends_to_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.log"), "old\n").unwrap();

        let mut log = RotatingLog::open(temp.path(), "app", 5, 1024).unwrap();
        log.write_all(b"new\n").unwrap();
        log.flush().unwrap();

        let content = fs::read_to_string(temp.path().join("app.log")).unwrap();
        assert_eq!(content, "old\nnew\n");
    }
}
