//! Append-only CSV log of completed typing tests.
//!
//! The same file is written by the TUI client and by the ingestion server,
//! possibly at the same time, so every write goes through an exclusive
//! advisory lock on a sidecar `.lock` file. A log whose header is not exactly
//! `Timestamp,WPM,Accuracy` is renamed aside and replaced by a fresh one; the
//! old bytes are never deleted.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::{LogError, RecordError};
use crate::util::format_decimal;

pub const HEADER: [&str; 3] = ["Timestamp", "WPM", "Accuracy"];
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const MAX_WPM: f64 = 500.0;
pub const MAX_ACCURACY: f64 = 100.0;

const BACKUP_TAG: &str = "backup";
const ERROR_BACKUP_TAG: &str = "error_backup";

/// One persisted test outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub timestamp: String,
    pub wpm: f64,
    pub accuracy: f64,
}

/// Rejects values outside `0..=500` wpm and `0..=100` accuracy, including NaN.
pub fn validate(wpm: f64, accuracy: f64) -> Result<(), RecordError> {
    if !(0.0..=MAX_WPM).contains(&wpm) {
        return Err(RecordError::WpmOutOfRange(wpm));
    }
    if !(0.0..=MAX_ACCURACY).contains(&accuracy) {
        return Err(RecordError::AccuracyOutOfRange(accuracy));
    }
    Ok(())
}

impl ResultRecord {
    pub fn new(timestamp: String, wpm: f64, accuracy: f64) -> Result<Self, RecordError> {
        validate(wpm, accuracy)?;
        Ok(Self {
            timestamp,
            wpm,
            accuracy,
        })
    }

    /// A record stamped with the current local time.
    pub fn now(wpm: f64, accuracy: f64) -> Result<Self, RecordError> {
        Self::new(Local::now().format(TIMESTAMP_FORMAT).to_string(), wpm, accuracy)
    }

    fn to_row(&self) -> [String; 3] {
        [
            self.timestamp.clone(),
            format_decimal(self.wpm),
            format_decimal(self.accuracy),
        ]
    }
}

/// What [`ProgressLog::ensure`] had to do to leave a valid log behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogHealth {
    Ok,
    Created,
    /// The previous file was renamed to this path.
    Quarantined(PathBuf),
}

/// Records read back from the log; malformed rows are counted, not returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub entries: Vec<ResultRecord>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

/// Held for the duration of a validate+append critical section.
struct LogLock {
    file: File,
}

impl Drop for LogLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl ProgressLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        self.sibling(&format!("{}.lock", self.file_name()))
    }

    /// Makes sure a correctly headered log exists, creating or quarantining
    /// as needed. Safe to call any number of times.
    pub fn ensure(&self) -> Result<LogHealth, LogError> {
        let _lock = self.lock()?;
        self.ensure_locked()
    }

    /// Appends one record. The log is validated first, under the same lock.
    pub fn append(&self, record: &ResultRecord) -> Result<LogHealth, LogError> {
        validate(record.wpm, record.accuracy)?;

        let _lock = self.lock()?;
        let health = self.ensure_locked()?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogError::io(&self.path, e))?;
        terminate_last_line(&mut file).map_err(|e| LogError::io(&self.path, e))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&file);
            writer.write_record(record.to_row())?;
            writer.flush().map_err(|e| LogError::io(&self.path, e))?;
        }
        file.sync_data().map_err(|e| LogError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            wpm = record.wpm,
            accuracy = record.accuracy,
            "appended result"
        );
        Ok(health)
    }

    /// Reads every well-formed record in file order.
    ///
    /// Rows missing a field or carrying a non-numeric WPM/Accuracy are
    /// skipped and counted. A missing file reads as an empty history.
    pub fn read_history(&self) -> Result<History, LogError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(History::default()),
            Err(e) => return Err(LogError::io(&self.path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);
        let (Some(ts_col), Some(wpm_col), Some(acc_col)) =
            (column(HEADER[0]), column(HEADER[1]), column(HEADER[2]))
        else {
            return Err(LogError::BadHeader(headers.iter().collect::<Vec<_>>().join(",")));
        };

        let mut history = History::default();
        // data starts on line 2, after the header
        for (row_num, row) in reader.records().enumerate().map(|(i, r)| (i + 2, r)) {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!("skipping unreadable row {}: {}", row_num, e);
                    history.skipped += 1;
                    continue;
                }
            };

            let field = |idx: usize| row.get(idx).map(str::trim).filter(|v| !v.is_empty());
            let (Some(timestamp), Some(wpm), Some(accuracy)) =
                (field(ts_col), field(wpm_col), field(acc_col))
            else {
                warn!("skipping incomplete row {}: {:?}", row_num, row);
                history.skipped += 1;
                continue;
            };

            match (wpm.parse::<f64>(), accuracy.parse::<f64>()) {
                (Ok(wpm), Ok(accuracy)) => history.entries.push(ResultRecord {
                    timestamp: timestamp.to_string(),
                    wpm,
                    accuracy,
                }),
                _ => {
                    warn!("skipping row {} with non-numeric values: {:?}", row_num, row);
                    history.skipped += 1;
                }
            }
        }

        Ok(history)
    }

    /// The log as text, or `None` if it does not exist.
    pub fn raw_contents(&self) -> Result<Option<String>, LogError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LogError::io(&self.path, e)),
        }
    }

    fn lock(&self) -> Result<LogLock, LogError> {
        self.create_parent_dir()?;
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LogError::io(&lock_path, e))?;
        fs2::FileExt::lock_exclusive(&file).map_err(|e| LogError::io(&lock_path, e))?;
        Ok(LogLock { file })
    }

    fn ensure_locked(&self) -> Result<LogHealth, LogError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.write_fresh()?;
                info!("created new progress log: {}", self.path.display());
                return Ok(LogHealth::Created);
            }
            Err(e) => {
                warn!("progress log {} is unreadable: {}", self.path.display(), e);
                return self.quarantine(ERROR_BACKUP_TAG);
            }
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let mut header = csv::StringRecord::new();

        match reader.read_record(&mut header) {
            Ok(false) => {
                info!("progress log {} is empty, writing header", self.path.display());
                self.write_fresh()?;
                Ok(LogHealth::Created)
            }
            Ok(true) if header.iter().eq(HEADER.iter().copied()) => Ok(LogHealth::Ok),
            Ok(true) => {
                warn!(
                    "invalid header in {}: {:?}, expected {:?}",
                    self.path.display(),
                    header,
                    HEADER
                );
                self.quarantine(BACKUP_TAG)
            }
            Err(e) => {
                warn!("could not validate {}: {}", self.path.display(), e);
                self.quarantine(ERROR_BACKUP_TAG)
            }
        }
    }

    fn quarantine(&self, tag: &str) -> Result<LogHealth, LogError> {
        let backup = self.backup_path(tag);
        fs::rename(&self.path, &backup).map_err(|e| LogError::io(&self.path, e))?;
        warn!("corrupted progress log backed up as: {}", backup.display());
        self.write_fresh()?;
        Ok(LogHealth::Quarantined(backup))
    }

    fn backup_path(&self, tag: &str) -> PathBuf {
        let stem = format!(
            "{}.{}-{}",
            self.file_name(),
            tag,
            Local::now().format("%Y%m%d%H%M%S")
        );
        let mut candidate = self.sibling(&stem);
        let mut n = 1;
        while candidate.exists() {
            candidate = self.sibling(&format!("{}-{}", stem, n));
            n += 1;
        }
        candidate
    }

    fn write_fresh(&self) -> Result<(), LogError> {
        let file = File::create(&self.path).map_err(|e| LogError::io(&self.path, e))?;
        let mut writer = csv::Writer::from_writer(&file);
        writer.write_record(HEADER)?;
        writer.flush().map_err(|e| LogError::io(&self.path, e))?;
        drop(writer);
        file.sync_data().map_err(|e| LogError::io(&self.path, e))
    }

    fn create_parent_dir(&self) -> Result<(), LogError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| LogError::io(parent, e))
            }
            _ => Ok(()),
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "typing_progress.csv".to_string())
    }

    fn sibling(&self, name: &str) -> PathBuf {
        self.path.with_file_name(name)
    }
}

/// Writes a newline if an earlier write was cut short mid-line.
fn terminate_last_line(file: &mut File) -> io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}
