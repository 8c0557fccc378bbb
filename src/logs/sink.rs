use crate::error::{ChanlogError, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write target behind a logger
///
/// Sinks open their file lazily, so a bad directory is reported by the first
/// `append` rather than when the sink is built.
pub trait Sink: Send {
    /// Append one already formatted line
    fn append(&mut self, line: &str) -> Result<()> {
        self.append_at(line, Local::now())
    }

    /// Append a line stamped at `at`; time-based sinks rotate on it
    fn append_at(&mut self, line: &str, at: DateTime<Local>) -> Result<()>;

    /// Flush buffered data to disk
    fn flush(&mut self) -> Result<()>;

    /// Whether the underlying file has been opened
    fn is_open(&self) -> bool;

    /// Path of the active log file
    fn path(&self) -> &Path;
}

/// How often a rotating sink starts a new file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPeriod {
    #[default]
    Daily,
    Monthly,
    Yearly,
}

impl RotationPeriod {
    /// chrono format used for backup names
    pub fn date_format(&self) -> &'static str {
        match self {
            RotationPeriod::Daily => "%Y-%m-%d",
            RotationPeriod::Monthly => "%Y-%m",
            RotationPeriod::Yearly => "%Y",
        }
    }

    /// Period key for a point in time
    pub fn key(&self, at: DateTime<Local>) -> String {
        at.format(self.date_format()).to_string()
    }

    /// Whether `s` is a period key this rotation produces
    pub fn is_key(&self, s: &str) -> bool {
        let (len, padded) = match self {
            RotationPeriod::Daily => (10, s.to_string()),
            RotationPeriod::Monthly => (7, format!("{}-01", s)),
            RotationPeriod::Yearly => (4, format!("{}-01-01", s)),
        };
        s.len() == len && NaiveDate::parse_from_str(&padded, "%Y-%m-%d").is_ok()
    }
}

/// Open a log file for appending, classifying the failure
fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
                ChanlogError::DirectoryResolution {
                    path: dir.to_path_buf(),
                    source,
                }
            }
            _ => ChanlogError::SinkOpen {
                path: path.to_path_buf(),
                source,
            },
        })
}

fn write_line(file: &mut File, path: &Path, line: &str) -> Result<()> {
    file.write_all(line.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|source| ChanlogError::SinkWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Plain append-only file
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }
}

impl Sink for FileSink {
    fn append_at(&mut self, line: &str, _at: DateTime<Local>) -> Result<()> {
        let file = match self.file.take() {
            Some(file) => file,
            None => open_append(&self.path)?,
        };
        let file = self.file.insert(file);
        write_line(file, &self.path, line)
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut file) = self.file {
            file.sync_data()?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Time-rotated file set
///
/// The active file keeps its plain name. When a write falls into a new period
/// the active file is renamed to `<name>.<period>` (`app.log.2026-01-05`) and
/// a fresh one is opened. Every active file ends in `.log` and no period key
/// does, so a backup can never be another channel's file. Backups beyond
/// `max_files` are removed oldest first; zero keeps all.
pub struct RotatingFileSink {
    path: PathBuf,
    period: RotationPeriod,
    max_files: usize,
    file: Option<File>,
    current_period: Option<String>,
}

impl RotatingFileSink {
    pub fn new<P: AsRef<Path>>(path: P, period: RotationPeriod, max_files: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            period,
            max_files,
            file: None,
            current_period: None,
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn period(&self) -> RotationPeriod {
        self.period
    }

    /// Open the active file and work out which period it belongs to
    fn open_at(&mut self, now: DateTime<Local>) -> Result<()> {
        let existing_period = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(|modified| self.period.key(DateTime::<Local>::from(modified)));

        self.file = Some(open_append(&self.path)?);
        self.current_period = Some(existing_period.unwrap_or_else(|| self.period.key(now)));
        Ok(())
    }

    /// Move the active file into its dated backup and prune old backups
    fn rotate(&mut self) -> Result<()> {
        // Close before renaming
        self.file = None;

        let Some(period) = self.current_period.take() else {
            return Ok(());
        };

        if self.path.exists() {
            let backup = self.backup_path(&period)?;
            if backup.exists() {
                // Same period seen again (clock moved back); merge into the backup
                let mut src = File::open(&self.path)
                    .map_err(|e| ChanlogError::Rotation(format!("Failed to read log: {}", e)))?;
                let mut dst = OpenOptions::new()
                    .append(true)
                    .open(&backup)
                    .map_err(|e| ChanlogError::Rotation(format!("Failed to open backup: {}", e)))?;
                io::copy(&mut src, &mut dst)
                    .map_err(|e| ChanlogError::Rotation(format!("Failed to merge log: {}", e)))?;
                fs::remove_file(&self.path)
                    .map_err(|e| ChanlogError::Rotation(format!("Failed to remove log: {}", e)))?;
            } else {
                fs::rename(&self.path, &backup)
                    .map_err(|e| ChanlogError::Rotation(format!("Failed to rotate log: {}", e)))?;
            }

            tracing::info!(
                "Rotated {} into {}",
                self.path.display(),
                backup.display()
            );
        }

        self.prune()
    }

    fn backup_path(&self, period: &str) -> Result<PathBuf> {
        let parent = self.path.parent().ok_or_else(|| {
            ChanlogError::Rotation("Invalid log file path".to_string())
        })?;
        let name = self.path.file_name().and_then(|s| s.to_str()).ok_or_else(|| {
            ChanlogError::Rotation("Invalid log file name".to_string())
        })?;

        Ok(parent.join(format!("{}.{}", name, period)))
    }

    /// Delete the oldest backups until at most `max_files` remain
    fn prune(&self) -> Result<()> {
        if self.max_files == 0 {
            return Ok(());
        }

        let backups = list_backups(&self.path, self.period)?;
        if backups.len() <= self.max_files {
            return Ok(());
        }

        let excess = backups.len() - self.max_files;
        for old in &backups[..excess] {
            fs::remove_file(old).map_err(|e| {
                ChanlogError::Rotation(format!("Failed to remove {}: {}", old.display(), e))
            })?;
            tracing::debug!("Removed expired log {}", old.display());
        }

        Ok(())
    }
}

impl Sink for RotatingFileSink {
    /// Append a line as if it were written at `now`
    ///
    /// # Arguments
    /// * `line` - Formatted line, including its trailing newline
    /// * `now` - Time that decides which period the line belongs to
    ///
    /// # Returns
    /// * `Ok(())` once the line is written, after rotating if `now` starts a new period
    /// * `Err(ChanlogError::Rotation)` if the old file could not be moved or pruned
    /// * `Err(ChanlogError::SinkOpen)` / `Err(ChanlogError::SinkWrite)` on file errors
    fn append_at(&mut self, line: &str, now: DateTime<Local>) -> Result<()> {
        let key = self.period.key(now);

        if self.file.is_none() {
            self.open_at(now)?;
        }

        if self.current_period.as_deref() != Some(key.as_str()) {
            self.rotate()?;
            self.file = Some(open_append(&self.path)?);
            self.current_period = Some(key);
        }

        match self.file {
            Some(ref mut file) => write_line(file, &self.path, line),
            None => Err(ChanlogError::Rotation(format!(
                "No open file for {}",
                self.path.display()
            ))),
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut file) = self.file {
            file.sync_data()?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Backups belonging to `log_file`, oldest first
///
/// Only `<name>.<period>` files whose period matches `period` count. Channel
/// files always end in `.log`, so `app-2026-01-01.log` is never taken for a
/// backup of `app.log`.
pub fn list_backups(log_file: &Path, period: RotationPeriod) -> Result<Vec<PathBuf>> {
    let parent = match log_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = log_file
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ChanlogError::Rotation("Invalid log file name".to_string()))?;
    let prefix = format!("{}.", name);

    if !parent.is_dir() {
        return Ok(Vec::new());
    }

    let mut backups: Vec<PathBuf> = fs::read_dir(parent)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(&prefix))
                .map(|key| period.is_key(key))
                .unwrap_or(false)
        })
        .collect();

    // Period keys are zero padded, so name order is age order
    backups.sort();
    Ok(backups)
}
