use crate::error::{ChanlogError, Result};
use crate::logs::format::{format_record, Context, PlaceholderRenderer, Record, TemplateRenderer};
use crate::logs::process_id::generate_process_identifier;
use crate::logs::sink::{FileSink, RotatingFileSink, RotationPeriod, Sink};
use crate::logs::Level;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default number of rotated files kept per channel
pub const DEFAULT_MAX_FILES: usize = 7;

/// Per-logger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggerOptions {
    /// Use a rotating sink instead of a plain append file
    pub rotate: bool,
    /// Rotated files to keep; zero keeps all
    pub max_files: usize,
    /// Append the serialized context after each message
    pub include_context: bool,
    /// Rotation granularity
    pub rotation: RotationPeriod,
    /// Records below this level are dropped
    pub level: Level,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            rotate: true,
            max_files: DEFAULT_MAX_FILES,
            include_context: false,
            rotation: RotationPeriod::Daily,
            level: Level::Debug,
        }
    }
}

/// Collects logger options and applies them in one go when the logger is built
pub struct LoggerBuilder {
    options: LoggerOptions,
    renderer: Option<Box<dyn TemplateRenderer>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::from_options(LoggerOptions::default())
    }

    pub fn from_options(options: LoggerOptions) -> Self {
        Self {
            options,
            renderer: None,
        }
    }

    pub fn context(mut self, enabled: bool) -> Self {
        self.options.include_context = enabled;
        self
    }

    pub fn rotate(mut self, enabled: bool) -> Self {
        self.options.rotate = enabled;
        self
    }

    pub fn max_files(mut self, max_files: usize) -> Self {
        self.options.max_files = max_files;
        self
    }

    pub fn rotation_period(mut self, period: RotationPeriod) -> Self {
        self.options.rotation = period;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.options.level = level;
        self
    }

    /// Replace the default `{key}` placeholder renderer
    pub fn renderer(mut self, renderer: Box<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn options(&self) -> &LoggerOptions {
        &self.options
    }

    /// Build a logger writing to `<log_dir>/<channel>.log`
    ///
    /// No file is touched here; the sink opens on the first write.
    ///
    /// # Arguments
    /// * `channel` - Channel name, used as the file stem
    /// * `log_dir` - Directory holding the channel's files
    ///
    /// # Returns
    /// A `Logger` with a fresh process identifier and the collected options
    pub fn build<P: AsRef<Path>>(self, channel: &str, log_dir: P) -> Logger {
        let log_dir = log_dir.as_ref().to_path_buf();
        let sink = build_sink(&log_file_path(&log_dir, channel), &self.options);

        let logger = Logger {
            channel: channel.to_string(),
            log_dir,
            process_id: generate_process_identifier(),
            renderer: self
                .renderer
                .unwrap_or_else(|| Box::new(PlaceholderRenderer)),
            state: Mutex::new(LoggerState {
                options: self.options,
                sink,
            }),
        };

        tracing::debug!(
            channel = %logger.channel,
            file = %logger.log_file().display(),
            process_id = %logger.process_id,
            "Created logger"
        );

        logger
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Path of the active log file for a channel
pub fn log_file_path(log_dir: &Path, channel: &str) -> PathBuf {
    log_dir.join(format!("{}.log", channel))
}

fn build_sink(path: &Path, options: &LoggerOptions) -> Box<dyn Sink> {
    if options.rotate {
        Box::new(RotatingFileSink::new(
            path,
            options.rotation,
            options.max_files,
        ))
    } else {
        Box::new(FileSink::new(path))
    }
}

struct LoggerState {
    options: LoggerOptions,
    sink: Box<dyn Sink>,
}

/// A named channel writing formatted records to one file
///
/// Format and append happen under one lock, so lines from concurrent callers
/// never interleave.
pub struct Logger {
    channel: String,
    log_dir: PathBuf,
    process_id: String,
    renderer: Box<dyn TemplateRenderer>,
    state: Mutex<LoggerState>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Toggle the context block for subsequent records
    pub fn configure_context(&self, enabled: bool) -> &Self {
        self.state.lock().options.include_context = enabled;
        self
    }

    /// Switch between rotating and plain sinks
    ///
    /// Only allowed before the first write; afterwards it fails with
    /// `SinkAlreadyOpen`.
    pub fn configure_rotation(&self, enabled: bool) -> Result<&Self> {
        self.reconfigure_sink(|options| options.rotate = enabled)
    }

    /// Change how many rotated files are kept
    ///
    /// Only allowed before the first write; afterwards it fails with
    /// `SinkAlreadyOpen`.
    pub fn configure_max_files(&self, max_files: usize) -> Result<&Self> {
        self.reconfigure_sink(|options| options.max_files = max_files)
    }

    /// Recreate the sink from the current options
    pub fn attach_sink(&self) -> Result<&Self> {
        self.reconfigure_sink(|_| {})
    }

    fn reconfigure_sink<F>(&self, apply: F) -> Result<&Self>
    where
        F: FnOnce(&mut LoggerOptions),
    {
        let mut state = self.state.lock();
        if state.sink.is_open() {
            return Err(ChanlogError::SinkAlreadyOpen(self.channel.clone()));
        }

        apply(&mut state.options);
        let sink = build_sink(&self.log_file(), &state.options);
        state.sink = sink;

        tracing::debug!(
            channel = %self.channel,
            rotate = state.options.rotate,
            max_files = state.options.max_files,
            "Attached sink"
        );

        Ok(self)
    }

    /// Render a record and append it to the sink
    pub fn log(&self, level: Level, template: &str, context: &Context) -> Result<()> {
        self.log_at(level, template, context, Local::now())
    }

    /// Render a record stamped at `at` and append it to the sink
    ///
    /// The same time is printed in the line and used by a rotating sink to
    /// pick the period, so a record written across midnight lands in one file.
    pub fn log_at(
        &self,
        level: Level,
        template: &str,
        context: &Context,
        at: DateTime<Local>,
    ) -> Result<()> {
        let record = Record {
            timestamp: at,
            level,
            template,
            context,
        };

        let mut state = self.state.lock();
        if record.level < state.options.level {
            return Ok(());
        }

        let line = format_record(
            &record,
            &self.process_id,
            state.options.include_context,
            self.renderer.as_ref(),
        );

        state.sink.append_at(&line, record.timestamp)
    }

    pub fn debug(&self, template: &str, context: &Context) -> Result<()> {
        self.log(Level::Debug, template, context)
    }

    pub fn info(&self, template: &str, context: &Context) -> Result<()> {
        self.log(Level::Info, template, context)
    }

    pub fn notice(&self, template: &str, context: &Context) -> Result<()> {
        self.log(Level::Notice, template, context)
    }

    pub fn warning(&self, template: &str, context: &Context) -> Result<()> {
        self.log(Level::Warning, template, context)
    }

    pub fn error(&self, template: &str, context: &Context) -> Result<()> {
        self.log(Level::Error, template, context)
    }

    pub fn critical(&self, template: &str, context: &Context) -> Result<()> {
        self.log(Level::Critical, template, context)
    }

    pub fn alert(&self, template: &str, context: &Context) -> Result<()> {
        self.log(Level::Alert, template, context)
    }

    pub fn emergency(&self, template: &str, context: &Context) -> Result<()> {
        self.log(Level::Emergency, template, context)
    }

    /// Flush the sink to disk
    pub fn flush(&self) -> Result<()> {
        self.state.lock().sink.flush()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the active log file
    pub fn log_file(&self) -> PathBuf {
        log_file_path(&self.log_dir, &self.channel)
    }

    /// Identifier written into every line of this logger
    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    /// Snapshot of the current options
    pub fn options(&self) -> LoggerOptions {
        self.state.lock().options.clone()
    }

    /// Whether the sink has opened its file yet
    pub fn is_sink_open(&self) -> bool {
        self.state.lock().sink.is_open()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("channel", &self.channel)
            .field("log_dir", &self.log_dir)
            .field("process_id", &self.process_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::list_backups;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn ctx(pairs: &[(&str, serde_json::Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    struct UppercaseRenderer;

    impl TemplateRenderer for UppercaseRenderer {
        fn render(&self, template: &str, _context: &Context) -> String {
            template.to_uppercase()
        }
    }

    #[test]
    fn test_builder_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let logger = Logger::builder().build("ka", temp_dir.path());

        let options = logger.options();
        assert!(options.rotate);
        assert_eq!(options.max_files, 7);
        assert!(!options.include_context);
        assert_eq!(options.rotation, RotationPeriod::Daily);
        assert_eq!(logger.log_file(), temp_dir.path().join("ka.log"));
        assert!(!logger.is_sink_open());
    }

    #[test]
    fn test_log_writes_line() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new().build("ka", temp_dir.path());

        logger
            .info(
                "write a log {user} {title}",
                &ctx(&[("user", json!("alice")), ("title", json!("Hello World!"))]),
            )
            .unwrap();

        let content = fs::read_to_string(logger.log_file()).unwrap();
        let expected_suffix = format!("] [{}] write a log alice Hello World!\n", logger.process_id());
        assert!(content.starts_with('['));
        assert!(content.ends_with(&expected_suffix), "unexpected line: {}", content);
    }

    #[test]
    fn test_context_toggle() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new().build("ctx", temp_dir.path());
        let context = ctx(&[("user", json!("alice"))]);

        logger.info("hello {user}", &context).unwrap();
        logger.configure_context(true).info("hello {user}", &context).unwrap();

        let content = fs::read_to_string(logger.log_file()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("hello alice"));
        assert!(lines[1].ends_with("hello alice {\"user\":\"alice\"}"));
    }

    #[test]
    fn test_process_id_is_stable_per_logger() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new().build("pid", temp_dir.path());

        logger.info("one", &Context::new()).unwrap();
        logger.info("two", &Context::new()).unwrap();

        let content = fs::read_to_string(logger.log_file()).unwrap();
        let marker = format!("[{}]", logger.process_id());
        assert_eq!(content.matches(&marker).count(), 2);
    }

    #[test]
    fn test_level_filter() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new()
            .level(Level::Warning)
            .build("levels", temp_dir.path());

        logger.debug("dropped", &Context::new()).unwrap();
        logger.info("dropped", &Context::new()).unwrap();
        logger.error("kept", &Context::new()).unwrap();

        let content = fs::read_to_string(logger.log_file()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("kept"));
    }

    #[test]
    fn test_configure_before_first_write() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new().build("early", temp_dir.path());

        logger
            .configure_rotation(false)
            .unwrap()
            .configure_max_files(3)
            .unwrap();

        let options = logger.options();
        assert!(!options.rotate);
        assert_eq!(options.max_files, 3);
    }

    #[test]
    fn test_configure_after_first_write_fails() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new().build("late", temp_dir.path());

        logger.info("opens the sink", &Context::new()).unwrap();
        assert!(logger.is_sink_open());

        assert!(matches!(
            logger.configure_rotation(false),
            Err(ChanlogError::SinkAlreadyOpen(_))
        ));
        assert!(matches!(
            logger.configure_max_files(1),
            Err(ChanlogError::SinkAlreadyOpen(_))
        ));
        assert!(matches!(
            logger.attach_sink(),
            Err(ChanlogError::SinkAlreadyOpen(_))
        ));
        assert!(logger.options().rotate);
    }

    #[test]
    fn test_custom_renderer() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new()
            .renderer(Box::new(UppercaseRenderer))
            .build("custom", temp_dir.path());

        logger.notice("quiet words", &Context::new()).unwrap();

        let content = fs::read_to_string(logger.log_file()).unwrap();
        assert!(content.ends_with("QUIET WORDS\n"));
    }

    #[test]
    fn test_missing_directory_fails_on_first_write() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let logger = LoggerBuilder::new().rotate(false).build("ka", &missing);

        let result = logger.info("lost", &Context::new());
        assert!(matches!(
            result,
            Err(ChanlogError::DirectoryResolution { .. })
        ));
    }

    #[test]
    fn test_rotation_follows_logger_options() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new().max_files(2).build("rot", temp_dir.path());

        let start = Local.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        for i in 0..5 {
            logger
                .log_at(Level::Info, "tick", &Context::new(), start + Duration::days(i))
                .unwrap();
        }

        let backups = list_backups(&logger.log_file(), RotationPeriod::Daily).unwrap();
        let names: Vec<String> = backups
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        assert_eq!(names, vec!["rot.log.2026-04-03", "rot.log.2026-04-04"]);

        let content = fs::read_to_string(logger.log_file()).unwrap();
        assert!(content.starts_with("[2026-04-05 10:00:00] "));
    }

    #[test]
    fn test_configure_max_files_reaches_sink() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new()
            .rotation_period(RotationPeriod::Monthly)
            .build("months", temp_dir.path());
        logger.configure_max_files(1).unwrap();

        let start = Local.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        for month in 0..4 {
            logger
                .log_at(
                    Level::Info,
                    "monthly",
                    &Context::new(),
                    start + Duration::days(31 * month),
                )
                .unwrap();
        }

        let backups = list_backups(&logger.log_file(), RotationPeriod::Monthly).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0], temp_dir.path().join("months.log.2026-03"));
    }

    #[test]
    fn test_rotation_error_surfaces_from_log() {
        let temp_dir = TempDir::new().unwrap();
        let logger = LoggerBuilder::new().build("broken", temp_dir.path());

        let day_one = Local.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
        logger.log_at(Level::Info, "first", &Context::new(), day_one).unwrap();
        fs::create_dir(temp_dir.path().join("broken.log.2026-06-01")).unwrap();

        let result = logger.log_at(
            Level::Info,
            "second",
            &Context::new(),
            day_one + Duration::days(1),
        );
        assert!(matches!(result, Err(ChanlogError::Rotation(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_error_surfaces_from_log() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(full, temp_dir.path().join("full.log")).unwrap();
        let logger = LoggerBuilder::new().rotate(false).build("full", temp_dir.path());

        let result = logger.info("no space left", &Context::new());
        assert!(matches!(result, Err(ChanlogError::SinkWrite { .. })));
    }
}
