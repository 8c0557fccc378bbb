// Logs module - Channel loggers, formatting and rotating sinks

mod format;
mod level;
mod logger;
mod process_id;
mod registry;
mod sink;

pub use format::{
    format_record, serialize_context, stringify_value, Context, PlaceholderRenderer, Record,
    TemplateRenderer, TIMESTAMP_FORMAT,
};
pub use level::Level;
pub use logger::{log_file_path, Logger, LoggerBuilder, LoggerOptions, DEFAULT_MAX_FILES};
pub use process_id::generate_process_identifier;
pub use registry::ChannelRegistry;
pub use sink::{list_backups, FileSink, RotatingFileSink, RotationPeriod, Sink};
