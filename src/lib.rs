// Library exports for chanlog

pub mod cli;
pub mod config;
pub mod error;
pub mod logs;

pub use config::{LoggerConfig, DEFAULT_CHANNEL};
pub use error::{ChanlogError, Result};
pub use logs::{ChannelRegistry, Context, Level, Logger, LoggerBuilder};
