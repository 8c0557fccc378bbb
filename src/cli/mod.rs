// CLI module - Write records and inspect channel files from the shell

mod output;

use crate::config::LoggerConfig;
use crate::error::{ChanlogError, Result};
use crate::logs::{list_backups, ChannelRegistry, Context, Level, LoggerBuilder};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// chanlog - channel-keyed rotating file logger
#[derive(Parser)]
#[command(name = "chanlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SettingsArgs {
    /// Configuration file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log directory (overrides config and CHANLOG_PATH)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one record to a channel
    Log {
        /// Message template; {key} placeholders are filled from --context
        message: String,

        /// Channel name (defaults to the configured channel)
        #[arg(short, long)]
        channel: Option<String>,

        /// Severity
        #[arg(short, long, default_value = "info")]
        level: Level,

        /// Context values (KEY=VALUE format, VALUE may be JSON)
        #[arg(short = 'x', long = "context")]
        context: Vec<String>,

        /// Append the context block to the line
        #[arg(long)]
        with_context: bool,

        /// Write to a plain file instead of a rotating one
        #[arg(long)]
        no_rotate: bool,

        /// Rotated files to keep
        #[arg(long)]
        max_files: Option<usize>,
    },

    /// List the active file and rotated backups of a channel
    Files {
        /// Channel name (defaults to the configured channel)
        #[arg(short, long)]
        channel: Option<String>,
    },

    /// Show the resolved configuration
    Config,
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    fn execute(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.command {
            Commands::Log {
                message,
                channel,
                level,
                context,
                with_context,
                no_rotate,
                max_files,
            } => {
                let context = parse_context(context)?;
                let channel = channel.clone().unwrap_or_else(|| config.channel.clone());
                let registry = ChannelRegistry::new(config);

                let logger = registry.get_with(&channel, || {
                    let mut builder =
                        LoggerBuilder::from_options(registry.config().logger_options());
                    if *with_context {
                        builder = builder.context(true);
                    }
                    if *no_rotate {
                        builder = builder.rotate(false);
                    }
                    if let Some(max_files) = max_files {
                        builder = builder.max_files(*max_files);
                    }
                    builder
                })?;

                logger.log(*level, message, &context)?;
                logger.flush()?;

                output::print_success_msg(&format!(
                    "Wrote {} record to {}",
                    level,
                    logger.log_file().display()
                ));
                Ok(())
            }

            Commands::Files { channel } => {
                let channel = channel.clone().unwrap_or_else(|| config.channel.clone());
                crate::config::validate_channel(&channel)?;

                let log_file = crate::logs::log_file_path(&config.resolve_log_dir(), &channel);
                let mut files = list_backups(&log_file, config.rotation)?;
                if log_file.exists() {
                    files.push(log_file);
                }

                output::print_file_table(&channel, &files);
                Ok(())
            }

            Commands::Config => {
                output::print_config(&config);
                Ok(())
            }
        }
    }

    /// Config file, then CHANLOG_PATH, then --log-dir
    fn load_config(&self) -> Result<LoggerConfig> {
        let config = match self.settings.config {
            Some(ref path) => LoggerConfig::from_file(path)?,
            None => LoggerConfig::default(),
        };

        let mut config = config.with_env();
        if let Some(ref dir) = self.settings.log_dir {
            config.log_dir = Some(dir.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse context values from KEY=VALUE format
///
/// Values that parse as JSON keep their type; anything else is a string.
fn parse_context(pairs: &[String]) -> Result<Context> {
    let mut context = Context::new();

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ChanlogError::ConfigError(format!(
                "Invalid context format: '{}'. Expected KEY=VALUE",
                pair
            )));
        };

        if key.is_empty() {
            return Err(ChanlogError::ConfigError(format!(
                "Empty context key in '{}'",
                pair
            )));
        }

        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        context.insert(key.to_string(), value);
    }

    Ok(context)
}
