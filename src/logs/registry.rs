use crate::config::{validate_channel, LoggerConfig};
use crate::error::Result;
use crate::logs::{Logger, LoggerBuilder};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Hands out one shared `Logger` per channel name
///
/// The registry is a strict cache: a logger lives until the registry is
/// dropped. Create one at startup and pass it to whatever needs logging.
pub struct ChannelRegistry {
    config: LoggerConfig,
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
}

impl ChannelRegistry {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            loggers: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Logger for `channel`, built from the registry defaults on first use
    pub fn get(&self, channel: &str) -> Result<Arc<Logger>> {
        self.get_with(channel, || {
            LoggerBuilder::from_options(self.config.logger_options())
        })
    }

    /// Logger for the configured default channel
    pub fn get_default(&self) -> Result<Arc<Logger>> {
        self.get(&self.config.channel)
    }

    /// Logger for `channel`, built by `make` if the channel is new
    ///
    /// `make` is not called when the channel already exists.
    ///
    /// # Arguments
    /// * `channel` - Channel name; must be usable as a file stem
    /// * `make` - Produces the builder for a channel seen for the first time
    ///
    /// # Returns
    /// * `Ok(Arc<Logger>)` - The channel's only logger, shared by every caller
    /// * `Err(ChanlogError::InvalidChannel)` - If the name cannot be a file name
    pub fn get_with<F>(&self, channel: &str, make: F) -> Result<Arc<Logger>>
    where
        F: FnOnce() -> LoggerBuilder,
    {
        validate_channel(channel)?;

        if let Some(logger) = self.loggers.read().get(channel) {
            return Ok(Arc::clone(logger));
        }

        let mut loggers = self.loggers.write();
        // Another thread may have won the race between the two locks
        if let Some(logger) = loggers.get(channel) {
            return Ok(Arc::clone(logger));
        }

        let log_dir = self.config.resolve_log_dir();
        let logger = Arc::new(make().build(channel, log_dir));
        loggers.insert(channel.to_string(), Arc::clone(&logger));

        tracing::info!(channel, "Registered channel");
        Ok(logger)
    }

    /// Check if a channel has been created
    pub fn contains(&self, channel: &str) -> bool {
        self.loggers.read().contains_key(channel)
    }

    /// Get the number of channels
    pub fn len(&self) -> usize {
        self.loggers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.read().is_empty()
    }

    /// Names of all channels, sorted
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Flush every logger's sink
    pub fn flush_all(&self) -> Result<()> {
        let loggers: Vec<Arc<Logger>> = self.loggers.read().values().cloned().collect();
        for logger in loggers {
            logger.flush()?;
        }
        Ok(())
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}
