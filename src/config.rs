//! Configuration file parsing
//!
//! Bundles `WriterOptions` and `TextCodecProperties` defaults plus a locale
//! tag into one `serde`-deserializable `EngineConfig`, loadable from TOML.
//! Nothing in this crate reads `std::env::args`; a CLI wrapper built on top
//! of this crate is responsible for turning flags into an `EngineConfig`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::codec::TextCodecProperties;
use crate::txlog::{WriterFlags, WriterOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub cache_flush_threshold: i64,
    pub cache_flush_min_wait_ms: u64,
    pub cache_flush_max_wait_ms: u64,
    pub flush_count: usize,
    pub allow_requeue: bool,
    pub throw_exceptions: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        let d = WriterOptions::default();
        Self {
            cache_flush_threshold: d.cache_flush_threshold,
            cache_flush_min_wait_ms: d.cache_flush_min_wait.as_millis() as u64,
            cache_flush_max_wait_ms: d.cache_flush_max_wait.as_millis() as u64,
            flush_count: d.flush_count,
            allow_requeue: d.flags.contains(WriterFlags::ALLOW_REQUEUE),
            throw_exceptions: d.flags.contains(WriterFlags::THROW_EXCEPTIONS),
        }
    }
}

impl WriterConfig {
    pub fn to_writer_options(&self) -> WriterOptions {
        let mut flags = WriterFlags::empty();
        if self.allow_requeue {
            flags |= WriterFlags::ALLOW_REQUEUE;
        }
        if self.throw_exceptions {
            flags |= WriterFlags::THROW_EXCEPTIONS;
        }
        WriterOptions {
            cache_flush_threshold: self.cache_flush_threshold,
            cache_flush_min_wait: Duration::from_millis(self.cache_flush_min_wait_ms),
            cache_flush_max_wait: Duration::from_millis(self.cache_flush_max_wait_ms),
            flush_count: self.flush_count,
            flags,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextCodecConfig {
    pub separator: char,
    pub string_marker: Option<char>,
    pub date_time_format: String,
    pub save_defaults: bool,
    pub no_header: bool,
}

impl Default for TextCodecConfig {
    fn default() -> Self {
        let d = TextCodecProperties::default();
        Self {
            separator: d.separator,
            string_marker: d.string_marker,
            date_time_format: d.date_time_format,
            save_defaults: d.save_defaults,
            no_header: d.no_header,
        }
    }
}

impl TextCodecConfig {
    pub fn to_properties(&self) -> TextCodecProperties {
        TextCodecProperties {
            separator: self.separator,
            string_marker: self.string_marker,
            date_time_format: self.date_time_format.clone(),
            save_defaults: self.save_defaults,
            no_header: self.no_header,
        }
    }
}

fn default_culture() -> String {
    "en-US".to_string()
}

/// Top-level configuration an embedding application may load from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Locale tag used for culture-aware decimal/float/date-time formatting.
    #[serde(default = "default_culture")]
    pub culture: String,

    pub writer: WriterConfig,
    pub text_codec: TextCodecConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            culture: default_culture(),
            writer: WriterConfig::default(),
            text_codec: TextCodecConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.text_codec.string_marker == Some(self.text_codec.separator) {
            return Err(ConfigError::Validation(
                "text_codec.string_marker cannot equal text_codec.separator".into(),
            ));
        }
        if self.writer.flush_count == 0 {
            return Err(ConfigError::Validation(
                "writer.flush_count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
