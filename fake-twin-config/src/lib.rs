//! Configuration loader for fake-twin.
//!
//! `defaults/fake-twin.default.toml` is embedded into the binary so that the
//! documented defaults and runtime behavior stay in sync. Callers layer
//! user files and command-line overrides on top of those defaults via
//! [`Loader`] before deserializing into [`TwinConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/fake-twin.default.toml");

/// Top-level configuration consumed by the transformer and the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct TwinConfig {
    pub markers: MarkersConfig,
    pub transform: TransformConfig,
    #[serde(default)]
    pub coin: CoinConfig,
}

/// Sentinel prefixes delimiting a block of reflections.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkersConfig {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformConfig {
    pub malformed_lines: MalformedLines,
    pub index_parsing: IndexParsingMode,
}

/// Handling of lines inside a flipped block that carry no usable `h k l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedLines {
    Error,
    PassThrough,
    ZeroFill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexParsingMode {
    Lenient,
    Strict,
}

/// Per-block coin settings. Both fields are optional; with neither set the
/// coin is fair and seeded from OS entropy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoinConfig {
    pub seed: Option<u64>,
    pub force: Option<bool>,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (used for command-line flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<TwinConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
