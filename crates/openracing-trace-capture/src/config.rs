//! Session configuration

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, CaptureResult};

/// Samples held per producer before its buffer is handed to the shared list
///
/// Bigger buffers mean less contention on the list lock, but longer flushes
/// and more memory per producer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Value written into every event's `args.tool` field by default
pub const DEFAULT_TOOL_NAME: &str = "openracing-trace-capture";

/// How category and name labels are written into the JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelEncoding {
    /// Escape quotes, backslashes and control characters
    #[default]
    Escaped,
    /// Copy labels byte for byte. Callers must supply JSON-safe labels.
    Verbatim,
}

/// Trace capture configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Samples per producer buffer
    pub buffer_capacity: usize,
    /// Value of the `args.tool` field in every event
    pub tool_name: String,
    /// Label encoding used by the serializer
    pub label_encoding: LabelEncoding,
    /// Track Begin/End pairing across flushes and report unmatched events
    pub validate_pairing: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            label_encoding: LabelEncoding::default(),
            validate_pairing: false,
        }
    }
}

impl CaptureConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer capacity is zero or the tool name is
    /// empty or would need JSON escaping.
    pub fn validate(&self) -> CaptureResult<()> {
        if self.buffer_capacity == 0 {
            return Err(CaptureError::invalid_configuration(
                "buffer_capacity must be greater than 0",
            ));
        }
        if self.tool_name.is_empty() {
            return Err(CaptureError::invalid_configuration(
                "tool_name must not be empty",
            ));
        }
        if !crate::wire::is_json_safe(&self.tool_name) {
            return Err(CaptureError::invalid_configuration(
                "tool_name must not contain quotes, backslashes or control characters",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }
}

/// Builder for `CaptureConfig`
#[derive(Debug, Default)]
pub struct CaptureConfigBuilder {
    config: CaptureConfig,
}

impl CaptureConfigBuilder {
    /// Set the number of samples per producer buffer
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Set the `args.tool` value
    #[must_use]
    pub fn tool_name(mut self, name: impl Into<String>) -> Self {
        self.config.tool_name = name.into();
        self
    }

    /// Set the label encoding
    #[must_use]
    pub fn label_encoding(mut self, encoding: LabelEncoding) -> Self {
        self.config.label_encoding = encoding;
        self
    }

    /// Enable or disable Begin/End pairing diagnostics
    #[must_use]
    pub fn validate_pairing(mut self, enabled: bool) -> Self {
        self.config.validate_pairing = enabled;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> CaptureResult<CaptureConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
