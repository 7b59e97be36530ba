//! Capture configuration.

use serde::{Deserialize, Serialize};

use super::PrintfError;
use crate::format::{FloatFormat, DEFAULT_FLOAT_FORMAT};
use crate::wire::DEFAULT_CAPACITY_WORDS;

/// Settings for a [`super::ShaderPrintf`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintfConfig {
    /// Device buffer size in 32-bit words, header included.
    pub capacity_words: usize,
    /// Decode only the first capture and skip drains afterwards.
    pub decode_once: bool,
    /// printf-style pattern for `Float` and `Matrix` values.
    pub float_format: String,
    /// End-of-record character at the start of every pass; `'\0'` appends nothing.
    pub initial_suffix: char,
}

impl Default for PrintfConfig {
    fn default() -> Self {
        Self {
            capacity_words: DEFAULT_CAPACITY_WORDS,
            decode_once: true,
            float_format: DEFAULT_FLOAT_FORMAT.to_string(),
            initial_suffix: '\n',
        }
    }
}

impl PrintfConfig {
    pub fn from_json(json: &str) -> Result<Self, PrintfError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PrintfError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parsed float pattern.
    pub fn parsed_float_format(&self) -> Result<FloatFormat, PrintfError> {
        Ok(FloatFormat::parse(&self.float_format)?)
    }

    /// The suffix as the single byte the wire format carries.
    pub fn suffix_byte(&self) -> Result<u8, PrintfError> {
        u8::try_from(self.initial_suffix).map_err(|_| PrintfError::InvalidSuffix(self.initial_suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PrintfConfig::default();
        assert_eq!(config.capacity_words, 1024 * 1024);
        assert!(config.decode_once);
        assert_eq!(config.float_format, "%.3f");
        assert_eq!(config.suffix_byte().unwrap(), b'\n');
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = PrintfConfig::from_json(r#"{ "decode_once": false, "float_format": "%g" }"#)
            .unwrap();
        assert!(!config.decode_once);
        assert_eq!(config.float_format, "%g");
        assert_eq!(config.capacity_words, DEFAULT_CAPACITY_WORDS);
    }

    #[test]
    fn test_json_round_trip() {
        let config = PrintfConfig {
            capacity_words: 256,
            initial_suffix: '|',
            ..Default::default()
        };
        let parsed = PrintfConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PrintfConfig::from_json("{ \"capacity_words\": -1 }"),
            Err(PrintfError::Config(_))
        ));
        let config = PrintfConfig {
            initial_suffix: 'λ',
            ..Default::default()
        };
        assert!(matches!(config.suffix_byte(), Err(PrintfError::InvalidSuffix('λ'))));
        let config = PrintfConfig {
            float_format: "%d".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.parsed_float_format(),
            Err(PrintfError::Format(_))
        ));
    }
}
