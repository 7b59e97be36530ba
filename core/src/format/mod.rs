//! Float rendering for `Float` and `Matrix` records.
//!
//! Patterns use C printf syntax and must hold exactly one float conversion,
//! e.g. `"%.3f"`, `"%8.2e"` or `"v=%g"`.

mod printf;

use std::fmt;
use std::str::FromStr;

/// Pattern used when none is configured.
pub const DEFAULT_FLOAT_FORMAT: &str = "%.3f";

/// Errors raised while validating a float pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Float format {pattern:?} contains no numeric conversion")]
    NoConversion { pattern: String },
    #[error("Float format {pattern:?} contains more than one numeric conversion")]
    MultipleConversions { pattern: String },
    #[error("Float format {pattern:?} uses unsupported conversion '%{conversion}'")]
    UnsupportedConversion { pattern: String, conversion: char },
    #[error("Float format {pattern:?} ends inside a conversion")]
    Incomplete { pattern: String },
    #[error("Float format {pattern:?} has {field} {value}, above the limit of {max}")]
    OutOfRange {
        pattern: String,
        field: &'static str,
        value: usize,
        max: usize,
    },
}

/// A validated printf-style float pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatFormat {
    pattern: String,
    parsed: printf::ParsedPattern,
}

impl FloatFormat {
    pub fn parse(pattern: &str) -> Result<Self, FormatError> {
        let parsed = printf::parse(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            parsed,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Append `value` rendered through the pattern, surrounding text included.
    pub fn write(&self, out: &mut String, value: f32) {
        out.push_str(&self.parsed.prefix);
        self.parsed.conversion.render(out, value as f64);
        out.push_str(&self.parsed.suffix);
    }

    pub fn format(&self, value: f32) -> String {
        let mut out = String::new();
        self.write(&mut out, value);
        out
    }
}

impl Default for FloatFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_FLOAT_FORMAT.to_string(),
            parsed: printf::ParsedPattern {
                prefix: String::new(),
                conversion: printf::Conversion {
                    flags: printf::Flags::default(),
                    width: None,
                    precision: Some(3),
                    style: printf::Style::Fixed,
                    upper: false,
                },
                suffix: String::new(),
            },
        }
    }
}

impl FromStr for FloatFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FloatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_three_decimals() {
        let fmt = FloatFormat::default();
        assert_eq!(fmt.pattern(), "%.3f");
        assert_eq!(fmt.format(1.0), "1.000");
        assert_eq!(fmt.format(-2.5), "-2.500");
        assert_eq!(fmt, FloatFormat::parse(DEFAULT_FLOAT_FORMAT).unwrap());
    }

    #[test]
    fn test_float_promoted_to_double() {
        let fmt = FloatFormat::parse("%.10f").unwrap();
        assert_eq!(fmt.format(0.1), "0.1000000015");
    }

    #[test]
    fn test_surrounding_text_is_kept() {
        let fmt: FloatFormat = "<%.1f>".parse().unwrap();
        assert_eq!(fmt.format(4.3), "<4.3>");
        assert_eq!(fmt.to_string(), "<%.1f>");
    }

    #[test]
    fn test_error_messages_name_the_pattern() {
        let err = FloatFormat::parse("%s").unwrap_err();
        assert!(err.to_string().contains("\"%s\""));
    }
}
