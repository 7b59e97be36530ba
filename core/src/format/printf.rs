//! C printf float conversion: parsing `%[flags][width][.precision][length]conv`
//! and rendering a value the way `printf` renders a promoted `double`.

use super::FormatError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags {
    pub left: bool,
    pub plus: bool,
    pub space: bool,
    pub alt: bool,
    pub zero: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Style {
    Fixed,
    Exponent,
    General,
}

/// One parsed float conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Conversion {
    pub flags: Flags,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub style: Style,
    pub upper: bool,
}

/// Pattern split around its single conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedPattern {
    pub prefix: String,
    pub conversion: Conversion,
    pub suffix: String,
}

const DEFAULT_PRECISION: usize = 6;

/// Largest accepted width or precision.
pub(crate) const MAX_FIELD: usize = 1024;

pub(crate) fn parse(pattern: &str) -> Result<ParsedPattern, FormatError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut prefix = String::new();
    let mut suffix = String::new();
    let mut conversion = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '%' {
            if conversion.is_none() {
                prefix.push(c);
            } else {
                suffix.push(c);
            }
            continue;
        }
        if chars.get(i) == Some(&'%') {
            i += 1;
            if conversion.is_none() {
                prefix.push('%');
            } else {
                suffix.push('%');
            }
            continue;
        }

        let (parsed, next) = parse_conversion(pattern, &chars, i)?;
        if conversion.is_some() {
            return Err(FormatError::MultipleConversions {
                pattern: pattern.to_string(),
            });
        }
        conversion = Some(parsed);
        i = next;
    }

    match conversion {
        Some(conversion) => Ok(ParsedPattern {
            prefix,
            conversion,
            suffix,
        }),
        None => Err(FormatError::NoConversion {
            pattern: pattern.to_string(),
        }),
    }
}

/// Parse the conversion following a `%` at `start`, returning it and the index after it.
fn parse_conversion(
    pattern: &str,
    chars: &[char],
    start: usize,
) -> Result<(Conversion, usize), FormatError> {
    let mut i = start;
    let mut flags = Flags::default();
    while let Some(&c) = chars.get(i) {
        match c {
            '-' => flags.left = true,
            '+' => flags.plus = true,
            ' ' => flags.space = true,
            '#' => flags.alt = true,
            '0' => flags.zero = true,
            _ => break,
        }
        i += 1;
    }

    let (width, next) = parse_number(chars, i);
    i = next;

    let mut precision = None;
    if chars.get(i) == Some(&'.') {
        let (digits, next) = parse_number(chars, i + 1);
        precision = Some(digits.unwrap_or(0));
        i = next;
    }

    check_field(pattern, "width", width)?;
    check_field(pattern, "precision", precision)?;

    while matches!(chars.get(i), Some('h' | 'l' | 'L')) {
        i += 1;
    }

    let Some(&conv) = chars.get(i) else {
        return Err(FormatError::Incomplete {
            pattern: pattern.to_string(),
        });
    };
    let style = match conv.to_ascii_lowercase() {
        'f' => Style::Fixed,
        'e' => Style::Exponent,
        'g' => Style::General,
        _ => {
            return Err(FormatError::UnsupportedConversion {
                pattern: pattern.to_string(),
                conversion: conv,
            })
        }
    };

    Ok((
        Conversion {
            flags,
            width,
            precision,
            style,
            upper: conv.is_ascii_uppercase(),
        },
        i + 1,
    ))
}

fn check_field(
    pattern: &str,
    field: &'static str,
    value: Option<usize>,
) -> Result<(), FormatError> {
    match value {
        Some(value) if value > MAX_FIELD => Err(FormatError::OutOfRange {
            pattern: pattern.to_string(),
            field,
            value,
            max: MAX_FIELD,
        }),
        _ => Ok(()),
    }
}

fn parse_number(chars: &[char], start: usize) -> (Option<usize>, usize) {
    let mut i = start;
    let mut value: Option<usize> = None;
    while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        i += 1;
    }
    (value, i)
}

impl Conversion {
    pub(crate) fn render(&self, out: &mut String, value: f64) {
        let negative = value.is_sign_negative();
        let finite = value.is_finite();
        let mut body = if value.is_nan() {
            "nan".to_string()
        } else if value.is_infinite() {
            "inf".to_string()
        } else {
            let precision = self.precision.unwrap_or(DEFAULT_PRECISION);
            match self.style {
                Style::Fixed => fixed(value.abs(), precision, self.flags.alt),
                Style::Exponent => exponent(value.abs(), precision, self.flags.alt),
                Style::General => general(value.abs(), precision, self.flags.alt),
            }
        };
        if self.upper {
            body.make_ascii_uppercase();
        }

        let sign = if negative {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        };

        let len = sign.len() + body.len();
        let pad = self.width.unwrap_or(0).saturating_sub(len);
        if pad == 0 {
            out.push_str(sign);
            out.push_str(&body);
        } else if self.flags.left {
            out.push_str(sign);
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(pad));
        } else if self.flags.zero && finite {
            out.push_str(sign);
            out.extend(std::iter::repeat('0').take(pad));
            out.push_str(&body);
        } else {
            out.extend(std::iter::repeat(' ').take(pad));
            out.push_str(sign);
            out.push_str(&body);
        }
    }
}

fn fixed(value: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{:.*}", precision, value);
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

/// Rust renders `1.5e3`; printf wants `1.5e+03`.
fn exponent(value: f64, precision: usize, alt: bool) -> String {
    let (mantissa, exp) = split_exponent(value, precision);
    let mut s = mantissa;
    if alt && precision == 0 {
        s.push('.');
    }
    push_exponent(&mut s, exp);
    s
}

fn general(value: f64, precision: usize, alt: bool) -> String {
    let p = precision.max(1);
    let exp = if value == 0.0 {
        0
    } else {
        split_exponent(value, p - 1).1
    };

    if exp < p as i32 && exp >= -4 {
        let mut s = format!("{:.*}", (p as i32 - 1 - exp) as usize, value);
        if alt {
            if !s.contains('.') {
                s.push('.');
            }
        } else {
            strip_fraction_zeros(&mut s);
        }
        s
    } else {
        let (mut mantissa, exp) = split_exponent(value, p - 1);
        if alt {
            if !mantissa.contains('.') {
                mantissa.push('.');
            }
        } else {
            strip_fraction_zeros(&mut mantissa);
        }
        push_exponent(&mut mantissa, exp);
        mantissa
    }
}

fn split_exponent(value: f64, precision: usize) -> (String, i32) {
    let s = format!("{:.*e}", precision, value);
    match s.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn push_exponent(s: &mut String, exp: i32) {
    s.push('e');
    s.push(if exp < 0 { '-' } else { '+' });
    s.push_str(&format!("{:02}", exp.unsigned_abs()));
}

fn strip_fraction_zeros(s: &mut String) {
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
}
