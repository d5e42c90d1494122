//! # Quantity Parsing and Scaling
//!
//! This module turns free-text ingredient quantities ("2 1/2 cups", "200g",
//! "1 can", "to taste") into an amount, a normalized unit and the remaining
//! note text, and renders scaled quantities back to text.
//!
//! ## Policy
//!
//! - Integers, decimals (`1.5`, `.5`), single simple fractions (`1/2`) and
//!   single fraction glyphs (`½`) are recognized.
//! - Ranges (`2-3`, `2 to 3`) resolve to their lower bound.
//! - Mixed fractions (`1 1/2`) are not guaranteed to parse correctly: only the
//!   leading integer is read and the trailing fraction stays in the text.
//! - A quantity without a numeric token has no amount and is passed through
//!   verbatim by every scaling operation.
//!
//! ## Usage
//!
//! ```rust
//! use meal_patch::quantity::{parse_quantity, scale_quantity_text};
//! use meal_patch::unit::Unit;
//!
//! let parsed = parse_quantity("2 cups");
//! assert_eq!(parsed.amount, Some(2.0));
//! assert_eq!(parsed.unit, Some(Unit::Cups));
//!
//! assert_eq!(scale_quantity_text("200g", 2.0), "400g");
//! assert_eq!(scale_quantity_text("to taste", 2.0), "to taste");
//! ```

use crate::unit::Unit;
use log::{debug, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

/// Regex patterns for locating the numeric token and the unit after it
static QUANTITY_PATTERNS: LazyLock<QuantityPatterns> = LazyLock::new(QuantityPatterns::new);

/// Compiled regex patterns for parsing
struct QuantityPatterns {
    /// Matches the first numeric token, including an optional range tail:
    /// "2", "1.5", ".5", "1/2", "½", "2-3", "2 to 3"
    number: Regex,
    /// Matches up to three leading words after the number: "cups", "fl oz",
    /// "cuillères à soupe"
    unit_words: Regex,
}

impl QuantityPatterns {
    fn new() -> Self {
        Self {
            number: Regex::new(
                r"(?:(?P<glyph>[½⅓⅔¼¾⅛⅜⅝⅞])|(?P<num>\d*\.?\d+)(?:/(?P<den>\d+))?)(?:\s*(?:-|–|—|to)\s*(?:[½⅓⅔¼¾⅛⅜⅝⅞]|\d*\.?\d+(?:/\d+)?))?",
            )
            .expect("Numeric token pattern should be valid"),
            unit_words: Regex::new(
                r"^\s*(?P<w1>[^\W\d_]+\.?)(?P<w2>\s+[^\W\d_]+)?(?P<w3>\s+[^\W\d_]+)?",
            )
            .expect("Unit word pattern should be valid"),
        }
    }
}

/// A numeric amount with its (optional) normalized unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Numeric amount, lower bound for ranges
    pub amount: f64,
    /// Normalized unit; `None` for bare counts such as "3"
    pub unit: Option<Unit>,
}

/// The result of parsing a raw quantity string
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuantity {
    /// Numeric amount, or `None` when the quantity is unscalable
    pub amount: Option<f64>,
    /// Normalized unit token following the amount
    pub unit: Option<Unit>,
    /// Remaining text once amount and unit are taken out
    pub note: String,
    raw: String,
    token: Option<Range<usize>>,
}

/// Errors that can occur while reading a numeric quantity
///
/// These never block a patch: callers degrade to an unscalable quantity.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    NoNumericToken,
    InvalidNumber(String),
    DivisionByZero,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NoNumericToken => write!(f, "No numeric token found"),
            ParseError::InvalidNumber(token) => write!(f, "Invalid number format: {}", token),
            ParseError::DivisionByZero => write!(f, "Division by zero in fraction"),
        }
    }
}

impl std::error::Error for ParseError {}

impl ParsedQuantity {
    /// A quantity that carries no amount and is always rendered verbatim
    pub fn unscalable(raw: &str) -> Self {
        Self {
            amount: None,
            unit: None,
            note: raw.trim().to_string(),
            raw: raw.to_string(),
            token: None,
        }
    }

    /// Whether scaling operations can change this quantity
    pub fn is_scalable(&self) -> bool {
        self.amount.is_some()
    }

    /// Amount and unit, when an amount was found
    pub fn measure(&self) -> Option<Measure> {
        self.amount.map(|amount| Measure {
            amount,
            unit: self.unit,
        })
    }

    /// The original text this quantity was parsed from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Render the quantity scaled by `factor`
    ///
    /// Only the numeric token is rewritten; the text around it is kept as is.
    /// Unscalable quantities come back unchanged.
    pub fn render_scaled(&self, factor: f64) -> String {
        match (self.amount, &self.token) {
            (Some(amount), Some(token)) => format!(
                "{}{}{}",
                &self.raw[..token.start],
                format_amount(scale_amount(amount, factor)),
                &self.raw[token.end..]
            ),
            _ => self.raw.clone(),
        }
    }
}

/// Parse a raw quantity string, degrading to an unscalable quantity on error
pub fn parse_quantity(raw: &str) -> ParsedQuantity {
    match try_parse_quantity(raw) {
        Ok(parsed) => parsed,
        Err(ParseError::NoNumericToken) => {
            trace!("No numeric token in quantity '{}'", raw);
            ParsedQuantity::unscalable(raw)
        }
        Err(e) => {
            debug!("Treating quantity '{}' as unscalable: {}", raw, e);
            ParsedQuantity::unscalable(raw)
        }
    }
}

/// Parse a raw quantity string, reporting why no amount could be read
pub fn try_parse_quantity(raw: &str) -> Result<ParsedQuantity, ParseError> {
    let captures = QUANTITY_PATTERNS
        .number
        .captures(raw)
        .ok_or(ParseError::NoNumericToken)?;
    let whole_match = captures.get(0).ok_or(ParseError::NoNumericToken)?;

    let amount = if let Some(glyph) = captures.name("glyph") {
        glyph_value(glyph.as_str()).ok_or_else(|| ParseError::InvalidNumber(glyph.as_str().to_string()))?
    } else {
        let num = captures.name("num").ok_or(ParseError::NoNumericToken)?.as_str();
        let value: f64 = num
            .parse()
            .map_err(|_| ParseError::InvalidNumber(num.to_string()))?;
        match captures.name("den") {
            Some(den) => {
                let denominator: f64 = den
                    .as_str()
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(den.as_str().to_string()))?;
                if denominator == 0.0 {
                    return Err(ParseError::DivisionByZero);
                }
                value / denominator
            }
            None => value,
        }
    };

    let prefix = raw[..whole_match.start()].trim();
    let suffix = &raw[whole_match.end()..];
    let (unit, rest) = split_unit(suffix);

    let note = match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{} {}", prefix, rest),
    };

    trace!(
        "Parsed quantity '{}' -> amount={}, unit={:?}, note='{}'",
        raw,
        amount,
        unit,
        note
    );

    Ok(ParsedQuantity {
        amount: Some(amount),
        unit,
        note,
        raw: raw.to_string(),
        token: Some(whole_match.range()),
    })
}

/// Split the longest known unit off the start of `suffix`
fn split_unit(suffix: &str) -> (Option<Unit>, &str) {
    let Some(captures) = QUANTITY_PATTERNS.unit_words.captures(suffix) else {
        return (None, suffix.trim());
    };

    let candidate_ends = ["w3", "w2", "w1"]
        .iter()
        .filter_map(|name| captures.name(name).map(|m| m.end()));

    for end in candidate_ends {
        if let Some(unit) = Unit::from_token(&suffix[..end]) {
            return (Some(unit), suffix[end..].trim());
        }
    }

    (None, suffix.trim())
}

fn glyph_value(glyph: &str) -> Option<f64> {
    let value = match glyph {
        "½" => 1.0 / 2.0,
        "⅓" => 1.0 / 3.0,
        "⅔" => 2.0 / 3.0,
        "¼" => 1.0 / 4.0,
        "¾" => 3.0 / 4.0,
        "⅛" => 1.0 / 8.0,
        "⅜" => 3.0 / 8.0,
        "⅝" => 5.0 / 8.0,
        "⅞" => 7.0 / 8.0,
        _ => return None,
    };
    Some(value)
}

/// Multiply an amount by a scale factor
pub fn scale_amount(amount: f64, factor: f64) -> f64 {
    amount * factor
}

/// Render an amount: integral values without a decimal point, others with at
/// most two decimals and no trailing zeros
pub fn format_amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.2}", rounded)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Scale the numeric part of a raw quantity string, leaving unscalable text alone
pub fn scale_quantity_text(raw: &str, factor: f64) -> String {
    parse_quantity(raw).render_scaled(factor)
}
