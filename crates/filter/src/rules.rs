//! Rule model, parser and serializer
//!
//! The grammar is configurable at the separator level: a rule set is split
//! on any character of the rule-separator set, and each rule's five fields
//! on any character of the token-separator set. Serialization always emits
//! the first character of each set, so parsing normalizes separator choice.

use crate::error::{FilterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Token separators accepted by default: fields split on commas.
pub const DEFAULT_TOKEN_SEPS: &str = ",";

/// Rule separators accepted by default: rules split on pipes.
pub const DEFAULT_RULE_SEPS: &str = "|";

/// A single filter field: either a wildcard or one exact value.
///
/// The textual form uses `-1` for the wildcard; the enum keeps the full
/// value range of `T` available instead of reserving a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Match<T> {
    /// Matches any value
    Any,
    /// Matches exactly this value
    Exact(T),
}

impl<T: PartialEq + Copy> Match<T> {
    /// True if `value` satisfies this field.
    pub fn accepts(&self, value: T) -> bool {
        match self {
            Match::Any => true,
            Match::Exact(expected) => *expected == value,
        }
    }
}

/// One filter rule: four match fields and a verdict flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// USB class the rule applies to (device or interface class)
    pub device_class: Match<u8>,
    /// USB vendor id
    pub vendor_id: Match<u16>,
    /// USB product id
    pub product_id: Match<u16>,
    /// BCD device revision
    pub device_version_bcd: Match<u16>,
    /// Verdict when this rule is the first match
    pub allow: bool,
}

impl Rule {
    /// True if every non-wildcard field equals the candidate's value.
    pub fn matches(&self, class: u8, vendor: u16, product: u16, bcd: u16) -> bool {
        self.device_class.accepts(class)
            && self.vendor_id.accepts(vendor)
            && self.product_id.accepts(product)
            && self.device_version_bcd.accepts(bcd)
    }
}

/// Parse a field value: `-1`, decimal, or `0x`-prefixed hex.
///
/// Whole-token and locale-independent; trailing junk is an error.
fn parse_value(token: &str) -> Option<i64> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        token.parse::<i64>().ok()
    }
}

fn parse_match(token: &str, max: i64) -> Result<Match<i64>> {
    match parse_value(token) {
        Some(-1) => Ok(Match::Any),
        Some(value) if (0..=max).contains(&value) => Ok(Match::Exact(value)),
        _ => Err(FilterError::InvalidRules),
    }
}

fn parse_rule(text: &str, token_seps: &str) -> Result<Rule> {
    let tokens: Vec<&str> = text.split(|c| token_seps.contains(c)).collect();
    if tokens.len() != 5 {
        return Err(FilterError::InvalidRules);
    }

    let device_class = match parse_match(tokens[0], 0xff)? {
        Match::Any => Match::Any,
        Match::Exact(v) => Match::Exact(v as u8),
    };
    let vendor_id = parse_u16(tokens[1])?;
    let product_id = parse_u16(tokens[2])?;
    let device_version_bcd = parse_u16(tokens[3])?;
    let allow = match parse_value(tokens[4]) {
        Some(0) => false,
        Some(1) => true,
        _ => return Err(FilterError::InvalidRules),
    };

    Ok(Rule {
        device_class,
        vendor_id,
        product_id,
        device_version_bcd,
        allow,
    })
}

fn parse_u16(token: &str) -> Result<Match<u16>> {
    Ok(match parse_match(token, 0xffff)? {
        Match::Any => Match::Any,
        Match::Exact(v) => Match::Exact(v as u16),
    })
}

/// Parse a rule set out of its text form.
///
/// Empty rules (consecutive, leading or trailing rule separators) are
/// skipped silently. Any malformed rule fails the whole parse with
/// [`FilterError::InvalidRules`] and no partial result.
pub fn parse_rules(text: &str, token_seps: &str, rule_seps: &str) -> Result<Vec<Rule>> {
    if token_seps.is_empty() || rule_seps.is_empty() {
        return Err(FilterError::InvalidSeparators);
    }

    let mut rules = Vec::new();
    for segment in text.split(|c| rule_seps.contains(c)) {
        if segment.is_empty() {
            continue;
        }
        rules.push(parse_rule(segment, token_seps)?);
    }
    Ok(rules)
}

/// Render a rule set back to text.
///
/// The canonical form uses the first character of each separator set, never
/// emits empty rules, and carries no trailing separator; exact values print
/// as `0x`-hex and wildcards as `-1`, so `parse(serialize(r))` reproduces
/// `r` and re-serializing is idempotent.
pub fn rules_to_string(rules: &[Rule], token_seps: &str, rule_seps: &str) -> Result<String> {
    let token_sep = token_seps.chars().next().ok_or(FilterError::InvalidSeparators)?;
    let rule_sep = rule_seps.chars().next().ok_or(FilterError::InvalidSeparators)?;

    let mut out = String::new();
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            out.push(rule_sep);
        }
        match rule.device_class {
            Match::Any => out.push_str("-1"),
            Match::Exact(v) => {
                let _ = write!(out, "0x{:02x}", v);
            }
        }
        for field in [rule.vendor_id, rule.product_id, rule.device_version_bcd] {
            out.push(token_sep);
            match field {
                Match::Any => out.push_str("-1"),
                Match::Exact(v) => {
                    let _ = write!(out, "0x{:04x}", v);
                }
            }
        }
        out.push(token_sep);
        out.push(if rule.allow { '1' } else { '0' });
    }
    Ok(out)
}
