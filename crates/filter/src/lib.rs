//! Device filter rules for usb-bridge
//!
//! A compact textual rule language restricts which physical devices may be
//! redirected. Each rule names a device class, vendor id, product id and
//! BCD device revision (any of which may be a wildcard) plus an allow or
//! deny flag. Rules are evaluated in order and the first match wins.
//!
//! The text form is what travels in a filter packet and what operators put
//! in configuration:
//!
//! ```text
//! 0x08,-1,-1,-1,0|-1,-1,-1,-1,1
//! ```
//!
//! denies all mass-storage devices and allows everything else.
//!
//! # Example
//!
//! ```
//! use filter::{Rule, Verdict, check, parse_rules, rules_to_string};
//!
//! let rules = parse_rules("0x08,-1,-1,-1,0|-1,-1,-1,-1,1", ",", "|").unwrap();
//! assert_eq!(rules.len(), 2);
//!
//! // A mass-storage device (class 0x08) is denied by the first rule
//! assert_eq!(
//!     check(&rules, 0x08, 0x0781, 0x5567, 0x0100, Verdict::Deny),
//!     Verdict::Deny
//! );
//! // A HID device falls through to the allow-all rule
//! assert_eq!(
//!     check(&rules, 0x03, 0x046d, 0xc077, 0x0100, Verdict::Deny),
//!     Verdict::Allow
//! );
//!
//! let text = rules_to_string(&rules, ",", "|").unwrap();
//! assert_eq!(text, "0x08,-1,-1,-1,0|-1,-1,-1,-1,1");
//! ```

pub mod check;
pub mod error;
pub mod rules;

pub use check::{Interface, Verdict, check, check_device, first_match};
pub use error::{FilterError, Result};
pub use rules::{DEFAULT_RULE_SEPS, DEFAULT_TOKEN_SEPS, Match, Rule, parse_rules, rules_to_string};
