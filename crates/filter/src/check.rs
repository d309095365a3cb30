//! Rule evaluation
//!
//! Scanning is first-match-wins over the rule order, one linear pass, no
//! backtracking. [`check`] decides a single (class, vendor, product, bcd)
//! tuple; [`check_device`] decides a whole device by also walking its
//! interfaces, the way a redirection host vets a device before announcing
//! it to the peer.

use crate::rules::Rule;

/// USB HID class code.
const HID_CLASS: u8 = 0x03;
/// HID boot-interface subclass.
const HID_SUBCLASS_BOOT: u8 = 0x01;

/// Outcome of a filter decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

/// Class/subclass/protocol triple of one device interface, as carried in an
/// interface-info packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interface {
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
}

/// Find the first rule matching the candidate tuple, if any.
pub fn first_match(
    rules: &[Rule],
    class: u8,
    vendor: u16,
    product: u16,
    bcd: u16,
) -> Option<Verdict> {
    rules
        .iter()
        .find(|rule| rule.matches(class, vendor, product, bcd))
        .map(|rule| if rule.allow { Verdict::Allow } else { Verdict::Deny })
}

/// Decide one candidate tuple, falling back to `default` when no rule
/// matches. Deny is the conservative default for allow-list use.
pub fn check(
    rules: &[Rule],
    class: u8,
    vendor: u16,
    product: u16,
    bcd: u16,
    default: Verdict,
) -> Verdict {
    first_match(rules, class, vendor, product, bcd).unwrap_or(default)
}

/// Decide a whole device: the device tuple and every interface must pass.
///
/// A device class of zero means "defined at the interface level" and is not
/// itself checked. Interfaces of class HID with a non-boot subclass are
/// skipped unless `check_non_boot_hid` is set; they are driven by the
/// redirecting side's input stack and rarely what a storage- or
/// vendor-class rule is aimed at.
pub fn check_device(
    rules: &[Rule],
    device_class: u8,
    vendor: u16,
    product: u16,
    bcd: u16,
    interfaces: &[Interface],
    check_non_boot_hid: bool,
    default: Verdict,
) -> Verdict {
    if device_class != 0 && check(rules, device_class, vendor, product, bcd, default) == Verdict::Deny
    {
        return Verdict::Deny;
    }

    for itf in interfaces {
        if !check_non_boot_hid && itf.class == HID_CLASS && itf.subclass != HID_SUBCLASS_BOOT {
            continue;
        }
        if check(rules, itf.class, vendor, product, bcd, default) == Verdict::Deny {
            return Verdict::Deny;
        }
    }

    Verdict::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::parse_rules;

    fn rules(text: &str) -> Vec<Rule> {
        parse_rules(text, ",", "|").expect("test rules parse")
    }

    #[test]
    fn test_first_match_wins_over_later_rules() {
        // A deny for one vendor shadows the allow-all that follows
        let ruleset = rules("-1,0x0781,-1,-1,0|-1,-1,-1,-1,1");
        assert_eq!(
            first_match(&ruleset, 8, 0x0781, 0x5567, 0x0100),
            Some(Verdict::Deny)
        );
        assert_eq!(
            first_match(&ruleset, 8, 0x046d, 0x5567, 0x0100),
            Some(Verdict::Allow)
        );

        // Reversed order flips the decision
        let reversed = rules("-1,-1,-1,-1,1|-1,0x0781,-1,-1,0");
        assert_eq!(
            first_match(&reversed, 8, 0x0781, 0x5567, 0x0100),
            Some(Verdict::Allow)
        );
    }

    #[test]
    fn test_no_match_uses_default() {
        let rules = rules("0x03,-1,-1,-1,1");
        assert_eq!(
            check(&rules, 0x08, 0x1234, 0x5678, 0, Verdict::Deny),
            Verdict::Deny
        );
        assert_eq!(
            check(&rules, 0x08, 0x1234, 0x5678, 0, Verdict::Allow),
            Verdict::Allow
        );
        assert_eq!(first_match(&rules, 0x08, 0x1234, 0x5678, 0), None);
    }

    #[test]
    fn test_bcd_field_matches() {
        let rules = rules("-1,-1,-1,0x0100,0|-1,-1,-1,-1,1");
        assert_eq!(
            check(&rules, 0, 1, 2, 0x0100, Verdict::Deny),
            Verdict::Deny
        );
        assert_eq!(
            check(&rules, 0, 1, 2, 0x0200, Verdict::Deny),
            Verdict::Allow
        );
    }

    #[test]
    fn test_device_check_walks_interfaces() {
        // Deny mass-storage interfaces, allow the rest
        let rules = rules("0x08,-1,-1,-1,0|-1,-1,-1,-1,1");

        // Composite device: class 0, one storage interface among others
        let interfaces = [
            Interface {
                class: 0x08,
                subclass: 0x06,
                protocol: 0x50,
            },
            Interface {
                class: 0x0e,
                ..Default::default()
            },
        ];
        assert_eq!(
            check_device(&rules, 0, 0x1234, 0x5678, 0, &interfaces, false, Verdict::Deny),
            Verdict::Deny
        );

        // Without the storage interface the device passes
        assert_eq!(
            check_device(&rules, 0, 0x1234, 0x5678, 0, &interfaces[1..], false, Verdict::Deny),
            Verdict::Allow
        );
    }

    #[test]
    fn test_device_class_checked_when_nonzero() {
        let rules = rules("0x08,-1,-1,-1,0|-1,-1,-1,-1,1");
        assert_eq!(
            check_device(&rules, 0x08, 0x1234, 0x5678, 0, &[], false, Verdict::Deny),
            Verdict::Deny
        );
        assert_eq!(
            check_device(&rules, 0x07, 0x1234, 0x5678, 0, &[], false, Verdict::Deny),
            Verdict::Allow
        );
    }

    #[test]
    fn test_non_boot_hid_interfaces_skipped_by_default() {
        // Only an allow rule for boot keyboards; everything else denied
        let rules = rules("0x03,-1,-1,-1,1");
        let non_boot_hid = [Interface {
            class: 0x03,
            subclass: 0x00,
            protocol: 0x00,
        }];

        // Skipped by default: the interface is not checked, device passes
        assert_eq!(
            check_device(&rules, 0, 0x046d, 0xc077, 0, &non_boot_hid, false, Verdict::Deny),
            Verdict::Allow
        );

        // With the flag the interface is checked and allowed by the rule
        assert_eq!(
            check_device(&rules, 0, 0x046d, 0xc077, 0, &non_boot_hid, true, Verdict::Deny),
            Verdict::Allow
        );

        // A boot HID interface is always checked
        let boot_hid = [Interface {
            class: 0x03,
            subclass: 0x01,
            protocol: 0x01,
        }];
        assert_eq!(
            check_device(&rules, 0, 0x046d, 0xc077, 0, &boot_hid, false, Verdict::Deny),
            Verdict::Allow
        );
    }
}
