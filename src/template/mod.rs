//! Block text generators.
//!
//! These produce the stanza text the patcher splices in. They are pure
//! string builders — no I/O — and emit the same line format the scanner and
//! validator read, so a patched file stays scannable.

pub mod block;
pub mod destination;
pub mod rule;
pub mod tax;

pub use block::BlockBuilder;
pub use destination::{folder_destination, printer_destination, PrinterDestination};
pub use rule::{commitment_rule, rule_component, CommitmentRule, RuleComponent};
pub use tax::consolidated_tax_rules;

/// Zero-pad 3-digit identifiers to 4; everything else passes through.
///
/// Store and company numbers are 4 digits in destination paths but operators
/// habitually type 3.
pub(crate) fn pad_identifier(identifier: &str) -> String {
    if identifier.len() == 3 {
        format!("0{identifier}")
    } else {
        identifier.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_digit_identifiers_get_a_leading_zero() {
        assert_eq!(pad_identifier("147"), "0147");
        assert_eq!(pad_identifier("1234"), "1234");
        assert_eq!(pad_identifier("12"), "12");
    }
}
