//! Money, percentages and the price rounding rule.
//!
//! Amounts are kept in the currency's smallest unit (e.g. cents) so that cart
//! and order arithmetic is exact. Rounding happens in exactly one place:
//! [`Money::percent_off`].

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Non-negative amount in the smallest currency unit.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    /// Line total for `quantity` units.
    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(u64::from(quantity)).map(Money)
    }

    /// Price after taking `percent` off, rounded half-up by `rounding`.
    ///
    /// A zero percent returns the amount untouched, and rounding never lifts the
    /// result above the original amount.
    pub fn percent_off(self, percent: Percent, rounding: PriceRounding) -> Money {
        if percent.is_zero() {
            return self;
        }

        let remaining = u128::from(100 - percent.value());
        let scaled = u128::from(self.0) * remaining;
        let rounded = match rounding {
            PriceRounding::MinorUnit => (scaled + 50) / 100,
            PriceRounding::WholeUnit => (scaled + 5_000) / 10_000 * 100,
        };

        // scaled / 100 <= self.0, so the only way past u64 is the whole-unit bump.
        let rounded = u64::try_from(rounded).unwrap_or(u64::MAX);
        Money(rounded.min(self.0))
    }

    /// Sum an iterator of amounts, `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Whole percentage in `0..=100`.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const MAX: Percent = Percent(100);

    pub fn new(value: u8) -> DomainResult<Self> {
        if value > 100 {
            return Err(DomainError::validation(format!(
                "percent must be between 0 and 100 (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u8> for Percent {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Percent::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl core::fmt::Display for Percent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Rounding applied to every discounted price.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceRounding {
    /// Nearest minor unit (cent), half-up.
    #[default]
    MinorUnit,
    /// Nearest whole currency unit (100 minor units), half-up.
    WholeUnit,
}

impl FromStr for PriceRounding {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" | "minor_unit" | "cent" => Ok(PriceRounding::MinorUnit),
            "whole" | "whole_unit" => Ok(PriceRounding::WholeUnit),
            other => Err(DomainError::validation(format!(
                "unknown price rounding '{other}' (expected 'minor' or 'whole')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(v: u8) -> Percent {
        Percent::new(v).unwrap()
    }

    #[test]
    fn percent_rejects_values_above_hundred() {
        assert!(Percent::new(100).is_ok());
        match Percent::new(101) {
            Err(DomainError::Validation(_)) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn percent_deserialization_is_validated() {
        let ok: Percent = serde_json::from_str("25").unwrap();
        assert_eq!(ok.value(), 25);
        assert!(serde_json::from_str::<Percent>("150").is_err());
    }

    #[test]
    fn percent_off_minor_unit_examples() {
        let r = PriceRounding::MinorUnit;
        assert_eq!(Money::from_minor(1000).percent_off(pct(20), r), Money::from_minor(800));
        assert_eq!(Money::from_minor(500).percent_off(pct(15), r), Money::from_minor(425));
        assert_eq!(Money::from_minor(300).percent_off(Percent::ZERO, r), Money::from_minor(300));
    }

    #[test]
    fn percent_off_rounds_half_up_to_the_cent() {
        // 1999 * 0.85 = 1699.15 -> 1699
        assert_eq!(
            Money::from_minor(1999).percent_off(pct(15), PriceRounding::MinorUnit),
            Money::from_minor(1699)
        );
        // 1999 * 0.5 = 999.5 -> 1000
        assert_eq!(
            Money::from_minor(1999).percent_off(pct(50), PriceRounding::MinorUnit),
            Money::from_minor(1000)
        );
    }

    #[test]
    fn percent_off_whole_unit_rounds_to_hundreds() {
        // 1999 * 0.85 = 1699.15 -> 1700
        assert_eq!(
            Money::from_minor(1999).percent_off(pct(15), PriceRounding::WholeUnit),
            Money::from_minor(1700)
        );
        // 1249 * 0.9 = 1124.1 -> 1100
        assert_eq!(
            Money::from_minor(1249).percent_off(pct(10), PriceRounding::WholeUnit),
            Money::from_minor(1100)
        );
    }

    #[test]
    fn whole_unit_rounding_never_exceeds_original() {
        assert_eq!(
            Money::from_minor(99).percent_off(pct(1), PriceRounding::WholeUnit),
            Money::from_minor(99)
        );
    }

    #[test]
    fn full_discount_is_free() {
        assert_eq!(
            Money::from_minor(4_500).percent_off(Percent::MAX, PriceRounding::MinorUnit),
            Money::ZERO
        );
    }

    #[test]
    fn arithmetic_is_checked() {
        assert_eq!(Money::from_minor(u64::MAX).checked_add(Money::from_minor(1)), None);
        assert_eq!(Money::from_minor(250).checked_mul(3), Some(Money::from_minor(750)));
        assert_eq!(Money::from_minor(5).saturating_sub(Money::from_minor(9)), Money::ZERO);
        assert_eq!(
            Money::checked_sum([Money::from_minor(1), Money::from_minor(2)]),
            Some(Money::from_minor(3))
        );
    }

    #[test]
    fn displays_as_major_units() {
        assert_eq!(Money::from_minor(123_405).to_string(), "1234.05");
        assert_eq!(pct(15).to_string(), "15%");
    }

    #[test]
    fn rounding_parses_from_config_strings() {
        assert_eq!("minor".parse::<PriceRounding>().unwrap(), PriceRounding::MinorUnit);
        assert_eq!(" Whole ".parse::<PriceRounding>().unwrap(), PriceRounding::WholeUnit);
        assert!("banker".parse::<PriceRounding>().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: a discounted price never exceeds the original.
            #[test]
            fn percent_off_never_increases_price(
                minor in 0u64..10_000_000_000,
                p in 0u8..=100,
                whole in any::<bool>()
            ) {
                let rounding = if whole { PriceRounding::WholeUnit } else { PriceRounding::MinorUnit };
                let base = Money::from_minor(minor);
                let out = base.percent_off(Percent::new(p).unwrap(), rounding);
                prop_assert!(out <= base);
            }

            /// Property: minor-unit rounding is within half a cent of the exact value.
            #[test]
            fn minor_rounding_is_within_half_a_cent(
                minor in 0u64..10_000_000_000,
                p in 0u8..=100
            ) {
                let out = Money::from_minor(minor)
                    .percent_off(Percent::new(p).unwrap(), PriceRounding::MinorUnit);
                let exact_times_100 = u128::from(minor) * u128::from(100 - p);
                let out_times_100 = u128::from(out.minor()) * 100;
                let diff = exact_times_100.abs_diff(out_times_100);
                prop_assert!(diff <= 50);
            }
        }
    }
}
