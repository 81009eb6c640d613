//! Whole-rupee currency amounts.
//!
//! Every amount in the marketplace is an integer number of rupees. Percentage
//! reductions round half away from zero, matching how prices are shown to
//! buyers.
//!
//! Arithmetic saturates instead of overflowing, and amounts read from the
//! wire are bounded by [`Rupees::MAX_WIRE_AMOUNT`].

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// An amount of Indian rupees, in whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Rupees(i64);

/// The backend serializes prices as floats (`25.0`); accept both and round.
impl<'de> Deserialize<'de> for Rupees {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Whole(i64),
            Fractional(f64),
        }

        #[allow(clippy::cast_precision_loss)]
        const LIMIT: f64 = Rupees::MAX_WIRE_AMOUNT as f64;

        match Wire::deserialize(deserializer)? {
            Wire::Whole(amount) if amount.unsigned_abs() <= Self::MAX_WIRE_AMOUNT.unsigned_abs() => {
                Ok(Self(amount))
            }
            Wire::Fractional(amount) if amount.is_finite() && amount.abs() <= LIMIT => {
                #[allow(clippy::cast_possible_truncation)] // bounded above
                Ok(Self(amount.round() as i64))
            }
            Wire::Whole(amount) => Err(serde::de::Error::custom(format!(
                "amount out of range: {amount}"
            ))),
            Wire::Fractional(amount) => Err(serde::de::Error::custom(format!(
                "invalid amount: {amount}"
            ))),
        }
    }
}

impl Rupees {
    /// Zero rupees.
    pub const ZERO: Self = Self(0);

    /// Largest magnitude accepted from the backend (one lakh crore).
    pub const MAX_WIRE_AMOUNT: i64 = 1_000_000_000_000;

    /// Create an amount from whole rupees.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the amount in whole rupees.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// `percent`% of this amount, rounded half away from zero.
    ///
    /// ```
    /// use kisan_setu_core::Rupees;
    ///
    /// assert_eq!(Rupees::new(50).percent(20), Rupees::new(10));
    /// assert_eq!(Rupees::new(57).percent(20), Rupees::new(11)); // 11.4
    /// assert_eq!(Rupees::new(58).percent(20), Rupees::new(12)); // 11.6
    /// assert_eq!(Rupees::new(105).percent(10), Rupees::new(11)); // 10.5
    /// ```
    #[must_use]
    pub const fn percent(self, percent: i64) -> Self {
        let scaled = self.0.saturating_mul(percent);
        let half = if scaled >= 0 { 50 } else { -50 };
        Self(scaled.saturating_add(half) / 100)
    }

    /// Subtract, flooring at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }
}

impl fmt::Display for Rupees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", self.0)
    }
}

impl From<i64> for Rupees {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl Add for Rupees {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Rupees {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<u32> for Rupees {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(rhs)))
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(Rupees::new(0).percent(20), Rupees::ZERO);
        assert_eq!(Rupees::new(2).percent(20), Rupees::new(0)); // 0.4
        assert_eq!(Rupees::new(3).percent(20), Rupees::new(1)); // 0.6
        assert_eq!(Rupees::new(5).percent(10), Rupees::new(1)); // 0.5
    }

    #[test]
    fn test_saturating_sub() {
        assert_eq!(Rupees::new(10).saturating_sub(Rupees::new(4)), Rupees::new(6));
        assert_eq!(Rupees::new(4).saturating_sub(Rupees::new(10)), Rupees::ZERO);
    }

    #[test]
    fn test_sum_and_mul() {
        let total: Rupees = [Rupees::new(25) * 2, Rupees::new(80) * 1].into_iter().sum();
        assert_eq!(total, Rupees::new(130));
    }

    #[test]
    fn test_deserialize_float_price() {
        let price: Rupees = serde_json::from_str("25.0").unwrap();
        assert_eq!(price, Rupees::new(25));
        let price: Rupees = serde_json::from_str("79.6").unwrap();
        assert_eq!(price, Rupees::new(80));
        let price: Rupees = serde_json::from_str("500").unwrap();
        assert_eq!(price, Rupees::new(500));
    }

    #[test]
    fn test_out_of_range_amounts_are_rejected() {
        assert!(serde_json::from_str::<Rupees>("1e18").is_err());
        assert!(serde_json::from_str::<Rupees>("9223372036854775807").is_err());
        assert!(serde_json::from_str::<Rupees>("-2000000000000").is_err());
        let largest: Rupees = serde_json::from_str("1000000000000").unwrap();
        assert_eq!(largest.amount(), Rupees::MAX_WIRE_AMOUNT);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Rupees::new(i64::MAX);
        assert_eq!((huge * 3).amount(), i64::MAX);
        assert_eq!((huge + Rupees::new(1)).amount(), i64::MAX);
        assert_eq!((Rupees::new(i64::MIN) - Rupees::new(1)).amount(), i64::MIN);
        assert_eq!(huge.percent(20).amount(), i64::MAX / 100);

        let total: Rupees = [huge, huge].into_iter().sum();
        assert_eq!(total, huge);
    }

    #[test]
    fn test_display() {
        assert_eq!(Rupees::new(90).to_string(), "₹90");
    }
}
