//! Fixed-point currency scalar shared by every accounting and quoting subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Number of implied decimal places carried by every [`Money`] value.
///
/// A `Money` of `1.2345` is represented internally as `12345`.
pub const DECIMAL_PLACES: u32 = 6;

const SCALE: i128 = 10i128.pow(DECIMAL_PLACES);

/// A signed, fixed-point currency amount: `value = units / 10^DECIMAL_PLACES`.
///
/// `Money` never carries a currency tag itself; pairing with a [`CurrencyId`](super::security::CurrencyId)
/// is left to the containing type, matching how the registry and accounting
/// modules keep currency and amount separate until a valuation is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    units: i128,
}

impl Money {
    pub const ZERO: Money = Money { units: 0 };
    pub const MAX: Money = Money { units: i128::MAX };
    pub const MIN: Money = Money { units: i128::MIN };

    /// Constructs a `Money` from whole and fractional decimal digits already
    /// scaled to [`DECIMAL_PLACES`].
    pub const fn from_raw(units: i128) -> Self {
        Money { units }
    }

    /// Constructs a `Money` from a decimal value expressed with `decimals`
    /// fractional digits, rescaling to [`DECIMAL_PLACES`]. Used by the feed
    /// codec, which parses prices at protocol-specific decimal widths.
    pub fn from_scaled(value: i128, decimals: u32) -> Self {
        if decimals <= DECIMAL_PLACES {
            Money::from_raw(value * 10i128.pow(DECIMAL_PLACES - decimals))
        } else {
            Money::from_raw(value / 10i128.pow(decimals - DECIMAL_PLACES))
        }
    }

    pub const fn raw(self) -> i128 {
        self.units
    }

    pub fn is_zero(self) -> bool {
        self.units == 0
    }

    pub fn abs(self) -> Money {
        Money::from_raw(self.units.abs())
    }

    /// Multiplies by a signed quantity, used throughout buying power and
    /// bookkeeper notional calculations.
    pub fn checked_mul_quantity(self, quantity: i64) -> Option<Money> {
        self.units.checked_mul(quantity as i128).map(Money::from_raw)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.units < 0;
        let magnitude = self.units.unsigned_abs();
        let whole = magnitude / (SCALE as u128);
        let frac = magnitude % (SCALE as u128);
        if negative {
            write!(f, "-")?;
        }
        write!(f, "{whole}.{frac:0width$}", width = DECIMAL_PLACES as usize)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money::from_raw(self.units + rhs.units)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.units += rhs.units;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money::from_raw(self.units - rhs.units)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.units -= rhs.units;
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money::from_raw(-self.units)
    }
}

impl Mul<i64> for Money {
    type Output = Money;
    fn mul(self, rhs: i64) -> Money {
        Money::from_raw(self.units * rhs as i128)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_fixed_point() {
        let m = Money::from_raw(1_234_500);
        assert_eq!(m.to_string(), "1.234500");
    }

    #[test]
    fn from_scaled_rescales_to_decimal_places() {
        // A short-form feed price of 4 decimals: "00001500" -> 0.1500
        let m = Money::from_scaled(1500, 4);
        assert_eq!(m, Money::from_raw(150_000));
    }

    #[test]
    fn ordering_is_total_including_sentinels() {
        assert!(Money::ZERO < Money::MAX);
        assert!(Money::MIN < Money::ZERO);
    }

    #[test]
    fn negative_display() {
        let m = Money::from_raw(-500_000);
        assert_eq!(m.to_string(), "-0.500000");
    }
}
