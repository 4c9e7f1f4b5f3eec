//! Exact currency amounts stored as signed integer cents.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::LedgerError;

pub const CURRENCY_SYMBOL: char = '$';

/// A signed amount of US cents. All arithmetic is exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub const fn cents(self) -> i64 {
        self.cents
    }

    pub const fn abs(self) -> Self {
        Self {
            cents: self.cents.abs(),
        }
    }

    pub const fn is_negative(self) -> bool {
        self.cents < 0
    }

    pub const fn is_positive(self) -> bool {
        self.cents > 0
    }

    /// Two fractional digits and no currency symbol, e.g. `12.05` or `-3.40`.
    pub fn plain(self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        format!(
            "{}{}.{:02}",
            sign,
            (self.cents / 100).abs(),
            (self.cents % 100).abs()
        )
    }

    /// Compact form used in the text file: the fraction is omitted when it is zero.
    pub fn to_storage_string(self) -> String {
        if self.cents % 100 == 0 {
            (self.cents / 100).to_string()
        } else {
            self.plain()
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CURRENCY_SYMBOL, self.plain())
    }
}

/// Parses `[+|-]<dollars>[.<fraction>]`.
///
/// Only the first two fractional digits count: `1.2` is 120 cents and `1.234` is
/// 123 cents. Either side of the point may be empty, but not both.
impl FromStr for Money {
    type Err = LedgerError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidAmount(text.to_string());
        let trimmed = text.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (whole, fraction) = match body.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (body, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(invalid());
        }

        let dollars: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut digits = fraction.bytes().map(|b| i64::from(b - b'0'));
        let cents = digits.next().unwrap_or(0) * 10 + digits.next().unwrap_or(0);

        let total = dollars
            .checked_mul(100)
            .and_then(|value| value.checked_add(cents))
            .ok_or_else(invalid)?;
        Ok(Money::from_cents(if negative { -total } else { total }))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::from_cents(self.cents + rhs.cents)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::from_cents(self.cents - rhs.cents)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money::from_cents(-self.cents)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.cents += rhs.cents;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.cents -= rhs.cents;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
