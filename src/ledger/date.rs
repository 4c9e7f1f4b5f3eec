use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::errors::LedgerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    #[default]
    January = 1,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub fn from_number(number: u32) -> Option<Month> {
        let month = match number {
            1 => Month::January,
            2 => Month::February,
            3 => Month::March,
            4 => Month::April,
            5 => Month::May,
            6 => Month::June,
            7 => Month::July,
            8 => Month::August,
            9 => Month::September,
            10 => Month::October,
            11 => Month::November,
            12 => Month::December,
            _ => return None,
        };
        Some(month)
    }

    pub fn number(self) -> u32 {
        self as u32
    }
}

/// Calendar date ordered by (year, month, day).
///
/// Days are not validated against the month; the ledger treats them as opaque.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: i32,
    pub month: Month,
    pub day: u32,
}

impl Date {
    pub const fn new(year: i32, month: Month, day: u32) -> Self {
        Self { year, month, day }
    }

    /// `M/D/YYYY` without padding, as written to the ledger file.
    pub fn to_storage_string(self) -> String {
        format!("{}/{}/{}", self.month.number(), self.day, self.year)
    }

    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.number(), self.day)
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        // chrono months are always 1..=12
        let month = Month::from_number(date.month()).unwrap_or_default();
        Date::new(date.year(), month, date.day())
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{}",
            self.month.number(),
            self.day,
            self.year
        )
    }
}

/// Accepts `MM/DD/YYYY`, `MM-DD-YYYY` and `YYYY-MM-DD`.
///
/// A dashed date is year-first only when its first field has four digits.
impl FromStr for Date {
    type Err = LedgerError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidDate(text.to_string());
        let trimmed = text.trim();
        let separator = if trimmed.contains('-') { '-' } else { '/' };
        let fields: Vec<&str> = trimmed.split(separator).collect();
        let [first, second, third] = fields.as_slice() else {
            return Err(invalid());
        };
        let (year, month, day) = if separator == '-' && first.len() == 4 {
            (*first, *second, *third)
        } else {
            (*third, *first, *second)
        };

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        let month = Month::from_number(month).ok_or_else(invalid)?;
        Ok(Date::new(year, month, day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_year_then_month_then_day() {
        let a = Date::new(2020, Month::December, 31);
        let b = Date::new(2021, Month::January, 1);
        let c = Date::new(2021, Month::February, 1);
        let d = Date::new(2021, Month::February, 2);
        assert!(a < b && b < c && c < d);
    }

    #[test]
    fn formats_padded_for_display_and_bare_for_storage() {
        let date = Date::new(2021, Month::June, 3);
        assert_eq!(date.to_string(), "06/03/2021");
        assert_eq!(date.to_storage_string(), "6/3/2021");
    }

    #[test]
    fn parses_every_accepted_layout() {
        let expected = Date::new(2021, Month::June, 3);
        assert_eq!("6/3/2021".parse::<Date>().unwrap(), expected);
        assert_eq!("06/03/2021".parse::<Date>().unwrap(), expected);
        assert_eq!("06-03-2021".parse::<Date>().unwrap(), expected);
        assert_eq!("2021-06-03".parse::<Date>().unwrap(), expected);
    }

    #[test]
    fn accepts_days_outside_the_calendar() {
        let date: Date = "2/31/2020".parse().unwrap();
        assert_eq!(date.day, 31);
        assert!(date.to_naive().is_none());
    }

    #[test]
    fn rejects_unknown_months_and_shapes() {
        assert!("13/1/2020".parse::<Date>().is_err());
        assert!("1/2".parse::<Date>().is_err());
        assert!("a/b/c".parse::<Date>().is_err());
    }

    #[test]
    fn converts_from_chrono() {
        let naive = NaiveDate::from_ymd_opt(2019, 11, 22).unwrap();
        let date = Date::from(naive);
        assert_eq!(date, Date::new(2019, Month::November, 22));
        assert_eq!(date.to_naive(), Some(naive));
    }
}
