use chrono::{Datelike, NaiveDate};
use std::fmt;

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Cache identity for a birth month, rendered as `movie-<month>-<year>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    month: &'static str,
    year: i32,
}

impl QueryKey {
    /// The date is moved forward one day before the month is taken, so a
    /// birthdate on the last day of a month keys into the following month.
    pub fn from_birthdate(date: NaiveDate) -> Self {
        let shifted = date.succ_opt().unwrap_or(date);
        Self {
            month: SPANISH_MONTHS[shifted.month0() as usize],
            year: shifted.year(),
        }
    }

    pub fn month_name(&self) -> &'static str {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn as_cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "movie-{}-{}", self.month, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_mid_month_key() {
        let key = QueryKey::from_birthdate(date(2024, 1, 15));
        assert_eq!(key.month_name(), "enero");
        assert_eq!(key.year(), 2024);
        assert_eq!(key.as_cache_key(), "movie-enero-2024");
    }

    #[test]
    fn test_day_of_month_does_not_change_key() {
        let first = QueryKey::from_birthdate(date(1990, 7, 1));
        for day in 2..=30 {
            assert_eq!(QueryKey::from_birthdate(date(1990, 7, day)), first);
        }
    }

    #[test]
    fn test_shift_crosses_month_and_year_boundaries() {
        assert_eq!(
            QueryKey::from_birthdate(date(2024, 1, 31)).to_string(),
            "movie-febrero-2024"
        );
        assert_eq!(
            QueryKey::from_birthdate(date(1999, 12, 31)).to_string(),
            "movie-enero-2000"
        );
        assert_eq!(
            QueryKey::from_birthdate(date(2024, 2, 28)).to_string(),
            "movie-febrero-2024"
        );
    }
}
