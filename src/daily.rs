//! Deterministic daily-question selection.
//!
//! The index for a given day is the 1-based day-of-year minus one, modulo
//! the bank size. The same local date and bank count always pick the same
//! question; the random fallback only triggers when the indexed fetch
//! comes back empty.

use chrono::{Datelike, Local, NaiveDate};

/// 1-based ordinal of the date within its year.
pub fn day_of_year(date: NaiveDate) -> u32 {
  date.ordinal()
}

/// Zero-based index of today's question, `None` on an empty bank.
pub fn daily_index(date: NaiveDate, count: u64) -> Option<u64> {
  if count == 0 {
    return None;
  }
  Some(u64::from(day_of_year(date) - 1) % count)
}

/// Today in the server's local timezone; reveals roll over at local
/// midnight like the streak rules expect.
pub fn local_today() -> NaiveDate {
  Local::now().date_naive()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn january_first_picks_index_zero() {
    assert_eq!(daily_index(d(2024, 1, 1), 100), Some(0));
  }

  #[test]
  fn index_is_deterministic_for_a_date_and_count() {
    let date = d(2024, 3, 15); // day 75 of a leap year
    assert_eq!(day_of_year(date), 75);
    assert_eq!(daily_index(date, 400), Some(74));
    assert_eq!(daily_index(date, 400), Some(74));
  }

  #[test]
  fn index_wraps_modulo_bank_size() {
    let date = d(2023, 12, 31); // day 365
    assert_eq!(daily_index(date, 100), Some(64));
    assert_eq!(daily_index(date, 1), Some(0));
  }

  #[test]
  fn empty_bank_has_no_daily_index() {
    assert_eq!(daily_index(d(2024, 6, 1), 0), None);
  }
}
