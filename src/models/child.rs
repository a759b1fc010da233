//! Child model.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::ChildId;

/// Returns the number of completed months between `birthday` and `date`.
///
/// Dates before the birthday yield zero.
pub fn completed_months(birthday: NaiveDate, date: NaiveDate) -> u32 {
    if date < birthday {
        return 0;
    }
    let span = (date.year() - birthday.year()) * 12 + date.month() as i32 - birthday.month() as i32;
    let mut months = span.max(0) as u32;
    // Month-end birthdays clamp (Jan 31 + 1 month = Feb 28)
    while months > 0
        && birthday
            .checked_add_months(Months::new(months))
            .is_none_or(|anniversary| anniversary > date)
    {
        months -= 1;
    }
    months
}

/// The slice of a child record the calendar needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    /// Unique identifier for the child.
    pub id: ChildId,
    /// Display name.
    pub name: String,
    /// Date of birth.
    pub birthday: NaiveDate,
}

impl Child {
    /// Returns the child's age in completed years on `date`.
    ///
    /// Dates before the birthday yield zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use childcare_attendance::models::Child;
    /// use chrono::NaiveDate;
    /// use uuid::Uuid;
    ///
    /// let child = Child {
    ///     id: Uuid::nil(),
    ///     name: "Mila".to_string(),
    ///     birthday: NaiveDate::from_ymd_opt(2021, 3, 10).unwrap(),
    /// };
    /// assert_eq!(child.age_in_years(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()), 2);
    /// assert_eq!(child.age_in_years(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()), 3);
    /// ```
    pub fn age_in_years(&self, date: NaiveDate) -> u32 {
        self.age_in_months(date) / 12
    }

    /// Returns the child's age in completed months on `date`.
    pub fn age_in_months(&self, date: NaiveDate) -> u32 {
        completed_months(self.birthday, date)
    }

    /// Returns the date the child turns `years` old.
    ///
    /// A Feb 29 birthday resolves to Feb 28 in non-leap years.
    pub fn birthday_after_years(&self, years: u32) -> Option<NaiveDate> {
        self.birthday.checked_add_months(Months::new(years * 12))
    }
}
