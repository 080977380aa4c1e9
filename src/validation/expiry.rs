use chrono::{Datelike, NaiveDate};

/// A card expiry as printed: month and four-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpiryDate {
    pub year: i32,
    pub month: u32,
}

impl ExpiryDate {
    /// Builds an expiry from printed month and year parts. Two-digit years
    /// are taken to be in the 2000s.
    pub fn parse(month: &str, year: &str) -> Option<ExpiryDate> {
        let month = month.parse::<u32>().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }

        let year = match year.len() {
            2 => 2000 + year.parse::<i32>().ok()?,
            4 => year.parse::<i32>().ok()?,
            _ => return None,
        };

        // Confirms the month/year pair is a real calendar month.
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(ExpiryDate { year, month })
    }

    /// `MM/YY`, the canonical value fed to the optimizer.
    pub fn normalized(&self) -> String {
        format!("{:02}/{:02}", self.month, self.year % 100)
    }
}

pub struct ExpiryValidator;

impl ExpiryValidator {
    /// Cards stay valid through the last day of their printed month.
    pub fn is_not_expired(expiry: &ExpiryDate, today: NaiveDate) -> bool {
        (expiry.year, expiry.month) >= (today.year(), today.month())
    }
}
