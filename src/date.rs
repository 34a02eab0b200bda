use chrono::{Datelike, NaiveDate};
use std::fmt;

use crate::error::BatchError;

/// EXIF timestamp for a calendar date at midnight.
const EXIF_DATE_FORMAT: &str = "%Y:%m:%d 00:00:00";

/// The capture timestamp written into DateTimeOriginal and DateTimeDigitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTaken(String);

impl DateTaken {
    /// EXIF timestamps have a four-digit year, so years outside 1..=9999 are rejected.
    pub fn from_date(date: NaiveDate) -> Result<Self, BatchError> {
        let year = date.year();
        if !(1..=9999).contains(&year) {
            return Err(BatchError::InvalidDate(year));
        }
        Ok(Self(date.format(EXIF_DATE_FORMAT).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
