//! Portable renderings for scalar types without a stable wire form

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone};
use std::fmt::Display;
use uuid::Uuid;

/// Text rendering used for date-like and identifier values in projections
pub trait Portable {
    fn to_portable(&self) -> String;
}

impl Portable for NaiveDateTime {
    fn to_portable(&self) -> String {
        self.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}

impl Portable for NaiveDate {
    fn to_portable(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

impl Portable for NaiveTime {
    fn to_portable(&self) -> String {
        self.format("%H:%M:%S%.f").to_string()
    }
}

impl<Tz> Portable for DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    fn to_portable(&self) -> String {
        self.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl Portable for Uuid {
    fn to_portable(&self) -> String {
        self.hyphenated().to_string()
    }
}

impl<T: Portable + ?Sized> Portable for &T {
    fn to_portable(&self) -> String {
        (**self).to_portable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_dates_render_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let datetime = date.and_hms_opt(14, 5, 0).unwrap();

        assert_eq!(date.to_portable(), "2024-03-09");
        assert_eq!(datetime.to_portable(), "2024-03-09T14:05:00");
        assert_eq!(Utc.from_utc_datetime(&datetime).to_portable(), "2024-03-09T14:05:00Z");
    }

    #[test]
    fn test_uuid_renders_hyphenated() {
        let id = Uuid::nil();
        assert_eq!(id.to_portable(), "00000000-0000-0000-0000-000000000000");
    }
}
