//! Oracle TIMESTAMP and INTERVAL values
//!
//! These are fixed-size structs copied by value out of wire buffers; they never
//! point into driver memory. Each type renders to Oracle's canonical signed text:
//!
//! - TIMESTAMP: `2024-03-05 13:45:00.000000000 +09:00`
//! - INTERVAL DAY TO SECOND: `+1 02:03:04.000000005`
//! - INTERVAL YEAR TO MONTH: `+        1-02`

use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// Convert one component of a component list, reporting its position on overflow
fn component<T: TryFrom<i64>>(values: &[i64], index: usize, default: T, type_name: &str) -> Result<T> {
    match values.get(index) {
        None => Ok(default),
        Some(&v) => T::try_from(v).map_err(|_| {
            Error::conversion(format!(
                "{} component {} out of range: {}",
                type_name, index, v
            ))
        }),
    }
}

fn check_len(values: &[i64], max: usize, type_name: &str) -> Result<()> {
    if values.len() > max {
        return Err(Error::invalid_argument(format!(
            "wrong number of {} components (given {}, expected 0..={})",
            type_name,
            values.len(),
            max
        )));
    }
    Ok(())
}

fn sign(non_negative: bool) -> char {
    if non_negative {
        '+'
    } else {
        '-'
    }
}

/// Oracle TIMESTAMP with a time zone offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Year (e.g., 2024)
    pub year: i16,
    /// Month (1-12)
    pub month: u8,
    /// Day (1-31)
    pub day: u8,
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
    /// Fractional seconds in nanoseconds
    pub fsecond: u32,
    /// Timezone hour offset
    pub tz_hour_offset: i8,
    /// Timezone minute offset
    pub tz_minute_offset: i8,
}

impl Timestamp {
    /// Create a timestamp at offset +00:00
    pub fn new(year: i16, month: u8, day: u8, hour: u8, minute: u8, second: u8, fsecond: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            fsecond,
            tz_hour_offset: 0,
            tz_minute_offset: 0,
        }
    }

    /// Set the timezone offset
    pub fn with_offset(mut self, tz_hour_offset: i8, tz_minute_offset: i8) -> Self {
        self.tz_hour_offset = tz_hour_offset;
        self.tz_minute_offset = tz_minute_offset;
        self
    }

    /// Build from up to nine components in `to_array` order; missing ones take their defaults
    pub fn from_components(values: &[i64]) -> Result<Self> {
        check_len(values, 9, "timestamp")?;
        Ok(Self {
            year: component(values, 0, 1, "timestamp")?,
            month: component(values, 1, 1, "timestamp")?,
            day: component(values, 2, 1, "timestamp")?,
            hour: component(values, 3, 0, "timestamp")?,
            minute: component(values, 4, 0, "timestamp")?,
            second: component(values, 5, 0, "timestamp")?,
            fsecond: component(values, 6, 0, "timestamp")?,
            tz_hour_offset: component(values, 7, 0, "timestamp")?,
            tz_minute_offset: component(values, 8, 0, "timestamp")?,
        })
    }

    /// Components as `[year, month, day, hour, minute, second, fsecond, tz_hour, tz_minute]`
    pub fn to_array(&self) -> [i64; 9] {
        [
            self.year as i64,
            self.month as i64,
            self.day as i64,
            self.hour as i64,
            self.minute as i64,
            self.second as i64,
            self.fsecond as i64,
            self.tz_hour_offset as i64,
            self.tz_minute_offset as i64,
        ]
    }

    /// Timezone offset in seconds east of UTC
    pub fn offset_seconds(&self) -> i32 {
        self.tz_hour_offset as i32 * 3600 + self.tz_minute_offset as i32 * 60
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::new(1, 1, 1, 0, 0, 0, 0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:09} {}{:02}:{:02}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.fsecond,
            sign(self.tz_hour_offset >= 0 && self.tz_minute_offset >= 0),
            self.tz_hour_offset.unsigned_abs(),
            self.tz_minute_offset.unsigned_abs()
        )
    }
}

impl TryFrom<NaiveDateTime> for Timestamp {
    type Error = Error;

    fn try_from(dt: NaiveDateTime) -> Result<Self> {
        let year = i16::try_from(dt.year())
            .map_err(|_| Error::conversion(format!("year {} is out of range for a timestamp", dt.year())))?;
        Ok(Self::new(
            year,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() % 1_000_000_000,
        ))
    }
}

impl TryFrom<DateTime<FixedOffset>> for Timestamp {
    type Error = Error;

    fn try_from(dt: DateTime<FixedOffset>) -> Result<Self> {
        let offset = dt.offset().local_minus_utc();
        Ok(Timestamp::try_from(dt.naive_local())?
            .with_offset((offset / 3600) as i8, ((offset % 3600) / 60) as i8))
    }
}

impl TryFrom<Timestamp> for NaiveDateTime {
    type Error = Error;

    fn try_from(ts: Timestamp) -> Result<Self> {
        NaiveDate::from_ymd_opt(ts.year as i32, ts.month as u32, ts.day as u32)
            .and_then(|d| {
                d.and_hms_nano_opt(ts.hour as u32, ts.minute as u32, ts.second as u32, ts.fsecond)
            })
            .ok_or_else(|| Error::conversion(format!("invalid timestamp: {}", ts)))
    }
}

impl TryFrom<Timestamp> for DateTime<FixedOffset> {
    type Error = Error;

    fn try_from(ts: Timestamp) -> Result<Self> {
        let naive = NaiveDateTime::try_from(ts)?;
        let offset = FixedOffset::east_opt(ts.offset_seconds())
            .ok_or_else(|| Error::conversion(format!("invalid timezone offset: {}", ts)))?;
        naive
            .and_local_timezone(offset)
            .single()
            .ok_or_else(|| Error::conversion(format!("ambiguous local time: {}", ts)))
    }
}

/// Oracle INTERVAL DAY TO SECOND
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntervalDS {
    /// Days
    pub days: i32,
    /// Hours
    pub hours: i32,
    /// Minutes
    pub minutes: i32,
    /// Seconds
    pub seconds: i32,
    /// Fractional seconds in nanoseconds
    pub fseconds: i32,
}

impl IntervalDS {
    /// Create a day-second interval
    pub fn new(days: i32, hours: i32, minutes: i32, seconds: i32, fseconds: i32) -> Self {
        Self {
            days,
            hours,
            minutes,
            seconds,
            fseconds,
        }
    }

    /// Build from up to five components; missing ones are zero
    pub fn from_components(values: &[i64]) -> Result<Self> {
        check_len(values, 5, "interval_ds")?;
        Ok(Self {
            days: component(values, 0, 0, "interval_ds")?,
            hours: component(values, 1, 0, "interval_ds")?,
            minutes: component(values, 2, 0, "interval_ds")?,
            seconds: component(values, 3, 0, "interval_ds")?,
            fseconds: component(values, 4, 0, "interval_ds")?,
        })
    }

    /// Components as `[days, hours, minutes, seconds, fseconds]`
    pub fn to_array(&self) -> [i64; 5] {
        [
            self.days as i64,
            self.hours as i64,
            self.minutes as i64,
            self.seconds as i64,
            self.fseconds as i64,
        ]
    }

    fn is_non_negative(&self) -> bool {
        self.days >= 0
            && self.hours >= 0
            && self.minutes >= 0
            && self.seconds >= 0
            && self.fseconds >= 0
    }
}

impl fmt::Display for IntervalDS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {:02}:{:02}:{:02}.{:09}",
            sign(self.is_non_negative()),
            self.days.unsigned_abs(),
            self.hours.unsigned_abs(),
            self.minutes.unsigned_abs(),
            self.seconds.unsigned_abs(),
            self.fseconds.unsigned_abs()
        )
    }
}

impl TryFrom<Duration> for IntervalDS {
    type Error = Error;

    fn try_from(d: Duration) -> Result<Self> {
        let days = d.num_days();
        let whole_days = i32::try_from(days)
            .map_err(|_| Error::conversion(format!("{} days is out of range for an interval", days)))?;
        let rest = d - Duration::days(days);
        let hours = rest.num_hours();
        let rest = rest - Duration::hours(hours);
        let minutes = rest.num_minutes();
        let rest = rest - Duration::minutes(minutes);
        let seconds = rest.num_seconds();
        let nanos = (rest - Duration::seconds(seconds))
            .num_nanoseconds()
            .unwrap_or(0);
        Ok(Self::new(
            whole_days,
            hours as i32,
            minutes as i32,
            seconds as i32,
            nanos as i32,
        ))
    }
}

impl From<IntervalDS> for Duration {
    fn from(iv: IntervalDS) -> Self {
        Duration::days(iv.days as i64)
            + Duration::hours(iv.hours as i64)
            + Duration::minutes(iv.minutes as i64)
            + Duration::seconds(iv.seconds as i64)
            + Duration::nanoseconds(iv.fseconds as i64)
    }
}

/// Oracle INTERVAL YEAR TO MONTH
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntervalYM {
    /// Years
    pub years: i32,
    /// Months
    pub months: i32,
}

impl IntervalYM {
    /// Create a year-month interval
    pub fn new(years: i32, months: i32) -> Self {
        Self { years, months }
    }

    /// Build from up to two components; missing ones are zero
    pub fn from_components(values: &[i64]) -> Result<Self> {
        check_len(values, 2, "interval_ym")?;
        Ok(Self {
            years: component(values, 0, 0, "interval_ym")?,
            months: component(values, 1, 0, "interval_ym")?,
        })
    }

    /// Components as `[years, months]`
    pub fn to_array(&self) -> [i64; 2] {
        [self.years as i64, self.months as i64]
    }

    /// Total length in months
    pub fn total_months(&self) -> i64 {
        self.years as i64 * 12 + self.months as i64
    }
}

impl fmt::Display for IntervalYM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:9}-{:02}",
            sign(self.years >= 0 && self.months >= 0),
            self.years.unsigned_abs(),
            self.months.unsigned_abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_defaults() {
        let ts = Timestamp::default();
        assert_eq!(ts.to_array(), [1, 1, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Timestamp::from_components(&[]).unwrap(), ts);

        let partial = Timestamp::from_components(&[2024, 3]).unwrap();
        assert_eq!(partial.year, 2024);
        assert_eq!(partial.month, 3);
        assert_eq!(partial.day, 1);
    }

    #[test]
    fn test_timestamp_display() {
        let ts = Timestamp::new(2024, 3, 5, 13, 45, 0, 120).with_offset(9, 0);
        assert_eq!(ts.to_string(), "2024-03-05 13:45:00.000000120 +09:00");

        let west = Timestamp::new(1999, 12, 31, 23, 59, 59, 0).with_offset(-3, -30);
        assert_eq!(west.to_string(), "1999-12-31 23:59:59.000000000 -03:30");
    }

    #[test]
    fn test_timestamp_components_validated() {
        assert!(Timestamp::from_components(&[2024, 300]).is_err());
        assert!(Timestamp::from_components(&[1; 10]).is_err());
    }

    #[test]
    fn test_timestamp_chrono_round_trip() {
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let dt = NaiveDate::from_ymd_opt(2023, 7, 14)
            .unwrap()
            .and_hms_nano_opt(8, 15, 30, 500)
            .unwrap()
            .and_local_timezone(offset)
            .unwrap();
        let ts = Timestamp::try_from(dt).unwrap();
        assert_eq!(ts.tz_hour_offset, 5);
        assert_eq!(ts.tz_minute_offset, 30);
        let back: DateTime<FixedOffset> = ts.try_into().unwrap();
        assert_eq!(back, dt);
    }

    #[test]
    fn test_timestamp_year_out_of_range() {
        let far = NaiveDate::from_ymd_opt(40_000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(matches!(Timestamp::try_from(far), Err(Error::Conversion(_))));
        let before = NaiveDate::from_ymd_opt(-40_000, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(Timestamp::try_from(before).is_err());

        let edge = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap().and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(Timestamp::try_from(edge).unwrap().year, 9999);
    }

    #[test]
    fn test_interval_ds_display_sign() {
        let iv = IntervalDS::new(1, 2, 3, 4, 5);
        assert_eq!(iv.to_string(), "+1 02:03:04.000000005");

        // any negative component flips the sign and all parts print absolute
        let neg = IntervalDS::new(0, -2, 3, 0, 0);
        assert_eq!(neg.to_string(), "-0 02:03:00.000000000");
    }

    #[test]
    fn test_interval_ds_duration() {
        let d = Duration::days(-1) - Duration::hours(6) - Duration::milliseconds(1500);
        let iv = IntervalDS::try_from(d).unwrap();
        assert_eq!(iv, IntervalDS::new(-1, -6, 0, -1, -500_000_000));
        assert_eq!(Duration::from(iv), d);

        let huge = Duration::days(3_000_000_000);
        assert!(matches!(IntervalDS::try_from(huge), Err(Error::Conversion(_))));
    }

    #[test]
    fn test_interval_ym() {
        let iv = IntervalYM::new(1, 2);
        assert_eq!(iv.to_string(), "+        1-02");
        assert_eq!(IntervalYM::new(-3, -11).to_string(), "-        3-11");
        assert_eq!(iv.total_months(), 14);
        assert_eq!(IntervalYM::from_components(&[5]).unwrap(), IntervalYM::new(5, 0));
        assert_eq!(iv.to_array(), [1, 2]);
    }
}
