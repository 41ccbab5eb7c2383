//! Enoch calendar years: building them from the calculation service,
//! grouping them into months, marking their festivals, and caching them as
//! CSV. Years can also be exported as iCalendar files.

pub mod batch;
pub mod cache;
pub mod csv_format;
pub mod festivals;
pub mod ics_format;
pub mod session;

pub use batch::{build_year, fetch_in_batches};
pub use cache::{export_ics_to_dir, export_to_dir, YearCache};
pub use csv_format::{export_file_name, export_year, parse_calendar_csv, to_csv};
pub use festivals::{festival_map, festival_map_for_days, Festival, FestivalKind, FestivalMap};
pub use ics_format::{ics_file_name, to_ics};
pub use session::CalendarSession;

use crate::shemot::{enoch_month_length, shem_enoch_index};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Length of a year without the intercalary week.
pub const BASE_YEAR_DAYS: usize = 364;
pub const ADDED_WEEK_DAYS: usize = 7;

/// Enoch year that starts in spring of [`REFERENCE_GREGORIAN_YEAR`].
pub const REFERENCE_ENOCH_YEAR: i32 = 5996;
pub const REFERENCE_GREGORIAN_YEAR: i32 = 2025;

// ---------------------------
// ## Dates
// ---------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct EnochDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub day_of_year: u16,
    pub added_week: bool,
}

impl EnochDate {
    pub fn shem_index(&self) -> Option<usize> {
        shem_enoch_index(self.month, self.day, self.added_week)
    }
}

/// Optional moon data carried by cached calendar files.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LunarDetails {
    pub phase_angle_deg: Option<f64>,
    /// Illuminated fraction in `[0, 1]`.
    pub illumination: Option<f64>,
    pub event: Option<String>,
    pub event_utc: Option<String>,
    pub sign: Option<String>,
    pub distance_km: Option<f64>,
    pub perigee: bool,
    pub apogee: bool,
    pub solar_eclipse: bool,
    pub lunar_eclipse: bool,
}

impl LunarDetails {
    pub fn is_empty(&self) -> bool {
        *self == LunarDetails::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub gregorian: NaiveDate,
    pub enoch: EnochDate,
    pub name: String,
    pub start_utc: String,
    pub end_utc: String,
    pub lunar: Option<LunarDetails>,
}

// ---------------------------
// ## Years
// ---------------------------

/// Month lengths for one year: 30, 30, 31 repeated four times, with the
/// intercalary week folded into month 12.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EnochMonthLayout {
    pub added_week: bool,
}

impl EnochMonthLayout {
    pub fn new(added_week: bool) -> Self {
        Self { added_week }
    }

    pub fn month_length(&self, month: u8) -> Option<u8> {
        (1..=12)
            .contains(&month)
            .then(|| enoch_month_length(month, self.added_week))
    }

    pub fn total_days(&self) -> usize {
        (1..=12u8)
            .filter_map(|m| self.month_length(m))
            .map(usize::from)
            .sum()
    }

    /// Month and day for a 1-based day of the year.
    pub fn locate(&self, day_of_year: u16) -> Option<(u8, u8)> {
        if day_of_year == 0 {
            return None;
        }
        let mut remaining = day_of_year;
        for month in 1..=12u8 {
            let len = u16::from(self.month_length(month)?);
            if remaining <= len {
                return Some((month, remaining as u8));
            }
            remaining -= len;
        }
        None
    }
}

/// Days of one Enoch month, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarMonth<'a> {
    pub month: u8,
    pub days: Vec<&'a CalendarDay>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarYear {
    pub year: i32,
    /// Moment the first day was requested for; navigation steps from here.
    pub start: NaiveDateTime,
    pub days: Vec<CalendarDay>,
}

impl CalendarYear {
    pub fn new(year: i32, start: NaiveDateTime, days: Vec<CalendarDay>) -> Self {
        Self { year, start, days }
    }

    /// Year rebuilt from stored rows, anchored at midday of the first row.
    pub fn from_rows(year: i32, days: Vec<CalendarDay>) -> Option<Self> {
        let start = days.first()?.gregorian.and_hms_opt(12, 0, 0)?;
        Some(Self::new(year, start, days))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn has_added_week(&self) -> bool {
        self.days.len() > BASE_YEAR_DAYS || self.days.iter().any(|d| d.enoch.added_week)
    }

    pub fn layout(&self) -> EnochMonthLayout {
        EnochMonthLayout::new(self.has_added_week())
    }

    pub fn day_for(&self, gregorian: NaiveDate) -> Option<&CalendarDay> {
        self.days.iter().find(|d| d.gregorian == gregorian)
    }

    pub fn months(&self) -> Vec<CalendarMonth<'_>> {
        (1..=12u8)
            .map(|month| CalendarMonth {
                month,
                days: self.days.iter().filter(|d| d.enoch.month == month).collect(),
            })
            .collect()
    }

    /// Reference moment one week before this year began.
    pub fn previous_reference(&self) -> NaiveDateTime {
        self.start - Duration::days(ADDED_WEEK_DAYS as i64)
    }

    /// Reference moment one week after this year ended.
    pub fn next_reference(&self) -> NaiveDateTime {
        self.start + Duration::days((self.len() + ADDED_WEEK_DAYS) as i64)
    }
}

// ---------------------------
// ## Approximations
// ---------------------------

pub fn gregorian_year_for(enoch_year: i32) -> i32 {
    REFERENCE_GREGORIAN_YEAR + (enoch_year - REFERENCE_ENOCH_YEAR)
}

/// Fixed March equinox estimate, good enough to pick a year.
pub fn approximate_march_equinox(gregorian_year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(gregorian_year, 3, 20)?.and_hms_opt(21, 24, 0)
}

pub fn first_wednesday_on_or_after(moment: NaiveDateTime) -> NaiveDateTime {
    let weekday = moment.weekday().num_days_from_sunday() as i64;
    moment + Duration::days((3 - weekday + 7) % 7)
}

/// Approximate first day of the Enoch year beginning in `gregorian_year`.
pub fn approximate_year_start(gregorian_year: i32) -> Option<NaiveDateTime> {
    approximate_march_equinox(gregorian_year).map(first_wednesday_on_or_after)
}

/// Enoch year a moment most likely belongs to.
pub fn approximate_enoch_year(moment: NaiveDateTime) -> Option<i32> {
    let year = moment.year();
    let start = approximate_year_start(year)?;
    let base = if moment < start { year - 1 } else { year };
    Some(REFERENCE_ENOCH_YEAR + (base - REFERENCE_GREGORIAN_YEAR))
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_year;
    use super::*;
    use rstest::rstest;

    #[test]
    fn layout_totals() {
        assert_eq!(EnochMonthLayout::new(false).total_days(), 364);
        assert_eq!(EnochMonthLayout::new(true).total_days(), 371);
        assert_eq!(EnochMonthLayout::new(true).month_length(12), Some(38));
        assert_eq!(EnochMonthLayout::new(false).month_length(13), None);
    }

    #[rstest]
    #[case(1, Some((1, 1)))]
    #[case(30, Some((1, 30)))]
    #[case(31, Some((2, 1)))]
    #[case(91, Some((3, 31)))]
    #[case(92, Some((4, 1)))]
    #[case(364, Some((12, 31)))]
    #[case(365, None)]
    #[case(0, None)]
    fn locate_plain_year(#[case] doy: u16, #[case] expected: Option<(u8, u8)>) {
        assert_eq!(EnochMonthLayout::new(false).locate(doy), expected);
    }

    #[test]
    fn locate_added_week_lands_in_month_twelve() {
        let layout = EnochMonthLayout::new(true);
        assert_eq!(layout.locate(371), Some((12, 38)));
        assert_eq!(layout.locate(365), Some((12, 32)));
    }

    #[test]
    fn year_groups_into_months() {
        let year = sample_year(5996, false);
        let months = year.months();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].days.len(), 30);
        assert_eq!(months[2].days.len(), 31);
        assert_eq!(months[11].days.len(), 31);

        let long = sample_year(5996, true);
        assert!(long.has_added_week());
        assert_eq!(long.months()[11].days.len(), 38);
    }

    #[test]
    fn navigation_references() {
        let year = sample_year(5996, false);
        let start = NaiveDate::from_ymd_opt(2025, 3, 26).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(year.start, start);
        assert_eq!(year.previous_reference(), start - Duration::days(7));
        assert_eq!(year.next_reference(), start + Duration::days(371));
    }

    #[test]
    fn year_start_is_a_wednesday_after_the_equinox() {
        let start = approximate_year_start(2025).unwrap();
        assert_eq!(
            start,
            NaiveDate::from_ymd_opt(2025, 3, 26).unwrap().and_hms_opt(21, 24, 0).unwrap()
        );
        assert_eq!(start.weekday(), chrono::Weekday::Wed);
        assert_eq!(gregorian_year_for(5996), 2025);
        assert_eq!(gregorian_year_for(5990), 2019);
    }

    #[test]
    fn approximate_year_for_moments() {
        let before = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let after = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(approximate_enoch_year(before), Some(5995));
        assert_eq!(approximate_enoch_year(after), Some(5996));
    }

    #[test]
    fn shem_comes_from_month_and_day() {
        let date = EnochDate {
            year: 5996,
            month: 2,
            day: 1,
            day_of_year: 31,
            added_week: false,
        };
        assert_eq!(date.shem_index(), Some(6));
    }
}
