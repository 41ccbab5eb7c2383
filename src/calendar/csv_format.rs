use super::{CalendarDay, EnochDate, LunarDetails};
use crate::error::{AstrologyError, Result};
use crate::shemot::shem_enoch;
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const BASE_COLUMNS: [&str; 9] = [
    "gregorian",
    "enoch_year",
    "enoch_month",
    "enoch_day",
    "day_of_year",
    "added_week",
    "name",
    "start_utc",
    "end_utc",
];

pub const LUNAR_COLUMNS: [&str; 10] = [
    "moon_phase_angle_deg",
    "moon_illum",
    "moon_event",
    "moon_event_utc",
    "moon_sign",
    "moon_distance_km",
    "perigee",
    "apogee",
    "solar_eclipse",
    "lunar_eclipse",
];

// ---------------------------
// ## Field Parsing
// ---------------------------

fn normalize_header(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header(name), idx))
        .collect()
}

fn field<'a>(record: &'a StringRecord, columns: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = columns.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts `0.45`, `45%` and `0,45`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");
    let value = cleaned.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .or_else(|| parse_number(raw).map(|n| n.trunc() as i64))
}

/// `1`, `true`, `yes` and `y` (any case) are true; anything else is false.
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y"))
        .unwrap_or(false)
}

/// Illumination as a fraction; values above 1 and up to 100 are read as
/// percents, so a stored `1` stays a full moon.
pub fn normalize_illumination(value: f64) -> f64 {
    if value <= 0.0 {
        0.0
    } else if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value.min(1.0)
    }
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
}

fn parse_lunar(record: &StringRecord, columns: &HashMap<String, usize>) -> Option<LunarDetails> {
    let text = |name: &str| field(record, columns, name).map(str::to_string);
    let number = |name: &str| field(record, columns, name).and_then(parse_number);
    let flag = |name: &str| parse_flag(field(record, columns, name));

    let lunar = LunarDetails {
        phase_angle_deg: number("moon_phase_angle_deg"),
        illumination: number("moon_illum").map(normalize_illumination),
        event: text("moon_event"),
        event_utc: text("moon_event_utc"),
        sign: text("moon_sign"),
        distance_km: number("moon_distance_km"),
        perigee: flag("perigee"),
        apogee: flag("apogee"),
        solar_eclipse: flag("solar_eclipse"),
        lunar_eclipse: flag("lunar_eclipse"),
    };
    (!lunar.is_empty()).then_some(lunar)
}

fn parse_row(
    record: &StringRecord,
    columns: &HashMap<String, usize>,
    requested_year: i32,
    index: usize,
) -> std::result::Result<CalendarDay, String> {
    let gregorian = field(record, columns, "gregorian")
        .ok_or("missing gregorian date")?;
    let gregorian = parse_date(gregorian).ok_or_else(|| format!("bad date `{}`", gregorian))?;

    let month = field(record, columns, "enoch_month")
        .and_then(parse_int)
        .and_then(|m| u8::try_from(m).ok())
        .ok_or("missing enoch_month")?;
    let day = field(record, columns, "enoch_day")
        .and_then(parse_int)
        .and_then(|d| u8::try_from(d).ok())
        .ok_or("missing enoch_day")?;

    let year = field(record, columns, "enoch_year")
        .and_then(parse_int)
        .and_then(|y| i32::try_from(y).ok())
        .unwrap_or(requested_year);
    let day_of_year = field(record, columns, "day_of_year")
        .and_then(parse_int)
        .and_then(|d| u16::try_from(d).ok())
        .unwrap_or(index as u16 + 1);
    let added_week = parse_flag(field(record, columns, "added_week"));

    let name = match field(record, columns, "name") {
        Some(name) => name.to_string(),
        None => shem_enoch(month, day, added_week).unwrap_or_default().to_string(),
    };

    Ok(CalendarDay {
        gregorian,
        enoch: EnochDate {
            year,
            month,
            day,
            day_of_year,
            added_week,
        },
        name,
        start_utc: field(record, columns, "start_utc").unwrap_or_default().to_string(),
        end_utc: field(record, columns, "end_utc").unwrap_or_default().to_string(),
        lunar: parse_lunar(record, columns),
    })
}

/// Reads a stored calendar year. Missing optional columns are tolerated;
/// rows shorter than the header or without a usable date are skipped.
pub fn parse_calendar_csv(text: &str, requested_year: i32) -> Result<Vec<CalendarDay>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = header_map(&headers);
    let mut days = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        if record.len() < headers.len() {
            warn!("skipping short row on line {}", line);
            continue;
        }
        match parse_row(&record, &columns, requested_year, days.len()) {
            Ok(day) => days.push(day),
            Err(reason) => warn!("skipping line {}: {}", line, reason),
        }
    }

    debug!("parsed {} calendar rows", days.len());
    Ok(days)
}

// ---------------------------
// ## Export
// ---------------------------

fn optional<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn flag(value: bool) -> String {
    if value { "1" } else { "" }.to_string()
}

fn lunar_fields(lunar: &LunarDetails) -> Vec<String> {
    vec![
        optional(&lunar.phase_angle_deg),
        optional(&lunar.illumination),
        optional(&lunar.event),
        optional(&lunar.event_utc),
        optional(&lunar.sign),
        optional(&lunar.distance_km),
        flag(lunar.perigee),
        flag(lunar.apogee),
        flag(lunar.solar_eclipse),
        flag(lunar.lunar_eclipse),
    ]
}

/// CSV text for a list of days. Lunar columns are added when any day has them.
pub fn to_csv(days: &[CalendarDay]) -> Result<String> {
    let with_lunar = days.iter().any(|d| d.lunar.is_some());
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
    if with_lunar {
        header.extend(LUNAR_COLUMNS);
    }
    writer.write_record(&header)?;

    for day in days {
        let mut row = vec![
            day.gregorian.format("%Y-%m-%d").to_string(),
            day.enoch.year.to_string(),
            day.enoch.month.to_string(),
            day.enoch.day.to_string(),
            day.enoch.day_of_year.to_string(),
            day.enoch.added_week.to_string(),
            day.name.replace(',', " "),
            day.start_utc.clone(),
            day.end_utc.clone(),
        ];
        if with_lunar {
            row.extend(lunar_fields(&day.lunar.clone().unwrap_or_default()));
        }
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AstrologyError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| AstrologyError::InvalidInput(e.to_string()))
}

/// Year a file of `days` is named after: the year of day 1, else the most
/// common year, else the first row's.
pub fn export_year(days: &[CalendarDay]) -> Option<i32> {
    if let Some(first) = days.iter().find(|d| d.enoch.day_of_year == 1) {
        return Some(first.enoch.year);
    }
    let mut counts: Vec<(i32, usize)> = Vec::new();
    for day in days {
        match counts.iter_mut().find(|(year, _)| *year == day.enoch.year) {
            Some((_, count)) => *count += 1,
            None => counts.push((day.enoch.year, 1)),
        }
    }
    let mut best: Option<(i32, usize)> = None;
    for (year, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((year, count));
        }
    }
    best.map(|(year, _)| year)
        .or_else(|| days.first().map(|d| d.enoch.year))
}

pub fn export_file_name(year: i32) -> String {
    format!("enoch-calendar-{}.csv", year)
}
