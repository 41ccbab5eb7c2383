//! Calendar session against an in-memory service, with an on-disk cache.

use carta_astral::api::{
    CalculationRequest, CalculationResponse, CalculationSource, EnochFields,
    REQUEST_DATETIME_FORMAT,
};
use carta_astral::calendar::{
    export_ics_to_dir, export_to_dir, festival_map, parse_calendar_csv, CalendarSession,
    EnochMonthLayout, FestivalKind, YearCache,
};
use carta_astral::config::Location;
use carta_astral::error::{AstrologyError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Every year is 364 days long; 5996 begins on 2025-03-26.
#[derive(Default)]
struct PlainYears {
    calls: AtomicUsize,
}

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 26).unwrap()
}

fn noon(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(12, 0, 0).unwrap()
}

impl CalculationSource for PlainYears {
    async fn calculate(&self, request: &CalculationRequest) -> Result<CalculationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let moment = NaiveDateTime::parse_from_str(&request.datetime, REQUEST_DATETIME_FORMAT)
            .map_err(|e| AstrologyError::InvalidInput(e.to_string()))?;
        let offset = (moment.date() - first_day()).num_days();
        let doy = offset.rem_euclid(364) as u16 + 1;
        let (month, day) = EnochMonthLayout::new(false).locate(doy).unwrap();

        Ok(CalculationResponse {
            enoch: Some(EnochFields {
                enoch_year: 5996 + offset.div_euclid(364) as i32,
                enoch_month: month,
                enoch_day: day,
                enoch_day_of_year: doy,
                added_week: false,
                enoch_start: None,
                start_utc: None,
                end_utc: None,
            }),
            ..Default::default()
        })
    }
}

#[tokio::test]
async fn builds_caches_and_reopens_a_year() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(PlainYears::default());
    let session = CalendarSession::new(Arc::clone(&source), Location::default(), 25)
        .with_cache(YearCache::new(dir.path()));

    let year = session
        .load(noon(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()))
        .await
        .unwrap();
    assert_eq!(year.year, 5996);
    assert_eq!(year.len(), 364);
    assert!(!year.has_added_week());
    assert_eq!(year.days[0].gregorian, first_day());
    assert_eq!(year.days[363].enoch.day_of_year, 364);

    let layout = year.layout();
    for month in year.months() {
        assert_eq!(
            Some(month.days.len() as u8),
            layout.month_length(month.month),
            "month {}",
            month.month
        );
    }

    // a fresh session finds the year on disk without asking the service
    let idle = Arc::new(PlainYears::default());
    let reopened = CalendarSession::new(Arc::clone(&idle), Location::default(), 25)
        .with_cache(YearCache::new(dir.path()));
    let again = reopened.jump(5996).await.unwrap();
    assert_eq!(again.days, year.days);
    assert_eq!(idle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stepping_forward_starts_where_the_year_ended() {
    let source = Arc::new(PlainYears::default());
    let session = CalendarSession::new(source, Location::default(), 50);

    session.load(noon(first_day())).await.unwrap();
    let next = session.next().await.unwrap();
    assert_eq!(next.year, 5997);
    assert_eq!(next.days[0].gregorian, first_day() + Duration::days(364));
    assert_eq!(session.current().await.map(|y| y.year), Some(5997));
}

#[tokio::test]
async fn exported_file_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let session = CalendarSession::new(Arc::new(PlainYears::default()), Location::default(), 50);
    let year = session.load(noon(first_day())).await.unwrap();

    let path = export_to_dir(dir.path(), &year.days).unwrap();
    assert_eq!(path.file_name().unwrap(), "enoch-calendar-5996.csv");

    let text = std::fs::read_to_string(&path).unwrap();
    let rows = parse_calendar_csv(&text, 5996).unwrap();
    assert_eq!(rows.len(), 364);
    assert_eq!(rows[0].gregorian, first_day());
    assert_eq!((rows[0].enoch.month, rows[0].enoch.day), (1, 1));
    assert_eq!(rows[0].name, year.days[0].name);
}

#[tokio::test]
async fn feasts_follow_the_loaded_year_into_its_calendar_file() {
    let dir = tempfile::tempdir().unwrap();
    let session = CalendarSession::new(Arc::new(PlainYears::default()), Location::default(), 50);
    let year = session.load(noon(first_day())).await.unwrap();

    let feasts = festival_map(&year);
    let passover = &feasts[&14];
    assert_eq!(passover.kinds, vec![FestivalKind::Pesach]);
    assert_eq!(year.days[13].gregorian, NaiveDate::from_ymd_opt(2025, 4, 8).unwrap());

    let path = export_ics_to_dir(dir.path(), &year).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    let festival_events = text.matches("CATEGORIES:Festival").count();
    assert_eq!(festival_events, feasts.len());
    assert!(text.contains("UID:enoch-5996-14-festival@enoch.calendar\r\n"));
}
