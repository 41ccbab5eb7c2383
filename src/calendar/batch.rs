use super::csv_format::{normalize_illumination, parse_date};
use super::{CalendarDay, CalendarYear, EnochDate, LunarDetails, ADDED_WEEK_DAYS, BASE_YEAR_DAYS};
use crate::api::{
    CalculationRequest, CalculationResponse, CalculationSource, YearDayRecord, YearResponse,
};
use crate::config::Location;
use crate::error::{AstrologyError, Result};
use crate::shemot::shem_enoch;
use chrono::{Duration, NaiveDateTime};
use std::ops::Range;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Sends `requests` at most `batch_size` at a time. A batch starts only once
/// the previous one has fully resolved, and results come back in request
/// order whatever order they completed in. The first failure aborts the rest.
pub async fn fetch_in_batches<S>(
    source: &Arc<S>,
    requests: &[CalculationRequest],
    batch_size: usize,
) -> Result<Vec<CalculationResponse>>
where
    S: CalculationSource + 'static,
{
    let batch_size = batch_size.max(1);
    let mut out = Vec::with_capacity(requests.len());

    for (batch_no, chunk) in requests.chunks(batch_size).enumerate() {
        debug!(
            "batch {}: requests {}..{}",
            batch_no,
            batch_no * batch_size,
            batch_no * batch_size + chunk.len()
        );

        let mut tasks = JoinSet::new();
        for (i, request) in chunk.iter().cloned().enumerate() {
            let source = Arc::clone(source);
            tasks.spawn(async move { (i, source.calculate(&request).await) });
        }

        let mut slots: Vec<Option<CalculationResponse>> = vec![None; chunk.len()];
        while let Some(joined) = tasks.join_next().await {
            let (i, response) = joined?;
            slots[i] = Some(response?);
        }
        out.extend(slots.into_iter().flatten());
    }

    Ok(out)
}

fn day_requests(
    start: NaiveDateTime,
    location: &Location,
    offsets: Range<usize>,
) -> Vec<CalculationRequest> {
    offsets
        .map(|i| CalculationRequest::new(start + Duration::days(i as i64), location))
        .collect()
}

fn day_from_response(
    year: i32,
    start: NaiveDateTime,
    index: usize,
    response: &CalculationResponse,
) -> Result<CalendarDay> {
    let enoch = response.enoch()?;
    Ok(CalendarDay {
        gregorian: (start + Duration::days(index as i64)).date(),
        enoch: EnochDate {
            year,
            month: enoch.enoch_month,
            day: enoch.enoch_day,
            day_of_year: index as u16 + 1,
            added_week: enoch.added_week,
        },
        name: shem_enoch(enoch.enoch_month, enoch.enoch_day, enoch.added_week)
            .unwrap_or_default()
            .to_string(),
        start_utc: enoch.start_utc.clone().unwrap_or_default(),
        end_utc: enoch.end_utc.clone().unwrap_or_default(),
        lunar: None,
    })
}

fn day_from_record(year: i32, index: usize, record: &YearDayRecord) -> Result<CalendarDay> {
    let raw_date = record.gregorian.get(..10).unwrap_or(&record.gregorian);
    let gregorian = parse_date(raw_date).ok_or_else(|| {
        AstrologyError::InvalidInput(format!("bad date `{}` in annual answer", record.gregorian))
    })?;
    let (month, day) = record
        .enoch_month
        .zip(record.enoch_day)
        .ok_or(AstrologyError::MissingField("enoch_month"))?;
    let added_week = record.added_week.unwrap_or(false);

    let name = match record.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => shem_enoch(month, day, added_week).unwrap_or_default().to_string(),
    };
    let lunar = LunarDetails {
        phase_angle_deg: record.moon_phase_angle_deg,
        illumination: record.moon_illum.map(normalize_illumination),
        event: record.moon_event.clone().filter(|e| !e.is_empty()),
        event_utc: record.moon_event_utc.clone().filter(|e| !e.is_empty()),
        sign: record.moon_sign.clone().filter(|s| !s.is_empty()),
        distance_km: record.moon_distance_km,
        perigee: record.perigee.unwrap_or(false),
        apogee: record.apogee.unwrap_or(false),
        solar_eclipse: record.solar_eclipse.unwrap_or(false),
        lunar_eclipse: record.lunar_eclipse.unwrap_or(false),
    };

    Ok(CalendarDay {
        gregorian,
        enoch: EnochDate {
            year: record.enoch_year.unwrap_or(year),
            month,
            day,
            day_of_year: record.day_of_year.unwrap_or(index as u16 + 1),
            added_week,
        },
        name,
        start_utc: record.start_utc.clone().unwrap_or_default(),
        end_utc: record.end_utc.clone().unwrap_or_default(),
        lunar: (!lunar.is_empty()).then_some(lunar),
    })
}

/// Year from a single annual answer; any unusable day rejects the whole
/// answer.
fn year_from_annual(year: i32, start: NaiveDateTime, answer: YearResponse) -> Result<CalendarYear> {
    if answer.quality.as_deref() == Some("approx") {
        warn!("annual answer for Enoch year {} uses approximate lunar data", year);
    }
    let year = answer.enoch_year.unwrap_or(year);
    let days = answer
        .days
        .iter()
        .enumerate()
        .map(|(i, record)| day_from_record(year, i, record))
        .collect::<Result<Vec<_>>>()?;
    Ok(CalendarYear::new(year, start, days))
}

/// Builds the Enoch year containing `reference`, asking the service about
/// `reference` first.
pub async fn build_year<S>(
    source: &Arc<S>,
    location: &Location,
    reference: NaiveDateTime,
    batch_size: usize,
) -> Result<CalendarYear>
where
    S: CalculationSource + 'static,
{
    let base = source
        .calculate(&CalculationRequest::new(reference, location))
        .await?;
    build_year_from(source, location, reference, &base, batch_size).await
}

/// Builds a year from an already fetched answer for `reference`.
///
/// The year starts `day_of_year - 1` days before the reference. The annual
/// endpoint is tried first; when the source lacks it or it fails, 364 days
/// are requested in batches, and when the last of them reports the added
/// week, seven more follow.
pub async fn build_year_from<S>(
    source: &Arc<S>,
    location: &Location,
    reference: NaiveDateTime,
    base: &CalculationResponse,
    batch_size: usize,
) -> Result<CalendarYear>
where
    S: CalculationSource + 'static,
{
    let base = base.enoch()?;
    let year = base.enoch_year;
    let start = reference - Duration::days(i64::from(base.enoch_day_of_year) - 1);
    info!(
        "building Enoch year {} from {} (reference day {})",
        year, start, base.enoch_day_of_year
    );

    let annual = source
        .calculate_year(&CalculationRequest::new(reference, location))
        .await
        .and_then(|answer| year_from_annual(year, start, answer));
    match annual {
        Ok(built) => {
            info!("Enoch year {} built from one annual answer ({} days)", built.year, built.len());
            return Ok(built);
        }
        Err(AstrologyError::Unsupported(what)) => {
            debug!("{} unavailable, asking day by day", what)
        }
        Err(err) => warn!("annual calculation failed ({}), falling back to daily batches", err),
    }

    let requests = day_requests(start, location, 0..BASE_YEAR_DAYS);
    let mut responses = fetch_in_batches(source, &requests, batch_size).await?;

    let added_week = match responses.last() {
        Some(last) => last.enoch()?.added_week,
        None => false,
    };
    if added_week {
        info!("Enoch year {} carries the added week", year);
        let extra = day_requests(start, location, BASE_YEAR_DAYS..BASE_YEAR_DAYS + ADDED_WEEK_DAYS);
        responses.extend(fetch_in_batches(source, &extra, batch_size).await?);
    }

    let days = responses
        .iter()
        .enumerate()
        .map(|(i, response)| day_from_response(year, start, i, response))
        .collect::<Result<Vec<_>>>()?;
    info!("Enoch year {} built with {} days", year, days.len());
    Ok(CalendarYear::new(year, start, days))
}
