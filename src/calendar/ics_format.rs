use super::festivals::festival_map;
use super::{CalendarDay, CalendarYear, LunarDetails};
use crate::zodiac::ZodiacSign;
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, SecondsFormat, Utc};
use std::collections::HashSet;

const CRLF: &str = "\r\n";
const UID_DOMAIN: &str = "enoch.calendar";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub fn ics_file_name(year: i32) -> String {
    format!("enoch-astro-{}.ics", year)
}

/// Escapes TEXT values: backslash, newline, comma and semicolon.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            _ => out.push(c),
        }
    }
    out
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DDTHH:MM:SS[.f]`, read as UTC.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(moment) = DateTime::parse_from_rfc3339(raw) {
        return Some(moment.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn ics_stamp(moment: DateTime<Utc>) -> Option<String> {
    (1..=9999)
        .contains(&moment.year())
        .then(|| moment.format(STAMP_FORMAT).to_string())
}

/// Start and end of `days[index]`. Missing edges are taken from the
/// neighbouring rows, then from a 24 hour span, then from Gregorian midnights.
pub fn day_bounds(days: &[&CalendarDay], index: usize) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let day = days.get(index)?;
    let prev = index.checked_sub(1).and_then(|i| days.get(i));
    let next = days.get(index + 1);
    let next_start = next.and_then(|d| parse_utc(&d.start_utc));

    let start = parse_utc(&day.start_utc)
        .or_else(|| prev.and_then(|d| parse_utc(&d.end_utc)))
        .or_else(|| next_start.map(|s| s - Duration::hours(24)));
    let end = parse_utc(&day.end_utc)
        .or(next_start)
        .or_else(|| start.map(|s| s + Duration::hours(24)));

    let midnight = day.gregorian.and_hms_opt(0, 0, 0)?.and_utc();
    Some((
        start.unwrap_or(midnight),
        end.unwrap_or(midnight + Duration::days(1)),
    ))
}

fn moon_event_label(event: &str) -> &str {
    match event {
        "full" | "full_moon" => "Full Moon",
        "new" | "new_moon" => "New Moon",
        "first_quarter" => "First Quarter",
        "last_quarter" => "Last Quarter",
        other => other,
    }
}

fn moon_description(lunar: &LunarDetails) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(phase) = lunar.phase_angle_deg {
        lines.push(format!("- Phase: {:.1}°", phase));
    }
    if let Some(illumination) = lunar.illumination {
        lines.push(format!("- Illumination: {:.1}%", illumination * 100.0));
    }
    if let Some(sign) = &lunar.sign {
        lines.push(format!("- Sign: {}", sign));
    }
    if let Some(distance) = lunar.distance_km {
        lines.push(format!("- Distance: {:.0} km", distance));
    }
    let flags = [
        (lunar.perigee, "Perigee"),
        (lunar.apogee, "Apogee"),
        (lunar.solar_eclipse, "Solar eclipse"),
        (lunar.lunar_eclipse, "Lunar eclipse"),
    ];
    for (_, label) in flags.iter().filter(|(set, _)| *set) {
        lines.push(format!("- {}", label));
    }
    if lines.is_empty() {
        return lines;
    }
    lines.insert(0, "Moon:".to_string());
    lines
}

fn day_summary(day: &CalendarDay) -> String {
    let sign = ZodiacSign::from_index(usize::from(day.enoch.month.max(1) - 1) % 12);
    let (name, glyph) = sign.map_or(("", ""), |s| (s.name(), s.glyph()));
    let mut summary = format!("{} {}{} {}", day.enoch.day, name, glyph, day.enoch.year);
    if !day.name.is_empty() {
        summary.push_str(&format!(" ({})", day.name));
    }
    summary
}

fn enoch_line(day: &CalendarDay) -> String {
    format!(
        "Enoch: Y{} M{} D{} (DOY {})",
        day.enoch.year, day.enoch.month, day.enoch.day, day.enoch.day_of_year
    )
}

fn utc_lines(start: DateTime<Utc>, end: DateTime<Utc>) -> [String; 2] {
    [
        format!("Start (UTC): {}", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
        format!("End (UTC): {}", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
    ]
}

struct IcsWriter {
    lines: Vec<String>,
    stamp: String,
    uids: HashSet<String>,
}

impl IcsWriter {
    fn new(year: i32, stamp: DateTime<Utc>) -> Self {
        let lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            "PRODID:-//Carta Astral//Enoch Calendar//EN".to_string(),
            "VERSION:2.0".to_string(),
            "CALSCALE:GREGORIAN".to_string(),
            "METHOD:PUBLISH".to_string(),
            format!("X-WR-CALNAME:{}", escape_text(&format!("Enoch Calendar {}", year))),
            "X-WR-TIMEZONE:UTC".to_string(),
        ];
        Self {
            lines,
            stamp: stamp.format(STAMP_FORMAT).to_string(),
            uids: HashSet::new(),
        }
    }

    /// Skips events whose UID was already written or whose start cannot be
    /// expressed.
    fn event(
        &mut self,
        uid: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        summary: &str,
        description: &str,
        category: &str,
    ) {
        let (Some(dt_start), Some(dt_end)) = (ics_stamp(start), ics_stamp(end)) else {
            return;
        };
        let uid = format!("{}@{}", uid, UID_DOMAIN);
        if !self.uids.insert(uid.clone()) {
            return;
        }
        self.lines.extend([
            "BEGIN:VEVENT".to_string(),
            format!("UID:{}", uid),
            format!("DTSTAMP:{}", self.stamp),
            format!("DTSTART:{}", dt_start),
            format!("DTEND:{}", dt_end),
            format!("SUMMARY:{}", escape_text(summary)),
            format!("DESCRIPTION:{}", escape_text(description)),
            format!("CATEGORIES:{}", escape_text(category)),
            "END:VEVENT".to_string(),
        ]);
    }

    fn finish(mut self) -> String {
        self.lines.push("END:VCALENDAR".to_string());
        let mut text = self.lines.join(CRLF);
        text.push_str(CRLF);
        text
    }
}

/// iCalendar text for `year`: one event per festival, one per dated moon
/// event and one spanning each Enoch day. `stamp` becomes every DTSTAMP.
pub fn to_ics(year: &CalendarYear, stamp: DateTime<Utc>) -> String {
    let mut ordered: Vec<&CalendarDay> = year.days.iter().collect();
    ordered.sort_by_key(|d| d.enoch.day_of_year);
    let bounds: Vec<_> = (0..ordered.len()).map(|i| day_bounds(&ordered, i)).collect();
    let mut writer = IcsWriter::new(year.year, stamp);

    for (doy, festival) in festival_map(year) {
        let Some(index) = ordered.iter().position(|d| d.enoch.day_of_year == doy) else {
            continue;
        };
        let Some((start, end)) = bounds[index] else { continue };
        let day = ordered[index];
        let mut description = vec![enoch_line(day)];
        description.extend(utc_lines(start, end));
        writer.event(
            format!("enoch-{}-{}-festival", day.enoch.year, doy),
            start,
            end,
            &festival.name,
            &description.join("\n"),
            "Festival",
        );
    }

    for (index, day) in ordered.iter().enumerate() {
        let doy = day.enoch.day_of_year;
        let lunar = day.lunar.as_ref();

        if let Some(lunar) = lunar {
            let dated = lunar
                .event
                .as_deref()
                .zip(lunar.event_utc.as_deref().and_then(parse_utc));
            if let Some((event, at)) = dated {
                writer.event(
                    format!("enoch-{}-{}-moon-{}", day.enoch.year, doy, event),
                    at,
                    at + Duration::hours(1),
                    moon_event_label(event),
                    &moon_description(lunar).join("\n"),
                    "Astronomy",
                );
            }
        }

        let Some((start, end)) = bounds[index] else { continue };
        let mut description = vec![enoch_line(day)];
        description.extend(utc_lines(start, end));
        description.push(format!(
            "Added week: {}",
            if day.enoch.added_week { "Yes" } else { "No" }
        ));
        if let Some(lunar) = lunar {
            description.extend(moon_description(lunar));
        }
        writer.event(
            format!("enoch-{}-{}-day-span", day.enoch.year, doy),
            start,
            end,
            &day_summary(day),
            &description.join("\n"),
            "Enoch",
        );
    }

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::fixtures::sample_year;
    use chrono::TimeZone;
    use rstest::rstest;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn events(text: &str) -> Vec<&str> {
        text.split("BEGIN:VEVENT").skip(1).collect()
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("a,b;c", "a\\,b\\;c")]
    #[case("line\nnext", "line\\nnext")]
    #[case("back\\slash", "back\\\\slash")]
    fn text_values_are_escaped(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_text(raw), expected);
    }

    #[test]
    fn file_is_a_crlf_calendar() {
        let text = to_ics(&sample_year(5996, false), stamp());
        assert!(text.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(text.ends_with("END:VCALENDAR\r\n"));
        assert!(text.contains("\r\nX-WR-TIMEZONE:UTC\r\n"));
        assert!(!text.replace("\r\n", "").contains('\n'));
        assert_eq!(ics_file_name(5996), "enoch-astro-5996.ics");
    }

    #[test]
    fn festivals_and_days_each_get_an_event() {
        let text = to_ics(&sample_year(5996, false), stamp());
        let all = events(&text);
        assert_eq!(all.len(), 76 + 364);
        assert!(all.iter().all(|e| e.contains("DTSTAMP:20250102T030405Z")));

        let uids: HashSet<&str> = text.lines().filter(|l| l.starts_with("UID:")).collect();
        assert_eq!(uids.len(), all.len());

        let kippur = all
            .iter()
            .find(|e| e.contains("UID:enoch-5996-192-festival@enoch.calendar"))
            .unwrap();
        assert!(kippur.contains("SUMMARY:Yom Kippur\r\n"));
        assert!(kippur.contains("CATEGORIES:Festival"));
    }

    #[test]
    fn day_without_times_spans_its_gregorian_date() {
        let text = to_ics(&sample_year(5996, false), stamp());
        let first = events(&text)
            .into_iter()
            .find(|e| e.contains("UID:enoch-5996-1-day-span@"))
            .unwrap();
        assert!(first.contains("DTSTART:20250326T000000Z"));
        assert!(first.contains("DTEND:20250327T000000Z"));
        assert!(first.contains("SUMMARY:1 Aries\u{2648} 5996"));
        assert!(first.contains("Enoch: Y5996 M1 D1 (DOY 1)"));
    }

    #[test]
    fn missing_edges_come_from_neighbours() {
        let mut year = sample_year(5996, false);
        year.days[0].end_utc = "2025-03-26T18:00:00Z".to_string();
        year.days[2].start_utc = "2025-03-28T18:00:00+00:00".to_string();
        let ordered: Vec<&CalendarDay> = year.days.iter().collect();

        let (start, end) = day_bounds(&ordered, 1).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 26, 18, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 28, 18, 0, 0).unwrap());

        let (start, end) = day_bounds(&ordered, 0).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 26, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 26, 18, 0, 0).unwrap());
        assert!(day_bounds(&ordered, 400).is_none());
    }

    #[test]
    fn dated_moon_event_is_written_once() {
        let mut year = sample_year(5996, false);
        year.days[13].lunar = Some(LunarDetails {
            illumination: Some(1.0),
            event: Some("full_moon".to_string()),
            event_utc: Some("2025-04-08T06:21:00".to_string()),
            ..Default::default()
        });
        let text = to_ics(&year, stamp());
        let moon: Vec<_> = events(&text)
            .into_iter()
            .filter(|e| e.contains("CATEGORIES:Astronomy"))
            .collect();
        assert_eq!(moon.len(), 1);
        assert!(moon[0].contains("SUMMARY:Full Moon"));
        assert!(moon[0].contains("DTSTART:20250408T062100Z"));
        assert!(moon[0].contains("DTEND:20250408T072100Z"));
        assert!(moon[0].contains("Illumination: 100.0%"));
    }

    #[test]
    fn out_of_range_moments_are_skipped() {
        let far = Utc.with_ymd_and_hms(9999, 12, 31, 23, 30, 0).unwrap();
        assert!(ics_stamp(far).is_some());
        assert!(ics_stamp(far + Duration::hours(1)).is_none());
    }
}
