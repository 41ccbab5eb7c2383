use super::csv_format::{export_file_name, export_year, parse_calendar_csv, to_csv};
use super::ics_format::{ics_file_name, to_ics};
use super::{CalendarDay, CalendarYear};
use chrono::Utc;
use crate::error::{AstrologyError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Replaces `path` with `contents` through a temp file in the same directory.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| AstrologyError::Io(e.error))?;
    Ok(())
}

/// One CSV file per Enoch year, named `enoch-calendar-<year>.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearCache {
    dir: PathBuf,
}

impl YearCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        self.dir.join(export_file_name(year))
    }

    /// `Ok(None)` when the year has never been stored or the file holds no
    /// usable rows.
    pub fn load(&self, year: i32) -> Result<Option<CalendarYear>> {
        let path = self.path_for(year);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no cached file for Enoch year {}", year);
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let days = parse_calendar_csv(&text, year)?;
        if days.is_empty() {
            warn!("{} has no usable rows, ignoring it", path.display());
            return Ok(None);
        }
        info!("loaded Enoch year {} from {}", year, path.display());
        Ok(CalendarYear::from_rows(year, days))
    }

    pub fn store(&self, year: &CalendarYear) -> Result<PathBuf> {
        let path = self.path_for(year.year);
        write_atomically(&path, to_csv(&year.days)?.as_bytes())?;
        debug!("stored Enoch year {} at {}", year.year, path.display());
        Ok(path)
    }
}

/// Writes `days` into `dir` under the name derived from their year.
pub fn export_to_dir(dir: &Path, days: &[CalendarDay]) -> Result<PathBuf> {
    let year = export_year(days)
        .ok_or_else(|| AstrologyError::InvalidInput("no calendar days to export".to_string()))?;
    let path = dir.join(export_file_name(year));
    write_atomically(&path, to_csv(days)?.as_bytes())?;
    info!("exported {} days to {}", days.len(), path.display());
    Ok(path)
}

/// Writes `year` into `dir` as `enoch-astro-<year>.ics`.
pub fn export_ics_to_dir(dir: &Path, year: &CalendarYear) -> Result<PathBuf> {
    if year.is_empty() {
        return Err(AstrologyError::InvalidInput("no calendar days to export".to_string()));
    }
    let path = dir.join(ics_file_name(year.year));
    write_atomically(&path, to_ics(year, Utc::now()).as_bytes())?;
    info!("exported Enoch year {} to {}", year.year, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::fixtures::sample_year;

    #[test]
    fn missing_year_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = YearCache::new(dir.path());
        assert!(cache.load(5996).unwrap().is_none());
    }

    #[test]
    fn stored_year_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = YearCache::new(dir.path().join("nested"));
        let year = sample_year(5996, true);

        let path = cache.store(&year).unwrap();
        assert!(path.ends_with("enoch-calendar-5996.csv"));

        let loaded = cache.load(5996).unwrap().unwrap();
        assert_eq!(loaded.year, 5996);
        assert_eq!(loaded.len(), 371);
        assert_eq!(loaded.start, year.start);
        assert_eq!(loaded.days, year.days);
    }

    #[test]
    fn header_only_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = YearCache::new(dir.path());
        fs::write(cache.path_for(5990), "gregorian,enoch_month,enoch_day\n").unwrap();
        assert!(cache.load(5990).unwrap().is_none());
    }

    #[test]
    fn export_names_file_after_year() {
        let dir = tempfile::tempdir().unwrap();
        let year = sample_year(6001, false);
        let path = export_to_dir(dir.path(), &year.days).unwrap();
        assert_eq!(path.file_name().unwrap(), "enoch-calendar-6001.csv");
        assert!(export_to_dir(dir.path(), &[]).is_err());
    }

    #[test]
    fn calendar_file_lands_beside_the_csv() {
        let dir = tempfile::tempdir().unwrap();
        let year = sample_year(5996, false);
        let path = export_ics_to_dir(dir.path(), &year).unwrap();
        assert_eq!(path.file_name().unwrap(), "enoch-astro-5996.ics");

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(text.contains("SUMMARY:Shavuot\r\n"));

        let empty = CalendarYear::new(5996, year.start, Vec::new());
        assert!(export_ics_to_dir(dir.path(), &empty).is_err());
    }
}
