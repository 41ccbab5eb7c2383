use super::batch::build_year_from;
use super::cache::YearCache;
use super::{approximate_year_start, gregorian_year_for, CalendarYear};
use crate::api::{CalculationRequest, CalculationResponse, CalculationSource};
use crate::config::{Location, Settings};
use crate::error::{AstrologyError, Result};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{info, warn};

/// The calendar year being looked at, plus everything needed to move to
/// another one.
///
/// Only one build runs at a time. Every navigation call claims the build
/// guard without waiting; a call made while another is still running fails
/// with [`AstrologyError::BuildInProgress`] and nothing is cancelled. The
/// shown year sits behind its own lock, so readers keep seeing it during a
/// build, and it is replaced only once a new one is complete.
pub struct CalendarSession<S> {
    source: Arc<S>,
    location: Location,
    batch_size: usize,
    cache: Option<YearCache>,
    building: Mutex<()>,
    current: RwLock<Option<CalendarYear>>,
}

impl<S: CalculationSource + 'static> CalendarSession<S> {
    pub fn new(source: Arc<S>, location: Location, batch_size: usize) -> Self {
        Self {
            source,
            location,
            batch_size,
            cache: None,
            building: Mutex::new(()),
            current: RwLock::new(None),
        }
    }

    /// Session configured from settings, caching years under
    /// `<cache_dir>/calendar`.
    pub fn from_settings(source: Arc<S>, settings: &Settings) -> Self {
        Self::new(source, settings.location(), settings.batch_size)
            .with_cache(YearCache::new(settings.cache_dir.join("calendar")))
    }

    pub fn with_cache(mut self, cache: YearCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&YearCache> {
        self.cache.as_ref()
    }

    pub async fn current(&self) -> Option<CalendarYear> {
        self.current.read().await.clone()
    }

    fn claim(&self) -> Result<MutexGuard<'_, ()>> {
        self.building
            .try_lock()
            .map_err(|_| AstrologyError::BuildInProgress)
    }

    fn cached(&self, year: i32) -> Option<CalendarYear> {
        let cache = self.cache.as_ref()?;
        match cache.load(year) {
            Ok(found) => found,
            Err(err) => {
                warn!("ignoring unreadable cache for Enoch year {}: {}", year, err);
                None
            }
        }
    }

    async fn build(
        &self,
        reference: NaiveDateTime,
        base: Option<CalculationResponse>,
    ) -> Result<CalendarYear> {
        let base = match base {
            Some(base) => base,
            None => {
                self.source
                    .calculate(&CalculationRequest::new(reference, &self.location))
                    .await?
            }
        };
        let year =
            build_year_from(&self.source, &self.location, reference, &base, self.batch_size)
                .await?;

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(&year) {
                warn!("could not cache Enoch year {}: {}", year.year, err);
            }
        }
        Ok(year)
    }

    async fn install(&self, year: CalendarYear) -> CalendarYear {
        info!("showing Enoch year {} ({} days)", year.year, year.len());
        *self.current.write().await = Some(year.clone());
        year
    }

    /// Shows the year containing `reference`, from the cache when it is there.
    pub async fn load(&self, reference: NaiveDateTime) -> Result<CalendarYear> {
        let _guard = self.claim()?;
        let base = self
            .source
            .calculate(&CalculationRequest::new(reference, &self.location))
            .await?;
        let year = base.enoch()?.enoch_year;

        let shown = match self.cached(year) {
            Some(found) => found,
            None => self.build(reference, Some(base)).await?,
        };
        Ok(self.install(shown).await)
    }

    /// Rebuilds the year containing `reference` from the service, skipping
    /// the cache on the way in.
    pub async fn rebuild(&self, reference: NaiveDateTime) -> Result<CalendarYear> {
        let _guard = self.claim()?;
        let built = self.build(reference, None).await?;
        Ok(self.install(built).await)
    }

    pub async fn previous(&self) -> Result<CalendarYear> {
        let _guard = self.claim()?;
        let (target, reference) = match &*self.current.read().await {
            Some(current) => (current.year - 1, current.previous_reference()),
            None => return Err(no_year_loaded()),
        };
        let shown = match self.cached(target) {
            Some(found) => found,
            None => self.build(reference, None).await?,
        };
        Ok(self.install(shown).await)
    }

    pub async fn next(&self) -> Result<CalendarYear> {
        let _guard = self.claim()?;
        let (target, reference) = match &*self.current.read().await {
            Some(current) => (current.year + 1, current.next_reference()),
            None => return Err(no_year_loaded()),
        };
        let shown = match self.cached(target) {
            Some(found) => found,
            None => self.build(reference, None).await?,
        };
        Ok(self.install(shown).await)
    }

    /// Shows an arbitrary Enoch year: cached when possible, otherwise built
    /// from an approximate start near the March equinox.
    pub async fn jump(&self, enoch_year: i32) -> Result<CalendarYear> {
        let _guard = self.claim()?;
        if let Some(found) = self.cached(enoch_year) {
            return Ok(self.install(found).await);
        }

        let gregorian = gregorian_year_for(enoch_year);
        let reference = approximate_year_start(gregorian).ok_or_else(|| {
            AstrologyError::InvalidInput(format!("Enoch year {} is out of range", enoch_year))
        })?;
        info!(
            "no cached Enoch year {}, building from {} (~{})",
            enoch_year, reference, gregorian
        );
        let built = self.build(reference, None).await?;
        if built.year != enoch_year {
            warn!(
                "asked for Enoch year {} but the service placed {} in {}",
                enoch_year, reference, built.year
            );
        }
        Ok(self.install(built).await)
    }
}

fn no_year_loaded() -> AstrologyError {
    AstrologyError::InvalidInput("no calendar year loaded yet".to_string())
}
