//! Client side of the remote calculation service.
//!
//! The service takes a local datetime plus a location and answers with planet
//! longitudes, house cusps and the Enoch date for that moment.

use crate::config::{Location, Settings};
use crate::error::{AstrologyError, Result};
use crate::houses::{BodyPosition, HouseCusp};
use crate::zodiac::{CelestialBody, ZodiacSign};
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

pub const REQUEST_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------
// ## Wire Types
// ---------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationRequest {
    pub datetime: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl CalculationRequest {
    pub fn new(datetime: NaiveDateTime, location: &Location) -> Self {
        Self {
            datetime: datetime.format(REQUEST_DATETIME_FORMAT).to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            timezone: location.timezone.clone(),
        }
    }
}

/// A planet entry; the service has sent both `{"longitude": x}` and a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PlanetValue {
    Detailed { longitude: Option<f64> },
    Bare(f64),
}

impl PlanetValue {
    pub fn longitude(&self) -> Option<f64> {
        match self {
            PlanetValue::Detailed { longitude } => *longitude,
            PlanetValue::Bare(value) => Some(*value),
        }
    }
}

/// Ascendant or Midheaven.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisPoint {
    pub degree: f64,
    pub sign: ZodiacSign,
    pub position: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HousesData {
    pub ascendant: Option<AxisPoint>,
    pub midheaven: Option<AxisPoint>,
    #[serde(default)]
    pub houses: Vec<HouseCusp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnochFields {
    pub enoch_year: i32,
    pub enoch_month: u8,
    pub enoch_day: u8,
    pub enoch_day_of_year: u16,
    #[serde(default)]
    pub added_week: bool,
    #[serde(default)]
    pub enoch_start: Option<String>,
    #[serde(default)]
    pub start_utc: Option<String>,
    #[serde(default)]
    pub end_utc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CalculationResponse {
    #[serde(default, alias = "positions")]
    pub planets: BTreeMap<String, PlanetValue>,
    #[serde(default)]
    pub houses_data: Option<HousesData>,
    #[serde(default)]
    pub enoch: Option<EnochFields>,
    #[serde(default)]
    pub julian_day: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CalculationResponse {
    /// Known bodies in preferred order. Unknown names and entries without a
    /// longitude are dropped with a warning.
    pub fn body_positions(&self) -> Vec<BodyPosition> {
        let mut positions = Vec::with_capacity(self.planets.len());
        for (name, value) in &self.planets {
            let body = match name.parse::<CelestialBody>() {
                Ok(body) => body,
                Err(_) => {
                    debug!("ignoring unknown body `{}`", name);
                    continue;
                }
            };
            match value.longitude() {
                Some(longitude) => positions.push(BodyPosition::new(body, longitude)),
                None => warn!("{} has no longitude, leaving it out", body),
            }
        }
        positions.sort_by_key(|p| p.body);
        positions
    }

    pub fn houses(&self) -> Result<&HousesData> {
        self.houses_data
            .as_ref()
            .ok_or(AstrologyError::MissingField("houses_data"))
    }

    pub fn enoch(&self) -> Result<&EnochFields> {
        self.enoch.as_ref().ok_or(AstrologyError::MissingField("enoch"))
    }
}

#[derive(Debug, Serialize)]
struct YearRequest<'a> {
    #[serde(flatten)]
    request: &'a CalculationRequest,
    zodiac_mode: &'static str,
}

/// One day as the annual endpoint reports it, lunar fields included.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct YearDayRecord {
    pub gregorian: String,
    pub enoch_year: Option<i32>,
    pub enoch_month: Option<u8>,
    pub enoch_day: Option<u8>,
    pub day_of_year: Option<u16>,
    pub added_week: Option<bool>,
    pub name: Option<String>,
    pub start_utc: Option<String>,
    pub end_utc: Option<String>,
    pub moon_phase_angle_deg: Option<f64>,
    pub moon_illum: Option<f64>,
    pub moon_event: Option<String>,
    pub moon_event_utc: Option<String>,
    pub moon_sign: Option<String>,
    pub moon_distance_km: Option<f64>,
    pub perigee: Option<bool>,
    pub apogee: Option<bool>,
    pub solar_eclipse: Option<bool>,
    pub lunar_eclipse: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct YearResponse {
    pub ok: bool,
    pub enoch_year: Option<i32>,
    pub days: Vec<YearDayRecord>,
    /// `approx` when the service could not compute precise lunar data.
    pub quality: Option<String>,
    pub error: Option<String>,
}

impl YearResponse {
    /// Rejects answers flagged as failed or carrying no days.
    pub fn checked(self) -> Result<Self> {
        if !self.ok {
            let message = self
                .error
                .unwrap_or_else(|| "annual calculation failed".to_string());
            return Err(AstrologyError::Remote(message));
        }
        if self.days.is_empty() {
            return Err(AstrologyError::Remote(
                "annual calculation returned no days".to_string(),
            ));
        }
        Ok(self)
    }
}

// ---------------------------
// ## Sources
// ---------------------------

/// Anything that can answer a calculation request.
pub trait CalculationSource: Send + Sync {
    fn calculate(
        &self,
        request: &CalculationRequest,
    ) -> impl Future<Output = Result<CalculationResponse>> + Send;

    /// Whole Enoch year containing the request moment in one call. Sources
    /// without an annual endpoint keep the default, and callers fall back
    /// to asking day by day.
    fn calculate_year(
        &self,
        _request: &CalculationRequest,
    ) -> impl Future<Output = Result<YearResponse>> + Send {
        async { Err(AstrologyError::Unsupported("annual calculation")) }
    }
}

/// Annual endpoint next to the per-moment one: `.../calculate` becomes
/// `.../calcYear`, anything else gets `/calcYear` appended.
pub fn year_url(calculate_url: &str) -> String {
    match calculate_url.strip_suffix("/calculate") {
        Some(root) => format!("{}/calcYear", root),
        None => format!("{}/calcYear", calculate_url.trim_end_matches('/')),
    }
}

/// JSON-over-HTTP source with an optional fallback endpoint.
#[derive(Debug, Clone)]
pub struct HttpCalculationClient {
    client: Client,
    api_url: String,
    fallback_url: Option<String>,
}

impl HttpCalculationClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            fallback_url: settings.fallback_api_url.clone(),
        })
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AstrologyError::Api {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn post(&self, url: &str, request: &CalculationRequest) -> Result<CalculationResponse> {
        debug!("POST {} datetime={}", url, request.datetime);
        let body: CalculationResponse = self.post_json(url, request).await?;
        if let Some(message) = body.error {
            return Err(AstrologyError::Remote(message));
        }
        Ok(body)
    }

    async fn post_year(&self, url: &str, request: &CalculationRequest) -> Result<YearResponse> {
        let url = year_url(url);
        debug!("POST {} datetime={}", url, request.datetime);
        let body = YearRequest {
            request,
            zodiac_mode: "tropical",
        };
        let answer: YearResponse = self.post_json(&url, &body).await?;
        answer.checked()
    }
}

/// Server-side and transport failures are worth one more try elsewhere;
/// client errors and bad payloads are not.
fn worth_fallback(err: &AstrologyError) -> bool {
    match err {
        AstrologyError::Api { status } => *status >= 500,
        AstrologyError::Http(e) => !e.is_decode(),
        _ => false,
    }
}

impl CalculationSource for HttpCalculationClient {
    async fn calculate(&self, request: &CalculationRequest) -> Result<CalculationResponse> {
        match self.post(&self.api_url, request).await {
            Ok(response) => Ok(response),
            Err(err) => match &self.fallback_url {
                Some(fallback) if worth_fallback(&err) => {
                    warn!("primary calculation API failed ({}), trying fallback", err);
                    self.post(fallback, request).await
                }
                _ => Err(err),
            },
        }
    }

    async fn calculate_year(&self, request: &CalculationRequest) -> Result<YearResponse> {
        match self.post_year(&self.api_url, request).await {
            Ok(answer) => Ok(answer),
            Err(err) => match &self.fallback_url {
                Some(fallback) if worth_fallback(&err) => {
                    warn!("primary annual calculation failed ({}), trying fallback", err);
                    self.post_year(fallback, request).await
                }
                _ => Err(err),
            },
        }
    }
}
