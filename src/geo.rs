use crate::error::{AstrologyError, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};
use urlencoding::encode;

pub const GEONAMES_TIMEZONE_URL: &str = "https://secure.geonames.org/timezoneJSON";
pub const FALLBACK_TIMEZONE: &str = "UTC";

#[derive(Debug, Deserialize)]
struct TimezoneResponse {
    #[serde(rename = "timezoneId")]
    timezone_id: Option<String>,
}

fn timezone_url(base: &str, latitude: f64, longitude: f64, username: &str) -> String {
    format!(
        "{}?lat={}&lng={}&username={}",
        base,
        latitude,
        longitude,
        encode(username)
    )
}

async fn fetch_timezone(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(AstrologyError::Api {
            status: response.status().as_u16(),
        });
    }
    let body: TimezoneResponse = response.json().await?;
    body.timezone_id
        .filter(|tz| !tz.trim().is_empty())
        .ok_or(AstrologyError::MissingField("timezoneId"))
}

/// IANA timezone for a coordinate, or `"UTC"` when the lookup cannot be made.
pub async fn lookup_timezone(
    client: &Client,
    latitude: f64,
    longitude: f64,
    username: Option<&str>,
) -> String {
    let Some(username) = username else {
        warn!("no geonames username configured, using {}", FALLBACK_TIMEZONE);
        return FALLBACK_TIMEZONE.to_string();
    };
    let url = timezone_url(GEONAMES_TIMEZONE_URL, latitude, longitude, username);
    match fetch_timezone(client, &url).await {
        Ok(tz) => {
            info!("timezone for ({}, {}) is {}", latitude, longitude, tz);
            tz
        }
        Err(err) => {
            warn!("timezone lookup failed ({}), using {}", err, FALLBACK_TIMEZONE);
            FALLBACK_TIMEZONE.to_string()
        }
    }
}
