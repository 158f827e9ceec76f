//! Open-Meteo adapter and normalizers.
//!
//! Keyless provider covering current weather, hourly forecast, marine wave
//! data, and past-day aggregates. Requests always ask for Celsius and m/s
//! (`windspeed_unit=ms`) and the normalizers convert to Fahrenheit/mph for
//! imperial callers; conditions arrive as WMO weather codes. Open-Meteo
//! never reports a location name, so snapshots carry the neutral
//! placeholder.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{
    condition::ConditionKind,
    error::ProviderError,
    model::{
        Condition, Coordinates, ForecastEntry, ForecastSeries, HistoricalReading, MarineHour,
        MarineReading, Temperature, UNKNOWN_LOCATION, WeatherSnapshot, Wind,
    },
    provider::{ProviderId, WeatherProvider, truncate_body, unix_to_utc},
    units::{Units, celsius_to_fahrenheit, mm_to_inches, ms_to_mph},
};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_MARINE_BASE_URL: &str = "https://marine-api.open-meteo.com";

const FORECAST_DAYS: u8 = 3;

const HOURLY_VARS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
surface_pressure,visibility,wind_speed_10m,wind_direction_10m,weather_code";

const DAILY_VARS: &str = "temperature_2m_max,temperature_2m_min,temperature_2m_mean,\
wind_speed_10m_max,precipitation_sum,weather_code";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    base_url: String,
    marine_base_url: String,
}

impl OpenMeteoProvider {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            marine_base_url: DEFAULT_MARINE_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different weather host. Test seam.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Point the adapter at a different marine host. Test seam.
    pub fn with_marine_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.marine_base_url = base_url.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let res = self.http.get(url).query(query).send().await.map_err(|e| {
            ProviderError::RequestFailed {
                provider: ProviderId::OpenMeteo,
                status: None,
                message: e.to_string(),
            }
        })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: ProviderId::OpenMeteo,
                status: Some(status.as_u16()),
                message: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(ProviderError::RequestFailed {
                provider: ProviderId::OpenMeteo,
                status: Some(status.as_u16()),
                message: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Normalization {
            provider: ProviderId::OpenMeteo,
            reason: e.to_string(),
        })
    }

    fn base_query(coords: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", coords.lat.to_string()),
            ("longitude", coords.lon.to_string()),
            ("timeformat", "unixtime".to_string()),
            ("timezone", "UTC".to_string()),
        ]
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn current(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let mut query = Self::base_query(coords);
        query.push(("current", HOURLY_VARS.to_string()));
        query.push(("windspeed_unit", "ms".to_string()));

        let url = format!("{}/v1/forecast", self.base_url);
        let raw: OmCurrentResponse = self.get_json(&url, &query).await?;

        Ok(normalize_current(&raw, units))
    }

    async fn forecast(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<ForecastSeries, ProviderError> {
        let mut query = Self::base_query(coords);
        query.push(("hourly", HOURLY_VARS.to_string()));
        query.push(("windspeed_unit", "ms".to_string()));
        query.push(("forecast_days", FORECAST_DAYS.to_string()));

        let url = format!("{}/v1/forecast", self.base_url);
        let raw: OmForecastResponse = self.get_json(&url, &query).await?;

        normalize_forecast(&raw, units)
    }

    async fn marine(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<MarineReading, ProviderError> {
        let mut query = Self::base_query(coords);
        query.push(("hourly", "wave_height,wave_direction,wave_period".to_string()));
        query.push(("forecast_days", "1".to_string()));

        let url = format!("{}/v1/marine", self.marine_base_url);
        let raw: OmMarineResponse = self.get_json(&url, &query).await?;

        let _ = units; // wave heights are meters in both unit systems
        normalize_marine(&raw)
    }

    async fn historical(
        &self,
        coords: Coordinates,
        date: NaiveDate,
        units: Units,
    ) -> Result<HistoricalReading, ProviderError> {
        let day = date.format("%Y-%m-%d").to_string();
        let mut query = Self::base_query(coords);
        query.push(("daily", DAILY_VARS.to_string()));
        query.push(("windspeed_unit", "ms".to_string()));
        query.push(("start_date", day.clone()));
        query.push(("end_date", day));

        let url = format!("{}/v1/forecast", self.base_url);
        let raw: OmHistoricalResponse = self.get_json(&url, &query).await?;

        normalize_historical(&raw, date, units)
    }
}

// ---- raw payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OmCurrent {
    pub time: i64,
    pub temperature_2m: f64,
    pub apparent_temperature: f64,
    pub relative_humidity_2m: f64,
    pub surface_pressure: f64,
    pub visibility: Option<f64>,
    pub wind_speed_10m: f64,
    pub wind_direction_10m: f64,
    pub weather_code: i64,
}

#[derive(Debug, Deserialize)]
pub struct OmCurrentResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub current: OmCurrent,
}

#[derive(Debug, Deserialize)]
pub struct OmHourly {
    pub time: Vec<i64>,
    pub temperature_2m: Vec<f64>,
    pub apparent_temperature: Vec<f64>,
    pub relative_humidity_2m: Vec<f64>,
    pub surface_pressure: Vec<f64>,
    pub visibility: Vec<Option<f64>>,
    pub wind_speed_10m: Vec<f64>,
    pub wind_direction_10m: Vec<f64>,
    pub weather_code: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OmForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub hourly: OmHourly,
}

#[derive(Debug, Deserialize)]
pub struct OmMarineHourly {
    pub time: Vec<i64>,
    pub wave_height: Vec<f64>,
    pub wave_direction: Vec<f64>,
    pub wave_period: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OmMarineResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub hourly: OmMarineHourly,
}

#[derive(Debug, Deserialize)]
pub struct OmDaily {
    pub time: Vec<String>,
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
    pub temperature_2m_mean: Vec<f64>,
    pub wind_speed_10m_max: Vec<f64>,
    pub precipitation_sum: Vec<f64>,
    pub weather_code: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OmHistoricalResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub daily: OmDaily,
}

// ---- normalizers --------------------------------------------------------

fn condition_of(code: i64) -> Condition {
    let kind = ConditionKind::from_wmo_code(code);
    // WMO codes carry no text of their own
    Condition::new(code, kind, kind.main())
}

fn temperature(celsius: f64, units: Units) -> f64 {
    match units {
        Units::Metric => celsius,
        Units::Imperial => celsius_to_fahrenheit(celsius),
    }
}

fn wind_speed(ms: f64, units: Units) -> f64 {
    match units {
        Units::Metric => ms,
        Units::Imperial => ms_to_mph(ms),
    }
}

pub fn normalize_current(raw: &OmCurrentResponse, units: Units) -> WeatherSnapshot {
    let c = &raw.current;
    let temp = temperature(c.temperature_2m, units);

    WeatherSnapshot {
        coordinates: Coordinates {
            lat: raw.latitude,
            lon: raw.longitude,
        },
        condition: condition_of(c.weather_code),
        temperature: Temperature {
            current: temp,
            feels_like: temperature(c.apparent_temperature, units),
            min: temp,
            max: temp,
        },
        humidity_percent: c.relative_humidity_2m.round().clamp(0.0, 100.0) as u8,
        pressure_hpa: c.surface_pressure,
        visibility_meters: c.visibility.unwrap_or(10_000.0),
        wind: Wind {
            speed: wind_speed(c.wind_speed_10m, units),
            direction_degrees: c.wind_direction_10m,
        },
        location_name: UNKNOWN_LOCATION.to_string(),
        country_code: String::new(),
        provider: ProviderId::OpenMeteo.display_name().to_string(),
        observation_time: unix_to_utc(c.time).unwrap_or_else(Utc::now),
    }
}

/// Zips the parallel hourly arrays into forecast entries. Mismatched array
/// lengths mean the payload is not what we asked for.
pub fn normalize_forecast(
    raw: &OmForecastResponse,
    units: Units,
) -> Result<ForecastSeries, ProviderError> {
    let h = &raw.hourly;
    let mut entries = Vec::with_capacity(h.time.len());

    for (i, &ts) in h.time.iter().enumerate() {
        let (Some(&temp), Some(&feels), Some(&humidity), Some(&pressure), Some(&speed), Some(&dir), Some(&code)) = (
            h.temperature_2m.get(i),
            h.apparent_temperature.get(i),
            h.relative_humidity_2m.get(i),
            h.surface_pressure.get(i),
            h.wind_speed_10m.get(i),
            h.wind_direction_10m.get(i),
            h.weather_code.get(i),
        ) else {
            return Err(ProviderError::Normalization {
                provider: ProviderId::OpenMeteo,
                reason: format!("hourly arrays have mismatched lengths at index {i}"),
            });
        };

        let temp = temperature(temp, units);
        entries.push(ForecastEntry {
            timestamp: unix_to_utc(ts).unwrap_or_else(Utc::now),
            condition: condition_of(code),
            temperature: Temperature {
                current: temp,
                feels_like: temperature(feels, units),
                min: temp,
                max: temp,
            },
            humidity_percent: humidity.round().clamp(0.0, 100.0) as u8,
            pressure_hpa: pressure,
            visibility_meters: h.visibility.get(i).copied().flatten().unwrap_or(10_000.0),
            wind: Wind {
                speed: wind_speed(speed, units),
                direction_degrees: dir,
            },
        });
    }
    entries.sort_by_key(|e| e.timestamp);

    Ok(ForecastSeries {
        coordinates: Coordinates {
            lat: raw.latitude,
            lon: raw.longitude,
        },
        location_name: UNKNOWN_LOCATION.to_string(),
        country_code: String::new(),
        entries,
        provider: ProviderId::OpenMeteo.display_name().to_string(),
    })
}

pub fn normalize_marine(raw: &OmMarineResponse) -> Result<MarineReading, ProviderError> {
    let h = &raw.hourly;
    let first_ts = h.time.first().copied().ok_or_else(|| {
        ProviderError::Normalization {
            provider: ProviderId::OpenMeteo,
            reason: "marine response contained no hourly data".to_string(),
        }
    })?;

    let mut hours = Vec::with_capacity(h.time.len());
    for (i, &ts) in h.time.iter().enumerate() {
        let Some(&height) = h.wave_height.get(i) else {
            return Err(ProviderError::Normalization {
                provider: ProviderId::OpenMeteo,
                reason: format!("marine hourly arrays have mismatched lengths at index {i}"),
            });
        };

        hours.push(MarineHour {
            timestamp: unix_to_utc(ts).unwrap_or_else(Utc::now),
            wave_height_m: height,
            wave_period_s: h.wave_period.get(i).copied(),
            wave_direction_degrees: h.wave_direction.get(i).copied(),
            water_temperature: None,
            temperature: None,
            wind: None,
            wind_compass: None,
            gust_speed: None,
            pressure_hpa: None,
            humidity_percent: None,
            cloud_percent: None,
            visibility_meters: None,
            condition: None,
        });
    }

    Ok(MarineReading {
        coordinates: Coordinates {
            lat: raw.latitude,
            lon: raw.longitude,
        },
        location_name: UNKNOWN_LOCATION.to_string(),
        date: unix_to_utc(first_ts)
            .unwrap_or_else(Utc::now)
            .date_naive(),
        hours,
        // the marine endpoint has no day-summary block
        day: None,
        provider: ProviderId::OpenMeteo.display_name().to_string(),
    })
}

pub fn normalize_historical(
    raw: &OmHistoricalResponse,
    date: NaiveDate,
    units: Units,
) -> Result<HistoricalReading, ProviderError> {
    let d = &raw.daily;
    let (
        Some(&max_c),
        Some(&min_c),
        Some(&mean_c),
        Some(&wind_ms),
        Some(&precip_mm),
        Some(&code),
    ) = (
        d.temperature_2m_max.first(),
        d.temperature_2m_min.first(),
        d.temperature_2m_mean.first(),
        d.wind_speed_10m_max.first(),
        d.precipitation_sum.first(),
        d.weather_code.first(),
    )
    else {
        return Err(ProviderError::Normalization {
            provider: ProviderId::OpenMeteo,
            reason: format!("no daily aggregates returned for {date}"),
        });
    };

    Ok(HistoricalReading {
        coordinates: Coordinates {
            lat: raw.latitude,
            lon: raw.longitude,
        },
        location_name: UNKNOWN_LOCATION.to_string(),
        date,
        max_temperature: temperature(max_c, units),
        min_temperature: temperature(min_c, units),
        avg_temperature: temperature(mean_c, units),
        max_wind_speed: wind_speed(wind_ms, units),
        total_precipitation: match units {
            Units::Metric => precip_mm,
            Units::Imperial => mm_to_inches(precip_mm),
        },
        avg_humidity_percent: None,
        condition: condition_of(code),
        // daily aggregates only; no hourly detail from this endpoint
        hours: Vec::new(),
        provider: ProviderId::OpenMeteo.display_name().to_string(),
    })
}
