//! WeatherAPI.com adapter and normalizers.
//!
//! Serves current weather, hourly/3-day forecast, marine, historical, and
//! astronomy data. Every payload carries both metric and imperial fields
//! (`temp_c`/`temp_f`, `wind_kph`/`wind_mph`, ...), so the normalizers pick
//! the field matching the requested unit system instead of converting a
//! value the provider already supplies. The one genuine conversion is km/h
//! to m/s for metric wind, which the API does not offer natively.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::{
    condition::ConditionKind,
    error::ProviderError,
    model::{
        AstronomyReading, Condition, Coordinates, ForecastEntry, ForecastSeries, HistoricalHour,
        HistoricalReading, MarineDaySummary, MarineHour, MarineReading, Temperature,
        UNKNOWN_LOCATION, WeatherSnapshot, Wind,
    },
    provider::{ProviderId, WeatherProvider, truncate_body, unix_to_utc},
    units::{Units, compass_point, kph_to_ms},
};

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

const FORECAST_DAYS: u8 = 3;

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    http: Client,
    base_url: String,
}

impl WeatherApiProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different host. Test seam for mocked upstreams.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        coords: Coordinates,
        extra: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.base_url);
        let q = format!("{},{}", coords.lat, coords.lon);

        let mut query: Vec<(&str, &str)> =
            vec![("key", self.api_key.as_str()), ("q", q.as_str())];
        query.extend_from_slice(extra);

        let res = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: ProviderId::WeatherApi,
                status: None,
                message: e.to_string(),
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: ProviderId::WeatherApi,
                status: Some(status.as_u16()),
                message: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(ProviderError::RequestFailed {
                provider: ProviderId::WeatherApi,
                status: Some(status.as_u16()),
                message: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Normalization {
            provider: ProviderId::WeatherApi,
            reason: format!("{path}: {e}"),
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn current(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let raw: WaCurrentResponse = self.get_json("/v1/current.json", coords, &[]).await?;
        Ok(normalize_current(&raw, units))
    }

    async fn forecast(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<ForecastSeries, ProviderError> {
        let days = FORECAST_DAYS.to_string();
        let raw: WaForecastResponse = self
            .get_json("/v1/forecast.json", coords, &[("days", days.as_str())])
            .await?;
        Ok(normalize_forecast(&raw, units))
    }

    async fn marine(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<MarineReading, ProviderError> {
        let raw: WaForecastResponse = self
            .get_json("/v1/marine.json", coords, &[("days", "1")])
            .await?;
        normalize_marine(&raw, units)
    }

    async fn historical(
        &self,
        coords: Coordinates,
        date: NaiveDate,
        units: Units,
    ) -> Result<HistoricalReading, ProviderError> {
        let dt = date.format("%Y-%m-%d").to_string();
        let raw: WaForecastResponse = self
            .get_json("/v1/history.json", coords, &[("dt", dt.as_str())])
            .await?;
        normalize_historical(&raw, units)
    }

    async fn astronomy(
        &self,
        coords: Coordinates,
        date: NaiveDate,
    ) -> Result<AstronomyReading, ProviderError> {
        let dt = date.format("%Y-%m-%d").to_string();
        let raw: WaAstronomyResponse = self
            .get_json("/v1/astronomy.json", coords, &[("dt", dt.as_str())])
            .await?;
        Ok(normalize_astronomy(&raw, date))
    }
}

// ---- raw payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct WaLocation {
    pub name: Option<String>,
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub localtime_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WaCondition {
    pub text: String,
    pub code: i64,
}

#[derive(Debug, Deserialize)]
pub struct WaCurrent {
    pub last_updated_epoch: Option<i64>,
    pub temp_c: f64,
    pub temp_f: f64,
    pub feelslike_c: f64,
    pub feelslike_f: f64,
    pub condition: WaCondition,
    pub wind_mph: f64,
    pub wind_kph: f64,
    pub wind_degree: f64,
    pub pressure_mb: f64,
    pub humidity: u8,
    pub vis_km: f64,
}

#[derive(Debug, Deserialize)]
pub struct WaCurrentResponse {
    pub location: WaLocation,
    pub current: WaCurrent,
}

#[derive(Debug, Deserialize)]
pub struct WaHour {
    pub time_epoch: i64,
    pub temp_c: f64,
    pub temp_f: f64,
    pub feelslike_c: f64,
    pub feelslike_f: f64,
    pub condition: WaCondition,
    pub wind_mph: f64,
    pub wind_kph: f64,
    pub wind_degree: f64,
    pub pressure_mb: f64,
    pub humidity: u8,
    pub cloud: u8,
    pub vis_km: f64,
    #[serde(default)]
    pub precip_mm: f64,
    #[serde(default)]
    pub precip_in: f64,
    pub gust_mph: Option<f64>,
    pub gust_kph: Option<f64>,
    // Present in marine.json hours only.
    pub sig_ht_mt: Option<f64>,
    pub swell_period_secs: Option<f64>,
    pub swell_dir: Option<f64>,
    pub water_temp_c: Option<f64>,
    pub water_temp_f: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WaDay {
    pub maxtemp_c: f64,
    pub maxtemp_f: f64,
    pub mintemp_c: f64,
    pub mintemp_f: f64,
    pub avgtemp_c: f64,
    pub avgtemp_f: f64,
    pub maxwind_mph: f64,
    pub maxwind_kph: f64,
    #[serde(default)]
    pub totalprecip_mm: f64,
    #[serde(default)]
    pub totalprecip_in: f64,
    pub avghumidity: Option<f64>,
    pub condition: WaCondition,
}

#[derive(Debug, Deserialize)]
pub struct WaForecastDay {
    pub date: String,
    pub day: WaDay,
    pub hour: Vec<WaHour>,
}

#[derive(Debug, Deserialize)]
pub struct WaForecast {
    pub forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
pub struct WaForecastResponse {
    pub location: WaLocation,
    pub forecast: WaForecast,
}

#[derive(Debug, Deserialize)]
pub struct WaAstro {
    pub sunrise: String,
    pub sunset: String,
    pub moonrise: String,
    pub moonset: String,
    pub moon_phase: String,
    #[serde(deserialize_with = "number_or_string_u8")]
    pub moon_illumination: u8,
    #[serde(default)]
    pub is_moon_up: u8,
    #[serde(default)]
    pub is_sun_up: u8,
}

#[derive(Debug, Deserialize)]
pub struct WaAstronomy {
    pub astro: WaAstro,
}

#[derive(Debug, Deserialize)]
pub struct WaAstronomyResponse {
    pub location: WaLocation,
    pub astronomy: WaAstronomy,
}

/// Older API revisions serialize moon illumination as a string ("74"),
/// newer ones as a number.
fn number_or_string_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n.round().clamp(0.0, 100.0) as u8),
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(|n| n.round().clamp(0.0, 100.0) as u8)
            .map_err(serde::de::Error::custom),
    }
}

// ---- normalizers --------------------------------------------------------

fn condition_of(raw: &WaCondition) -> Condition {
    Condition::new(
        raw.code,
        ConditionKind::from_weatherapi_code(raw.code),
        raw.text.clone(),
    )
}

fn location_name(loc: &WaLocation) -> String {
    loc.name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}

fn wind_speed(kph: f64, mph: f64, units: Units) -> f64 {
    match units {
        Units::Metric => kph_to_ms(kph),
        Units::Imperial => mph,
    }
}

fn pick(metric: f64, imperial: f64, units: Units) -> f64 {
    match units {
        Units::Metric => metric,
        Units::Imperial => imperial,
    }
}

fn parse_date(provider_date: &str) -> Result<NaiveDate, ProviderError> {
    NaiveDate::parse_from_str(provider_date, "%Y-%m-%d").map_err(|e| {
        ProviderError::Normalization {
            provider: ProviderId::WeatherApi,
            reason: format!("unparseable date '{provider_date}': {e}"),
        }
    })
}

fn first_day<'a>(
    raw: &'a WaForecastResponse,
    endpoint: &str,
) -> Result<&'a WaForecastDay, ProviderError> {
    raw.forecast
        .forecastday
        .first()
        .ok_or_else(|| ProviderError::Normalization {
            provider: ProviderId::WeatherApi,
            reason: format!("{endpoint} response contained no forecastday data"),
        })
}

pub fn normalize_current(raw: &WaCurrentResponse, units: Units) -> WeatherSnapshot {
    let c = &raw.current;
    let temp = pick(c.temp_c, c.temp_f, units);
    let ts = c.last_updated_epoch.or(raw.location.localtime_epoch);

    WeatherSnapshot {
        coordinates: Coordinates {
            lat: raw.location.lat,
            lon: raw.location.lon,
        },
        condition: condition_of(&c.condition),
        temperature: Temperature {
            current: temp,
            feels_like: pick(c.feelslike_c, c.feelslike_f, units),
            // current.json has no min/max; mirror the observed temperature.
            min: temp,
            max: temp,
        },
        humidity_percent: c.humidity,
        pressure_hpa: c.pressure_mb,
        visibility_meters: c.vis_km * 1000.0,
        wind: Wind {
            speed: wind_speed(c.wind_kph, c.wind_mph, units),
            direction_degrees: c.wind_degree,
        },
        location_name: location_name(&raw.location),
        country_code: raw.location.country.clone().unwrap_or_default(),
        provider: ProviderId::WeatherApi.display_name().to_string(),
        observation_time: ts.and_then(unix_to_utc).unwrap_or_else(Utc::now),
    }
}

pub fn normalize_forecast(raw: &WaForecastResponse, units: Units) -> ForecastSeries {
    let mut entries: Vec<ForecastEntry> = raw
        .forecast
        .forecastday
        .iter()
        .flat_map(|day| day.hour.iter())
        .map(|h| {
            let temp = pick(h.temp_c, h.temp_f, units);
            ForecastEntry {
                timestamp: unix_to_utc(h.time_epoch).unwrap_or_else(Utc::now),
                condition: condition_of(&h.condition),
                temperature: Temperature {
                    current: temp,
                    feels_like: pick(h.feelslike_c, h.feelslike_f, units),
                    min: temp,
                    max: temp,
                },
                humidity_percent: h.humidity,
                pressure_hpa: h.pressure_mb,
                visibility_meters: h.vis_km * 1000.0,
                wind: Wind {
                    speed: wind_speed(h.wind_kph, h.wind_mph, units),
                    direction_degrees: h.wind_degree,
                },
            }
        })
        .collect();
    entries.sort_by_key(|e| e.timestamp);

    ForecastSeries {
        coordinates: Coordinates {
            lat: raw.location.lat,
            lon: raw.location.lon,
        },
        location_name: location_name(&raw.location),
        country_code: raw.location.country.clone().unwrap_or_default(),
        entries,
        provider: ProviderId::WeatherApi.display_name().to_string(),
    }
}

pub fn normalize_marine(
    raw: &WaForecastResponse,
    units: Units,
) -> Result<MarineReading, ProviderError> {
    let day = first_day(raw, "marine.json")?;

    let hours = day
        .hour
        .iter()
        .map(|h| MarineHour {
            timestamp: unix_to_utc(h.time_epoch).unwrap_or_else(Utc::now),
            // 0.0 when the source omits swell data for an hour.
            wave_height_m: h.sig_ht_mt.unwrap_or_default(),
            wave_period_s: h.swell_period_secs,
            wave_direction_degrees: h.swell_dir,
            water_temperature: match units {
                Units::Metric => h.water_temp_c,
                Units::Imperial => h.water_temp_f,
            },
            temperature: Some(pick(h.temp_c, h.temp_f, units)),
            wind: Some(Wind {
                speed: wind_speed(h.wind_kph, h.wind_mph, units),
                direction_degrees: h.wind_degree,
            }),
            wind_compass: Some(compass_point(h.wind_degree).to_string()),
            gust_speed: match units {
                Units::Metric => h.gust_kph.map(kph_to_ms),
                Units::Imperial => h.gust_mph,
            },
            pressure_hpa: Some(h.pressure_mb),
            humidity_percent: Some(h.humidity),
            cloud_percent: Some(h.cloud),
            visibility_meters: Some(h.vis_km * 1000.0),
            condition: Some(condition_of(&h.condition)),
        })
        .collect();

    Ok(MarineReading {
        coordinates: Coordinates {
            lat: raw.location.lat,
            lon: raw.location.lon,
        },
        location_name: location_name(&raw.location),
        date: parse_date(&day.date)?,
        hours,
        day: Some(MarineDaySummary {
            max_temperature: pick(day.day.maxtemp_c, day.day.maxtemp_f, units),
            min_temperature: pick(day.day.mintemp_c, day.day.mintemp_f, units),
            avg_temperature: pick(day.day.avgtemp_c, day.day.avgtemp_f, units),
            max_wind_speed: wind_speed(day.day.maxwind_kph, day.day.maxwind_mph, units),
            condition: condition_of(&day.day.condition),
        }),
        provider: ProviderId::WeatherApi.display_name().to_string(),
    })
}

pub fn normalize_historical(
    raw: &WaForecastResponse,
    units: Units,
) -> Result<HistoricalReading, ProviderError> {
    let day = first_day(raw, "history.json")?;

    let hours = day
        .hour
        .iter()
        .map(|h| HistoricalHour {
            timestamp: unix_to_utc(h.time_epoch).unwrap_or_else(Utc::now),
            temperature: pick(h.temp_c, h.temp_f, units),
            feels_like: pick(h.feelslike_c, h.feelslike_f, units),
            wind: Wind {
                speed: wind_speed(h.wind_kph, h.wind_mph, units),
                direction_degrees: h.wind_degree,
            },
            wind_compass: compass_point(h.wind_degree).to_string(),
            pressure_hpa: h.pressure_mb,
            precipitation: pick(h.precip_mm, h.precip_in, units),
            humidity_percent: h.humidity,
            cloud_percent: h.cloud,
            condition: condition_of(&h.condition),
        })
        .collect();

    Ok(HistoricalReading {
        coordinates: Coordinates {
            lat: raw.location.lat,
            lon: raw.location.lon,
        },
        location_name: location_name(&raw.location),
        date: parse_date(&day.date)?,
        max_temperature: pick(day.day.maxtemp_c, day.day.maxtemp_f, units),
        min_temperature: pick(day.day.mintemp_c, day.day.mintemp_f, units),
        avg_temperature: pick(day.day.avgtemp_c, day.day.avgtemp_f, units),
        max_wind_speed: wind_speed(day.day.maxwind_kph, day.day.maxwind_mph, units),
        total_precipitation: pick(day.day.totalprecip_mm, day.day.totalprecip_in, units),
        avg_humidity_percent: day.day.avghumidity.map(|h| h.round().clamp(0.0, 100.0) as u8),
        condition: condition_of(&day.day.condition),
        hours,
        provider: ProviderId::WeatherApi.display_name().to_string(),
    })
}

pub fn normalize_astronomy(raw: &WaAstronomyResponse, date: NaiveDate) -> AstronomyReading {
    let astro = &raw.astronomy.astro;
    AstronomyReading {
        coordinates: Coordinates {
            lat: raw.location.lat,
            lon: raw.location.lon,
        },
        location_name: location_name(&raw.location),
        date,
        sunrise: astro.sunrise.clone(),
        sunset: astro.sunset.clone(),
        moonrise: astro.moonrise.clone(),
        moonset: astro.moonset.clone(),
        moon_phase: astro.moon_phase.clone(),
        moon_illumination_percent: astro.moon_illumination,
        is_moon_up: astro.is_moon_up == 1,
        is_sun_up: astro.is_sun_up == 1,
        provider: ProviderId::WeatherApi.display_name().to_string(),
    }
}
