//! Provider condition codes mapped to a shared vocabulary.
//!
//! Each upstream source encodes conditions its own way: OpenWeatherMap uses
//! ids in the 200..804 range, WeatherAPI uses codes in the 1000..1282 range,
//! Open-Meteo reports WMO weather codes. All of them collapse into
//! [`ConditionKind`], which carries the provider-neutral icon id and main
//! category exposed to callers. Codes we have never seen map to
//! [`ConditionKind::Unknown`] instead of failing the whole response.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Sleet,
    Fog,
    Clear,
    PartlyCloudy,
    Cloudy,
    Unknown,
}

impl ConditionKind {
    /// Provider-neutral icon identifier.
    pub fn icon_id(&self) -> &'static str {
        match self {
            ConditionKind::Thunderstorm => "thunderstorm",
            ConditionKind::Drizzle => "drizzle",
            ConditionKind::Rain => "rain",
            ConditionKind::Snow => "snow",
            ConditionKind::Sleet => "sleet",
            ConditionKind::Fog => "fog",
            ConditionKind::Clear => "clear",
            ConditionKind::PartlyCloudy => "partly-cloudy",
            ConditionKind::Cloudy => "cloudy",
            ConditionKind::Unknown => "na",
        }
    }

    /// Main category label, e.g. "Rain".
    pub fn main(&self) -> &'static str {
        match self {
            ConditionKind::Thunderstorm => "Thunderstorm",
            ConditionKind::Drizzle => "Drizzle",
            ConditionKind::Rain => "Rain",
            ConditionKind::Snow => "Snow",
            ConditionKind::Sleet => "Sleet",
            ConditionKind::Fog => "Fog",
            ConditionKind::Clear => "Clear",
            ConditionKind::PartlyCloudy => "Partly Cloudy",
            ConditionKind::Cloudy => "Cloudy",
            ConditionKind::Unknown => "Unknown",
        }
    }

    /// OpenWeatherMap condition ids.
    /// See <https://openweathermap.org/weather-conditions>.
    pub fn from_openweather_id(id: i64) -> Self {
        match id {
            200..=232 => ConditionKind::Thunderstorm,
            300..=321 => ConditionKind::Drizzle,
            511 => ConditionKind::Sleet,
            500..=531 => ConditionKind::Rain,
            611..=616 => ConditionKind::Sleet,
            600..=622 => ConditionKind::Snow,
            701..=781 => ConditionKind::Fog,
            800 => ConditionKind::Clear,
            801 | 802 => ConditionKind::PartlyCloudy,
            803 | 804 => ConditionKind::Cloudy,
            _ => ConditionKind::Unknown,
        }
    }

    /// WeatherAPI condition codes.
    /// See <https://www.weatherapi.com/docs/weather_conditions.json>.
    pub fn from_weatherapi_code(code: i64) -> Self {
        match code {
            1000 => ConditionKind::Clear,
            1003 => ConditionKind::PartlyCloudy,
            1006 | 1009 => ConditionKind::Cloudy,
            1030 | 1135 | 1147 => ConditionKind::Fog,
            1150 | 1153 | 1168 | 1171 => ConditionKind::Drizzle,
            1063 | 1180 | 1183 | 1186 | 1189 | 1192 | 1195 | 1240 | 1243 | 1246 => {
                ConditionKind::Rain
            }
            1066 | 1114 | 1117 | 1210 | 1213 | 1216 | 1219 | 1222 | 1225 | 1255 | 1258 => {
                ConditionKind::Snow
            }
            1069 | 1072 | 1198 | 1201 | 1204 | 1207 | 1237 | 1249 | 1252 | 1261 | 1264 => {
                ConditionKind::Sleet
            }
            1087 | 1273 | 1276 | 1279 | 1282 => ConditionKind::Thunderstorm,
            _ => ConditionKind::Unknown,
        }
    }

    /// WMO weather interpretation codes as reported by Open-Meteo.
    /// See <https://open-meteo.com/en/docs#weathervariables>.
    pub fn from_wmo_code(code: i64) -> Self {
        match code {
            0 => ConditionKind::Clear,
            1 | 2 => ConditionKind::PartlyCloudy,
            3 => ConditionKind::Cloudy,
            45 | 48 => ConditionKind::Fog,
            51 | 53 | 55 => ConditionKind::Drizzle,
            56 | 57 | 66 | 67 => ConditionKind::Sleet,
            61 | 63 | 65 | 80 | 81 | 82 => ConditionKind::Rain,
            71 | 73 | 75 | 77 | 85 | 86 => ConditionKind::Snow,
            95 | 96 | 99 => ConditionKind::Thunderstorm,
            _ => ConditionKind::Unknown,
        }
    }
}
