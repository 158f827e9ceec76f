//! Unit conversions shared by the per-provider normalizers.
//!
//! Providers disagree on native units (km/h vs m/s vs mph, mb vs hPa,
//! km vs m). Everything here is a pure function so the normalizers stay
//! deterministic and trivially testable.

use serde::{Deserialize, Serialize};

/// Unit system requested by the caller.
///
/// Metric means Celsius and m/s; Imperial means Fahrenheit and mph.
/// Pressure is always hPa and visibility always meters, in both systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Units {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{s}'. Supported: metric, imperial."
            )),
        }
    }
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn ms_to_mph(ms: f64) -> f64 {
    ms * 2.237
}

pub fn mph_to_ms(mph: f64) -> f64 {
    mph / 2.237
}

pub fn kph_to_ms(kph: f64) -> f64 {
    kph / 3.6
}

pub fn ms_to_kph(ms: f64) -> f64 {
    ms * 3.6
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm * 0.039_370_1
}

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass rose. Each point covers a 22.5 degree sector centered
/// on its heading, so 348.75..11.25 is "N".
pub fn compass_point(degrees: f64) -> &'static str {
    let index = (degrees / 22.5).round().rem_euclid(16.0) as usize;
    COMPASS_POINTS[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn temperature_round_trip() {
        for c in [-40.0, 0.0, 15.0, 37.5, 100.0] {
            let back = fahrenheit_to_celsius(celsius_to_fahrenheit(c));
            assert!((back - c).abs() < EPS, "{c} came back as {back}");
        }
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < EPS);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < EPS);
    }

    #[test]
    fn wind_speed_round_trip() {
        for ms in [0.0, 3.0, 12.7, 40.0] {
            let back = mph_to_ms(ms_to_mph(ms));
            assert!((back - ms).abs() < EPS);
            let back = kph_to_ms(ms_to_kph(ms));
            assert!((back - ms).abs() < EPS);
        }
    }

    #[test]
    fn kph_to_ms_matches_weatherapi_convention() {
        // 3.6 km/h is exactly 1 m/s
        assert!((kph_to_ms(3.6) - 1.0).abs() < EPS);
    }

    #[test]
    fn precipitation_conversion() {
        assert!((mm_to_inches(25.4) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn compass_cardinal_points() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(90.0), "E");
        assert_eq!(compass_point(180.0), "S");
        assert_eq!(compass_point(270.0), "W");
        assert_eq!(compass_point(360.0), "N");
    }

    #[test]
    fn compass_sector_boundaries() {
        // 11.25 rounds up into NNE, 348.75 rounds up into N
        assert_eq!(compass_point(11.3), "NNE");
        assert_eq!(compass_point(11.2), "N");
        assert_eq!(compass_point(348.8), "N");
        assert_eq!(compass_point(348.7), "NNW");
    }

    #[test]
    fn units_parse() {
        assert_eq!("metric".parse::<Units>().unwrap(), Units::Metric);
        assert_eq!("IMPERIAL".parse::<Units>().unwrap(), Units::Imperial);
        assert!("kelvin".parse::<Units>().is_err());
    }
}
