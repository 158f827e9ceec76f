use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use skycast_core::{
    Config, ProviderId, ProviderRegistry, Units, WeatherService,
    model::{ForecastSeries, MarineReading, WeatherSnapshot},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Multi-provider weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Arguments shared by every weather lookup.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude in degrees (-90..90).
    pub lat: f64,

    /// Longitude in degrees (-180..180).
    pub lon: f64,

    /// Unit system: metric or imperial.
    #[arg(long, default_value = "metric")]
    pub units: Units,

    /// Preferred provider to try first, e.g. "openweather".
    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an API key for a provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Show current weather for a coordinate pair.
    Current(LocationArgs),

    /// Show the forecast for a coordinate pair.
    Forecast(LocationArgs),

    /// Show marine conditions for a coordinate pair.
    Marine(LocationArgs),

    /// Show past-day weather (within the last 7 days).
    Historical {
        #[command(flatten)]
        location: LocationArgs,

        /// Date to look up, YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
    },

    /// Show sun and moon rise/set times.
    Astronomy {
        lat: f64,
        lon: f64,

        /// Date to look up, YYYY-MM-DD; defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show air quality (OpenWeatherMap only).
    Air { lat: f64, lon: f64 },

    /// Resolve a free-text location into coordinates.
    Geocode {
        /// City name, e.g. "Paris".
        query: String,

        /// Optional ISO country code filter, e.g. "FR".
        #[arg(long)]
        country: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if let Command::Configure { provider } = &self.command {
            return configure(provider);
        }

        let config = Config::load()?;
        let http = reqwest::Client::new();
        let service = WeatherService::new(ProviderRegistry::from_config(&config, http));
        let default_provider = config.default_provider_id()?;

        match self.command {
            Command::Configure { .. } => unreachable!("handled above"),

            Command::Current(args) => {
                let preferred = preferred_provider(args.provider.as_deref(), default_provider)?;
                let snapshot = service
                    .get_weather_data(args.lat, args.lon, args.units, preferred)
                    .await?;
                print_snapshot(&snapshot, args.units);
            }

            Command::Forecast(args) => {
                let preferred = preferred_provider(args.provider.as_deref(), default_provider)?;
                let series = service
                    .get_forecast_data(args.lat, args.lon, args.units, preferred)
                    .await?;
                print_forecast(&series, args.units);
            }

            Command::Marine(args) => {
                let preferred = preferred_provider(args.provider.as_deref(), default_provider)?;
                let reading = service
                    .get_marine_weather_data(args.lat, args.lon, args.units, preferred)
                    .await?;
                print_marine(&reading, args.units);
            }

            Command::Historical { location, date } => {
                let preferred =
                    preferred_provider(location.provider.as_deref(), default_provider)?;
                let reading = service
                    .get_historical_weather_data(
                        location.lat,
                        location.lon,
                        date,
                        location.units,
                        preferred,
                    )
                    .await?;

                println!("{} on {} ({})", reading.location_name, reading.date, reading.provider);
                println!(
                    "  {} / {} / {} {} (min/avg/max), wind up to {:.1} {}",
                    reading.min_temperature,
                    reading.avg_temperature,
                    reading.max_temperature,
                    temp_unit(location.units),
                    reading.max_wind_speed,
                    speed_unit(location.units),
                );
                println!(
                    "  precipitation {:.1} {}, condition: {}",
                    reading.total_precipitation,
                    precip_unit(location.units),
                    reading.condition.description,
                );
            }

            Command::Astronomy { lat, lon, date } => {
                let date = date.unwrap_or_else(|| Utc::now().date_naive());
                let reading = service.get_astronomy_data(lat, lon, date).await?;

                println!("{} on {} ({})", reading.location_name, reading.date, reading.provider);
                println!("  sunrise {}  sunset {}", reading.sunrise, reading.sunset);
                println!(
                    "  moonrise {}  moonset {}  phase: {} ({}% lit)",
                    reading.moonrise,
                    reading.moonset,
                    reading.moon_phase,
                    reading.moon_illumination_percent,
                );
            }

            Command::Air { lat, lon } => {
                let reading = service.get_air_pollution_data(lat, lon).await?;

                println!("Air quality index: {} ({})", reading.aqi, reading.label);
                let c = &reading.components;
                println!(
                    "  pm2.5 {:.1}  pm10 {:.1}  o3 {:.1}  no2 {:.1}  so2 {:.2}  co {:.1} (all μg/m³)",
                    c.pm2_5, c.pm10, c.o3, c.no2, c.so2, c.co
                );
            }

            Command::Geocode { query, country } => {
                let matches = service
                    .get_city_coordinates(&query, country.as_deref())
                    .await?;

                if matches.is_empty() {
                    println!("No locations found for '{query}'.");
                }
                for m in matches {
                    match &m.state {
                        Some(state) => {
                            println!("{}, {state}, {}  ({:.4}, {:.4})", m.name, m.country, m.lat, m.lon)
                        }
                        None => println!("{}, {}  ({:.4}, {:.4})", m.name, m.country, m.lat, m.lon),
                    }
                }
            }
        }

        Ok(())
    }
}

fn preferred_provider(
    flag: Option<&str>,
    default: Option<ProviderId>,
) -> Result<Option<ProviderId>> {
    match flag {
        Some(s) => Ok(Some(ProviderId::try_from(s)?)),
        None => Ok(default),
    }
}

fn configure(provider: &str) -> Result<()> {
    let id = ProviderId::try_from(provider)?;
    if !id.requires_api_key() {
        println!("{id} needs no API key; it is always available.");
        return Ok(());
    }

    let api_key = inquire::Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let mut config = Config::load_file()?;
    config.upsert_provider_api_key(id, api_key);
    if config.default_provider.is_none() {
        config.set_default_provider(id);
    }
    config.save()?;

    println!("Saved API key for {id} to {}.", Config::config_file_path()?.display());
    Ok(())
}

fn temp_unit(units: Units) -> &'static str {
    match units {
        Units::Metric => "°C",
        Units::Imperial => "°F",
    }
}

fn speed_unit(units: Units) -> &'static str {
    match units {
        Units::Metric => "m/s",
        Units::Imperial => "mph",
    }
}

fn precip_unit(units: Units) -> &'static str {
    match units {
        Units::Metric => "mm",
        Units::Imperial => "in",
    }
}

fn print_snapshot(snapshot: &WeatherSnapshot, units: Units) {
    let t = temp_unit(units);
    println!(
        "{}, {} ({})",
        snapshot.location_name, snapshot.country_code, snapshot.provider
    );
    println!(
        "  {} {:.1}{t} (feels like {:.1}{t})",
        snapshot.condition.description, snapshot.temperature.current, snapshot.temperature.feels_like,
    );
    println!(
        "  humidity {}%, pressure {:.0} hPa, wind {:.1} {} at {:.0}°",
        snapshot.humidity_percent,
        snapshot.pressure_hpa,
        snapshot.wind.speed,
        speed_unit(units),
        snapshot.wind.direction_degrees,
    );
}

fn print_forecast(series: &ForecastSeries, units: Units) {
    println!("{} ({})", series.location_name, series.provider);
    for entry in &series.entries {
        println!(
            "  {}  {:>6.1}{}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.temperature.current,
            temp_unit(units),
            entry.condition.description,
        );
    }
}

fn print_marine(reading: &MarineReading, units: Units) {
    println!("{} on {} ({})", reading.location_name, reading.date, reading.provider);
    for hour in &reading.hours {
        let period = hour
            .wave_period_s
            .map(|p| format!(", period {p:.1}s"))
            .unwrap_or_default();
        println!(
            "  {}  waves {:.1} m{period}",
            hour.timestamp.format("%H:%M"),
            hour.wave_height_m,
        );
    }
    if let Some(day) = &reading.day {
        println!(
            "  day: {:.1}..{:.1}{} wind up to {:.1} {}, {}",
            day.min_temperature,
            day.max_temperature,
            temp_unit(units),
            day.max_wind_speed,
            speed_unit(units),
            day.condition.description,
        );
    }
}
