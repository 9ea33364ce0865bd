use std::{net::IpAddr, str::FromStr, time::Duration};

use tracing::level_filters::LevelFilter;

/// An error produced while reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{key} has an invalid value {value:?}")]
	Invalid { key: &'static str, value: String },
}

/// Settings for the connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
	pub max_connections: u32,
	/// How long to wait for a pooled connection before giving up.
	pub acquire_timeout: Duration,
}

/// The process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
	pub database: DatabaseConfig,
	pub host: IpAddr,
	pub port: u16,
	/// Whether startup inserts the default user when `users` is empty.
	pub seed_default_user: bool,
	pub log_level: LevelFilter,
	pub otlp_endpoint: Option<String>,
}

impl Config {
	/// Reads the configuration from the environment, after loading `.env` if present.
	///
	/// Keys that are not listed here are ignored.
	pub fn from_env() -> Result<Self, Error> {
		dotenvy::dotenv().ok();

		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

		let url = lookup("DATABASE_URL").ok_or(Error::Missing("DATABASE_URL"))?;

		Ok(Self {
			database: DatabaseConfig {
				url,
				max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
				acquire_timeout: Duration::from_secs(parse(&lookup, "DATABASE_ACQUIRE_TIMEOUT", 5)?),
			},
			host: parse(&lookup, "HOST", IpAddr::from([127, 0, 0, 1]))?,
			port: parse(&lookup, "PORT", 3000)?,
			seed_default_user: parse_bool(&lookup, "SEED_DEFAULT_USER", true)?,
			log_level: parse(&lookup, "LOG_LEVEL", LevelFilter::INFO)?,
			otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT"),
		})
	}
}

fn parse<T: FromStr>(
	lookup: impl Fn(&str) -> Option<String>,
	key: &'static str,
	default: T,
) -> Result<T, Error> {
	match lookup(key) {
		Some(value) => value
			.trim()
			.parse()
			.map_err(|_| Error::Invalid { key, value }),
		None => Ok(default),
	}
}

fn parse_bool(
	lookup: impl Fn(&str) -> Option<String>,
	key: &'static str,
	default: bool,
) -> Result<bool, Error> {
	match lookup(key) {
		Some(value) => match value.trim().to_ascii_lowercase().as_str() {
			"1" | "true" | "yes" | "on" => Ok(true),
			"0" | "false" | "no" | "off" => Ok(false),
			_ => Err(Error::Invalid { key, value }),
		},
		None => Ok(default),
	}
}
