use std::{net::SocketAddr, str::FromStr};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://database.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// `sqlx` connection URL for the SQLite database
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Largest accepted request body, CSV uploads included
    pub max_upload_bytes: usize,
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value for {variable}: {reason}")]
    InvalidValue {
        variable: &'static str,
        reason: String,
    },
}

impl Config {
    /// Read the configuration from the environment
    ///
    /// A `.env` file in the working directory is loaded first, if there is one.
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|variable| std::env::var(variable).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        Ok(Self {
            database_url: lookup("BOOKING_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: parse_var(&lookup, "BOOKING_BIND_ADDR", DEFAULT_BIND_ADDR)?,
            max_upload_bytes: match lookup("BOOKING_MAX_UPLOAD_BYTES") {
                Some(value) => parse_value("BOOKING_MAX_UPLOAD_BYTES", &value)?,
                None => DEFAULT_MAX_UPLOAD_BYTES,
            },
            log_format: parse_var(&lookup, "BOOKING_LOG_FORMAT", "pretty")?,
        })
    }
}

fn parse_var<T>(
    lookup: impl Fn(&str) -> Option<String>,
    variable: &'static str,
    default: &str,
) -> Result<T, Error>
where
    T: FromStr,
    T::Err: ToString,
{
    let value = lookup(variable).unwrap_or_else(|| default.to_string());
    parse_value(variable, &value)
}

fn parse_value<T>(variable: &'static str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: ToString,
{
    value.parse().map_err(|err: T::Err| Error::InvalidValue {
        variable,
        reason: err.to_string(),
    })
}
