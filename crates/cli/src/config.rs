//! Process configuration, read from the environment at startup.
//!
//! A `.env` file in the working directory is loaded first when present.
//! Both provider credentials are required; every other setting has a default.
//! Configuration problems are reported before the pipeline is built.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `OPENAI_API_KEY` | required |
//! | `TAVILY_API_KEY` | required |
//! | `OPENAI_MODEL` | `gpt-4` |
//! | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
//! | `OPENAI_TEMPERATURE` | `0.3` |
//! | `TAVILY_BASE_URL` | `https://api.tavily.com` |
//! | `TAVILY_MAX_RESULTS` | `5` (1 to 20) |
//! | `RESEARCH_DEADLINE_SECS` | none |

use std::str::FromStr;
use std::time::Duration;

use llm::OpenAiConfig;
use pipeline::{ApiKey, Temperature};
use search::TavilyConfig;
use thiserror::Error;
use tracing::warn;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const OPENAI_TEMPERATURE: &str = "OPENAI_TEMPERATURE";
pub const TAVILY_BASE_URL: &str = "TAVILY_BASE_URL";
pub const TAVILY_MAX_RESULTS: &str = "TAVILY_MAX_RESULTS";
pub const RESEARCH_DEADLINE_SECS: &str = "RESEARCH_DEADLINE_SECS";

/// The environment does not describe a usable configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration error: {0} is not set")]
    Missing(&'static str),

    #[error("configuration error: {name} is invalid: {reason}")]
    Invalid {
        name: &'static str,
        reason: String,
    },
}

/// Everything the composition root needs to build the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub tavily: TavilyConfig,
    /// Overall limit on one pipeline invocation.
    pub deadline: Option<Duration>,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::from_path(".env") {
            if !e.not_found() {
                warn!(error = %e, "ignoring unreadable .env file");
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let openai_key = get(OPENAI_API_KEY)
            .and_then(ApiKey::new)
            .ok_or(ConfigError::Missing(OPENAI_API_KEY))?;
        let tavily_key = get(TAVILY_API_KEY)
            .and_then(ApiKey::new)
            .ok_or(ConfigError::Missing(TAVILY_API_KEY))?;

        let mut openai = OpenAiConfig::new(openai_key);
        if let Some(model) = get(OPENAI_MODEL) {
            openai = openai.with_model(model.trim());
        }
        if let Some(url) = get(OPENAI_BASE_URL) {
            openai = openai.with_base_url(url.trim());
        }
        if let Some(raw) = get(OPENAI_TEMPERATURE) {
            let value: f32 = parse(OPENAI_TEMPERATURE, &raw)?;
            let temperature = Temperature::new(value).ok_or_else(|| ConfigError::Invalid {
                name: OPENAI_TEMPERATURE,
                reason: format!("{value} is outside 0.0..=2.0"),
            })?;
            openai = openai.with_temperature(temperature);
        }

        let mut tavily = TavilyConfig::new(tavily_key);
        if let Some(url) = get(TAVILY_BASE_URL) {
            tavily = tavily.with_base_url(url.trim());
        }
        if let Some(raw) = get(TAVILY_MAX_RESULTS) {
            let value: u8 = parse(TAVILY_MAX_RESULTS, &raw)?;
            if !(1..=20).contains(&value) {
                return Err(ConfigError::Invalid {
                    name: TAVILY_MAX_RESULTS,
                    reason: format!("{value} is outside 1..=20"),
                });
            }
            tavily = tavily.with_max_results(value);
        }

        let deadline = match get(RESEARCH_DEADLINE_SECS) {
            Some(raw) => match parse::<u64>(RESEARCH_DEADLINE_SECS, &raw)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        name: RESEARCH_DEADLINE_SECS,
                        reason: "must be greater than zero".into(),
                    })
                }
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        Ok(Self {
            openai,
            tavily,
            deadline,
        })
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: format!("'{}': {e}", raw.trim()),
    })
}
