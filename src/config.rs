use failure::Error;
use std::env;
use std::time::Duration;
use url::Url;

const DEFAULT_PORT: &str = "3000";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_BACKEND_TIMEOUT_SECS: &str = "30";

/// Runtime configuration, resolved once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub detect_url: Url,
    pub backend_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, Error> {
        Config::from_vars(
            env::var("PORT").ok(),
            env::var("BACKEND_URL").ok(),
            env::var("BACKEND_TIMEOUT_SECS").ok(),
        )
    }

    fn from_vars(
        port: Option<String>,
        backend_url: Option<String>,
        timeout_secs: Option<String>,
    ) -> Result<Config, Error> {
        let port = port.unwrap_or_else(|| DEFAULT_PORT.to_string());
        let port = port
            .parse::<u16>()
            .map_err(|e| format_err!("Invalid PORT '{}': {}", port, e))?;

        let backend_url = backend_url.unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let detect_url = Url::parse(&backend_url)
            .and_then(|base| base.join("detect-plate"))
            .map_err(|e| format_err!("Invalid BACKEND_URL '{}': {}", backend_url, e))?;

        let timeout_secs =
            timeout_secs.unwrap_or_else(|| DEFAULT_BACKEND_TIMEOUT_SECS.to_string());
        let timeout_secs = timeout_secs
            .parse::<u64>()
            .map_err(|e| format_err!("Invalid BACKEND_TIMEOUT_SECS '{}': {}", timeout_secs, e))?;

        Ok(Config {
            port,
            detect_url,
            backend_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
