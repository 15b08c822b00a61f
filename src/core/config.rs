use std::env;
use std::time::Duration;

/// Relay server configuration, environment-driven.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen port (`PORT`).
    pub port: u16,
    /// Shared bearer secret the scraper must present (`SCRAPER_TOKEN`).
    pub scraper_token: String,
    /// Upper bound on stored records.
    pub max_entries: usize,
    /// Records older than this are swept.
    pub max_age: Duration,
    /// Cadence of the background sweep.
    pub sweep_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            scraper_token: "local-scraper-secret".to_string(),
            max_entries: 100,
            max_age: Duration::from_secs(4 * 60),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Ok(token) = env::var("SCRAPER_TOKEN") {
            config.scraper_token = token;
        }
        config
    }
}

/// Scraper process configuration, environment-driven.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Relay base URL (`BACKEND_URL`).
    pub backend_url: String,
    /// Shared bearer secret (`SCRAPER_TOKEN`).
    pub scraper_token: String,
    /// Tracked page (`SCRAPE_URL`).
    pub scrape_url: String,
    /// Wait after opening the source before the first extraction, so the
    /// page's own async rendering can populate.
    pub settle_delay: Duration,
    /// Extraction cadence.
    pub tick_interval: Duration,
    /// Wait before re-opening the source after a fatal session error.
    pub restart_backoff: Duration,
    /// Page load / snapshot acquisition bound.
    pub fetch_timeout: Duration,
    /// Per-record delivery bound.
    pub delivery_timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3001".to_string(),
            scraper_token: "local-scraper-secret".to_string(),
            scrape_url: "https://szn.zone/base".to_string(),
            settle_delay: Duration::from_secs(10),
            tick_interval: Duration::from_secs(10),
            restart_backoff: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(60),
            delivery_timeout: Duration::from_secs(10),
        }
    }
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("BACKEND_URL") {
            config.backend_url = url;
        }
        if let Ok(token) = env::var("SCRAPER_TOKEN") {
            config.scraper_token = token;
        }
        if let Ok(url) = env::var("SCRAPE_URL") {
            config.scrape_url = url;
        }
        config
    }
}
