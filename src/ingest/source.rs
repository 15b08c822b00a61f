use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::core::config::ScraperConfig;

/// One observation of the tracked page: the flattened visible text plus the
/// raw markup (links live in attributes, so both views are needed).
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub text: String,
    pub html: String,
}

/// Opaque provider of page snapshots. The rendering machinery behind it is
/// not this system's concern; the pipeline only ever opens it and asks for
/// the current view. `open` is called again after a fatal session error, so
/// implementations must tolerate re-opening.
#[async_trait]
pub trait SnapshotSource: Send {
    async fn open(&mut self) -> Result<()>;
    async fn acquire(&mut self) -> Result<PageSnapshot>;
}

static SCRIPT_STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());

/// Visible-text view of a markup blob: script/style bodies dropped, tags
/// become line breaks, the handful of entities the page actually uses
/// decoded.
pub fn flatten_html(html: &str) -> String {
    let stripped = SCRIPT_STYLE_RE.replace_all(html, "\n");
    let text = TAG_RE.replace_all(&stripped, "\n");
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Snapshot source backed by plain HTTP fetches of the tracked page.
pub struct HttpPageSource {
    url: String,
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .context("failed to build page fetch client")?;
        Ok(Self {
            url: config.scrape_url.clone(),
            client,
        })
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {}", self.url))?
            .error_for_status()
            .with_context(|| format!("page fetch rejected for {}", self.url))?;
        response.text().await.context("failed to read page body")
    }
}

#[async_trait]
impl SnapshotSource for HttpPageSource {
    async fn open(&mut self) -> Result<()> {
        info!(url = %self.url, "opening page source");
        // Reachability probe; the body is thrown away, the settle delay and
        // the first tick do the real work.
        self.fetch().await?;
        Ok(())
    }

    async fn acquire(&mut self) -> Result<PageSnapshot> {
        let html = self.fetch().await?;
        let text = flatten_html(&html);
        debug!(html_bytes = html.len(), text_bytes = text.len(), "acquired snapshot");
        Ok(PageSnapshot { text, html })
    }
}

/// Replays a fixed sequence of snapshots, then fails like a dead page.
/// Exists for tests and offline runs.
pub struct StaticSource {
    snapshots: Vec<PageSnapshot>,
    cursor: usize,
}

impl StaticSource {
    pub fn new(snapshots: Vec<PageSnapshot>) -> Self {
        Self {
            snapshots,
            cursor: 0,
        }
    }
}

#[async_trait]
impl SnapshotSource for StaticSource {
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    async fn acquire(&mut self) -> Result<PageSnapshot> {
        match self.snapshots.get(self.cursor) {
            Some(snapshot) => {
                self.cursor += 1;
                Ok(snapshot.clone())
            }
            None => bail!("static source exhausted"),
        }
    }
}
