// src/content_download.rs
use crate::config::ContentApiConfig;
use crate::content::RawEntry;
use crate::errors::GatewayError;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Entries requested per page.
pub const PAGE_LIMIT: usize = 100;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// ===== gateway
#[async_trait]
pub trait ContentGateway: Send + Sync {
    async fn fetch_issues(&self) -> Result<Vec<RawEntry>, GatewayError>;

    async fn fetch_podcasts(&self) -> Result<Vec<RawEntry>, GatewayError>;
}

// ===== wire shapes
#[derive(Debug, Deserialize)]
struct EntryCollection {
    #[serde(default)]
    items: Vec<RawEntry>,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(rename = "Asset", default)]
    assets: Vec<RawAsset>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    sys: AssetSys,
    #[serde(default)]
    fields: AssetFields,
}

#[derive(Debug, Deserialize)]
struct AssetSys {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct AssetFields {
    file: Option<AssetFile>,
}

#[derive(Debug, Deserialize)]
struct AssetFile {
    url: String,
}

fn absolute_asset_url(url: &str) -> String {
    if url.starts_with("//") { format!("https:{}", url) } else { url.to_string() }
}

fn asset_link_id(value: &Value) -> Option<&str> {
    let sys = value.get("sys")?;
    if sys.get("type")?.as_str()? != "Link" || sys.get("linkType")?.as_str()? != "Asset" {
        return None;
    }
    sys.get("id")?.as_str()
}

/// Replaces asset links in `entries` with the file URL of the matching included asset.
pub(crate) fn resolve_asset_links(entries: &mut [RawEntry], asset_urls: &HashMap<String, String>) {
    if asset_urls.is_empty() {
        return;
    }
    for entry in entries.iter_mut() {
        for value in entry.fields.values_mut() {
            let resolved = asset_link_id(value).and_then(|id| asset_urls.get(id));
            if let Some(url) = resolved {
                *value = Value::String(url.clone());
            }
        }
    }
}

// ===== Live http gateway
pub struct HttpContentGateway {
    client: Client,
    entries_url: Url,
    access_token: String,
    issues_type: String,
    podcasts_type: String,
}

impl HttpContentGateway {
    pub fn new(config: &ContentApiConfig) -> Result<Self, GatewayError> {
        let client: Client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let base: String = if config.host.contains("://") {
            config.host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", config.host.trim_end_matches('/'))
        };
        let entries_url: Url = Url::parse(&format!("{}/spaces/{}/entries", base, config.space))?;

        Ok(Self {
            client,
            entries_url,
            access_token: config.access_token.clone(),
            issues_type: config.content_types.issues.clone(),
            podcasts_type: config.content_types.podcasts.clone(),
        })
    }

    pub fn entries_url(&self) -> &Url {
        &self.entries_url
    }

    async fn fetch_page(&self, content_type: &str, skip: usize) -> Result<EntryCollection, GatewayError> {
        debug!("HttpContentGateway: fetching '{}' page skip={}", content_type, skip);
        let response: Response = self
            .client
            .get(self.entries_url.clone())
            .bearer_auth(&self.access_token)
            .query(&[
                ("content_type", content_type.to_string()),
                ("skip", skip.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Status {
                status: response.status(),
                url: self.entries_url.to_string(),
            });
        }

        let body: String = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_entries(&self, content_type: &str) -> Result<Vec<RawEntry>, GatewayError> {
        info!("HttpContentGateway: fetching entries of type '{}'", content_type);
        let mut entries: Vec<RawEntry> = Vec::new();
        let mut asset_urls: HashMap<String, String> = HashMap::new();

        loop {
            let page: EntryCollection = self.fetch_page(content_type, entries.len()).await?;
            let received: usize = page.items.len();
            for asset in page.includes.assets {
                if let Some(file) = asset.fields.file {
                    asset_urls.insert(asset.sys.id, absolute_asset_url(&file.url));
                }
            }
            entries.extend(page.items);

            if received == 0 || entries.len() >= page.total {
                break;
            }
        }

        resolve_asset_links(&mut entries, &asset_urls);
        info!("HttpContentGateway: received {} '{}' entries", entries.len(), content_type);
        Ok(entries)
    }
}

#[async_trait]
impl ContentGateway for HttpContentGateway {
    async fn fetch_issues(&self) -> Result<Vec<RawEntry>, GatewayError> {
        self.fetch_entries(&self.issues_type).await
    }

    async fn fetch_podcasts(&self) -> Result<Vec<RawEntry>, GatewayError> {
        self.fetch_entries(&self.podcasts_type).await
    }
}

// ===== Fake gateway for testing
#[derive(Default)]
pub struct FakeGateway {
    pub issues: Vec<RawEntry>,
    pub podcasts: Vec<RawEntry>,
    pub delay: Option<Duration>,
    failure: Mutex<Option<String>>,
    issue_calls: AtomicUsize,
    podcast_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new(issues: Vec<RawEntry>, podcasts: Vec<RawEntry>) -> Self {
        Self { issues, podcasts, ..Self::default() }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes every following fetch fail with `message` until cleared with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        let mut failure = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        *failure = message.map(String::from);
    }

    pub fn issue_calls(&self) -> usize {
        self.issue_calls.load(Ordering::SeqCst)
    }

    pub fn podcast_calls(&self) -> usize {
        self.podcast_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, entries: &[RawEntry]) -> Result<Vec<RawEntry>, GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match failure {
            Some(message) => Err(GatewayError::Failed(message)),
            None => Ok(entries.to_vec()),
        }
    }
}

#[async_trait]
impl ContentGateway for FakeGateway {
    async fn fetch_issues(&self) -> Result<Vec<RawEntry>, GatewayError> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.issues).await
    }

    async fn fetch_podcasts(&self) -> Result<Vec<RawEntry>, GatewayError> {
        self.podcast_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.podcasts).await
    }
}
