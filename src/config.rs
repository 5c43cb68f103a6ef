// src/config.rs
//! Process configuration, read from the environment.
//!
//! The three content API credentials (`SPACE`, `ACCESS_TOKEN`, `HOST`) are required and
//! checked before anything touches the network. Everything else has a default.

use crate::content_factory::{MalformedEntryPolicy, PodcastOrder};
use crate::errors::ConfigError;
use crate::feed::FeedMeta;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const ENV_SPACE: &str = "SPACE";
pub const ENV_ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const ENV_HOST: &str = "HOST";
pub const ENV_CONTENT_TYPE_ISSUES: &str = "CONTENT_TYPE_ISSUES";
pub const ENV_CONTENT_TYPE_PODCASTS: &str = "CONTENT_TYPE_PODCASTS";
pub const ENV_MALFORMED_ENTRIES: &str = "MALFORMED_ENTRIES";
pub const ENV_PODCAST_ORDER: &str = "PODCAST_ORDER";
pub const ENV_FEED_CACHE_SECS: &str = "FEED_CACHE_SECS";
pub const ENV_SITE_BASE_URL: &str = "SITE_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

pub const DEFAULT_FEED_CACHE_SECS: u64 = 60 * 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypes {
    pub issues: String,
    pub podcasts: String,
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self { issues: "issue".to_string(), podcasts: "podcast".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentApiConfig {
    pub space: String,
    pub access_token: String,
    pub host: String,
    pub content_types: ContentTypes,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ContentApiConfig,
    pub feed: FeedMeta,
    pub feed_cache_time: Duration,
    pub malformed_policy: MalformedEntryPolicy,
    pub podcast_order: PodcastOrder,
}

impl FromStr for MalformedEntryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(MalformedEntryPolicy::Skip),
            "abort" => Ok(MalformedEntryPolicy::Abort),
            other => Err(format!("expected 'skip' or 'abort', got '{}'", other)),
        }
    }
}

impl FromStr for PodcastOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ascending" => Ok(PodcastOrder::AscendingIssueNumber),
            "as-received" => Ok(PodcastOrder::AsReceived),
            other => Err(format!("expected 'ascending' or 'as-received', got '{}'", other)),
        }
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String, ConfigError> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::InvalidValue { name, reason: e.to_string(), value }),
        },
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let space = required(&lookup, ENV_SPACE)?;
        let access_token = required(&lookup, ENV_ACCESS_TOKEN)?;
        let host = required(&lookup, ENV_HOST)?;

        let defaults = ContentTypes::default();
        let content_types = ContentTypes {
            issues: optional(&lookup, ENV_CONTENT_TYPE_ISSUES, defaults.issues)?,
            podcasts: optional(&lookup, ENV_CONTENT_TYPE_PODCASTS, defaults.podcasts)?,
        };

        let mut feed = FeedMeta::default();
        if let Some(raw) = lookup(ENV_SITE_BASE_URL).filter(|v| !v.trim().is_empty()) {
            let base_url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                name: ENV_SITE_BASE_URL,
                reason: e.to_string(),
                value: raw.clone(),
            })?;
            feed.base_url = base_url.to_string();
        }

        Ok(Config {
            api: ContentApiConfig {
                space,
                access_token,
                host,
                content_types,
                request_timeout_secs: optional(
                    &lookup,
                    ENV_REQUEST_TIMEOUT_SECS,
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
            },
            feed,
            feed_cache_time: Duration::from_secs(optional(
                &lookup,
                ENV_FEED_CACHE_SECS,
                DEFAULT_FEED_CACHE_SECS,
            )?),
            malformed_policy: optional(&lookup, ENV_MALFORMED_ENTRIES, MalformedEntryPolicy::default())?,
            podcast_order: optional(&lookup, ENV_PODCAST_ORDER, PodcastOrder::default())?,
        })
    }
}
