// src/feed.rs
use crate::content::Issue;
use crate::content_download::ContentGateway;
use crate::content_factory::EntryFactory;
use crate::errors::FeedError;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rss::{Channel, ChannelBuilder, GuidBuilder, ImageBuilder, Item, ItemBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Where the feed is published, relative to the site root.
pub const FEED_PATH: &str = "feed.xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedAuthor {
    pub name: String,
    pub email: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub description: String,
    pub base_url: String,
    pub image: Option<String>,
    pub language: Option<String>,
    pub author: FeedAuthor,
}

impl Default for FeedMeta {
    fn default() -> Self {
        Self {
            title: "Vue.js Brasil".to_string(),
            description: "Comunidade brasileira de Vue.js".to_string(),
            base_url: "https://news.vuejs.org".to_string(),
            image: Some("https://news.vuejs.org/logo.png".to_string()),
            language: Some("pt-BR".to_string()),
            author: FeedAuthor {
                name: "Comunidade brasileira de Vue.js".to_string(),
                email: "hello@igorluiz.me".to_string(),
                link: "https://twitter.com/vuejs_brasil".to_string(),
            },
        }
    }
}

impl FeedMeta {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn feed_url(&self) -> String {
        format!("{}/{}", self.base(), FEED_PATH)
    }

    pub fn issue_url(&self, issue: &Issue) -> String {
        format!("{}/issues/{}", self.base(), issue.issue_number())
    }
}

fn feed_item(meta: &FeedMeta, issue: &Issue) -> Item {
    let guid = GuidBuilder::default()
        .value(issue.issue_number().to_string())
        .permalink(false)
        .build();

    ItemBuilder::default()
        .title(issue.name().to_string())
        .guid(guid)
        .link(meta.issue_url(issue))
        .description(issue.description().to_string())
        .build()
}

pub fn build_channel(meta: &FeedMeta, issues: &[Issue], built_at: DateTime<Utc>) -> Channel {
    let image = meta.image.as_ref().map(|url| {
        ImageBuilder::default()
            .url(url.clone())
            .title(meta.title.clone())
            .link(meta.base().to_string())
            .build()
    });

    ChannelBuilder::default()
        .title(meta.title.clone())
        .link(meta.feed_url())
        .description(meta.description.clone())
        .language(meta.language.clone())
        .managing_editor(format!("{} ({})", meta.author.email, meta.author.name))
        .generator(concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")).to_string())
        .last_build_date(built_at.to_rfc2822())
        .image(image)
        .items(issues.iter().map(|issue| feed_item(meta, issue)).collect::<Vec<Item>>())
        .build()
}

pub fn render_channel(channel: &Channel) -> Result<String, FeedError> {
    let bytes: Vec<u8> = channel.pretty_write_to(Vec::new(), b' ', 2)?;
    Ok(String::from_utf8(bytes)?)
}

struct CachedFeed {
    xml: String,
    generated_at: DateTime<Utc>,
}

/// Serves the RSS document, regenerating it from the content API at most once per
/// `cache_time`.
pub struct FeedService {
    gateway: Arc<dyn ContentGateway>,
    factory: EntryFactory,
    meta: FeedMeta,
    cache_time: Duration,
    cached: Mutex<Option<CachedFeed>>,
}

impl FeedService {
    pub fn new(
        gateway: Arc<dyn ContentGateway>,
        factory: EntryFactory,
        meta: FeedMeta,
        cache_time: Duration,
    ) -> Self {
        Self { gateway, factory, meta, cache_time, cached: Mutex::new(None) }
    }

    pub fn meta(&self) -> &FeedMeta {
        &self.meta
    }

    pub async fn render(&self) -> Result<String, FeedError> {
        self.render_at(Utc::now()).await
    }

    pub async fn render_at(&self, now: DateTime<Utc>) -> Result<String, FeedError> {
        let mut cached = self.cached.lock().await;

        if let Some(feed) = cached.as_ref() {
            let fresh = (now - feed.generated_at).to_std().map_or(true, |age| age < self.cache_time);
            if fresh {
                debug!("FeedService: serving feed generated at {}", feed.generated_at);
                return Ok(feed.xml.clone());
            }
        }

        let raw = self.gateway.fetch_issues().await?;
        let issues = self.factory.create_issues(&raw)?;
        let xml = render_channel(&build_channel(&self.meta, &issues, now))?;
        info!("FeedService: regenerated feed with {} items", issues.len());

        *cached = Some(CachedFeed { xml: xml.clone(), generated_at: now });
        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{IssueNumber, RawEntry};
    use crate::content_download::FakeGateway;
    use chrono::TimeZone;
    use serde_json::{Value, json};

    fn issue(n: u32) -> Issue {
        Issue::new(IssueNumber::new(n), format!("Edição {}", n), format!("Resumo da edição {}", n))
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    #[test]
    fn test_build_channel_maps_issues_to_items() {
        let meta = FeedMeta::default();
        let channel = build_channel(&meta, &[issue(1), issue(2)], at(0));

        assert_eq!(channel.title(), "Vue.js Brasil");
        assert_eq!(channel.link(), "https://news.vuejs.org/feed.xml");
        assert_eq!(channel.items().len(), 2);

        let ids: Vec<&str> = channel.items().iter().filter_map(|i| i.guid()).map(|g| g.value()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(channel.items()[0].link().unwrap().ends_with("/issues/1"));
        assert!(channel.items()[1].link().unwrap().ends_with("/issues/2"));
        assert_eq!(channel.items()[0].title(), Some("Edição 1"));
        assert_eq!(channel.items()[1].description(), Some("Resumo da edição 2"));
        assert!(!channel.items()[0].guid().unwrap().is_permalink());
    }

    #[test]
    fn test_rendered_feed_reads_back() {
        let xml = render_channel(&build_channel(&FeedMeta::default(), &[issue(3)], at(0))).unwrap();
        assert!(xml.contains("<rss"));

        let channel = Channel::read_from(xml.as_bytes()).unwrap();
        assert_eq!(channel.items()[0].link(), Some("https://news.vuejs.org/issues/3"));
        assert_eq!(channel.image().map(|i| i.url()), Some("https://news.vuejs.org/logo.png"));
        assert_eq!(channel.image().map(|i| i.link()), Some("https://news.vuejs.org"));
    }

    #[tokio::test]
    async fn test_feed_service_caches_for_cache_time() {
        let Value::Object(fields) = json!({ "issueNumber": 1, "name": "um", "description": "d" }) else {
            unreachable!()
        };
        let gateway = Arc::new(FakeGateway::new(vec![RawEntry::new("e1", fields)], vec![]));
        let service = FeedService::new(
            gateway.clone(),
            EntryFactory::new(),
            FeedMeta::default(),
            Duration::from_secs(600),
        );

        let first = service.render_at(at(0)).await.unwrap();
        let cached = service.render_at(at(9)).await.unwrap();
        assert_eq!(first, cached);
        assert_eq!(gateway.issue_calls(), 1);

        service.render_at(at(10)).await.unwrap();
        assert_eq!(gateway.issue_calls(), 2);
    }

    // SAD PATHS

    #[tokio::test]
    async fn test_feed_service_propagates_gateway_failure() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.set_failure(Some("timeout"));
        let service =
            FeedService::new(gateway, EntryFactory::new(), FeedMeta::default(), Duration::from_secs(600));

        assert!(matches!(service.render_at(at(0)).await, Err(FeedError::Gateway(_))));
    }
}
