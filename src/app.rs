// src/app.rs
use crate::config::Config;
use crate::content_download::{ContentGateway, HttpContentGateway};
use crate::content_factory::EntryFactory;
use crate::errors::GatewayError;
use crate::feed::FeedService;
use crate::store::Store;
use log::info;
use std::sync::Arc;

/// Everything a command needs, built once per process and passed down explicitly.
pub struct App {
    pub config: Config,
    pub gateway: Arc<dyn ContentGateway>,
    pub factory: EntryFactory,
    pub store: Arc<Store>,
    pub feed: FeedService,
}

impl App {
    /// Builds the live context talking to the configured content API.
    pub fn from_config(config: Config) -> Result<App, GatewayError> {
        let gateway: Arc<dyn ContentGateway> = Arc::new(HttpContentGateway::new(&config.api)?);
        info!(
            "App: content API host '{}', space '{}'",
            config.api.host, config.api.space
        );
        Ok(App::with_gateway(config, gateway))
    }

    pub fn with_gateway(config: Config, gateway: Arc<dyn ContentGateway>) -> App {
        let factory = EntryFactory::new()
            .with_malformed_policy(config.malformed_policy)
            .with_podcast_order(config.podcast_order);

        let store = Arc::new(Store::new(gateway.clone(), factory.clone()));
        let feed = FeedService::new(
            gateway.clone(),
            factory.clone(),
            config.feed.clone(),
            config.feed_cache_time,
        );

        App { config, gateway, factory, store, feed }
    }
}
